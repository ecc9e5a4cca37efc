use super::physics::{PhysicsWorld, StaticBoxDesc};
use crate::config::TerrainConfig;
use bevy::prelude::*;
use rand::Rng;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainPoint {
    pub x: f32,
    pub y: f32,
}

impl TerrainPoint {
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// One static ground slab spanning two consecutive profile points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSegment<H> {
    pub left: TerrainPoint,
    pub right: TerrainPoint,
    pub body: H,
}

impl<H> TerrainSegment<H> {
    pub fn x0(&self) -> f32 {
        self.left.x
    }

    pub fn x1(&self) -> f32 {
        self.right.x
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainParams {
    pub step: f32,
    pub base_y: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub variation: f32,
    pub flat_start_points: u32,
    pub initial_points: u32,
    pub lookahead: f32,
    pub retire_margin: f32,
    pub slab_thickness: f32,
    pub friction: f32,
}

impl From<&TerrainConfig> for TerrainParams {
    fn from(config: &TerrainConfig) -> Self {
        Self {
            step: config.step,
            base_y: config.base_y,
            min_y: config.min_y,
            max_y: config.max_y,
            variation: config.variation,
            flat_start_points: config.flat_start_points.max(1),
            initial_points: config.initial_points,
            lookahead: config.lookahead,
            retire_margin: config.retire_margin,
            slab_thickness: config.slab_thickness,
            friction: config.friction,
        }
    }
}

/// Streams ground ahead of the vehicle and drops it behind the camera.
///
/// Points are generated at `x = index * step` starting from the world origin.
/// Live segments always form a contiguous run; the newest point is kept even
/// when every segment has been retired so the profile can keep growing.
#[derive(Debug, Clone)]
pub struct TerrainStreamer<H> {
    params: TerrainParams,
    points: VecDeque<TerrainPoint>,
    segments: VecDeque<TerrainSegment<H>>,
    generated: u64,
    revision: u64,
}

impl<H: Copy + Eq + std::fmt::Debug> TerrainStreamer<H> {
    pub fn new(params: TerrainParams) -> Self {
        Self {
            params,
            points: VecDeque::new(),
            segments: VecDeque::new(),
            generated: 0,
            revision: 0,
        }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    pub fn points(&self) -> impl ExactSizeIterator<Item = &TerrainPoint> + '_ {
        self.points.iter()
    }

    pub fn segments(&self) -> impl ExactSizeIterator<Item = &TerrainSegment<H>> + '_ {
        self.segments.iter()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Bumped whenever the visible profile changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// x the next generated point will take.
    pub fn next_x(&self) -> f32 {
        self.generated as f32 * self.params.step
    }

    pub fn last_point(&self) -> Option<TerrainPoint> {
        self.points.back().copied()
    }

    /// Horizontal extent currently backed by colliders.
    pub fn collider_span(&self) -> Option<(f32, f32)> {
        let first = self.segments.front()?;
        let last = self.segments.back()?;
        Some((first.x0(), last.x1()))
    }

    pub fn retire_threshold(&self, camera_x: f32) -> f32 {
        camera_x - self.params.retire_margin
    }

    pub fn should_extend(&self, vehicle_x: f32) -> bool {
        vehicle_x > self.next_x() - self.params.lookahead
    }

    pub fn generate_initial<W, R>(&mut self, world: &mut W, rng: &mut R)
    where
        W: PhysicsWorld<Handle = H>,
        R: Rng + ?Sized,
    {
        for _ in 0..self.params.initial_points {
            self.extend(world, rng);
        }
    }

    pub fn extend<W, R>(&mut self, world: &mut W, rng: &mut R) -> TerrainPoint
    where
        W: PhysicsWorld<Handle = H>,
        R: Rng + ?Sized,
    {
        let params = self.params;
        let in_flat_start = self.generated < u64::from(params.flat_start_points);
        let y = match self.points.back() {
            Some(previous) if !in_flat_start => {
                let half_range = params.variation * 0.5;
                let delta = if half_range > 0.0 {
                    rng.gen_range(-half_range..half_range)
                } else {
                    0.0
                };
                (previous.y + delta).clamp(params.min_y, params.max_y)
            }
            _ => params.base_y,
        };
        let point = TerrainPoint {
            x: self.next_x(),
            y,
        };

        if let Some(previous) = self.points.back().copied() {
            let body = world.add_static_box(&slab_between(previous, point, &params));
            self.segments.push_back(TerrainSegment {
                left: previous,
                right: point,
                body,
            });
        }

        self.points.push_back(point);
        self.generated += 1;
        self.revision += 1;
        point
    }

    /// Removes segments whose right edge lies behind `camera_x - retire_margin`.
    pub fn retire<W>(&mut self, camera_x: f32, world: &mut W) -> usize
    where
        W: PhysicsWorld<Handle = H>,
    {
        let threshold = self.retire_threshold(camera_x);
        let mut retired = 0;

        while let Some(segment) = self.segments.front().copied() {
            if segment.x1() >= threshold {
                break;
            }
            world.remove_body(segment.body);
            self.segments.pop_front();
            retired += 1;
        }

        if retired > 0 {
            self.prune_points();
            self.revision += 1;
        }
        retired
    }

    /// Forgets every point and segment. The caller owns clearing the world.
    pub fn reset(&mut self, params: TerrainParams) {
        self.params = params;
        self.points.clear();
        self.segments.clear();
        self.generated = 0;
        self.revision += 1;
    }

    fn prune_points(&mut self) {
        let keep_from = self.segments.front().map(TerrainSegment::x0);
        while self.points.len() > 1 {
            let Some(front) = self.points.front() else {
                break;
            };
            if keep_from.is_some_and(|x0| front.x >= x0) {
                break;
            }
            self.points.pop_front();
        }
    }
}

/// Slab whose top edge lies on the segment between `left` and `right`.
pub fn slab_between(left: TerrainPoint, right: TerrainPoint, params: &TerrainParams) -> StaticBoxDesc {
    let span = right.as_vec2() - left.as_vec2();
    let angle = span.y.atan2(span.x);
    let down = Vec2::new(-angle.sin(), angle.cos());
    let half_thickness = params.slab_thickness * 0.5;
    let midpoint = (left.as_vec2() + right.as_vec2()) * 0.5;

    StaticBoxDesc {
        center: midpoint + down * half_thickness,
        half_extents: Vec2::new(span.length() * 0.5, half_thickness),
        angle,
        friction: params.friction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::shipped_config;
    use crate::gameplay::physics::testing::MockWorld;
    use crate::gameplay::physics::BodyShape;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> TerrainParams {
        TerrainParams::from(&shipped_config().terrain)
    }

    fn streamer_with_initial(seed: u64) -> (TerrainStreamer<u32>, MockWorld, StdRng) {
        let mut world = MockWorld::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut streamer = TerrainStreamer::new(params());
        streamer.generate_initial(&mut world, &mut rng);
        (streamer, world, rng)
    }

    #[test]
    fn initial_generation_builds_one_collider_per_point_pair() {
        let (streamer, world, _) = streamer_with_initial(7);

        assert_eq!(streamer.point_count(), 30);
        assert_eq!(streamer.segment_count(), 29);
        assert_eq!(world.static_body_count(), 29);
        assert_eq!(streamer.next_x(), 3000.0);
        assert!(world.bodies.values().all(|body| body.friction == 0.8));
    }

    #[test]
    fn heights_stay_in_band_and_steps_are_exact() {
        let mut world = MockWorld::default();
        let mut rng = StdRng::seed_from_u64(1234);
        let mut streamer = TerrainStreamer::new(params());

        for _ in 0..2_000 {
            streamer.extend(&mut world, &mut rng);
        }

        let points: Vec<_> = streamer.points().copied().collect();
        assert!(points.iter().all(|p| (200.0..=500.0).contains(&p.y)));
        for pair in points.windows(2) {
            assert_eq!(pair[1].x - pair[0].x, 100.0);
        }
    }

    #[test]
    fn flat_start_uses_baseline_height() {
        let (streamer, _, _) = streamer_with_initial(99);
        let points: Vec<_> = streamer.points().copied().collect();

        assert_eq!(points[0], TerrainPoint { x: 0.0, y: 400.0 });
        assert_eq!(points[1], TerrainPoint { x: 100.0, y: 400.0 });
    }

    #[test]
    fn zero_variation_produces_flat_ground() {
        let mut world = MockWorld::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut streamer = TerrainStreamer::new(TerrainParams {
            variation: 0.0,
            ..params()
        });
        streamer.generate_initial(&mut world, &mut rng);

        assert!(streamer.points().all(|p| p.y == 400.0));
    }

    #[test]
    fn slab_top_edge_lies_on_the_profile() {
        let left = TerrainPoint { x: 0.0, y: 400.0 };
        let right = TerrainPoint { x: 100.0, y: 350.0 };
        let slab = slab_between(left, right, &params());

        let down = Vec2::new(-slab.angle.sin(), slab.angle.cos());
        let top_center = slab.center - down * slab.half_extents.y;

        assert!((top_center - Vec2::new(50.0, 375.0)).length() < 1e-3);
        assert!((slab.half_extents.x * 2.0 - 12_500.0_f32.sqrt()).abs() < 1e-3);
        assert_eq!(slab.half_extents.y, 50.0);
        assert!(slab.angle < 0.0);
    }

    #[test]
    fn extend_trigger_uses_lookahead_from_next_point() {
        let (streamer, _, _) = streamer_with_initial(5);

        assert!(!streamer.should_extend(2000.0));
        assert!(streamer.should_extend(2000.5));
    }

    #[test]
    fn retire_drops_only_segments_behind_the_margin() {
        let (mut streamer, mut world, _) = streamer_with_initial(11);

        // threshold = 1200 - 500 = 700: segments ending at 100..=600 go.
        let retired = streamer.retire(1200.0, &mut world);

        assert_eq!(retired, 6);
        assert_eq!(world.removed.len(), 6);
        assert_eq!(world.static_body_count(), 23);
        assert_eq!(streamer.collider_span(), Some((600.0, 2900.0)));
        assert_eq!(streamer.points().next().map(|p| p.x), Some(600.0));
        assert_eq!(streamer.point_count(), 24);
    }

    #[test]
    fn retire_keeps_segment_touching_the_threshold() {
        let (mut streamer, mut world, _) = streamer_with_initial(11);

        // threshold = 700; the segment [600, 700] is not strictly behind it.
        streamer.retire(1200.0, &mut world);
        let retired = streamer.retire(1200.0, &mut world);

        assert_eq!(retired, 0);
        assert_eq!(streamer.collider_span().map(|span| span.0), Some(600.0));
    }

    #[test]
    fn retiring_everything_keeps_the_newest_point() {
        let (mut streamer, mut world, mut rng) = streamer_with_initial(2);
        let before = streamer.revision();

        streamer.retire(1_000_000.0, &mut world);

        assert_eq!(streamer.segment_count(), 0);
        assert_eq!(streamer.point_count(), 1);
        assert!(streamer.revision() > before);
        assert_eq!(world.static_body_count(), 0);

        let point = streamer.extend(&mut world, &mut rng);
        assert_eq!(point.x, 3000.0);
        assert_eq!(streamer.segment_count(), 1);
    }

    #[test]
    fn colliders_are_boxes_matching_their_segments() {
        let (streamer, world, _) = streamer_with_initial(8);

        for segment in streamer.segments() {
            let body = &world.bodies[&segment.body];
            let BodyShape::Box { half_extents } = body.shape else {
                panic!("terrain collider should be a box");
            };
            let length = (segment.right.as_vec2() - segment.left.as_vec2()).length();
            assert!((half_extents.x * 2.0 - length).abs() < 1e-3);
        }
    }
}
