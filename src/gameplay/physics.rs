use bevy::prelude::*;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    pub position: Vec2,
    pub angle: f32,
}

impl BodyPose {
    pub const fn new(position: Vec2, angle: f32) -> Self {
        Self { position, angle }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Ball { radius: f32 },
    Box { half_extents: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot<H> {
    pub handle: H,
    pub pose: BodyPose,
    pub shape: BodyShape,
    pub is_static: bool,
}

/// Fixed, rotated rectangle used for ground slabs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticBoxDesc {
    pub center: Vec2,
    pub half_extents: Vec2,
    pub angle: f32,
    pub friction: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicBallDesc {
    pub center: Vec2,
    pub radius: f32,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicBoxDesc {
    pub center: Vec2,
    pub half_extents: Vec2,
    pub density: f32,
    pub friction: f32,
}

/// Damped spring between a point on `anchor_body` and a point on
/// `attached_body`, both given in the bodies' local frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringDesc<H> {
    pub anchor_body: H,
    pub anchor_local: Vec2,
    pub attached_body: H,
    pub attached_local: Vec2,
    pub rest_length: f32,
    pub stiffness: f32,
    pub damping: f32,
}

/// Bodies and joints owned by the game session.
///
/// Everything is in world coordinates: pixels, `+y` down the screen, angles
/// in radians turning clockwise on screen. Implementations convert to
/// whatever frame the engine uses.
///
/// Stepping is not part of this trait: the engine advances once per fixed
/// tick after the session has issued its commands for that tick.
pub trait PhysicsWorld {
    type Handle: Copy + Eq + Debug;

    fn add_static_box(&mut self, desc: &StaticBoxDesc) -> Self::Handle;

    fn add_dynamic_ball(&mut self, desc: &DynamicBallDesc) -> Self::Handle;

    fn add_dynamic_box(&mut self, desc: &DynamicBoxDesc) -> Self::Handle;

    /// The spring has no handle of its own; it is removed together with
    /// `attached_body`.
    fn add_spring(&mut self, desc: &SpringDesc<Self::Handle>);

    fn remove_body(&mut self, handle: Self::Handle);

    fn set_angular_velocity(&mut self, handle: Self::Handle, angular_velocity: f32);

    /// `None` when the body is unknown or not simulated yet.
    fn pose(&self, handle: Self::Handle) -> Option<BodyPose>;

    fn bodies(&self) -> Vec<BodySnapshot<Self::Handle>>;

    /// Removes every body and joint this world handed out.
    fn clear(&mut self);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone)]
    pub struct MockBody {
        pub pose: BodyPose,
        pub shape: BodyShape,
        pub is_static: bool,
        pub friction: f32,
        pub angular_velocity: f32,
    }

    /// In-memory world that records every command and never simulates.
    /// Tests move bodies around with [`MockWorld::set_pose`].
    #[derive(Debug, Default)]
    pub struct MockWorld {
        next_handle: u32,
        pub bodies: BTreeMap<u32, MockBody>,
        pub springs: Vec<SpringDesc<u32>>,
        pub angular_velocity_writes: Vec<(u32, f32)>,
        pub removed: Vec<u32>,
        pub clear_count: usize,
    }

    impl MockWorld {
        pub fn set_pose(&mut self, handle: u32, pose: BodyPose) {
            if let Some(body) = self.bodies.get_mut(&handle) {
                body.pose = pose;
            }
        }

        pub fn static_body_count(&self) -> usize {
            self.bodies.values().filter(|body| body.is_static).count()
        }

        pub fn dynamic_body_count(&self) -> usize {
            self.bodies.values().filter(|body| !body.is_static).count()
        }

        fn allocate(&mut self) -> u32 {
            let handle = self.next_handle;
            self.next_handle += 1;
            handle
        }

        fn insert(&mut self, pose: BodyPose, shape: BodyShape, is_static: bool, friction: f32) -> u32 {
            let handle = self.allocate();
            self.bodies.insert(
                handle,
                MockBody {
                    pose,
                    shape,
                    is_static,
                    friction,
                    angular_velocity: 0.0,
                },
            );
            handle
        }
    }

    impl PhysicsWorld for MockWorld {
        type Handle = u32;

        fn add_static_box(&mut self, desc: &StaticBoxDesc) -> u32 {
            self.insert(
                BodyPose::new(desc.center, desc.angle),
                BodyShape::Box {
                    half_extents: desc.half_extents,
                },
                true,
                desc.friction,
            )
        }

        fn add_dynamic_ball(&mut self, desc: &DynamicBallDesc) -> u32 {
            self.insert(
                BodyPose::new(desc.center, 0.0),
                BodyShape::Ball {
                    radius: desc.radius,
                },
                false,
                desc.friction,
            )
        }

        fn add_dynamic_box(&mut self, desc: &DynamicBoxDesc) -> u32 {
            self.insert(
                BodyPose::new(desc.center, 0.0),
                BodyShape::Box {
                    half_extents: desc.half_extents,
                },
                false,
                desc.friction,
            )
        }

        fn add_spring(&mut self, desc: &SpringDesc<u32>) {
            self.springs.push(*desc);
        }

        fn remove_body(&mut self, handle: u32) {
            self.bodies.remove(&handle);
            self.springs
                .retain(|spring| spring.anchor_body != handle && spring.attached_body != handle);
            self.removed.push(handle);
        }

        fn set_angular_velocity(&mut self, handle: u32, angular_velocity: f32) {
            if let Some(body) = self.bodies.get_mut(&handle) {
                body.angular_velocity = angular_velocity;
            }
            self.angular_velocity_writes.push((handle, angular_velocity));
        }

        fn pose(&self, handle: u32) -> Option<BodyPose> {
            self.bodies.get(&handle).map(|body| body.pose)
        }

        fn bodies(&self) -> Vec<BodySnapshot<u32>> {
            self.bodies
                .iter()
                .map(|(handle, body)| BodySnapshot {
                    handle: *handle,
                    pose: body.pose,
                    shape: body.shape,
                    is_static: body.is_static,
                })
                .collect()
        }

        fn clear(&mut self) {
            self.bodies.clear();
            self.springs.clear();
            self.angular_velocity_writes.clear();
            self.clear_count += 1;
        }
    }
}
