use super::physics::{DynamicBallDesc, DynamicBoxDesc, PhysicsWorld, SpringDesc};
use super::session::Fuel;
use crate::config::GameConfig;
use crate::states::GameState;
use crate::web::VirtualControlState;
use bevy::prelude::*;

pub struct VehicleGameplayPlugin;

impl Plugin for VehicleGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VehicleInputState>()
            .init_resource::<VehicleInputBindings>()
            .add_systems(OnExit(GameState::InRun), release_vehicle_input)
            .add_systems(
                Update,
                read_vehicle_input.run_if(in_state(GameState::InRun)),
            );
    }
}

/// Held controls, sampled by the fixed tick.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleInputState {
    pub accelerate: bool,
    pub brake: bool,
}

#[derive(Resource, Debug, Clone)]
struct VehicleInputBindings {
    accelerate: Vec<KeyCode>,
    brake: Vec<KeyCode>,
}

impl Default for VehicleInputBindings {
    fn default() -> Self {
        Self {
            accelerate: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            brake: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
        }
    }
}

fn read_vehicle_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<VehicleInputBindings>,
    virtual_controls: Option<Res<VirtualControlState>>,
    mut input_state: ResMut<VehicleInputState>,
) {
    let (touch_accelerate, touch_brake) = virtual_controls
        .map(|controls| (controls.accelerate, controls.brake))
        .unwrap_or((false, false));

    input_state.accelerate =
        touch_accelerate || bindings.accelerate.iter().any(|key| keyboard.pressed(*key));
    input_state.brake = touch_brake || bindings.brake.iter().any(|key| keyboard.pressed(*key));
}

fn release_vehicle_input(mut input_state: ResMut<VehicleInputState>) {
    *input_state = VehicleInputState::default();
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleParams {
    pub spawn: Vec2,
    pub chassis_size: Vec2,
    pub chassis_density: f32,
    pub chassis_friction: f32,
    pub wheel_radius: f32,
    pub wheel_density: f32,
    pub wheel_friction: f32,
    pub wheel_restitution: f32,
    /// Wheel centre relative to the chassis centre, mirrored for the rear wheel.
    pub wheel_offset: Vec2,
    pub anchor_offset_y: f32,
    pub suspension_rest_length: f32,
    pub suspension_stiffness: f32,
    pub suspension_damping: f32,
}

impl VehicleParams {
    pub fn from_config(config: &GameConfig) -> Self {
        let vehicle = &config.vehicle;
        Self {
            spawn: Vec2::new(vehicle.start_x, vehicle.start_y),
            chassis_size: Vec2::new(vehicle.chassis_width, vehicle.chassis_height),
            chassis_density: vehicle.chassis_density,
            chassis_friction: vehicle.chassis_friction,
            wheel_radius: vehicle.wheel_radius,
            wheel_density: vehicle.wheel_density,
            wheel_friction: vehicle.wheel_friction,
            wheel_restitution: vehicle.wheel_restitution,
            wheel_offset: Vec2::new(vehicle.wheel_offset_x, vehicle.wheel_offset_y),
            anchor_offset_y: vehicle.anchor_offset_y,
            suspension_rest_length: vehicle.suspension_rest_length,
            suspension_stiffness: vehicle.suspension_stiffness,
            suspension_damping: vehicle.suspension_damping,
        }
    }
}

/// Chassis on two sprung wheels. Handles only; the bodies live in the world
/// and each spring goes away with its wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vehicle<H> {
    pub chassis: H,
    pub rear_wheel: H,
    pub front_wheel: H,
}

impl<H: Copy + Eq + std::fmt::Debug> Vehicle<H> {
    pub fn spawn<W>(params: &VehicleParams, world: &mut W) -> Self
    where
        W: PhysicsWorld<Handle = H>,
    {
        let chassis = world.add_dynamic_box(&DynamicBoxDesc {
            center: params.spawn,
            half_extents: params.chassis_size * 0.5,
            density: params.chassis_density,
            friction: params.chassis_friction,
        });

        let mut spawn_wheel = |side: f32| {
            let offset = Vec2::new(params.wheel_offset.x * side, params.wheel_offset.y);
            let wheel = world.add_dynamic_ball(&DynamicBallDesc {
                center: params.spawn + offset,
                radius: params.wheel_radius,
                density: params.wheel_density,
                friction: params.wheel_friction,
                restitution: params.wheel_restitution,
            });
            world.add_spring(&SpringDesc {
                anchor_body: chassis,
                anchor_local: Vec2::new(params.wheel_offset.x * side, params.anchor_offset_y),
                attached_body: wheel,
                attached_local: Vec2::ZERO,
                rest_length: params.suspension_rest_length,
                stiffness: params.suspension_stiffness,
                damping: params.suspension_damping,
            });
            wheel
        };

        let rear_wheel = spawn_wheel(-1.0);
        let front_wheel = spawn_wheel(1.0);

        Self {
            chassis,
            rear_wheel,
            front_wheel,
        }
    }

    pub fn wheels(&self) -> [H; 2] {
        [self.rear_wheel, self.front_wheel]
    }
}

/// Turns held controls into wheel spin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleController {
    pub drive_angular_velocity: f32,
    pub brake_angular_velocity: f32,
    pub burn_per_tick: Fuel,
}

impl VehicleController {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            drive_angular_velocity: config.vehicle.drive_angular_velocity,
            brake_angular_velocity: config.vehicle.brake_angular_velocity,
            burn_per_tick: Fuel::from_units(config.fuel.burn_per_tick),
        }
    }

    /// Drives both wheels and returns the fuel spent this tick.
    ///
    /// Accelerate is applied before brake, so holding both ends the tick
    /// braking while still paying for the throttle. Braking is free.
    pub fn tick<H, W>(
        &self,
        input: &VehicleInputState,
        fuel_remaining: Fuel,
        vehicle: &Vehicle<H>,
        world: &mut W,
    ) -> Fuel
    where
        H: Copy + Eq + std::fmt::Debug,
        W: PhysicsWorld<Handle = H>,
    {
        let mut burn = Fuel::ZERO;

        if input.accelerate && !fuel_remaining.is_empty() {
            for wheel in vehicle.wheels() {
                world.set_angular_velocity(wheel, self.drive_angular_velocity);
            }
            burn = self.burn_per_tick;
        }

        if input.brake {
            for wheel in vehicle.wheels() {
                world.set_angular_velocity(wheel, self.brake_angular_velocity);
            }
        }

        burn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::shipped_config;
    use crate::gameplay::physics::testing::MockWorld;
    use crate::gameplay::physics::BodyShape;

    fn spawn() -> (Vehicle<u32>, MockWorld, VehicleController) {
        let config = shipped_config();
        let mut world = MockWorld::default();
        let vehicle = Vehicle::spawn(&VehicleParams::from_config(&config), &mut world);
        (vehicle, world, VehicleController::from_config(&config))
    }

    #[test]
    fn spawn_builds_chassis_wheels_and_springs() {
        let (vehicle, world, _) = spawn();

        assert_eq!(world.dynamic_body_count(), 3);
        assert_eq!(world.springs.len(), 2);

        let chassis = &world.bodies[&vehicle.chassis];
        assert_eq!(chassis.pose.position, Vec2::new(200.0, 100.0));
        assert_eq!(
            chassis.shape,
            BodyShape::Box {
                half_extents: Vec2::new(40.0, 15.0)
            }
        );

        assert_eq!(
            world.bodies[&vehicle.rear_wheel].pose.position,
            Vec2::new(170.0, 125.0)
        );
        assert_eq!(
            world.bodies[&vehicle.front_wheel].pose.position,
            Vec2::new(230.0, 125.0)
        );

        let front_spring = world
            .springs
            .iter()
            .find(|spring| spring.attached_body == vehicle.front_wheel)
            .expect("front wheel should be sprung");
        assert_eq!(front_spring.anchor_body, vehicle.chassis);
        assert_eq!(front_spring.attached_body, vehicle.front_wheel);
        assert_eq!(front_spring.anchor_local, Vec2::new(30.0, 15.0));
        assert_eq!(front_spring.attached_local, Vec2::ZERO);
        assert_eq!(front_spring.rest_length, 10.0);
    }

    #[test]
    fn removing_a_wheel_drops_only_its_spring() {
        let (vehicle, mut world, _) = spawn();

        world.remove_body(vehicle.front_wheel);

        assert_eq!(world.springs.len(), 1);
        assert_eq!(world.springs[0].attached_body, vehicle.rear_wheel);
        assert_eq!(world.springs[0].anchor_body, vehicle.chassis);
        assert!(world.bodies.contains_key(&vehicle.chassis));
        assert!(world.bodies.contains_key(&vehicle.rear_wheel));
    }

    #[test]
    fn accelerate_spins_both_wheels_and_burns_fuel() {
        let (vehicle, mut world, controller) = spawn();
        let input = VehicleInputState {
            accelerate: true,
            brake: false,
        };

        let burn = controller.tick(&input, Fuel::from_units(100.0), &vehicle, &mut world);

        assert_eq!(burn, Fuel::from_units(0.05));
        assert_eq!(world.bodies[&vehicle.rear_wheel].angular_velocity, 12.0);
        assert_eq!(world.bodies[&vehicle.front_wheel].angular_velocity, 12.0);
    }

    #[test]
    fn accelerate_without_fuel_does_nothing() {
        let (vehicle, mut world, controller) = spawn();
        let input = VehicleInputState {
            accelerate: true,
            brake: false,
        };

        let burn = controller.tick(&input, Fuel::ZERO, &vehicle, &mut world);

        assert_eq!(burn, Fuel::ZERO);
        assert!(world.angular_velocity_writes.is_empty());
    }

    #[test]
    fn brake_is_free_and_reverses_the_wheels() {
        let (vehicle, mut world, controller) = spawn();
        let input = VehicleInputState {
            accelerate: false,
            brake: true,
        };

        let burn = controller.tick(&input, Fuel::ZERO, &vehicle, &mut world);

        assert_eq!(burn, Fuel::ZERO);
        assert_eq!(world.bodies[&vehicle.rear_wheel].angular_velocity, -6.0);
        assert_eq!(world.bodies[&vehicle.front_wheel].angular_velocity, -6.0);
    }

    #[test]
    fn brake_wins_when_both_are_held() {
        let (vehicle, mut world, controller) = spawn();
        let input = VehicleInputState {
            accelerate: true,
            brake: true,
        };

        let burn = controller.tick(&input, Fuel::from_units(10.0), &vehicle, &mut world);

        assert_eq!(burn, Fuel::from_units(0.05));
        assert_eq!(world.angular_velocity_writes.len(), 4);
        assert_eq!(world.bodies[&vehicle.rear_wheel].angular_velocity, -6.0);
        assert_eq!(world.bodies[&vehicle.front_wheel].angular_velocity, -6.0);
    }

    #[test]
    fn idle_input_issues_no_commands() {
        let (vehicle, mut world, controller) = spawn();

        let burn = controller.tick(
            &VehicleInputState::default(),
            Fuel::from_units(50.0),
            &vehicle,
            &mut world,
        );

        assert_eq!(burn, Fuel::ZERO);
        assert!(world.angular_velocity_writes.is_empty());
    }
}
