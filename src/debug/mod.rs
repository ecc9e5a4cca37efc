use crate::config::{snap_to_fuel_units, GameConfig};
use crate::gameplay::runtime::ActiveSession;
use crate::gameplay::vehicle::VehicleInputState;
use crate::states::GameState;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

pub struct DebugOverlayPlugin;

impl Plugin for DebugOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<KeybindOverlayState>()
            .init_resource::<SessionTuningPanelState>()
            .add_systems(Update, spawn_debug_overlay)
            .add_systems(Update, toggle_keybind_overlay)
            .add_systems(Update, toggle_session_tuning_panel)
            .add_systems(Update, sync_keybind_overlay_visibility)
            .add_systems(
                Update,
                update_debug_overlay_text.run_if(resource_exists::<ActiveSession>),
            )
            .add_systems(
                EguiPrimaryContextPass,
                session_tuning_panel_ui
                    .run_if(in_state(GameState::InRun).or(in_state(GameState::GameOver)))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

#[derive(Component)]
struct DebugOverlayText;

#[derive(Component)]
struct KeybindOverlayText;

#[derive(Resource, Debug, Clone, Default)]
struct KeybindOverlayState {
    visible: bool,
}

#[derive(Resource, Debug, Clone, Default)]
struct SessionTuningPanelState {
    visible: bool,
    status: String,
}

fn spawn_debug_overlay(
    mut commands: Commands,
    keybind_overlay: Res<KeybindOverlayState>,
    config: Option<Res<GameConfig>>,
    existing_overlay: Query<Entity, With<DebugOverlayText>>,
) {
    if !existing_overlay.is_empty() {
        return;
    }

    let Some(config) = config else {
        return;
    };

    if !config.app.debug_overlay {
        return;
    }

    commands.spawn((
        DebugOverlayText,
        Text::new("debug overlay initializing..."),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::srgb(0.08, 0.10, 0.12)),
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(12.0),
            top: Val::Px(12.0),
            ..default()
        },
        ZIndex(100),
    ));

    commands.spawn((
        KeybindOverlayText,
        Text::new(keybind_overlay_text()),
        TextFont {
            font_size: 15.0,
            ..default()
        },
        TextColor(Color::srgb(0.90, 0.94, 0.97)),
        BackgroundColor(Color::srgba(0.06, 0.08, 0.10, 0.82)),
        BorderColor::all(Color::srgba(0.60, 0.68, 0.74, 0.9)),
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(12.0),
            top: Val::Px(180.0),
            padding: UiRect::axes(Val::Px(10.0), Val::Px(8.0)),
            border: UiRect::all(Val::Px(1.0)),
            ..default()
        },
        if keybind_overlay.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        },
        ZIndex(100),
    ));
}

fn update_debug_overlay_text(
    diagnostics: Res<DiagnosticsStore>,
    session: Res<ActiveSession>,
    input_state: Option<Res<VehicleInputState>>,
    mut overlay_query: Query<&mut Text, With<DebugOverlayText>>,
) {
    let Ok(mut text) = overlay_query.single_mut() else {
        return;
    };

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|value| value.smoothed())
        .unwrap_or(0.0);

    let (input_accel, input_brake) = input_state
        .map(|state| (state.accelerate, state.brake))
        .unwrap_or((false, false));

    let (chassis_x, chassis_y, chassis_angle) = session
        .chassis_pose()
        .map(|pose| (pose.position.x, pose.position.y, pose.angle.to_degrees()))
        .unwrap_or((0.0, 0.0, 0.0));

    let terrain = session.terrain();
    let (span_start, span_end) = terrain.collider_span().unwrap_or((0.0, 0.0));

    *text = Text::new(format!(
        "FPS: {fps:>5.1}\nTick: {tick} | Status: {status:?}\nFuel: {fuel:>6.2} ({fuel_raw} units)\nDistance: {distance}m | Camera X: {camera_x:>8.1}\nChassis: ({chassis_x:>7.1}, {chassis_y:>6.1}) @ {chassis_angle:>6.1} deg\nTerrain: {points} points, {segments} colliders\nColliders: [{span_start:.0}, {span_end:.0}] | next x {next_x:.0}\nRetire behind: {threshold:.0}\nInput: accel={accel} brake={brake}",
        tick = session.tick_count(),
        status = session.status(),
        fuel = session.fuel().units(),
        fuel_raw = session.fuel().raw(),
        distance = session.distance(),
        camera_x = session.camera_x(),
        points = terrain.point_count(),
        segments = terrain.segment_count(),
        next_x = terrain.next_x(),
        threshold = terrain.retire_threshold(session.camera_x()),
        accel = if input_accel { "yes" } else { "no" },
        brake = if input_brake { "yes" } else { "no" },
    ));
}

fn toggle_keybind_overlay(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut state: ResMut<KeybindOverlayState>,
    config: Option<Res<GameConfig>>,
) {
    let Some(config) = config else {
        return;
    };

    if !config.app.debug_overlay {
        return;
    }

    if keyboard.just_pressed(KeyCode::KeyH) {
        state.visible = !state.visible;
        info!(
            "Debug keybind panel {}.",
            if state.visible { "shown" } else { "hidden" }
        );
    }
}

fn sync_keybind_overlay_visibility(
    state: Res<KeybindOverlayState>,
    mut query: Query<&mut Visibility, With<KeybindOverlayText>>,
) {
    if !state.is_changed() {
        return;
    }

    let next_visibility = if state.visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };

    for mut visibility in &mut query {
        *visibility = next_visibility;
    }
}

fn toggle_session_tuning_panel(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut panel_state: ResMut<SessionTuningPanelState>,
) {
    if !keyboard.just_pressed(KeyCode::F1) {
        return;
    }

    panel_state.visible = !panel_state.visible;
    info!(
        "Session tuning panel {}.",
        if panel_state.visible { "shown" } else { "hidden" }
    );
}

/// Edits the in-memory config; the next restart picks the values up.
fn session_tuning_panel_ui(
    mut egui_contexts: EguiContexts,
    mut panel_state: ResMut<SessionTuningPanelState>,
    mut config: ResMut<GameConfig>,
) {
    if !panel_state.visible {
        return;
    }

    let mut window_open = panel_state.visible;
    let mut changed = false;
    let status = panel_state.status.clone();
    let terrain_step = config.terrain.step;

    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };
    egui::Window::new("Session Tuning")
        .open(&mut window_open)
        .resizable(true)
        .default_width(420.0)
        .show(ctx, |ui| {
            ui.label("Changes apply on the next restart.");
            ui.separator();

            ui.collapsing("Vehicle", |ui| {
                changed |= tuning_slider_row(
                    ui,
                    "drive angular velocity",
                    &mut config.vehicle.drive_angular_velocity,
                    0.0..=40.0,
                    0.1,
                );
                changed |= tuning_slider_row(
                    ui,
                    "brake angular velocity",
                    &mut config.vehicle.brake_angular_velocity,
                    -40.0..=0.0,
                    0.1,
                );
                changed |= tuning_slider_row(
                    ui,
                    "suspension stiffness",
                    &mut config.vehicle.suspension_stiffness,
                    0.0..=20_000.0,
                    10.0,
                );
                changed |= tuning_slider_row(
                    ui,
                    "suspension damping",
                    &mut config.vehicle.suspension_damping,
                    0.0..=1_000.0,
                    1.0,
                );
            });

            ui.collapsing("Fuel + Rules", |ui| {
                changed |=
                    tuning_slider_row(ui, "max fuel", &mut config.fuel.max, 1.0..=500.0, 0.5);
                changed |= tuning_slider_row(
                    ui,
                    "burn per tick",
                    &mut config.fuel.burn_per_tick,
                    0.0..=1.0,
                    0.001,
                );
                changed |= tuning_slider_row(
                    ui,
                    "flip height cutoff",
                    &mut config.rules.flip_height_cutoff,
                    0.0..=720.0,
                    1.0,
                );
            });

            ui.collapsing("Terrain", |ui| {
                changed |= tuning_slider_row(
                    ui,
                    "variation",
                    &mut config.terrain.variation,
                    0.0..=300.0,
                    1.0,
                );
                changed |= tuning_slider_row(
                    ui,
                    "lookahead",
                    &mut config.terrain.lookahead,
                    terrain_step..=5_000.0,
                    10.0,
                );
                changed |= tuning_slider_row(
                    ui,
                    "retire margin",
                    &mut config.terrain.retire_margin,
                    0.0..=3_000.0,
                    10.0,
                );
            });

            if !status.is_empty() {
                ui.separator();
                ui.label(status.as_str());
            }
        });

    if changed {
        config.fuel.max = snap_to_fuel_units(config.fuel.max);
        config.fuel.burn_per_tick = snap_to_fuel_units(config.fuel.burn_per_tick);
        panel_state.status = "Tuning edited; restart the run to apply.".to_string();
    }
    panel_state.visible = window_open;
}

fn tuning_slider_row(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut f32,
    slider_range: std::ops::RangeInclusive<f32>,
    drag_speed: f32,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        changed |= ui
            .add(egui::Slider::new(value, slider_range).show_value(false))
            .changed();
        changed |= ui
            .add(egui::DragValue::new(value).speed(drag_speed as f64))
            .changed();
    });
    changed
}

fn keybind_overlay_text() -> &'static str {
    "Keybinds\n\
H - Toggle this panel\n\
F1 - Toggle session tuning panel\n\
F5 - Hot-reload config\n\
D / Right - Accelerate\n\
A / Left - Brake / reverse\n\
R / Space / Enter - Restart after game over\n\
Q - Quit from game over"
}
