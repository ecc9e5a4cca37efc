use crate::config::GameConfig;
use crate::states::GameState;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

const TOUCH_BUTTON_IDLE_ALPHA: f32 = 0.35;
const TOUCH_BUTTON_ACTIVE_ALPHA: f32 = 0.65;

/// Browser canvas setup plus on-screen gas/brake lanes for touch and mouse.
pub struct WebSupportPlugin;

impl Plugin for WebSupportPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VirtualControlState>()
            .add_systems(Startup, configure_primary_window_for_web)
            .add_systems(OnEnter(GameState::InRun), spawn_touch_controls_ui)
            .add_systems(OnExit(GameState::InRun), cleanup_touch_controls_ui)
            .add_systems(
                Update,
                (
                    update_virtual_controls_from_pointer_and_touch,
                    update_touch_controls_ui,
                )
                    .chain()
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct VirtualControlState {
    pub accelerate: bool,
    pub brake: bool,
}

#[derive(Component)]
struct TouchControlsRoot;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum TouchControlLane {
    Brake,
    Accelerate,
}

impl TouchControlLane {
    fn for_screen_x(x: f32, width: f32) -> Self {
        if x >= width * 0.5 {
            Self::Accelerate
        } else {
            Self::Brake
        }
    }

    fn base_color(self) -> (f32, f32, f32) {
        match self {
            Self::Brake => (0.96, 0.26, 0.21),
            Self::Accelerate => (0.30, 0.69, 0.31),
        }
    }
}

#[derive(Component)]
struct TouchControlButton {
    lane: TouchControlLane,
}

fn touch_controls_enabled(config: &GameConfig) -> bool {
    config
        .app
        .touch_controls
        .unwrap_or(cfg!(target_arch = "wasm32"))
}

#[cfg(target_arch = "wasm32")]
fn configure_primary_window_for_web(mut window_query: Query<&mut Window, With<PrimaryWindow>>) {
    let Ok(mut window) = window_query.single_mut() else {
        return;
    };
    window.fit_canvas_to_parent = true;
    window.prevent_default_event_handling = true;
}

#[cfg(not(target_arch = "wasm32"))]
fn configure_primary_window_for_web() {}

fn spawn_touch_controls_ui(
    mut commands: Commands,
    config: Option<Res<GameConfig>>,
    existing_query: Query<Entity, With<TouchControlsRoot>>,
) {
    if !existing_query.is_empty() {
        return;
    }
    if !config.is_some_and(|config| touch_controls_enabled(&config)) {
        return;
    }

    commands
        .spawn((
            Name::new("TouchControlsRoot"),
            TouchControlsRoot,
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(0.0),
                right: Val::Px(0.0),
                bottom: Val::Px(0.0),
                padding: UiRect::all(Val::Px(20.0)),
                justify_content: JustifyContent::SpaceBetween,
                align_items: AlignItems::FlexEnd,
                ..default()
            },
            ZIndex(260),
        ))
        .with_children(|parent| {
            for (lane, label) in [
                (TouchControlLane::Brake, "BRAKE"),
                (TouchControlLane::Accelerate, "GAS"),
            ] {
                let (r, g, b) = lane.base_color();
                parent
                    .spawn((
                        Name::new(format!("TouchButton{lane:?}")),
                        TouchControlButton { lane },
                        Node {
                            width: Val::Px(100.0),
                            height: Val::Px(100.0),
                            border: UiRect::all(Val::Px(2.0)),
                            justify_content: JustifyContent::Center,
                            align_items: AlignItems::Center,
                            ..default()
                        },
                        BorderRadius::MAX,
                        BackgroundColor(Color::srgba(r, g, b, TOUCH_BUTTON_IDLE_ALPHA)),
                        BorderColor::all(Color::srgba(1.0, 1.0, 1.0, 0.6)),
                    ))
                    .with_children(|button| {
                        button.spawn((
                            Text::new(label),
                            TextFont {
                                font_size: 20.0,
                                ..default()
                            },
                            TextColor(Color::WHITE),
                        ));
                    });
            }
        });
}

fn cleanup_touch_controls_ui(
    mut commands: Commands,
    root_query: Query<Entity, With<TouchControlsRoot>>,
    mut controls: ResMut<VirtualControlState>,
) {
    for entity in &root_query {
        commands.entity(entity).try_despawn();
    }
    *controls = VirtualControlState::default();
}

fn update_virtual_controls_from_pointer_and_touch(
    config: Res<GameConfig>,
    touches: Res<Touches>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut controls: ResMut<VirtualControlState>,
    window_query: Query<&Window, With<PrimaryWindow>>,
) {
    *controls = VirtualControlState::default();

    if !touch_controls_enabled(&config) {
        return;
    }

    let Ok(window) = window_query.single() else {
        return;
    };
    let width = window.width().max(1.0);

    let mut press = |lane: TouchControlLane| match lane {
        TouchControlLane::Accelerate => controls.accelerate = true,
        TouchControlLane::Brake => controls.brake = true,
    };

    for touch in touches.iter() {
        press(TouchControlLane::for_screen_x(touch.position().x, width));
    }

    if mouse_buttons.pressed(MouseButton::Left) {
        if let Some(cursor) = window.cursor_position() {
            press(TouchControlLane::for_screen_x(cursor.x, width));
        }
    }
}

fn update_touch_controls_ui(
    controls: Res<VirtualControlState>,
    mut button_query: Query<(&TouchControlButton, &mut BackgroundColor)>,
) {
    for (button, mut background) in &mut button_query {
        let pressed = match button.lane {
            TouchControlLane::Brake => controls.brake,
            TouchControlLane::Accelerate => controls.accelerate,
        };
        let alpha = if pressed {
            TOUCH_BUTTON_ACTIVE_ALPHA
        } else {
            TOUCH_BUTTON_IDLE_ALPHA
        };
        let (r, g, b) = button.lane.base_color();
        *background = BackgroundColor(Color::srgba(r, g, b, alpha));
    }
}
