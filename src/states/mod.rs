use crate::config::GameConfig;
use crate::gameplay::runtime::ActiveSession;
use crate::gameplay::session::SessionStatus;
use bevy::app::AppExit;
use bevy::prelude::*;

const RESTART_BUTTON_IDLE: Color = Color::srgb(0.30, 0.69, 0.31);
const RESTART_BUTTON_HOVER: Color = Color::srgb(0.27, 0.63, 0.28);
const RESTART_BUTTON_PRESSED: Color = Color::srgb(0.22, 0.52, 0.23);

#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    #[default]
    Boot,
    InRun,
    GameOver,
}

pub struct GameStatePlugin;

impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::srgb(0.529, 0.808, 0.922)))
            .add_systems(Startup, setup_camera)
            .add_systems(OnEnter(GameState::Boot), enter_boot)
            .add_systems(
                Update,
                boot_to_in_run
                    .run_if(in_state(GameState::Boot))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(OnEnter(GameState::InRun), enter_in_run)
            .add_systems(
                Update,
                enter_game_over_when_session_ends
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<ActiveSession>),
            )
            .add_systems(OnEnter(GameState::GameOver), enter_game_over)
            .add_systems(OnExit(GameState::GameOver), cleanup_game_over_screen)
            .add_systems(
                Update,
                game_over_controls.run_if(in_state(GameState::GameOver)),
            );
    }
}

#[derive(Component)]
struct GameOverScreenRoot;

#[derive(Component)]
struct RestartButton;

fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn enter_boot() {
    info!("Entered state: Boot");
}

fn boot_to_in_run(mut next_state: ResMut<NextState<GameState>>) {
    next_state.set(GameState::InRun);
}

fn enter_in_run() {
    info!("Entered state: InRun");
}

fn enter_game_over_when_session_ends(
    session: Res<ActiveSession>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if !session.status().is_running() {
        next_state.set(GameState::GameOver);
    }
}

fn game_over_summary(status: SessionStatus) -> (String, String) {
    match status {
        SessionStatus::GameOver {
            reason,
            final_distance,
        } => (
            format!("Distance: {final_distance}m"),
            reason.label().to_string(),
        ),
        SessionStatus::Running => ("Distance: 0m".to_string(), String::new()),
    }
}

fn enter_game_over(mut commands: Commands, session: Option<Res<ActiveSession>>) {
    let status = session
        .map(|session| session.status())
        .unwrap_or(SessionStatus::Running);
    let (distance_line, reason_line) = game_over_summary(status);

    commands
        .spawn((
            Name::new("GameOverOverlay"),
            GameOverScreenRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.7)),
            ZIndex(300),
        ))
        .with_children(|parent| {
            parent
                .spawn((
                    Node {
                        min_width: Val::Px(320.0),
                        flex_direction: FlexDirection::Column,
                        align_items: AlignItems::Center,
                        row_gap: Val::Px(12.0),
                        padding: UiRect::all(Val::Px(24.0)),
                        border: UiRect::all(Val::Px(1.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.08, 0.10, 0.13, 0.96)),
                    BorderColor::all(Color::srgba(0.56, 0.62, 0.68, 0.92)),
                ))
                .with_children(|panel| {
                    panel.spawn((
                        Text::new("Game Over!"),
                        TextFont {
                            font_size: 48.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.94, 0.97, 1.00)),
                    ));
                    panel.spawn((
                        Text::new(distance_line),
                        TextFont {
                            font_size: 26.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.90, 0.94, 0.98)),
                    ));
                    panel.spawn((
                        Text::new(reason_line),
                        TextFont {
                            font_size: 18.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.76, 0.83, 0.90)),
                    ));
                    panel
                        .spawn((
                            Name::new("RestartButton"),
                            RestartButton,
                            Button,
                            Node {
                                padding: UiRect::axes(Val::Px(30.0), Val::Px(15.0)),
                                justify_content: JustifyContent::Center,
                                align_items: AlignItems::Center,
                                ..default()
                            },
                            BackgroundColor(RESTART_BUTTON_IDLE),
                        ))
                        .with_children(|button| {
                            button.spawn((
                                Text::new("Restart"),
                                TextFont {
                                    font_size: 20.0,
                                    ..default()
                                },
                                TextColor(Color::WHITE),
                            ));
                        });
                    panel.spawn((
                        Text::new("R / Space / Enter - Restart\nQ - Quit"),
                        TextFont {
                            font_size: 15.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.76, 0.83, 0.90)),
                    ));
                });
        });

    info!("Entered state: GameOver");
}

fn cleanup_game_over_screen(
    mut commands: Commands,
    game_over_query: Query<Entity, With<GameOverScreenRoot>>,
) {
    for entity in &game_over_query {
        commands.entity(entity).try_despawn();
    }
}

#[allow(clippy::type_complexity)]
fn game_over_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut button_query: Query<
        (&Interaction, &mut BackgroundColor),
        (Changed<Interaction>, With<RestartButton>),
    >,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<AppExit>,
) {
    let mut restart = [KeyCode::KeyR, KeyCode::Space, KeyCode::Enter]
        .iter()
        .any(|key| keyboard.just_pressed(*key));

    for (interaction, mut background) in &mut button_query {
        *background = BackgroundColor(match interaction {
            Interaction::Pressed => {
                restart = true;
                RESTART_BUTTON_PRESSED
            }
            Interaction::Hovered => RESTART_BUTTON_HOVER,
            Interaction::None => RESTART_BUTTON_IDLE,
        });
    }

    if restart {
        info!("Restart requested.");
        next_state.set(GameState::InRun);
    }

    if keyboard.just_pressed(KeyCode::KeyQ) {
        exit.write(AppExit::Success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gameplay::session::GameOverReason;

    #[test]
    fn game_over_summary_reports_final_distance_and_reason() {
        let (distance, reason) = game_over_summary(SessionStatus::GameOver {
            reason: GameOverReason::OutOfFuel,
            final_distance: 342,
        });

        assert_eq!(distance, "Distance: 342m");
        assert_eq!(reason, "Out of fuel");
    }
}
