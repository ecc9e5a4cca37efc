use crate::gameplay::runtime::ActiveSession;
use crate::states::GameState;
use bevy::prelude::*;

const HUD_PANEL_Z_INDEX: i32 = 190;
const HUD_PANEL_BG: Color = Color::srgba(0.0, 0.0, 0.0, 0.5);
const HUD_TEXT_PRIMARY: Color = Color::srgb(0.94, 0.97, 1.0);
const HUD_FUEL_BAR_WIDTH_PX: f32 = 200.0;

pub struct GameHudPlugin;

impl Plugin for GameHudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::InRun), spawn_game_hud)
            .add_systems(
                Update,
                update_game_hud.run_if(resource_exists::<ActiveSession>),
            );
    }
}

#[derive(Component)]
struct GameHudRoot;

#[derive(Component)]
struct HudDistanceText;

#[derive(Component)]
struct HudFuelFill;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuelTier {
    Low,
    Medium,
    Full,
}

impl FuelTier {
    pub fn for_percent(percent: f32) -> Self {
        if percent < 20.0 {
            Self::Low
        } else if percent < 50.0 {
            Self::Medium
        } else {
            Self::Full
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Low => Color::srgb_u8(0xff, 0x44, 0x44),
            Self::Medium => Color::srgb_u8(0xff, 0xaa, 0x00),
            Self::Full => Color::srgb_u8(0x44, 0xff, 0x44),
        }
    }
}

fn spawn_game_hud(mut commands: Commands, existing_hud: Query<Entity, With<GameHudRoot>>) {
    if !existing_hud.is_empty() {
        return;
    }

    commands
        .spawn((
            Name::new("GameHudRoot"),
            GameHudRoot,
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(10.0),
                top: Val::Px(10.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(6.0),
                padding: UiRect::all(Val::Px(10.0)),
                ..default()
            },
            BackgroundColor(HUD_PANEL_BG),
            ZIndex(HUD_PANEL_Z_INDEX),
        ))
        .with_children(|panel| {
            panel.spawn((
                HudDistanceText,
                Text::new("0m"),
                TextFont {
                    font_size: 24.0,
                    ..default()
                },
                TextColor(HUD_TEXT_PRIMARY),
            ));
            panel.spawn((
                Text::new("Fuel"),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(HUD_TEXT_PRIMARY),
            ));
            panel
                .spawn((
                    Name::new("HudFuelBar"),
                    Node {
                        width: Val::Px(HUD_FUEL_BAR_WIDTH_PX),
                        height: Val::Px(20.0),
                        border: UiRect::all(Val::Px(2.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgb(0.2, 0.2, 0.2)),
                    BorderColor::all(Color::WHITE),
                ))
                .with_children(|bar| {
                    bar.spawn((
                        HudFuelFill,
                        Node {
                            width: Val::Percent(100.0),
                            height: Val::Percent(100.0),
                            ..default()
                        },
                        BackgroundColor(FuelTier::Full.color()),
                    ));
                });
        });
}

fn update_game_hud(
    session: Res<ActiveSession>,
    mut text_query: Query<&mut Text, With<HudDistanceText>>,
    mut fuel_fill_query: Query<(&mut Node, &mut BackgroundColor), With<HudFuelFill>>,
) {
    if let Ok(mut text) = text_query.single_mut() {
        *text = Text::new(format!("{}m", session.distance()));
    }

    if let Ok((mut bar_node, mut bar_color)) = fuel_fill_query.single_mut() {
        let percent = session.fuel_percent();
        bar_node.width = Val::Percent(percent);
        *bar_color = BackgroundColor(FuelTier::for_percent(percent).color());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuel_tiers_switch_at_twenty_and_fifty_percent() {
        assert_eq!(FuelTier::for_percent(0.0), FuelTier::Low);
        assert_eq!(FuelTier::for_percent(19.9), FuelTier::Low);
        assert_eq!(FuelTier::for_percent(20.0), FuelTier::Medium);
        assert_eq!(FuelTier::for_percent(49.9), FuelTier::Medium);
        assert_eq!(FuelTier::for_percent(50.0), FuelTier::Full);
        assert_eq!(FuelTier::for_percent(100.0), FuelTier::Full);
    }
}
