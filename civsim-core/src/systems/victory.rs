//! Victory detection.
//!
//! The first victory achieved is recorded once and never overwritten; later
//! checks are no-ops. Both lifecycle passes re-check, so a victory is
//! noticed at most one phase after the state change that caused it.

use crate::notifications::NotificationCategory;
use crate::state::{GameState, VictoryKind, VictoryRecord};

pub fn check_victory(game: &mut GameState) {
    if game.victory.is_some() {
        return;
    }

    let Some((civ, kind)) = find_victor(game) else {
        return;
    };
    game.victory = Some(VictoryRecord { civ, kind, turn: game.turn });
    let winner = game.civ(civ).name.clone();
    log::info!("{winner} has won a {kind:?} victory on turn {}", game.turn);
    for id in game.civ_ids().collect::<Vec<_>>() {
        game.civ_mut(id).add_notification(
            format!("{winner} has achieved a {kind:?} victory!"),
            NotificationCategory::General,
            None,
            &["event/victory"],
        );
    }
}

fn find_victor(game: &GameState) -> Option<(crate::state::CivId, VictoryKind)> {
    let living_majors: Vec<_> = game
        .civilizations
        .iter()
        .filter(|c| c.is_major() && !c.is_defeated())
        .collect();

    // Domination requires actually outlasting someone.
    if living_majors.len() == 1 && game.civilizations.iter().filter(|c| c.is_major()).count() > 1 {
        return Some((living_majors[0].id, VictoryKind::Domination));
    }

    let tech_count = game.ruleset.techs.len();
    if tech_count > 0 {
        for civ in &living_majors {
            if civ.techs.len() >= tech_count {
                return Some((civ.id, VictoryKind::Science));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::HexCoord;
    use crate::testing::GameStateBuilder;

    #[test]
    fn test_sole_survivor_wins_domination() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_civ("Greece")
            .with_city(0, HexCoord::new(0, 0), true)
            .build();
        // Greece has no cities and no units: defeated.
        check_victory(&mut game);
        let record = game.victory.unwrap();
        assert_eq!(record.civ, 0);
        assert_eq!(record.kind, VictoryKind::Domination);
    }

    #[test]
    fn test_single_player_game_has_no_domination() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_city(0, HexCoord::new(0, 0), true)
            .build();
        check_victory(&mut game);
        assert!(game.victory.is_none());
    }

    #[test]
    fn test_full_tech_tree_wins_science() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_civ("Greece")
            .with_city(0, HexCoord::new(0, 0), true)
            .with_city(1, HexCoord::new(2, 0), true)
            .build();
        let techs: Vec<String> = game.ruleset.techs.keys().cloned().collect();
        game.civ_mut(0).techs.extend(techs);

        check_victory(&mut game);
        let record = game.victory.unwrap();
        assert_eq!(record.kind, VictoryKind::Science);
        assert_eq!(record.civ, 0);
    }

    #[test]
    fn test_first_victory_is_never_overwritten() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_civ("Greece")
            .with_city(0, HexCoord::new(0, 0), true)
            .build();
        check_victory(&mut game);
        let first = game.victory;
        assert!(first.is_some());

        // A second qualifying condition appears; the record stands.
        let techs: Vec<String> = game.ruleset.techs.keys().cloned().collect();
        game.civ_mut(0).techs.extend(techs);
        game.turn += 10;
        check_victory(&mut game);
        assert_eq!(game.victory, first);
    }
}
