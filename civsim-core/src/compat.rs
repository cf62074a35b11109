//! Backward compatibility for loaded saves.
//!
//! Runs once after deserialization, before `set_transients` and normal
//! operation. Normalizes renamed flag names, drops references to ruleset
//! entries that no longer exist, and derives fields older saves predate.
//! Must be idempotent: running it twice changes nothing.

use crate::civilization::flag;
use crate::state::GameState;
use crate::unit::UnitAction;

/// Flag names as older saves spelled them.
const RENAMED_FLAGS: [(&str, &str); 2] = [
    ("revoltSpawning", flag::REVOLT_BREWING),
    ("cityStateGiftTurns", flag::CITY_STATE_GIFT),
];

pub fn apply_backward_compatibility(game: &mut GameState) {
    migrate_flag_names(game);
    drop_dangling_ruleset_references(game);
    derive_ever_owned_capital(game);
}

fn migrate_flag_names(game: &mut GameState) {
    for civ in &mut game.civilizations {
        for (old, new) in RENAMED_FLAGS {
            if let Some(turns) = civ.flags.remove(old) {
                // A modern entry wins over a migrated legacy one.
                civ.flags.entry(new.to_string()).or_insert(turns);
            }
        }
    }
}

/// Content changes between save and load leave stale names behind; every
/// stale reference becomes an absence, never an error.
fn drop_dangling_ruleset_references(game: &mut GameState) {
    let ruleset = game.ruleset.clone();

    for tile in game.map.tiles_mut() {
        if let Some(imp) = &tile.improvement {
            if !ruleset.improvements.contains_key(imp) {
                log::warn!("dropping unknown improvement {imp:?} from {}", tile.position);
                tile.improvement = None;
            }
        }
        if let Some(progress) = &tile.improvement_in_progress {
            // "Road" is the road-work marker, not an improvement key.
            if progress.improvement != "Road"
                && !ruleset.improvements.contains_key(&progress.improvement)
            {
                tile.improvement_in_progress = None;
            }
        }
        if let Some(res) = &tile.resource {
            if !ruleset.resources.contains_key(res) {
                tile.resource = None;
            }
        }
        if let Some(feature) = &tile.feature {
            if !ruleset.terrains.contains_key(feature) {
                tile.feature = None;
            }
        }
    }

    for civ in &mut game.civilizations {
        civ.techs.retain(|t| ruleset.techs.contains_key(t));
        civ.policies.retain(|p| ruleset.policies.contains_key(p));
        let stale_research = civ
            .tech_in_progress
            .as_ref()
            .is_some_and(|t| !ruleset.techs.contains_key(t));
        if stale_research {
            civ.tech_in_progress = None;
        }
        civ.trade_requests.retain(|req| match &req.offered_resource {
            Some(res) => ruleset.resources.contains_key(res),
            None => true,
        });
    }

    for unit in game.units.values_mut() {
        unit.promotions.retain(|p| ruleset.promotions.contains_key(p));
        let stale_order = matches!(
            &unit.action,
            Some(UnitAction::BuildImprovement { improvement })
                if !ruleset.improvements.contains_key(improvement)
        );
        if stale_order {
            unit.action = None;
        }
    }
}

/// Saves predating the field deserialize with it unset; a civ currently
/// holding a capital has evidently owned one. The reverse is never
/// derived: losing your capital does not unset the flag.
fn derive_ever_owned_capital(game: &mut GameState) {
    for civ_id in game.civ_ids().collect::<Vec<_>>() {
        if !game.civ(civ_id).ever_owned_capital && game.capital_of(civ_id).is_some() {
            game.civ_mut(civ_id).ever_owned_capital = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::HexCoord;
    use crate::testing::GameStateBuilder;

    #[test]
    fn test_legacy_flag_names_migrate() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        game.civ_mut(0).add_flag("revoltSpawning", 3);

        apply_backward_compatibility(&mut game);
        assert!(!game.civ(0).has_flag("revoltSpawning"));
        assert_eq!(game.civ(0).flags[flag::REVOLT_BREWING], 3);
    }

    #[test]
    fn test_modern_flag_wins_over_legacy() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        game.civ_mut(0).add_flag("revoltSpawning", 3);
        game.civ_mut(0).add_flag(flag::REVOLT_BREWING, 7);

        apply_backward_compatibility(&mut game);
        assert_eq!(game.civ(0).flags[flag::REVOLT_BREWING], 7);
    }

    #[test]
    fn test_dangling_references_become_absences() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_unit(0, HexCoord::new(0, 0), "Warrior")
            .build();
        let unit_id = game.civ(0).units[0];
        game.map.get_mut(HexCoord::new(1, 0)).unwrap().improvement =
            Some("Offshore Platform".to_string());
        game.civ_mut(0).techs.insert("Flight".to_string());
        game.unit_mut(unit_id)
            .unwrap()
            .promotions
            .push("Logistics".to_string());

        apply_backward_compatibility(&mut game);
        assert!(game.map.get(HexCoord::new(1, 0)).unwrap().improvement.is_none());
        assert!(!game.civ(0).has_tech("Flight"));
        assert!(game.unit(unit_id).unwrap().promotions.is_empty());
    }

    #[test]
    fn test_ever_owned_capital_is_derived_not_unset() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_city(0, HexCoord::new(0, 0), true)
            .build();
        game.civ_mut(0).ever_owned_capital = false;
        apply_backward_compatibility(&mut game);
        assert!(game.civ(0).ever_owned_capital);

        // A capital-less civ that once had one keeps the flag.
        let capital = game.capital_of(0).unwrap();
        game.remove_city(capital);
        apply_backward_compatibility(&mut game);
        assert!(game.civ(0).ever_owned_capital);
    }

    #[test]
    fn test_pass_is_idempotent() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_city(0, HexCoord::new(0, 0), true)
            .with_unit(0, HexCoord::new(1, 0), "Worker")
            .build();
        game.civ_mut(0).add_flag("revoltSpawning", 3);
        game.map.get_mut(HexCoord::new(1, 0)).unwrap().improvement =
            Some("Offshore Platform".to_string());

        apply_backward_compatibility(&mut game);
        let once = serde_json::to_string(&game).unwrap();
        apply_backward_compatibility(&mut game);
        let twice = serde_json::to_string(&game).unwrap();
        assert_eq!(once, twice);
    }
}
