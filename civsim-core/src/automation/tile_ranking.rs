//! Tile value scoring and improvement choice.
//!
//! `tile_priority` is called many times per decision cycle; it must stay
//! deterministic and side-effect-free.

use crate::hex::HexCoord;
use crate::map::Tile;
use crate::ruleset::{ImprovementDef, ResourceKind};
use crate::state::{CivId, GameState};

/// Relative worth of sending a worker to a tile.
///
/// Base 0; +2 if owned; +3 more if it currently yields anything; +1 if an
/// unowned tile borders our territory (speculative expansion); +1 if
/// pillaged; +1 for a visible strategic/luxury resource, but only on tiles
/// that already accrued some base priority.
pub fn tile_priority(game: &GameState, civ_id: CivId, coord: HexCoord) -> i32 {
    let Some(tile) = game.map.get(coord) else {
        return 0;
    };
    let mut priority = 0;
    if tile.owner == Some(civ_id) {
        priority += 2;
        if tile.provides_yield(&game.ruleset) {
            priority += 3;
        }
    } else if tile.owner.is_none() && borders_territory(game, civ_id, coord) {
        priority += 1;
    }
    if tile.pillaged {
        priority += 1;
    }
    if priority > 0 && has_workable_resource(game, civ_id, tile) {
        priority += 1;
    }
    priority
}

fn borders_territory(game: &GameState, civ_id: CivId, coord: HexCoord) -> bool {
    game.map
        .neighbors(coord)
        .into_iter()
        .any(|n| game.map.get(n).map(|t| t.owner == Some(civ_id)).unwrap_or(false))
}

/// Visible strategic or luxury resource; bonus resources do not raise
/// priority.
fn has_workable_resource(game: &GameState, civ_id: CivId, tile: &Tile) -> bool {
    if !tile.has_viewable_resource(&game.ruleset, |t| game.civ(civ_id).has_tech(t)) {
        return false;
    }
    tile.resource
        .as_ref()
        .and_then(|r| game.ruleset.resources.get(r))
        .map(|def| matches!(def.kind, ResourceKind::Strategic | ResourceKind::Luxury))
        .unwrap_or(false)
}

fn worker_can_build(game: &GameState, civ_id: CivId, def: &ImprovementDef, tile: &Tile) -> bool {
    if def.is_great || def.fortification || def.turns_to_build <= 0 {
        return false;
    }
    if let Some(tech) = &def.tech_required {
        if !game.civ(civ_id).has_tech(tech) {
            return false;
        }
    }
    tile.can_build_improvement(def, &game.ruleset)
}

fn improvement_value(def: &ImprovementDef) -> i32 {
    def.stats.total()
}

/// Pick the improvement a worker should build on this tile, or `None` if
/// nothing is worth doing.
///
/// Resuming an improvement already in progress always takes precedence.
/// A yield-nullifying feature makes its removal the only sensible choice;
/// a visible resource's implied improvement beats the generically best one
/// unless it is already in place.
pub fn choose_improvement(game: &GameState, civ_id: CivId, coord: HexCoord) -> Option<String> {
    let tile = game.map.get(coord)?;

    if let Some(progress) = &tile.improvement_in_progress {
        if progress.improvement != "Road" {
            return Some(progress.improvement.clone());
        }
    }

    let candidates: Vec<&ImprovementDef> = game
        .ruleset
        .improvements
        .values()
        .filter(|def| worker_can_build(game, civ_id, def, tile))
        .collect();

    // A nullifying feature (fallout-like) suppresses every yield on the
    // tile; clearing it dominates any construction.
    if let Some(feature) = tile.feature.as_ref().and_then(|f| game.ruleset.terrains.get(f)) {
        if feature.nullifies_yields {
            return candidates
                .iter()
                .find(|d| d.removes_feature.as_deref() == Some(feature.name.as_str()))
                .map(|d| d.name.clone());
        }
    }

    if has_workable_resource(game, civ_id, tile) {
        let implied = tile
            .resource
            .as_ref()
            .and_then(|r| game.ruleset.resources.get(r))
            .and_then(|def| def.improvement.clone());
        if let Some(implied) = implied {
            if tile.improvement.as_ref() != Some(&implied)
                && candidates.iter().any(|d| d.name == implied)
            {
                return Some(implied);
            }
            if tile.improvement.as_ref() == Some(&implied) {
                return None;
            }
        }
    }

    // Candidates iterate in name order, so ties break deterministically.
    let mut best: Option<&ImprovementDef> = None;
    for def in candidates {
        if improvement_value(def) <= 0 {
            continue;
        }
        if best.map(|b| improvement_value(def) > improvement_value(b)).unwrap_or(true) {
            best = Some(def);
        }
    }
    let best = best?;

    // Do not churn a tile that already carries something at least as good.
    if let Some(current) = tile.improvement.as_ref().and_then(|i| game.ruleset.improvements.get(i)) {
        if improvement_value(current) >= improvement_value(best) {
            return None;
        }
    }
    Some(best.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::GameStateBuilder;

    #[test]
    fn test_priority_rewards_owned_yielding_tiles() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_city(0, HexCoord::new(0, 0), true)
            .build();
        // Owned grassland next to the city: +2 owned, +3 yields.
        assert_eq!(tile_priority(&game, 0, HexCoord::new(1, 0)), 5);

        // Unowned tile adjacent to territory: speculative +1.
        assert_eq!(tile_priority(&game, 0, HexCoord::new(2, 0)), 1);

        game.map.get_mut(HexCoord::new(1, 0)).unwrap().pillaged = true;
        assert_eq!(tile_priority(&game, 0, HexCoord::new(1, 0)), 6);
    }

    #[test]
    fn test_resource_bonus_requires_base_priority() {
        let mut game = GameStateBuilder::new()
            .with_map_radius(4)
            .with_civ("Rome")
            .with_city(0, HexCoord::new(0, 0), true)
            .build();
        // Gems are visible without any tech. A far-away unowned tile gets
        // no resource bump; the same resource inside territory does.
        let far = HexCoord::new(4, 0);
        game.map.get_mut(far).unwrap().resource = Some("Gems".to_string());
        assert_eq!(tile_priority(&game, 0, far), 0);

        let near = HexCoord::new(1, 0);
        game.map.get_mut(near).unwrap().resource = Some("Gems".to_string());
        assert_eq!(tile_priority(&game, 0, near), 6);
    }

    #[test]
    fn test_priority_monotone_in_ownership() {
        let mut game = GameStateBuilder::new()
            .with_map_radius(3)
            .with_civ("Rome")
            .build();
        let coord = HexCoord::new(2, 0);
        let before = tile_priority(&game, 0, coord);
        game.map.get_mut(coord).unwrap().owner = Some(0);
        // Ownership is worth strictly more, never just as much.
        assert!(tile_priority(&game, 0, coord) > before);
    }

    #[test]
    fn test_choose_improvement_prefers_resource_implied() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_tech(0, "Agriculture")
            .with_tech(0, "Animal Husbandry")
            .build();
        let coord = HexCoord::new(0, 0);
        game.map.get_mut(coord).unwrap().owner = Some(0);
        game.map.get_mut(coord).unwrap().resource = Some("Horses".to_string());

        // Pasture (implied by Horses) wins over the generic pick.
        assert_eq!(
            choose_improvement(&game, 0, coord),
            Some("Pasture".to_string())
        );
    }

    #[test]
    fn test_choose_improvement_requires_tech() {
        let game = GameStateBuilder::new().with_civ("Rome").build();
        // No techs at all: Farm and friends are locked.
        assert_eq!(choose_improvement(&game, 0, HexCoord::new(0, 0)), None);
    }

    #[test]
    fn test_nullifying_feature_prefers_removal() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_tech(0, "Agriculture")
            .build();
        let coord = HexCoord::new(0, 0);
        game.map.get_mut(coord).unwrap().feature = Some("Fallout".to_string());

        assert_eq!(
            choose_improvement(&game, 0, coord),
            Some("Remove Fallout".to_string())
        );
    }

    #[test]
    fn test_in_progress_work_is_resumed() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        let coord = HexCoord::new(0, 0);
        game.map.get_mut(coord).unwrap().improvement_in_progress =
            Some(crate::map::ImprovementInProgress {
                improvement: "Mine".to_string(),
                turns_left: 3,
            });

        // Mine is resumed even though the civ lacks Mining.
        assert_eq!(choose_improvement(&game, 0, coord), Some("Mine".to_string()));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_priority_monotone_in_ownership_and_pillage(
            q in -2..=2i32,
            r in -2..=2i32,
        ) {
            let mut game = GameStateBuilder::new().with_civ("Rome").build();
            let coord = HexCoord::new(q, r);
            prop_assume!(game.map.contains(coord));

            let unowned = tile_priority(&game, 0, coord);
            game.map.get_mut(coord).unwrap().owner = Some(0);
            let owned = tile_priority(&game, 0, coord);
            prop_assert!(owned > unowned);

            game.map.get_mut(coord).unwrap().pillaged = true;
            prop_assert!(tile_priority(&game, 0, coord) >= owned);
        }
    }

    #[test]
    fn test_existing_better_improvement_is_kept() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_tech(0, "Agriculture")
            .build();
        let coord = HexCoord::new(0, 0);
        game.map.get_mut(coord).unwrap().owner = Some(0);
        game.map.get_mut(coord).unwrap().improvement = Some("Pasture".to_string());

        // Pasture values 2, Farm values 1: keep the pasture.
        assert_eq!(choose_improvement(&game, 0, coord), None);
    }
}
