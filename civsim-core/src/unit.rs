//! Units and their turn hooks.
//!
//! General unit pathfinding belongs to the movement collaborator; this
//! module carries only the simple primitives worker automation relies on
//! (`can_reach_this_turn`, `head_towards`) plus promotion bookkeeping and
//! the start/end turn hooks.

use crate::notifications::NotificationCategory;
use crate::ruleset::UnitDomain;
use crate::state::{CivId, GameState, UnitId};
use crate::triggers::{activate_trigger, PendingTrigger};
use crate::hex::HexCoord;
use serde::{Deserialize, Serialize};

/// What a unit is doing across turns. Tagged variants, not ad hoc action
/// strings; the compat pass migrates older shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitAction {
    BuildImprovement { improvement: String },
    BuildRoad,
    Repair { turns_left: i32 },
    Fortify,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    /// Key into the ruleset's unit table.
    pub base: String,
    pub owner: CivId,
    pub position: HexCoord,
    pub movement_left: i32,
    pub health: i32,
    pub experience: i32,
    /// Promotions actually paid for (free ones excluded).
    pub promotion_count: i32,
    pub promotions: Vec<String>,
    pub action: Option<UnitAction>,
    pub automated: bool,
}

impl Unit {
    pub fn new(id: UnitId, base: &str, owner: CivId, position: HexCoord) -> Self {
        Self {
            id,
            base: base.to_string(),
            owner,
            position,
            movement_left: 0,
            health: 100,
            experience: 0,
            promotion_count: 0,
            promotions: Vec::new(),
            action: None,
            automated: false,
        }
    }

    pub fn has_promotion(&self, name: &str) -> bool {
        self.promotions.iter().any(|p| p == name)
    }

    pub fn is_idle(&self) -> bool {
        self.action.is_none()
    }

    /// Experience cost of the next paid promotion.
    pub fn next_promotion_cost(&self) -> i32 {
        10 * (self.promotion_count + 1)
    }
}

pub fn is_military(game: &GameState, unit_id: UnitId) -> bool {
    game.unit(unit_id)
        .and_then(|u| game.ruleset.units.get(&u.base))
        .map(|def| def.domain == UnitDomain::Military)
        .unwrap_or(false)
}

pub fn is_worker(game: &GameState, unit_id: UnitId) -> bool {
    game.unit(unit_id)
        .and_then(|u| game.ruleset.units.get(&u.base))
        .map(|def| def.worker)
        .unwrap_or(false)
}

/// Grant a promotion, honoring the activation ordering contract:
/// experience and promotion-count bookkeeping are updated *before* the
/// trigger runs, but only for non-free promotions; the promotion name is
/// recorded before the trigger runs in every case, so self-referential
/// conditionals see it.
pub fn add_promotion(game: &mut GameState, unit_id: UnitId, name: &str, free: bool) {
    let Some(def) = game.ruleset.promotions.get(name).cloned() else {
        log::warn!("promotion {name} not in ruleset, skipped");
        return;
    };
    let Some(unit) = game.unit_mut(unit_id) else {
        return;
    };
    if unit.has_promotion(name) {
        return;
    }

    if !free {
        let cost = unit.next_promotion_cost();
        unit.experience -= cost;
        unit.promotion_count += 1;
    }
    unit.promotions.push(name.to_string());
    let owner = unit.owner;

    // Triggers fire strictly after the name is recorded.
    for unique in &def.uniques {
        if unique.unique_type.is_triggerable() {
            let mut trigger = PendingTrigger::new(
                unique.clone(),
                owner,
                Some(unit_id),
                Some(format!("due to the {name} promotion")),
            );
            activate_trigger(game, &mut trigger);
        }
    }
}

/// Movement-collaborator primitive: whether the unit can stand on `coord`
/// at all.
pub fn can_move_to(game: &GameState, unit_id: UnitId, coord: HexCoord) -> bool {
    let Some(unit) = game.unit(unit_id) else {
        return false;
    };
    let Some(tile) = game.map.get(coord) else {
        return false;
    };
    if tile.is_impassable(&game.ruleset) || !tile.is_land(&game.ruleset) {
        return false;
    }
    let military = is_military(game, unit_id);
    let occupied = if military {
        tile.military_unit.is_some()
    } else {
        tile.civilian_unit.is_some()
    };
    !occupied || tile.position == unit.position
}

/// Movement-collaborator primitive, simplified to aerial distance against
/// remaining movement.
pub fn can_reach_this_turn(game: &GameState, unit_id: UnitId, coord: HexCoord) -> bool {
    let Some(unit) = game.unit(unit_id) else {
        return false;
    };
    unit.position.distance(coord) <= unit.movement_left && can_move_to(game, unit_id, coord)
}

/// Take one greedy step toward `target`, spending one movement point.
/// Returns true if the unit moved.
pub fn head_towards(game: &mut GameState, unit_id: UnitId, target: HexCoord) -> bool {
    let Some(unit) = game.unit(unit_id) else {
        return false;
    };
    if unit.movement_left <= 0 || unit.position == target {
        return false;
    }
    let position = unit.position;
    let mut best: Option<HexCoord> = None;
    for neighbor in game.map.neighbors(position) {
        if !can_move_to(game, unit_id, neighbor) {
            continue;
        }
        let better = match best {
            Some(b) => neighbor.distance(target) < b.distance(target),
            None => true,
        };
        if better && neighbor.distance(target) < position.distance(target) {
            best = Some(neighbor);
        }
    }
    let Some(step) = best else {
        return false;
    };
    move_unit(game, unit_id, step);
    true
}

/// Place the unit on `to`, maintaining tile occupancy back-references.
pub fn move_unit(game: &mut GameState, unit_id: UnitId, to: HexCoord) {
    let military = is_military(game, unit_id);
    let Some(unit) = game.unit_mut(unit_id) else {
        return;
    };
    let from = unit.position;
    unit.position = to;
    unit.movement_left = (unit.movement_left - 1).max(0);
    if let Some(tile) = game.map.get_mut(from) {
        if military {
            tile.military_unit = None;
        } else {
            tile.civilian_unit = None;
        }
    }
    if let Some(tile) = game.map.get_mut(to) {
        if military {
            tile.military_unit = Some(unit_id);
        } else {
            tile.civilian_unit = Some(unit_id);
        }
    }
}

/// Start-of-turn hook: refresh movement, then advance any in-progress
/// tile work. A missing ruleset entry skips the work item, never the turn.
pub fn unit_start_turn(game: &mut GameState, unit_id: UnitId) {
    let Some(unit) = game.unit(unit_id) else {
        log::debug!("start-turn hook skipped for missing unit {unit_id}");
        return;
    };
    let movement = game
        .ruleset
        .units
        .get(&unit.base)
        .map(|d| d.movement)
        .unwrap_or(2);
    let position = unit.position;
    let owner = unit.owner;
    let action = unit.action.clone();

    if let Some(unit) = game.unit_mut(unit_id) {
        unit.movement_left = movement;
    }

    match action {
        Some(UnitAction::BuildImprovement { improvement }) => {
            progress_improvement(game, unit_id, owner, position, &improvement);
        }
        Some(UnitAction::BuildRoad) => {
            progress_road(game, unit_id, owner, position);
        }
        Some(UnitAction::Repair { turns_left }) => {
            if turns_left <= 1 {
                if let Some(tile) = game.map.get_mut(position) {
                    tile.pillaged = false;
                }
                if let Some(unit) = game.unit_mut(unit_id) {
                    unit.action = None;
                }
            } else if let Some(unit) = game.unit_mut(unit_id) {
                unit.action = Some(UnitAction::Repair {
                    turns_left: turns_left - 1,
                });
            }
        }
        Some(UnitAction::Fortify) | None => {}
    }
}

fn progress_improvement(
    game: &mut GameState,
    unit_id: UnitId,
    owner: CivId,
    position: HexCoord,
    improvement: &str,
) {
    let Some(def) = game.ruleset.improvements.get(improvement).cloned() else {
        // Removed by a content change mid-construction: drop the order.
        log::warn!("improvement {improvement} vanished from ruleset, order dropped");
        if let Some(unit) = game.unit_mut(unit_id) {
            unit.action = None;
        }
        if let Some(tile) = game.map.get_mut(position) {
            tile.improvement_in_progress = None;
        }
        return;
    };
    let Some(tile) = game.map.get_mut(position) else {
        return;
    };
    let done = match &mut tile.improvement_in_progress {
        Some(progress) if progress.improvement == improvement => {
            progress.turns_left -= 1;
            progress.turns_left <= 0
        }
        _ => {
            tile.improvement_in_progress = Some(crate::map::ImprovementInProgress {
                improvement: improvement.to_string(),
                turns_left: def.turns_to_build - 1,
            });
            def.turns_to_build <= 1
        }
    };
    if done {
        tile.improvement_in_progress = None;
        if let Some(feature) = &def.removes_feature {
            if tile.feature.as_deref() == Some(feature.as_str()) {
                tile.feature = None;
            }
        } else {
            tile.improvement = Some(def.name.clone());
            tile.pillaged = false;
        }
        if let Some(unit) = game.unit_mut(unit_id) {
            unit.action = None;
        }
        game.civ_mut(owner).add_notification(
            format!("{} completed", def.name),
            NotificationCategory::Production,
            Some(position),
            &["improvement"],
        );
    }
}

fn progress_road(game: &mut GameState, unit_id: UnitId, owner: CivId, position: HexCoord) {
    let road = game
        .ruleset
        .best_road_for(game.civ(owner).techs.iter());
    if !road.is_some() {
        if let Some(unit) = game.unit_mut(unit_id) {
            unit.action = None;
        }
        return;
    }
    let Some(tile) = game.map.get_mut(position) else {
        return;
    };
    if tile.road >= road {
        if let Some(unit) = game.unit_mut(unit_id) {
            unit.action = None;
        }
        return;
    }
    // Road work is tracked through the same in-progress slot.
    let done = match &mut tile.improvement_in_progress {
        Some(progress) if progress.improvement == "Road" => {
            progress.turns_left -= 1;
            progress.turns_left <= 0
        }
        _ => {
            tile.improvement_in_progress = Some(crate::map::ImprovementInProgress {
                improvement: "Road".to_string(),
                turns_left: road.build_turns() - 1,
            });
            road.build_turns() <= 1
        }
    };
    if done {
        tile.improvement_in_progress = None;
        tile.road = road;
        if let Some(unit) = game.unit_mut(unit_id) {
            unit.action = None;
        }
    }
}

/// End-of-turn hook: fortified or resting units heal.
pub fn unit_end_turn(game: &mut GameState, unit_id: UnitId) {
    let Some(unit) = game.unit_mut(unit_id) else {
        log::debug!("end-turn hook skipped for missing unit {unit_id}");
        return;
    };
    let resting =
        matches!(unit.action, Some(UnitAction::Fortify)) || unit.movement_left > 0;
    if resting && unit.health < 100 {
        unit.health = (unit.health + 10).min(100);
    }
}
