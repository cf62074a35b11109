//! Civilization-level stat projection.
//!
//! `stats_for_next_turn` is a turn-scoped cache: it is recomputed at start
//! phase 2, again by the AI economy adjustment, and once more at end phase 2
//! before accrual. Everything in between reads the cache rather than
//! recomputing.

use crate::city::city_stats;
use crate::ruleset::Stats;
use crate::state::{CivId, GameState};
use crate::uniques::{civ_matching_uniques, civ_stat_bonus, StateForConditionals, UniqueType};

pub const STAT_NAMES: [&str; 7] = [
    "food",
    "production",
    "gold",
    "science",
    "culture",
    "faith",
    "happiness",
];

/// Units beyond this count cost 1 gold per turn each.
const FREE_UNITS_FROM_MAINTENANCE: i32 = 3;

/// Sum of single-percent-parameter uniques of the given type.
fn percent_sum(game: &GameState, civ_id: CivId, unique_type: UniqueType) -> i32 {
    let state = StateForConditionals::for_civ(game, civ_id);
    civ_matching_uniques(game, civ_id, unique_type, &state)
        .iter()
        .filter_map(|u| u.param_i32(0))
        .sum()
}

/// Gold upkeep for the civ's standing units, after discounts.
pub fn unit_maintenance(game: &GameState, civ_id: CivId) -> i32 {
    let over = (game.civ(civ_id).units.len() as i32 - FREE_UNITS_FROM_MAINTENANCE).max(0);
    let discount = percent_sum(game, civ_id, UniqueType::UnitMaintenanceDiscount);
    over * (100 - discount).max(0) / 100
}

/// Compute the per-turn stat projection without writing it anywhere.
pub fn compute_civ_stats(game: &GameState, civ_id: CivId) -> Stats {
    let civ = game.civ(civ_id);

    let mut stats = Stats::ZERO;
    for &city_id in &civ.cities {
        stats += city_stats(game, city_id);
    }

    for stat in STAT_NAMES {
        let flat = civ_stat_bonus(game, civ_id, UniqueType::StatsPerTurn, stat);
        if flat != 0 {
            stats.add_named(stat, flat);
        }
    }

    // Science-to-gold diversion (AI economy knob, see start phase 3).
    let diverted = stats.science * civ.science_to_gold_percent.clamp(0, 100) / 100;
    stats.science -= diverted;
    stats.gold += diverted;

    for stat in STAT_NAMES {
        let percent = civ_stat_bonus(game, civ_id, UniqueType::StatPercentBonus, stat);
        if percent != 0 {
            stats.scale_named(stat, percent);
        }
    }

    // Golden age: +25% gold and culture on top of everything else.
    if civ.golden_age_turns > 0 {
        stats.gold += stats.gold / 4;
        stats.culture += stats.culture / 4;
    }

    stats.gold -= unit_maintenance(game, civ_id);
    stats
}

/// Recompute and store `stats_for_next_turn` for one civilization.
pub fn update_stats_for_next_turn(game: &mut GameState, civ_id: CivId) {
    let stats = compute_civ_stats(game, civ_id);
    game.civ_mut(civ_id).stats_for_next_turn = stats;
}

/// Unhappiness-driven revolt risk score, after reductions.
pub fn revolt_risk(game: &GameState, civ_id: CivId) -> i32 {
    let unhappiness = (-game.civ(civ_id).stats_for_next_turn.happiness).max(0);
    let reduction = percent_sum(game, civ_id, UniqueType::ReducedRevoltRisk);
    unhappiness * (100 - reduction).max(0) / 100
}

fn compute_military_might(game: &GameState, civ_id: CivId) -> i32 {
    let civ = game.civ(civ_id);
    let strength: i32 = civ
        .units
        .iter()
        .filter_map(|&id| game.unit(id))
        .filter_map(|u| game.ruleset.units.get(&u.base))
        .map(|def| def.strength)
        .sum();
    // Treasury buys emergency forces; weigh it in lightly.
    strength + civ.gold.max(0) / 20
}

/// Cached military-might estimate; recomputed lazily after invalidation.
pub fn military_might(game: &mut GameState, civ_id: CivId) -> i32 {
    if let Some(might) = game.civ(civ_id).military_might {
        return might;
    }
    let might = compute_military_might(game, civ_id);
    game.civ_mut(civ_id).military_might = Some(might);
    might
}
