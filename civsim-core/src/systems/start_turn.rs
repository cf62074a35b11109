//! Start-of-turn phase implementations.

use crate::civilization::flag;
use crate::hex::HexCoord;
use crate::map::TileMap;
use crate::notifications::NotificationCategory;
use crate::state::{CivId, GameState};
use crate::systems::{stats, victory, StartTurnPhase};
use crate::triggers::drain_pending_triggers;
use crate::uniques::{Unique, UniqueType};
use crate::unit::{is_worker, unit_start_turn};
use hex_pathfinding::{BoundedBfs, Graph};
use rustc_hash::FxHashSet;

pub fn run_phase(game: &mut GameState, civ_id: CivId, phase: StartTurnPhase) {
    match phase {
        StartTurnPhase::ResetTransients => reset_transients(game, civ_id),
        StartTurnPhase::UpdateStatsForNextTurn => stats::update_stats_for_next_turn(game, civ_id),
        StartTurnPhase::AiEconomyAdjust => ai_economy_adjust(game, civ_id),
        StartTurnPhase::SpawnGreatPerson => spawn_great_person(game, civ_id),
        StartTurnPhase::AdvanceReligion => advance_religion(game, civ_id),
        StartTurnPhase::RefreshVisibilityAndConnectivity => {
            refresh_visibility_and_connectivity(game, civ_id)
        }
        StartTurnPhase::CountDownFlags => count_down_flags(game, civ_id),
        StartTurnPhase::EvaluateRevoltRisk => evaluate_revolt_risk(game, civ_id),
        StartTurnPhase::CityStartTurn => city_hooks(game, civ_id),
        StartTurnPhase::UnitStartTurn => unit_hooks(game, civ_id),
        StartTurnPhase::AutomateUnits => automate_units(game, civ_id),
        StartTurnPhase::RefreshResources => refresh_resources(game, civ_id),
        StartTurnPhase::PurgeStaleTradeRequests => purge_stale_trade_requests(game, civ_id),
        StartTurnPhase::CheckVictory => victory::check_victory(game),
    }
}

/// Phase 1: clear per-turn trackers and drain triggers queued between turns.
fn reset_transients(game: &mut GameState, civ_id: CivId) {
    game.civ_mut(civ_id).attacks_this_turn.clear();
    drain_pending_triggers(game);
}

/// Phase 3: AI-only economy knob. Deficits divert science output to gold in
/// 25% steps; surpluses wind the diversion back down.
fn ai_economy_adjust(game: &mut GameState, civ_id: CivId) {
    if !game.civ(civ_id).is_ai() {
        return;
    }
    let projected_gold = game.civ(civ_id).stats_for_next_turn.gold;
    let civ = game.civ_mut(civ_id);
    if projected_gold < 0 && civ.science_to_gold_percent < 100 {
        civ.science_to_gold_percent = (civ.science_to_gold_percent + 25).min(100);
    } else if projected_gold > 5 && civ.science_to_gold_percent > 0 {
        civ.science_to_gold_percent -= 25;
    } else {
        return;
    }
    // Later phases read the projection, so it must reflect the new knob.
    stats::update_stats_for_next_turn(game, civ_id);
}

/// Phase 4: spend banked great-person points on a new great person at the
/// capital. Requires at least one city.
fn spawn_great_person(game: &mut GameState, civ_id: CivId) {
    let threshold = game.config.great_person_threshold;
    let civ = game.civ(civ_id);
    if civ.cities.is_empty() || civ.great_person_points < threshold {
        return;
    }
    let Some(capital) = game.capital_of(civ_id).or_else(|| civ.cities.first().copied()) else {
        return;
    };
    let Some(center) = game.city(capital).map(|c| c.center) else {
        return;
    };
    let Some(base) = game
        .ruleset
        .units
        .values()
        .find(|d| d.great_person)
        .map(|d| d.name.clone())
    else {
        log::warn!("ruleset has no great-person unit; skipping spawn");
        return;
    };

    game.civ_mut(civ_id).great_person_points -= threshold;
    if game.add_unit(civ_id, center, &base).is_some() {
        game.civ_mut(civ_id).add_notification(
            format!("A {base} has been born!"),
            NotificationCategory::Units,
            Some(center),
            &["unit/great_person"],
        );
    }
}

/// Phase 5: found a religion once banked faith crosses the threshold.
fn advance_religion(game: &mut GameState, civ_id: CivId) {
    let threshold = game.config.religion_founding_faith;
    let civ = game.civ(civ_id);
    if civ.religion_founded.is_some() || civ.faith < threshold {
        return;
    }
    let religion = format!("Faith of {}", civ.name);
    let civ = game.civ_mut(civ_id);
    civ.religion_founded = Some(religion.clone());
    civ.founder_uniques = vec![Unique::new(UniqueType::StatsPerTurn, &["happiness", "1"])];
    civ.add_notification(
        format!("{religion} has been founded!"),
        NotificationCategory::Religion,
        None,
        &["religion/founded"],
    );
}

/// Tiles connect for capital-connectivity purposes when the destination has
/// an unpillaged road or is one of the searching civ's city centers.
pub struct ConnectivityContext<'a> {
    pub game: &'a GameState,
    pub civ: CivId,
}

impl<'a> Graph<HexCoord, ConnectivityContext<'a>> for TileMap {
    fn neighbors(&self, node: HexCoord, _ctx: &ConnectivityContext<'a>) -> Vec<HexCoord> {
        self.neighbors(node)
    }

    fn passable(&self, _from: HexCoord, to: HexCoord, ctx: &ConnectivityContext<'a>) -> bool {
        let Some(tile) = self.get(to) else {
            return false;
        };
        if tile.road.is_some() && !tile.pillaged {
            return true;
        }
        ctx.game
            .city_at(to)
            .map(|c| c.owner == ctx.civ)
            .unwrap_or(false)
    }
}

/// Phase 6 (also reused by `set_transients`): rebuild the viewable-tile set
/// and the connected-to-capital city set.
pub fn refresh_visibility_and_connectivity(game: &mut GameState, civ_id: CivId) {
    let mut viewable: FxHashSet<HexCoord> = FxHashSet::default();
    let civ = game.civ(civ_id);
    for &city_id in &civ.cities {
        if let Some(city) = game.city(city_id) {
            viewable.extend(game.map.coords_in_distance(city.center, crate::city::CITY_WORK_RADIUS));
        }
    }
    for &unit_id in &civ.units {
        if let Some(unit) = game.unit(unit_id) {
            viewable.extend(game.map.coords_in_distance(unit.position, 2));
        }
    }
    for tile in game.map.tiles() {
        if tile.owner == Some(civ_id) {
            viewable.insert(tile.position);
        }
    }

    let mut connected: FxHashSet<crate::state::CityId> = FxHashSet::default();
    if let Some(capital_id) = game.capital_of(civ_id) {
        connected.insert(capital_id);
        if let Some(capital_center) = game.city(capital_id).map(|c| c.center) {
            let ctx = ConnectivityContext { game, civ: civ_id };
            let mut bfs = BoundedBfs::new(capital_center, game.map.len());
            for &city_id in &game.civ(civ_id).cities {
                if city_id == capital_id {
                    continue;
                }
                let Some(center) = game.city(city_id).map(|c| c.center) else {
                    continue;
                };
                // Sequential seeks share one visited set; earlier layers are
                // never re-expanded.
                if bfs.seek(&game.map, &ctx, center) {
                    connected.insert(city_id);
                }
            }
        }
    }

    let civ = game.civ_mut(civ_id);
    civ.viewable_tiles = viewable;
    civ.cities_connected_to_capital = connected;
}

/// Phase 7: tick every named countdown down by one and fire the ones that
/// reach zero. A fired flag is removed first, so its effect may re-arm it.
fn count_down_flags(game: &mut GameState, civ_id: CivId) {
    let civ = game.civ_mut(civ_id);
    let mut due: Vec<String> = Vec::new();
    for (name, turns) in civ.flags.iter_mut() {
        *turns -= 1;
        if *turns <= 0 {
            due.push(name.clone());
        }
    }
    for name in &due {
        civ.flags.remove(name);
    }
    for name in due {
        fire_flag(game, civ_id, &name);
    }
}

fn fire_flag(game: &mut GameState, civ_id: CivId, name: &str) {
    match name {
        flag::REVOLT_BREWING => {
            let capital_center = game
                .capital_of(civ_id)
                .and_then(|id| game.city(id))
                .map(|c| c.center);
            let civ = game.civ_mut(civ_id);
            civ.gold -= 20;
            civ.add_notification(
                "Unrest has boiled over into open revolt!",
                NotificationCategory::War,
                capital_center,
                &["event/revolt"],
            );
        }
        flag::CITY_STATE_GIFT => {
            let Some(ally) = game.civ(civ_id).ally else {
                return;
            };
            let patron_name = game.civ(ally).name.clone();
            let own_name = game.civ(civ_id).name.clone();
            game.civ_mut(ally).gold += 30;
            game.civ_mut(ally).add_notification(
                format!("{own_name} has sent you a gift of 30 gold!"),
                NotificationCategory::Diplomacy,
                None,
                &["civ/city_state"],
            );
            log::debug!("{own_name} gifted 30 gold to patron {patron_name}");
        }
        other => {
            log::debug!("flag {other:?} expired for civ {civ_id} with no effect");
        }
    }
}

/// Phase 8: arm the revolt countdown when risk crosses the threshold;
/// disarm it when order is fully restored.
fn evaluate_revolt_risk(game: &mut GameState, civ_id: CivId) {
    let risk = stats::revolt_risk(game, civ_id);
    let threshold = game.config.revolt_risk_threshold;
    let countdown = game.config.revolt_countdown_turns;
    let civ = game.civ_mut(civ_id);
    if risk >= threshold && !civ.has_flag(flag::REVOLT_BREWING) {
        civ.add_flag(flag::REVOLT_BREWING, countdown);
        civ.add_notification(
            format!("Unrest is brewing! A revolt will break out in {countdown} turns."),
            NotificationCategory::War,
            None,
            &["event/unrest"],
        );
    } else if risk == 0 && civ.has_flag(flag::REVOLT_BREWING) {
        civ.remove_flag(flag::REVOLT_BREWING);
        civ.add_notification(
            "Order has been restored.",
            NotificationCategory::General,
            None,
            &["event/order"],
        );
    }
}

/// Phase 9: each city's start-turn hook, isolated per entity.
fn city_hooks(game: &mut GameState, civ_id: CivId) {
    for city_id in game.civ(civ_id).cities.clone() {
        crate::city::city_start_turn(game, city_id);
    }
}

/// Phase 10: each unit's start-turn hook, isolated per entity.
fn unit_hooks(game: &mut GameState, civ_id: CivId) {
    for unit_id in game.civ(civ_id).units.clone() {
        unit_start_turn(game, unit_id);
    }
}

/// Phase 11: execute standing automation orders.
fn automate_units(game: &mut GameState, civ_id: CivId) {
    for unit_id in game.civ(civ_id).units.clone() {
        let automated = game.unit(unit_id).map(|u| u.automated).unwrap_or(false);
        if automated && is_worker(game, unit_id) {
            crate::automation::automate_worker(game, unit_id);
        }
    }
}

/// Phase 12 (also reused by `set_transients`): recount resources provided
/// by owned, improved, tech-visible tiles.
pub fn refresh_resources(game: &mut GameState, civ_id: CivId) {
    let mut owned: std::collections::BTreeMap<String, i32> = std::collections::BTreeMap::new();
    for tile in game.map.tiles() {
        if tile.owner != Some(civ_id) {
            continue;
        }
        if !tile.has_viewable_resource(&game.ruleset, |t| game.civ(civ_id).has_tech(t)) {
            continue;
        }
        let Some(resource) = tile.resource.as_ref() else {
            continue;
        };
        let Some(def) = game.ruleset.resources.get(resource) else {
            continue;
        };
        let extracted = game.is_city_center(tile.position)
            || (def.improvement.is_some() && tile.improvement == def.improvement && !tile.pillaged);
        if extracted {
            *owned.entry(resource.clone()).or_insert(0) += 1;
        }
    }
    game.civ_mut(civ_id).owned_resources = owned;
}

/// Phase 13: drop trade requests whose counterparty can no longer deliver.
fn purge_stale_trade_requests(game: &mut GameState, civ_id: CivId) {
    let keep: Vec<bool> = game
        .civ(civ_id)
        .trade_requests
        .iter()
        .map(|req| {
            if (req.from as usize) >= game.civilizations.len() {
                return false;
            }
            let from = game.civ(req.from);
            if from.is_defeated() || from.gold < req.offered_gold {
                return false;
            }
            match &req.offered_resource {
                Some(resource) => {
                    from.owned_resources.get(resource).copied().unwrap_or(0)
                        + from.resource_stockpile.get(resource).copied().unwrap_or(0)
                        > 0
                }
                None => true,
            }
        })
        .collect();
    let civ = game.civ_mut(civ_id);
    let mut it = keep.iter();
    let before = civ.trade_requests.len();
    civ.trade_requests.retain(|_| *it.next().unwrap_or(&false));
    let purged = before - civ.trade_requests.len();
    if purged > 0 {
        log::debug!("purged {purged} stale trade requests for civ {civ_id}");
    }
}
