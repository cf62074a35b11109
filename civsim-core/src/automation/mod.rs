//! Worker automation.
//!
//! Decides one turn's action for a single automated improvement-capable
//! unit: road work toward under-connected cities, improving or repairing
//! the current tile, relocating to a more valuable tile, or idling.
//!
//! All shared per-civ computation lives in [`WorkerCache`], rebuilt lazily
//! once per civilization per turn and owned exclusively by that
//! civilization. A stale cache (turn mismatch) is discarded wholesale and
//! rebuilt, never patched.

pub mod forts;
pub mod roads;
pub mod tile_ranking;

pub use forts::evaluate_fort_placement;
pub use tile_ranking::{choose_improvement, tile_priority};

use crate::hex::HexCoord;
use crate::map::RoadStatus;
use crate::state::{CityId, CivId, GameState, UnitId};
use crate::unit::{can_move_to, head_towards, UnitAction};
use hex_pathfinding::BoundedBfs;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};

/// Turns a worker spends clearing pillage from a tile.
const REPAIR_TURNS: i32 = 2;

/// Per-civilization, per-turn shared state for worker decisions.
#[derive(Debug, Clone)]
pub struct WorkerCache {
    /// Turn this cache was computed for. A mismatch invalidates everything.
    pub turn: u32,
    /// Best road type the civ's techs currently allow.
    pub best_road: RoadStatus,
    /// Owned cities not yet capital-connected, population-gated, razing and
    /// capital excluded, ordered nearest-to-capital first.
    pub cities_needing_connection: Vec<CityId>,
    /// Center tiles of cities already connected to the capital.
    pub connected_city_tiles: Vec<HexCoord>,
    /// One reusable search per connection target, rooted at its center.
    pub bfs_cache: FxHashMap<CityId, BoundedBfs<HexCoord>>,
    /// Targets confirmed unreachable this turn (search exhausted, not just
    /// a failed attempt). Never retried until the cache is rebuilt.
    pub unreachable: FxHashSet<CityId>,
}

impl WorkerCache {
    pub fn rebuild(game: &GameState, civ_id: CivId) -> Self {
        let civ = game.civ(civ_id);
        let capital_center = game
            .capital_of(civ_id)
            .and_then(|id| game.city(id))
            .map(|c| c.center);

        let mut needing: Vec<CityId> = Vec::new();
        let mut connected_tiles: Vec<HexCoord> = Vec::new();
        for &city_id in &civ.cities {
            let Some(city) = game.city(city_id) else {
                continue;
            };
            if civ.cities_connected_to_capital.contains(&city_id) {
                connected_tiles.push(city.center);
            } else if !city.is_being_razed
                && !city.is_capital
                && city.population > game.config.city_connection_min_population
            {
                needing.push(city_id);
            }
        }
        if let Some(capital) = capital_center {
            needing.sort_by_key(|&id| {
                let dist = game
                    .city(id)
                    .map(|c| c.center.distance(capital))
                    .unwrap_or(i32::MAX);
                (dist, id)
            });
        }

        Self {
            turn: game.turn,
            best_road: game.ruleset.best_road_for(civ.techs.iter()),
            cities_needing_connection: needing,
            connected_city_tiles: connected_tiles,
            bfs_cache: FxHashMap::default(),
            unreachable: FxHashSet::default(),
        }
    }
}

fn take_cache(game: &mut GameState, civ_id: CivId) -> WorkerCache {
    match game.civ_mut(civ_id).worker_cache.take() {
        Some(cache) if cache.turn == game.turn => cache,
        _ => WorkerCache::rebuild(game, civ_id),
    }
}

/// Run one automated worker's decision ladder for this turn.
pub fn automate_worker(game: &mut GameState, unit_id: UnitId) {
    let Some(unit) = game.unit(unit_id) else {
        return;
    };
    let civ_id = unit.owner;
    // The cache is exclusively this civ's; take it out for the duration so
    // the decision logic can borrow the game freely.
    let mut cache = take_cache(game, civ_id);
    decide(game, unit_id, civ_id, &mut cache);
    game.civ_mut(civ_id).worker_cache = Some(cache);
}

fn decide(game: &mut GameState, unit_id: UnitId, civ_id: CivId, cache: &mut WorkerCache) {
    let Some(unit) = game.unit(unit_id) else {
        return;
    };
    // Work in progress continues; re-deciding every turn would thrash.
    match unit.action {
        Some(UnitAction::BuildImprovement { .. })
        | Some(UnitAction::BuildRoad)
        | Some(UnitAction::Repair { .. }) => return,
        Some(UnitAction::Fortify) | None => {}
    }
    if unit.movement_left <= 0 {
        return;
    }
    let position = unit.position;

    // 1. Road work first when no nearby tile is urgent enough.
    let best_tile = find_tile_to_work(game, civ_id, unit_id, position);
    let best_priority = best_tile
        .map(|t| tile_priority(game, civ_id, t))
        .unwrap_or(0);
    if best_priority < game.config.road_priority_threshold
        && roads::try_connecting_cities(game, unit_id, cache)
    {
        return;
    }

    // 2. Relocate toward the most valuable workable tile.
    if let Some(target) = best_tile {
        if target != position {
            while game.unit(unit_id).map(|u| u.movement_left > 0).unwrap_or(false)
                && game.unit(unit_id).map(|u| u.position != target).unwrap_or(false)
            {
                if !head_towards(game, unit_id, target) {
                    break;
                }
            }
            let arrived = game
                .unit(unit_id)
                .map(|u| u.position == target)
                .unwrap_or(false);
            if !arrived {
                return;
            }
        }
    }

    let Some(position) = game.unit(unit_id).map(|u| u.position) else {
        return;
    };

    // 3. Repair beats rebuilding.
    if game.map.get(position).map(|t| t.pillaged).unwrap_or(false) {
        if let Some(unit) = game.unit_mut(unit_id) {
            unit.action = Some(UnitAction::Repair {
                turns_left: REPAIR_TURNS,
            });
        }
        return;
    }

    // 4. Improve in place.
    if let Some(improvement) = choose_improvement(game, civ_id, position) {
        if let Some(tile) = game.map.get(position) {
            if tile.improvement.as_ref() != Some(&improvement) {
                if let Some(unit) = game.unit_mut(unit_id) {
                    unit.action = Some(UnitAction::BuildImprovement { improvement });
                }
                return;
            }
        }
    }
    if evaluate_fort_placement(game, civ_id, position, false) {
        if let Some(unit) = game.unit_mut(unit_id) {
            unit.action = Some(UnitAction::BuildImprovement {
                improvement: "Fort".to_string(),
            });
        }
        return;
    }

    // 5. Retarget toward the city with the most outstanding land work.
    if let Some(center) = city_needing_workers(game, civ_id, position) {
        if center != position {
            head_towards(game, unit_id, center);
            return;
        }
    }

    // 6. Idle. City-state workers wander inside their territory instead of
    // parking on one tile forever.
    if game.civ(civ_id).is_city_state() {
        wander(game, unit_id, civ_id);
    }
}

/// Most valuable workable tile within the search radius; the current tile
/// wins ties so workers do not oscillate. Deterministic: candidates come
/// from `coords_in_distance`, which has a fixed order.
fn find_tile_to_work(
    game: &GameState,
    civ_id: CivId,
    unit_id: UnitId,
    position: HexCoord,
) -> Option<HexCoord> {
    let radius = game.config.worker_search_radius;
    let mut best: Option<(HexCoord, i32)> = None;
    // coords_in_distance excludes its center, so the unit's own tile goes in
    // by hand, and first, to win ties.
    let candidates =
        std::iter::once(position).chain(game.map.coords_in_distance(position, radius));
    for coord in candidates {
        if !tile_can_be_worked(game, civ_id, coord) {
            continue;
        }
        if coord != position && !can_move_to(game, unit_id, coord) {
            continue;
        }
        let priority = tile_priority(game, civ_id, coord);
        if priority <= 0 {
            continue;
        }
        let better = match best {
            Some((current, best_priority)) => {
                priority > best_priority
                    || (priority == best_priority
                        && position.distance(coord) < position.distance(current)
                        && current != position)
            }
            None => true,
        };
        if better {
            best = Some((coord, priority));
        }
    }
    best.map(|(coord, _)| coord)
}

/// Whether the civ's workers have anything to do on this tile.
fn tile_can_be_worked(game: &GameState, civ_id: CivId, coord: HexCoord) -> bool {
    let Some(tile) = game.map.get(coord) else {
        return false;
    };
    if tile.owner != Some(civ_id) || game.is_city_center(coord) {
        return false;
    }
    tile.pillaged || choose_improvement(game, civ_id, coord).is_some()
}

/// Owned city with the most unimproved or pillaged land tiles in its work
/// radius; used when nothing local is worth doing.
fn city_needing_workers(game: &GameState, civ_id: CivId, from: HexCoord) -> Option<HexCoord> {
    let mut best: Option<(HexCoord, usize)> = None;
    for &city_id in &game.civ(civ_id).cities {
        let Some(city) = game.city(city_id) else {
            continue;
        };
        let outstanding = game
            .map
            .coords_in_distance(city.center, crate::city::CITY_WORK_RADIUS)
            .into_iter()
            .filter(|&c| tile_can_be_worked(game, civ_id, c))
            .count();
        if outstanding == 0 {
            continue;
        }
        let better = match best {
            Some((current, count)) => {
                outstanding > count
                    || (outstanding == count && from.distance(city.center) < from.distance(current))
            }
            None => true,
        };
        if better {
            best = Some((city.center, outstanding));
        }
    }
    best.map(|(center, _)| center)
}

/// Aimless but deterministic: step onto a random adjacent tile inside own
/// territory so minor-civ workers do not block city centers.
fn wander(game: &mut GameState, unit_id: UnitId, civ_id: CivId) {
    let Some(position) = game.unit(unit_id).map(|u| u.position) else {
        return;
    };
    let options: Vec<HexCoord> = game
        .map
        .neighbors(position)
        .into_iter()
        .filter(|&c| game.map.get(c).map(|t| t.owner == Some(civ_id)).unwrap_or(false))
        .filter(|&c| can_move_to(game, unit_id, c))
        .filter(|&c| !game.is_city_center(c))
        .collect();
    if options.is_empty() {
        return;
    }
    let mut rng = game.rng_for_turn();
    let pick = options[rng.gen_range(0..options.len())];
    crate::unit::move_unit(game, unit_id, pick);
}
