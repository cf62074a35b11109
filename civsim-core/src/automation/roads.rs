//! Road planning toward under-connected cities.

use super::WorkerCache;
use crate::hex::HexCoord;
use crate::map::RoadSearchContext;
use crate::state::{GameState, UnitId};
use crate::unit::{can_reach_this_turn, head_towards, UnitAction};
use hex_pathfinding::{BoundedBfs, SearchState};

/// Tile count of a hexagonal disk of the given radius.
fn hexagon_size(radius: i32) -> usize {
    let r = radius.max(0) as usize;
    3 * r * (r + 1) + 1
}

/// Try to get this worker building a road toward a city that needs a
/// capital connection. Returns whether road work was taken up.
///
/// Targets are walked nearest-to-capital first. Each target keeps one
/// bounded BFS rooted at its center, sized from the minimum aerial distance
/// to any already-connected city plus a padding constant; the search is
/// reused across workers within the turn. A target is written off only
/// when its search is `Exhausted` — a failed attempt with budget remaining
/// is not proof of unreachability.
pub fn try_connecting_cities(
    game: &mut GameState,
    unit_id: UnitId,
    cache: &mut WorkerCache,
) -> bool {
    if !cache.best_road.is_some() || cache.connected_city_tiles.is_empty() {
        return false;
    }
    let Some(unit) = game.unit(unit_id) else {
        return false;
    };
    let civ_id = unit.owner;

    for city_id in cache.cities_needing_connection.clone() {
        if cache.unreachable.contains(&city_id) {
            continue;
        }
        let Some(center) = game.city(city_id).map(|c| c.center) else {
            continue;
        };

        // Connected endpoints, nearest to this target first.
        let mut endpoints = cache.connected_city_tiles.clone();
        endpoints.sort_by_key(|t| (t.distance(center), *t));
        let min_distance = endpoints[0].distance(center);
        if min_distance > game.config.city_connection_max_distance {
            continue;
        }

        cache.bfs_cache.entry(city_id).or_insert_with(|| {
            BoundedBfs::new(center, hexagon_size(min_distance + game.config.bfs_padding))
        });

        // Search in a narrower scope: the context read-borrows the game,
        // which road work below mutates.
        let mut found_path: Option<Vec<HexCoord>> = None;
        {
            let Some(bfs) = cache.bfs_cache.get_mut(&city_id) else {
                continue;
            };
            let ctx = RoadSearchContext { game, civ: civ_id };
            for endpoint in endpoints {
                if bfs.seek(&game.map, &ctx, endpoint) {
                    found_path = bfs.path_to(endpoint);
                    break;
                }
            }
        }

        match found_path {
            Some(path) => {
                if begin_road_work(game, unit_id, cache.best_road, &path) {
                    return true;
                }
                // Path fully roaded already; the connectivity refresh picks
                // the city up next turn. Look at the next target.
            }
            None => {
                if cache
                    .bfs_cache
                    .get(&city_id)
                    .map(|b| b.state() == SearchState::Exhausted)
                    .unwrap_or(false)
                {
                    cache.unreachable.insert(city_id);
                }
            }
        }
    }
    false
}

/// Move to (or stand on) the best tile of the path still missing a road
/// and start construction. Prefers the unit's current tile, then the
/// nearest tile it can reach this turn, then just travels toward the
/// nearest one.
fn begin_road_work(
    game: &mut GameState,
    unit_id: UnitId,
    best_road: crate::map::RoadStatus,
    path: &[HexCoord],
) -> bool {
    let Some(unit) = game.unit(unit_id) else {
        return false;
    };
    let position = unit.position;
    let needs_road = |game: &GameState, coord: HexCoord| {
        game.map
            .get(coord)
            .map(|t| t.road < best_road)
            .unwrap_or(false)
    };

    let target = if path.contains(&position) && needs_road(game, position) {
        position
    } else {
        let reachable = path
            .iter()
            .copied()
            .filter(|&c| needs_road(game, c))
            .filter(|&c| can_reach_this_turn(game, unit_id, c))
            .min_by_key(|&c| (position.distance(c), c));
        match reachable {
            Some(c) => c,
            None => {
                let Some(nearest) = path
                    .iter()
                    .copied()
                    .filter(|&c| needs_road(game, c))
                    .min_by_key(|&c| (position.distance(c), c))
                else {
                    return false;
                };
                // Travelling only counts as taking up the work if the unit
                // actually moved.
                return head_towards(game, unit_id, nearest);
            }
        }
    };

    while game
        .unit(unit_id)
        .map(|u| u.position != target && u.movement_left > 0)
        .unwrap_or(false)
    {
        if !head_towards(game, unit_id, target) {
            break;
        }
    }
    let Some(unit) = game.unit_mut(unit_id) else {
        return false;
    };
    if unit.position == target {
        unit.action = Some(UnitAction::BuildRoad);
        return true;
    }
    unit.position != position
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::WorkerCache;
    use crate::map::RoadStatus;
    use crate::testing::GameStateBuilder;

    fn game_with_two_cities() -> GameState {
        let mut game = GameStateBuilder::new()
            .with_map_radius(4)
            .with_civ("Rome")
            .with_city(0, HexCoord::new(-2, 0), true)
            .with_city(0, HexCoord::new(2, 0), false)
            .with_tech(0, "Agriculture")
            .with_tech(0, "Animal Husbandry")
            .with_tech(0, "The Wheel")
            .with_unit(0, HexCoord::new(-1, 0), "Worker")
            .build();
        let second = game.civ(0).cities[1];
        game.city_mut(second).unwrap().population = 4;
        crate::systems::refresh_visibility_and_connectivity(&mut game, 0);
        game
    }

    #[test]
    fn test_worker_takes_up_road_work() {
        let mut game = game_with_two_cities();
        let unit_id = game.civ(0).units[0];
        game.unit_mut(unit_id).unwrap().movement_left = 2;
        let mut cache = WorkerCache::rebuild(&game, 0);
        assert_eq!(cache.cities_needing_connection.len(), 1);

        assert!(try_connecting_cities(&mut game, unit_id, &mut cache));
        let unit = game.unit(unit_id).unwrap();
        assert_eq!(unit.action, Some(UnitAction::BuildRoad));
    }

    #[test]
    fn test_immobile_worker_does_not_claim_road_work() {
        let mut game = game_with_two_cities();
        let unit_id = game.civ(0).units[0];
        // Off the road line, with no movement to travel back.
        crate::unit::move_unit(&mut game, unit_id, HexCoord::new(0, 3));
        game.unit_mut(unit_id).unwrap().movement_left = 0;

        let path: Vec<HexCoord> = (-2..=2).map(|q| HexCoord::new(q, 0)).collect();
        assert!(!begin_road_work(&mut game, unit_id, RoadStatus::Road, &path));
        let unit = game.unit(unit_id).unwrap();
        assert_eq!(unit.action, None);
        assert_eq!(unit.position, HexCoord::new(0, 3));
    }

    #[test]
    fn test_no_road_tech_means_no_road_work() {
        let mut game = GameStateBuilder::new()
            .with_map_radius(4)
            .with_civ("Rome")
            .with_city(0, HexCoord::new(-2, 0), true)
            .with_city(0, HexCoord::new(2, 0), false)
            .with_unit(0, HexCoord::new(-1, 0), "Worker")
            .build();
        let unit_id = game.civ(0).units[0];
        let mut cache = WorkerCache::rebuild(&game, 0);
        assert_eq!(cache.best_road, RoadStatus::None);
        assert!(!try_connecting_cities(&mut game, unit_id, &mut cache));
    }

    #[test]
    fn test_unreachable_target_dropped_only_on_exhaustion() {
        let mut game = game_with_two_cities();
        // Wall the target city off with mountains.
        let center = game.city(game.civ(0).cities[1]).unwrap().center;
        for coord in game.map.neighbors(center) {
            game.map.get_mut(coord).unwrap().terrain = "Mountain".to_string();
        }
        let unit_id = game.civ(0).units[0];
        game.unit_mut(unit_id).unwrap().movement_left = 2;
        let mut cache = WorkerCache::rebuild(&game, 0);
        let target = cache.cities_needing_connection[0];

        assert!(!try_connecting_cities(&mut game, unit_id, &mut cache));
        assert!(cache.unreachable.contains(&target));
        assert_eq!(
            cache.bfs_cache[&target].state(),
            SearchState::Exhausted
        );
    }

    #[test]
    fn test_bfs_is_reused_across_workers() {
        let mut game = game_with_two_cities();
        game.add_unit(0, HexCoord::new(0, 1), "Worker");
        let mut cache = WorkerCache::rebuild(&game, 0);
        let target = cache.cities_needing_connection[0];

        for &unit_id in &game.civ(0).units.clone() {
            game.unit_mut(unit_id).unwrap().movement_left = 2;
            try_connecting_cities(&mut game, unit_id, &mut cache);
        }
        // One search served both workers.
        assert_eq!(cache.bfs_cache.len(), 1);
        assert_eq!(cache.bfs_cache[&target].state(), SearchState::Succeeded);
    }
}
