//! Cities and their turn hooks.
//!
//! Production/construction queues are an external concern; only the turn
//! hooks the turn manager needs are implemented here.

use crate::hex::HexCoord;
use crate::notifications::NotificationCategory;
use crate::ruleset::Stats;
use crate::state::{CityId, CivId, GameState};
use crate::uniques::Unique;
use serde::{Deserialize, Serialize};

/// Radius of the tile ring a city draws yields from.
pub const CITY_WORK_RADIUS: i32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub owner: CivId,
    pub center: HexCoord,
    pub population: i32,
    pub food_stored: i32,
    /// Original capital of its founder.
    pub is_capital: bool,
    pub is_being_razed: bool,
    /// Uniques contributed by the city's buildings and wonders.
    pub uniques: Vec<Unique>,
}

impl City {
    pub fn new(id: CityId, name: &str, owner: CivId, center: HexCoord) -> Self {
        Self {
            id,
            name: name.to_string(),
            owner,
            center,
            population: 1,
            food_stored: 0,
            is_capital: false,
            is_being_razed: false,
            uniques: Vec::new(),
        }
    }

    /// Food needed to grow to the next population point.
    pub fn growth_threshold(&self) -> i32 {
        10 + 5 * self.population
    }
}

/// Yields of a single city: a population-driven base plus every improved,
/// owned tile in the work radius.
pub fn city_stats(game: &GameState, city_id: CityId) -> Stats {
    let Some(city) = game.city(city_id) else {
        return Stats::ZERO;
    };
    let mut stats = Stats {
        food: 2,
        production: city.population,
        gold: city.population,
        science: city.population,
        culture: 1,
        faith: 0,
        happiness: -(city.population / 2),
    };
    for coord in game.map.coords_in_distance(city.center, CITY_WORK_RADIUS) {
        let Some(tile) = game.map.get(coord) else {
            continue;
        };
        if tile.owner == Some(city.owner) && tile.improvement.is_some() {
            stats += tile.stats(&game.ruleset);
        }
    }
    stats
}

/// Start-of-turn hook. Must not abort the caller's loop: any missing
/// referenced entity is a local skip.
pub fn city_start_turn(game: &mut GameState, city_id: CityId) {
    let Some(city) = game.city(city_id) else {
        log::debug!("start-turn hook skipped for missing city {city_id}");
        return;
    };
    let owner = city.owner;
    let center = city.center;

    // Reassert tile ownership around the center; terrain the ruleset no
    // longer knows stays unowned rather than failing the hook.
    for coord in game.map.coords_in_distance(center, 1) {
        if let Some(tile) = game.map.get_mut(coord) {
            if tile.owner.is_none() {
                tile.owner = Some(owner);
            }
        }
    }
    if let Some(tile) = game.map.get_mut(center) {
        tile.owner = Some(owner);
    }
}

/// End-of-turn hook: growth, starvation, and razing. Cities being razed are
/// processed before others by the turn manager so tile-ownership races
/// resolve in the razing city's favor.
pub fn city_end_turn(game: &mut GameState, city_id: CityId) {
    let Some(city) = game.city(city_id) else {
        log::debug!("end-turn hook skipped for missing city {city_id}");
        return;
    };
    let owner = city.owner;

    if city.is_being_razed {
        let Some(city) = game.city_mut(city_id) else {
            return;
        };
        city.population -= 1;
        if city.population <= 0 {
            let name = city.name.clone();
            let center = city.center;
            game.remove_city(city_id);
            game.civ_mut(owner).add_notification(
                format!("{name} has been razed to the ground!"),
                NotificationCategory::Cities,
                Some(center),
                &["city/razed"],
            );
        }
        return;
    }

    let food = city_stats(game, city_id).food;
    let Some(city) = game.city_mut(city_id) else {
        return;
    };
    // Each population point eats two food; the rest is growth surplus.
    city.food_stored += food - 2 * city.population;
    if city.food_stored >= city.growth_threshold() {
        city.food_stored = 0;
        city.population += 1;
        let name = city.name.clone();
        let center = city.center;
        game.civ_mut(owner).add_notification(
            format!("{name} has grown!"),
            NotificationCategory::Cities,
            Some(center),
            &["city/growth"],
        );
    } else if city.food_stored < 0 {
        city.food_stored = 0;
        if city.population > 1 {
            city.population -= 1;
            let name = city.name.clone();
            let center = city.center;
            game.civ_mut(owner).add_notification(
                format!("{name} is starving!"),
                NotificationCategory::Cities,
                Some(center),
                &["city/starving"],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::GameStateBuilder;

    #[test]
    fn test_city_stats_include_improved_owned_tiles() {
        let mut game = GameStateBuilder::new()
            .with_map_radius(3)
            .with_civ("Rome")
            .with_city(0, HexCoord::new(0, 0), true)
            .build();
        let city_id = game.civ(0).cities[0];
        let base = city_stats(&game, city_id);

        let coord = HexCoord::new(1, 0);
        {
            let tile = game.map.get_mut(coord).unwrap();
            tile.owner = Some(0);
            tile.improvement = Some("Farm".to_string());
        }
        let with_farm = city_stats(&game, city_id);
        // Grassland 2 food + farm 1 food.
        assert_eq!(with_farm.food, base.food + 3);
    }

    #[test]
    fn test_razing_removes_city_at_zero_population() {
        let mut game = GameStateBuilder::new()
            .with_map_radius(2)
            .with_civ("Rome")
            .with_city(0, HexCoord::new(0, 0), true)
            .build();
        let city_id = game.civ(0).cities[0];
        game.city_mut(city_id).unwrap().is_being_razed = true;

        city_end_turn(&mut game, city_id);
        assert!(game.city(city_id).is_none());
        assert!(game.civ(0).cities.is_empty());
    }

    #[test]
    fn test_missing_city_hook_is_a_skip() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        // Hook on a nonexistent id must be a no-op, never a panic.
        city_start_turn(&mut game, 999);
        city_end_turn(&mut game, 999);
    }
}
