//! Test scaffolding: a declarative [`GameStateBuilder`] over the
//! self-contained test ruleset.
//!
//! Lives in the library (not behind `cfg(test)`) so downstream crates and
//! the self-play driver can assemble small worlds the same way the unit
//! tests do.

use crate::civilization::{CivKind, Civilization};
use crate::hex::HexCoord;
use crate::map::TileMap;
use crate::ruleset::Ruleset;
use crate::state::{CivId, GameState};

pub struct GameStateBuilder {
    map_radius: i32,
    civs: Vec<(String, CivKind)>,
    cities: Vec<(CivId, HexCoord, bool)>,
    units: Vec<(CivId, HexCoord, String)>,
    techs: Vec<(CivId, String)>,
}

impl Default for GameStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStateBuilder {
    pub fn new() -> Self {
        Self {
            map_radius: 2,
            civs: Vec::new(),
            cities: Vec::new(),
            units: Vec::new(),
            techs: Vec::new(),
        }
    }

    pub fn with_map_radius(mut self, radius: i32) -> Self {
        self.map_radius = radius;
        self
    }

    /// Add a major civilization. Ids are assigned in call order from 0.
    pub fn with_civ(mut self, nation: &str) -> Self {
        self.civs.push((nation.to_string(), CivKind::Major));
        self
    }

    pub fn with_city_state(mut self, nation: &str) -> Self {
        self.civs.push((nation.to_string(), CivKind::CityState));
        self
    }

    pub fn with_city(mut self, civ: CivId, center: HexCoord, capital: bool) -> Self {
        self.cities.push((civ, center, capital));
        self
    }

    pub fn with_unit(mut self, civ: CivId, position: HexCoord, base: &str) -> Self {
        self.units.push((civ, position, base.to_string()));
        self
    }

    pub fn with_tech(mut self, civ: CivId, tech: &str) -> Self {
        self.techs.push((civ, tech.to_string()));
        self
    }

    pub fn build(self) -> GameState {
        let mut game = GameState {
            ruleset: Ruleset::for_testing(),
            map: TileMap::hexagonal(self.map_radius, "Grassland"),
            rng_seed: 42,
            ..GameState::default()
        };
        for (index, (nation, kind)) in self.civs.into_iter().enumerate() {
            game.civilizations
                .push(Civilization::new(index as CivId, &nation, kind));
        }
        for (civ, tech) in self.techs {
            game.civ_mut(civ).techs.insert(tech);
        }
        for (civ, center, capital) in self.cities {
            let number = game.civ(civ).cities.len() + 1;
            let name = format!("{} {}", game.civ(civ).name, number);
            game.add_city(civ, center, &name, capital);
        }
        for (civ, position, base) in self.units {
            game.add_unit(civ, position, &base);
        }
        game.set_transients();
        game
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_assigns_sequential_ids() {
        let game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_city_state("Geneva")
            .build();
        assert_eq!(game.civ(0).nation, "Rome");
        assert_eq!(game.civ(1).nation, "Geneva");
        assert!(game.civ(1).is_city_state());
        assert!(game.validate_for_start().is_ok());
    }

    #[test]
    fn test_builder_wires_transients() {
        let game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_city(0, HexCoord::new(0, 0), true)
            .build();
        assert!(!game.civ(0).viewable_tiles.is_empty());
        assert!(game.civ(0).ever_owned_capital);
    }
}
