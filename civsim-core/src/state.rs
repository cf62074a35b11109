//! Complete simulation state.
//!
//! [`GameState`] is the aggregate root: it owns the tile map, the
//! civilizations, and the city/unit arenas keyed by stable ids. All
//! back-references between entities are ids or positions resolved through
//! these owning collections on demand; there is no ambient "current game"
//! — every operation takes the state explicitly.

use crate::city::City;
use crate::civilization::{CivKind, Civilization};
use crate::config::SimConfig;
use crate::hex::HexCoord;
use crate::map::TileMap;
use crate::ruleset::{Ruleset, UnitDomain};
use crate::triggers::PendingTrigger;
use crate::unit::Unit;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub type CivId = u16;
pub type CityId = u32;
pub type UnitId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VictoryKind {
    Domination,
    Science,
}

/// First victory achieved, recorded once and never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VictoryRecord {
    pub civ: CivId,
    pub kind: VictoryKind,
    pub turn: u32,
}

/// Failures of game-level operations (starting or loading a game). These
/// abort only the requested operation, with a user-facing explanation;
/// prior state is left intact.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("spectators are not allowed in this game configuration")]
    SpectatorNotAllowed,
    #[error("nation {0:?} does not exist in the active ruleset")]
    MissingNation(String),
    #[error("game has no civilizations")]
    NoCivilizations,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameState {
    pub turn: u32,
    pub rng_seed: u64,
    pub ruleset: Ruleset,
    pub map: TileMap,
    /// Indexed by `CivId`.
    pub civilizations: Vec<Civilization>,
    pub cities: BTreeMap<CityId, City>,
    pub units: BTreeMap<UnitId, Unit>,
    pub next_city_id: CityId,
    pub next_unit_id: UnitId,
    /// One-shot effects queued by events, drained by the trigger engine.
    pub pending_triggers: Vec<PendingTrigger>,
    pub victory: Option<VictoryRecord>,
    pub config: SimConfig,
}

impl GameState {
    pub fn civ(&self, id: CivId) -> &Civilization {
        &self.civilizations[id as usize]
    }

    pub fn civ_mut(&mut self, id: CivId) -> &mut Civilization {
        &mut self.civilizations[id as usize]
    }

    pub fn civ_ids(&self) -> impl Iterator<Item = CivId> {
        0..self.civilizations.len() as CivId
    }

    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities.get(&id)
    }

    pub fn city_mut(&mut self, id: CityId) -> Option<&mut City> {
        self.cities.get_mut(&id)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub fn city_at(&self, coord: HexCoord) -> Option<&City> {
        self.cities.values().find(|c| c.center == coord)
    }

    pub fn is_city_center(&self, coord: HexCoord) -> bool {
        self.city_at(coord).is_some()
    }

    pub fn capital_of(&self, civ: CivId) -> Option<CityId> {
        self.civ(civ)
            .cities
            .iter()
            .copied()
            .find(|&id| self.city(id).map(|c| c.is_capital).unwrap_or(false))
    }

    /// Deterministic RNG for this turn. Mixing in the turn number gives
    /// fresh draws per turn while staying replay-stable.
    pub fn rng_for_turn(&self) -> StdRng {
        StdRng::seed_from_u64(self.rng_seed ^ (self.turn as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    pub fn add_city(&mut self, civ: CivId, coord: HexCoord, name: &str, capital: bool) -> CityId {
        let id = self.next_city_id;
        self.next_city_id += 1;
        let mut city = City::new(id, name, civ, coord);
        city.is_capital = capital;
        self.cities.insert(id, city);
        self.civ_mut(civ).cities.push(id);
        if capital {
            self.civ_mut(civ).ever_owned_capital = true;
        }
        if let Some(tile) = self.map.get_mut(coord) {
            tile.owner = Some(civ);
        }
        for neighbor in self.map.neighbors(coord) {
            if let Some(tile) = self.map.get_mut(neighbor) {
                if tile.owner.is_none() {
                    tile.owner = Some(civ);
                }
            }
        }
        id
    }

    pub fn remove_city(&mut self, id: CityId) {
        let Some(city) = self.cities.remove(&id) else {
            return;
        };
        // Release tile ownership; tiles are re-owned, never destroyed.
        for tile in self.map.tiles_mut() {
            if tile.owner == Some(city.owner) && tile.position.distance(city.center) <= 1 {
                tile.owner = None;
            }
        }
        let civ = self.civ_mut(city.owner);
        civ.cities.retain(|&c| c != id);
        civ.cities_connected_to_capital.remove(&id);
    }

    /// Spawn a unit from the ruleset table. Returns `None` (skip) when the
    /// base unit is unknown.
    pub fn add_unit(&mut self, civ: CivId, coord: HexCoord, base: &str) -> Option<UnitId> {
        let def = self.ruleset.units.get(base)?;
        let military = def.domain == UnitDomain::Military;
        let movement = def.movement;
        let id = self.next_unit_id;
        self.next_unit_id += 1;
        let mut unit = Unit::new(id, base, civ, coord);
        unit.movement_left = movement;
        self.units.insert(id, unit);
        self.civ_mut(civ).units.push(id);
        if let Some(tile) = self.map.get_mut(coord) {
            if military {
                tile.military_unit = Some(id);
            } else {
                tile.civilian_unit = Some(id);
            }
        }
        Some(id)
    }

    pub fn remove_unit(&mut self, id: UnitId) {
        let Some(unit) = self.units.remove(&id) else {
            return;
        };
        self.civ_mut(unit.owner).units.retain(|&u| u != id);
        if let Some(tile) = self.map.get_mut(unit.position) {
            if tile.military_unit == Some(id) {
                tile.military_unit = None;
            }
            if tile.civilian_unit == Some(id) {
                tile.civilian_unit = None;
            }
        }
    }

    /// Rebuild every transient/derived structure after deserialization:
    /// map index, tile occupancy, and all per-civ caches. The save layer
    /// calls this (after the backward-compatibility pass) before normal
    /// operation resumes.
    pub fn set_transients(&mut self) {
        self.map.rebuild_index();

        for tile in self.map.tiles_mut() {
            tile.civilian_unit = None;
            tile.military_unit = None;
        }
        let placements: Vec<(UnitId, HexCoord, bool)> = self
            .units
            .values()
            .map(|u| {
                let military = self
                    .ruleset
                    .units
                    .get(&u.base)
                    .map(|d| d.domain == UnitDomain::Military)
                    .unwrap_or(false);
                (u.id, u.position, military)
            })
            .collect();
        for (id, position, military) in placements {
            if let Some(tile) = self.map.get_mut(position) {
                if military {
                    tile.military_unit = Some(id);
                } else {
                    tile.civilian_unit = Some(id);
                }
            }
        }

        for civ_id in self.civ_ids().collect::<Vec<_>>() {
            crate::systems::refresh_visibility_and_connectivity(self, civ_id);
            crate::systems::refresh_resources(self, civ_id);
            crate::systems::stats::update_stats_for_next_turn(self, civ_id);
            let civ = self.civ_mut(civ_id);
            civ.military_might = None;
            civ.worker_cache = None;
            civ.attacks_this_turn.clear();
        }
    }

    /// Validate the state for starting (or resuming) play. A violation is
    /// a user-visible failure of this operation only; the state itself is
    /// not mutated.
    pub fn validate_for_start(&self) -> Result<(), LoadError> {
        if self.civilizations.is_empty() {
            return Err(LoadError::NoCivilizations);
        }
        for civ in &self.civilizations {
            if civ.kind == CivKind::Spectator && !self.config.allow_spectators {
                return Err(LoadError::SpectatorNotAllowed);
            }
            if !self.ruleset.nations.contains_key(&civ.nation) {
                return Err(LoadError::MissingNation(civ.nation.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::GameStateBuilder;

    #[test]
    fn test_add_city_claims_tiles_and_capital_flag() {
        let mut game = GameStateBuilder::new().with_map_radius(2).with_civ("Rome").build();
        assert!(!game.civ(0).ever_owned_capital);

        let id = game.add_city(0, HexCoord::new(0, 0), "Roma", true);
        assert!(game.civ(0).ever_owned_capital);
        assert_eq!(game.capital_of(0), Some(id));
        assert_eq!(game.map.get(HexCoord::new(0, 0)).unwrap().owner, Some(0));
        assert_eq!(game.map.get(HexCoord::new(1, 0)).unwrap().owner, Some(0));
    }

    #[test]
    fn test_unknown_base_unit_is_a_skip() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        assert!(game.add_unit(0, HexCoord::new(0, 0), "Giant Death Robot").is_none());
        assert!(game.civ(0).units.is_empty());
    }

    #[test]
    fn test_set_transients_rebuilds_occupancy() {
        let mut game = GameStateBuilder::new()
            .with_map_radius(2)
            .with_civ("Rome")
            .with_unit(0, HexCoord::new(1, 0), "Warrior")
            .build();
        let unit_id = game.civ(0).units[0];

        // Serde round-trip drops all transients.
        let json = serde_json::to_string(&game).unwrap();
        let mut restored: GameState = serde_json::from_str(&json).unwrap();
        restored.set_transients();

        assert_eq!(
            restored.map.get(HexCoord::new(1, 0)).unwrap().military_unit,
            Some(unit_id)
        );
    }

    #[test]
    fn test_spectator_validation_is_config_gated() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        game.civilizations.push(Civilization::new(
            1,
            "Spectator",
            CivKind::Spectator,
        ));
        assert!(game.validate_for_start().is_ok());

        game.config.allow_spectators = false;
        assert!(matches!(
            game.validate_for_start(),
            Err(LoadError::SpectatorNotAllowed)
        ));
        // State untouched by the failed operation.
        assert_eq!(game.civilizations.len(), 2);
    }

    #[test]
    fn test_determinism_of_serialized_state() {
        let make = || {
            GameStateBuilder::new()
                .with_map_radius(2)
                .with_civ("Rome")
                .with_city(0, HexCoord::new(0, 0), true)
                .build()
        };
        let a = serde_json::to_string(&make()).unwrap();
        let b = serde_json::to_string(&make()).unwrap();
        assert_eq!(a, b);
    }
}
