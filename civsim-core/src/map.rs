//! The hex tile map.
//!
//! Tiles are created once at map construction and never destroyed; ownership,
//! improvements, roads, and pillage state mutate in place. Units and cities
//! reference tiles by [`HexCoord`]; tiles reference occupants by unit id.

use crate::hex::HexCoord;
use crate::ruleset::{ImprovementDef, Ruleset, Stats, TerrainKind};
use crate::state::{CivId, GameState, UnitId};
use hex_pathfinding::Graph;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Road present on a tile. Ordering is quality ordering.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RoadStatus {
    #[default]
    None,
    Road,
    Railroad,
}

impl RoadStatus {
    pub fn is_some(self) -> bool {
        self != RoadStatus::None
    }

    pub fn name(self) -> &'static str {
        match self {
            RoadStatus::None => "None",
            RoadStatus::Road => "Road",
            RoadStatus::Railroad => "Railroad",
        }
    }

    /// Worker turns to lay this road type on one tile.
    pub fn build_turns(self) -> i32 {
        match self {
            RoadStatus::None => 0,
            RoadStatus::Road => 4,
            RoadStatus::Railroad => 6,
        }
    }
}

/// An improvement a worker is partway through constructing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovementInProgress {
    pub improvement: String,
    pub turns_left: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub position: HexCoord,
    pub owner: Option<CivId>,
    pub terrain: String,
    pub feature: Option<String>,
    pub resource: Option<String>,
    pub improvement: Option<String>,
    pub improvement_in_progress: Option<ImprovementInProgress>,
    pub road: RoadStatus,
    pub pillaged: bool,
    /// Weak occupancy references; the unit arena owns the units.
    pub civilian_unit: Option<UnitId>,
    pub military_unit: Option<UnitId>,
}

impl Tile {
    pub fn new(position: HexCoord, terrain: &str) -> Self {
        Self {
            position,
            owner: None,
            terrain: terrain.to_string(),
            feature: None,
            resource: None,
            improvement: None,
            improvement_in_progress: None,
            road: RoadStatus::None,
            pillaged: false,
            civilian_unit: None,
            military_unit: None,
        }
    }

    pub fn is_land(&self, ruleset: &Ruleset) -> bool {
        self.terrain_kind(ruleset) == Some(TerrainKind::Land)
    }

    pub fn is_hill(&self, ruleset: &Ruleset) -> bool {
        ruleset
            .terrains
            .get(&self.terrain)
            .map(|t| t.hill)
            .unwrap_or(false)
    }

    pub fn is_impassable(&self, ruleset: &Ruleset) -> bool {
        // Unknown terrain reads as impassable rather than crashing.
        ruleset
            .terrains
            .get(&self.terrain)
            .map(|t| t.impassable)
            .unwrap_or(true)
    }

    fn terrain_kind(&self, ruleset: &Ruleset) -> Option<TerrainKind> {
        ruleset.terrains.get(&self.terrain).map(|t| t.kind)
    }

    /// Percent defensive bonus from terrain plus feature.
    pub fn defence_bonus(&self, ruleset: &Ruleset) -> i32 {
        let terrain = ruleset
            .terrains
            .get(&self.terrain)
            .map(|t| t.defence_bonus)
            .unwrap_or(0);
        let feature = self
            .feature
            .as_ref()
            .and_then(|f| ruleset.terrains.get(f))
            .map(|t| t.defence_bonus)
            .unwrap_or(0);
        terrain + feature
    }

    /// What the tile yields right now: terrain, feature, exploited resource,
    /// and completed (non-pillaged) improvement. A yield-nullifying feature
    /// suppresses everything.
    pub fn stats(&self, ruleset: &Ruleset) -> Stats {
        if let Some(feature) = self.feature.as_ref().and_then(|f| ruleset.terrains.get(f)) {
            if feature.nullifies_yields {
                return Stats::ZERO;
            }
        }

        let mut stats = ruleset
            .terrains
            .get(&self.terrain)
            .map(|t| t.stats)
            .unwrap_or(Stats::ZERO);
        if let Some(feature) = self.feature.as_ref().and_then(|f| ruleset.terrains.get(f)) {
            stats += feature.stats;
        }
        if !self.pillaged {
            if let Some(imp) = self
                .improvement
                .as_ref()
                .and_then(|i| ruleset.improvements.get(i))
            {
                stats += imp.stats;
                // The resource yield is unlocked by its exploiting improvement.
                if let Some(res) = self.resource.as_ref().and_then(|r| ruleset.resources.get(r)) {
                    if res.improvement.as_deref() == self.improvement.as_deref() {
                        stats += res.stats;
                    }
                }
            }
        }
        stats
    }

    pub fn provides_yield(&self, ruleset: &Ruleset) -> bool {
        self.stats(ruleset).total() > 0
    }

    /// Whether the tile's resource is visible to a civ with the given techs.
    pub fn has_viewable_resource(
        &self,
        ruleset: &Ruleset,
        has_tech: impl Fn(&str) -> bool,
    ) -> bool {
        let Some(res) = self.resource.as_ref().and_then(|r| ruleset.resources.get(r)) else {
            return false;
        };
        match &res.revealed_by {
            Some(tech) => has_tech(tech),
            None => true,
        }
    }

    /// Legality of constructing `improvement` here, ignoring who builds it.
    pub fn can_build_improvement(&self, improvement: &ImprovementDef, ruleset: &Ruleset) -> bool {
        if !self.is_land(ruleset) || self.is_impassable(ruleset) {
            return false;
        }
        if let Some(removes) = &improvement.removes_feature {
            return self.feature.as_deref() == Some(removes.as_str());
        }
        if let Some(feature) = self.feature.as_ref().and_then(|f| ruleset.terrains.get(f)) {
            if feature.unbuildable {
                return false;
            }
        }
        if improvement.terrains_can_be_built_on.is_empty() {
            return true;
        }
        improvement
            .terrains_can_be_built_on
            .iter()
            .any(|t| *t == self.terrain)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileMap {
    tiles: Vec<Tile>,
    #[serde(skip)]
    index: FxHashMap<HexCoord, usize>,
}

impl TileMap {
    /// A hexagonal disk of the given radius, uniform terrain.
    pub fn hexagonal(radius: i32, terrain: &str) -> Self {
        let mut tiles = Vec::new();
        for q in -radius..=radius {
            for r in -radius..=radius {
                let coord = HexCoord::new(q, r);
                if coord.distance(HexCoord::new(0, 0)) <= radius {
                    tiles.push(Tile::new(coord, terrain));
                }
            }
        }
        let mut map = Self {
            tiles,
            index: FxHashMap::default(),
        };
        map.rebuild_index();
        map
    }

    /// Rebuild the coordinate index. Part of the post-deserialization
    /// transient-state pass; tiles are never added or removed afterwards.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .tiles
            .iter()
            .enumerate()
            .map(|(i, t)| (t.position, i))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, coord: HexCoord) -> bool {
        self.index.contains_key(&coord)
    }

    pub fn get(&self, coord: HexCoord) -> Option<&Tile> {
        self.index.get(&coord).map(|&i| &self.tiles[i])
    }

    pub fn get_mut(&mut self, coord: HexCoord) -> Option<&mut Tile> {
        self.index.get(&coord).copied().map(move |i| &mut self.tiles[i])
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    /// Existing neighbor coordinates, in direction order.
    pub fn neighbors(&self, coord: HexCoord) -> Vec<HexCoord> {
        coord.neighbors().filter(|c| self.contains(*c)).collect()
    }

    /// Existing coordinates within `distance` of `center` (inclusive,
    /// excluding the center itself), in deterministic order.
    pub fn coords_in_distance(&self, center: HexCoord, distance: i32) -> Vec<HexCoord> {
        let mut out = Vec::new();
        for q in -distance..=distance {
            for r in -distance..=distance {
                let coord = center + HexCoord::new(q, r);
                if coord != center
                    && center.distance(coord) <= distance
                    && self.contains(coord)
                {
                    out.push(coord);
                }
            }
        }
        out
    }
}

/// Context for road-planning connectivity searches: which civilization is
/// asking, against which game state.
pub struct RoadSearchContext<'a> {
    pub game: &'a GameState,
    pub civ: CivId,
}

/// The tile map as a search graph for road planning. Expansion is allowed
/// over any passable land tile not owned by a civ the searcher is at war
/// with; roads can be laid along the reconstructed path.
impl<'a> Graph<HexCoord, RoadSearchContext<'a>> for TileMap {
    fn neighbors(&self, node: HexCoord, _context: &RoadSearchContext<'a>) -> Vec<HexCoord> {
        self.neighbors(node)
    }

    fn passable(&self, _from: HexCoord, to: HexCoord, context: &RoadSearchContext<'a>) -> bool {
        let Some(tile) = self.get(to) else {
            return false;
        };
        let ruleset = &context.game.ruleset;
        if !tile.is_land(ruleset) || tile.is_impassable(ruleset) {
            return false;
        }
        match tile.owner {
            Some(owner) => {
                owner == context.civ || !context.game.civ(context.civ).at_war_with(owner)
            }
            None => true,
        }
    }
}
