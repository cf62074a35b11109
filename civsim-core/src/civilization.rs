//! The civilization aggregate.
//!
//! A civilization owns id-lists of its cities and units (the arenas live on
//! [`GameState`](crate::state::GameState)), its diplomacy records, flag
//! countdowns, temporary uniques, and a set of turn-scoped derived caches.
//! The caches are only valid for the turn they were computed in; they are
//! rebuilt at the lifecycle points defined by the turn manager and by
//! `set_transients` after a load.

use crate::automation::WorkerCache;
use crate::hex::HexCoord;
use crate::notifications::{NotificationCategory, NotificationLog};
use crate::ruleset::Stats;
use crate::state::{CityId, CivId, UnitId};
use crate::uniques::Unique;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known flag countdown names.
pub mod flag {
    /// Unrest is about to boil over; fires a revolt when it reaches zero.
    pub const REVOLT_BREWING: &str = "RevoltBrewing";
    /// A patronized city-state sends a gift when this reaches zero.
    pub const CITY_STATE_GIFT: &str = "CityStateGift";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CivKind {
    Major,
    CityState,
    Barbarian,
    Spectator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerKind {
    Human,
    Ai,
}

/// Discrete hostility estimate toward another civilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ThreatLevel {
    VeryLow,
    #[default]
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ThreatLevel {
    pub fn score(self) -> i32 {
        match self {
            ThreatLevel::VeryLow => 0,
            ThreatLevel::Low => 1,
            ThreatLevel::Medium => 2,
            ThreatLevel::High => 3,
            ThreatLevel::VeryHigh => 4,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiplomacyRecord {
    pub at_war: bool,
    pub threat: ThreatLevel,
    /// Drifts toward zero each turn.
    pub opinion: i32,
}

/// A pre-validated exchange offer awaiting the counterparty's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    pub from: CivId,
    pub offered_gold: i32,
    pub offered_resource: Option<String>,
}

/// A time-boxed unique granted by an event or wonder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporaryUnique {
    pub unique: Unique,
    pub turns_left: i32,
}

/// A unit attack recorded this turn (reset at start of turn).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackRecord {
    pub attacker: UnitId,
    pub target: HexCoord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Civilization {
    pub id: CivId,
    pub name: String,
    /// Key into the ruleset's nation table.
    pub nation: String,
    pub kind: CivKind,
    pub player: PlayerKind,

    pub gold: i32,
    pub science_stored: i32,
    pub culture_stored: i32,
    pub faith: i32,
    pub golden_age_points: i32,
    pub golden_age_turns: i32,
    pub great_person_points: i32,

    /// Portion of science output diverted to gold (0..=100). AI civs
    /// adjust this at start of turn to climb out of deficits.
    pub science_to_gold_percent: i32,

    pub tech_in_progress: Option<String>,
    pub techs: FxHashSet<String>,
    pub policies: Vec<String>,
    pub era: String,
    pub religion_founded: Option<String>,
    /// Founder effects of this civ's religion, granted at founding.
    pub founder_uniques: Vec<Unique>,

    pub cities: Vec<CityId>,
    pub units: Vec<UnitId>,
    /// For city-states: the current patron.
    pub ally: Option<CivId>,
    pub diplomacy: BTreeMap<CivId, DiplomacyRecord>,

    /// Named countdown timers, decremented once per turn-start.
    pub flags: BTreeMap<String, i32>,
    pub temporary_uniques: Vec<TemporaryUnique>,
    pub resource_stockpile: BTreeMap<String, i32>,
    pub trade_requests: Vec<TradeRequest>,

    /// Set the first time this civ owns an original capital; drives the
    /// liveness asymmetry in [`is_defeated`](Self::is_defeated).
    pub ever_owned_capital: bool,

    pub notifications: NotificationLog,

    // Turn-scoped derived caches. Rebuilt by the turn manager and by
    // set_transients; stale values must never survive a load.
    #[serde(skip)]
    pub stats_for_next_turn: Stats,
    #[serde(skip)]
    pub military_might: Option<i32>,
    #[serde(skip)]
    pub viewable_tiles: FxHashSet<HexCoord>,
    #[serde(skip)]
    pub cities_connected_to_capital: FxHashSet<CityId>,
    #[serde(skip)]
    pub owned_resources: BTreeMap<String, i32>,
    #[serde(skip)]
    pub attacks_this_turn: Vec<AttackRecord>,
    #[serde(skip)]
    pub worker_cache: Option<WorkerCache>,
}

impl Civilization {
    pub fn new(id: CivId, nation: &str, kind: CivKind) -> Self {
        Self {
            id,
            name: nation.to_string(),
            nation: nation.to_string(),
            kind,
            player: PlayerKind::Ai,
            gold: 0,
            science_stored: 0,
            culture_stored: 0,
            faith: 0,
            golden_age_points: 0,
            golden_age_turns: 0,
            great_person_points: 0,
            science_to_gold_percent: 0,
            tech_in_progress: None,
            techs: FxHashSet::default(),
            policies: Vec::new(),
            era: "Ancient".to_string(),
            religion_founded: None,
            founder_uniques: Vec::new(),
            cities: Vec::new(),
            units: Vec::new(),
            ally: None,
            diplomacy: BTreeMap::new(),
            flags: BTreeMap::new(),
            temporary_uniques: Vec::new(),
            resource_stockpile: BTreeMap::new(),
            trade_requests: Vec::new(),
            ever_owned_capital: false,
            notifications: NotificationLog::default(),
            stats_for_next_turn: Stats::ZERO,
            military_might: None,
            viewable_tiles: FxHashSet::default(),
            cities_connected_to_capital: FxHashSet::default(),
            owned_resources: BTreeMap::new(),
            attacks_this_turn: Vec::new(),
            worker_cache: None,
        }
    }

    pub fn is_major(&self) -> bool {
        self.kind == CivKind::Major
    }

    pub fn is_city_state(&self) -> bool {
        self.kind == CivKind::CityState
    }

    pub fn is_barbarian(&self) -> bool {
        self.kind == CivKind::Barbarian
    }

    pub fn is_spectator(&self) -> bool {
        self.kind == CivKind::Spectator
    }

    pub fn is_ai(&self) -> bool {
        self.player == PlayerKind::Ai
    }

    /// The liveness predicate (end-of-game detection depends on this
    /// asymmetry exactly):
    /// - barbarians and spectators are never defeated;
    /// - a civ that has ever owned an original capital is defeated when it
    ///   owns zero cities;
    /// - otherwise it is defeated when it owns zero living units.
    pub fn is_defeated(&self) -> bool {
        match self.kind {
            CivKind::Barbarian | CivKind::Spectator => false,
            _ => {
                if self.ever_owned_capital {
                    self.cities.is_empty()
                } else {
                    self.units.is_empty()
                }
            }
        }
    }

    pub fn has_tech(&self, tech: &str) -> bool {
        self.techs.contains(tech)
    }

    pub fn at_war_with(&self, other: CivId) -> bool {
        self.diplomacy.get(&other).map(|d| d.at_war).unwrap_or(false)
    }

    pub fn at_war(&self) -> bool {
        self.diplomacy.values().any(|d| d.at_war)
    }

    /// Arm (or re-arm) a named countdown.
    pub fn add_flag(&mut self, name: &str, turns: i32) {
        self.flags.insert(name.to_string(), turns.max(0));
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    pub fn remove_flag(&mut self, name: &str) {
        self.flags.remove(name);
    }

    pub fn add_notification(
        &mut self,
        text: impl Into<String>,
        category: NotificationCategory,
        location: Option<HexCoord>,
        icons: &[&str],
    ) {
        self.notifications.add(text, category, location, icons);
    }
}
