//! # Civ Simulation Core
//!
//! Deterministic turn-based strategy simulation engine: ruleset-driven
//! modifiers ("uniques"), one-shot triggered effects, a per-civilization
//! turn lifecycle, bounded graph search for road planning, and worker
//! automation, all over a hexagonal tile map.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐    ┌─────────────────┐    ┌──────────────┐
//! │  Ruleset   │───▶│ Uniques engine  │───▶│ Turn manager │
//! │ (lookups)  │    │ (aggregation)   │    │ (phases)     │
//! └────────────┘    └─────────────────┘    └──────┬───────┘
//!                                                 │
//!                   ┌─────────────────┐    ┌──────▼───────┐
//!                   │ Worker          │◀───│  GameState   │
//!                   │ automation      │    │ (arenas)     │
//!                   └─────────────────┘    └──────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`GameState`] | Aggregate root: map, civilizations, city/unit arenas |
//! | [`Unique`](uniques::Unique) | Parameterized, conditionally-gated rule effect |
//! | [`PendingTrigger`](triggers::PendingTrigger) | One-shot effect with exactly-once activation |
//! | [`systems::run_turn`] | Full per-civilization start/end lifecycle |
//! | [`BoundedBfs`](hex_pathfinding::BoundedBfs) | Resumable, budgeted reachability search |
//! | [`automation::automate_worker`] | One worker's decision ladder for a turn |
//!
//! ## Determinism
//!
//! All iterated-and-serialized collections are ordered (`BTreeMap`), the
//! only RNG is seeded per turn from persisted state, and two identically
//! built states serialize byte-identically. Transient caches are
//! `#[serde(skip)]` and rebuilt by [`GameState::set_transients`].

pub mod automation;
pub mod city;
pub mod civilization;
pub mod compat;
pub mod config;
pub mod hex;
pub mod map;
pub mod notifications;
pub mod ruleset;
pub mod state;
pub mod systems;
pub mod testing;
pub mod triggers;
pub mod uniques;
pub mod unit;

pub use city::City;
pub use civilization::Civilization;
pub use compat::apply_backward_compatibility;
pub use config::SimConfig;
pub use hex::HexCoord;
pub use map::{Tile, TileMap};
pub use ruleset::{Ruleset, Stats};
pub use state::{CityId, CivId, GameState, LoadError, UnitId, VictoryKind, VictoryRecord};
pub use unit::Unit;
