//! Per-civilization turn lifecycle.
//!
//! The phase orderings are data ([`START_TURN_ORDER`], [`END_TURN_ORDER`]),
//! not incidental statement order: tests assert against them directly, and
//! the dispatch loops below are the only place they are interpreted.
//!
//! Later phases read caches written by earlier ones, so a single
//! civilization's phases must run strictly sequentially — never in
//! parallel.

pub mod end_turn;
pub mod start_turn;
pub mod stats;
pub mod victory;

pub use start_turn::{refresh_resources, refresh_visibility_and_connectivity};

use crate::state::{CivId, GameState};

/// Start-of-turn phases, in required execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTurnPhase {
    ResetTransients,
    UpdateStatsForNextTurn,
    AiEconomyAdjust,
    SpawnGreatPerson,
    AdvanceReligion,
    RefreshVisibilityAndConnectivity,
    CountDownFlags,
    EvaluateRevoltRisk,
    CityStartTurn,
    UnitStartTurn,
    AutomateUnits,
    RefreshResources,
    PurgeStaleTradeRequests,
    CheckVictory,
}

pub const START_TURN_ORDER: [StartTurnPhase; 14] = [
    StartTurnPhase::ResetTransients,
    StartTurnPhase::UpdateStatsForNextTurn,
    StartTurnPhase::AiEconomyAdjust,
    StartTurnPhase::SpawnGreatPerson,
    StartTurnPhase::AdvanceReligion,
    StartTurnPhase::RefreshVisibilityAndConnectivity,
    StartTurnPhase::CountDownFlags,
    StartTurnPhase::EvaluateRevoltRisk,
    StartTurnPhase::CityStartTurn,
    StartTurnPhase::UnitStartTurn,
    StartTurnPhase::AutomateUnits,
    StartTurnPhase::RefreshResources,
    StartTurnPhase::PurgeStaleTradeRequests,
    StartTurnPhase::CheckVictory,
];

/// End-of-turn phases, in required execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndTurnPhase {
    RotateNotifications,
    RecomputeStats,
    AccrueStats,
    CityStateQuests,
    EmergencyDisband,
    CityEndTurn,
    ExpireTemporaryUniques,
    AdvanceGoldenAge,
    UnitEndTurn,
    AdvanceDiplomacy,
    InvalidateMilitaryMight,
    CheckVictory,
}

pub const END_TURN_ORDER: [EndTurnPhase; 12] = [
    EndTurnPhase::RotateNotifications,
    EndTurnPhase::RecomputeStats,
    EndTurnPhase::AccrueStats,
    EndTurnPhase::CityStateQuests,
    EndTurnPhase::EmergencyDisband,
    EndTurnPhase::CityEndTurn,
    EndTurnPhase::ExpireTemporaryUniques,
    EndTurnPhase::AdvanceGoldenAge,
    EndTurnPhase::UnitEndTurn,
    EndTurnPhase::AdvanceDiplomacy,
    EndTurnPhase::InvalidateMilitaryMight,
    EndTurnPhase::CheckVictory,
];

/// Run all start-of-turn phases for one civilization.
///
/// Entry-point guard: turns for a defeated civilization are skipped
/// entirely. A civ defeated *mid-pass* still runs its already-started pass
/// to completion (there is no partial-phase abort).
pub fn start_turn(game: &mut GameState, civ_id: CivId) {
    if game.civ(civ_id).is_defeated() {
        log::debug!("skipping start turn for defeated civ {civ_id}");
        return;
    }
    let _span = tracing::debug_span!("start_turn", civ = civ_id, turn = game.turn).entered();
    for phase in START_TURN_ORDER {
        start_turn::run_phase(game, civ_id, phase);
    }
}

/// Run all end-of-turn phases for one civilization.
pub fn end_turn(game: &mut GameState, civ_id: CivId) {
    if game.civ(civ_id).is_defeated() {
        log::debug!("skipping end turn for defeated civ {civ_id}");
        return;
    }
    let _span = tracing::debug_span!("end_turn", civ = civ_id, turn = game.turn).entered();
    for phase in END_TURN_ORDER {
        end_turn::run_phase(game, civ_id, phase);
    }
}

/// Advance the whole game by one turn: bump the counter, then run every
/// civilization's full lifecycle sequentially. Cross-civilization
/// processing is serialized deliberately: shared tiles, trade requests,
/// and the victory record are mutated without further synchronization.
pub fn run_turn(game: &mut GameState) {
    game.turn += 1;
    for civ_id in game.civ_ids().collect::<Vec<_>>() {
        start_turn(game, civ_id);
        end_turn(game, civ_id);
    }
}
