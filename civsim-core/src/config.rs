//! Simulation configuration.
//!
//! Heuristic weights and thresholds live here rather than as scattered
//! magic numbers. The fort-placement weights in particular are tuning
//! defaults, not structural contracts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Turns of archived notifications retained per civilization.
    pub max_notification_turns: usize,

    /// Extra visited-tile budget added to the aerial-distance estimate when
    /// sizing a city-connection BFS.
    pub bfs_padding: i32,
    /// Radius a worker scans for a better tile to improve.
    pub worker_search_radius: i32,
    /// Tile priority below which road-connection work takes precedence
    /// over tile improvement.
    pub road_priority_threshold: i32,
    /// Candidate connection targets beyond this aerial distance from the
    /// worker are not considered this turn.
    pub city_connection_max_distance: i32,
    /// Cities at or below this population are not worth connecting yet.
    pub city_connection_min_population: i32,

    /// Treasury level at which military units start being disbanded
    /// (one unit per full multiple).
    pub emergency_disband_per: i32,
    pub great_person_threshold: i32,
    pub religion_founding_faith: i32,
    /// Revolt-risk score at which the revolt countdown is armed.
    pub revolt_risk_threshold: i32,
    pub revolt_countdown_turns: i32,
    pub golden_age_threshold: i32,
    pub golden_age_length: i32,

    /// Whether spectator civilizations may be present (restrictive
    /// multiplayer setups disallow them).
    pub allow_spectators: bool,

    pub fort: FortConfig,
}

/// Fort-placement heuristic weights (configurable defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FortConfig {
    /// Added to an enemy's threat score while actively at war.
    pub war_weight: i32,
    /// Minimum (threat score − distance penalty) for a fort to be justified
    /// against a given enemy.
    pub min_justifying_threat: i32,
    /// Distance-to-enemy-city divisor applied as a penalty to threat.
    pub distance_penalty_divisor: i32,
    /// Slack, in tiles, allowed around the friendly↔hostile city line for a
    /// tile to count as "on the front".
    pub alignment_slack: i32,
    /// Radius searched for a superior hill placement.
    pub hill_search_radius: i32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_notification_turns: 5,
            bfs_padding: 10,
            worker_search_radius: 4,
            road_priority_threshold: 3,
            city_connection_max_distance: 20,
            city_connection_min_population: 3,
            emergency_disband_per: 100,
            great_person_threshold: 100,
            religion_founding_faith: 200,
            revolt_risk_threshold: 10,
            revolt_countdown_turns: 4,
            golden_age_threshold: 500,
            golden_age_length: 10,
            allow_spectators: true,
            fort: FortConfig::default(),
        }
    }
}

impl Default for FortConfig {
    fn default() -> Self {
        Self {
            war_weight: 5,
            min_justifying_threat: 3,
            distance_penalty_divisor: 5,
            alignment_slack: 2,
            hill_search_radius: 2,
        }
    }
}
