//! The unique (rule modifier) system.
//!
//! A [`Unique`] is a parameterized rule effect attached to some ruleset or
//! game-state entity: a nation, a city, a policy, a tech, an era, a resource,
//! a temporary buff, or the global ruleset. It carries a type tag, free-form
//! parameters, and zero or more [`Conditional`] predicates that must all hold
//! against a [`StateForConditionals`] before the effect applies.
//!
//! Uniques are immutable once constructed; aggregation filters, it never
//! mutates. [`civ_matching_uniques`] is the civilization-level aggregation
//! entry point: it unions contributions from every attachment point in a
//! statically known, explicitly ordered source list, so callers never
//! enumerate sources themselves.

use crate::civilization::CivKind;
use crate::hex::HexCoord;
use crate::state::{CityId, CivId, GameState, UnitId};
use serde::{Deserialize, Serialize};

/// Effect-type key of a unique.
///
/// `OneTime*` variants are *triggered*: they fire once per qualifying event
/// via the trigger engine instead of being continuously active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniqueType {
    /// `[stat] [amount]`: flat per-turn civ-wide stat bonus.
    StatsPerTurn,
    /// `[stat] [percent]`: percentage bonus on the recomputed stat.
    StatPercentBonus,
    /// `[percent]`: discount on per-unit gold maintenance.
    UnitMaintenanceDiscount,
    /// `[percent]`: reduction of the revolt-risk score.
    ReducedRevoltRisk,
    /// `[improvement] [stat] [amount]`: extra yield on a built improvement.
    ImprovementStatsBonus,
    /// `[percent]`: faster great-person point accrual.
    GreatPersonPointsPercent,
    /// `[amount]`: one-shot treasury gain.
    OneTimeGainGold,
    /// `[resource] [amount]`: one-shot stockpile gain.
    OneTimeGainResource,
    /// `[amount]`: one-shot faith gain.
    OneTimeGainFaith,
    /// `[unit]`: one-shot free unit at the capital.
    OneTimeFreeUnit,
}

impl UniqueType {
    /// Whether this effect fires on discrete events rather than being
    /// continuously active.
    pub fn is_triggerable(self) -> bool {
        matches!(
            self,
            UniqueType::OneTimeGainGold
                | UniqueType::OneTimeGainResource
                | UniqueType::OneTimeGainFaith
                | UniqueType::OneTimeFreeUnit
        )
    }
}

/// Pure predicate gating a unique. Evaluated against current game state;
/// never has side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conditional {
    WhenAtWar,
    WhenNotAtWar,
    DuringEra(String),
    AfterResearching(String),
    WithResource(String),
    AboveGold(i32),
    DuringGoldenAge,
    /// Marks a city-attached unique as local: it is excluded from
    /// civilization-level aggregation.
    OnlyInThisCity,
}

impl Conditional {
    pub fn applies(&self, state: &StateForConditionals<'_>) -> bool {
        let civ = state.civ();
        match self {
            Conditional::WhenAtWar => civ.is_some_and(|c| {
                c.diplomacy.values().any(|d| d.at_war)
            }),
            Conditional::WhenNotAtWar => civ.is_some_and(|c| {
                c.diplomacy.values().all(|d| !d.at_war)
            }),
            Conditional::DuringEra(era) => civ.is_some_and(|c| c.era == *era),
            Conditional::AfterResearching(tech) => civ.is_some_and(|c| c.has_tech(tech)),
            Conditional::WithResource(resource) => civ.is_some_and(|c| {
                c.owned_resources.get(resource).copied().unwrap_or(0) > 0
                    || c.resource_stockpile.get(resource).copied().unwrap_or(0) > 0
            }),
            Conditional::AboveGold(amount) => civ.is_some_and(|c| c.gold > *amount),
            Conditional::DuringGoldenAge => civ.is_some_and(|c| c.golden_age_turns > 0),
            // Scoping marker, not a state predicate: true whenever a city
            // context is present at all.
            Conditional::OnlyInThisCity => state.city.is_some(),
        }
    }
}

/// A parameterized, conditionally-gated rule effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unique {
    pub unique_type: UniqueType,
    pub params: Vec<String>,
    pub conditionals: Vec<Conditional>,
}

impl Unique {
    pub fn new(unique_type: UniqueType, params: &[&str]) -> Self {
        Self::with_conditionals(unique_type, params, Vec::new())
    }

    pub fn with_conditionals(
        unique_type: UniqueType,
        params: &[&str],
        conditionals: Vec<Conditional>,
    ) -> Self {
        Self {
            unique_type,
            params: params.iter().map(|s| s.to_string()).collect(),
            conditionals,
        }
    }

    pub fn param(&self, index: usize) -> &str {
        self.params.get(index).map(String::as_str).unwrap_or("")
    }

    /// Numeric parameter, `None` on a missing or malformed value. Malformed
    /// content is a stale-reference class problem: callers skip the unique.
    pub fn param_i32(&self, index: usize) -> Option<i32> {
        self.params.get(index)?.parse().ok()
    }

    pub fn conditionals_apply(&self, state: &StateForConditionals<'_>) -> bool {
        self.conditionals.iter().all(|c| c.applies(state))
    }

    /// City-attached uniques marked local are not visible at the
    /// civilization level.
    pub fn is_local_to_city(&self) -> bool {
        self.conditionals.contains(&Conditional::OnlyInThisCity)
    }
}

/// Ephemeral, per-query evaluation context. Never persisted.
#[derive(Clone, Copy)]
pub struct StateForConditionals<'a> {
    pub game: &'a GameState,
    pub civ: Option<CivId>,
    pub city: Option<CityId>,
    pub unit: Option<UnitId>,
    pub tile: Option<HexCoord>,
}

impl<'a> StateForConditionals<'a> {
    pub fn for_civ(game: &'a GameState, civ: CivId) -> Self {
        Self {
            game,
            civ: Some(civ),
            city: None,
            unit: None,
            tile: None,
        }
    }

    pub fn civ(&self) -> Option<&'a crate::civilization::Civilization> {
        self.civ.map(|id| self.game.civ(id))
    }
}

/// Capability interface for anything carrying uniques.
pub trait HasUniques {
    fn unique_objects(&self) -> &[Unique];

    /// Uniques of the given type whose conditionals all hold.
    fn matching_uniques<'a>(
        &'a self,
        unique_type: UniqueType,
        state: &StateForConditionals<'_>,
    ) -> Vec<&'a Unique> {
        self.unique_objects()
            .iter()
            .filter(|u| u.unique_type == unique_type && u.conditionals_apply(state))
            .collect()
    }
}

/// All uniques of `unique_type` currently applying to the civilization,
/// unioned across every attachment point, in fixed source order:
/// nation, cities (non-local), policies, techs, era, temporary buffs,
/// religion founder effects, owned resources, city-state patronage, and
/// global ruleset uniques.
///
/// Ordering is source/insertion order, not significance order. Read-only:
/// safe to call from any decision loop. A missing referenced ruleset entry
/// contributes nothing (skip, not error).
pub fn civ_matching_uniques<'a>(
    game: &'a GameState,
    civ_id: CivId,
    unique_type: UniqueType,
    state: &StateForConditionals<'_>,
) -> Vec<&'a Unique> {
    let civ = game.civ(civ_id);
    let ruleset = &game.ruleset;
    let mut found: Vec<&'a Unique> = Vec::new();

    let mut push_matching = |uniques: &'a [Unique], found: &mut Vec<&'a Unique>| {
        for unique in uniques {
            if unique.unique_type == unique_type && unique.conditionals_apply(state) {
                found.push(unique);
            }
        }
    };

    if let Some(nation) = ruleset.nations.get(&civ.nation) {
        push_matching(&nation.uniques, &mut found);
    }

    for &city_id in &civ.cities {
        if let Some(city) = game.city(city_id) {
            for unique in &city.uniques {
                if unique.unique_type == unique_type
                    && !unique.is_local_to_city()
                    && unique.conditionals_apply(state)
                {
                    found.push(unique);
                }
            }
        }
    }

    for policy in &civ.policies {
        if let Some(def) = ruleset.policies.get(policy) {
            push_matching(&def.uniques, &mut found);
        }
    }

    for tech in &civ.techs {
        if let Some(def) = ruleset.techs.get(tech) {
            push_matching(&def.uniques, &mut found);
        }
    }

    if let Some(era) = ruleset.eras.get(&civ.era) {
        push_matching(&era.uniques, &mut found);
    }

    for temporary in &civ.temporary_uniques {
        if temporary.unique.unique_type == unique_type
            && temporary.unique.conditionals_apply(state)
        {
            found.push(&temporary.unique);
        }
    }

    push_matching(&civ.founder_uniques, &mut found);

    for (resource, &amount) in &civ.owned_resources {
        if amount <= 0 {
            continue;
        }
        if let Some(def) = ruleset.resources.get(resource) {
            push_matching(&def.uniques, &mut found);
        }
    }

    for other in game.civilizations.iter() {
        if other.kind == CivKind::CityState && other.ally == Some(civ_id) {
            if let Some(nation) = ruleset.nations.get(&other.nation) {
                push_matching(&nation.patronage_uniques, &mut found);
            }
        }
    }

    push_matching(&ruleset.global_uniques, &mut found);

    found
}

/// Sum of `[stat, amount]`-style bonuses of the given type for a stat name.
pub fn civ_stat_bonus(game: &GameState, civ_id: CivId, unique_type: UniqueType, stat: &str) -> i32 {
    let state = StateForConditionals::for_civ(game, civ_id);
    civ_matching_uniques(game, civ_id, unique_type, &state)
        .iter()
        .filter(|u| u.param(0) == stat)
        .filter_map(|u| u.param_i32(1))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::GameStateBuilder;

    #[test]
    fn test_conditionals_are_pure_predicates() {
        let game = GameStateBuilder::new().with_civ("Rome").build();
        let state = StateForConditionals::for_civ(&game, 0);

        assert!(Conditional::WhenNotAtWar.applies(&state));
        assert!(!Conditional::WhenAtWar.applies(&state));
        assert!(Conditional::DuringEra("Ancient".to_string()).applies(&state));
        assert!(!Conditional::AboveGold(1000).applies(&state));
    }

    #[test]
    fn test_matching_skips_failed_conditionals() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        game.civ_mut(0).temporary_uniques.push(
            crate::civilization::TemporaryUnique {
                unique: Unique::with_conditionals(
                    UniqueType::StatsPerTurn,
                    &["gold", "5"],
                    vec![Conditional::WhenAtWar],
                ),
                turns_left: 3,
            },
        );

        // Not at war: suppressed. Nation unique ("gold 1") still applies.
        assert_eq!(civ_stat_bonus(&game, 0, UniqueType::StatsPerTurn, "gold"), 1);
    }

    #[test]
    fn test_zero_matches_is_empty_not_error() {
        let game = GameStateBuilder::new().with_civ("Greece").build();
        let state = StateForConditionals::for_civ(&game, 0);
        let found = civ_matching_uniques(&game, 0, UniqueType::OneTimeFreeUnit, &state);
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_ruleset_entries_are_skipped() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        // Policy and tech entries that no longer exist in the ruleset.
        game.civ_mut(0).policies.push("Ghost Policy".to_string());
        game.civ_mut(0).techs.insert("Ghost Tech".to_string());

        assert_eq!(civ_stat_bonus(&game, 0, UniqueType::StatsPerTurn, "gold"), 1);
    }

    #[test]
    fn test_aggregation_unions_all_source_levels() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_city(0, crate::hex::HexCoord::new(0, 0), true)
            .build();

        // nation: gold 1 (Rome). policy: culture 1 (Tradition).
        game.civ_mut(0).policies.push("Tradition".to_string());
        // era with a unique:
        game.civ_mut(0).era = "Classical".to_string();
        // city-attached (non-local) unique:
        let city_id = game.civ(0).cities[0];
        game.city_mut(city_id)
            .unwrap()
            .uniques
            .push(Unique::new(UniqueType::StatsPerTurn, &["gold", "2"]));
        // city-attached local unique must NOT aggregate:
        game.city_mut(city_id).unwrap().uniques.push(Unique::with_conditionals(
            UniqueType::StatsPerTurn,
            &["gold", "50"],
            vec![Conditional::OnlyInThisCity],
        ));
        // temporary buff:
        game.civ_mut(0)
            .temporary_uniques
            .push(crate::civilization::TemporaryUnique {
                unique: Unique::new(UniqueType::StatsPerTurn, &["gold", "3"]),
                turns_left: 2,
            });

        assert_eq!(civ_stat_bonus(&game, 0, UniqueType::StatsPerTurn, "gold"), 6);
        assert_eq!(
            civ_stat_bonus(&game, 0, UniqueType::StatsPerTurn, "culture"),
            1
        );
        assert_eq!(
            civ_stat_bonus(&game, 0, UniqueType::StatsPerTurn, "science"),
            1
        );
    }

    #[test]
    fn test_city_state_patronage_reaches_the_patron() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_city_state("Geneva")
            .build();
        game.civ_mut(1).ally = Some(0);

        assert_eq!(
            civ_stat_bonus(&game, 0, UniqueType::StatsPerTurn, "culture"),
            2
        );
        // The city-state itself gets nothing from its own patronage list.
        assert_eq!(
            civ_stat_bonus(&game, 1, UniqueType::StatsPerTurn, "culture"),
            0
        );
    }
}
