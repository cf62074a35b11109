//! End-of-turn phase implementations.

use crate::civilization::flag;
use crate::notifications::NotificationCategory;
use crate::state::{CityId, CivId, GameState, UnitId};
use crate::systems::{stats, victory, EndTurnPhase};
use crate::triggers::{drain_pending_triggers, PendingTrigger};
use crate::uniques::{civ_matching_uniques, StateForConditionals, UniqueType};
use crate::unit::{is_military, unit_end_turn};

/// Turns between gifts from an allied city-state.
const CITY_STATE_GIFT_INTERVAL: i32 = 10;

pub fn run_phase(game: &mut GameState, civ_id: CivId, phase: EndTurnPhase) {
    match phase {
        EndTurnPhase::RotateNotifications => rotate_notifications(game, civ_id),
        EndTurnPhase::RecomputeStats => stats::update_stats_for_next_turn(game, civ_id),
        EndTurnPhase::AccrueStats => accrue_stats(game, civ_id),
        EndTurnPhase::CityStateQuests => city_state_quests(game, civ_id),
        EndTurnPhase::EmergencyDisband => emergency_disband(game, civ_id),
        EndTurnPhase::CityEndTurn => city_hooks(game, civ_id),
        EndTurnPhase::ExpireTemporaryUniques => expire_temporary_uniques(game, civ_id),
        EndTurnPhase::AdvanceGoldenAge => advance_golden_age(game, civ_id),
        EndTurnPhase::UnitEndTurn => unit_hooks(game, civ_id),
        EndTurnPhase::AdvanceDiplomacy => advance_diplomacy(game, civ_id),
        EndTurnPhase::InvalidateMilitaryMight => {
            game.civ_mut(civ_id).military_might = None;
        }
        EndTurnPhase::CheckVictory => victory::check_victory(game),
    }
}

fn rotate_notifications(game: &mut GameState, civ_id: CivId) {
    let turn = game.turn;
    let max_turns = game.config.max_notification_turns;
    game.civ_mut(civ_id).notifications.rotate(turn, max_turns);
}

/// Apply the recomputed projection to the stored subsystems: treasury,
/// research, culture, faith, golden-age and great-person point banks.
fn accrue_stats(game: &mut GameState, civ_id: CivId) {
    let great_person_percent: i32 = {
        let state = StateForConditionals::for_civ(game, civ_id);
        civ_matching_uniques(game, civ_id, UniqueType::GreatPersonPointsPercent, &state)
            .iter()
            .filter_map(|u| u.param_i32(0))
            .sum()
    };

    let civ = game.civ_mut(civ_id);
    let turn_stats = civ.stats_for_next_turn;
    civ.gold += turn_stats.gold;
    civ.culture_stored += turn_stats.culture;
    civ.faith += turn_stats.faith;
    civ.golden_age_points += turn_stats.happiness.max(0);
    let base_gpp = civ.cities.len() as i32;
    civ.great_person_points += base_gpp * (100 + great_person_percent).max(0) / 100;
    civ.science_stored += turn_stats.science;

    if civ.tech_in_progress.is_none() && civ.is_ai() {
        choose_research(game, civ_id);
    }
    advance_research(game, civ_id);
}

/// AI research picker: cheapest available tech, name as tiebreak (the tech
/// table iterates in name order already).
fn choose_research(game: &mut GameState, civ_id: CivId) {
    let civ = game.civ(civ_id);
    let pick = game
        .ruleset
        .techs
        .values()
        .filter(|t| !civ.has_tech(&t.name))
        .filter(|t| t.prerequisites.iter().all(|p| civ.has_tech(p)))
        .min_by_key(|t| t.cost)
        .map(|t| t.name.clone());
    game.civ_mut(civ_id).tech_in_progress = pick;
}

/// Complete the current research target if enough science is banked: record
/// the tech, fire its triggered uniques, and notify.
fn advance_research(game: &mut GameState, civ_id: CivId) {
    let Some(tech_name) = game.civ(civ_id).tech_in_progress.clone() else {
        return;
    };
    let Some(tech) = game.ruleset.techs.get(&tech_name) else {
        log::warn!("civ {civ_id} researching unknown tech {tech_name:?}; dropping it");
        game.civ_mut(civ_id).tech_in_progress = None;
        return;
    };
    if game.civ(civ_id).science_stored < tech.cost {
        return;
    }

    let cost = tech.cost;
    let era = tech.era.clone();
    let unlocks_road = tech.unlocks_road;
    let triggered: Vec<_> = tech
        .uniques
        .iter()
        .filter(|u| u.unique_type.is_triggerable())
        .cloned()
        .collect();

    let civ = game.civ_mut(civ_id);
    civ.science_stored -= cost;
    civ.techs.insert(tech_name.clone());
    civ.era = era;
    civ.tech_in_progress = None;
    civ.add_notification(
        format!("Research of {tech_name} has completed!"),
        NotificationCategory::Science,
        None,
        &["tech/completed"],
    );
    if let Some(road) = unlocks_road {
        civ.add_notification(
            format!("Your workers can now build {}s!", road.name()),
            NotificationCategory::Production,
            None,
            &["improvement/road"],
        );
    }

    for unique in triggered {
        let reason = format!("due to researching {tech_name}");
        game.pending_triggers
            .push(PendingTrigger::new(unique, civ_id, None, Some(reason)));
    }
    drain_pending_triggers(game);
}

/// City-state bookkeeping: an allied city-state keeps a gift countdown armed.
fn city_state_quests(game: &mut GameState, civ_id: CivId) {
    let civ = game.civ_mut(civ_id);
    if civ.is_city_state() && civ.ally.is_some() && !civ.has_flag(flag::CITY_STATE_GIFT) {
        civ.add_flag(flag::CITY_STATE_GIFT, CITY_STATE_GIFT_INTERVAL);
    }
}

/// Forcible disbanding under severe deficit: one unit per full deficit step,
/// cheapest military unit first, only while next-turn gold is still negative.
fn emergency_disband(game: &mut GameState, civ_id: CivId) {
    let per = game.config.emergency_disband_per;
    let civ = game.civ(civ_id);
    if civ.gold > -per || civ.stats_for_next_turn.gold >= 0 {
        return;
    }
    let to_disband = (-civ.gold) / per;
    for _ in 0..to_disband {
        let Some(unit_id) = cheapest_military_unit(game, civ_id) else {
            break;
        };
        let name = game
            .unit(unit_id)
            .map(|u| u.base.clone())
            .unwrap_or_default();
        game.remove_unit(unit_id);
        game.civ_mut(civ_id).add_notification(
            format!("Cannot provide unit upkeep for {name} - the unit has been disbanded!"),
            NotificationCategory::Units,
            None,
            &["unit/disbanded"],
        );
    }
}

fn cheapest_military_unit(game: &GameState, civ_id: CivId) -> Option<UnitId> {
    game.civ(civ_id)
        .units
        .iter()
        .copied()
        .filter(|&id| is_military(game, id))
        .min_by_key(|&id| {
            let cost = game
                .unit(id)
                .and_then(|u| game.ruleset.units.get(&u.base))
                .map(|d| d.cost)
                .unwrap_or(i32::MAX);
            (cost, id)
        })
}

/// Razed cities run before the rest so tile-ownership races resolve in the
/// razing city's favor.
fn city_hooks(game: &mut GameState, civ_id: CivId) {
    let (razed, rest): (Vec<CityId>, Vec<CityId>) = game
        .civ(civ_id)
        .cities
        .iter()
        .copied()
        .partition(|&id| game.city(id).map(|c| c.is_being_razed).unwrap_or(false));
    for city_id in razed.into_iter().chain(rest) {
        crate::city::city_end_turn(game, city_id);
    }
}

fn expire_temporary_uniques(game: &mut GameState, civ_id: CivId) {
    let civ = game.civ_mut(civ_id);
    for temp in &mut civ.temporary_uniques {
        temp.turns_left -= 1;
    }
    civ.temporary_uniques.retain(|t| t.turns_left > 0);
}

fn advance_golden_age(game: &mut GameState, civ_id: CivId) {
    let threshold = game.config.golden_age_threshold;
    let length = game.config.golden_age_length;
    let civ = game.civ_mut(civ_id);
    if civ.golden_age_turns > 0 {
        civ.golden_age_turns -= 1;
        if civ.golden_age_turns == 0 {
            civ.add_notification(
                "Your golden age has ended.",
                NotificationCategory::General,
                None,
                &["event/golden_age"],
            );
        }
    } else if civ.golden_age_points >= threshold {
        civ.golden_age_points -= threshold;
        civ.golden_age_turns = length;
        civ.add_notification(
            format!("You have entered a golden age for {length} turns!"),
            NotificationCategory::General,
            None,
            &["event/golden_age"],
        );
    }
}

fn unit_hooks(game: &mut GameState, civ_id: CivId) {
    for unit_id in game.civ(civ_id).units.clone() {
        unit_end_turn(game, unit_id);
    }
}

/// Opinions drift toward zero by one point per turn.
fn advance_diplomacy(game: &mut GameState, civ_id: CivId) {
    let civ = game.civ_mut(civ_id);
    for record in civ.diplomacy.values_mut() {
        record.opinion -= record.opinion.signum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civilization::{DiplomacyRecord, TemporaryUnique};
    use crate::hex::HexCoord;
    use crate::testing::GameStateBuilder;
    use crate::uniques::Unique;

    #[test]
    fn test_emergency_disband_one_per_full_deficit_step() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        for q in -2..3 {
            game.add_unit(0, HexCoord::new(q, 0), "Warrior");
        }
        game.civ_mut(0).gold = -250;
        game.civ_mut(0).stats_for_next_turn.gold = -5;

        // 250 deficit at 100 per step: exactly two units go.
        emergency_disband(&mut game, 0);
        assert_eq!(game.civ(0).units.len(), 3);
    }

    #[test]
    fn test_no_disband_when_projection_recovers() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        game.add_unit(0, HexCoord::new(0, 0), "Warrior");
        game.civ_mut(0).gold = -250;
        game.civ_mut(0).stats_for_next_turn.gold = 3;

        emergency_disband(&mut game, 0);
        assert_eq!(game.civ(0).units.len(), 1);
    }

    #[test]
    fn test_disband_prefers_cheapest() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        game.add_unit(0, HexCoord::new(0, 0), "Warrior"); // cost 40
        game.add_unit(0, HexCoord::new(1, 0), "Scout"); // cost 25
        game.civ_mut(0).gold = -100;
        game.civ_mut(0).stats_for_next_turn.gold = -1;

        emergency_disband(&mut game, 0);
        let survivors: Vec<_> = game
            .civ(0)
            .units
            .iter()
            .map(|&id| game.unit(id).unwrap().base.clone())
            .collect();
        assert_eq!(survivors, vec!["Warrior".to_string()]);
    }

    #[test]
    fn test_city_hooks_run_razed_cities_first() {
        let mut game = GameStateBuilder::new()
            .with_civ("Rome")
            .with_city(0, HexCoord::new(0, 0), true)
            .with_city(0, HexCoord::new(3, 0), false)
            .build();
        let condemned = game.civ(0).cities[1];
        game.city_mut(condemned).unwrap().is_being_razed = true;
        {
            let tile = game.map.get_mut(HexCoord::new(1, 0)).unwrap();
            tile.owner = Some(0);
            tile.improvement = Some("Farm".to_string());
        }

        city_hooks(&mut game, 0);
        assert!(game.city(condemned).is_none());
        // The surviving city still ran its own hook and banked its surplus.
        let capital = game.civ(0).cities[0];
        assert!(game.city(capital).unwrap().food_stored > 0);
    }

    #[test]
    fn test_research_completes_and_unlocks() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        game.civ_mut(0).tech_in_progress = Some("Agriculture".to_string());
        game.civ_mut(0).science_stored = 25;

        advance_research(&mut game, 0);
        let civ = game.civ(0);
        assert!(civ.has_tech("Agriculture"));
        assert_eq!(civ.science_stored, 5);
        assert_eq!(civ.tech_in_progress, None);
    }

    #[test]
    fn test_ai_research_picks_cheapest_available() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        choose_research(&mut game, 0);
        // Only Agriculture has no prerequisites in the test tree.
        assert_eq!(game.civ(0).tech_in_progress, Some("Agriculture".to_string()));
    }

    #[test]
    fn test_temporary_uniques_expire() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        game.civ_mut(0).temporary_uniques.push(TemporaryUnique {
            unique: Unique::new(UniqueType::StatsPerTurn, &["gold", "3"]),
            turns_left: 1,
        });
        expire_temporary_uniques(&mut game, 0);
        assert!(game.civ(0).temporary_uniques.is_empty());
    }

    #[test]
    fn test_golden_age_starts_and_counts_down() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        game.civ_mut(0).golden_age_points = game.config.golden_age_threshold + 7;

        advance_golden_age(&mut game, 0);
        assert_eq!(game.civ(0).golden_age_points, 7);
        assert_eq!(game.civ(0).golden_age_turns, game.config.golden_age_length);

        advance_golden_age(&mut game, 0);
        assert_eq!(game.civ(0).golden_age_turns, game.config.golden_age_length - 1);
    }

    #[test]
    fn test_opinion_decays_toward_zero() {
        let mut game = GameStateBuilder::new().with_civ("Rome").with_civ("Greece").build();
        game.civ_mut(0).diplomacy.insert(
            1,
            DiplomacyRecord { opinion: -2, ..Default::default() },
        );
        advance_diplomacy(&mut game, 0);
        assert_eq!(game.civ(0).diplomacy[&1].opinion, -1);
        advance_diplomacy(&mut game, 0);
        advance_diplomacy(&mut game, 0);
        assert_eq!(game.civ(0).diplomacy[&1].opinion, 0);
    }
}
