//! One-shot trigger activation.
//!
//! Triggered uniques fire on discrete events (a promotion granted, a tech
//! finished, a flag countdown reaching zero) instead of being continuously
//! active. Every queued activation is a [`PendingTrigger`] with an explicit
//! consumed state — there are no ad hoc "already fired" booleans scattered
//! across entities. Activating a consumed trigger is a contract violation:
//! logged, then a no-op.

use crate::notifications::NotificationCategory;
use crate::state::{CivId, GameState, UnitId};
use crate::uniques::{StateForConditionals, Unique, UniqueType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTrigger {
    pub unique: Unique,
    pub civ: CivId,
    pub unit: Option<UnitId>,
    /// Shown to the player alongside the effect ("due to the X promotion").
    pub reason: Option<String>,
    consumed: bool,
}

impl PendingTrigger {
    pub fn new(unique: Unique, civ: CivId, unit: Option<UnitId>, reason: Option<String>) -> Self {
        Self {
            unique,
            civ,
            unit,
            reason,
            consumed: false,
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }
}

/// Apply a triggered unique exactly once.
///
/// Conditionals are re-checked at activation time against *current* state:
/// a trigger queued earlier may no longer qualify, in which case it is
/// consumed without effect (the event it belonged to has passed). Returns
/// whether the effect was applied.
pub fn activate_trigger(game: &mut GameState, trigger: &mut PendingTrigger) -> bool {
    if trigger.consumed {
        log::warn!(
            "attempted to re-activate a consumed trigger ({:?}), ignored",
            trigger.unique.unique_type
        );
        return false;
    }
    if !trigger.unique.unique_type.is_triggerable() {
        log::warn!(
            "non-triggerable unique {:?} queued as trigger, ignored",
            trigger.unique.unique_type
        );
        trigger.consumed = true;
        return false;
    }

    let state = StateForConditionals {
        game,
        civ: Some(trigger.civ),
        city: None,
        unit: trigger.unit,
        tile: None,
    };
    if !trigger.unique.conditionals_apply(&state) {
        trigger.consumed = true;
        return false;
    }
    trigger.consumed = true;

    let civ_id = trigger.civ;
    let suffix = trigger
        .reason
        .as_deref()
        .map(|r| format!(" {r}"))
        .unwrap_or_default();

    match trigger.unique.unique_type {
        UniqueType::OneTimeGainGold => {
            let Some(amount) = trigger.unique.param_i32(0) else {
                return false;
            };
            let civ = game.civ_mut(civ_id);
            civ.gold += amount;
            civ.add_notification(
                format!("Gained {amount} gold{suffix}"),
                NotificationCategory::General,
                None,
                &["stat/gold"],
            );
        }
        UniqueType::OneTimeGainFaith => {
            let Some(amount) = trigger.unique.param_i32(0) else {
                return false;
            };
            let civ = game.civ_mut(civ_id);
            civ.faith += amount;
            civ.add_notification(
                format!("Gained {amount} faith{suffix}"),
                NotificationCategory::Religion,
                None,
                &["stat/faith"],
            );
        }
        UniqueType::OneTimeGainResource => {
            let resource = trigger.unique.param(0).to_string();
            let Some(amount) = trigger.unique.param_i32(1) else {
                return false;
            };
            if !game.ruleset.resources.contains_key(&resource) {
                // Removed by a content change: skip, not fatal.
                log::warn!("trigger references unknown resource {resource}, skipped");
                return false;
            }
            let civ = game.civ_mut(civ_id);
            *civ.resource_stockpile.entry(resource.clone()).or_insert(0) += amount;
            civ.add_notification(
                format!("Gained {amount} {resource}{suffix}"),
                NotificationCategory::General,
                None,
                &["resource"],
            );
        }
        UniqueType::OneTimeFreeUnit => {
            let base = trigger.unique.param(0).to_string();
            let Some(capital_id) = game.capital_of(civ_id) else {
                return false;
            };
            let Some(center) = game.city(capital_id).map(|c| c.center) else {
                return false;
            };
            if game.add_unit(civ_id, center, &base).is_none() {
                log::warn!("trigger references unknown unit {base}, skipped");
                return false;
            }
            game.civ_mut(civ_id).add_notification(
                format!("A {base} has joined us{suffix}"),
                NotificationCategory::Units,
                Some(center),
                &["unit"],
            );
        }
        _ => return false,
    }
    true
}

/// Drain and activate everything queued on the game state.
pub fn drain_pending_triggers(game: &mut GameState) {
    let mut pending = std::mem::take(&mut game.pending_triggers);
    for trigger in &mut pending {
        activate_trigger(game, trigger);
    }
    // All drained triggers are consumed; nothing goes back on the queue.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::GameStateBuilder;
    use crate::uniques::Conditional;

    #[test]
    fn test_trigger_applies_exactly_once() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        let mut trigger = PendingTrigger::new(
            Unique::new(UniqueType::OneTimeGainGold, &["50"]),
            0,
            None,
            None,
        );

        assert!(activate_trigger(&mut game, &mut trigger));
        assert_eq!(game.civ(0).gold, 50);

        // Re-evaluation of the same historical event must not re-apply.
        assert!(!activate_trigger(&mut game, &mut trigger));
        assert_eq!(game.civ(0).gold, 50);
    }

    #[test]
    fn test_conditionals_rechecked_at_activation() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        let mut trigger = PendingTrigger::new(
            Unique::with_conditionals(
                UniqueType::OneTimeGainGold,
                &["50"],
                vec![Conditional::WhenAtWar],
            ),
            0,
            None,
            None,
        );

        // Queued while (hypothetically) at war, activated at peace: no effect,
        // and the trigger is consumed rather than left dangling.
        assert!(!activate_trigger(&mut game, &mut trigger));
        assert_eq!(game.civ(0).gold, 0);
        assert!(trigger.is_consumed());
    }

    #[test]
    fn test_continuous_unique_rejected_as_trigger() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        let mut trigger = PendingTrigger::new(
            Unique::new(UniqueType::StatsPerTurn, &["gold", "5"]),
            0,
            None,
            None,
        );
        assert!(!activate_trigger(&mut game, &mut trigger));
    }

    #[test]
    fn test_drain_consumes_queue() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        game.pending_triggers.push(PendingTrigger::new(
            Unique::new(UniqueType::OneTimeGainGold, &["10"]),
            0,
            None,
            None,
        ));
        game.pending_triggers.push(PendingTrigger::new(
            Unique::new(UniqueType::OneTimeGainFaith, &["5"]),
            0,
            None,
            None,
        ));

        drain_pending_triggers(&mut game);
        assert_eq!(game.civ(0).gold, 10);
        assert_eq!(game.civ(0).faith, 5);
        assert!(game.pending_triggers.is_empty());
    }

    #[test]
    fn test_unknown_resource_is_skipped() {
        let mut game = GameStateBuilder::new().with_civ("Rome").build();
        let mut trigger = PendingTrigger::new(
            Unique::new(UniqueType::OneTimeGainResource, &["Unobtainium", "3"]),
            0,
            None,
            None,
        );
        assert!(!activate_trigger(&mut game, &mut trigger));
        assert!(game.civ(0).resource_stockpile.is_empty());
    }
}
