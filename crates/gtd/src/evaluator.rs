//! Policy execution and conflict resolution.
//!
//! The decision table runs in a fixed order that encodes the safety
//! contract: an immediate close beats everything, shortening beats
//! extending no matter the priorities involved, and priorities only break
//! ties between results proposing the SAME action. Do not reorder.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use play_engine_core::play::Play;

use crate::context::GtdContext;
use crate::registry::PolicyRegistry;
use crate::result::{GtdAction, GtdResult};

/// One policy's logged outcome for the cycle.
#[derive(Debug, Clone)]
pub struct PolicyOutcome {
    pub policy: String,
    pub result: GtdResult,
}

/// Authoritative per-cycle decision for one play.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub should_close: bool,
    pub close_reason: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub effective_date_changed: bool,
    /// Per-policy results log for dashboards and audits.
    pub results: Vec<PolicyOutcome>,
    pub is_gtd_exit: bool,
    /// Whether any policy's persisted state changed this cycle.
    pub state_changed: bool,
}

impl Evaluation {
    /// Whether the play record needs persisting. Unchanged resolutions must
    /// not trigger a write.
    #[must_use]
    pub fn requires_write(&self) -> bool {
        self.should_close || self.effective_date_changed || self.state_changed
    }
}

/// Runs every enabled configured policy for the play and resolves their
/// recommendations. Mutates only the play's `dynamic_gtd` block: persisted
/// policy state, the effective date when it moves, and `last_evaluated`.
pub fn evaluate_play(
    play: &mut Play,
    ctx: &GtdContext,
    registry: &PolicyRegistry,
) -> Evaluation {
    if !play.dynamic_gtd.enabled {
        return Evaluation::default();
    }

    let mut outcomes = Vec::new();
    let mut state_changed = false;

    let instances: Vec<_> = play
        .dynamic_gtd
        .policies
        .iter()
        .filter(|p| p.enabled)
        .cloned()
        .collect();

    for instance in instances {
        let Some(mut policy) = registry.create(&instance.name) else {
            warn!(policy = %instance.name, "Configured policy is not registered — skipping");
            continue;
        };

        let violations = policy.validate_config(&instance.params);
        if !violations.is_empty() {
            warn!(
                policy = %instance.name,
                violations = ?violations,
                "Invalid policy configuration — skipping"
            );
            continue;
        }

        if policy.requires_market_data() && !ctx.has_market_data() {
            info!(
                policy = %instance.name,
                "Market data unavailable this cycle — policy skipped, not held"
            );
            continue;
        }

        if let Some(state) = play.dynamic_gtd.policy_state.get(&instance.name) {
            policy.load_state(state);
        }

        match policy.evaluate(ctx) {
            Ok(result) => {
                debug!(
                    policy = %instance.name,
                    action = ?result.action,
                    reason = %result.reason,
                    "Policy evaluated"
                );
                if let Some(new_state) = policy.state() {
                    let prior = play.dynamic_gtd.policy_state.get(&instance.name);
                    if prior != Some(&new_state) {
                        play.dynamic_gtd
                            .policy_state
                            .insert(instance.name.clone(), new_state);
                        state_changed = true;
                    }
                }
                outcomes.push(PolicyOutcome {
                    policy: instance.name.clone(),
                    result,
                });
            }
            Err(e) => {
                // One broken policy abstains; it never takes the sweep down.
                warn!(policy = %instance.name, error = %e, "Policy evaluation failed — abstaining");
            }
        }
    }

    let resolution = resolve(&outcomes, ctx.effective_date, ctx.option_expiration);

    play.dynamic_gtd.last_evaluated = Some(ctx.now);
    if resolution.effective_date_changed {
        play.dynamic_gtd.effective_date = Some(resolution.effective_date);
    }

    let mut evaluation = Evaluation {
        should_close: resolution.should_close,
        close_reason: resolution.close_reason,
        effective_date: Some(resolution.effective_date),
        effective_date_changed: resolution.effective_date_changed,
        results: outcomes,
        is_gtd_exit: resolution.should_close,
        state_changed,
    };

    // The deadline itself is an exit condition: an effective date at or
    // before today closes the play even when no policy said CLOSE_NOW.
    if !evaluation.should_close && resolution.effective_date <= ctx.current_date {
        evaluation.should_close = true;
        evaluation.is_gtd_exit = true;
        evaluation.close_reason = Some(format!(
            "good-til-date {} reached",
            resolution.effective_date
        ));
    }

    evaluation
}

struct Resolution {
    should_close: bool,
    close_reason: Option<String>,
    effective_date: NaiveDate,
    effective_date_changed: bool,
}

/// The fixed-order decision table. See the module docs: the order IS the
/// safety contract.
fn resolve(
    outcomes: &[PolicyOutcome],
    current_effective: NaiveDate,
    backstop: NaiveDate,
) -> Resolution {
    // 1. Any CLOSE_NOW wins outright; lowest priority number breaks ties.
    //    No date arithmetic happens after a close decision.
    if let Some(winner) = outcomes
        .iter()
        .filter(|o| o.result.action == GtdAction::CloseNow)
        .min_by_key(|o| o.result.priority)
    {
        return Resolution {
            should_close: true,
            close_reason: Some(format!("{}: {}", winner.policy, winner.result.reason)),
            effective_date: current_effective,
            effective_date_changed: false,
        };
    }

    // 2. Among SHORTEN results take the earliest date — most conservative.
    let earliest_shorten = outcomes
        .iter()
        .filter(|o| o.result.action == GtdAction::Shorten)
        .filter_map(|o| o.result.recommended_date)
        .min();
    if let Some(date) = earliest_shorten {
        return Resolution {
            should_close: false,
            close_reason: None,
            effective_date: date,
            effective_date_changed: date != current_effective,
        };
    }

    // 3. Only without any SHORTEN do EXTEND results count: latest date,
    //    clamped to the contract expiration backstop.
    let latest_extend = outcomes
        .iter()
        .filter(|o| o.result.action == GtdAction::Extend)
        .filter_map(|o| o.result.recommended_date)
        .max();
    if let Some(date) = latest_extend {
        let clamped = date.min(backstop);
        return Resolution {
            should_close: false,
            close_reason: None,
            effective_date: clamped,
            effective_date_changed: clamped != current_effective,
        };
    }

    // 4. No opinion: the effective date stands, and nothing gets written.
    Resolution {
        should_close: false,
        close_reason: None,
        effective_date: current_effective,
        effective_date_changed: false,
    }
}
