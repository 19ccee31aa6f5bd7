use crate::candidate::RuleContribution;
use crate::rules::{self, Rule, RuleContext, RuleOutcome};
use crate::weights::WeightTable;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone)]
struct WeightedRule {
    rule: Rule,
    label: String,
    weight: i64,
}

/// Total score plus the non-zero contributions that produced it, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreCard {
    pub total: i64,
    pub details: Vec<RuleContribution>,
}

/// Applies every registered rule with its configured weight.
///
/// Built once from a [`WeightTable`] and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    rules: Vec<WeightedRule>,
}

impl ScoringEngine {
    pub fn new(weights: &WeightTable) -> Self {
        Self::from_rules(rules::registry(), weights)
    }

    pub fn from_rules(rules: Vec<Rule>, weights: &WeightTable) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| WeightedRule {
                label: rule.label(),
                weight: weights.weight(rule.id),
                rule,
            })
            .collect();
        Self { rules }
    }

    pub fn bundled() -> Self {
        Self::new(&WeightTable::bundled())
    }

    /// `(rule id, label, weight)` for every loaded rule.
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &str, i64)> + '_ {
        self.rules
            .iter()
            .map(|r| (r.rule.id, r.label.as_str(), r.weight))
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Scores one candidate. A rule that panics or yields a non-finite
    /// grade is logged and contributes nothing.
    pub fn calculate_score(
        &self,
        ctx: &RuleContext<'_>,
        log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    ) -> ScoreCard {
        let mut card = ScoreCard::default();

        for weighted in &self.rules {
            let apply = weighted.rule.apply;
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| apply(ctx))) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    log_line(
                        "warn",
                        "rule_failed",
                        serde_json::json!({
                            "rule": weighted.rule.id,
                            "url": ctx.url,
                            "error": panic_message(payload.as_ref()),
                        }),
                    );
                    continue;
                }
            };

            let points = match contribution(outcome, weighted.weight) {
                Ok(points) => points,
                Err(message) => {
                    log_line(
                        "warn",
                        "rule_failed",
                        serde_json::json!({
                            "rule": weighted.rule.id,
                            "url": ctx.url,
                            "error": message,
                        }),
                    );
                    continue;
                }
            };
            if points == 0 {
                continue;
            }

            card.total += points;
            card.details.push(RuleContribution {
                label: weighted.label.clone(),
                points,
            });
            log_line(
                "debug",
                "rule_contributed",
                serde_json::json!({
                    "rule": weighted.rule.id,
                    "url": ctx.url,
                    "points": points,
                }),
            );
        }

        card
    }
}

/// Signed points for one rule outcome; true earns the full weight, a grade earns `round(weight * grade)`.
pub fn contribution(outcome: RuleOutcome, weight: i64) -> Result<i64, String> {
    match outcome {
        RuleOutcome::Skip => Ok(0),
        RuleOutcome::Applies => Ok(weight),
        RuleOutcome::Graded(value) if !value.is_finite() => {
            Err(format!("rule produced a non-finite grade: {value}"))
        }
        RuleOutcome::Graded(value) => Ok((weight as f64 * value).round() as i64),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "rule panicked".to_string()
    }
}
