//! Match decision between one transaction and one rule condition.
//!
//! Every failure mode (bad regex, malformed range, unknown type or field)
//! compiles to "no condition", which never matches. Nothing here returns an
//! error to the caller.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::models::{ConditionField, ConditionType, MappingRule, Transaction};

/// A rule condition parsed once, ready to test against many transactions.
#[derive(Debug, Clone)]
pub enum Condition {
    Contains { field: ConditionField, needle: String },
    Equals { field: ConditionField, value: String },
    Regex { field: ConditionField, pattern: Regex },
    AmountRange { min: f64, max: f64 },
}

impl Condition {
    pub fn compile(condition_type: &str, condition_field: &str, condition_value: &str) -> Option<Self> {
        let Some(kind) = ConditionType::parse(condition_type) else {
            warn!("unknown condition type '{condition_type}', condition never matches");
            return None;
        };

        // amount_range reads the amount, whatever field was recorded
        if kind == ConditionType::AmountRange {
            let parsed = parse_amount_range(condition_value);
            if parsed.is_none() {
                warn!("malformed amount range '{condition_value}', condition never matches");
            }
            return parsed.map(|(min, max)| Self::AmountRange { min, max });
        }

        let Some(field) = ConditionField::parse(condition_field) else {
            warn!("unknown condition field '{condition_field}', condition never matches");
            return None;
        };

        match kind {
            ConditionType::Contains => Some(Self::Contains {
                field,
                needle: condition_value.to_lowercase(),
            }),
            ConditionType::Equals => Some(Self::Equals {
                field,
                value: condition_value.to_lowercase(),
            }),
            ConditionType::Regex => match RegexBuilder::new(condition_value).case_insensitive(true).build() {
                Ok(pattern) => Some(Self::Regex { field, pattern }),
                Err(e) => {
                    warn!("invalid regex '{condition_value}': {e}");
                    None
                }
            },
            ConditionType::AmountRange => None,
        }
    }

    pub fn for_rule(rule: &MappingRule) -> Option<Self> {
        Self::compile(&rule.condition_type, &rule.condition_field, &rule.condition_value)
    }

    pub fn matches(&self, txn: &Transaction) -> bool {
        match self {
            Self::Contains { field, needle } => field.value(txn).to_lowercase().contains(needle.as_str()),
            Self::Equals { field, value } => field.value(txn).to_lowercase() == *value,
            Self::Regex { field, pattern } => pattern.is_match(field.value(txn)),
            Self::AmountRange { min, max } => {
                let amount = txn.amount.abs();
                *min <= amount && amount <= *max
            }
        }
    }
}

/// `"<min>,<max>"` with exactly two numeric tokens.
fn parse_amount_range(raw: &str) -> Option<(f64, f64)> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        return None;
    }
    let min: f64 = parts[0].trim().parse().ok()?;
    let max: f64 = parts[1].trim().parse().ok()?;
    Some((min, max))
}

pub fn matches(txn: &Transaction, rule: &MappingRule) -> bool {
    Condition::for_rule(rule).is_some_and(|condition| condition.matches(txn))
}
