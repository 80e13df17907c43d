//! In-memory classification passes over a loaded transaction set.
//!
//! These functions never touch the database. The service layer loads rules and
//! transactions, runs a pass here, and writes back the [`Assignment`]s.

use std::cmp::Reverse;

use crate::matcher::{self, Condition};
use crate::models::{ClassificationStatus, MappingRule, Targets, Transaction};

/// The classification a transaction should end up with.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub transaction_id: i64,
    pub targets: Targets,
    pub status: ClassificationStatus,
}

impl Assignment {
    fn of(txn: &Transaction) -> Self {
        Self {
            transaction_id: txn.id,
            targets: txn.targets,
            status: txn.status,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reclassification {
    /// Sum over rules of transactions matched; a transaction hit by two rules counts twice.
    pub matched: usize,
    /// Transactions whose classification differs from the input.
    pub assignments: Vec<Assignment>,
}

/// Active rules, highest priority first. Ties keep their input order.
pub fn evaluation_order(rules: &[MappingRule]) -> Vec<&MappingRule> {
    let mut active: Vec<&MappingRule> = rules.iter().filter(|r| r.is_active).collect();
    active.sort_by_key(|r| Reverse(r.priority));
    active
}

/// Apply one rule to every transaction it matches, in the order given.
///
/// Matched transactions get the rule's non-null targets and become
/// `classified`, including ones previously edited by hand. Returns the IDs
/// of the matched transactions.
pub fn apply_rule(rule: &MappingRule, transactions: &mut [Transaction]) -> Vec<i64> {
    let Some(condition) = Condition::for_rule(rule) else {
        return Vec::new();
    };
    let mut matched = Vec::new();
    for txn in transactions.iter_mut() {
        if condition.matches(txn) {
            txn.targets.overlay(&rule.targets);
            txn.status = ClassificationStatus::Classified;
            matched.push(txn.id);
        }
    }
    matched
}

/// Reset every classified or manual transaction that matches `rule` back to
/// pending with no targets.
///
/// There is no record of which rule produced a classification, so this clears
/// everything the rule matches now, not only what it set.
pub fn revert(rule: &MappingRule, transactions: &mut [Transaction]) -> Vec<i64> {
    let Some(condition) = Condition::for_rule(rule) else {
        return Vec::new();
    };
    let mut reverted = Vec::new();
    for txn in transactions.iter_mut() {
        if txn.status == ClassificationStatus::Pending || !condition.matches(txn) {
            continue;
        }
        txn.targets = Targets::default();
        txn.status = ClassificationStatus::Pending;
        reverted.push(txn.id);
    }
    reverted
}

/// Run every active rule over the whole set, highest priority first.
///
/// Each rule overwrites what earlier rules assigned, so where two rules match
/// the same slot the lower-priority one has the final say.
pub fn reapply_all(rules: &[MappingRule], transactions: &mut [Transaction]) -> usize {
    evaluation_order(rules)
        .into_iter()
        .map(|rule| apply_rule(rule, transactions).len())
        .sum()
}

/// Classify a single new transaction with the first active rule that matches.
/// Returns the ID of that rule.
pub fn classify_first_match(rules: &[MappingRule], txn: &mut Transaction) -> Option<i64> {
    let rule = evaluation_order(rules).into_iter().find(|rule| matcher::matches(txn, rule))?;
    txn.targets.overlay(&rule.targets);
    txn.status = ClassificationStatus::Classified;
    Some(rule.id)
}

/// Assignments for every position where `after` differs from `before`.
/// Both slices must hold the same transactions in the same order.
pub fn changed(before: &[Transaction], after: &[Transaction]) -> Vec<Assignment> {
    before
        .iter()
        .zip(after)
        .filter(|(b, a)| b.targets != a.targets || b.status != a.status)
        .map(|(_, a)| Assignment::of(a))
        .collect()
}

/// Pure form of [`reapply_all`]: the input is left untouched and only the
/// resulting changes are returned.
pub fn reclassify(rules: &[MappingRule], transactions: &[Transaction]) -> Reclassification {
    let mut working = transactions.to_vec();
    let matched = reapply_all(rules, &mut working);
    Reclassification {
        matched,
        assignments: changed(transactions, &working),
    }
}
