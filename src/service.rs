//! Entry points that change rules or classifications.
//!
//! Each function runs in one SQLite transaction: rules and transactions are
//! loaded, the classification pass runs in memory, changes are written back,
//! then the transaction commits. Any error drops the transaction, which rolls
//! everything back, so a failed operation leaves no partial classification.
//!
//! After every change to the active rule set the stored classifications equal
//! running all active rules, highest priority first, over every active
//! transaction.

use rusqlite::Connection;
use serde_json::json;
use tracing::{info, warn};

use crate::classifier;
use crate::error::{HoegyeError, Result};
use crate::matcher::Condition;
use crate::models::{ClassificationStatus, MappingRule, NewRule, NewTransaction, RuleChanges, Targets, Transaction};
use crate::store::{self, TxnScope};

/// Split amounts must sum to the original within this tolerance.
const SPLIT_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassifyReport {
    /// Matches counted per rule, so one transaction can count more than once.
    pub matched: usize,
    /// Transactions whose stored classification changed.
    pub changed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub rule_id: i64,
    pub is_active: bool,
    pub reverted: usize,
    pub report: ClassifyReport,
}

#[derive(Debug, Clone)]
pub struct SplitPart {
    pub amount: f64,
    pub description: Option<String>,
}

/// Only an empty name is refused. A condition that does not compile is
/// stored anyway and classifies nothing.
fn validate_rule(name: &str, condition_type: &str, condition_field: &str, condition_value: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(HoegyeError::InvalidRule("name must not be empty".to_string()));
    }
    if Condition::compile(condition_type, condition_field, condition_value).is_none() {
        warn!("rule '{name}' is saved but its condition never matches");
    }
    Ok(())
}

/// Run every active rule over `working` and write back what changed relative
/// to `before`.
fn reapply_and_save(conn: &Connection, before: &[Transaction], working: &mut [Transaction]) -> Result<ClassifyReport> {
    let rules = store::active_rules(conn)?;
    let matched = classifier::reapply_all(&rules, working);
    let changes = classifier::changed(before, working);
    let changed = store::save_assignments(conn, &changes)?;
    Ok(ClassifyReport { matched, changed })
}

pub fn add_rule(conn: &mut Connection, rule: &NewRule) -> Result<(i64, ClassifyReport)> {
    validate_rule(
        &rule.name,
        rule.condition_type.as_str(),
        rule.condition_field.as_str(),
        &rule.condition_value,
    )?;

    let tx = conn.transaction()?;
    let id = store::insert_rule(&tx, rule)?;
    let stored = store::get_rule(&tx, id)?;
    store::record_audit(&tx, "rule.add", "mapping_rules", id, None, Some(&store::rule_json(&stored)))?;

    let report = if rule.is_active {
        let before = store::load_transactions(&tx, TxnScope::All)?;
        let mut working = before.clone();
        reapply_and_save(&tx, &before, &mut working)?
    } else {
        ClassifyReport::default()
    };
    tx.commit()?;

    info!(rule_id = id, matched = report.matched, changed = report.changed, "added rule '{}'", rule.name);
    Ok((id, report))
}

/// Flip a rule's active flag and bring every classification in line with the
/// new active set.
///
/// Turning a rule off first reverts whatever it currently matches, then the
/// remaining active rules are reapplied. Turning it on just reapplies.
pub fn toggle_rule(conn: &mut Connection, id: i64) -> Result<ToggleOutcome> {
    let tx = conn.transaction()?;
    let mut rule = store::get_rule(&tx, id)?;
    let old_values = store::rule_json(&rule);
    rule.is_active = !rule.is_active;
    store::set_rule_active(&tx, id, rule.is_active)?;

    let before = store::load_transactions(&tx, TxnScope::All)?;
    let mut working = before.clone();
    let reverted = if rule.is_active {
        0
    } else {
        classifier::revert(&rule, &mut working).len()
    };
    let report = reapply_and_save(&tx, &before, &mut working)?;

    store::record_audit(
        &tx,
        "rule.toggle",
        "mapping_rules",
        id,
        Some(&old_values),
        Some(&store::rule_json(&rule)),
    )?;
    tx.commit()?;

    info!(
        rule_id = id,
        active = rule.is_active,
        reverted,
        matched = report.matched,
        changed = report.changed,
        "toggled rule '{}'",
        rule.name
    );
    Ok(ToggleOutcome {
        rule_id: id,
        is_active: rule.is_active,
        reverted,
        report,
    })
}

/// Update a rule. If it was active, what the old version matched is reverted
/// before the edit is stored and the active set is reapplied afterwards.
pub fn edit_rule(conn: &mut Connection, id: i64, changes: &RuleChanges) -> Result<(MappingRule, ClassifyReport)> {
    let tx = conn.transaction()?;
    let old = store::get_rule(&tx, id)?;
    let edited = changes.apply_to(&old);
    validate_rule(&edited.name, &edited.condition_type, &edited.condition_field, &edited.condition_value)?;

    let report = if old.is_active {
        let before = store::load_transactions(&tx, TxnScope::All)?;
        let mut working = before.clone();
        classifier::revert(&old, &mut working);
        store::update_rule(&tx, &edited)?;
        reapply_and_save(&tx, &before, &mut working)?
    } else {
        store::update_rule(&tx, &edited)?;
        ClassifyReport::default()
    };

    store::record_audit(
        &tx,
        "rule.edit",
        "mapping_rules",
        id,
        Some(&store::rule_json(&old)),
        Some(&store::rule_json(&edited)),
    )?;
    tx.commit()?;

    info!(rule_id = id, matched = report.matched, changed = report.changed, "edited rule '{}'", edited.name);
    Ok((edited, report))
}

/// Apply a single rule to pending transactions only.
pub fn apply_rule(conn: &mut Connection, id: i64) -> Result<ClassifyReport> {
    let tx = conn.transaction()?;
    let rule = store::get_rule(&tx, id)?;
    if !rule.is_active {
        warn!(rule_id = id, "applying inactive rule '{}'", rule.name);
    }

    let before = store::load_transactions(&tx, TxnScope::Pending)?;
    let mut working = before.clone();
    let matched = classifier::apply_rule(&rule, &mut working).len();
    let changes = classifier::changed(&before, &working);
    let changed = store::save_assignments(&tx, &changes)?;
    tx.commit()?;

    info!(rule_id = id, matched, "applied rule '{}' to pending transactions", rule.name);
    Ok(ClassifyReport { matched, changed })
}

/// Reapply every active rule to every active transaction.
pub fn reapply_all(conn: &mut Connection) -> Result<ClassifyReport> {
    let tx = conn.transaction()?;
    let transactions = store::load_transactions(&tx, TxnScope::All)?;
    let rules = store::active_rules(&tx)?;
    let result = classifier::reclassify(&rules, &transactions);
    let changed = store::save_assignments(&tx, &result.assignments)?;
    tx.commit()?;

    let report = ClassifyReport { matched: result.matched, changed };

    info!(matched = report.matched, changed = report.changed, "reapplied all active rules");
    Ok(report)
}

/// Store a new transaction, classified by the first active rule that matches.
/// Returns the new ID and the matching rule, if any.
pub fn add_transaction(conn: &mut Connection, new: &NewTransaction) -> Result<(i64, Option<i64>)> {
    if !new.amount.is_finite() {
        return Err(HoegyeError::Other(format!("Invalid amount: {}", new.amount)));
    }
    let tx = conn.transaction()?;
    let rules = store::active_rules(&tx)?;

    let mut candidate = Transaction {
        id: 0,
        account_id: new.account_id,
        external_id: new.external_id.clone(),
        amount: new.amount,
        transaction_type: new.transaction_type.clone(),
        description: new.description.clone(),
        counterparty: new.counterparty.clone(),
        transaction_date: new.transaction_date.clone(),
        targets: Targets::default(),
        status: ClassificationStatus::Pending,
        is_active: true,
        split_parent_id: None,
    };
    let rule_id = classifier::classify_first_match(&rules, &mut candidate);
    let id = store::insert_transaction(&tx, new, &candidate.targets, candidate.status, None)?;
    tx.commit()?;

    info!(transaction_id = id, rule_id, "added transaction {}", new.external_id);
    Ok((id, rule_id))
}

/// Set a transaction's classification by hand. Slots left `None` are cleared.
pub fn edit_transaction(conn: &mut Connection, id: i64, targets: Targets, description: Option<&str>) -> Result<()> {
    let tx = conn.transaction()?;
    let old = store::get_transaction(&tx, id)?;
    store::save_assignments(
        &tx,
        &[classifier::Assignment {
            transaction_id: id,
            targets,
            status: ClassificationStatus::Manual,
        }],
    )?;
    if let Some(text) = description {
        store::update_description(&tx, id, text)?;
    }
    store::record_audit(
        &tx,
        "transaction.edit",
        "transactions",
        id,
        Some(&json!({
            "category_id": old.targets.category_id,
            "department_id": old.targets.department_id,
            "vendor_id": old.targets.vendor_id,
            "classification_status": old.status.as_str(),
            "description": old.description,
        })),
        Some(&json!({
            "category_id": targets.category_id,
            "department_id": targets.department_id,
            "vendor_id": targets.vendor_id,
            "classification_status": ClassificationStatus::Manual.as_str(),
            "description": description.or(old.description.as_deref()),
        })),
    )?;
    tx.commit()?;

    info!(transaction_id = id, "manually classified transaction");
    Ok(())
}

/// Replace a transaction by two or more parts. The original is deactivated and
/// each part keeps its classification and a link back to it.
pub fn split_transaction(conn: &mut Connection, id: i64, parts: &[SplitPart]) -> Result<Vec<i64>> {
    if parts.len() < 2 {
        return Err(HoegyeError::InvalidSplit("need at least two parts".to_string()));
    }

    let tx = conn.transaction()?;
    let parent = store::get_transaction(&tx, id)?;
    if !parent.is_active {
        return Err(HoegyeError::InvalidSplit(format!("transaction {id} is already split")));
    }
    if let Some(bad) = parts.iter().find(|p| !p.amount.is_finite()) {
        return Err(HoegyeError::InvalidSplit(format!("part amount {} is not a number", bad.amount)));
    }
    let total: f64 = parts.iter().map(|p| p.amount).sum();
    let within = (total - parent.amount).abs() <= SPLIT_TOLERANCE;
    if !within {
        return Err(HoegyeError::InvalidSplit(format!(
            "parts sum to {total}, transaction amount is {}",
            parent.amount
        )));
    }

    let mut child_ids = Vec::with_capacity(parts.len());
    for (n, part) in parts.iter().enumerate() {
        let child = NewTransaction {
            account_id: parent.account_id,
            external_id: format!("{}-S{}", parent.external_id, n + 1),
            amount: part.amount,
            transaction_type: parent.transaction_type.clone(),
            description: part.description.clone().or_else(|| parent.description.clone()),
            counterparty: parent.counterparty.clone(),
            transaction_date: parent.transaction_date.clone(),
        };
        child_ids.push(store::insert_transaction(&tx, &child, &parent.targets, parent.status, Some(parent.id))?);
    }
    store::deactivate_transaction(&tx, parent.id)?;
    store::record_audit(
        &tx,
        "transaction.split",
        "transactions",
        parent.id,
        None,
        Some(&json!({ "children": child_ids })),
    )?;
    tx.commit()?;

    info!(transaction_id = id, parts = child_ids.len(), "split transaction");
    Ok(child_ids)
}
