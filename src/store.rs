//! Row mapping and queries for rules and transactions.
//!
//! Functions take `&Connection` so they work the same on a plain connection
//! and inside a `rusqlite::Transaction`.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::json;
use tracing::debug;

use crate::classifier::Assignment;
use crate::error::{HoegyeError, Result};
use crate::models::{ClassificationStatus, MappingRule, NewRule, NewTransaction, Targets, Transaction};

const RULE_COLUMNS: &str = "id, name, priority, is_active, condition_type, condition_field, condition_value, \
     target_category_id, target_department_id, target_vendor_id";

const TXN_COLUMNS: &str = "id, account_id, transaction_id, amount, transaction_type, description, counterparty, \
     transaction_date, category_id, department_id, vendor_id, classification_status, is_active, split_parent_id";

fn rule_from_row(row: &Row) -> rusqlite::Result<MappingRule> {
    Ok(MappingRule {
        id: row.get(0)?,
        name: row.get(1)?,
        priority: row.get(2)?,
        is_active: row.get(3)?,
        condition_type: row.get(4)?,
        condition_field: row.get(5)?,
        condition_value: row.get(6)?,
        targets: Targets {
            category_id: row.get(7)?,
            department_id: row.get(8)?,
            vendor_id: row.get(9)?,
        },
    })
}

fn txn_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        external_id: row.get(2)?,
        amount: row.get(3)?,
        transaction_type: row.get(4)?,
        description: row.get(5)?,
        counterparty: row.get(6)?,
        transaction_date: row.get(7)?,
        targets: Targets {
            category_id: row.get(8)?,
            department_id: row.get(9)?,
            vendor_id: row.get(10)?,
        },
        status: row.get(11)?,
        is_active: row.get(12)?,
        split_parent_id: row.get(13)?,
    })
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

pub fn get_rule(conn: &Connection, id: i64) -> Result<MappingRule> {
    conn.query_row(
        &format!("SELECT {RULE_COLUMNS} FROM mapping_rules WHERE id = ?1"),
        [id],
        rule_from_row,
    )
    .optional()?
    .ok_or(HoegyeError::RuleNotFound(id))
}

/// All rules, in evaluation order.
pub fn list_rules(conn: &Connection) -> Result<Vec<MappingRule>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RULE_COLUMNS} FROM mapping_rules ORDER BY priority DESC, id"
    ))?;
    let rules = stmt
        .query_map([], rule_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rules)
}

pub fn active_rules(conn: &Connection) -> Result<Vec<MappingRule>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RULE_COLUMNS} FROM mapping_rules WHERE is_active = 1 ORDER BY priority DESC, id"
    ))?;
    let rules = stmt
        .query_map([], rule_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!("loaded {} active rules", rules.len());
    Ok(rules)
}

pub fn insert_rule(conn: &Connection, rule: &NewRule) -> Result<i64> {
    conn.execute(
        "INSERT INTO mapping_rules (name, priority, is_active, condition_type, condition_field, condition_value, \
         target_category_id, target_department_id, target_vendor_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            rule.name,
            rule.priority,
            rule.is_active,
            rule.condition_type.as_str(),
            rule.condition_field.as_str(),
            rule.condition_value,
            rule.targets.category_id,
            rule.targets.department_id,
            rule.targets.vendor_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_rule(conn: &Connection, rule: &MappingRule) -> Result<()> {
    let updated = conn.execute(
        "UPDATE mapping_rules SET name = ?1, priority = ?2, is_active = ?3, condition_type = ?4, \
         condition_field = ?5, condition_value = ?6, target_category_id = ?7, target_department_id = ?8, \
         target_vendor_id = ?9, updated_at = datetime('now') WHERE id = ?10",
        params![
            rule.name,
            rule.priority,
            rule.is_active,
            rule.condition_type,
            rule.condition_field,
            rule.condition_value,
            rule.targets.category_id,
            rule.targets.department_id,
            rule.targets.vendor_id,
            rule.id,
        ],
    )?;
    if updated == 0 {
        return Err(HoegyeError::RuleNotFound(rule.id));
    }
    Ok(())
}

pub fn set_rule_active(conn: &Connection, id: i64, active: bool) -> Result<()> {
    let updated = conn.execute(
        "UPDATE mapping_rules SET is_active = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![active, id],
    )?;
    if updated == 0 {
        return Err(HoegyeError::RuleNotFound(id));
    }
    Ok(())
}

pub fn rule_json(rule: &MappingRule) -> serde_json::Value {
    json!({
        "name": rule.name,
        "priority": rule.priority,
        "is_active": rule.is_active,
        "condition_type": rule.condition_type,
        "condition_field": rule.condition_field,
        "condition_value": rule.condition_value,
        "target_category_id": rule.targets.category_id,
        "target_department_id": rule.targets.department_id,
        "target_vendor_id": rule.targets.vendor_id,
    })
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Which transactions a classification pass works on. Split-superseded rows
/// (`is_active = 0`) are never included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TxnScope {
    All,
    Pending,
}

pub fn load_transactions(conn: &Connection, scope: TxnScope) -> Result<Vec<Transaction>> {
    let sql = match scope {
        TxnScope::All => format!("SELECT {TXN_COLUMNS} FROM transactions WHERE is_active = 1 ORDER BY id"),
        TxnScope::Pending => format!(
            "SELECT {TXN_COLUMNS} FROM transactions WHERE is_active = 1 \
             AND classification_status = 'pending' ORDER BY id"
        ),
    };
    let mut stmt = conn.prepare(&sql)?;
    let txns = stmt
        .query_map([], txn_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!("loaded {} transactions ({scope:?})", txns.len());
    Ok(txns)
}

/// Optional narrowing for [`list_transactions`]. `search` is a substring of
/// the description or counterparty.
#[derive(Debug, Clone, Default)]
pub struct TxnFilter {
    pub status: Option<ClassificationStatus>,
    pub category_id: Option<i64>,
    pub department_id: Option<i64>,
    pub search: Option<String>,
}

/// Newest first, for display.
pub fn list_transactions(conn: &Connection, filter: &TxnFilter, limit: usize) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TXN_COLUMNS} FROM transactions \
         WHERE is_active = 1 \
         AND (?1 IS NULL OR classification_status = ?1) \
         AND (?2 IS NULL OR category_id = ?2) \
         AND (?3 IS NULL OR department_id = ?3) \
         AND (?4 IS NULL OR instr(lower(coalesce(description, '')), lower(?4)) > 0 \
              OR instr(lower(coalesce(counterparty, '')), lower(?4)) > 0) \
         ORDER BY transaction_date DESC, id DESC LIMIT ?5"
    ))?;
    let txns = stmt
        .query_map(
            params![filter.status, filter.category_id, filter.department_id, filter.search, limit as i64],
            txn_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(txns)
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    conn.query_row(
        &format!("SELECT {TXN_COLUMNS} FROM transactions WHERE id = ?1"),
        [id],
        txn_from_row,
    )
    .optional()?
    .ok_or(HoegyeError::TransactionNotFound(id))
}

pub fn insert_transaction(
    conn: &Connection,
    txn: &NewTransaction,
    targets: &Targets,
    status: ClassificationStatus,
    split_parent_id: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (account_id, transaction_id, amount, transaction_type, description, counterparty, \
         transaction_date, category_id, department_id, vendor_id, classification_status, split_parent_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            txn.account_id,
            txn.external_id,
            txn.amount,
            txn.transaction_type,
            txn.description,
            txn.counterparty,
            txn.transaction_date,
            targets.category_id,
            targets.department_id,
            targets.vendor_id,
            status,
            split_parent_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn save_assignments(conn: &Connection, assignments: &[Assignment]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "UPDATE transactions SET category_id = ?1, department_id = ?2, vendor_id = ?3, \
         classification_status = ?4, updated_at = datetime('now') WHERE id = ?5",
    )?;
    for a in assignments {
        stmt.execute(params![
            a.targets.category_id,
            a.targets.department_id,
            a.targets.vendor_id,
            a.status,
            a.transaction_id,
        ])?;
    }
    debug!("wrote {} classification changes", assignments.len());
    Ok(assignments.len())
}

pub fn update_description(conn: &Connection, id: i64, description: &str) -> Result<()> {
    conn.execute(
        "UPDATE transactions SET description = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![description, id],
    )?;
    Ok(())
}

pub fn deactivate_transaction(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE transactions SET is_active = 0, updated_at = datetime('now') WHERE id = ?1",
        [id],
    )?;
    Ok(())
}

pub fn record_audit(
    conn: &Connection,
    action: &str,
    table_name: &str,
    record_id: i64,
    old_values: Option<&serde_json::Value>,
    new_values: Option<&serde_json::Value>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO audit_log (action, table_name, record_id, old_values, new_values) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            action,
            table_name,
            record_id,
            old_values.map(|v| v.to_string()),
            new_values.map(|v| v.to_string()),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_txn, seed_reference, test_db};
    use crate::models::{ConditionField, ConditionType};

    fn new_rule(name: &str, priority: i64) -> NewRule {
        NewRule {
            name: name.to_string(),
            priority,
            is_active: true,
            condition_type: ConditionType::Contains,
            condition_field: ConditionField::Counterparty,
            condition_value: "스타벅스".to_string(),
            targets: Targets { category_id: Some(3), department_id: None, vendor_id: Some(6) },
        }
    }

    #[test]
    fn test_insert_and_get_rule() {
        let (_dir, conn) = test_db();
        seed_reference(&conn);
        let id = insert_rule(&conn, &new_rule("스타벅스 자동분류", 8)).unwrap();
        let rule = get_rule(&conn, id).unwrap();
        assert_eq!(rule.name, "스타벅스 자동분류");
        assert_eq!(rule.condition_type, "contains");
        assert_eq!(rule.condition_field, "counterparty");
        assert_eq!(rule.targets.vendor_id, Some(6));
        assert!(rule.is_active);
    }

    #[test]
    fn test_get_missing_rule() {
        let (_dir, conn) = test_db();
        assert!(matches!(get_rule(&conn, 42), Err(HoegyeError::RuleNotFound(42))));
        assert!(matches!(set_rule_active(&conn, 42, false), Err(HoegyeError::RuleNotFound(42))));
    }

    #[test]
    fn test_active_rules_ordered_by_priority() {
        let (_dir, conn) = test_db();
        seed_reference(&conn);
        let low = insert_rule(&conn, &new_rule("low", 1)).unwrap();
        let high = insert_rule(&conn, &new_rule("high", 9)).unwrap();
        let off = insert_rule(&conn, &new_rule("off", 5)).unwrap();
        set_rule_active(&conn, off, false).unwrap();
        let ids: Vec<i64> = active_rules(&conn).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![high, low]);
        assert_eq!(list_rules(&conn).unwrap().len(), 3);
    }

    #[test]
    fn test_load_transactions_scopes() {
        let (_dir, conn) = test_db();
        let acct = seed_reference(&conn);
        let a = insert_txn(&conn, acct, "스타벅스 강남점", "스타벅스", -5500.0);
        let b = insert_txn(&conn, acct, "사무용품 구매", "오피스디포", -12000.0);
        let c = insert_txn(&conn, acct, "old", "x", -1.0);
        deactivate_transaction(&conn, c).unwrap();
        save_assignments(&conn, &[Assignment {
            transaction_id: b,
            targets: Targets { category_id: Some(1), ..Default::default() },
            status: ClassificationStatus::Classified,
        }]).unwrap();

        let all: Vec<i64> = load_transactions(&conn, TxnScope::All).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(all, vec![a, b]);
        let pending: Vec<i64> = load_transactions(&conn, TxnScope::Pending).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(pending, vec![a]);

        let saved = get_transaction(&conn, b).unwrap();
        assert_eq!(saved.status, ClassificationStatus::Classified);
        assert_eq!(saved.targets.category_id, Some(1));
    }

    #[test]
    fn test_list_transactions_filters_status() {
        let (_dir, conn) = test_db();
        let acct = seed_reference(&conn);
        insert_txn(&conn, acct, "a", "x", -1.0);
        insert_txn(&conn, acct, "b", "y", -2.0);
        let all = TxnFilter::default();
        assert_eq!(list_transactions(&conn, &all, 10).unwrap().len(), 2);
        let manual = TxnFilter { status: Some(ClassificationStatus::Manual), ..Default::default() };
        assert_eq!(list_transactions(&conn, &manual, 10).unwrap().len(), 0);
        let pending = TxnFilter { status: Some(ClassificationStatus::Pending), ..Default::default() };
        assert_eq!(list_transactions(&conn, &pending, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_list_transactions_filters_targets_and_search() {
        let (_dir, conn) = test_db();
        let acct = seed_reference(&conn);
        let coffee = insert_txn(&conn, acct, "아메리카노", "스타벅스 강남점", -5500.0);
        let office = insert_txn(&conn, acct, "Office Supplies", "오피스디포", -12000.0);
        conn.execute(
            "UPDATE transactions SET category_id = 3, department_id = 2 WHERE id = ?1",
            [coffee],
        )
        .unwrap();
        conn.execute("UPDATE transactions SET category_id = 1 WHERE id = ?1", [office]).unwrap();

        let ids = |filter: TxnFilter| -> Vec<i64> {
            list_transactions(&conn, &filter, 10).unwrap().into_iter().map(|t| t.id).collect()
        };
        assert_eq!(ids(TxnFilter { category_id: Some(3), ..Default::default() }), vec![coffee]);
        assert_eq!(ids(TxnFilter { department_id: Some(2), ..Default::default() }), vec![coffee]);
        assert!(ids(TxnFilter { department_id: Some(4), ..Default::default() }).is_empty());
        // counterparty and description, ASCII case folded
        assert_eq!(ids(TxnFilter { search: Some("스타벅스".to_string()), ..Default::default() }), vec![coffee]);
        assert_eq!(ids(TxnFilter { search: Some("office".to_string()), ..Default::default() }), vec![office]);
        // literal text, not a LIKE pattern
        assert!(ids(TxnFilter { search: Some("%".to_string()), ..Default::default() }).is_empty());
    }

    #[test]
    fn test_record_audit_stores_json() {
        let (_dir, conn) = test_db();
        seed_reference(&conn);
        let id = insert_rule(&conn, &new_rule("r", 1)).unwrap();
        let rule = get_rule(&conn, id).unwrap();
        record_audit(&conn, "rule.add", "mapping_rules", id, None, Some(&rule_json(&rule))).unwrap();
        let stored: String = conn
            .query_row("SELECT new_values FROM audit_log WHERE record_id = ?1", [id], |r| r.get(0))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(value["priority"], 1);
        assert_eq!(value["condition_value"], "스타벅스");
    }
}
