//! User-defined alert conditions evaluated against transactions.
//!
//! An alert setting carries the same condition triple as a mapping rule and
//! is matched with the same [`Condition`]; a match raises one alert per
//! transaction instead of assigning targets.

use rusqlite::{params, Connection, Row};
use tracing::{debug, info, warn};

use crate::error::{HoegyeError, Result};
use crate::fmt::won;
use crate::matcher::Condition;
use crate::models::{Alert, AlertSetting, ConditionField, ConditionType};
use crate::store::{self, TxnScope};

const RELATED_TABLE: &str = "transaction";

#[derive(Debug, Clone)]
pub struct NewAlertSetting {
    pub name: String,
    pub alert_type: String,
    pub condition_type: ConditionType,
    pub condition_field: ConditionField,
    pub condition_value: String,
    pub severity: String,
}

fn setting_from_row(row: &Row) -> rusqlite::Result<AlertSetting> {
    Ok(AlertSetting {
        id: row.get(0)?,
        name: row.get(1)?,
        alert_type: row.get(2)?,
        condition_type: row.get(3)?,
        condition_field: row.get(4)?,
        condition_value: row.get(5)?,
        severity: row.get(6)?,
        is_active: row.get(7)?,
    })
}

fn alert_from_row(row: &Row) -> rusqlite::Result<Alert> {
    Ok(Alert {
        id: row.get(0)?,
        title: row.get(1)?,
        message: row.get(2)?,
        alert_type: row.get(3)?,
        severity: row.get(4)?,
        is_read: row.get(5)?,
        related_table: row.get(6)?,
        related_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub fn add_setting(conn: &Connection, setting: &NewAlertSetting) -> Result<i64> {
    let compiled = Condition::compile(
        setting.condition_type.as_str(),
        setting.condition_field.as_str(),
        &setting.condition_value,
    );
    if compiled.is_none() {
        warn!("alert setting '{}' is saved but its condition never matches", setting.name);
    }
    conn.execute(
        "INSERT INTO alert_settings (name, alert_type, condition_type, condition_field, condition_value, severity) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            setting.name,
            setting.alert_type,
            setting.condition_type.as_str(),
            setting.condition_field.as_str(),
            setting.condition_value,
            setting.severity,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn active_settings(conn: &Connection) -> Result<Vec<AlertSetting>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, alert_type, condition_type, condition_field, condition_value, severity, is_active \
         FROM alert_settings WHERE is_active = 1 ORDER BY id",
    )?;
    let settings = stmt
        .query_map([], setting_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(settings)
}

/// Raise an alert for every active transaction matched by an active setting,
/// skipping pairs already alerted. Returns the number of new alerts.
pub fn scan(conn: &mut Connection) -> Result<usize> {
    let tx = conn.transaction()?;
    let settings = active_settings(&tx)?;
    let txns = store::load_transactions(&tx, TxnScope::All)?;

    let mut raised = 0;
    {
        let mut exists = tx.prepare_cached(
            "SELECT 1 FROM alerts WHERE title = ?1 AND related_table = ?2 AND related_id = ?3",
        )?;
        let mut insert = tx.prepare_cached(
            "INSERT INTO alerts (title, message, alert_type, severity, related_table, related_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for setting in &settings {
            let Some(condition) =
                Condition::compile(&setting.condition_type, &setting.condition_field, &setting.condition_value)
            else {
                continue;
            };
            for txn in txns.iter().filter(|t| condition.matches(t)) {
                if exists.exists(params![setting.name, RELATED_TABLE, txn.id])? {
                    continue;
                }
                let subject = txn
                    .counterparty
                    .as_deref()
                    .or(txn.description.as_deref())
                    .unwrap_or("-");
                let message = format!(
                    "'{}' 조건에 해당하는 거래가 감지되었습니다. ({subject}, {})",
                    setting.name,
                    won(txn.amount)
                );
                insert.execute(params![
                    setting.name,
                    message,
                    setting.alert_type,
                    setting.severity,
                    RELATED_TABLE,
                    txn.id,
                ])?;
                raised += 1;
            }
            debug!(setting_id = setting.id, "evaluated alert setting '{}'", setting.name);
        }
    }
    tx.commit()?;

    info!(raised, "alert scan finished");
    Ok(raised)
}

pub fn list_alerts(conn: &Connection, unread_only: bool) -> Result<Vec<Alert>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, message, alert_type, severity, is_read, related_table, related_id, created_at \
         FROM alerts WHERE (?1 = 0 OR is_read = 0) ORDER BY created_at DESC, id DESC LIMIT 50",
    )?;
    let alerts = stmt
        .query_map([unread_only], alert_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(alerts)
}

pub fn mark_read(conn: &Connection, id: i64) -> Result<()> {
    let updated = conn.execute("UPDATE alerts SET is_read = 1 WHERE id = ?1", [id])?;
    if updated == 0 {
        return Err(HoegyeError::Other(format!("No alert with ID {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_txn, seed_reference, test_db};

    fn large_payment() -> NewAlertSetting {
        NewAlertSetting {
            name: "고액 거래".to_string(),
            alert_type: "anomaly".to_string(),
            condition_type: ConditionType::AmountRange,
            condition_field: ConditionField::Description,
            condition_value: "1000000,100000000".to_string(),
            severity: "warning".to_string(),
        }
    }

    #[test]
    fn test_scan_raises_once_per_transaction() {
        let (_dir, mut conn) = test_db();
        let acct = seed_reference(&conn);
        let big = insert_txn(&conn, acct, "장비 구매", "전자랜드", -1_500_000.0);
        insert_txn(&conn, acct, "커피", "스타벅스", -5500.0);
        add_setting(&conn, &large_payment()).unwrap();

        assert_eq!(scan(&mut conn).unwrap(), 1);
        assert_eq!(scan(&mut conn).unwrap(), 0);

        let alerts = list_alerts(&conn, false).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].related_id, Some(big));
        assert_eq!(alerts[0].severity, "warning");
        assert!(alerts[0].message.contains("전자랜드"));
        assert!(alerts[0].message.contains("₩1,500,000"));
    }

    #[test]
    fn test_broken_setting_is_kept_and_never_fires() {
        let (_dir, mut conn) = test_db();
        let acct = seed_reference(&conn);
        insert_txn(&conn, acct, "노트북", "전자랜드", -1_500_000.0);
        let mut setting = large_payment();
        setting.condition_value = "many".to_string();
        add_setting(&conn, &setting).unwrap();
        assert_eq!(active_settings(&conn).unwrap().len(), 1);
        assert_eq!(scan(&mut conn).unwrap(), 0);
    }

    #[test]
    fn test_mark_read_filters_unread() {
        let (_dir, mut conn) = test_db();
        let acct = seed_reference(&conn);
        insert_txn(&conn, acct, "장비 구매", "전자랜드", -1_500_000.0);
        add_setting(&conn, &large_payment()).unwrap();
        scan(&mut conn).unwrap();
        let id = list_alerts(&conn, true).unwrap()[0].id;
        mark_read(&conn, id).unwrap();
        assert!(list_alerts(&conn, true).unwrap().is_empty());
        assert_eq!(list_alerts(&conn, false).unwrap().len(), 1);
        assert!(mark_read(&conn, 999).is_err());
    }
}
