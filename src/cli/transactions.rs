use std::path::Path;

use chrono::{Local, NaiveDate, NaiveDateTime};
use colored::{ColoredString, Colorize};
use comfy_table::{Cell, Table};

use crate::cli::{name_or_blank, names, open_db};
use crate::error::{HoegyeError, Result};
use crate::fmt::{status_label, won};
use crate::models::{ClassificationStatus, NewTransaction, Targets};
use crate::service::{self, SplitPart};
use crate::store::{self, TxnFilter};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Accept `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`, stored in the latter form.
fn normalize_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Ok(dt.format(DATETIME_FORMAT).to_string());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| format!("{} 00:00:00", d.format("%Y-%m-%d")))
        .map_err(|_| HoegyeError::Other(format!("Invalid date: {raw}")))
}

/// `AMOUNT[:DESCRIPTION]`
fn parse_split_part(raw: &str) -> Result<SplitPart> {
    let (amount, description) = match raw.split_once(':') {
        Some((amount, description)) => (amount, Some(description.trim().to_string()).filter(|d| !d.is_empty())),
        None => (raw, None),
    };
    let amount = amount
        .trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite())
        .ok_or_else(|| HoegyeError::InvalidSplit(format!("bad amount in '{raw}'")))?;
    Ok(SplitPart { amount, description })
}

fn colored_status(status: ClassificationStatus) -> ColoredString {
    let label = status_label(status);
    match status {
        ClassificationStatus::Pending => label.yellow(),
        ClassificationStatus::Classified => label.green(),
        ClassificationStatus::Manual => label.cyan(),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn add(
    db: &Path,
    account_id: i64,
    amount: f64,
    description: Option<String>,
    counterparty: Option<String>,
    date: Option<String>,
    external_id: Option<String>,
    transaction_type: Option<String>,
) -> Result<()> {
    let now = Local::now();
    let transaction_date = match date {
        Some(raw) => normalize_date(&raw)?,
        None => now.format(DATETIME_FORMAT).to_string(),
    };
    let new = NewTransaction {
        account_id,
        external_id: external_id.unwrap_or_else(|| format!("MANUAL-{}", now.format("%Y%m%d%H%M%S%f"))),
        amount,
        transaction_type: transaction_type
            .unwrap_or_else(|| if amount < 0.0 { "debit" } else { "credit" }.to_string()),
        description,
        counterparty,
        transaction_date,
    };

    let mut conn = open_db(db)?;
    let (id, rule_id) = service::add_transaction(&mut conn, &new)?;
    match rule_id {
        Some(rule_id) => println!("Added transaction {id} ({}), classified by rule {rule_id}", won(amount)),
        None => println!("Added transaction {id} ({}), {}", won(amount), colored_status(ClassificationStatus::Pending)),
    }
    Ok(())
}

pub fn list(db: &Path, filter: TxnFilter, limit: usize) -> Result<()> {
    let conn = open_db(db)?;
    let txns = store::list_transactions(&conn, &filter, limit)?;
    let categories = names(&conn, "categories")?;
    let departments = names(&conn, "departments")?;
    let vendors = names(&conn, "vendors")?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Date", "Amount", "Description", "Counterparty", "Category", "Department", "Vendor", "Status",
    ]);
    for txn in txns {
        let date = txn.transaction_date.get(..10).unwrap_or(&txn.transaction_date).to_string();
        table.add_row(vec![
            Cell::new(txn.id),
            Cell::new(date),
            Cell::new(won(txn.amount)),
            Cell::new(txn.description.unwrap_or_default()),
            Cell::new(txn.counterparty.unwrap_or_default()),
            Cell::new(name_or_blank(&categories, txn.targets.category_id)),
            Cell::new(name_or_blank(&departments, txn.targets.department_id)),
            Cell::new(name_or_blank(&vendors, txn.targets.vendor_id)),
            Cell::new(status_label(txn.status)),
        ]);
    }
    println!("Transactions\n{table}");
    Ok(())
}

pub fn edit(db: &Path, id: i64, targets: Targets, description: Option<String>) -> Result<()> {
    let mut conn = open_db(db)?;
    service::edit_transaction(&mut conn, id, targets, description.as_deref())?;
    println!("거래 내역이 수정되었습니다. (transaction {id})");
    Ok(())
}

pub fn split(db: &Path, id: i64, raw_parts: &[String]) -> Result<()> {
    let parts = raw_parts
        .iter()
        .map(|p| parse_split_part(p))
        .collect::<Result<Vec<_>>>()?;
    let mut conn = open_db(db)?;
    let children = service::split_transaction(&mut conn, id, &parts)?;
    let ids: Vec<String> = children.iter().map(|c| c.to_string()).collect();
    println!("Split transaction {id} into {}", ids.join(", "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2025-03-01").unwrap(), "2025-03-01 00:00:00");
        assert_eq!(normalize_date("2025-03-01 14:05:00").unwrap(), "2025-03-01 14:05:00");
        assert!(normalize_date("03/01/2025").is_err());
    }

    #[test]
    fn test_parse_split_part() {
        let part = parse_split_part("-60,000:개발팀 회식").unwrap();
        assert_eq!(part.amount, -60000.0);
        assert_eq!(part.description.as_deref(), Some("개발팀 회식"));

        let part = parse_split_part("-30000").unwrap();
        assert_eq!(part.amount, -30000.0);
        assert!(part.description.is_none());

        assert!(parse_split_part("-30000:").unwrap().description.is_none());
        assert!(parse_split_part("abc:x").is_err());
        assert!(parse_split_part("inf:x").is_err());
        assert!(parse_split_part("-inf").is_err());
        assert!(parse_split_part("NaN").is_err());
    }
}
