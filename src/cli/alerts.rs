use std::path::Path;

use comfy_table::{Cell, Table};

use crate::alerts::{self, NewAlertSetting};
use crate::cli::open_db;
use crate::error::Result;

pub fn add_setting(db: &Path, setting: NewAlertSetting) -> Result<()> {
    let conn = open_db(db)?;
    let id = alerts::add_setting(&conn, &setting)?;
    println!("Added alert setting {id}: '{}'", setting.name);
    Ok(())
}

pub fn scan(db: &Path) -> Result<()> {
    let mut conn = open_db(db)?;
    let raised = alerts::scan(&mut conn)?;
    println!("{raised} new alerts");
    Ok(())
}

pub fn list(db: &Path, unread_only: bool) -> Result<()> {
    let conn = open_db(db)?;
    let rows = alerts::list_alerts(&conn, unread_only)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Created", "Type", "Severity", "Title", "Message", "Read"]);
    for alert in rows {
        table.add_row(vec![
            Cell::new(alert.id),
            Cell::new(&alert.created_at),
            Cell::new(&alert.alert_type),
            Cell::new(&alert.severity),
            Cell::new(&alert.title),
            Cell::new(&alert.message),
            Cell::new(if alert.is_read { "yes" } else { "" }),
        ]);
    }
    println!("Alerts\n{table}");
    Ok(())
}

pub fn read(db: &Path, id: i64) -> Result<()> {
    let conn = open_db(db)?;
    alerts::mark_read(&conn, id)?;
    println!("Marked alert {id} as read");
    Ok(())
}
