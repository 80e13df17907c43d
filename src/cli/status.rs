use std::path::Path;

use crate::cli::open_db;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run(db: &Path) -> Result<()> {
    let settings = load_settings();
    println!(
        "Company:    {}",
        if settings.company_name.is_empty() { "(not set)" } else { &settings.company_name }
    );
    println!("Database:   {}", db.display());

    if !db.exists() {
        println!();
        println!("Database not found. Run `hoegye init` to set up.");
        return Ok(());
    }

    let conn = open_db(db)?;
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };

    let transactions = count("SELECT count(*) FROM transactions WHERE is_active = 1")?;
    let pending = count("SELECT count(*) FROM transactions WHERE is_active = 1 AND classification_status = 'pending'")?;
    let classified = count("SELECT count(*) FROM transactions WHERE is_active = 1 AND classification_status = 'classified'")?;
    let manual = count("SELECT count(*) FROM transactions WHERE is_active = 1 AND classification_status = 'manual'")?;
    let rules = count("SELECT count(*) FROM mapping_rules")?;
    let active_rules = count("SELECT count(*) FROM mapping_rules WHERE is_active = 1")?;
    let unread = count("SELECT count(*) FROM alerts WHERE is_read = 0")?;

    println!();
    println!("Transactions:  {transactions}");
    println!("  미분류:      {pending}");
    println!("  분류완료:    {classified}");
    println!("  수동분류:    {manual}");
    println!("Rules:         {rules} ({active_rules} active)");
    println!("Unread alerts: {unread}");
    Ok(())
}
