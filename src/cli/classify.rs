use std::path::Path;

use crate::cli::open_db;
use crate::error::Result;
use crate::service;

pub fn run(db: &Path) -> Result<()> {
    let mut conn = open_db(db)?;
    let report = service::reapply_all(&mut conn)?;
    println!(
        "{} matched, {} transactions changed",
        report.matched, report.changed
    );
    Ok(())
}
