use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{name_or_blank, names, open_db};
use crate::error::Result;
use crate::models::{NewRule, RuleChanges};
use crate::service::{self, ClassifyReport};
use crate::store;

fn print_report(report: &ClassifyReport) {
    println!(
        "{} matched, {} transactions changed",
        report.matched, report.changed
    );
}

pub fn add(db: &Path, rule: NewRule) -> Result<()> {
    let mut conn = open_db(db)?;
    let (id, report) = service::add_rule(&mut conn, &rule)?;
    println!("Added rule {id}: '{}'", rule.name);
    if rule.is_active {
        print_report(&report);
    }
    Ok(())
}

pub fn list(db: &Path) -> Result<()> {
    let conn = open_db(db)?;
    let rules = store::list_rules(&conn)?;
    let categories = names(&conn, "categories")?;
    let departments = names(&conn, "departments")?;
    let vendors = names(&conn, "vendors")?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Name", "Priority", "Active", "Condition", "Value", "Category", "Department", "Vendor",
    ]);
    for rule in rules {
        table.add_row(vec![
            Cell::new(rule.id),
            Cell::new(&rule.name),
            Cell::new(rule.priority),
            Cell::new(if rule.is_active { "on" } else { "off" }),
            Cell::new(format!("{} {}", rule.condition_field, rule.condition_type)),
            Cell::new(&rule.condition_value),
            Cell::new(name_or_blank(&categories, rule.targets.category_id)),
            Cell::new(name_or_blank(&departments, rule.targets.department_id)),
            Cell::new(name_or_blank(&vendors, rule.targets.vendor_id)),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn edit(db: &Path, id: i64, changes: RuleChanges) -> Result<()> {
    let mut conn = open_db(db)?;
    let (rule, report) = service::edit_rule(&mut conn, id, &changes)?;
    println!("Updated rule {id}: '{}'", rule.name);
    if rule.is_active {
        print_report(&report);
    }
    Ok(())
}

pub fn toggle(db: &Path, id: i64) -> Result<()> {
    let mut conn = open_db(db)?;
    let outcome = service::toggle_rule(&mut conn, id)?;
    if outcome.is_active {
        println!("Rule {id} {}", "enabled".green());
    } else {
        println!("Rule {id} {} ({} reverted)", "disabled".yellow(), outcome.reverted);
    }
    print_report(&outcome.report);
    Ok(())
}

pub fn apply(db: &Path, id: i64) -> Result<()> {
    let mut conn = open_db(db)?;
    let report = service::apply_rule(&mut conn, id)?;
    println!("{}건의 거래가 분류되었습니다.", report.matched);
    Ok(())
}
