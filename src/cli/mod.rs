pub mod alerts;
pub mod classify;
pub mod demo;
pub mod init;
pub mod rules;
pub mod status;
pub mod transactions;

use std::collections::HashMap;
use std::path::Path;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::{HoegyeError, Result};
use crate::models::{ClassificationStatus, ConditionField, ConditionType};

/// Open the database at `path`, refusing to create one implicitly.
pub(crate) fn open_db(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(HoegyeError::Other(format!(
            "Database not found at {}. Run `hoegye init` first.",
            path.display()
        )));
    }
    let conn = get_connection(path)?;
    init_db(&conn)?;
    Ok(conn)
}

/// ID to name for a reference table with `id` and `name` columns.
pub(crate) fn names(conn: &Connection, table: &str) -> Result<HashMap<i64, String>> {
    let mut stmt = conn.prepare(&format!("SELECT id, name FROM {table}"))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    Ok(rows)
}

pub(crate) fn name_or_blank(names: &HashMap<i64, String>, id: Option<i64>) -> String {
    id.and_then(|id| names.get(&id).cloned()).unwrap_or_default()
}

#[derive(Parser)]
#[command(name = "hoegye", about = "Rule-based transaction classification for corporate bookkeeping.")]
pub struct Cli {
    /// Database file (default: $HOEGYE_DB, then <data_dir>/hoegye.db)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for data (default: ~/Documents/hoegye)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Company name shown in status output
        #[arg(long)]
        company: Option<String>,
    },
    /// Manage classification rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Reapply every active rule to every transaction.
    Classify,
    /// Enter, list, edit and split transactions.
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommands,
    },
    /// Alert conditions and raised alerts.
    Alerts {
        #[command(subcommand)]
        command: AlertsCommands,
    },
    /// Load sample institutions, accounts, transactions and rules.
    Demo,
    /// Show database location and classification counts.
    Status,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a classification rule.
    Add {
        /// Rule name
        name: String,
        /// Condition type
        #[arg(long = "type", value_enum, default_value = "contains")]
        condition_type: ConditionType,
        /// Transaction field the condition reads
        #[arg(long, value_enum, default_value = "description")]
        field: ConditionField,
        /// Text, pattern, or "min,max" for amount_range. A value that does
        /// not parse is saved with a warning and never matches.
        #[arg(long)]
        value: String,
        /// Rule priority (evaluated highest first)
        #[arg(long, default_value = "0")]
        priority: i64,
        /// Category ID to assign
        #[arg(long)]
        category: Option<i64>,
        /// Department ID to assign
        #[arg(long)]
        department: Option<i64>,
        /// Vendor ID to assign
        #[arg(long)]
        vendor: Option<i64>,
        /// Create the rule switched off
        #[arg(long)]
        inactive: bool,
    },
    /// List all rules.
    List,
    /// Edit a rule. Active rules are reverted and reapplied.
    Edit {
        /// Rule ID (shown in `hoegye rules list`)
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type", value_enum)]
        condition_type: Option<ConditionType>,
        #[arg(long, value_enum)]
        field: Option<ConditionField>,
        #[arg(long)]
        value: Option<String>,
        #[arg(long)]
        priority: Option<i64>,
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<i64>,
        #[arg(long, conflicts_with = "clear_department")]
        department: Option<i64>,
        #[arg(long, conflicts_with = "clear_vendor")]
        vendor: Option<i64>,
        #[arg(long)]
        clear_category: bool,
        #[arg(long)]
        clear_department: bool,
        #[arg(long)]
        clear_vendor: bool,
    },
    /// Switch a rule on or off and reclassify.
    Toggle {
        /// Rule ID
        id: i64,
    },
    /// Apply one rule to pending transactions.
    Apply {
        /// Rule ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// Enter a transaction; it is classified by the first matching rule.
    Add {
        /// Account ID
        #[arg(long)]
        account: i64,
        /// Signed amount (negative for spending)
        #[arg(long, allow_hyphen_values = true)]
        amount: f64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        counterparty: Option<String>,
        /// Date and time, YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS" (default: now)
        #[arg(long)]
        date: Option<String>,
        /// External transaction ID (default: generated)
        #[arg(long = "external-id")]
        external_id: Option<String>,
        /// debit or credit (default: from the amount's sign)
        #[arg(long = "type")]
        transaction_type: Option<String>,
    },
    /// List transactions, newest first.
    List {
        #[arg(long, value_enum)]
        status: Option<ClassificationStatus>,
        /// Category ID
        #[arg(long)]
        category: Option<i64>,
        /// Department ID
        #[arg(long)]
        department: Option<i64>,
        /// Text to find in the description or counterparty
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Classify a transaction by hand.
    Edit {
        /// Transaction ID
        id: i64,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        department: Option<i64>,
        #[arg(long)]
        vendor: Option<i64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Split a transaction into parts: --part AMOUNT[:DESCRIPTION] (repeat).
    Split {
        /// Transaction ID
        id: i64,
        #[arg(long = "part", required = true, allow_hyphen_values = true)]
        parts: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AlertsCommands {
    /// Add an alert condition.
    AddSetting {
        name: String,
        #[arg(long = "type", value_enum, default_value = "contains")]
        condition_type: ConditionType,
        #[arg(long, value_enum, default_value = "description")]
        field: ConditionField,
        #[arg(long)]
        value: String,
        /// budget, contract, anomaly or custom
        #[arg(long = "alert-type", default_value = "custom")]
        alert_type: String,
        /// info, warning or error
        #[arg(long, default_value = "info")]
        severity: String,
    },
    /// Evaluate alert conditions against transactions.
    Scan,
    /// Show recent alerts.
    List {
        #[arg(long)]
        unread: bool,
    },
    /// Mark an alert as read.
    Read {
        /// Alert ID
        id: i64,
    },
}
