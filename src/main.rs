mod alerts;
mod classifier;
mod cli;
mod db;
mod error;
mod fmt;
mod matcher;
mod models;
mod service;
mod settings;
mod store;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::alerts::NewAlertSetting;
use crate::models::{NewRule, RuleChanges, Targets};
use crate::store::TxnFilter;
use cli::{AlertsCommands, Cli, Commands, RulesCommands, TransactionsCommands};

/// `RUST_LOG` wins; otherwise `--verbose` means debug and the default is warn.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();
}

/// `Some(None)` clears a rule target, `Some(Some(id))` sets it.
fn target_change(id: Option<i64>, clear: bool) -> Option<Option<i64>> {
    if clear {
        Some(None)
    } else {
        id.map(Some)
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let db = settings::resolve_db_path(cli.db.as_deref());

    let result = match cli.command {
        Commands::Init { data_dir, company } => {
            let explicit = cli.db.map(PathBuf::from).or_else(|| {
                std::env::var(settings::DB_ENV)
                    .ok()
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
            });
            cli::init::run(explicit.as_deref(), data_dir, company)
        }
        Commands::Rules { command } => match command {
            RulesCommands::Add {
                name,
                condition_type,
                field,
                value,
                priority,
                category,
                department,
                vendor,
                inactive,
            } => cli::rules::add(
                &db,
                NewRule {
                    name,
                    priority,
                    is_active: !inactive,
                    condition_type,
                    condition_field: field,
                    condition_value: value,
                    targets: Targets {
                        category_id: category,
                        department_id: department,
                        vendor_id: vendor,
                    },
                },
            ),
            RulesCommands::List => cli::rules::list(&db),
            RulesCommands::Edit {
                id,
                name,
                condition_type,
                field,
                value,
                priority,
                category,
                department,
                vendor,
                clear_category,
                clear_department,
                clear_vendor,
            } => cli::rules::edit(
                &db,
                id,
                RuleChanges {
                    name,
                    priority,
                    condition_type,
                    condition_field: field,
                    condition_value: value,
                    category_id: target_change(category, clear_category),
                    department_id: target_change(department, clear_department),
                    vendor_id: target_change(vendor, clear_vendor),
                },
            ),
            RulesCommands::Toggle { id } => cli::rules::toggle(&db, id),
            RulesCommands::Apply { id } => cli::rules::apply(&db, id),
        },
        Commands::Classify => cli::classify::run(&db),
        Commands::Transactions { command } => match command {
            TransactionsCommands::Add {
                account,
                amount,
                description,
                counterparty,
                date,
                external_id,
                transaction_type,
            } => cli::transactions::add(
                &db,
                account,
                amount,
                description,
                counterparty,
                date,
                external_id,
                transaction_type,
            ),
            TransactionsCommands::List {
                status,
                category,
                department,
                search,
                limit,
            } => cli::transactions::list(
                &db,
                TxnFilter {
                    status,
                    category_id: category,
                    department_id: department,
                    search,
                },
                limit,
            ),
            TransactionsCommands::Edit {
                id,
                category,
                department,
                vendor,
                description,
            } => cli::transactions::edit(
                &db,
                id,
                Targets {
                    category_id: category,
                    department_id: department,
                    vendor_id: vendor,
                },
                description,
            ),
            TransactionsCommands::Split { id, parts } => cli::transactions::split(&db, id, &parts),
        },
        Commands::Alerts { command } => match command {
            AlertsCommands::AddSetting {
                name,
                condition_type,
                field,
                value,
                alert_type,
                severity,
            } => cli::alerts::add_setting(
                &db,
                NewAlertSetting {
                    name,
                    alert_type,
                    condition_type,
                    condition_field: field,
                    condition_value: value,
                    severity,
                },
            ),
            AlertsCommands::Scan => cli::alerts::scan(&db),
            AlertsCommands::List { unread } => cli::alerts::list(&db, unread),
            AlertsCommands::Read { id } => cli::alerts::read(&db, id),
        },
        Commands::Demo => cli::demo::run(&db),
        Commands::Status => cli::status::run(&db),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
