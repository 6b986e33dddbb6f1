//! CLI probe for `planter_core`.
//!
//! # Responsibility
//! - Verify core crate linkage without any UI runtime.
//! - Print the instance and template forests of a task database.
//!
//! Usage: `planter_cli [DB_PATH]`. File logging is enabled when
//! `PLANTER_LOG_DIR` is set.

use planter_core::db::open_db;
use planter_core::logging::{init_logging_with, LogConfig};
use planter_core::{SqliteTaskRepository, TaskNode, TaskService};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("planter_core ping={}", planter_core::ping());
    println!("planter_core version={}", planter_core::core_version());

    let logging = LogConfig::from_env().and_then(|config| match config {
        Some(config) => init_logging_with(&config),
        None => Ok(()),
    });
    if let Err(err) = logging {
        eprintln!("logging disabled: {err}");
    }

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match print_forests(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_forests(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn)?);
    let forests = service.forests()?;

    println!("instances={}", forests.instance_tasks.len());
    for node in &forests.instance_tasks {
        print_node(node, 1);
    }
    println!("templates={}", forests.template_tasks.len());
    for node in &forests.template_tasks {
        print_node(node, 1);
    }
    Ok(())
}

fn print_node(node: &TaskNode, depth: usize) {
    let start = node
        .task
        .start_date
        .map_or_else(|| "-".to_string(), |date| date.to_string());
    println!(
        "{:indent$}{} [{}] start={}",
        "",
        node.task.title,
        node.task.sort_position(),
        start,
        indent = depth * 2
    );
    for child in &node.children {
        print_node(child, depth + 1);
    }
}
