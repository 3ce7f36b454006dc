//! gatesync CLI
//!
//! Operator front end over a file-backed store and a gate-block document.
//!
//! Provides:
//! - `seed`: write gate blocks for a list of titles
//! - `push` / `pull`: write or read a checklist selection as the editor would
//! - `meta`: merge checklist metadata fields
//! - `sync`: run the panel's pull and write the result into the document
//! - `check`: report structural violations in the document

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod commands;

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use gatesync_client::SyncConfig;
use gatesync_store::{ChecklistContext, ChecklistMetaPatch, ChecklistStatus};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn checklist_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("gate")
                .long("gate")
                .required(true)
                .help("Gate number or gate title"),
        )
        .arg(
            Arg::new("checklist")
                .long("checklist")
                .required(true)
                .help("Checklist title within the gate"),
        )
}

/// Command-line definition
#[must_use]
pub fn cli() -> Command {
    Command::new("gatesync")
        .version(VERSION)
        .about("Synchronize gate checklists between a shared store and a gate-block document")
        .subcommand_required(true)
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .default_value("gatesync-store.json")
                .value_parser(value_parser!(PathBuf))
                .help("Store file"),
        )
        .arg(
            Arg::new("doc")
                .long("doc")
                .global(true)
                .default_value("gatesync-doc.json")
                .value_parser(value_parser!(PathBuf))
                .help("Gate-block document file"),
        )
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Standards catalog used to fill descriptions"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .env("GATESYNC_USER")
                .default_value("local")
                .help("User scope for store keys"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with sync timing"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Output as JSON"),
        )
        .subcommand(
            Command::new("seed")
                .about("Write gate blocks")
                .arg(
                    Arg::new("titles")
                        .long("titles")
                        .required(true)
                        .help("Comma-separated gate titles, numbered in order"),
                )
                .arg(
                    Arg::new("gate")
                        .long("gate")
                        .value_parser(value_parser!(u64))
                        .help("Seed the titles as checklists under this gate number"),
                ),
        )
        .subcommand(
            checklist_args(Command::new("push").about("Write a checklist selection")).arg(
                Arg::new("items")
                    .long("items")
                    .required(true)
                    .value_parser(value_parser!(PathBuf))
                    .help("JSON file holding the list of standards"),
            ),
        )
        .subcommand(checklist_args(
            Command::new("pull").about("Read a checklist selection and its metadata"),
        ))
        .subcommand(
            checklist_args(Command::new("meta").about("Update checklist metadata"))
                .arg(Arg::new("status").long("status").help("Approval status"))
                .arg(Arg::new("assignee").long("assignee").help("Assignee"))
                .arg(Arg::new("due").long("due").help("Due date (YYYY-MM-DD)"))
                .arg(Arg::new("feedback").long("feedback").help("Reviewer feedback")),
        )
        .subcommand(checklist_args(
            Command::new("sync").about("Pull a checklist into its gate block"),
        ))
        .subcommand(Command::new("check").about("Verify document structure"))
}

/// Install the global tracing subscriber, writing to stderr
///
/// `RUST_LOG` overrides the default `info` level.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    // A second init (tests) is not an error
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.with_ansi(false).try_init()
    };
}

fn path_arg<'a>(matches: &'a ArgMatches, name: &str) -> Option<&'a Path> {
    matches.get_one::<PathBuf>(name).map(PathBuf::as_path)
}

fn string_arg<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches.get_one::<String>(name).map_or("", String::as_str)
}

fn checklist_context(matches: &ArgMatches) -> ChecklistContext {
    ChecklistContext::new(string_arg(matches, "gate"), string_arg(matches, "checklist"))
}

fn meta_patch(matches: &ArgMatches) -> ChecklistMetaPatch {
    let mut patch = ChecklistMetaPatch::new();
    if let Some(status) = matches.get_one::<String>("status") {
        patch = patch.with_status(ChecklistStatus::from_label(status));
    }
    if let Some(assignee) = matches.get_one::<String>("assignee") {
        patch = patch.with_assignee(assignee.as_str());
    }
    if let Some(due) = matches.get_one::<String>("due") {
        patch = patch.with_due_date(due.as_str());
    }
    if let Some(feedback) = matches.get_one::<String>("feedback") {
        patch = patch.with_feedback(feedback.as_str());
    }
    patch
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Execute the parsed command line; returns the process exit code
///
/// # Errors
/// Any failure of the selected command
pub async fn run(matches: &ArgMatches) -> Result<i32> {
    let json = matches.get_flag("json");
    let doc = path_arg(matches, "doc").unwrap_or(Path::new("gatesync-doc.json"));
    let store_path = path_arg(matches, "store").unwrap_or(Path::new("gatesync-store.json"));
    let user = string_arg(matches, "user");

    match matches.subcommand() {
        Some(("seed", args)) => {
            let titles = commands::parse_titles(string_arg(args, "titles"));
            let gate = args.get_one::<u64>("gate").copied();
            let report = commands::seed(doc, &titles, gate)?;
            if json {
                print_json(&serde_json::json!({
                    "labels_written": report.labels_written,
                    "created": report.created,
                    "updated": report.updated,
                }))?;
            } else {
                println!(
                    "Seeded {}: {} created, {} updated",
                    doc.display(),
                    report.created.len(),
                    report.updated.len()
                );
            }
            Ok(0)
        }
        Some(("push", args)) => {
            let store = commands::open_store(store_path, user).await?;
            let items = path_arg(args, "items").unwrap_or(Path::new("items.json"));
            let count = commands::push(store, &checklist_context(args), items).await?;
            if json {
                print_json(&serde_json::json!({ "ok": true, "items": count }))?;
            } else {
                println!("Pushed {count} standards");
            }
            Ok(0)
        }
        Some(("pull", args)) => {
            let store = commands::open_store(store_path, user).await?;
            let output = commands::pull(store, &checklist_context(args)).await?;
            if json {
                print_json(&output)?;
            } else {
                println!("{} (ts {})", output.key, output.ts);
                for item in &output.items {
                    println!("  {:<16} {:>6.1}%  {}", item.code, item.percent, item.description);
                }
                println!("  status: {}", output.meta.status);
                println!("  assignee: {}", output.meta.assignee);
                println!("  due: {}", output.meta.due_date);
                println!("  feedback: {}", output.meta.feedback);
            }
            Ok(0)
        }
        Some(("meta", args)) => {
            let store = commands::open_store(store_path, user).await?;
            let meta = commands::meta(store, &checklist_context(args), &meta_patch(args)).await?;
            if json {
                print_json(&meta)?;
            } else {
                println!(
                    "status={} assignee={} due={} feedback={}",
                    meta.status, meta.assignee, meta.due_date, meta.feedback
                );
            }
            Ok(0)
        }
        Some(("sync", args)) => {
            let store = commands::open_store(store_path, user).await?;
            let catalog = commands::load_catalog(path_arg(matches, "catalog"))?;
            let config = match path_arg(matches, "config") {
                Some(path) => SyncConfig::load(path)?,
                None => SyncConfig::new(),
            };
            let summary =
                commands::sync(store, doc, catalog, &checklist_context(args), config).await?;
            if json {
                print_json(&summary)?;
            } else {
                println!(
                    "Wrote {} standards into gate row {}",
                    summary.items, summary.header_row
                );
            }
            Ok(0)
        }
        Some(("check", _)) => {
            let violations = commands::check(doc)?;
            if json {
                let messages: Vec<String> = violations.iter().map(ToString::to_string).collect();
                print_json(&serde_json::json!({ "ok": violations.is_empty(), "violations": messages }))?;
            } else if violations.is_empty() {
                println!("{}: OK", doc.display());
            } else {
                for violation in &violations {
                    println!("{violation}");
                }
            }
            Ok(i32::from(!violations.is_empty()))
        }
        _ => Ok(2),
    }
}
