use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{
    self, CommandReport, MailboxTarget, clean_ghosts::CleanGhostsOptions,
    clean_stale::CleanStaleOptions, delete::DeleteOptions, greeting::DeleteGreetingOptions,
    purge::PurgeOptions, sort::SortOptions, status::StatusOptions,
};
use crate::logging;

#[derive(Parser, Debug)]
#[command(name = "vmtidy")]
#[command(version, about = "Maintenance for Asterisk-style voicemail spools")]
struct Cli {
    /// Print the command report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable info-level logging on stderr (`VMTIDY_LOG` overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Voicemail spool root (defaults to config / VMTIDY_VOICEMAIL_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct MailboxArgs {
    /// Mailbox id, e.g. 15183332220
    mailbox: String,

    /// Voicemail context; defaults to the mailbox's area code
    #[arg(long)]
    context: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct TargetArgs {
    #[command(flatten)]
    mailbox: MailboxArgs,

    /// Restrict the operation to one folder (case-insensitive)
    #[arg(long)]
    folder: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show folders, counts, and anything that needs cleaning
    Status {
        #[command(flatten)]
        target: TargetArgs,
        /// List every message
        #[arg(long)]
        messages: bool,
    },
    /// Renumber messages so each folder runs msg0000..msgN-1
    Sort {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Remove lone .wav/.txt files, then renumber
    CleanGhosts {
        #[command(flatten)]
        target: TargetArgs,
        /// Skip renumbering afterwards
        #[arg(long)]
        no_sort: bool,
    },
    /// Remove messages older than the retention window, then renumber
    CleanStale {
        #[command(flatten)]
        target: TargetArgs,
        /// Skip renumbering afterwards
        #[arg(long)]
        no_sort: bool,
        /// Override the configured retention window
        #[arg(long)]
        max_age_days: Option<u64>,
    },
    /// Delete every file in the folders, keeping the folders
    Purge {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Delete the mailbox, its folders, or one folder
    Delete {
        #[command(flatten)]
        target: TargetArgs,
        /// Keep the mailbox root and greetings
        #[arg(long)]
        folders_only: bool,
    },
    /// Delete a greeting recording
    DeleteGreeting {
        #[command(flatten)]
        mailbox: MailboxArgs,
        /// unavail, temp, busy or greet
        name: String,
    },
}

impl TargetArgs {
    fn resolve(&self, root: &Option<PathBuf>) -> MailboxTarget {
        MailboxTarget {
            folder: self.folder.clone(),
            ..self.mailbox.resolve(root)
        }
    }
}

impl MailboxArgs {
    fn resolve(&self, root: &Option<PathBuf>) -> MailboxTarget {
        MailboxTarget {
            root_override: root.clone(),
            mailbox: self.mailbox.clone(),
            context: self.context.clone(),
            folder: None,
        }
    }
}

fn render(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("command: {}", report.command);
    println!("ok: {}", report.ok);
    for detail in &report.details {
        println!("- {detail}");
    }
    for issue in &report.issues {
        println!("! {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let root = &cli.root;
    let report = match &cli.command {
        Command::Status { target, messages } => commands::status::run(&StatusOptions {
            target: target.resolve(root),
            messages: *messages,
        })?,
        Command::Sort { target } => commands::sort::run(&SortOptions {
            target: target.resolve(root),
        })?,
        Command::CleanGhosts { target, no_sort } => {
            commands::clean_ghosts::run(&CleanGhostsOptions {
                target: target.resolve(root),
                no_sort: *no_sort,
            })?
        }
        Command::CleanStale {
            target,
            no_sort,
            max_age_days,
        } => commands::clean_stale::run(&CleanStaleOptions {
            target: target.resolve(root),
            no_sort: *no_sort,
            max_age_days: *max_age_days,
        })?,
        Command::Purge { target } => commands::purge::run(&PurgeOptions {
            target: target.resolve(root),
        })?,
        Command::Delete {
            target,
            folders_only,
        } => commands::delete::run(&DeleteOptions {
            target: target.resolve(root),
            folders_only: *folders_only,
        })?,
        Command::DeleteGreeting { mailbox, name } => {
            commands::greeting::run(&DeleteGreetingOptions {
                target: mailbox.resolve(root),
                name: name.clone(),
            })?
        }
    };

    render(&report, cli.json)?;
    if !report.ok && report.command != "status" {
        bail!("{} reported {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn folder_and_context_flow_into_target() {
        let cli = Cli::try_parse_from([
            "vmtidy",
            "--root",
            "/vm",
            "clean-stale",
            "15183332220",
            "--context",
            "default",
            "--folder",
            "INBOX",
            "--max-age-days",
            "7",
        ])
        .expect("parse");
        let Command::CleanStale {
            target,
            max_age_days,
            no_sort,
        } = &cli.command
        else {
            panic!("wrong subcommand: {:?}", cli.command);
        };
        let resolved = target.resolve(&cli.root);
        assert_eq!(resolved.root_override, Some(PathBuf::from("/vm")));
        assert_eq!(resolved.mailbox, "15183332220");
        assert_eq!(resolved.context.as_deref(), Some("default"));
        assert_eq!(resolved.folder.as_deref(), Some("INBOX"));
        assert_eq!(*max_age_days, Some(7));
        assert!(!no_sort);
    }
}
