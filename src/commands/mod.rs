pub mod clean_ghosts;
pub mod clean_stale;
pub mod delete;
pub mod greeting;
pub mod purge;
pub mod sort;
pub mod status;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

use crate::error::{FolderFailure, VmailError};
use crate::vmail::audit;
use crate::vmail::config::{VmtidyConfig, load_config};
use crate::vmail::folder::{FolderEngine, RenumberOutcome};
use crate::vmail::mailbox::{FolderResults, Mailbox};
use crate::vmail::paths::resolve_mailbox_root;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Which mailbox (and optionally which folder) a command acts on.
#[derive(Debug, Clone, Default)]
pub struct MailboxTarget {
    pub root_override: Option<PathBuf>,
    pub mailbox: String,
    pub context: Option<String>,
    pub folder: Option<String>,
}

pub fn open_mailbox(target: &MailboxTarget) -> Result<(VmtidyConfig, Mailbox)> {
    let mut cfg = load_config()?;
    if let Some(root) = &target.root_override {
        cfg.storage.voicemail_root = root.clone();
    }
    let (root, context) = resolve_mailbox_root(
        &cfg.storage.voicemail_root,
        &target.mailbox,
        target.context.as_deref(),
    )?;
    let settings = cfg.mailbox_settings()?;
    let mailbox = Mailbox::open(root, target.mailbox.trim(), &context, settings)?;
    Ok((cfg, mailbox))
}

/// Runs a folder operation on the targeted folder, or fans it out to every
/// folder. A failure in a single targeted folder is reported the same way as
/// a fan-out failure.
pub fn run_on_folders<T>(
    mailbox: &mut Mailbox,
    folder: Option<&str>,
    operation: &'static str,
    single: impl FnOnce(&mut FolderEngine) -> crate::error::Result<T>,
    all: impl FnOnce(&mut Mailbox) -> crate::error::Result<FolderResults<T>>,
) -> Result<crate::error::Result<FolderResults<T>>> {
    let Some(name) = folder else {
        return Ok(all(mailbox));
    };
    let engine = mailbox.folder(name)?;
    let key = engine.key().to_string();
    Ok(match single(engine) {
        Ok(value) => Ok(vec![(key, value)]),
        Err(error) => Err(VmailError::FolderOperationsFailed {
            operation,
            completed: 0,
            failures: vec![FolderFailure { folder: key, error }],
        }),
    })
}

/// Turns per-folder results into report lines. Fan-out failures become
/// issues; any other error aborts the command.
pub fn absorb<T>(
    report: &mut CommandReport,
    outcome: crate::error::Result<FolderResults<T>>,
    describe: impl Fn(&str, &T) -> String,
) -> Result<()> {
    match outcome {
        Ok(results) => {
            if results.is_empty() {
                report.detail("no folders");
            }
            for (key, value) in &results {
                report.detail(describe(key, value));
            }
            Ok(())
        }
        Err(VmailError::FolderOperationsFailed {
            operation,
            completed,
            failures,
        }) => {
            report.detail(format!("{operation}: {completed} folder(s) completed"));
            for failure in failures {
                report.issue(format!("{}: {}", failure.folder, failure.error));
            }
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn describe_renumber(outcome: &RenumberOutcome) -> String {
    let mut out = if outcome.already_settled {
        format!("{} message(s), already in order", outcome.messages)
    } else {
        format!(
            "{} message(s), {} renumbered",
            outcome.messages, outcome.renamed
        )
    };
    if outcome.resumed_messages > 0 {
        out.push_str(&format!(
            ", {} staged message(s) from an interrupted run committed",
            outcome.resumed_messages
        ));
    }
    out
}

/// Appends the command outcome to the audit log when one is configured.
pub fn record_audit(cfg: &VmtidyConfig, mailbox_id: &str, report: &CommandReport) {
    let Some(logs_dir) = &cfg.audit.logs_dir else {
        return;
    };
    let status = if report.ok { "ok" } else { "failed" };
    let message = match report.issues.first() {
        Some(issue) => format!("{mailbox_id}: {issue}"),
        None => format!("{mailbox_id}: {}", report.details.join("; ")),
    };
    if let Err(err) = audit::append_event(logs_dir, &report.command, status, &message)
        .with_context(|| format!("audit log in {}", logs_dir.display()))
    {
        warn!(error = %format!("{err:#}"), "failed to write audit event");
    }
}
