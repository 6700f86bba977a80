use anyhow::Result;
use chrono::Utc;

use crate::commands::{CommandReport, MailboxTarget, open_mailbox};
use crate::vmail::config::active_env_overrides;
use crate::vmail::folder::FolderEngine;
use crate::vmail::greeting::Greeting;
use crate::vmail::message::MessagePair;

#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    pub target: MailboxTarget,
    pub messages: bool,
}

fn describe_message(message: &MessagePair) -> String {
    let when = match message.timestamp() {
        Ok(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        Err(_) => "unknown date".to_string(),
    };
    let caller = match (message.caller_name(), message.caller_number()) {
        (Some(name), Some(number)) => format!("{name} <{number}>"),
        (None, Some(number)) => number,
        (Some(name), None) => name,
        (None, None) => "unknown caller".to_string(),
    };
    let duration = message
        .duration_secs()
        .map(|d| format!(" {d}s"))
        .unwrap_or_default();
    format!("  {} {when} {caller}{duration}", message.base_name())
}

fn inspect_folder(
    report: &mut CommandReport,
    folder: &mut FolderEngine,
    opts: &StatusOptions,
    max_age: chrono::TimeDelta,
) -> crate::error::Result<()> {
    let census = folder.census()?;
    let now = Utc::now();
    let mut stale = 0usize;
    let mut undated = 0usize;
    for message in folder.list()? {
        match message.is_stale(now, max_age) {
            Ok(true) => stale += 1,
            Ok(false) => {}
            Err(_) => undated += 1,
        }
    }

    report.detail(format!(
        "folder {} ({}): {} message(s), {} stale, settled={}",
        folder.name(),
        folder.key(),
        census.messages,
        stale,
        census.settled
    ));
    if opts.messages {
        let lines = folder.list()?.iter().map(describe_message).collect::<Vec<_>>();
        for line in lines {
            report.detail(line);
        }
    }

    let key = folder.key().to_string();
    if census.ghosts > 0 {
        report.issue(format!(
            "{key}: {} ghost file(s); run `vmtidy clean-ghosts`",
            census.ghosts
        ));
    }
    if census.staged_files > 0 {
        report.issue(format!(
            "{key}: {} staged file(s) from an interrupted renumber; run `vmtidy sort`",
            census.staged_files
        ));
    }
    if !census.settled {
        report.issue(format!("{key}: numbering has gaps; run `vmtidy sort`"));
    }
    if undated > 0 {
        report.issue(format!("{key}: {undated} message(s) with unparsable origdate"));
    }
    Ok(())
}

pub fn run(opts: &StatusOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("status");
    let (cfg, mut mailbox) = open_mailbox(&opts.target)?;
    let max_age = cfg.max_age();

    report.detail(format!("build: {}", env!("BUILD_ID")));
    report.detail(format!(
        "mailbox: {} (context {}) at {}",
        mailbox.id(),
        mailbox.context(),
        mailbox.path().display()
    ));
    report.detail(format!(
        "stale after: {} day(s), timezone {}",
        cfg.retention.max_age_days, cfg.retention.timezone
    ));
    for (key, value) in active_env_overrides() {
        report.detail(format!("env override: {key}={value}"));
    }

    let present = Greeting::ALL
        .into_iter()
        .filter(|g| mailbox.has_greeting(*g))
        .map(Greeting::as_str)
        .collect::<Vec<_>>();
    report.detail(format!(
        "greetings: {}",
        if present.is_empty() {
            "none".to_string()
        } else {
            present.join(", ")
        }
    ));
    report.detail(format!(
        "current greeting: {}",
        mailbox
            .current_greeting()
            .map_or("system default", Greeting::as_str)
    ));

    match opts.target.folder.as_deref() {
        Some(name) => {
            let folder = mailbox.folder(name)?;
            inspect_folder(&mut report, folder, opts, max_age)?;
        }
        None => {
            for folder in mailbox.folders()? {
                inspect_folder(&mut report, folder, opts, max_age)?;
            }
            report.detail(format!(
                "total: {} message(s)",
                mailbox.total_messages()?
            ));
        }
    }

    Ok(report)
}
