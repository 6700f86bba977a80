use anyhow::{Result, bail};
use chrono::{TimeDelta, Utc};

use crate::commands::{
    CommandReport, MailboxTarget, absorb, describe_renumber, open_mailbox, record_audit,
    run_on_folders,
};

#[derive(Debug, Clone, Default)]
pub struct CleanStaleOptions {
    pub target: MailboxTarget,
    pub no_sort: bool,
    pub max_age_days: Option<u64>,
}

pub fn run(opts: &CleanStaleOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("clean-stale");
    let (cfg, mut mailbox) = open_mailbox(&opts.target)?;

    let max_age = match opts.max_age_days {
        Some(0) => bail!("--max-age-days must be >= 1"),
        Some(days) => TimeDelta::try_days(i64::try_from(days)?).unwrap_or(TimeDelta::MAX),
        None => cfg.max_age(),
    };
    let auto_renumber = !opts.no_sort;
    let now = Utc::now();
    report.detail(format!("max age: {} day(s)", max_age.num_days()));

    let outcome = run_on_folders(
        &mut mailbox,
        opts.target.folder.as_deref(),
        "clean-stale",
        |f| f.clean_stale(now, max_age, auto_renumber),
        |m| m.clean_stale(now, max_age, auto_renumber),
    )?;
    absorb(&mut report, outcome, |key, sweep| {
        let mut line = format!("{key}: removed {} stale message(s)", sweep.removed.len());
        if let Some(renumber) = &sweep.renumber {
            line.push_str(&format!("; {}", describe_renumber(renumber)));
        }
        line
    })?;

    record_audit(&cfg, mailbox.id(), &report);
    Ok(report)
}
