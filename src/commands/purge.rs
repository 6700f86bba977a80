use anyhow::Result;

use crate::commands::{
    CommandReport, MailboxTarget, absorb, open_mailbox, record_audit, run_on_folders,
};
use crate::vmail::folder::FolderEngine;
use crate::vmail::mailbox::Mailbox;

#[derive(Debug, Clone, Default)]
pub struct PurgeOptions {
    pub target: MailboxTarget,
}

pub fn run(opts: &PurgeOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("purge");
    let (cfg, mut mailbox) = open_mailbox(&opts.target)?;

    let outcome = run_on_folders(
        &mut mailbox,
        opts.target.folder.as_deref(),
        "purge",
        FolderEngine::purge,
        Mailbox::purge,
    )?;
    absorb(&mut report, outcome, |key, removed| {
        format!("{key}: removed {removed} file(s)")
    })?;

    record_audit(&cfg, mailbox.id(), &report);
    Ok(report)
}
