use anyhow::Result;

use crate::commands::{
    CommandReport, MailboxTarget, absorb, describe_renumber, open_mailbox, record_audit,
    run_on_folders,
};
use crate::vmail::folder::FolderEngine;
use crate::vmail::mailbox::Mailbox;

#[derive(Debug, Clone, Default)]
pub struct SortOptions {
    pub target: MailboxTarget,
}

pub fn run(opts: &SortOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("sort");
    let (cfg, mut mailbox) = open_mailbox(&opts.target)?;

    let outcome = run_on_folders(
        &mut mailbox,
        opts.target.folder.as_deref(),
        "renumber",
        FolderEngine::renumber,
        Mailbox::renumber,
    )?;
    absorb(&mut report, outcome, |key, o| {
        format!("{key}: {}", describe_renumber(o))
    })?;

    record_audit(&cfg, mailbox.id(), &report);
    Ok(report)
}
