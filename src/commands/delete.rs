use anyhow::Result;

use crate::commands::{
    CommandReport, MailboxTarget, absorb, open_mailbox, record_audit, run_on_folders,
};
use crate::vmail::folder::FolderEngine;
use crate::vmail::mailbox::Mailbox;

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub target: MailboxTarget,
    pub folders_only: bool,
}

pub fn run(opts: &DeleteOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("delete");
    let (cfg, mut mailbox) = open_mailbox(&opts.target)?;

    if opts.target.folder.is_none() && !opts.folders_only {
        let root = mailbox.path().display().to_string();
        let id = mailbox.id().to_string();
        mailbox.destroy()?;
        report.detail(format!("removed mailbox {root}"));
        record_audit(&cfg, &id, &report);
        return Ok(report);
    }

    let outcome = run_on_folders(
        &mut mailbox,
        opts.target.folder.as_deref(),
        "destroy",
        FolderEngine::destroy,
        Mailbox::destroy_folders,
    )?;
    mailbox.reload();
    absorb(&mut report, outcome, |key, _| format!("{key}: removed folder"))?;

    record_audit(&cfg, mailbox.id(), &report);
    Ok(report)
}
