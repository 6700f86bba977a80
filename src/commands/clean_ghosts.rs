use anyhow::Result;

use crate::commands::{
    CommandReport, MailboxTarget, absorb, describe_renumber, open_mailbox, record_audit,
    run_on_folders,
};

#[derive(Debug, Clone, Default)]
pub struct CleanGhostsOptions {
    pub target: MailboxTarget,
    pub no_sort: bool,
}

pub fn run(opts: &CleanGhostsOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("clean-ghosts");
    let (cfg, mut mailbox) = open_mailbox(&opts.target)?;
    let auto_renumber = !opts.no_sort;

    let outcome = run_on_folders(
        &mut mailbox,
        opts.target.folder.as_deref(),
        "clean-ghosts",
        |f| f.clean_ghosts(auto_renumber),
        |m| m.clean_ghosts(auto_renumber),
    )?;
    absorb(&mut report, outcome, |key, sweep| {
        let mut line = format!("{key}: removed {} ghost file(s)", sweep.removed.len());
        if sweep.resumed_messages > 0 {
            line.push_str(&format!(
                " after committing {} staged message(s) from an interrupted run",
                sweep.resumed_messages
            ));
        }
        if let Some(renumber) = &sweep.renumber {
            line.push_str(&format!("; {}", describe_renumber(renumber)));
        }
        line
    })?;

    record_audit(&cfg, mailbox.id(), &report);
    Ok(report)
}
