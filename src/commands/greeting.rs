use anyhow::Result;

use crate::commands::{CommandReport, MailboxTarget, open_mailbox, record_audit};

#[derive(Debug, Clone, Default)]
pub struct DeleteGreetingOptions {
    pub target: MailboxTarget,
    pub name: String,
}

pub fn run(opts: &DeleteGreetingOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("delete-greeting");
    let (cfg, mailbox) = open_mailbox(&opts.target)?;

    if mailbox.delete_greeting(&opts.name)? {
        report.detail(format!("deleted greeting {}", opts.name.trim()));
    } else {
        report.detail(format!("greeting {} was not present", opts.name.trim()));
    }
    match mailbox.current_greeting() {
        Some(current) => report.detail(format!("callers now hear: {current}")),
        None => report.detail("callers now hear: system default"),
    }

    record_audit(&cfg, mailbox.id(), &report);
    Ok(report)
}
