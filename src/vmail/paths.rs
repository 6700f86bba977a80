use crate::error::{Result, VmailError};
use std::path::{Path, PathBuf};

pub const DEFAULT_VOICEMAIL_ROOT: &str = "/var/spool/asterisk/voicemail";

/// Context used when none is given: the area code of an 11-digit number
/// (`15183332220` -> `518`).
pub fn default_context(mailbox_id: &str) -> Option<&str> {
    mailbox_id.get(1..4)
}

/// `<voicemail_root>/<context>/<mailbox_id>`, which must exist.
pub fn resolve_mailbox_root(
    voicemail_root: &Path,
    mailbox_id: &str,
    context: Option<&str>,
) -> Result<(PathBuf, String)> {
    let mailbox_id = mailbox_id.trim();
    let context = match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(ctx) => ctx,
        None => default_context(mailbox_id)
            .ok_or_else(|| VmailError::MailboxNotFound(voicemail_root.join(mailbox_id)))?,
    };
    let bad_segment = |s: &str| s.is_empty() || s == "." || s == ".." || s.contains('/');
    if bad_segment(mailbox_id) || bad_segment(context) {
        return Err(VmailError::MailboxNotFound(
            voicemail_root.join(context).join(mailbox_id),
        ));
    }

    let root = voicemail_root.join(context).join(mailbox_id);
    if !root.is_dir() {
        return Err(VmailError::MailboxNotFound(root));
    }
    Ok((root, context.to_string()))
}
