use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VmailError>;

#[derive(Debug, Error)]
pub enum VmailError {
    #[error("mailbox `{}` does not exist", .0.display())]
    MailboxNotFound(PathBuf),
    #[error("folder `{}` does not exist", .0.display())]
    FolderNotFound(PathBuf),
    #[error("message info file `{}` does not exist", .0.display())]
    MessageNotFound(PathBuf),
    #[error("invalid greeting `{0}` (use unavail, temp, busy or greet)")]
    GreetingNotFound(String),
    #[error("message `{}` has unparsable origdate {value:?}", .path.display())]
    InvalidTimestamp { path: PathBuf, value: Option<String> },
    #[error("refusing to rename {} over existing {}", .from.display(), .to.display())]
    RenameCollision { from: PathBuf, to: PathBuf },
    #[error(
        "{operation} failed in {} folder(s) ({completed} completed): {}",
        .failures.len(),
        summarize_failures(.failures)
    )]
    FolderOperationsFailed {
        operation: &'static str,
        completed: usize,
        failures: Vec<FolderFailure>,
    },
    #[error("config invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct FolderFailure {
    pub folder: String,
    pub error: VmailError,
}

fn summarize_failures(failures: &[FolderFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.folder, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Wraps an io error with the path it happened on.
pub fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> VmailError + '_ {
    move |source| VmailError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_out_failure_lists_every_folder() {
        let err = VmailError::FolderOperationsFailed {
            operation: "renumber",
            completed: 1,
            failures: vec![
                FolderFailure {
                    folder: "inbox".into(),
                    error: VmailError::FolderNotFound(PathBuf::from("/vm/INBOX")),
                },
                FolderFailure {
                    folder: "old".into(),
                    error: VmailError::GreetingNotFound("x".into()),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("renumber failed in 2 folder(s) (1 completed)"));
        assert!(text.contains("inbox: folder `/vm/INBOX` does not exist"));
        assert!(text.contains("old: invalid greeting `x`"));
    }
}
