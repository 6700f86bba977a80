use crate::error::{FolderFailure, Result, VmailError, io_at};
use crate::vmail::folder::{FolderEngine, GhostSweep, RenumberOutcome, StaleSweep, folder_key};
use crate::vmail::greeting::Greeting;
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_IGNORED_DIRS: [&str; 3] = ["tmp", "temp", "unavail"];

#[derive(Debug, Clone)]
pub struct MailboxSettings {
    pub ignored_dirs: Vec<String>,
    pub zone: Tz,
}

impl Default for MailboxSettings {
    fn default() -> Self {
        Self {
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|d| d.to_string()).collect(),
            zone: Tz::UTC,
        }
    }
}

#[derive(Debug, Default)]
struct FolderSet {
    engines: Vec<FolderEngine>,
    by_key: BTreeMap<String, usize>,
}

/// Per-folder result of a fanned-out operation, in discovery order.
pub type FolderResults<T> = Vec<(String, T)>;

/// A mailbox root and the message folders found beneath it.
#[derive(Debug)]
pub struct Mailbox {
    id: String,
    context: String,
    root: PathBuf,
    settings: MailboxSettings,
    folders: Option<FolderSet>,
}

impl Mailbox {
    pub fn open(
        root: impl Into<PathBuf>,
        id: &str,
        context: &str,
        settings: MailboxSettings,
    ) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(VmailError::MailboxNotFound(root));
        }
        Ok(Self {
            id: id.to_string(),
            context: context.to_string(),
            root,
            settings,
            folders: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    fn is_ignored(&self, name: &str) -> bool {
        name.starts_with('.')
            || self
                .settings
                .ignored_dirs
                .iter()
                .any(|d| d == name)
    }

    fn discover(&self) -> Result<FolderSet> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_at(&self.root))? {
            let entry = entry.map_err(io_at(&self.root))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_ignored(&name) {
                continue;
            }
            dirs.push((name, path));
        }
        dirs.sort();

        let mut set = FolderSet::default();
        for (name, path) in dirs {
            let key = folder_key(&name);
            if let Some(existing) = set.by_key.get(&key) {
                warn!(
                    folder = %path.display(),
                    shadowed_by = %set.engines[*existing].path().display(),
                    "skipping folder whose key collides with another folder"
                );
                continue;
            }
            set.by_key.insert(key, set.engines.len());
            set.engines
                .push(FolderEngine::open(path, &self.id, self.settings.zone)?);
        }
        Ok(set)
    }

    fn folder_set(&mut self) -> Result<&mut FolderSet> {
        let set = match self.folders.take() {
            Some(set) => set,
            None => self.discover()?,
        };
        Ok(self.folders.insert(set))
    }

    /// Discovered folders in discovery order.
    pub fn folders(&mut self) -> Result<&mut [FolderEngine]> {
        Ok(&mut self.folder_set()?.engines)
    }

    pub fn folder_keys(&mut self) -> Result<Vec<String>> {
        Ok(self
            .folders()?
            .iter()
            .map(|f| f.key().to_string())
            .collect())
    }

    /// Looks a folder up by name, normalized the same way as folder keys.
    pub fn folder(&mut self, name: &str) -> Result<&mut FolderEngine> {
        let key = folder_key(name);
        let root = self.root.join(name);
        let set = self.folder_set()?;
        match set.by_key.get(&key).copied() {
            Some(idx) => Ok(&mut set.engines[idx]),
            None => Err(VmailError::FolderNotFound(root)),
        }
    }

    /// Drops the discovered folder set; the next access rediscovers.
    pub fn reload(&mut self) {
        self.folders = None;
    }

    pub fn total_messages(&mut self) -> Result<usize> {
        let mut total = 0usize;
        for folder in self.folders()? {
            total += folder.count()?;
        }
        Ok(total)
    }

    /// Runs `op` on every folder. Every folder is attempted; failures are
    /// collected and reported together once all folders have run.
    fn fan_out<T>(
        &mut self,
        operation: &'static str,
        mut op: impl FnMut(&mut FolderEngine) -> Result<T>,
    ) -> Result<FolderResults<T>> {
        let mut done = Vec::new();
        let mut failures = Vec::new();
        for folder in self.folders()? {
            match op(folder) {
                Ok(value) => done.push((folder.key().to_string(), value)),
                Err(error) => {
                    warn!(
                        operation,
                        folder = %folder.path().display(),
                        error = %error,
                        "folder operation failed; continuing with remaining folders"
                    );
                    failures.push(FolderFailure {
                        folder: folder.key().to_string(),
                        error,
                    });
                }
            }
        }
        if failures.is_empty() {
            Ok(done)
        } else {
            Err(VmailError::FolderOperationsFailed {
                operation,
                completed: done.len(),
                failures,
            })
        }
    }

    pub fn renumber(&mut self) -> Result<FolderResults<RenumberOutcome>> {
        self.fan_out("renumber", FolderEngine::renumber)
    }

    pub fn clean_ghosts(&mut self, auto_renumber: bool) -> Result<FolderResults<GhostSweep>> {
        self.fan_out("clean-ghosts", |f| f.clean_ghosts(auto_renumber))
    }

    pub fn clean_stale(
        &mut self,
        now: DateTime<Utc>,
        max_age: TimeDelta,
        auto_renumber: bool,
    ) -> Result<FolderResults<StaleSweep>> {
        self.fan_out("clean-stale", |f| f.clean_stale(now, max_age, auto_renumber))
    }

    pub fn purge(&mut self) -> Result<FolderResults<usize>> {
        self.fan_out("purge", FolderEngine::purge)
    }

    /// Removes every folder directory, leaving the root and greetings.
    pub fn destroy_folders(&mut self) -> Result<FolderResults<()>> {
        let out = self.fan_out("destroy", FolderEngine::destroy);
        self.reload();
        out
    }

    /// Removes the mailbox root with all folders and greetings.
    pub fn destroy(self) -> Result<()> {
        fs::remove_dir_all(&self.root).map_err(io_at(&self.root))?;
        info!(mailbox = %self.root.display(), "destroyed mailbox");
        Ok(())
    }

    pub fn greeting_path(&self, greeting: Greeting) -> PathBuf {
        self.root.join(greeting.file_name())
    }

    pub fn has_greeting(&self, greeting: Greeting) -> bool {
        self.greeting_path(greeting).is_file()
    }

    /// The greeting callers hear: `temp` wins over `unavail`.
    pub fn current_greeting(&self) -> Option<Greeting> {
        [Greeting::Temp, Greeting::Unavail]
            .into_iter()
            .find(|g| self.has_greeting(*g))
    }

    /// Deletes a greeting by name. `Ok(false)` when it was not present.
    pub fn delete_greeting(&self, name: &str) -> Result<bool> {
        let greeting = name.parse::<Greeting>()?;
        let path = self.greeting_path(greeting);
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(io_at(&path))?;
        info!(greeting = %greeting, mailbox = %self.root.display(), "deleted greeting");
        Ok(true)
    }
}
