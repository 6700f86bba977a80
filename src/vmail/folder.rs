//! Reconciliation of a single voicemail folder.
//!
//! A folder holds `msgNNNN.wav` / `msgNNNN.txt` pairs. Renumbering moves
//! every pair through a staged name (`stage-msgTTTT-from-msgSSSS`) before
//! committing it, so no rename ever lands on a file that has not moved yet.

use crate::error::{Result, VmailError, io_at};
use crate::vmail::message::{
    AUDIO_EXT, INFO_EXT, MessagePair, PAIR_EXTS, base_name, parse_file_name,
    parse_stage_file_name, stage_base_name,
};
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Siblings {
    audio: bool,
    info: bool,
}

impl Siblings {
    fn mark(&mut self, ext: &str) {
        match ext {
            AUDIO_EXT => self.audio = true,
            INFO_EXT => self.info = true,
            _ => {}
        }
    }

    fn any(self) -> bool {
        self.audio || self.info
    }

    fn complete(self) -> bool {
        self.audio && self.info
    }
}

#[derive(Debug, Default)]
struct MessageCache {
    entries: Option<Vec<MessagePair>>,
    dirty: bool,
}

impl MessageCache {
    fn invalidate(&mut self) {
        self.dirty = true;
    }

    fn needs_scan(&self) -> bool {
        self.dirty || self.entries.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenumberOutcome {
    pub messages: usize,
    pub renamed: usize,
    pub already_settled: bool,
    pub resumed_messages: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GhostSweep {
    pub resumed_messages: usize,
    pub removed: Vec<PathBuf>,
    pub renumber: Option<RenumberOutcome>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StaleSweep {
    pub removed: Vec<u32>,
    pub renumber: Option<RenumberOutcome>,
}

/// Read-only census of a folder, used by `status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderCensus {
    pub messages: usize,
    pub ghosts: usize,
    pub staged_files: usize,
    pub settled: bool,
}

fn rename_no_clobber(from: &Path, to: &Path) -> Result<()> {
    if to.symlink_metadata().is_ok() {
        return Err(VmailError::RenameCollision {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
    }
    fs::rename(from, to).map_err(io_at(from))
}

fn sibling_path(dir: &Path, base: &str, ext: &str) -> PathBuf {
    dir.join(format!("{base}.{ext}"))
}

fn rename_pair(dir: &Path, from_base: &str, to_base: &str) -> Result<()> {
    for ext in PAIR_EXTS {
        rename_no_clobber(
            &sibling_path(dir, from_base, ext),
            &sibling_path(dir, to_base, ext),
        )?;
    }
    Ok(())
}

pub struct FolderEngine {
    path: PathBuf,
    name: String,
    key: String,
    mailbox_id: String,
    zone: Tz,
    cache: MessageCache,
}

impl std::fmt::Debug for FolderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderEngine")
            .field("path", &self.path)
            .field("key", &self.key)
            .field("mailbox_id", &self.mailbox_id)
            .finish()
    }
}

impl FolderEngine {
    pub fn open(path: impl Into<PathBuf>, mailbox_id: &str, zone: Tz) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(VmailError::FolderNotFound(path));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            key: folder_key(&name),
            name,
            path,
            mailbox_id: mailbox_id.to_string(),
            zone,
            cache: MessageCache::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// On-disk directory name, e.g. `INBOX`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized lookup key, e.g. `inbox`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mailbox_id(&self) -> &str {
        &self.mailbox_id
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    fn read_dir_names(&self) -> Result<Vec<String>> {
        if !self.path.is_dir() {
            return Err(VmailError::FolderNotFound(self.path.clone()));
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(io_at(&self.path))? {
            let entry = entry.map_err(io_at(&self.path))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    /// Every `msgNNNN` base with at least one `.wav` or `.txt` sibling.
    fn scan_groups(&self) -> Result<BTreeMap<u32, Siblings>> {
        let mut groups: BTreeMap<u32, Siblings> = BTreeMap::new();
        for name in self.read_dir_names()? {
            if let Some((number, ext)) = parse_file_name(&name) {
                groups.entry(number).or_default().mark(ext);
            }
        }
        groups.retain(|_, s| s.any());
        Ok(groups)
    }

    fn scan_staged(&self) -> Result<BTreeMap<(u32, u32), Siblings>> {
        let mut staged: BTreeMap<(u32, u32), Siblings> = BTreeMap::new();
        for name in self.read_dir_names()? {
            if let Some((target, source, ext)) = parse_stage_file_name(&name) {
                staged.entry((target, source)).or_default().mark(ext);
            }
        }
        staged.retain(|_, s| s.any());
        Ok(staged)
    }

    fn scan(&self) -> Result<Vec<MessagePair>> {
        let groups = self.scan_groups()?;
        let mut out = Vec::with_capacity(groups.len());
        for (number, siblings) in groups {
            if siblings.complete() {
                out.push(MessagePair::open(&self.path, number, self.zone)?);
            }
        }
        debug!(folder = %self.path.display(), messages = out.len(), "scanned folder");
        Ok(out)
    }

    /// Valid message pairs in sequence order. Rescans when the cache is stale.
    pub fn list(&mut self) -> Result<&[MessagePair]> {
        if self.cache.needs_scan() {
            let scanned = self.scan()?;
            self.cache.entries = Some(scanned);
            self.cache.dirty = false;
        }
        Ok(self.cache.entries.as_deref().unwrap_or_default())
    }

    pub fn count(&mut self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    pub fn is_settled(&mut self) -> Result<bool> {
        let messages = self.list()?;
        Ok(match messages.last() {
            None => true,
            Some(last) => last.number() as usize + 1 == messages.len(),
        })
    }

    pub fn census(&mut self) -> Result<FolderCensus> {
        let staged = self.scan_staged()?;
        // Half-moved pairs of an interrupted renumber are not ghosts.
        let in_flight = staged
            .keys()
            .flat_map(|(target, source)| [*target, *source])
            .collect::<BTreeSet<_>>();
        let ghosts = self
            .scan_groups()?
            .iter()
            .filter(|(number, s)| !s.complete() && !in_flight.contains(*number))
            .count();
        let staged_files = staged
            .values()
            .map(|s| usize::from(s.audio) + usize::from(s.info))
            .sum();
        Ok(FolderCensus {
            messages: self.count()?,
            ghosts,
            staged_files,
            settled: self.is_settled()?,
        })
    }

    /// Deletes one message pair by sequence number.
    pub fn remove(&mut self, number: u32) -> Result<()> {
        let Some(message) = self.list()?.iter().find(|m| m.number() == number).cloned() else {
            return Err(VmailError::MessageNotFound(sibling_path(
                &self.path,
                &base_name(number),
                INFO_EXT,
            )));
        };
        self.cache.invalidate();
        message.destroy()
    }

    /// Commits staged files left behind by an interrupted renumber. Returns
    /// the number of messages that were in flight.
    pub fn resume_interrupted_renumber(&mut self) -> Result<usize> {
        let staged = self.scan_staged()?;
        if staged.is_empty() {
            return Ok(0);
        }
        warn!(
            folder = %self.path.display(),
            staged = staged.len(),
            "resuming interrupted renumber"
        );
        self.cache.invalidate();

        for (target, source) in staged.keys().copied() {
            let stage = stage_base_name(target, source);
            let final_base = base_name(target);
            let source_base = base_name(source);
            for ext in PAIR_EXTS {
                let staged_file = sibling_path(&self.path, &stage, ext);
                let final_file = sibling_path(&self.path, &final_base, ext);
                if staged_file.exists() {
                    rename_no_clobber(&staged_file, &final_file)?;
                    continue;
                }
                if final_file.exists() {
                    continue;
                }
                let original = sibling_path(&self.path, &source_base, ext);
                if source != target && original.exists() {
                    rename_no_clobber(&original, &final_file)?;
                }
            }
        }
        Ok(staged.len())
    }

    /// Fails before any rename if a lone sibling already sits on a name the
    /// commit pass will need.
    fn check_targets_free(&self, members: &[u32]) -> Result<()> {
        let count = members.len() as u32;
        for (number, siblings) in self.scan_groups()? {
            if number >= count || members.binary_search(&number).is_ok() {
                continue;
            }
            let blocking = if siblings.audio { AUDIO_EXT } else { INFO_EXT };
            let needs_slot = base_name(members[number as usize]);
            return Err(VmailError::RenameCollision {
                from: sibling_path(&self.path, &needs_slot, blocking),
                to: sibling_path(&self.path, &base_name(number), blocking),
            });
        }
        Ok(())
    }

    /// Compacts sequence numbers to `0..N-1`, keeping the current order.
    pub fn renumber(&mut self) -> Result<RenumberOutcome> {
        let resumed_messages = self.resume_interrupted_renumber()?;
        let numbers = self.list()?.iter().map(MessagePair::number).collect::<Vec<_>>();

        let mut outcome = RenumberOutcome {
            messages: numbers.len(),
            resumed_messages,
            ..RenumberOutcome::default()
        };
        let settled = numbers
            .last()
            .is_none_or(|last| *last as usize + 1 == numbers.len());
        if settled {
            outcome.already_settled = true;
            return Ok(outcome);
        }

        self.check_targets_free(&numbers)?;
        self.cache.invalidate();

        let mut staged = Vec::new();
        for (target, source) in numbers.iter().copied().enumerate() {
            let target = target as u32;
            if source == target {
                continue;
            }
            let stage = stage_base_name(target, source);
            rename_pair(&self.path, &base_name(source), &stage)?;
            staged.push((stage, target));
        }

        for (stage, target) in &staged {
            rename_pair(&self.path, stage, &base_name(*target))?;
        }

        outcome.renamed = staged.len();
        info!(
            folder = %self.path.display(),
            messages = outcome.messages,
            renamed = outcome.renamed,
            "renumbered folder"
        );
        Ok(outcome)
    }

    /// Deletes lone siblings, then optionally renumbers. An interrupted
    /// renumber is committed first so its half-moved pairs are not swept.
    pub fn clean_ghosts(&mut self, auto_renumber: bool) -> Result<GhostSweep> {
        let mut sweep = GhostSweep {
            resumed_messages: self.resume_interrupted_renumber()?,
            ..GhostSweep::default()
        };
        let groups = self.scan_groups()?;

        for number in groups.keys().copied() {
            let base = base_name(number);
            let audio = sibling_path(&self.path, &base, AUDIO_EXT);
            let info = sibling_path(&self.path, &base, INFO_EXT);
            let lone = match (audio.exists(), info.exists()) {
                (true, false) => audio,
                (false, true) => info,
                _ => continue,
            };
            fs::remove_file(&lone).map_err(io_at(&lone))?;
            warn!(file = %lone.display(), "removed ghost message file");
            sweep.removed.push(lone);
        }

        self.cache.invalidate();
        if auto_renumber {
            sweep.renumber = Some(self.renumber()?);
        }
        Ok(sweep)
    }

    /// Destroys messages older than `max_age` at `now`, then optionally renumbers.
    pub fn clean_stale(
        &mut self,
        now: DateTime<Utc>,
        max_age: TimeDelta,
        auto_renumber: bool,
    ) -> Result<StaleSweep> {
        let mut sweep = StaleSweep::default();
        let messages = self.list()?.to_vec();

        for message in &messages {
            if !message.is_stale(now, max_age)? {
                continue;
            }
            self.cache.invalidate();
            message.destroy()?;
            info!(
                folder = %self.path.display(),
                message = %message.base_name(),
                "removed stale message"
            );
            sweep.removed.push(message.number());
        }

        if auto_renumber {
            sweep.renumber = Some(self.renumber()?);
        }
        Ok(sweep)
    }

    /// Deletes every file in the folder; the directory itself stays.
    pub fn purge(&mut self) -> Result<usize> {
        if !self.path.is_dir() {
            return Err(VmailError::FolderNotFound(self.path.clone()));
        }
        self.cache.invalidate();

        let mut removed = 0usize;
        for entry in fs::read_dir(&self.path).map_err(io_at(&self.path))? {
            let entry = entry.map_err(io_at(&self.path))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(io_at(&path))?;
            if file_type.is_dir() {
                debug!(dir = %path.display(), "purge leaves subdirectory");
                continue;
            }
            fs::remove_file(&path).map_err(io_at(&path))?;
            removed += 1;
        }
        info!(folder = %self.path.display(), removed, "purged folder");
        Ok(removed)
    }

    /// Removes the folder directory and everything in it.
    pub fn destroy(&mut self) -> Result<()> {
        self.cache.invalidate();
        fs::remove_dir_all(&self.path).map_err(io_at(&self.path))?;
        info!(folder = %self.path.display(), "destroyed folder");
        Ok(())
    }
}

impl PartialEq for FolderEngine {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FolderEngine {}

impl PartialOrd for FolderEngine {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FolderEngine {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

/// Lookup key for a folder name: lowercase, runs of anything other than
/// ASCII alphanumerics and `_` collapsed to one `_`.
pub fn folder_key(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_sep = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch.to_ascii_lowercase());
            prev_sep = ch == '_';
        } else if !prev_sep {
            out.push('_');
            prev_sep = true;
        }
    }
    out.trim_matches('_').to_string()
}
