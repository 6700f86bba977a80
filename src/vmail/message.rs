use crate::error::{Result, VmailError, io_at};
use crate::vmail::dates::parse_origdate;
use crate::vmail::info::MessageInfo;
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::cell::OnceCell;
use std::cmp::Ordering;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const AUDIO_EXT: &str = "wav";
pub const INFO_EXT: &str = "txt";
pub const PAIR_EXTS: [&str; 2] = [AUDIO_EXT, INFO_EXT];

const BASE_PREFIX: &str = "msg";
const STAGE_PREFIX: &str = "stage-msg";
const STAGE_SOURCE_MARK: &str = "-from-msg";

/// Default retention before a message counts as stale.
pub const DEFAULT_MAX_AGE_DAYS: u64 = 30;

pub fn base_name(number: u32) -> String {
    format!("{BASE_PREFIX}{number:04}")
}

/// Temporary base name used while renumbering. Carries the target and the
/// source number so an interrupted run can be resumed.
pub fn stage_base_name(target: u32, source: u32) -> String {
    format!("{STAGE_PREFIX}{target:04}{STAGE_SOURCE_MARK}{source:04}")
}

fn four_digits(raw: &str) -> Option<u32> {
    if raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// `msg0007.wav` -> `(7, "wav")`.
pub fn parse_file_name(name: &str) -> Option<(u32, &str)> {
    let rest = name.strip_prefix(BASE_PREFIX)?;
    let (digits, ext) = rest.split_once('.')?;
    Some((four_digits(digits)?, ext))
}

/// `stage-msg0002-from-msg0005.txt` -> `(2, 5, "txt")`.
pub fn parse_stage_file_name(name: &str) -> Option<(u32, u32, &str)> {
    let rest = name.strip_prefix(STAGE_PREFIX)?;
    let (target, rest) = rest.split_at_checked(4)?;
    let rest = rest.strip_prefix(STAGE_SOURCE_MARK)?;
    let (source, ext) = rest.split_once('.')?;
    Some((four_digits(target)?, four_digits(source)?, ext))
}

/// One voicemail: `msgNNNN.wav` plus `msgNNNN.txt`.
#[derive(Debug, Clone)]
pub struct MessagePair {
    number: u32,
    audio_path: PathBuf,
    info_path: PathBuf,
    info: MessageInfo,
    zone: Tz,
    timestamp: OnceCell<DateTime<Utc>>,
}

impl MessagePair {
    /// Loads message `number` from `dir`, reading its info record.
    pub fn open(dir: &Path, number: u32, zone: Tz) -> Result<Self> {
        let base = base_name(number);
        let info_path = dir.join(format!("{base}.{INFO_EXT}"));
        let audio_path = dir.join(format!("{base}.{AUDIO_EXT}"));

        let raw = match fs::read(&info_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(VmailError::MessageNotFound(info_path));
            }
            Err(err) => return Err(io_at(&info_path)(err)),
        };
        let info = MessageInfo::parse(&String::from_utf8_lossy(&raw));

        Ok(Self {
            number,
            audio_path,
            info_path,
            info,
            zone,
            timestamp: OnceCell::new(),
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn base_name(&self) -> String {
        base_name(self.number)
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    pub fn info_path(&self) -> &Path {
        &self.info_path
    }

    pub fn info(&self) -> &MessageInfo {
        &self.info
    }

    pub fn duration_secs(&self) -> Option<u64> {
        self.info.duration
    }

    pub fn caller_name(&self) -> Option<String> {
        self.info.caller_name()
    }

    pub fn caller_number(&self) -> Option<String> {
        self.info.caller_number()
    }

    /// When the message was left. An absent or unparsable `origdate` is an
    /// error; callers decide whether that aborts their operation.
    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        if let Some(ts) = self.timestamp.get() {
            return Ok(*ts);
        }
        let parsed = self
            .info
            .origdate
            .as_deref()
            .and_then(|raw| parse_origdate(raw, self.zone))
            .ok_or_else(|| VmailError::InvalidTimestamp {
                path: self.info_path.clone(),
                value: self.info.origdate.clone(),
            })?;
        Ok(*self.timestamp.get_or_init(|| parsed))
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: TimeDelta) -> Result<bool> {
        Ok(now.signed_duration_since(self.timestamp()?) > max_age)
    }

    /// Deletes both siblings. A sibling that is already gone is skipped.
    pub fn destroy(&self) -> Result<()> {
        for path in [&self.info_path, &self.audio_path] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(io_at(path)(err)),
            }
        }
        Ok(())
    }
}

impl PartialEq for MessagePair {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for MessagePair {}

impl PartialOrd for MessagePair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MessagePair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}
