use crate::error::VmailError;
use crate::vmail::mailbox::{DEFAULT_IGNORED_DIRS, MailboxSettings};
use crate::vmail::message::DEFAULT_MAX_AGE_DAYS;
use crate::vmail::paths::DEFAULT_VOICEMAIL_ROOT;
use anyhow::{Context, Result, anyhow};
use chrono::TimeDelta;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

include!(concat!(env!("OUT_DIR"), "/vmtidy_env_allowlist.rs"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub voicemail_root: PathBuf,
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,
}

fn default_ignored_dirs() -> Vec<String> {
    DEFAULT_IGNORED_DIRS.iter().map(|d| d.to_string()).collect()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            voicemail_root: PathBuf::from(DEFAULT_VOICEMAIL_ROOT),
            ignored_dirs: default_ignored_dirs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub max_age_days: u64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            timezone: default_timezone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuditConfig {
    pub logs_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VmtidyConfig {
    pub storage: StorageConfig,
    pub retention: RetentionConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialVmtidyConfig {
    storage: Option<StorageConfig>,
    retention: Option<RetentionConfig>,
    audit: Option<AuditConfig>,
}

impl VmtidyConfig {
    pub fn zone(&self) -> Result<Tz> {
        self.retention
            .timezone
            .parse::<Tz>()
            .map_err(|err| anyhow!("invalid retention timezone `{}`: {err}", self.retention.timezone))
    }

    pub fn max_age(&self) -> TimeDelta {
        let days = i64::try_from(self.retention.max_age_days).unwrap_or(i64::MAX / 86_400);
        TimeDelta::try_days(days).unwrap_or(TimeDelta::MAX)
    }

    pub fn mailbox_settings(&self) -> Result<MailboxSettings> {
        Ok(MailboxSettings {
            ignored_dirs: self.storage.ignored_dirs.clone(),
            zone: self.zone()?,
        })
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or_path_first(vars: &[&str], fallback: PathBuf) -> PathBuf {
    vars.iter()
        .find_map(|var| env_non_empty(var))
        .map(PathBuf::from)
        .unwrap_or(fallback)
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    env_non_empty(var).unwrap_or_else(|| fallback.to_string())
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        Err(_) => fallback.to_vec(),
    }
}

fn validate(cfg: &VmtidyConfig) -> std::result::Result<(), VmailError> {
    if cfg.storage.voicemail_root.as_os_str().is_empty() {
        return Err(VmailError::InvalidConfig(
            "storage.voicemail_root cannot be empty".to_string(),
        ));
    }
    if cfg.retention.max_age_days == 0 {
        return Err(VmailError::InvalidConfig(
            "retention.max_age_days must be >= 1".to_string(),
        ));
    }
    if cfg.retention.timezone.parse::<Tz>().is_err() {
        return Err(VmailError::InvalidConfig(format!(
            "retention.timezone `{}` is not an IANA zone name",
            cfg.retention.timezone
        )));
    }
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(custom) = env_non_empty("VMTIDY_CONFIG_PATH") {
        return Some(PathBuf::from(custom));
    }

    let base = dirs::config_dir()?;
    Some(base.join("vmtidy").join("config.toml"))
}

fn merge_file_config(base: &mut VmtidyConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let parsed: PartialVmtidyConfig = toml::from_str(&raw).map_err(|err| {
        VmailError::InvalidConfig(format!("failed to parse {}: {err}", path.display()))
    })?;
    if let Some(storage) = parsed.storage {
        base.storage = storage;
    }
    if let Some(retention) = parsed.retention {
        base.retention = retention;
    }
    if let Some(audit) = parsed.audit {
        base.audit = audit;
    }
    Ok(())
}

fn apply_env_overrides(cfg: &mut VmtidyConfig) {
    cfg.storage.voicemail_root = env_or_path_first(
        &["VMTIDY_VOICEMAIL_ROOT", "ASTERISK_VOICEMAIL_ROOT"],
        cfg.storage.voicemail_root.clone(),
    );
    cfg.storage.ignored_dirs = env_or_csv("VMTIDY_IGNORED_DIRS", &cfg.storage.ignored_dirs);
    cfg.retention.max_age_days = env_or_u64("VMTIDY_MAX_AGE_DAYS", cfg.retention.max_age_days);
    cfg.retention.timezone = env_or_string("VMTIDY_TIMEZONE", &cfg.retention.timezone);
    if let Some(dir) = env_non_empty("VMTIDY_LOGS_DIR") {
        cfg.audit.logs_dir = Some(PathBuf::from(dir));
    }
}

pub fn load_config() -> Result<VmtidyConfig> {
    let mut cfg = VmtidyConfig::default();
    merge_file_config(&mut cfg)?;
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

/// `VMTIDY_*` variables referenced by this build that are currently set.
pub fn active_env_overrides() -> Vec<(String, String)> {
    GENERATED_ENV_ALLOWLIST
        .iter()
        .filter_map(|key| env_non_empty(key).map(|v| (key.to_string(), v)))
        .collect()
}
