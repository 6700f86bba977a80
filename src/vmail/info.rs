use serde::Serialize;

const KEY_CALLERID: &str = "callerid";
const KEY_ORIGDATE: &str = "origdate";
const KEY_DURATION: &str = "duration";

/// The fields of a `msgNNNN.txt` info record that maintenance cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageInfo {
    pub callerid: Option<String>,
    pub origdate: Option<String>,
    pub duration: Option<u64>,
}

impl MessageInfo {
    /// Reads `key=value` lines. Comments (`;`), `[section]` headers, blank
    /// lines and unknown keys are skipped; later duplicates win.
    pub fn parse(text: &str) -> Self {
        let mut out = Self::default();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('[') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                KEY_CALLERID => out.callerid = Some(value.to_string()),
                KEY_ORIGDATE => out.origdate = Some(value.to_string()),
                KEY_DURATION => out.duration = value.parse::<u64>().ok(),
                _ => {}
            }
        }
        out
    }

    pub fn caller_name(&self) -> Option<String> {
        self.callerid.as_deref().and_then(|raw| split_callerid(raw).0)
    }

    pub fn caller_number(&self) -> Option<String> {
        self.callerid.as_deref().and_then(|raw| split_callerid(raw).1)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Splits `"Display Name" <number>` into its name and number halves.
pub fn split_callerid(raw: &str) -> (Option<String>, Option<String>) {
    let raw = raw.trim();
    let (Some(open), Some(close)) = (raw.rfind('<'), raw.rfind('>')) else {
        return (None, non_empty(raw));
    };
    if close < open {
        return (None, non_empty(raw));
    }

    let name = raw[..open].trim().trim_matches('"');
    let number = &raw[open + 1..close];
    (non_empty(name), non_empty(number))
}
