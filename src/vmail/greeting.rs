use crate::error::VmailError;
use std::fmt;
use std::str::FromStr;

/// Greeting recordings kept directly under a mailbox root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Greeting {
    Unavail,
    Temp,
    Busy,
    Greet,
}

impl Greeting {
    pub const ALL: [Greeting; 4] = [Self::Unavail, Self::Temp, Self::Busy, Self::Greet];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unavail => "unavail",
            Self::Temp => "temp",
            Self::Busy => "busy",
            Self::Greet => "greet",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.wav", self.as_str())
    }
}

impl fmt::Display for Greeting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Greeting {
    type Err = VmailError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim().trim_end_matches(".wav");
        Self::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| VmailError::GreetingNotFound(raw.to_string()))
    }
}
