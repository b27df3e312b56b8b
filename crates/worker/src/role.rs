//! Which runtimes this process runs

use std::fmt;
use std::str::FromStr;

/// Process role selected by `SWS_ROLE`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    Decider,
    Activity,
    #[default]
    Both,
}

impl Role {
    /// Read `SWS_ROLE`, defaulting to [`Role::Both`] when unset
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var("SWS_ROLE") {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::default()),
        }
    }

    pub fn runs_decider(self) -> bool {
        matches!(self, Self::Decider | Self::Both)
    }

    pub fn runs_activities(self) -> bool {
        matches!(self, Self::Activity | Self::Both)
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decider" => Ok(Self::Decider),
            "activity" => Ok(Self::Activity),
            "both" => Ok(Self::Both),
            other => anyhow::bail!("unknown SWS_ROLE {other:?}, expected decider, activity or both"),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decider => "decider",
            Self::Activity => "activity",
            Self::Both => "both",
        };
        f.write_str(name)
    }
}
