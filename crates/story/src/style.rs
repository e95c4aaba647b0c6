use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Narrative,
    Screenplay,
    Satirical,
    Epic,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown style '{0}' (expected one of: narrative, screenplay, satirical, epic)")]
pub struct UnknownStyle(pub String);

impl Style {
    pub const ALL: [Style; 4] = [Style::Narrative, Style::Screenplay, Style::Satirical, Style::Epic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Narrative => "narrative",
            Style::Screenplay => "screenplay",
            Style::Satirical => "satirical",
            Style::Epic => "epic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Style::Narrative => "Narrative",
            Style::Screenplay => "Screenplay",
            Style::Satirical => "Satirical",
            Style::Epic => "Epic",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Style::Narrative => "Classic prose with rich descriptions",
            Style::Screenplay => "Film screenplay format with scenes & dialogue",
            Style::Satirical => "Comedic with biting satire and humor",
            Style::Epic => "Grand, mythic style with elevated language",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Style::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStyle(s.to_string()))
    }
}
