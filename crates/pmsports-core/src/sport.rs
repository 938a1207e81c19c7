//! Sport classification by market title.
//!
//! Markets carry no reliable sport tag on the REST feed, so classification is
//! a case-insensitive keyword match on the title.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keywords that mark a market as sports related.
pub const SPORT_KEYWORDS: &[&str] = &[
    "nba",
    "nfl",
    "mlb",
    "soccer",
    "football",
    "basketball",
    "baseball",
];

/// Check whether a market title looks like a sports market.
pub fn is_sports_title(title: &str) -> bool {
    let title = title.to_lowercase();
    SPORT_KEYWORDS.iter().any(|kw| title.contains(kw))
}

/// League served by the per-sport market view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sport {
    Nba,
    Nfl,
    Mlb,
    Nhl,
}

impl Sport {
    pub const ALL: [Sport; 4] = [Sport::Nba, Sport::Nfl, Sport::Mlb, Sport::Nhl];

    /// Lowercase title keywords for this league.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Nba => &["nba", "basketball"],
            Self::Nfl => &["nfl", "football"],
            Self::Mlb => &["mlb", "baseball"],
            Self::Nhl => &["nhl", "hockey"],
        }
    }

    /// Check if a market title belongs to this league.
    pub fn matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.keywords().iter().any(|kw| title.contains(kw))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nba => "NBA",
            Self::Nfl => "NFL",
            Self::Mlb => "MLB",
            Self::Nhl => "NHL",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "NBA" => Ok(Self::Nba),
            "NFL" => Ok(Self::Nfl),
            "MLB" => Ok(Self::Mlb),
            "NHL" => Ok(Self::Nhl),
            _ => Err(CoreError::UnknownSport(s.to_string())),
        }
    }
}
