// View models
// Layout and detail level selections shared by config, drawer and UI

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named layout strategy for a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Compact,
    Proportional,
    Room,
    Poster,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 4] = [
        LayoutKind::Compact,
        LayoutKind::Proportional,
        LayoutKind::Room,
        LayoutKind::Poster,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LayoutKind::Compact => "Compact",
            LayoutKind::Proportional => "Proportional",
            LayoutKind::Room => "By room",
            LayoutKind::Poster => "Poster",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayoutKind::Compact => "compact",
            LayoutKind::Proportional => "proportional",
            LayoutKind::Room => "room",
            LayoutKind::Poster => "poster",
        };
        f.write_str(name)
    }
}

impl FromStr for LayoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(LayoutKind::Compact),
            "proportional" => Ok(LayoutKind::Proportional),
            "room" => Ok(LayoutKind::Room),
            "poster" => Ok(LayoutKind::Poster),
            other => Err(format!("Unknown layout: {}", other)),
        }
    }
}

/// Whether sessions are drawn as single blocks or flattened into their contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    #[default]
    Session,
    Contribution,
}

impl DetailLevel {
    pub fn label(&self) -> &'static str {
        match self {
            DetailLevel::Session => "Sessions",
            DetailLevel::Contribution => "Contributions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewType {
    #[default]
    Timetable,
    Bookings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_kind_parse_round_trip() {
        for kind in LayoutKind::ALL {
            assert_eq!(kind.to_string().parse::<LayoutKind>().unwrap(), kind);
        }
        assert!("columns".parse::<LayoutKind>().is_err());
    }
}
