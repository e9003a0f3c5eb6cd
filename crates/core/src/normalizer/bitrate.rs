//! Bitrate parsing and repair.
//!
//! Clients routinely send malformed bitrate strings ("2Mk", "2000kk",
//! "1000K"). Rather than reject them, repair runs a fixed sequence of
//! corrections and falls back to a safe default when nothing salvageable
//! remains. Repair is pure: the same input always yields the same output.

use std::fmt;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Bitrate magnitude unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitrateUnit {
    /// Kilobits per second ("k" suffix)
    Kilo,
    /// Megabits per second ("M" suffix)
    Mega,
}

impl BitrateUnit {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Kilo => "k",
            Self::Mega => "M",
        }
    }
}

/// A validated bitrate: positive magnitude plus unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitrateSpec {
    pub magnitude: u64,
    pub unit: BitrateUnit,
}

impl BitrateSpec {
    /// Fallback applied when a video bitrate cannot be repaired.
    pub const DEFAULT_VIDEO: Self = Self {
        magnitude: 1000,
        unit: BitrateUnit::Kilo,
    };

    /// Fallback applied when an audio bitrate cannot be repaired.
    pub const DEFAULT_AUDIO: Self = Self {
        magnitude: 192,
        unit: BitrateUnit::Kilo,
    };

    pub fn new(magnitude: u64, unit: BitrateUnit) -> Self {
        Self { magnitude, unit }
    }

    /// Parses a well-formed bitrate: digits followed by a single `k` or `M`
    /// suffix (case-sensitive). Zero magnitude is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let re = Regex::new(r"^(\d+)(k|M)$").ok()?;
        let caps = re.captures(raw)?;
        let magnitude: u64 = caps.get(1)?.as_str().parse().ok()?;
        if magnitude == 0 {
            return None;
        }
        let unit = match caps.get(2)?.as_str() {
            "k" => BitrateUnit::Kilo,
            "M" => BitrateUnit::Mega,
            _ => return None,
        };
        Some(Self { magnitude, unit })
    }

    /// Repairs a malformed bitrate string, applying corrections in order:
    ///
    /// 1. trim surrounding whitespace
    /// 2. collapse a doubled suffix (`2Mk` -> `2M`, `2000kk` -> `2000k`)
    /// 3. canonicalize suffix case (`K` -> `k`, `m` -> `M`)
    ///
    /// Returns `None` when the result still does not parse.
    pub fn repair(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let collapsed = collapse_doubled_suffix(trimmed);
        let canonical = canonicalize_suffix_case(&collapsed);
        Self::parse(&canonical)
    }

    /// Repairs a bitrate string, falling back to `default` when repair fails.
    pub fn repair_or(raw: &str, default: Self) -> Self {
        Self::repair(raw).unwrap_or(default)
    }

    /// Renders the bitrate as an ffmpeg argument value, e.g. `1000k`.
    pub fn to_arg(&self) -> String {
        format!("{}{}", self.magnitude, self.unit.suffix())
    }
}

impl fmt::Display for BitrateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.suffix())
    }
}

/// `<digits>Mk` keeps the `M`; `<digits>kk` keeps a single `k`.
/// Case-insensitive on the doubled tail.
fn collapse_doubled_suffix(raw: &str) -> String {
    let mk = Regex::new(r"^(?i)(\d+)mk$").ok();
    if let Some(re) = mk {
        if let Some(caps) = re.captures(raw) {
            if let Some(digits) = caps.get(1) {
                return format!("{}M", digits.as_str());
            }
        }
    }
    let kk = Regex::new(r"^(?i)(\d+)kk$").ok();
    if let Some(re) = kk {
        if let Some(caps) = re.captures(raw) {
            if let Some(digits) = caps.get(1) {
                return format!("{}k", digits.as_str());
            }
        }
    }
    raw.to_string()
}

/// Normalizes suffix case on a `<digits><letter>` candidate: `K` becomes
/// `k`, `m` becomes `M`. Anything else passes through untouched.
fn canonicalize_suffix_case(raw: &str) -> String {
    let re = match Regex::new(r"^(\d+)([kKmM])$") {
        Ok(re) => re,
        Err(_) => return raw.to_string(),
    };
    match re.captures(raw) {
        Some(caps) => {
            let digits = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let suffix = match caps.get(2).map(|m| m.as_str()) {
                Some("k") | Some("K") => "k",
                Some("m") | Some("M") => "M",
                _ => return raw.to_string(),
            };
            format!("{}{}", digits, suffix)
        }
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(
            BitrateSpec::parse("1000k"),
            Some(BitrateSpec::new(1000, BitrateUnit::Kilo))
        );
        assert_eq!(
            BitrateSpec::parse("2M"),
            Some(BitrateSpec::new(2, BitrateUnit::Mega))
        );
    }

    #[test]
    fn test_parse_rejects_zero() {
        assert_eq!(BitrateSpec::parse("0k"), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(BitrateSpec::parse("abc"), None);
        assert_eq!(BitrateSpec::parse(""), None);
        assert_eq!(BitrateSpec::parse("1000"), None);
        assert_eq!(BitrateSpec::parse("k1000"), None);
        assert_eq!(BitrateSpec::parse("10.5k"), None);
    }

    #[test]
    fn test_repair_passes_valid_through() {
        assert_eq!(
            BitrateSpec::repair("1000k"),
            Some(BitrateSpec::new(1000, BitrateUnit::Kilo))
        );
        assert_eq!(
            BitrateSpec::repair("2M"),
            Some(BitrateSpec::new(2, BitrateUnit::Mega))
        );
    }

    #[test]
    fn test_repair_collapses_doubled_suffix() {
        assert_eq!(
            BitrateSpec::repair("2Mk"),
            Some(BitrateSpec::new(2, BitrateUnit::Mega))
        );
        assert_eq!(
            BitrateSpec::repair("2000kk"),
            Some(BitrateSpec::new(2000, BitrateUnit::Kilo))
        );
    }

    #[test]
    fn test_repair_canonicalizes_case() {
        assert_eq!(
            BitrateSpec::repair("1000K"),
            Some(BitrateSpec::new(1000, BitrateUnit::Kilo))
        );
        assert_eq!(
            BitrateSpec::repair("2m"),
            Some(BitrateSpec::new(2, BitrateUnit::Mega))
        );
    }

    #[test]
    fn test_repair_trims_whitespace() {
        assert_eq!(
            BitrateSpec::repair("  192k "),
            Some(BitrateSpec::new(192, BitrateUnit::Kilo))
        );
    }

    #[test]
    fn test_repair_unsalvageable() {
        assert_eq!(BitrateSpec::repair("fast"), None);
        assert_eq!(BitrateSpec::repair("2MM"), None);
        assert_eq!(BitrateSpec::repair("kMk"), None);
    }

    #[test]
    fn test_repair_or_falls_back() {
        assert_eq!(
            BitrateSpec::repair_or("garbage", BitrateSpec::DEFAULT_VIDEO),
            BitrateSpec::new(1000, BitrateUnit::Kilo)
        );
        assert_eq!(
            BitrateSpec::repair_or("nope", BitrateSpec::DEFAULT_AUDIO),
            BitrateSpec::new(192, BitrateUnit::Kilo)
        );
    }

    #[test]
    fn test_repair_is_deterministic() {
        for raw in ["2Mk", "2000kk", "1000K", "2m", "junk"] {
            assert_eq!(BitrateSpec::repair(raw), BitrateSpec::repair(raw));
        }
    }

    #[test]
    fn test_to_arg() {
        assert_eq!(BitrateSpec::new(1000, BitrateUnit::Kilo).to_arg(), "1000k");
        assert_eq!(BitrateSpec::new(2, BitrateUnit::Mega).to_arg(), "2M");
    }
}
