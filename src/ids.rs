//! Canonical class identifiers.
//!
//! Upstream sources disagree on how a class is spelled: the same branch can
//! arrive as `1`, `"1"` or `"CSE"`, a year as `4` or `"4th Year"`. Everything
//! is normalized here, once, at the ingestion boundary; the rest of the crate
//! compares typed ids only.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PortalError, Result};

/// One of the three cascading filter dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Year,
    Branch,
    Section,
}

impl Dimension {
    /// Query-string key used by the roster endpoints.
    pub const fn query_key(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Branch => "branch",
            Self::Section => "section",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_key())
    }
}

macro_rules! class_id {
    ($(#[$meta:meta])* $name:ident, $dimension:expr, $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u8);

        impl $name {
            pub const FIRST: Self = Self(1);
            pub const MAX: u8 = $max;

            pub fn new(value: u8) -> Result<Self> {
                if (1..=Self::MAX).contains(&value) {
                    Ok(Self(value))
                } else {
                    Err(PortalError::InvalidIdentifier {
                        dimension: $dimension,
                        raw: value.to_string(),
                    })
                }
            }

            pub const fn get(self) -> u8 {
                self.0
            }

            /// Every id in the domain, ascending.
            pub fn all() -> impl Iterator<Item = Self> {
                (1..=Self::MAX).map(Self)
            }

            fn from_number(raw: i64) -> Result<Self> {
                u8::try_from(raw)
                    .ok()
                    .and_then(|v| Self::new(v).ok())
                    .ok_or_else(|| PortalError::InvalidIdentifier {
                        dimension: $dimension,
                        raw: raw.to_string(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_u8(self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                match RawId::deserialize(deserializer)? {
                    RawId::Number(n) => Self::from_number(n),
                    RawId::Text(s) => s.parse(),
                }
                .map_err(serde::de::Error::custom)
            }
        }
    };
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

class_id!(
    /// Academic year, 1 through 4.
    YearId,
    Dimension::Year,
    4
);
class_id!(
    /// Branch (department), 1 through 7.
    BranchId,
    Dimension::Branch,
    7
);
class_id!(
    /// Section within a branch, 1 through 3.
    SectionId,
    Dimension::Section,
    3
);

fn invalid(dimension: Dimension, raw: &str) -> PortalError {
    PortalError::InvalidIdentifier {
        dimension,
        raw: raw.to_string(),
    }
}

fn leading_number(raw: &str) -> Option<i64> {
    let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

const BRANCH_CODES: [(&str, u8); 11] = [
    ("CSE", 1),
    ("ECE", 2),
    ("CSM", 3),
    ("CSD", 4),
    ("EEE", 5),
    ("CE", 6),
    ("CV", 6),
    ("CIVIL", 6),
    ("ME", 7),
    ("MECH", 7),
    ("MECHANICAL", 7),
];

impl YearId {
    pub const FINAL: Self = Self(4);

    /// Ordinal label as shown in the dashboards, e.g. `4th Year`.
    pub fn label(self) -> String {
        let suffix = match self.0 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        };
        format!("{}{} Year", self.0, suffix)
    }
}

impl FromStr for YearId {
    type Err = PortalError;

    /// Accepts `4`, `4th Year` and `Year 4`.
    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix("Year ")
            .or_else(|| trimmed.strip_prefix("year "))
            .unwrap_or(trimmed);
        leading_number(body)
            .and_then(|n| Self::from_number(n).ok())
            .ok_or_else(|| invalid(Dimension::Year, raw))
    }
}

impl BranchId {
    /// Short department code, e.g. `CSE`.
    pub fn code(self) -> &'static str {
        match self.0 {
            1 => "CSE",
            2 => "ECE",
            3 => "CSM",
            4 => "CSD",
            5 => "EEE",
            6 => "CE",
            _ => "ME",
        }
    }
}

impl FromStr for BranchId {
    type Err = PortalError;

    /// Accepts numeral strings and department codes, case-insensitively.
    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::from_number(n).map_err(|_| invalid(Dimension::Branch, raw));
        }
        let upper = trimmed.to_ascii_uppercase();
        BRANCH_CODES
            .iter()
            .find(|(code, _)| *code == upper)
            .map(|&(_, id)| Self(id))
            .ok_or_else(|| invalid(Dimension::Branch, raw))
    }
}

impl SectionId {
    /// Section letter, e.g. `A`.
    pub fn letter(self) -> char {
        char::from(b'A' + self.0 - 1)
    }
}

impl FromStr for SectionId {
    type Err = PortalError;

    /// Accepts `2`, `B` and `Section B`.
    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix("Section ")
            .or_else(|| trimmed.strip_prefix("section "))
            .unwrap_or(trimmed);
        if let Ok(n) = body.parse::<i64>() {
            return Self::from_number(n).map_err(|_| invalid(Dimension::Section, raw));
        }
        let mut chars = body.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => {
                let index = c.to_ascii_uppercase() as u8 - b'A' + 1;
                Self::new(index).map_err(|_| invalid(Dimension::Section, raw))
            }
            _ => Err(invalid(Dimension::Section, raw)),
        }
    }
}

/// A filter value on one dimension: either every value, or exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Choice<T> {
    #[default]
    All,
    Only(T),
}

impl<T: Copy + PartialEq> Choice<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn value(&self) -> Option<T> {
        match self {
            Self::All => None,
            Self::Only(v) => Some(*v),
        }
    }

    /// Whether a record carrying `value` passes this filter.
    pub fn admits(&self, value: T) -> bool {
        match self {
            Self::All => true,
            Self::Only(v) => *v == value,
        }
    }
}

impl<T> From<Option<T>> for Choice<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::All, Self::Only)
    }
}

impl<T: fmt::Display> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(v) => v.fmt(f),
        }
    }
}

impl<T: FromStr<Err = PortalError>> FromStr for Choice<T> {
    type Err = PortalError;

    /// `all` (any case) and the empty string both mean no restriction.
    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            trimmed.parse().map(Self::Only)
        }
    }
}

impl<T: fmt::Display> Serialize for Choice<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: FromStr<Err = PortalError>> Deserialize<'de> for Choice<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = match RawId::deserialize(deserializer)? {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        };
        raw.parse().map_err(serde::de::Error::custom)
    }
}
