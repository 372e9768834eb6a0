//! Data sizes such as `10MB` or `512`

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-]?\d+)([a-zA-Z]{0,2})$").expect("data size pattern"));

/// Binary data units; each is 1024 times the previous
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataUnit {
    #[default]
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
    Terabytes,
}

impl DataUnit {
    const ALL: [DataUnit; 5] = [
        DataUnit::Terabytes,
        DataUnit::Gigabytes,
        DataUnit::Megabytes,
        DataUnit::Kilobytes,
        DataUnit::Bytes,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            DataUnit::Bytes => "B",
            DataUnit::Kilobytes => "KB",
            DataUnit::Megabytes => "MB",
            DataUnit::Gigabytes => "GB",
            DataUnit::Terabytes => "TB",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.suffix().eq_ignore_ascii_case(suffix))
    }

    fn bytes(self) -> i64 {
        match self {
            DataUnit::Bytes => 1,
            DataUnit::Kilobytes => 1 << 10,
            DataUnit::Megabytes => 1 << 20,
            DataUnit::Gigabytes => 1 << 30,
            DataUnit::Terabytes => 1 << 40,
        }
    }
}

impl fmt::Display for DataUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A size in bytes. Serializes as the plain byte count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSize {
    bytes: i64,
}

impl DataSize {
    pub const fn of_bytes(bytes: i64) -> Self {
        Self { bytes }
    }

    pub const fn of_kilobytes(kilobytes: i64) -> Self {
        Self::of_bytes(kilobytes << 10)
    }

    pub const fn of_megabytes(megabytes: i64) -> Self {
        Self::of_bytes(megabytes << 20)
    }

    pub const fn of_gigabytes(gigabytes: i64) -> Self {
        Self::of_bytes(gigabytes << 30)
    }

    pub fn of(amount: i64, unit: DataUnit) -> Option<Self> {
        amount.checked_mul(unit.bytes()).map(Self::of_bytes)
    }

    pub fn to_bytes(self) -> i64 {
        self.bytes
    }

    pub fn to_kilobytes(self) -> i64 {
        self.bytes / DataUnit::Kilobytes.bytes()
    }

    pub fn to_megabytes(self) -> i64 {
        self.bytes / DataUnit::Megabytes.bytes()
    }

    pub fn is_negative(self) -> bool {
        self.bytes < 0
    }

    /// Parse `value`, applying `default_unit` (bytes if `None`) to a bare number
    pub fn parse(value: &str, default_unit: Option<DataUnit>) -> Result<Self, String> {
        let value = value.trim();
        let captures = PATTERN
            .captures(value)
            .ok_or_else(|| format!("'{value}' is not a valid data size"))?;
        let amount: i64 = captures[1]
            .trim_start_matches('+')
            .parse()
            .map_err(|_| format!("'{value}' is out of range"))?;
        let unit = match &captures[2] {
            "" => default_unit.unwrap_or_default(),
            suffix => DataUnit::from_suffix(suffix).ok_or_else(|| format!("unknown data unit '{suffix}'"))?,
        };
        Self::of(amount, unit).ok_or_else(|| format!("'{value}' is out of range"))
    }
}

impl FromStr for DataSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        Self::parse(s, None)
    }
}

impl fmt::Display for DataSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes == 0 {
            return f.write_str("0B");
        }
        let unit = DataUnit::ALL
            .into_iter()
            .find(|unit| self.bytes % unit.bytes() == 0)
            .unwrap_or_default();
        write!(f, "{}{}", self.bytes / unit.bytes(), unit.suffix())
    }
}
