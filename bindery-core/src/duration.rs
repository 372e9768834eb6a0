//! Duration literals: simple (`10s`, `500ms`) and ISO-8601 (`PT10S`)

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::time::Duration;

static SIMPLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-]?\d+)([a-zA-Z]{0,2})$").expect("simple duration pattern"));

static ISO_8601: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+]?[pP](?:(\d+)[dD])?(?:[tT](?:(\d+)[hH])?(?:(\d+)[mM])?(?:(\d+)(?:[.,](\d{1,9}))?[sS])?)?$")
        .expect("iso-8601 duration pattern")
});

/// Unit applied to a bare number, and the suffixes accepted in simple style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DurationUnit {
    Nanos,
    Micros,
    #[default]
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    const ALL: [DurationUnit; 7] = [
        DurationUnit::Days,
        DurationUnit::Hours,
        DurationUnit::Minutes,
        DurationUnit::Seconds,
        DurationUnit::Millis,
        DurationUnit::Micros,
        DurationUnit::Nanos,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            DurationUnit::Nanos => "ns",
            DurationUnit::Micros => "us",
            DurationUnit::Millis => "ms",
            DurationUnit::Seconds => "s",
            DurationUnit::Minutes => "m",
            DurationUnit::Hours => "h",
            DurationUnit::Days => "d",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.suffix().eq_ignore_ascii_case(suffix))
    }

    fn nanos(self) -> u128 {
        match self {
            DurationUnit::Nanos => 1,
            DurationUnit::Micros => 1_000,
            DurationUnit::Millis => 1_000_000,
            DurationUnit::Seconds => 1_000_000_000,
            DurationUnit::Minutes => 60 * 1_000_000_000,
            DurationUnit::Hours => 3_600 * 1_000_000_000,
            DurationUnit::Days => 86_400 * 1_000_000_000,
        }
    }

    /// `amount` of this unit, or `None` on overflow
    pub fn to_duration(self, amount: u64) -> Option<Duration> {
        from_nanos(u128::from(amount).checked_mul(self.nanos())?)
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

fn from_nanos(nanos: u128) -> Option<Duration> {
    let secs = u64::try_from(nanos / 1_000_000_000).ok()?;
    Some(Duration::new(secs, (nanos % 1_000_000_000) as u32))
}

/// The textual styles a duration may be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationStyle {
    /// `10s`, `500ms`, or a bare number in the default unit
    Simple,
    /// `PT10S`, `P1DT2H30M`
    Iso8601,
}

impl DurationStyle {
    pub fn detect(value: &str) -> Option<Self> {
        if SIMPLE.is_match(value) {
            Some(DurationStyle::Simple)
        } else if ISO_8601.is_match(value) {
            Some(DurationStyle::Iso8601)
        } else {
            None
        }
    }

    /// Parse a duration in whichever style `value` is written in
    pub fn parse_any(value: &str, unit: Option<DurationUnit>) -> Result<Duration, String> {
        let value = value.trim();
        match Self::detect(value) {
            Some(style) => style.parse(value, unit),
            None => Err(format!("'{value}' is not a valid duration")),
        }
    }

    pub fn parse(self, value: &str, unit: Option<DurationUnit>) -> Result<Duration, String> {
        match self {
            DurationStyle::Simple => parse_simple(value, unit.unwrap_or_default()),
            DurationStyle::Iso8601 => parse_iso(value),
        }
    }

    pub fn print(self, duration: Duration) -> String {
        match self {
            DurationStyle::Simple => print_simple(duration),
            DurationStyle::Iso8601 => print_iso(duration),
        }
    }
}

fn parse_simple(value: &str, default_unit: DurationUnit) -> Result<Duration, String> {
    let captures = SIMPLE
        .captures(value)
        .ok_or_else(|| format!("'{value}' is not a valid simple duration"))?;
    let amount = &captures[1];
    if amount.starts_with('-') {
        return Err(format!("'{value}' is negative"));
    }
    let amount: u64 = amount
        .trim_start_matches('+')
        .parse()
        .map_err(|_| format!("'{value}' is out of range"))?;
    let unit = match &captures[2] {
        "" => default_unit,
        suffix => DurationUnit::from_suffix(suffix).ok_or_else(|| format!("unknown duration unit '{suffix}'"))?,
    };
    unit.to_duration(amount)
        .ok_or_else(|| format!("'{value}' is out of range"))
}

fn parse_iso(value: &str) -> Result<Duration, String> {
    let captures = ISO_8601
        .captures(value)
        .ok_or_else(|| format!("'{value}' is not a valid ISO-8601 duration"))?;
    if captures.iter().skip(1).all(|c| c.is_none()) {
        return Err(format!("'{value}' has no duration components"));
    }
    let component = |index: usize| -> Result<u64, String> {
        captures
            .get(index)
            .map_or(Ok(0), |m| m.as_str().parse().map_err(|_| format!("'{value}' is out of range")))
    };
    let fraction = captures.get(5).map_or(0u32, |m| {
        let digits = m.as_str();
        let padded = format!("{digits:0<9}");
        padded.parse().unwrap_or(0)
    });
    let total = [
        (component(1)?, DurationUnit::Days),
        (component(2)?, DurationUnit::Hours),
        (component(3)?, DurationUnit::Minutes),
        (component(4)?, DurationUnit::Seconds),
    ]
    .into_iter()
    .try_fold(u128::from(fraction), |acc, (amount, unit)| {
        u128::from(amount).checked_mul(unit.nanos())?.checked_add(acc)
    })
    .and_then(from_nanos);
    total.ok_or_else(|| format!("'{value}' is out of range"))
}

fn print_simple(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0ms".to_string();
    }
    DurationUnit::ALL
        .into_iter()
        .find(|unit| nanos % unit.nanos() == 0)
        .map(|unit| format!("{}{}", nanos / unit.nanos(), unit.suffix()))
        .unwrap_or_else(|| format!("{nanos}ns"))
}

fn print_iso(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);
    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    let nanos = duration.subsec_nanos();
    if seconds > 0 || nanos > 0 || out.len() == 2 {
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            out.push_str(&format!("{seconds}.{}S", fraction.trim_end_matches('0')));
        } else {
            out.push_str(&format!("{seconds}S"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_durations() {
        assert_eq!(DurationStyle::parse_any("10s", None).unwrap(), Duration::from_secs(10));
        assert_eq!(DurationStyle::parse_any("500ms", None).unwrap(), Duration::from_millis(500));
        assert_eq!(DurationStyle::parse_any("2H", None).unwrap(), Duration::from_secs(7_200));
        assert_eq!(DurationStyle::parse_any("1d", None).unwrap(), Duration::from_secs(86_400));
        assert_eq!(DurationStyle::parse_any("15us", None).unwrap(), Duration::from_micros(15));
    }

    #[test]
    fn test_bare_number_uses_unit() {
        assert_eq!(DurationStyle::parse_any("250", None).unwrap(), Duration::from_millis(250));
        assert_eq!(
            DurationStyle::parse_any("3", Some(DurationUnit::Minutes)).unwrap(),
            Duration::from_secs(180)
        );
    }

    #[test]
    fn test_iso_durations() {
        assert_eq!(DurationStyle::parse_any("PT10S", None).unwrap(), Duration::from_secs(10));
        assert_eq!(DurationStyle::parse_any("P1DT2H30M", None).unwrap(), Duration::from_secs(95_400));
        assert_eq!(DurationStyle::parse_any("PT0.5S", None).unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_durations() {
        for value in ["10x", "ten seconds", "-5s", "P", "PT", "1.5s"] {
            assert!(DurationStyle::parse_any(value, None).is_err(), "{value} should not parse");
        }
    }

    #[test]
    fn test_print() {
        assert_eq!(DurationStyle::Simple.print(Duration::from_secs(30)), "30s");
        assert_eq!(DurationStyle::Simple.print(Duration::from_millis(1_500)), "1500ms");
        assert_eq!(DurationStyle::Simple.print(Duration::from_secs(7_200)), "2h");
        assert_eq!(DurationStyle::Iso8601.print(Duration::from_secs(5_430)), "PT1H30M30S");
        assert_eq!(DurationStyle::Iso8601.print(Duration::ZERO), "PT0S");
    }
}
