// build_date.rs
// Purpose: Parse the crypto library's self-reported build timestamp into a comparable value

use chrono::format::{parse, ParseErrorKind, Parsed, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Prefix the runtime library puts in front of its build date.
pub const BUILT_ON_PREFIX: &str = "built on: ";

/// Length of `Mon Apr  7 15:08:30 PDT 2014`.
pub const BUILD_DATE_LEN: usize = 28;

const DAY_TENS: usize = 8;
const DAY_UNITS: usize = 9;
const SECONDS_END: usize = 18;
const TZ_START: usize = 20;
const TZ_END: usize = 23;
const YEAR_START: usize = 24;

/// Stands in for whatever timezone abbreviation the library printed.
const TZ_FILLER: &[u8; 3] = b"---";

/// Layout of the neutralized string. The day has already been zero-padded.
const NEUTRAL_LAYOUT: &str = "%a %b %d %H:%M:%S --- %Y";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildDateParseError {
    #[error("build date of {len} bytes is too short to carry the \"built on: \" prefix")]
    TooShortForPrefix { len: usize },

    #[error("build date does not start with \"built on: \"")]
    BadPrefix,

    #[error("build date is {len} bytes long, expected exactly 28")]
    WrongLength { len: usize },

    #[error("build date day-of-month is not laid out as a space-padded number")]
    BadDayLayout,

    #[error("build date timezone is not a three-character token between the time and the year")]
    BadTimezoneLayout,

    #[error("build date could not be parsed: {reason}")]
    Unparsable { reason: String },

    #[error("build date has trailing characters")]
    TrailingCharacters,

    #[error("build date does not name a real moment in time: {reason}")]
    DateConversion { reason: String },
}

/// A build timestamp, seconds since the Unix epoch with the reported
/// timezone discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildDate {
    timestamp: i64,
}

impl BuildDate {
    /// Parse a build date, optionally stripping the `built on: ` prefix first.
    ///
    /// The caller's string is never modified; the timezone token is blanked
    /// out in a private copy before the fixed layout is parsed.
    pub fn parse(input: &str, strip_prefix: bool) -> Result<Self, BuildDateParseError> {
        let body = if strip_prefix {
            strip_built_on(input)?
        } else {
            input
        };

        if body.len() != BUILD_DATE_LEN {
            return Err(BuildDateParseError::WrongLength { len: body.len() });
        }

        let mut scratch = body.as_bytes().to_vec();
        normalize_day(&mut scratch)?;
        neutralize_timezone(&mut scratch)?;
        let neutral = String::from_utf8(scratch).map_err(|e| BuildDateParseError::Unparsable {
            reason: e.to_string(),
        })?;

        let mut parsed = Parsed::new();
        parse(&mut parsed, &neutral, StrftimeItems::new(NEUTRAL_LAYOUT)).map_err(|e| {
            match e.kind() {
                ParseErrorKind::TooLong => BuildDateParseError::TrailingCharacters,
                _ => BuildDateParseError::Unparsable {
                    reason: e.to_string(),
                },
            }
        })?;

        let naive = parsed
            .to_naive_datetime_with_offset(0)
            .map_err(|e| BuildDateParseError::DateConversion {
                reason: e.to_string(),
            })?;

        Ok(BuildDate {
            timestamp: naive.and_utc().timestamp(),
        })
    }

    pub fn from_timestamp(timestamp: i64) -> Self {
        BuildDate { timestamp }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

impl fmt::Display for BuildDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%a %b %e %H:%M:%S %Y UTC")),
            None => write!(f, "@{}", self.timestamp),
        }
    }
}

fn strip_built_on(input: &str) -> Result<&str, BuildDateParseError> {
    if input.len() <= BUILT_ON_PREFIX.len() {
        return Err(BuildDateParseError::TooShortForPrefix { len: input.len() });
    }
    input
        .strip_prefix(BUILT_ON_PREFIX)
        .ok_or(BuildDateParseError::BadPrefix)
}

/// `Apr  7` and `Apr 17` are both legal; rewrite the first into `Apr 07`.
fn normalize_day(scratch: &mut [u8]) -> Result<(), BuildDateParseError> {
    let tens = scratch[DAY_TENS];
    if !(tens == b' ' || tens.is_ascii_digit()) || !scratch[DAY_UNITS].is_ascii_digit() {
        return Err(BuildDateParseError::BadDayLayout);
    }
    if tens == b' ' {
        scratch[DAY_TENS] = b'0';
    }
    Ok(())
}

fn neutralize_timezone(scratch: &mut [u8]) -> Result<(), BuildDateParseError> {
    let layout_ok = scratch[SECONDS_END].is_ascii_digit()
        && scratch[TZ_START - 1].is_ascii_whitespace()
        && scratch[TZ_END].is_ascii_whitespace()
        && scratch[YEAR_START].is_ascii_digit();
    if !layout_ok {
        return Err(BuildDateParseError::BadTimezoneLayout);
    }
    scratch[TZ_START..TZ_END].copy_from_slice(TZ_FILLER);
    Ok(())
}
