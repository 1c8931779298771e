//! Minimum-version parsing for crypto library versions
//!
//! Accepts the `MAJOR.MINOR[.FIX[PATCH]]` form administrators write
//! (`1.0.2g`, `1.1`, `1.0.1`) and packs it into the same `MNNFFPPS` layout
//! the runtime library reports as its numeric version, so the two compare
//! with plain integer ordering.
//!
//! The parser is a single pass over bytes with no backtracking. Every digit
//! is checked against an accumulation guard before anything else happens, so
//! an arbitrarily long run of digits is rejected after at most four of them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A component that climbs past this while digits are still arriving is
/// treated as hostile input and rejected on the spot.
pub const COMPONENT_GUARD: u32 = 256;

/// Largest value any component may hold once parsing is complete.
pub const COMPONENT_MAX: u32 = 255;

/// Status nibble for a release build.
pub const STATUS_RELEASE: u32 = 0xF;

/// Position of a field inside a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Major,
    Minor,
    Fix,
    Patch,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Major => "major",
            Component::Minor => "minor",
            Component::Fix => "fix",
            Component::Patch => "patch",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("{component} component too high while parsing")]
    ComponentOverflow { component: Component },

    #[error("too many dot sections")]
    TooManySections,

    #[error("missing a section before the patch letter")]
    MissingSection,

    #[error("unparsable patch level {found:?}")]
    UnparsablePatch { found: char },

    #[error("bad patch section; only a single patch letter may follow the fix number")]
    BadPatchSection,

    #[error("version string is too short; at least MAJOR.MINOR is required")]
    TooShort,

    #[error("{component} component {value} is out of range (max 255)")]
    ComponentOutOfRange { component: Component, value: u32 },
}

/// The section the scanner is currently filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Major,
    Minor,
    Fix,
    /// The patch letter has been consumed; only the end of input may follow.
    Patch,
}

impl Section {
    fn component(self) -> Component {
        match self {
            Section::Major => Component::Major,
            Section::Minor => Component::Minor,
            Section::Fix => Component::Fix,
            Section::Patch => Component::Patch,
        }
    }
}

/// A parsed version, one unsigned field per component plus the status nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionSpec {
    pub major: u32,
    pub minor: u32,
    pub fix: u32,
    /// `a` = 1 through `z` = 26, 0 when no letter was given.
    pub patch: u32,
    pub status: u32,
}

impl VersionSpec {
    /// Parse a configured minimum version.
    ///
    /// Scanning stops at the end of the string or at the first byte that is
    /// not printable ASCII, whichever comes first. The status nibble is always
    /// [`STATUS_RELEASE`]; the grammar has no way to ask for a pre-release.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let mut spec = VersionSpec {
            status: STATUS_RELEASE,
            ..VersionSpec::default()
        };
        let mut section = Section::Major;

        for &byte in input.as_bytes() {
            if !is_printable(byte) {
                break;
            }

            section = match (section, byte) {
                (Section::Major | Section::Minor | Section::Fix, b'0'..=b'9') => {
                    spec.push_digit(section.component(), byte - b'0')?;
                    section
                }
                (Section::Major, b'.') => Section::Minor,
                (Section::Minor, b'.') => Section::Fix,
                (Section::Fix | Section::Patch, b'.') => {
                    return Err(VersionParseError::TooManySections)
                }
                (Section::Major | Section::Minor, _) => {
                    return Err(VersionParseError::MissingSection)
                }
                (Section::Fix, letter) if letter.is_ascii_alphabetic() => {
                    spec.patch = u32::from(letter.to_ascii_lowercase() - b'a') + 1;
                    Section::Patch
                }
                (Section::Fix, other) => {
                    return Err(VersionParseError::UnparsablePatch {
                        found: char::from(other),
                    })
                }
                (Section::Patch, _) => return Err(VersionParseError::BadPatchSection),
            };
        }

        if section == Section::Major {
            return Err(VersionParseError::TooShort);
        }

        for (component, value) in spec.components() {
            if value > COMPONENT_MAX {
                return Err(VersionParseError::ComponentOutOfRange { component, value });
            }
        }

        Ok(spec)
    }

    fn push_digit(&mut self, component: Component, digit: u8) -> Result<(), VersionParseError> {
        let slot = match component {
            Component::Major => &mut self.major,
            Component::Minor => &mut self.minor,
            Component::Fix => &mut self.fix,
            Component::Patch => &mut self.patch,
        };
        // The guard keeps *slot <= 256 between calls, so this cannot overflow.
        *slot = *slot * 10 + u32::from(digit);
        if *slot > COMPONENT_GUARD {
            return Err(VersionParseError::ComponentOverflow { component });
        }
        Ok(())
    }

    /// The four numeric components in significance order.
    pub fn components(&self) -> [(Component, u32); 4] {
        [
            (Component::Major, self.major),
            (Component::Minor, self.minor),
            (Component::Fix, self.fix),
            (Component::Patch, self.patch),
        ]
    }

    /// Pack into `MNNFFPPS` order: major, minor, fix and patch bytes, then
    /// the status nibble.
    pub fn pack(&self) -> PackedVersion {
        PackedVersion(
            (u64::from(self.major & 0xFF) << 28)
                | (u64::from(self.minor & 0xFF) << 20)
                | (u64::from(self.fix & 0xFF) << 12)
                | (u64::from(self.patch & 0xFF) << 4)
                | u64::from(self.status & 0x0F),
        )
    }
}

impl FromStr for VersionSpec {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionSpec::parse(s)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.fix)?;
        match self.patch {
            0 => {}
            p @ 1..=26 => write!(f, "{}", char::from(b'a' + (p - 1) as u8))?,
            p => write!(f, "+{p}")?,
        }
        match self.status {
            STATUS_RELEASE => Ok(()),
            0 => f.write_str("-dev"),
            n => write!(f, "-beta{n}"),
        }
    }
}

/// A version in packed integer form.
///
/// The field layout matches the 32-bit number crypto runtimes report. It is
/// stored as a `u64` so a major above 15 keeps its high bits instead of
/// wrapping, which keeps ordering monotone for every accepted component.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PackedVersion(u64);

impl PackedVersion {
    pub const fn new(raw: u64) -> Self {
        PackedVersion(raw)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The classic 32-bit form, if the major fits in a nibble.
    /// Comparisons against the runtime still happen on the full `u64`.
    pub fn as_u32(&self) -> Option<u32> {
        u32::try_from(self.0).ok()
    }

    /// Split back into components.
    pub fn decode(&self) -> VersionSpec {
        let v = self.0;
        VersionSpec {
            major: ((v >> 28) & 0xFF) as u32,
            minor: ((v >> 20) & 0xFF) as u32,
            fix: ((v >> 12) & 0xFF) as u32,
            patch: ((v >> 4) & 0xFF) as u32,
            status: (v & 0x0F) as u32,
        }
    }

    pub fn is_release(&self) -> bool {
        self.0 & 0x0F == u64::from(STATUS_RELEASE)
    }
}

impl From<u32> for PackedVersion {
    fn from(raw: u32) -> Self {
        PackedVersion(u64::from(raw))
    }
}

impl fmt::Display for PackedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#010x})", self.decode(), self.0)
    }
}

impl fmt::LowerHex for PackedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Parse a configured minimum straight to its packed form.
pub fn parse_minimum_version(input: &str) -> Result<PackedVersion, VersionParseError> {
    VersionSpec::parse(input).map(|spec| spec.pack())
}

fn is_printable(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(input: &str) -> u64 {
        parse_minimum_version(input)
            .unwrap_or_else(|e| panic!("{input:?} should parse: {e}"))
            .value()
    }

    #[test]
    fn test_matches_runtime_numbers() {
        assert_eq!(packed("1.0.2h"), 0x1000_208f);
        assert_eq!(packed("1.0.1g"), 0x1000_107f);
        assert_eq!(packed("0.9.8"), 0x0090_800f);
        assert_eq!(packed("1.1.1"), 0x1010_100f);
    }

    #[test]
    fn test_short_forms_default_to_zero() {
        let spec = VersionSpec::parse("1.1").unwrap();
        assert_eq!((spec.major, spec.minor, spec.fix, spec.patch), (1, 1, 0, 0));
        assert_eq!(spec.status, STATUS_RELEASE);

        assert_eq!(packed("1.1."), packed("1.1"));
        assert_eq!(packed("1..2"), packed("1.0.2"));
    }

    #[test]
    fn test_patch_letter_is_case_insensitive() {
        assert_eq!(packed("1.0.2G"), packed("1.0.2g"));
        assert_eq!(VersionSpec::parse("1.0.2z").unwrap().patch, 26);
        assert_eq!(VersionSpec::parse("1.0.2a").unwrap().patch, 1);
        // The fix number may be left empty before the letter.
        assert_eq!(VersionSpec::parse("1.0.b").unwrap().patch, 2);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(VersionSpec::parse(""), Err(VersionParseError::TooShort));
        assert_eq!(VersionSpec::parse("1"), Err(VersionParseError::TooShort));
        assert_eq!(VersionSpec::parse("255"), Err(VersionParseError::TooShort));
    }

    #[test]
    fn test_section_errors() {
        assert_eq!(
            VersionSpec::parse("1.2.3.4"),
            Err(VersionParseError::TooManySections)
        );
        assert_eq!(
            VersionSpec::parse("1.0.2g."),
            Err(VersionParseError::TooManySections)
        );
        assert_eq!(VersionSpec::parse("1.2a"), Err(VersionParseError::MissingSection));
        assert_eq!(VersionSpec::parse("1a"), Err(VersionParseError::MissingSection));
        assert_eq!(VersionSpec::parse("1 .2"), Err(VersionParseError::MissingSection));
    }

    #[test]
    fn test_patch_errors() {
        assert_eq!(
            VersionSpec::parse("1.2.3-"),
            Err(VersionParseError::UnparsablePatch { found: '-' })
        );
        assert_eq!(
            VersionSpec::parse("1.2.3 "),
            Err(VersionParseError::UnparsablePatch { found: ' ' })
        );
        assert_eq!(
            VersionSpec::parse("1.2.3ab"),
            Err(VersionParseError::BadPatchSection)
        );
        assert_eq!(
            VersionSpec::parse("1.2.3a4"),
            Err(VersionParseError::BadPatchSection)
        );
    }

    #[test]
    fn test_guard_and_range_check() {
        // 255 is the largest accepted value.
        assert_eq!(VersionSpec::parse("255.255.255").unwrap().fix, 255);

        // 256 slips past the accumulation guard and is caught by the range check.
        assert_eq!(
            VersionSpec::parse("256.0"),
            Err(VersionParseError::ComponentOutOfRange {
                component: Component::Major,
                value: 256
            })
        );
        assert_eq!(
            VersionSpec::parse("1.0.256"),
            Err(VersionParseError::ComponentOutOfRange {
                component: Component::Fix,
                value: 256
            })
        );

        // Anything above 256 never reaches the range check.
        assert_eq!(
            VersionSpec::parse("257.0"),
            Err(VersionParseError::ComponentOverflow {
                component: Component::Major
            })
        );
        assert_eq!(
            VersionSpec::parse("1.2560"),
            Err(VersionParseError::ComponentOverflow {
                component: Component::Minor
            })
        );
    }

    #[test]
    fn test_long_digit_runs_fail_early() {
        let attack = format!("1.{}", "9".repeat(10_000));
        assert_eq!(
            VersionSpec::parse(&attack),
            Err(VersionParseError::ComponentOverflow {
                component: Component::Minor
            })
        );
    }

    #[test]
    fn test_leading_zeros_do_not_trip_the_guard() {
        assert_eq!(packed("0001.0000000.0002"), packed("1.0.2"));
    }

    #[test]
    fn test_scan_stops_at_non_printable() {
        assert_eq!(packed("1.0.2g\0garbage"), packed("1.0.2g"));
        assert_eq!(packed("1.1\n"), packed("1.1"));
        assert_eq!(VersionSpec::parse("1\0.2"), Err(VersionParseError::TooShort));
        // Non-ASCII counts as non-printable too.
        assert_eq!(packed("1.0.2é"), packed("1.0.2"));
    }

    #[test]
    fn test_decode_and_display() {
        let packed = PackedVersion::from(0x1000_208f_u32);
        let spec = packed.decode();
        assert_eq!(spec.to_string(), "1.0.2h");
        assert!(packed.is_release());
        assert_eq!(packed.to_string(), "1.0.2h (0x1000208f)");
        assert_eq!(format!("{packed:x}"), "1000208f");

        assert_eq!(PackedVersion::new(0x1010_0000).decode().to_string(), "1.1.0-dev");
        assert_eq!(PackedVersion::new(0x1010_0003).decode().to_string(), "1.1.0-beta3");
    }

    #[test]
    fn test_large_major_does_not_wrap() {
        let high = parse_minimum_version("16.0").unwrap();
        let low = parse_minimum_version("15.255.255z").unwrap();
        assert!(high > low);
        assert_eq!(high.as_u32(), None);
        assert_eq!(low.as_u32(), Some(0xFFFF_F1AF));
        assert_eq!(high.decode().major, 16);
    }
}
