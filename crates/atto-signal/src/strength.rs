//! Bounded integer strength.
//!
//! Convention: 10 000 units == 1.0 of confidence. The range is capped at
//! [`MAX_STRENGTH`]; arithmetic saturates at the cap instead of wrapping, so
//! a contact can change at most `MAX_STRENGTH` times across its lifetime.

use thiserror::Error;

/// One full unit of confidence, in strength ticks.
pub const STRENGTH_UNIT: u32 = 10_000;

/// Upper bound of the strength range (100 units of confidence).
pub const MAX_STRENGTH: Strength = Strength(100 * STRENGTH_UNIT);

// Compile-time check that the cap stays a whole number of units.
const _: () = assert!(MAX_STRENGTH.0 % STRENGTH_UNIT == 0);

/// A bounded, non-negative signal strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Strength(u32);

impl Strength {
    /// Zero strength - the state of a contact that has never accepted.
    pub const ZERO: Strength = Strength(0);

    /// Create a strength, clamped into the legal range.
    pub const fn new(raw: u32) -> Self {
        if raw > MAX_STRENGTH.0 {
            MAX_STRENGTH
        } else {
            Strength(raw)
        }
    }

    /// Whole confidence units, clamped.
    pub const fn from_units(units: u32) -> Self {
        Self::new(units.saturating_mul(STRENGTH_UNIT))
    }

    /// Raw tick count.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Add ticks, saturating at [`MAX_STRENGTH`].
    pub const fn saturating_add(self, ticks: u32) -> Self {
        Self::new(self.0.saturating_add(ticks))
    }

    /// Subtract ticks, saturating at zero.
    pub const fn saturating_sub(self, ticks: u32) -> Self {
        Strength(self.0.saturating_sub(ticks))
    }

    /// Remaining headroom below the cap.
    pub const fn headroom(self) -> u32 {
        MAX_STRENGTH.0 - self.0
    }

    /// The smaller of two strengths.
    pub fn min_of(a: Strength, b: Strength) -> Strength {
        if a <= b {
            a
        } else {
            b
        }
    }
}

impl std::fmt::Display for Strength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Render as fractional confidence units: 15000 -> "1.5000"
        write!(f, "{}.{:04}", self.0 / STRENGTH_UNIT, self.0 % STRENGTH_UNIT)
    }
}

/// Failure to parse a strength from text (boot scripts, admin input).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StrengthParseError {
    #[error("not an unsigned integer: {0}")]
    NotAnInteger(String),
    #[error("strength {0} exceeds maximum {max}", max = MAX_STRENGTH.0)]
    OutOfRange(u64),
}

impl std::str::FromStr for Strength {
    type Err = StrengthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s
            .trim()
            .parse()
            .map_err(|_| StrengthParseError::NotAnInteger(s.to_string()))?;
        if raw > MAX_STRENGTH.0 as u64 {
            return Err(StrengthParseError::OutOfRange(raw));
        }
        Ok(Strength(raw as u32))
    }
}
