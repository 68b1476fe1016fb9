//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The confidence value was out of range.
    #[error("confidence must be between 0.0 and 1.0, got {value}")]
    ConfidenceOutOfRange { value: f32 },
}

/// A confidence score in the range \[0.0, 1.0\].
///
/// Reported by the clause-matching collaborator alongside each verdict.
/// Values are clamped during deserialization to be lenient with external
/// data.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Confidence(f32);

impl Confidence {
    /// The maximum confidence value (1.0).
    pub const MAX: Self = Self(1.0);

    /// The minimum confidence value (0.0).
    pub const MIN: Self = Self(0.0);

    /// Creates a new confidence value after validation.
    ///
    /// Returns an error if the value is outside \[0.0, 1.0\] or is NaN.
    pub fn new(value: f32) -> Result<Self, ValidationError> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::ConfidenceOutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Creates a confidence value, clamping to \[0.0, 1.0\].
    ///
    /// NaN values become 0.0. Values outside the range are clamped.
    #[must_use]
    pub const fn clamped(value: f32) -> Self {
        if value.is_nan() || value < 0.0 {
            Self(0.0)
        } else if value > 1.0 {
            Self(1.0)
        } else {
            Self(value)
        }
    }

    /// Returns the inner f32 value.
    #[must_use]
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<f32> for Confidence {
    type Error = ValidationError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f32 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

impl Serialize for Confidence {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f32::deserialize(deserializer)?;
        // Clamp on deserialization to be lenient with external data
        Ok(Self::clamped(value))
    }
}
