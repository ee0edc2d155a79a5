//! Range checks for server settings.
//!
//! Every field is checked and all failures are reported together, so a user
//! fixing a settings file sees every problem at once.

use thiserror::Error;

use crate::settings::ServerSettings;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Field value out of range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Settings field name.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Supported sample rates in Hz.
pub const SAMPLE_RATE_RANGE: (u32, u32) = (8_000, 384_000);
/// Supported block sizes in samples.
pub const BUFFER_SIZE_RANGE: (usize, usize) = (1, 16_384);
/// Supported output channel counts.
pub const CHANNEL_RANGE: (usize, usize) = (1, 64);
/// Supported crossfade times in seconds.
pub const FADE_TIME_RANGE: (f32, f32) = (0.0, 60.0);

fn check(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: f64,
    (min, max): (f64, f64),
) {
    // NaN fails both comparisons, so test for containment.
    if !(min..=max).contains(&value) {
        errors.push(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
}

/// Check every field of `settings`.
pub fn validate_settings(settings: &ServerSettings) -> ValidationResult<()> {
    let mut errors = Vec::new();
    check(
        &mut errors,
        "sample_rate",
        f64::from(settings.sample_rate),
        (f64::from(SAMPLE_RATE_RANGE.0), f64::from(SAMPLE_RATE_RANGE.1)),
    );
    check(
        &mut errors,
        "buffer_size",
        settings.buffer_size as f64,
        (BUFFER_SIZE_RANGE.0 as f64, BUFFER_SIZE_RANGE.1 as f64),
    );
    check(
        &mut errors,
        "channels",
        settings.channels as f64,
        (CHANNEL_RANGE.0 as f64, CHANNEL_RANGE.1 as f64),
    );
    check(
        &mut errors,
        "fade_time",
        f64::from(settings.fade_time),
        (f64::from(FADE_TIME_RANGE.0), f64::from(FADE_TIME_RANGE.1)),
    );

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
