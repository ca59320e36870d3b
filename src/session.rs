// src/session.rs

use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Where an instant falls relative to an assessment's window.
///
/// The window is the half-open interval `[opens_at, closes_at)`: an action
/// at exactly `closes_at` is already too late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotYetOpen,
    Open,
    Closed,
}

/// Classifies `now` against the window. `now` is always an explicit argument
/// so callers (and tests) control the clock; handlers pass `Utc::now()` at
/// the moment of the action. Client-supplied timestamps are never consulted.
pub fn phase(now: DateTime<Utc>, opens_at: DateTime<Utc>, closes_at: DateTime<Utc>) -> Phase {
    if now < opens_at {
        Phase::NotYetOpen
    } else if now >= closes_at {
        Phase::Closed
    } else {
        Phase::Open
    }
}

/// Fails with `WindowViolation` unless the window is open at `now`.
/// The two closed phases carry distinct messages for user display only.
pub fn ensure_open(
    now: DateTime<Utc>,
    opens_at: DateTime<Utc>,
    closes_at: DateTime<Utc>,
) -> Result<(), AppError> {
    match phase(now, opens_at, closes_at) {
        Phase::Open => Ok(()),
        Phase::NotYetOpen => Err(AppError::WindowViolation(
            "The assessment has not opened yet".to_string(),
        )),
        Phase::Closed => Err(AppError::WindowViolation(
            "The assessment window has closed".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_phase_before_open() {
        assert_eq!(phase(at(50), at(100), at(200)), Phase::NotYetOpen);
    }

    #[test]
    fn test_phase_open_at_exact_start() {
        // opens_at itself is inside the window
        assert_eq!(phase(at(100), at(100), at(200)), Phase::Open);
    }

    #[test]
    fn test_phase_open_mid_window() {
        assert_eq!(phase(at(150), at(100), at(200)), Phase::Open);
    }

    #[test]
    fn test_phase_closed_at_exact_end() {
        // closes_at is excluded from the window
        assert_eq!(phase(at(200), at(100), at(200)), Phase::Closed);
    }

    #[test]
    fn test_phase_closed_after_end() {
        assert_eq!(phase(at(500), at(100), at(200)), Phase::Closed);
    }

    #[test]
    fn test_ensure_open_rejects_both_closed_phases() {
        assert!(matches!(
            ensure_open(at(50), at(100), at(200)),
            Err(AppError::WindowViolation(_))
        ));
        assert!(matches!(
            ensure_open(at(200), at(100), at(200)),
            Err(AppError::WindowViolation(_))
        ));
        assert!(ensure_open(at(150), at(100), at(200)).is_ok());
    }
}
