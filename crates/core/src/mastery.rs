use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MasteryError {
    #[error("invalid mastery level: {0}")]
    InvalidLevel(String),
}

//
// ─── MASTERY LEVEL ─────────────────────────────────────────────────────────────
//

/// Coarse classification of a user's command of one flashcard.
///
/// Levels are ordered and monotonic in both accuracy and attempt volume.
/// A level is never carried forward incrementally: every recorded attempt
/// re-evaluates the tier from the running counters, so it can rise and
/// fall with the user's accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryLevel {
    /// Default tier; also the result of fewer than 3 total attempts.
    Beginner,
    /// Accuracy >= 50% with at least 3 attempts.
    Intermediate,
    /// Accuracy >= 75% with at least 5 attempts.
    Advanced,
    /// Accuracy >= 90% with at least 10 attempts.
    Mastered,
}

impl MasteryLevel {
    /// Evaluate the tier for the given correct/incorrect counters.
    ///
    /// Pure and deterministic. Rules are checked strictest-first so the
    /// highest qualifying tier wins:
    ///
    /// - fewer than 3 attempts: `Beginner`
    /// - accuracy >= 90 and attempts >= 10: `Mastered`
    /// - accuracy >= 75 and attempts >= 5: `Advanced`
    /// - accuracy >= 50 and attempts >= 3: `Intermediate`
    /// - otherwise: `Beginner`
    #[must_use]
    pub fn evaluate(correct: u32, incorrect: u32) -> Self {
        let total = correct + incorrect;
        if total < 3 {
            return Self::Beginner;
        }

        let accuracy = f64::from(correct) / f64::from(total) * 100.0;

        if accuracy >= 90.0 && total >= 10 {
            Self::Mastered
        } else if accuracy >= 75.0 && total >= 5 {
            Self::Advanced
        } else if accuracy >= 50.0 {
            Self::Intermediate
        } else {
            Self::Beginner
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Mastered => "mastered",
        }
    }

    #[must_use]
    pub fn is_mastered(self) -> bool {
        matches!(self, Self::Mastered)
    }
}

impl Default for MasteryLevel {
    fn default() -> Self {
        Self::Beginner
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MasteryLevel {
    type Err = MasteryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "mastered" => Ok(Self::Mastered),
            other => Err(MasteryError::InvalidLevel(other.to_string())),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_three_attempts_is_always_beginner() {
        assert_eq!(MasteryLevel::evaluate(0, 0), MasteryLevel::Beginner);
        assert_eq!(MasteryLevel::evaluate(2, 0), MasteryLevel::Beginner);
        assert_eq!(MasteryLevel::evaluate(0, 2), MasteryLevel::Beginner);
        assert_eq!(MasteryLevel::evaluate(1, 1), MasteryLevel::Beginner);
    }

    #[test]
    fn ninety_percent_at_ten_attempts_is_mastered() {
        // exactly 90% accuracy with exactly 10 attempts meets both thresholds
        assert_eq!(MasteryLevel::evaluate(9, 1), MasteryLevel::Mastered);
    }

    #[test]
    fn ninety_percent_below_ten_attempts_is_not_mastered() {
        // 8/9 is ~88.9%; 9/10 needed for mastered, 9 attempts falls back
        assert_eq!(MasteryLevel::evaluate(8, 1), MasteryLevel::Advanced);
    }

    #[test]
    fn seventy_five_percent_at_five_attempts_is_advanced() {
        assert_eq!(MasteryLevel::evaluate(4, 1), MasteryLevel::Advanced);
    }

    #[test]
    fn seventy_five_percent_at_four_attempts_is_intermediate() {
        // accuracy 75 but only 4 attempts; intermediate needs >= 50 and >= 3
        assert_eq!(MasteryLevel::evaluate(3, 1), MasteryLevel::Intermediate);
    }

    #[test]
    fn half_accuracy_at_three_attempts_is_intermediate() {
        assert_eq!(MasteryLevel::evaluate(2, 1), MasteryLevel::Intermediate);
    }

    #[test]
    fn low_accuracy_stays_beginner_regardless_of_volume() {
        assert_eq!(MasteryLevel::evaluate(4, 6), MasteryLevel::Beginner);
        assert_eq!(MasteryLevel::evaluate(10, 40), MasteryLevel::Beginner);
    }

    #[test]
    fn tier_can_fall_as_accuracy_drops() {
        let before = MasteryLevel::evaluate(9, 1);
        let after = MasteryLevel::evaluate(9, 6);
        assert_eq!(before, MasteryLevel::Mastered);
        assert_eq!(after, MasteryLevel::Intermediate);
        assert!(after < before);
    }

    #[test]
    fn level_round_trips_through_str() {
        for level in [
            MasteryLevel::Beginner,
            MasteryLevel::Intermediate,
            MasteryLevel::Advanced,
            MasteryLevel::Mastered,
        ] {
            assert_eq!(level.as_str().parse::<MasteryLevel>().unwrap(), level);
        }
    }

    #[test]
    fn unknown_level_fails_to_parse() {
        assert!(matches!(
            "expert".parse::<MasteryLevel>(),
            Err(MasteryError::InvalidLevel(_))
        ));
    }
}
