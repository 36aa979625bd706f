//! Band condition levels
//!
//! The upstream page publishes a 0-100 propagation score per band. This
//! module folds that number into the qualitative scale operators actually
//! use on the air: Great / Good / Fair / Poor / Dead.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    Great,
    Good,
    Fair,
    Poor,
    Dead,
    /// Fallback for scores outside 0-100 and for bands the upstream
    /// page omitted. Never produced for an in-range score.
    Unknown,
}

/// Closed score intervals, best first. Contiguous over 0..=100: every
/// in-range score lands in exactly one interval.
const SCALE: [(Level, i64, i64); 5] = [
    (Level::Great, 95, 100),
    (Level::Good, 70, 94),
    (Level::Fair, 35, 69),
    (Level::Poor, 16, 34),
    (Level::Dead, 0, 15),
];

/// Classify a raw propagation score. Total over all integers.
pub fn classify(score: i64) -> Level {
    for (level, lower, upper) in SCALE {
        if score >= lower && score <= upper {
            return level;
        }
    }
    Level::Unknown
}

impl Level {
    pub fn name(&self) -> &'static str {
        match self {
            Level::Great => "Great",
            Level::Good => "Good",
            Level::Fair => "Fair",
            Level::Poor => "Poor",
            Level::Dead => "Dead",
            Level::Unknown => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale_sweep() {
        for s in 95..=100 {
            assert_eq!(classify(s), Level::Great, "score {}", s);
        }
        for s in 70..=94 {
            assert_eq!(classify(s), Level::Good, "score {}", s);
        }
        for s in 35..=69 {
            assert_eq!(classify(s), Level::Fair, "score {}", s);
        }
        for s in 16..=34 {
            assert_eq!(classify(s), Level::Poor, "score {}", s);
        }
        for s in 0..=15 {
            assert_eq!(classify(s), Level::Dead, "score {}", s);
        }
    }

    #[test]
    fn test_out_of_range_is_unknown() {
        assert_eq!(classify(-1), Level::Unknown);
        assert_eq!(classify(101), Level::Unknown);
        assert_eq!(classify(i64::MIN), Level::Unknown);
        assert_eq!(classify(i64::MAX), Level::Unknown);
    }

    #[test]
    fn test_scale_has_no_gaps() {
        for s in 0..=100 {
            assert_ne!(classify(s), Level::Unknown, "score {} fell through the scale", s);
        }
    }

    #[test]
    fn test_level_names() {
        assert_eq!(classify(98).name(), "Great");
        assert_eq!(classify(5).name(), "Dead");
        assert_eq!(classify(-10).name(), "Unknown");
    }
}
