//! Daily directive
//!
//! Maps the day's recovery and sleep scores to one fixed recommendation.
//! Rules are checked in order and the first match wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Recovery above this is a peak day
pub const PEAK_RECOVERY_THRESHOLD: u8 = 85;
/// Recovery below this calls for active recovery
pub const LOW_RECOVERY_THRESHOLD: u8 = 55;
/// Sleep below this is treated as non-restorative
pub const POOR_SLEEP_THRESHOLD: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    PeakPerformance,
    ActiveRecovery,
    RestorativeSleep,
    MaintainHabits,
}

impl Directive {
    /// Pick the directive for a pair of final scores
    pub fn from_scores(recovery_score: u8, sleep_score: u8) -> Self {
        if recovery_score > PEAK_RECOVERY_THRESHOLD {
            Directive::PeakPerformance
        } else if recovery_score < LOW_RECOVERY_THRESHOLD {
            Directive::ActiveRecovery
        } else if sleep_score < POOR_SLEEP_THRESHOLD {
            Directive::RestorativeSleep
        } else {
            Directive::MaintainHabits
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Directive::PeakPerformance => {
                "You're primed for peak performance. Today is a good day to push intensity or go for a personal best."
            }
            Directive::ActiveRecovery => {
                "Your body is under strain. Focus on active recovery today: light movement, hydration and an early night."
            }
            Directive::RestorativeSleep => {
                "Last night's sleep wasn't restorative. Keep training moderate and protect your sleep window tonight."
            }
            Directive::MaintainHabits => {
                "You're well balanced. Maintain your current training load and sleep habits."
            }
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Directive text for a pair of final scores
pub fn generate_directive(recovery_score: u8, sleep_score: u8) -> String {
    Directive::from_scores(recovery_score, sleep_score)
        .message()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order() {
        assert_eq!(Directive::from_scores(90, 20), Directive::PeakPerformance);
        assert_eq!(Directive::from_scores(40, 20), Directive::ActiveRecovery);
        assert_eq!(Directive::from_scores(70, 50), Directive::RestorativeSleep);
        assert_eq!(Directive::from_scores(70, 80), Directive::MaintainHabits);
    }

    #[test]
    fn test_thresholds_are_strict() {
        assert_eq!(Directive::from_scores(85, 80), Directive::MaintainHabits);
        assert_eq!(Directive::from_scores(86, 80), Directive::PeakPerformance);
        assert_eq!(Directive::from_scores(55, 80), Directive::MaintainHabits);
        assert_eq!(Directive::from_scores(54, 80), Directive::ActiveRecovery);
        assert_eq!(Directive::from_scores(70, 60), Directive::MaintainHabits);
    }

    #[test]
    fn test_generate_directive_is_deterministic() {
        assert_eq!(generate_directive(60, 59), generate_directive(60, 59));
        assert_eq!(
            generate_directive(60, 59),
            Directive::RestorativeSleep.message()
        );
    }

    #[test]
    fn test_messages_are_distinct() {
        let all = [
            Directive::PeakPerformance,
            Directive::ActiveRecovery,
            Directive::RestorativeSleep,
            Directive::MaintainHabits,
        ];
        let messages: std::collections::HashSet<&str> = all.iter().map(|d| d.message()).collect();
        assert_eq!(messages.len(), 4);
    }
}
