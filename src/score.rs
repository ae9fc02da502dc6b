//! Smell score calculation.
//!
//! Issues are weighted by severity into a 0-100 score; a run passes when
//! the score stays at or under the threshold. Only Critical and High
//! issues count toward the score — Medium and Low are tracked in the
//! breakdown but never fail a run on their own.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::detect::{ScanResult, Severity};

/// Point weights per severity.
pub mod points {
    pub const CRITICAL: i32 = 20;
    pub const HIGH: i32 = 10;
    pub const MEDIUM: i32 = 5;
    pub const LOW: i32 = 2;
}

/// Default threshold when the config doesn't specify one.
pub const DEFAULT_THRESHOLD: i32 = 25;

/// Grade thresholds.
pub mod grades {
    pub const A_MAX: i32 = 10;
    pub const B_MAX: i32 = 25;
    pub const C_MAX: i32 = 50;
    pub const D_MAX: i32 = 75;
}

/// The calculated smell score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmellScore {
    /// Score from 0-100, higher = smellier
    pub score: i32,
    /// Letter grade: "A" (0-10), "B" (11-25), "C" (26-50), "D" (51-75), "F" (76-100)
    pub grade: String,
    /// Points by issue code
    pub breakdown: HashMap<String, i32>,
    /// Whether the check passed (score <= threshold)
    pub passed: bool,
    /// The threshold used
    pub threshold: i32,
}

impl SmellScore {
    /// Total points before capping at 100.
    pub fn total_points(&self) -> i32 {
        self.breakdown.values().sum()
    }
}

fn severity_points(severity: Severity) -> i32 {
    match severity {
        Severity::Critical => points::CRITICAL,
        Severity::High => points::HIGH,
        Severity::Medium => points::MEDIUM,
        Severity::Low => points::LOW,
    }
}

fn calculate_grade(score: i32) -> String {
    match score {
        s if s <= grades::A_MAX => "A".to_string(),
        s if s <= grades::B_MAX => "B".to_string(),
        s if s <= grades::C_MAX => "C".to_string(),
        s if s <= grades::D_MAX => "D".to_string(),
        _ => "F".to_string(),
    }
}

/// Calculate the smell score with the given threshold.
pub fn calculate(result: &ScanResult, threshold: i32) -> SmellScore {
    let mut breakdown: HashMap<String, i32> = HashMap::new();
    let mut scoring_points = 0;

    for issue in &result.issues {
        let points = severity_points(issue.severity);
        *breakdown.entry(issue.code.as_str().to_string()).or_insert(0) += points;

        if issue.severity.counts_toward_score() {
            scoring_points += points;
        }
    }

    let score = scoring_points.min(100);

    SmellScore {
        score,
        grade: calculate_grade(score),
        breakdown,
        passed: score <= threshold,
        threshold,
    }
}
