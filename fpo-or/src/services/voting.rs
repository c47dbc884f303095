//! Majority voting engine
//!
//! Pure and numeric: ballots arrive already normalised to classes in {0, 1}.
//! Tally the votes, pick the majority class, and average the winning class's
//! confidences. A tie (or no ballots at all) yields no decision.

use serde::Serialize;

/// Vote counts per class, serialised with the class digit as key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    #[serde(rename = "0")]
    pub normal: usize,
    #[serde(rename = "1")]
    pub anomaly: usize,
}

/// Result of a majority vote across node answers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub votes: VoteTally,
    pub total_votes: usize,
    /// Number of nodes dispatched, including ones that failed to answer
    pub total_models: usize,
    /// Winning class, or None on tie / no valid ballots
    pub decision: Option<u8>,
    /// Mean confidence of the winning class's ballots; 0 when undecided
    pub confidence: f64,
    pub message: String,
}

impl VoteOutcome {
    /// True when ballots were cast but split evenly
    pub fn is_tie(&self) -> bool {
        self.decision.is_none() && self.total_votes > 0
    }
}

/// Tally `(class, confidence)` ballots into a decision
pub fn vote(ballots: &[(u8, f64)], total_models: usize) -> VoteOutcome {
    if ballots.is_empty() {
        return VoteOutcome {
            votes: VoteTally::default(),
            total_votes: 0,
            total_models,
            decision: None,
            confidence: 0.0,
            message: "No models returned valid predictions".to_string(),
        };
    }

    let mut votes = VoteTally::default();
    let mut confidence_sums = [0.0_f64; 2];
    for &(class, confidence) in ballots {
        match class {
            1 => {
                votes.anomaly += 1;
                confidence_sums[1] += confidence;
            }
            _ => {
                votes.normal += 1;
                confidence_sums[0] += confidence;
            }
        }
    }

    let total_votes = votes.normal + votes.anomaly;

    if votes.normal == votes.anomaly {
        return VoteOutcome {
            votes,
            total_votes,
            total_models,
            decision: None,
            confidence: 0.0,
            message: format!("Tie: both classes received {} votes", votes.normal),
        };
    }

    let (decision, winner_count) = if votes.anomaly > votes.normal {
        (1_u8, votes.anomaly)
    } else {
        (0_u8, votes.normal)
    };
    let confidence = confidence_sums[decision as usize] / winner_count as f64;

    VoteOutcome {
        votes,
        total_votes,
        total_models,
        decision: Some(decision),
        confidence,
        message: format!("Class {} won by {} votes", decision, winner_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ballots_yields_no_decision() {
        let outcome = vote(&[], 3);
        assert_eq!(outcome.decision, None);
        assert_eq!(outcome.confidence, 0.0);
        assert_eq!(outcome.total_votes, 0);
        assert_eq!(outcome.total_models, 3);
        assert_eq!(outcome.message, "No models returned valid predictions");
        assert!(!outcome.is_tie());
    }

    #[test]
    fn tie_yields_no_decision() {
        // Scenario: nodes A and B disagree one-to-one.
        let outcome = vote(&[(1, 0.8), (0, 0.9)], 2);
        assert_eq!(outcome.decision, None);
        assert_eq!(outcome.confidence, 0.0);
        assert_eq!(outcome.votes, VoteTally { normal: 1, anomaly: 1 });
        assert!(outcome.is_tie());
    }

    #[test]
    fn majority_wins_with_mean_confidence() {
        // Scenario: A→1/0.6, B→1/0.8, C→0/0.7.
        let outcome = vote(&[(1, 0.6), (1, 0.8), (0, 0.7)], 3);
        assert_eq!(outcome.decision, Some(1));
        assert!((outcome.confidence - 0.7).abs() < 1e-9);
        assert_eq!(outcome.votes, VoteTally { normal: 1, anomaly: 2 });
        assert_eq!(outcome.total_votes, 3);
        assert_eq!(outcome.message, "Class 1 won by 2 votes");
    }

    #[test]
    fn normal_majority_wins() {
        let outcome = vote(&[(0, 0.5), (0, 1.0), (0, 0.75), (1, 0.99)], 4);
        assert_eq!(outcome.decision, Some(0));
        assert!((outcome.confidence - 0.75).abs() < 1e-9);
        assert_eq!(outcome.message, "Class 0 won by 3 votes");
    }

    #[test]
    fn losing_class_confidence_is_ignored() {
        let outcome = vote(&[(1, 0.1), (1, 0.3), (0, 1.0)], 3);
        assert_eq!(outcome.decision, Some(1));
        assert!((outcome.confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn single_ballot_decides() {
        let outcome = vote(&[(1, 0.42)], 1);
        assert_eq!(outcome.decision, Some(1));
        assert!((outcome.confidence - 0.42).abs() < 1e-9);
    }
}
