//! Rating configuration and rating submission models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::principal::PrincipalId;

/// Maximum number of rating features a tenant may configure.
pub const MAX_FEATURES: usize = 5;
/// Maximum length (characters) of a single feature label.
pub const FEATURE_MAX_LENGTH: usize = 80;
/// Maximum length (characters) of a submission comment.
pub const COMMENT_MAX_LENGTH: usize = 300;
pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// Positional scores, one slot per configurable feature.
pub type Scores = [Option<u8>; MAX_FEATURES];

/// Owner-defined rating criteria, replaced wholesale on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingConfig {
    pub owner_id: PrincipalId,
    pub features: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// An anonymous customer rating. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSubmission {
    pub id: Uuid,
    /// Principal id of the rated tenant.
    pub tenant_id: PrincipalId,
    /// Brand slug the customer used when submitting.
    pub brand_slug: String,
    pub scores: Scores,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRatingSubmission {
    pub tenant_id: PrincipalId,
    pub brand_slug: String,
    pub scores: Scores,
    pub comment: Option<String>,
}

/// Average score of one configured feature across all submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAverage {
    pub feature: String,
    /// Number of submissions that scored this slot.
    pub count: u64,
    /// `None` when nobody has scored this feature yet.
    pub average: Option<f64>,
}

/// Average each slot of `scores` and label it with the matching feature.
///
/// Slots beyond the configured features are ignored; submissions made
/// under an older configuration still count towards the slot position.
pub fn feature_averages(features: &[String], scores: &[Scores]) -> Vec<FeatureAverage> {
    features
        .iter()
        .enumerate()
        .map(|(slot, feature)| {
            let (sum, count) = scores
                .iter()
                .filter_map(|s| s.get(slot).copied().flatten())
                .fold((0u64, 0u64), |(sum, count), v| (sum + u64::from(v), count + 1));
            FeatureAverage {
                feature: feature.clone(),
                count,
                average: (count > 0).then(|| sum as f64 / count as f64),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_follow_slot_positions() {
        let features = vec!["Limpieza".to_string(), "Atención".to_string()];
        let scores = vec![
            [Some(5), Some(4), None, None, None],
            [Some(3), None, None, None, None],
        ];

        let averages = feature_averages(&features, &scores);

        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].count, 2);
        assert_eq!(averages[0].average, Some(4.0));
        assert_eq!(averages[1].count, 1);
        assert_eq!(averages[1].average, Some(4.0));
    }

    #[test]
    fn averages_without_submissions_are_empty() {
        let features = vec!["Limpieza".to_string()];
        let averages = feature_averages(&features, &[]);
        assert_eq!(averages[0].count, 0);
        assert_eq!(averages[0].average, None);
    }
}
