//! Best-match decisioning over a reference index.

use log::debug;
use serde::Serialize;

use crate::distance::SimilarityMetric;
use crate::error::{MatcherError, Result};
use crate::index::ReferenceIndex;
use crate::vector::FeatureVector;

/// Minimum score (percent) for a high-confidence match under the default
/// metric. Calibrated for the 64x64 pixel-agreement scheme.
pub const DEFAULT_THRESHOLD: f32 = 60.0;

/// Configuration for the matcher.
#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    pub metric: SimilarityMetric,
    /// Best score must be at least this to count as a match.
    pub threshold: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            metric: SimilarityMetric::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// A reference name paired with its score against the candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEntry {
    pub name: String,
    pub score: f32,
}

/// Outcome of matching one candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MatchResult {
    Matched { name: String, score: f32 },
    /// No entry cleared the threshold. `best` is the closest entry, if any.
    NoMatch { best: Option<ScoredEntry> },
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }

    /// Name of the matched reference, if any.
    pub fn matched_name(&self) -> Option<&str> {
        match self {
            MatchResult::Matched { name, .. } => Some(name),
            MatchResult::NoMatch { .. } => None,
        }
    }
}

/// Scores a candidate against every entry and applies the threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Find the best entry for `candidate`.
    ///
    /// Entries are visited in ascending name order and only a strictly
    /// better score replaces the current best, so exact ties resolve to the
    /// lexicographically smallest name.
    pub fn find_match(
        &self,
        candidate: &FeatureVector,
        index: &ReferenceIndex,
    ) -> Result<MatchResult> {
        if index.is_empty() {
            return Ok(MatchResult::NoMatch { best: None });
        }
        if candidate.dimension() != index.dimension() {
            return Err(MatcherError::DimensionMismatch {
                expected: index.dimension(),
                actual: candidate.dimension(),
            });
        }

        let mut best: Option<ScoredEntry> = None;
        for (name, vector) in index.iter() {
            let score = self.config.metric.score(candidate, vector)?;
            debug!("{name}: {score:.2}%");
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(ScoredEntry {
                    name: name.to_string(),
                    score,
                });
            }
        }

        Ok(match best {
            Some(entry) if entry.score >= self.config.threshold => MatchResult::Matched {
                name: entry.name,
                score: entry.score,
            },
            best => MatchResult::NoMatch { best },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::SchemeTag;
    use approx::assert_relative_eq;

    // 2x2 canonical grid: each fixture's two pixels are repeated once.
    fn index_of(entries: &[(&str, [u8; 6])]) -> ReferenceIndex {
        let scheme = SchemeTag {
            version: 1,
            canonical_size: 2,
        };
        let mut index = ReferenceIndex::new(scheme);
        for (name, px) in entries {
            let mut data = px.to_vec();
            data.extend_from_slice(px);
            index.upsert(*name, FeatureVector::new(data)).unwrap();
        }
        index
    }

    fn candidate(px: [u8; 6]) -> FeatureVector {
        let mut data = px.to_vec();
        data.extend_from_slice(&px);
        FeatureVector::new(data)
    }

    #[test]
    fn test_empty_index_is_no_match() {
        let index = index_of(&[]);
        let result = Matcher::default()
            .find_match(&candidate([1, 2, 3, 4, 5, 6]), &index)
            .unwrap();
        assert_eq!(result, MatchResult::NoMatch { best: None });
    }

    #[test]
    fn test_self_match_scores_100() {
        let index = index_of(&[("cat", [200, 10, 10, 10, 200, 10]), ("dog", [0, 0, 0, 0, 0, 0])]);
        let result = Matcher::default()
            .find_match(index.get("cat").unwrap(), &index)
            .unwrap();
        match result {
            MatchResult::Matched { name, score } => {
                assert_eq!(name, "cat");
                assert_relative_eq!(score, 100.0, epsilon = 1e-6);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_below_threshold_reports_best() {
        let index = index_of(&[("cat", [200, 10, 10, 10, 200, 10])]);
        // First pixel agrees, second does not -> 50%
        let result = Matcher::default()
            .find_match(&candidate([200, 10, 10, 100, 100, 100]), &index)
            .unwrap();
        match result {
            MatchResult::NoMatch { best: Some(best) } => {
                assert_eq!(best.name, "cat");
                assert_relative_eq!(best.score, 50.0, epsilon = 1e-6);
            }
            other => panic!("expected no match, got {other:?}"),
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let index = index_of(&[("cat", [200, 10, 10, 10, 200, 10])]);
        let matcher = Matcher::new(MatcherConfig {
            threshold: 50.0,
            ..MatcherConfig::default()
        });
        let result = matcher
            .find_match(&candidate([200, 10, 10, 100, 100, 100]), &index)
            .unwrap();
        assert_eq!(result.matched_name(), Some("cat"));
    }

    #[test]
    fn test_ties_break_on_smallest_name() {
        let px = [50, 50, 50, 60, 60, 60];
        let index = index_of(&[("zebra", px), ("apple", px), ("mango", px)]);
        let result = Matcher::default().find_match(&candidate(px), &index).unwrap();
        assert_eq!(result.matched_name(), Some("apple"));
    }

    #[test]
    fn test_candidate_dimension_checked() {
        let index = index_of(&[("cat", [1, 2, 3, 4, 5, 6])]);
        let result = Matcher::default().find_match(&FeatureVector::new(vec![1, 2, 3]), &index);
        assert!(matches!(result, Err(MatcherError::DimensionMismatch { .. })));
    }
}
