use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClassifierError {
    #[error("classifier needs at least one score band")]
    NoBands,

    #[error("final score band must be the catch-all (no upper bound)")]
    MissingCatchAll,

    #[error("band {index} is a catch-all but is not last")]
    MisplacedCatchAll { index: usize },

    #[error("band {index} upper bound must be greater than the previous band's")]
    NonIncreasingBound { index: usize },

    #[error("band {index} has an empty outcome name")]
    EmptyOutcomeName { index: usize },
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Name of a terminal quiz outcome, used to key presentation content.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutcomeName(String);

impl OutcomeName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OutcomeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutcomeName({})", self.0)
    }
}

impl fmt::Display for OutcomeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One contiguous scoring range mapped to an outcome.
///
/// A band covers every score up to and including `upper`; its lower edge
/// is implied by the previous band. The final band has no upper bound and
/// absorbs everything above the second-to-last band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreBand {
    upper: Option<i32>,
    outcome: OutcomeName,
}

impl ScoreBand {
    /// Band covering scores up to and including `upper`.
    #[must_use]
    pub fn up_to(upper: i32, outcome: OutcomeName) -> Self {
        Self {
            upper: Some(upper),
            outcome,
        }
    }

    /// The final catch-all band.
    #[must_use]
    pub fn catch_all(outcome: OutcomeName) -> Self {
        Self {
            upper: None,
            outcome,
        }
    }

    #[must_use]
    pub fn upper(&self) -> Option<i32> {
        self.upper
    }

    #[must_use]
    pub fn outcome(&self) -> &OutcomeName {
        &self.outcome
    }
}

/// Total mapping from final score to outcome.
///
/// Bands are keyed by inclusive upper bounds with a mandatory trailing
/// catch-all, so the bands partition the whole integer line: no score can
/// fall in a gap and no score matches two bands. An unmapped score would
/// be a silent correctness bug, which is why the partition is enforced
/// structurally rather than left to configuration discipline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreClassifier {
    bands: Vec<ScoreBand>,
}

impl ScoreClassifier {
    /// Validate and build the classifier.
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError` if there are no bands, the last band is
    /// not the catch-all, a catch-all appears early, upper bounds are not
    /// strictly increasing, or an outcome name is empty.
    pub fn new(bands: Vec<ScoreBand>) -> Result<Self, ClassifierError> {
        if bands.is_empty() {
            return Err(ClassifierError::NoBands);
        }

        let last = bands.len() - 1;
        let mut previous: Option<i32> = None;
        for (index, band) in bands.iter().enumerate() {
            if band.outcome.as_str().trim().is_empty() {
                return Err(ClassifierError::EmptyOutcomeName { index });
            }
            match band.upper {
                None if index != last => {
                    return Err(ClassifierError::MisplacedCatchAll { index });
                }
                None => {}
                Some(upper) => {
                    if index == last {
                        return Err(ClassifierError::MissingCatchAll);
                    }
                    if previous.is_some_and(|p| upper <= p) {
                        return Err(ClassifierError::NonIncreasingBound { index });
                    }
                    previous = Some(upper);
                }
            }
        }

        Ok(Self { bands })
    }

    /// Map a final score to its outcome. Total over all of `i32`.
    #[must_use]
    pub fn classify(&self, score: i32) -> &OutcomeName {
        for band in &self.bands {
            match band.upper {
                Some(upper) if score <= upper => return &band.outcome,
                Some(_) => {}
                None => return &band.outcome,
            }
        }
        // Unreachable: the constructor guarantees a trailing catch-all.
        &self.bands[self.bands.len() - 1].outcome
    }

    #[must_use]
    pub fn bands(&self) -> &[ScoreBand] {
        &self.bands
    }

    /// Outcome names in band order.
    pub fn outcomes(&self) -> impl Iterator<Item = &OutcomeName> {
        self.bands.iter().map(ScoreBand::outcome)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn totem_classifier() -> ScoreClassifier {
        ScoreClassifier::new(vec![
            ScoreBand::up_to(10, OutcomeName::new("wolf")),
            ScoreBand::up_to(17, OutcomeName::new("eagle")),
            ScoreBand::up_to(23, OutcomeName::new("elephant")),
            ScoreBand::catch_all(OutcomeName::new("tiger")),
        ])
        .unwrap()
    }

    #[test]
    fn classify_is_total_over_a_wide_range() {
        let classifier = totem_classifier();
        for score in -1000..=1000 {
            // Every score falls in exactly one band by the bound
            // arithmetic, and classify agrees with it.
            let matching: Vec<&OutcomeName> = classifier
                .bands()
                .iter()
                .filter(|band| {
                    let below_upper = band.upper().is_none_or(|upper| score <= upper);
                    let above_lower = classifier
                        .bands()
                        .iter()
                        .filter_map(ScoreBand::upper)
                        .filter(|u| Some(*u) < band.upper() || band.upper().is_none())
                        .all(|u| score > u);
                    below_upper && above_lower
                })
                .map(ScoreBand::outcome)
                .collect();
            assert_eq!(matching.len(), 1, "score {score} matched {matching:?}");
            assert_eq!(classifier.classify(score), matching[0]);
        }
    }

    #[test]
    fn boundaries_are_contiguous() {
        let classifier = totem_classifier();
        assert_eq!(classifier.classify(10).as_str(), "wolf");
        assert_eq!(classifier.classify(11).as_str(), "eagle");
        assert_eq!(classifier.classify(17).as_str(), "eagle");
        assert_eq!(classifier.classify(18).as_str(), "elephant");
        assert_eq!(classifier.classify(23).as_str(), "elephant");
        assert_eq!(classifier.classify(24).as_str(), "tiger");
        assert_eq!(classifier.classify(i32::MIN).as_str(), "wolf");
        assert_eq!(classifier.classify(i32::MAX).as_str(), "tiger");
    }

    #[test]
    fn missing_catch_all_is_rejected() {
        let err = ScoreClassifier::new(vec![
            ScoreBand::up_to(10, OutcomeName::new("wolf")),
            ScoreBand::up_to(17, OutcomeName::new("eagle")),
        ])
        .unwrap_err();
        assert!(matches!(err, ClassifierError::MissingCatchAll));
    }

    #[test]
    fn early_catch_all_is_rejected() {
        let err = ScoreClassifier::new(vec![
            ScoreBand::catch_all(OutcomeName::new("wolf")),
            ScoreBand::catch_all(OutcomeName::new("tiger")),
        ])
        .unwrap_err();
        assert!(matches!(err, ClassifierError::MisplacedCatchAll { index: 0 }));
    }

    #[test]
    fn non_increasing_bounds_are_rejected() {
        let err = ScoreClassifier::new(vec![
            ScoreBand::up_to(10, OutcomeName::new("wolf")),
            ScoreBand::up_to(10, OutcomeName::new("eagle")),
            ScoreBand::catch_all(OutcomeName::new("tiger")),
        ])
        .unwrap_err();
        assert!(matches!(err, ClassifierError::NonIncreasingBound { index: 1 }));
    }

    #[test]
    fn empty_band_list_is_rejected() {
        let err = ScoreClassifier::new(Vec::new()).unwrap_err();
        assert!(matches!(err, ClassifierError::NoBands));
    }

    #[test]
    fn single_catch_all_band_is_allowed() {
        let classifier =
            ScoreClassifier::new(vec![ScoreBand::catch_all(OutcomeName::new("only"))]).unwrap();
        assert_eq!(classifier.classify(-5).as_str(), "only");
        assert_eq!(classifier.classify(99).as_str(), "only");
    }
}
