// Sarcasm Adjustment
// Bounded nudge from Positive toward Neutral when a weak positive read is flagged as sarcastic.

use crate::models::{ProbabilityTriple, Sentiment};
use crate::services::config_store::ThresholdConfig;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ResultAdjuster {
    margin: f64,
    shift: f64,
}

impl ResultAdjuster {
    pub fn new(margin: f64, shift: f64) -> Self {
        Self { margin, shift }
    }

    pub fn from_thresholds(thresholds: &ThresholdConfig) -> Self {
        Self::new(thresholds.adjustment_margin, thresholds.adjustment_shift)
    }

    /// Acts only when sarcasm is flagged, the label is Positive and
    /// `positive - negative` is strictly below the margin. A strong positive
    /// read is returned unchanged.
    pub fn adjust(
        &self,
        probs: ProbabilityTriple,
        label: Sentiment,
        sarcasm: bool,
    ) -> (ProbabilityTriple, Sentiment) {
        if !sarcasm || label != Sentiment::Positive || probs.positive - probs.negative >= self.margin {
            return (probs, label);
        }

        let moved = self.shift.min(probs.positive).min(1.0 - probs.neutral).max(0.0);
        let adjusted = ProbabilityTriple::new(
            (probs.positive - moved).clamp(0.0, 1.0),
            (probs.neutral + moved).clamp(0.0, 1.0),
            probs.negative,
        );
        (adjusted, adjusted.label())
    }
}

impl Default for ResultAdjuster {
    fn default() -> Self {
        Self::from_thresholds(&ThresholdConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(p: f64, u: f64, n: f64, sarcasm: bool) -> (ProbabilityTriple, Sentiment) {
        let probs = ProbabilityTriple::new(p, u, n);
        ResultAdjuster::default().adjust(probs, probs.label(), sarcasm)
    }

    #[test]
    fn test_strong_positive_survives() {
        let (probs, label) = run(0.55, 0.25, 0.20, true);
        assert_eq!(probs, ProbabilityTriple::new(0.55, 0.25, 0.20));
        assert_eq!(label, Sentiment::Positive);
    }

    #[test]
    fn test_margin_boundary_is_exclusive() {
        let (probs, label) = run(0.45, 0.35, 0.20, true);
        assert_eq!(probs, ProbabilityTriple::new(0.45, 0.35, 0.20));
        assert_eq!(label, Sentiment::Positive);
    }

    #[test]
    fn test_weak_positive_is_softened() {
        let (probs, label) = run(0.44, 0.36, 0.20, true);
        assert!((probs.positive - 0.34).abs() < 1e-9);
        assert!((probs.neutral - 0.46).abs() < 1e-9);
        assert!((probs.negative - 0.20).abs() < 1e-9);
        assert!((probs.sum() - 1.0).abs() < 1e-9);
        assert_eq!(label, Sentiment::Neutral);
    }

    #[test]
    fn test_no_sarcasm_no_change() {
        let (probs, label) = run(0.44, 0.36, 0.20, false);
        assert_eq!(probs, ProbabilityTriple::new(0.44, 0.36, 0.20));
        assert_eq!(label, Sentiment::Positive);
    }

    #[test]
    fn test_non_positive_label_untouched() {
        let (probs, label) = run(0.30, 0.30, 0.40, true);
        assert_eq!(probs, ProbabilityTriple::new(0.30, 0.30, 0.40));
        assert_eq!(label, Sentiment::Negative);
    }

    #[test]
    fn test_nudge_can_keep_positive() {
        let (probs, label) = run(0.50, 0.20, 0.30, true);
        assert!((probs.positive - 0.40).abs() < 1e-9);
        assert_eq!(label, Sentiment::Positive);
    }
}
