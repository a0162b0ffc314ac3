// ReviewSense Data Models
// Canonical sentiment types shared by the segmenter, the classifier adapters and the aggregator

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Relative guard applied to score totals during normalization.
pub const NORMALIZATION_EPSILON: f64 = 1e-9;

/// Catch-all aspect bucket for clauses that match no configured keyword.
pub const GENERAL_ASPECT: &str = "general";

// ============ Canonical Label ============

/// One of the three fixed output classes. Vendor label strings never leave the adapters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Fixed tie-break precedence when two classes hold the same probability.
    pub const PRECEDENCE: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Probability Triple ============

/// Positive/Neutral/Negative distribution, components in [0,1] summing to 1.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilityTriple {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl ProbabilityTriple {
    /// Wrap components that are already a distribution (means of normalized triples, test fixtures).
    pub fn new(positive: f64, neutral: f64, negative: f64) -> Self {
        Self { positive, neutral, negative }
    }

    /// The degenerate `{0, 1, 0}` distribution used for empty input.
    pub fn neutral_point() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    /// Normalize raw per-class masses into a distribution.
    ///
    /// Negative and non-finite masses count as zero. A zero total yields the
    /// neutral point rather than an all-zero triple.
    pub fn normalized(positive: f64, neutral: f64, negative: f64) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        let (p, u, n) = (clean(positive), clean(neutral), clean(negative));
        let total = p + u + n;
        if total <= 0.0 {
            return Self::neutral_point();
        }
        // Relative guard: tiny totals must still normalize to 1.
        let denom = total * (1.0 + NORMALIZATION_EPSILON);
        Self::new(p / denom, u / denom, n / denom)
    }

    /// Component-wise arithmetic mean, `None` for an empty input.
    pub fn mean<'a, I>(triples: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a ProbabilityTriple>,
    {
        let mut count = 0usize;
        let mut acc = Self::new(0.0, 0.0, 0.0);
        for t in triples {
            acc.positive += t.positive;
            acc.neutral += t.neutral;
            acc.negative += t.negative;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(Self::new(acc.positive / n, acc.neutral / n, acc.negative / n))
    }

    pub fn get(&self, sentiment: Sentiment) -> f64 {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
        }
    }

    pub fn sum(&self) -> f64 {
        self.positive + self.neutral + self.negative
    }

    /// Dominant class; exact ties resolve Positive > Neutral > Negative.
    pub fn label(&self) -> Sentiment {
        let mut best = Sentiment::PRECEDENCE[0];
        for candidate in &Sentiment::PRECEDENCE[1..] {
            if self.get(*candidate) > self.get(best) {
                best = *candidate;
            }
        }
        best
    }
}

// ============ Entailment ============

/// Normalized entailment/neutral/contradiction probabilities for one (premise, hypothesis) pair.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntailmentScores {
    pub entailment: f64,
    pub neutral: f64,
    pub contradiction: f64,
}

// ============ Vendor Output ============

/// Raw `(label, score)` pair as produced by a classifier capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    #[serde(default)]
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self { label: label.into(), score }
    }
}

/// Shapes a classifier response may take before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VendorOutput {
    /// Scores for every label the model knows.
    Distribution(Vec<LabelScore>),
    /// Only the top-scoring label.
    Best(LabelScore),
}

// ============ Clause ============

/// Trimmed, non-empty fragment of the input that is scored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Clause(String);

impl Clause {
    /// Returns `None` for empty or whitespace-only fragments.
    pub fn new(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Clause {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============ Analysis Output ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectResult {
    pub label: Sentiment,
    pub probs: ProbabilityTriple,
}

/// Result of one `analyze` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall: Sentiment,
    pub probs: ProbabilityTriple,
    pub sarcasm: bool,
    pub aspects: BTreeMap<String, AspectResult>,
}

impl AnalysisResult {
    /// Result for empty or whitespace-only input.
    pub fn degenerate() -> Self {
        Self {
            overall: Sentiment::Neutral,
            probs: ProbabilityTriple::neutral_point(),
            sarcasm: false,
            aspects: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseScore {
    pub text: String,
    pub probs: ProbabilityTriple,
    pub aspects: BTreeSet<String>,
}

/// Which tier of sarcasm detection fired, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SarcasmCue {
    None,
    Entailment {
        hypothesis: Sentiment,
        contradiction: f64,
    },
    Proximity {
        positive: String,
        negative: String,
        distance: usize,
    },
}

impl SarcasmCue {
    pub fn is_flagged(&self) -> bool {
        !matches!(self, SarcasmCue::None)
    }
}

/// `AnalysisResult` together with the clause-level evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub result: AnalysisResult,
    #[serde(default)]
    pub clauses: Vec<ClauseScore>,
    pub sarcasm_cue: SarcasmCue,
}
