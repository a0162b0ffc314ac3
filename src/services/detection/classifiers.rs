// Classifier Capabilities
// Narrow interfaces to the valence and entailment models, and the single place
// where vendor label vocabularies are translated into canonical types.

use crate::models::{EntailmentScores, LabelScore, ProbabilityTriple, Sentiment, VendorOutput, NORMALIZATION_EPSILON};
use crate::services::config_store::{EntailmentLabelScheme, LexiconConfig};
use crate::services::providers::ProviderError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Three-class sentiment model. Scores need not sum to 1 or cover every class.
#[async_trait]
pub trait ValenceClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, ProviderError>;

    fn name(&self) -> &str;
}

/// Natural language inference model over a (premise, hypothesis) pair.
#[async_trait]
pub trait EntailmentClassifier: Send + Sync {
    async fn classify(&self, premise: &str, hypothesis: &str) -> Result<VendorOutput, ProviderError>;

    fn name(&self) -> &str;

    /// Positional label order for `LABEL_n` outputs.
    fn label_scheme(&self) -> EntailmentLabelScheme {
        EntailmentLabelScheme::default()
    }
}

// ============ Valence ============

/// Rules mapping vendor sentiment labels onto the canonical classes.
#[derive(Debug, Clone, Default)]
pub struct ValenceLabelRules {
    aliases: BTreeMap<String, Sentiment>,
    positive_tokens: Vec<String>,
    negative_tokens: Vec<String>,
}

impl ValenceLabelRules {
    pub fn from_lexicon(lexicon: &LexiconConfig) -> Self {
        let lower = |items: &[String]| items.iter().map(|s| s.trim().to_lowercase()).collect::<Vec<_>>();
        Self {
            aliases: lexicon
                .label_aliases
                .iter()
                .map(|(label, sentiment)| (label.trim().to_lowercase(), *sentiment))
                .collect(),
            positive_tokens: lower(&lexicon.positive_label_tokens),
            negative_tokens: lower(&lexicon.negative_label_tokens),
        }
    }

    pub fn canonical_label(&self, vendor_label: &str) -> Sentiment {
        let s = vendor_label.trim().to_lowercase();
        if let Some(sentiment) = self.aliases.get(&s) {
            return *sentiment;
        }
        if s.contains("pos") || self.positive_tokens.iter().any(|t| *t == s) {
            Sentiment::Positive
        } else if s.contains("neg") || self.negative_tokens.iter().any(|t| *t == s) {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    /// Sum scores per canonical class, then normalize. Missing classes count as 0.0.
    pub fn normalize(&self, scores: &[LabelScore]) -> ProbabilityTriple {
        let (mut pos, mut neu, mut neg) = (0.0, 0.0, 0.0);
        for item in scores {
            let score = if item.score.is_finite() { item.score.max(0.0) } else { 0.0 };
            match self.canonical_label(&item.label) {
                Sentiment::Positive => pos += score,
                Sentiment::Neutral => neu += score,
                Sentiment::Negative => neg += score,
            }
        }
        ProbabilityTriple::normalized(pos, neu, neg)
    }
}

/// Valence capability plus label normalization.
#[derive(Clone)]
pub struct ValenceAdapter {
    classifier: Arc<dyn ValenceClassifier>,
    rules: ValenceLabelRules,
}

impl ValenceAdapter {
    pub fn new(classifier: Arc<dyn ValenceClassifier>, rules: ValenceLabelRules) -> Self {
        Self { classifier, rules }
    }

    pub fn name(&self) -> &str {
        self.classifier.name()
    }

    pub async fn classify(&self, text: &str) -> Result<ProbabilityTriple, ProviderError> {
        let raw = self.classifier.classify(text).await?;
        Ok(self.rules.normalize(&raw))
    }
}

// ============ Entailment ============

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntailmentClass {
    Entailment,
    Neutral,
    Contradiction,
}

impl EntailmentLabelScheme {
    pub fn class_at(&self, index: usize) -> Option<EntailmentClass> {
        use EntailmentClass::*;
        let order = match self {
            EntailmentLabelScheme::RobertaMnli => [Contradiction, Neutral, Entailment],
            EntailmentLabelScheme::EntailmentFirst => [Entailment, Neutral, Contradiction],
            EntailmentLabelScheme::CrossEncoder => [Contradiction, Entailment, Neutral],
        };
        order.get(index).copied()
    }
}

/// Resolve a semantic or positional (`LABEL_n`) entailment label; `None` when unrecognized.
pub fn entailment_class(label: &str, scheme: EntailmentLabelScheme) -> Option<EntailmentClass> {
    let upper = label.trim().to_uppercase();
    match upper.as_str() {
        "ENTAILMENT" => Some(EntailmentClass::Entailment),
        "NEUTRAL" => Some(EntailmentClass::Neutral),
        "CONTRADICTION" => Some(EntailmentClass::Contradiction),
        _ => upper
            .strip_prefix("LABEL_")
            .and_then(|idx| idx.parse::<usize>().ok())
            .and_then(|idx| scheme.class_at(idx)),
    }
}

/// Convert a vendor entailment response into bounded class probabilities.
///
/// Unrecognized labels contribute nothing. A distribution whose mass exceeds 1
/// is rescaled; a single best label keeps its own score and leaves the other
/// classes at zero.
pub fn normalize_entailment(output: &VendorOutput, scheme: EntailmentLabelScheme) -> EntailmentScores {
    let mut scores = EntailmentScores::default();
    let mut add = |item: &LabelScore| {
        let score = if item.score.is_finite() { item.score.clamp(0.0, 1.0) } else { 0.0 };
        match entailment_class(&item.label, scheme) {
            Some(EntailmentClass::Entailment) => scores.entailment += score,
            Some(EntailmentClass::Neutral) => scores.neutral += score,
            Some(EntailmentClass::Contradiction) => scores.contradiction += score,
            None => {}
        }
    };

    match output {
        VendorOutput::Distribution(items) => items.iter().for_each(&mut add),
        VendorOutput::Best(item) => add(item),
    }

    let total = scores.entailment + scores.neutral + scores.contradiction;
    if total > 1.0 {
        let denom = total * (1.0 + NORMALIZATION_EPSILON);
        scores.entailment /= denom;
        scores.neutral /= denom;
        scores.contradiction /= denom;
    }
    scores
}

/// Entailment capability plus label remapping.
#[derive(Clone)]
pub struct EntailmentAdapter {
    classifier: Arc<dyn EntailmentClassifier>,
}

impl EntailmentAdapter {
    pub fn new(classifier: Arc<dyn EntailmentClassifier>) -> Self {
        Self { classifier }
    }

    pub fn name(&self) -> &str {
        self.classifier.name()
    }

    pub async fn scores(&self, premise: &str, hypothesis: &str) -> Result<EntailmentScores, ProviderError> {
        let raw = self.classifier.classify(premise, hypothesis).await?;
        Ok(normalize_entailment(&raw, self.classifier.label_scheme()))
    }
}
