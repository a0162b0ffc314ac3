// Detection Module
// Review sentiment pipeline organized into specialized submodules:
// - aspect_tagger: Maps clauses to aspect buckets via keywords
// - classifiers: Valence/entailment classifier seams and vendor label normalization
// - lexicon: Offline classifiers used when no endpoint is configured
// - aggregation: Folds clause distributions into aspect and overall distributions
// - sarcasm: Entailment contradiction check plus proximity guardrail
// - adjustment: Softens weak positive reads flagged as sarcastic
// - analyzer: End-to-end orchestration

pub mod aspect_tagger;
pub mod classifiers;
pub mod lexicon;
pub mod aggregation;
pub mod sarcasm;
pub mod adjustment;
pub mod analyzer;

// Re-export commonly used items
pub use aspect_tagger::AspectTagger;
pub use classifiers::{
    normalize_entailment,
    EntailmentAdapter,
    EntailmentClassifier,
    ValenceAdapter,
    ValenceClassifier,
    ValenceLabelRules,
};
pub use lexicon::{LexiconValenceClassifier, NeutralEntailmentClassifier};
pub use aggregation::{aggregate, AggregateOutcome};
pub use sarcasm::{dominant_polarity, ProximityGuardrail, ProximityHit, SarcasmDetector};
pub use adjustment::ResultAdjuster;
pub use analyzer::{AnalysisError, SentimentAnalyzer};
