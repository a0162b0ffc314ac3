// Offline Classifiers
// Lexicon-based valence scoring and a neutral entailment stand-in, used when no
// inference endpoint is configured.

use crate::models::{LabelScore, VendorOutput};
use crate::services::config_store::LexiconConfig;
use crate::services::providers::ProviderError;
use crate::services::text_processor::word_tokens;
use async_trait::async_trait;
use std::collections::HashSet;

use super::classifiers::{EntailmentClassifier, ValenceClassifier};

const POSITIVE_LEXICON: &[&str] = &[
    "good", "great", "excellent", "love", "loved", "amazing", "wonderful", "happy", "fantastic",
    "awesome", "best", "perfect", "nice", "solid", "smooth", "bright", "sharp", "fast", "reliable",
    "impressive", "recommend",
];

const NEGATIVE_LEXICON: &[&str] = &[
    "bad", "terrible", "awful", "hate", "horrible", "worst", "poor", "disappointed", "disappointing",
    "slow", "broken", "useless", "dim", "blurry", "laggy", "buggy", "annoying", "weak", "dies",
];

const NEGATORS: &[&str] = &["not", "no", "never", "t", "hardly", "barely"];

/// Counts lexicon hits; a negator directly before a hit flips its polarity.
pub struct LexiconValenceClassifier {
    positive: HashSet<String>,
    negative: HashSet<String>,
    negators: HashSet<String>,
}

impl LexiconValenceClassifier {
    pub fn new(lexicon: &LexiconConfig) -> Self {
        let own = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<HashSet<_>>();
        let mut positive = own(POSITIVE_LEXICON);
        positive.extend(lexicon.positive_words.iter().map(|w| w.trim().to_lowercase()));
        let mut negative = own(NEGATIVE_LEXICON);
        negative.extend(lexicon.negative_actions.iter().map(|w| w.trim().to_lowercase()));

        Self {
            positive,
            negative,
            negators: own(NEGATORS),
        }
    }

    /// (positive hits, negative hits) after negation.
    pub fn count_hits(&self, text: &str) -> (usize, usize) {
        let tokens = word_tokens(text);
        let mut pos = 0usize;
        let mut neg = 0usize;
        for (i, token) in tokens.iter().enumerate() {
            let negated = i > 0 && self.negators.contains(&tokens[i - 1].text);
            let (is_pos, is_neg) = (self.positive.contains(&token.text), self.negative.contains(&token.text));
            match (is_pos, is_neg, negated) {
                (true, false, false) | (false, true, true) => pos += 1,
                (false, true, false) | (true, false, true) => neg += 1,
                _ => {}
            }
        }
        (pos, neg)
    }
}

impl Default for LexiconValenceClassifier {
    fn default() -> Self {
        Self::new(&LexiconConfig::default())
    }
}

#[async_trait]
impl ValenceClassifier for LexiconValenceClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, ProviderError> {
        let (pos, neg) = self.count_hits(text);
        // One pseudo-count of neutral evidence keeps hit-free text neutral.
        let total = (pos + neg + 1) as f64;
        Ok(vec![
            LabelScore::new("positive", pos as f64 / total),
            LabelScore::new("neutral", 1.0 / total),
            LabelScore::new("negative", neg as f64 / total),
        ])
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

/// Never contradicts anything; sarcasm then depends on the proximity cue alone.
#[derive(Debug, Default)]
pub struct NeutralEntailmentClassifier;

#[async_trait]
impl EntailmentClassifier for NeutralEntailmentClassifier {
    async fn classify(&self, _premise: &str, _hypothesis: &str) -> Result<VendorOutput, ProviderError> {
        Ok(VendorOutput::Best(LabelScore::new("NEUTRAL", 1.0)))
    }

    fn name(&self) -> &str {
        "neutral"
    }
}
