// Sarcasm Detection
// Primary: entailment contradiction between the review and its dominant polarity.
// Secondary: a positive word within a few tokens of a negative action.

use crate::models::{ProbabilityTriple, SarcasmCue, Sentiment};
use crate::services::config_store::{AnalyzerConfig, HypothesisConfig};
use crate::services::providers::ProviderError;
use crate::services::text_processor::word_tokens;
use std::collections::HashSet;
use tracing::debug;

use super::classifiers::EntailmentAdapter;

/// A positive word and a negative action found near each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProximityHit {
    pub positive: String,
    pub negative: String,
    /// Number of tokens between the two words.
    pub distance: usize,
}

/// Deterministic lexical backstop for "great camera, but it constantly crashes".
#[derive(Debug, Clone)]
pub struct ProximityGuardrail {
    positive_words: HashSet<String>,
    negative_actions: HashSet<String>,
    window: usize,
}

impl ProximityGuardrail {
    pub fn new<P, N>(positive_words: P, negative_actions: N, window: usize) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        let normalize = |w: &str| w.trim().to_lowercase();
        Self {
            positive_words: positive_words.into_iter().map(|w| normalize(w.as_ref())).collect(),
            negative_actions: negative_actions.into_iter().map(|w| normalize(w.as_ref())).collect(),
            window,
        }
    }

    /// Closest qualifying pair in either order; ties go to the earliest positive word.
    pub fn find(&self, text: &str) -> Option<ProximityHit> {
        let tokens = word_tokens(text);
        let positives: Vec<_> = tokens.iter().filter(|t| self.positive_words.contains(&t.text)).collect();
        if positives.is_empty() {
            return None;
        }
        let negatives: Vec<_> = tokens.iter().filter(|t| self.negative_actions.contains(&t.text)).collect();

        let mut best: Option<ProximityHit> = None;
        for p in &positives {
            for n in &negatives {
                let distance = p.index.abs_diff(n.index).saturating_sub(1);
                if distance > self.window {
                    continue;
                }
                if best.as_ref().map_or(true, |b| distance < b.distance) {
                    best = Some(ProximityHit {
                        positive: p.text.clone(),
                        negative: n.text.clone(),
                        distance,
                    });
                }
            }
        }
        best
    }
}

pub struct SarcasmDetector {
    entailment: EntailmentAdapter,
    hypotheses: HypothesisConfig,
    contradiction_threshold: f64,
    guardrail: ProximityGuardrail,
}

impl SarcasmDetector {
    pub fn new(entailment: EntailmentAdapter, config: &AnalyzerConfig) -> Self {
        Self {
            entailment,
            hypotheses: config.hypotheses.clone(),
            contradiction_threshold: config.thresholds.sarcasm_contradiction,
            guardrail: ProximityGuardrail::new(
                &config.lexicon.positive_words,
                &config.lexicon.negative_actions,
                config.thresholds.proximity_window,
            ),
        }
    }

    pub async fn detect(&self, text: &str, overall: &ProbabilityTriple) -> Result<bool, ProviderError> {
        Ok(self.assess(text, overall).await?.is_flagged())
    }

    /// Run both tiers and report which one fired.
    ///
    /// Both polarity hypotheses are queried concurrently; the guardrail is only
    /// consulted when the entailment tier did not flag.
    pub async fn assess(&self, text: &str, overall: &ProbabilityTriple) -> Result<SarcasmCue, ProviderError> {
        let (positive, negative) = tokio::try_join!(
            self.entailment.scores(text, &self.hypotheses.positive),
            self.entailment.scores(text, &self.hypotheses.negative),
        )?;

        let dominant = dominant_polarity(overall);
        let contradiction = match dominant {
            Sentiment::Negative => negative.contradiction,
            _ => positive.contradiction,
        };
        debug!(
            "[SARCASM] model={} dominant={} c_pos={:.3} c_neg={:.3} threshold={}",
            self.entailment.name(),
            dominant,
            positive.contradiction,
            negative.contradiction,
            self.contradiction_threshold
        );

        if contradiction > self.contradiction_threshold {
            return Ok(SarcasmCue::Entailment {
                hypothesis: dominant,
                contradiction,
            });
        }

        Ok(match self.guardrail.find(text) {
            Some(hit) => {
                debug!(
                    "[SARCASM] proximity cue {} ~ {} distance={}",
                    hit.positive, hit.negative, hit.distance
                );
                SarcasmCue::Proximity {
                    positive: hit.positive,
                    negative: hit.negative,
                    distance: hit.distance,
                }
            }
            None => SarcasmCue::None,
        })
    }
}

/// Positive or Negative, whichever is larger; ties favor Positive.
pub fn dominant_polarity(probs: &ProbabilityTriple) -> Sentiment {
    if probs.positive >= probs.negative {
        Sentiment::Positive
    } else {
        Sentiment::Negative
    }
}
