// Sentiment Analyzer
// Orchestrates one analysis: segment -> (parallel clause scoring) -> aggregate
// -> (parallel entailment queries) -> sarcasm flag -> adjust

use crate::models::{AnalysisReport, AnalysisResult, Clause, ClauseScore, ProbabilityTriple, SarcasmCue};
use crate::services::clause_segmenter::ClauseSegmenter;
use crate::services::config_store::{AggregationPolicy, AnalyzerConfig, ConfigError};
use crate::services::providers::ProviderError;
use crate::services::text_processor::normalize_punctuation;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};
use uuid::Uuid;

use super::adjustment::ResultAdjuster;
use super::aggregation::aggregate;
use super::aspect_tagger::AspectTagger;
use super::classifiers::{EntailmentAdapter, EntailmentClassifier, ValenceAdapter, ValenceClassifier, ValenceLabelRules};
use super::sarcasm::SarcasmDetector;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Classifier failed: {0}")]
    Classifier(#[from] ProviderError),
    #[error("Clause scoring task failed: {0}")]
    Task(String),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Stateless review analyzer. Safe to share across concurrent `analyze` calls.
pub struct SentimentAnalyzer {
    segmenter: ClauseSegmenter,
    tagger: AspectTagger,
    valence: ValenceAdapter,
    sarcasm: SarcasmDetector,
    adjuster: ResultAdjuster,
    policy: AggregationPolicy,
    max_concurrency: usize,
}

impl SentimentAnalyzer {
    pub fn new(
        valence: Arc<dyn ValenceClassifier>,
        entailment: Arc<dyn EntailmentClassifier>,
        config: &AnalyzerConfig,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            segmenter: ClauseSegmenter::new(&config.lexicon)?,
            tagger: AspectTagger::new(&config.lexicon),
            valence: ValenceAdapter::new(valence, ValenceLabelRules::from_lexicon(&config.lexicon)),
            sarcasm: SarcasmDetector::new(EntailmentAdapter::new(entailment), config),
            adjuster: ResultAdjuster::from_thresholds(&config.thresholds),
            policy: config.aggregation,
            max_concurrency: config.max_concurrency.max(1),
        })
    }

    pub fn with_defaults(
        valence: Arc<dyn ValenceClassifier>,
        entailment: Arc<dyn EntailmentClassifier>,
    ) -> Result<Self, AnalysisError> {
        Self::new(valence, entailment, &AnalyzerConfig::default())
    }

    pub async fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalysisError> {
        Ok(self.analyze_detailed(text).await?.result)
    }

    /// Analyze `text` and keep the clause-level evidence and the sarcasm cue.
    pub async fn analyze_detailed(&self, text: &str) -> Result<AnalysisReport, AnalysisError> {
        let analysis_id = Uuid::new_v4();
        let started = Instant::now();

        let text = normalize_punctuation(text);
        if text.is_empty() {
            info!("[ANALYZER] id={} empty input, skipping classifiers", analysis_id);
            return Ok(AnalysisReport {
                result: AnalysisResult::degenerate(),
                clauses: Vec::new(),
                sarcasm_cue: SarcasmCue::None,
            });
        }

        let clauses = self.segmenter.segment(&text);
        info!(
            "[ANALYZER] id={} chars={} clauses={} valence={}",
            analysis_id,
            text.chars().count(),
            clauses.len(),
            self.valence.name()
        );

        let clause_probs = self.score_clauses(&clauses).await?;
        let clause_scores: Vec<ClauseScore> = clauses
            .iter()
            .zip(clause_probs)
            .map(|(clause, probs)| ClauseScore {
                text: clause.as_str().to_string(),
                probs,
                aspects: self.tagger.tag(clause),
            })
            .collect();

        for score in &clause_scores {
            debug!(
                "[ANALYZER] id={} clause={:?} aspects={:?} P={:.3} U={:.3} N={:.3}",
                analysis_id, score.text, score.aspects, score.probs.positive, score.probs.neutral, score.probs.negative
            );
        }

        let scored: Vec<_> = clause_scores.iter().map(|c| (c.probs, c.aspects.clone())).collect();
        let outcome = aggregate(&scored, self.policy);

        let sarcasm_cue = self.sarcasm.assess(&text, &outcome.overall).await?;
        let sarcasm = sarcasm_cue.is_flagged();
        let (probs, overall) = self.adjuster.adjust(outcome.overall, outcome.label, sarcasm);

        info!(
            "[ANALYZER] id={} overall={} sarcasm={} cue={:?} adjusted={} elapsed_ms={}",
            analysis_id,
            overall,
            sarcasm,
            sarcasm_cue,
            probs != outcome.overall,
            started.elapsed().as_millis()
        );

        Ok(AnalysisReport {
            result: AnalysisResult {
                overall,
                probs,
                sarcasm,
                aspects: outcome.aspects,
            },
            clauses: clause_scores,
            sarcasm_cue,
        })
    }

    /// Score every clause, at most `max_concurrency` in flight. Output order matches input order.
    async fn score_clauses(&self, clauses: &[Clause]) -> Result<Vec<ProbabilityTriple>, AnalysisError> {
        if let [only] = clauses {
            return Ok(vec![self.valence.classify(only.as_str()).await?]);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set: JoinSet<Result<(usize, ProbabilityTriple), AnalysisError>> = JoinSet::new();

        for (idx, clause) in clauses.iter().enumerate() {
            let valence = self.valence.clone();
            let semaphore = semaphore.clone();
            let text = clause.as_str().to_string();

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| AnalysisError::Task("semaphore closed".to_string()))?;
                let probs = valence.classify(&text).await?;
                Ok::<_, AnalysisError>((idx, probs))
            });
        }

        // Returning early drops the set, which aborts the remaining tasks.
        let mut results: Vec<Option<ProbabilityTriple>> = vec![None; clauses.len()];
        while let Some(joined) = join_set.join_next().await {
            let (idx, probs) = joined.map_err(|e| AnalysisError::Task(e.to_string()))??;
            results[idx] = Some(probs);
        }

        results
            .into_iter()
            .enumerate()
            .map(|(idx, probs)| probs.ok_or_else(|| AnalysisError::Task(format!("clause {} was not scored", idx))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabelScore, Sentiment, VendorOutput};
    use crate::services::detection::lexicon::NeutralEntailmentClassifier;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic valence keyed on cue words; counts calls.
    #[derive(Default)]
    struct KeywordValence {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ValenceClassifier for KeywordValence {
        async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let lower = text.to_lowercase();
            let pos = ["great", "amazing", "best"].iter().any(|w| lower.contains(w));
            let neg = ["terrible", "crashes", "awful"].iter().any(|w| lower.contains(w));
            let (p, u, n) = match (pos, neg) {
                (true, true) => (0.44, 0.36, 0.20),
                (true, false) => (0.8, 0.1, 0.1),
                (false, true) => (0.1, 0.1, 0.8),
                (false, false) => (0.1, 0.8, 0.1),
            };
            // Vendor-style labels exercise the adapter's normalization.
            Ok(vec![
                LabelScore::new("Positive", p),
                LabelScore::new("Neutral", u),
                LabelScore::new("Negative", n),
            ])
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    struct FailingValence;

    #[async_trait]
    impl ValenceClassifier for FailingValence {
        async fn classify(&self, _text: &str) -> Result<Vec<LabelScore>, ProviderError> {
            Err(ProviderError::Unavailable("valence offline".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    /// Contradicts the positive hypothesis with a fixed probability.
    struct ContradictPositive(f64);

    #[async_trait]
    impl EntailmentClassifier for ContradictPositive {
        async fn classify(&self, _premise: &str, hypothesis: &str) -> Result<VendorOutput, ProviderError> {
            let c = if hypothesis.contains("positive") { self.0 } else { 0.0 };
            Ok(VendorOutput::Best(LabelScore::new("LABEL_0", c)))
        }

        fn name(&self) -> &str {
            "contradict-positive"
        }
    }

    fn analyzer_with(valence: Arc<dyn ValenceClassifier>, entailment: Arc<dyn EntailmentClassifier>) -> SentimentAnalyzer {
        SentimentAnalyzer::with_defaults(valence, entailment).unwrap()
    }

    fn analyzer() -> SentimentAnalyzer {
        analyzer_with(Arc::new(KeywordValence::default()), Arc::new(NeutralEntailmentClassifier))
    }

    fn assert_distribution(p: &ProbabilityTriple) {
        for v in [p.positive, p.neutral, p.negative] {
            assert!((0.0..=1.0).contains(&v), "component out of range: {:?}", p);
        }
        assert!((p.sum() - 1.0).abs() < 1e-6, "sum != 1: {:?}", p);
    }

    #[tokio::test]
    async fn test_empty_input_is_degenerate_without_classifier_calls() {
        let valence = Arc::new(KeywordValence::default());
        let analyzer = analyzer_with(valence.clone(), Arc::new(NeutralEntailmentClassifier));

        assert_eq!(analyzer.analyze("").await.unwrap(), AnalysisResult::degenerate());
        assert_eq!(analyzer.analyze("   ").await.unwrap(), AnalysisResult::degenerate());
        assert_eq!(valence.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_multipolar_review() {
        let report = analyzer()
            .analyze_detailed("Great camera but terrible battery life.")
            .await
            .unwrap();
        let result = &report.result;

        assert_eq!(result.aspects.len(), 2);
        assert_eq!(result.aspects["camera"].label, Sentiment::Positive);
        assert_eq!(result.aspects["battery"].label, Sentiment::Negative);
        assert!(!result.sarcasm);
        assert_eq!(report.sarcasm_cue, SarcasmCue::None);
        assert_distribution(&result.probs);

        let texts: Vec<&str> = report.clauses.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Great camera", "terrible battery life"]);
    }

    #[tokio::test]
    async fn test_analyze_is_deterministic() {
        let analyzer = analyzer();
        let text = "Amazing screen, awful speaker; the app is fine, but battery is great.";
        let first = analyzer.analyze(text).await.unwrap();
        let second = analyzer.analyze(text).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_probabilities_are_distributions() {
        let analyzer = analyzer();
        for text in [
            "fine",
            "Great camera but terrible battery life.",
            "The amazing update crashes daily",
            "but , ;",
            "Screen, battery, camera, speed: all terrible",
        ] {
            let result = analyzer.analyze(text).await.unwrap();
            assert_distribution(&result.probs);
            for aspect in result.aspects.values() {
                assert_distribution(&aspect.probs);
            }
        }
    }

    #[tokio::test]
    async fn test_guardrail_sarcasm_softens_weak_positive() {
        let report = analyzer().analyze_detailed("The amazing update crashes daily").await.unwrap();
        let result = &report.result;

        assert!(result.sarcasm);
        assert!(matches!(report.sarcasm_cue, SarcasmCue::Proximity { .. }));
        assert!((result.probs.positive - 0.34).abs() < 1e-6);
        assert!((result.probs.neutral - 0.46).abs() < 1e-6);
        assert_eq!(result.overall, Sentiment::Neutral);
        // Aspect view keeps the unadjusted clause evidence.
        assert_eq!(result.aspects["software"].label, Sentiment::Positive);
    }

    #[tokio::test]
    async fn test_strong_positive_survives_entailment_flag() {
        let analyzer = analyzer_with(Arc::new(KeywordValence::default()), Arc::new(ContradictPositive(0.9)));
        let report = analyzer.analyze_detailed("Best phone ever, great camera").await.unwrap();

        assert!(report.result.sarcasm);
        assert!(matches!(
            report.sarcasm_cue,
            SarcasmCue::Entailment { hypothesis: Sentiment::Positive, .. }
        ));
        assert_eq!(report.result.overall, Sentiment::Positive);
        assert!((report.result.probs.positive - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_valence_failure_propagates() {
        let analyzer = analyzer_with(Arc::new(FailingValence), Arc::new(NeutralEntailmentClassifier));
        let err = analyzer.analyze("Great camera but terrible battery").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Classifier(ProviderError::Unavailable(_))));

        let err = analyzer.analyze("single clause").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Classifier(_)));
    }

    #[tokio::test]
    async fn test_clause_order_with_limited_concurrency() {
        let config = AnalyzerConfig {
            max_concurrency: 2,
            ..AnalyzerConfig::default()
        };
        let analyzer = SentimentAnalyzer::new(
            Arc::new(KeywordValence::default()),
            Arc::new(NeutralEntailmentClassifier),
            &config,
        )
        .unwrap();

        let text = "one, two, three, four, five, six, seven";
        let report = analyzer.analyze_detailed(text).await.unwrap();
        let texts: Vec<&str> = report.clauses.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three", "four", "five", "six", "seven"]);
        assert_eq!(report.result.aspects.len(), 1);
        assert_eq!(report.result.overall, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn test_per_clause_policy() {
        let text = "Great camera, great photo, great picture, terrible battery";
        let per_aspect = analyzer().analyze(text).await.unwrap();

        let config = AnalyzerConfig {
            aggregation: AggregationPolicy::PerClause,
            ..AnalyzerConfig::default()
        };
        let per_clause = SentimentAnalyzer::new(
            Arc::new(KeywordValence::default()),
            Arc::new(NeutralEntailmentClassifier),
            &config,
        )
        .unwrap()
        .analyze(text)
        .await
        .unwrap();

        assert!(per_clause.probs.positive > per_aspect.probs.positive);
        assert_eq!(per_clause.aspects, per_aspect.aspects);
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let analyzer = Arc::new(analyzer());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let analyzer = analyzer.clone();
            handles.push(tokio::spawn(async move {
                analyzer.analyze("Great camera but terrible battery life.").await
            }));
        }
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnalyzerConfig::default();
        config.thresholds.sarcasm_contradiction = -0.1;
        let result = SentimentAnalyzer::new(
            Arc::new(KeywordValence::default()),
            Arc::new(NeutralEntailmentClassifier),
            &config,
        );
        assert!(matches!(
            result,
            Err(AnalysisError::Config(ConfigError::InvalidThreshold { .. }))
        ));
    }
}
