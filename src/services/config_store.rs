// Configuration Storage Service
// Analyzer lexicons/thresholds plus provider settings, with config file read/write and version backup

use crate::models::Sentiment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_DIR_NAME: &str = "reviewsense";
const MAX_BACKUPS: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid threshold {name}: {value} (expected 0.0..=1.0)")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error("Invalid lexicon: {0}")]
    InvalidLexicon(String),
    #[error("Config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============ Analyzer Configuration ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexiconConfig {
    #[serde(default = "default_contrastives")]
    pub contrastives: Vec<String>,
    #[serde(default = "default_aspect_keywords")]
    pub aspect_keywords: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_positive_words")]
    pub positive_words: Vec<String>,
    #[serde(default = "default_negative_actions")]
    pub negative_actions: Vec<String>,
    #[serde(default = "default_positive_label_tokens")]
    pub positive_label_tokens: Vec<String>,
    #[serde(default = "default_negative_label_tokens")]
    pub negative_label_tokens: Vec<String>,
    /// Exact vendor label (case-insensitive) to canonical label, checked before substring rules.
    #[serde(default)]
    pub label_aliases: BTreeMap<String, Sentiment>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            contrastives: default_contrastives(),
            aspect_keywords: default_aspect_keywords(),
            positive_words: default_positive_words(),
            negative_actions: default_negative_actions(),
            positive_label_tokens: default_positive_label_tokens(),
            negative_label_tokens: default_negative_label_tokens(),
            label_aliases: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    /// Contradiction probability against the dominant hypothesis that flags sarcasm (exclusive).
    #[serde(default = "default_sarcasm_contradiction")]
    pub sarcasm_contradiction: f64,
    /// Positive-minus-negative margin below which a sarcastic positive read is softened (exclusive).
    #[serde(default = "default_adjustment_margin")]
    pub adjustment_margin: f64,
    /// Probability mass moved from Positive to Neutral by the adjustment.
    #[serde(default = "default_adjustment_shift")]
    pub adjustment_shift: f64,
    /// Maximum number of tokens between a positive word and a negative action.
    #[serde(default = "default_proximity_window")]
    pub proximity_window: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            sarcasm_contradiction: default_sarcasm_contradiction(),
            adjustment_margin: default_adjustment_margin(),
            adjustment_shift: default_adjustment_shift(),
            proximity_window: default_proximity_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HypothesisConfig {
    #[serde(default = "default_positive_hypothesis")]
    pub positive: String,
    #[serde(default = "default_negative_hypothesis")]
    pub negative: String,
}

impl Default for HypothesisConfig {
    fn default() -> Self {
        Self {
            positive: default_positive_hypothesis(),
            negative: default_negative_hypothesis(),
        }
    }
}

/// How per-aspect means are combined into the overall distribution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationPolicy {
    /// One vote per aspect regardless of how many clauses it has.
    #[default]
    PerAspect,
    /// One vote per clause-to-aspect assignment.
    PerClause,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub lexicon: LexiconConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub hypotheses: HypothesisConfig,
    #[serde(default)]
    pub aggregation: AggregationPolicy,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            lexicon: LexiconConfig::default(),
            thresholds: ThresholdConfig::default(),
            hypotheses: HypothesisConfig::default(),
            aggregation: AggregationPolicy::default(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        for (name, value) in [
            ("sarcasmContradiction", t.sarcasm_contradiction),
            ("adjustmentMargin", t.adjustment_margin),
            ("adjustmentShift", t.adjustment_shift),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        if self.lexicon.aspect_keywords.keys().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::InvalidLexicon("aspect label must not be empty".to_string()));
        }
        if self.lexicon.contrastives.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidLexicon("contrastive must not be empty".to_string()));
        }
        Ok(())
    }
}

// ============ Application Configuration ============

/// Positional label order of an entailment checkpoint emitting `LABEL_n`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntailmentLabelScheme {
    /// LABEL_0 contradiction, LABEL_1 neutral, LABEL_2 entailment (roberta-large-mnli, bart-large-mnli).
    #[default]
    RobertaMnli,
    /// LABEL_0 entailment, LABEL_1 neutral, LABEL_2 contradiction.
    EntailmentFirst,
    /// LABEL_0 contradiction, LABEL_1 entailment, LABEL_2 neutral (cross-encoder NLI models).
    CrossEncoder,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    pub enabled: bool,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub label_scheme: EntailmentLabelScheme,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub analysis: AnalyzerConfig,
    #[serde(default)]
    pub valence: ProviderConfig,
    #[serde(default)]
    pub entailment: ProviderConfig,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_contrastives() -> Vec<String> {
    // "even though" precedes "though" so the longer phrase wins the alternation.
    strings(&["but", "however", "even though", "though", "yet", "although", "nevertheless", "nonetheless"])
}

fn default_aspect_keywords() -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();
    map.insert("camera".to_string(), strings(&["camera", "photo", "image", "picture"]));
    map.insert("battery".to_string(), strings(&["battery", "charge", "power", "life"]));
    map.insert("performance".to_string(), strings(&["performance", "speed", "lag", "slow", "fast"]));
    map.insert("display".to_string(), strings(&["display", "screen", "brightness", "resolution"]));
    map.insert("software".to_string(), strings(&["software", "update", "app", "ui", "os"]));
    map
}

fn default_positive_words() -> Vec<String> {
    strings(&["great", "amazing", "awesome", "fantastic", "love", "perfect", "wonderful", "excellent"])
}

fn default_negative_actions() -> Vec<String> {
    strings(&["breaks", "crashes", "ruins", "fails", "bugs", "freezes", "lags", "drains", "overheats"])
}

fn default_positive_label_tokens() -> Vec<String> { strings(&["5 stars", "4 stars"]) }
fn default_negative_label_tokens() -> Vec<String> { strings(&["1 star", "2 stars"]) }
fn default_sarcasm_contradiction() -> f64 { 0.6 }
fn default_adjustment_margin() -> f64 { 0.25 }
fn default_adjustment_shift() -> f64 { 0.10 }
fn default_proximity_window() -> usize { 6 }
fn default_positive_hypothesis() -> String { "This review is positive.".to_string() }
fn default_negative_hypothesis() -> String { "This review is negative.".to_string() }
fn default_max_concurrency() -> usize { 4 }

// ============ Config Store ============

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Store backed by an explicit file; backups go next to it.
    pub fn from_file(config_file: PathBuf) -> Self {
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { config_dir, config_file }
    }

    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir)?;
        Ok(())
    }

    /// Load configuration; a missing file yields the defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.analysis.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        config.analysis.validate()?;
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content)?;
        Ok(())
    }

    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));
        fs::copy(&self.config_file, &backup_file)?;

        self.cleanup_old_backups(&backup_dir, MAX_BACKUPS)
    }

    /// Remove old backups, keeping only the most recent `keep`
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Timestamped names sort chronologically.
        entries.sort_by_key(|e| e.file_name());

        let remove_count = entries.len() - keep;
        for entry in entries.iter().take(remove_count) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, ConfigError> {
        let config = self.load()?;
        Ok(config.api_keys.get(provider).cloned())
    }

    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }

    pub fn delete_api_key(&self, provider: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }

    /// Base URL override for the "valence" or "entailment" provider.
    pub fn get_provider_url(&self, provider: &str) -> Result<Option<String>, ConfigError> {
        let config = self.load()?;
        Ok(match provider {
            "valence" => config.valence.base_url,
            "entailment" => config.entailment.base_url,
            _ => None,
        })
    }

    pub fn set_provider_url(&self, provider: &str, url: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        let target = match provider {
            "valence" => &mut config.valence,
            "entailment" => &mut config.entailment,
            other => return Err(ConfigError::InvalidLexicon(format!("unknown provider: {}", other))),
        };
        target.base_url = Some(url.to_string());
        self.save(&config)
    }
}
