// Clause Segmenter
// Splits review text into independently scored clauses on punctuation and contrastive conjunctions

use crate::models::Clause;
use crate::services::config_store::{ConfigError, LexiconConfig};
use regex::Regex;

/// Sentence punctuation treated as a clause boundary.
const CLAUSE_PUNCTUATION: &str = r"[.;,]";

#[derive(Debug, Clone)]
pub struct ClauseSegmenter {
    delimiter: Regex,
}

impl ClauseSegmenter {
    /// Build the delimiter pattern from the configured contrastive conjunctions.
    ///
    /// Multi-word contrastives ("even though") match across any whitespace run.
    /// Alternation order follows the configured order, so longer phrases should
    /// be listed before their suffixes.
    pub fn new(lexicon: &LexiconConfig) -> Result<Self, ConfigError> {
        let conjunctions: Vec<String> = lexicon
            .contrastives
            .iter()
            .map(|c| {
                c.split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .filter(|c| !c.is_empty())
            .collect();

        let pattern = if conjunctions.is_empty() {
            CLAUSE_PUNCTUATION.to_string()
        } else {
            format!(r"(?i){}|\b(?:{})\b", CLAUSE_PUNCTUATION, conjunctions.join("|"))
        };

        let delimiter = Regex::new(&pattern)
            .map_err(|e| ConfigError::InvalidLexicon(format!("contrastive pattern: {}", e)))?;
        Ok(Self { delimiter })
    }

    /// Split `text` into trimmed, non-empty clauses in their original order.
    ///
    /// Falls back to the whole trimmed text when no fragment survives; returns
    /// an empty list only for blank input.
    pub fn segment(&self, text: &str) -> Vec<Clause> {
        let clauses: Vec<Clause> = self.delimiter.split(text).filter_map(Clause::new).collect();
        if !clauses.is_empty() {
            return clauses;
        }
        Clause::new(text).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> ClauseSegmenter {
        ClauseSegmenter::new(&LexiconConfig::default()).unwrap()
    }

    fn texts(clauses: &[Clause]) -> Vec<&str> {
        clauses.iter().map(|c| c.as_str()).collect()
    }

    #[test]
    fn test_contrastive_split() {
        let clauses = segmenter().segment("Great camera but terrible battery life.");
        assert_eq!(texts(&clauses), vec!["Great camera", "terrible battery life"]);
    }

    #[test]
    fn test_case_insensitive_and_punctuation() {
        let clauses = segmenter().segment("Screen is bright; HOWEVER the app lags, sadly.");
        assert_eq!(texts(&clauses), vec!["Screen is bright", "the app lags", "sadly"]);
    }

    #[test]
    fn test_even_though_is_one_delimiter() {
        let clauses = segmenter().segment("I like it even though it overheats");
        assert_eq!(texts(&clauses), vec!["I like it", "it overheats"]);
    }

    #[test]
    fn test_conjunction_inside_word_is_kept() {
        let clauses = segmenter().segment("The butter-smooth UI is yetis approved");
        assert_eq!(texts(&clauses), vec!["The butter-smooth UI is yetis approved"]);
    }

    #[test]
    fn test_single_clause_fallback() {
        let clauses = segmenter().segment("  It's fine I guess  ");
        assert_eq!(texts(&clauses), vec!["It's fine I guess"]);

        let only_delimiters = segmenter().segment(" but . , ");
        assert_eq!(texts(&only_delimiters), vec!["but . ,"]);
    }

    #[test]
    fn test_blank_input_is_empty() {
        assert!(segmenter().segment("   ").is_empty());
    }

    #[test]
    fn test_no_contrastives_configured() {
        let lexicon = LexiconConfig {
            contrastives: Vec::new(),
            ..LexiconConfig::default()
        };
        let clauses = ClauseSegmenter::new(&lexicon).unwrap().segment("Good but slow. Fine");
        assert_eq!(texts(&clauses), vec!["Good but slow", "Fine"]);
    }
}
