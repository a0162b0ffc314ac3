// Aspect Tagger
// Keyword lookup from a clause to the topic buckets it talks about

use crate::models::{Clause, GENERAL_ASPECT};
use crate::services::config_store::LexiconConfig;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct AspectTagger {
    /// (aspect, lowercased keywords), sorted by aspect label.
    buckets: Vec<(String, Vec<String>)>,
}

impl AspectTagger {
    pub fn new(lexicon: &LexiconConfig) -> Self {
        let buckets = lexicon
            .aspect_keywords
            .iter()
            .map(|(aspect, keywords)| {
                let keywords = keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (aspect.clone(), keywords)
            })
            .collect();
        Self { buckets }
    }

    /// Case-insensitive substring match against every bucket; never returns an empty set.
    pub fn tag(&self, clause: &Clause) -> BTreeSet<String> {
        self.tag_text(clause.as_str())
    }

    pub fn tag_text(&self, text: &str) -> BTreeSet<String> {
        let lower = text.to_lowercase();
        let mut found: BTreeSet<String> = self
            .buckets
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|(aspect, _)| aspect.clone())
            .collect();

        if found.is_empty() {
            found.insert(GENERAL_ASPECT.to_string());
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tagger() -> AspectTagger {
        AspectTagger::new(&LexiconConfig::default())
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_aspect() {
        assert_eq!(tagger().tag_text("The camera is amazing"), set(&["camera"]));
    }

    #[test]
    fn test_general_fallback() {
        assert_eq!(tagger().tag_text("It's fine I guess"), set(&["general"]));
    }

    #[test]
    fn test_multiple_aspects_case_insensitive() {
        assert_eq!(
            tagger().tag_text("SCREEN brightness kills the BATTERY"),
            set(&["battery", "display"])
        );
    }

    #[test]
    fn test_tag_clause() {
        let clause = Clause::new(" terrible battery life ").unwrap();
        assert_eq!(tagger().tag(&clause), set(&["battery"]));
    }

    #[test]
    fn test_custom_buckets() {
        let mut aspect_keywords = BTreeMap::new();
        aspect_keywords.insert("shipping".to_string(), vec!["Delivery".to_string(), " ".to_string()]);
        let lexicon = LexiconConfig {
            aspect_keywords,
            ..LexiconConfig::default()
        };
        let tagger = AspectTagger::new(&lexicon);
        assert_eq!(tagger.tag_text("delivery was late"), set(&["shipping"]));
        // Blank keywords are dropped instead of matching everything.
        assert_eq!(tagger.tag_text("nice colour"), set(&["general"]));
    }
}
