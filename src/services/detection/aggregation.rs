// Aggregation Logic
// Combines per-clause valence distributions into per-aspect and overall distributions

use crate::models::{AspectResult, ProbabilityTriple, Sentiment};
use crate::services::config_store::AggregationPolicy;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutcome {
    pub overall: ProbabilityTriple,
    pub label: Sentiment,
    pub aspects: BTreeMap<String, AspectResult>,
}

impl AggregateOutcome {
    fn empty() -> Self {
        let overall = ProbabilityTriple::neutral_point();
        Self {
            overall,
            label: overall.label(),
            aspects: BTreeMap::new(),
        }
    }
}

/// Aggregate scored clauses into aspect means and the overall distribution.
///
/// Each aspect's triple is the mean of its clauses. Under `PerAspect` the overall
/// distribution is the mean of the aspect means (one vote per aspect); under
/// `PerClause` it is the mean over all clauses. Aspects are visited in label
/// order, so identical input yields bit-identical output.
pub fn aggregate(
    scored: &[(ProbabilityTriple, BTreeSet<String>)],
    policy: AggregationPolicy,
) -> AggregateOutcome {
    if scored.is_empty() {
        return AggregateOutcome::empty();
    }

    let mut by_aspect: BTreeMap<&str, Vec<ProbabilityTriple>> = BTreeMap::new();
    for (probs, aspects) in scored {
        for aspect in aspects {
            by_aspect.entry(aspect.as_str()).or_default().push(*probs);
        }
    }

    let aspects: BTreeMap<String, AspectResult> = by_aspect
        .into_iter()
        .filter_map(|(aspect, triples)| {
            ProbabilityTriple::mean(&triples).map(|probs| {
                (
                    aspect.to_string(),
                    AspectResult {
                        label: probs.label(),
                        probs,
                    },
                )
            })
        })
        .collect();

    let overall = match policy {
        AggregationPolicy::PerAspect => ProbabilityTriple::mean(aspects.values().map(|a| &a.probs)),
        AggregationPolicy::PerClause => ProbabilityTriple::mean(scored.iter().map(|(p, _)| p)),
    };

    match overall {
        Some(overall) => AggregateOutcome {
            overall,
            label: overall.label(),
            aspects,
        },
        // Clauses that carry no aspect at all.
        None => AggregateOutcome::empty(),
    }
}
