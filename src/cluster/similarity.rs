//! Composite article-to-article similarity used by the clusterer (§4.7/§4.8):
//! weighted sum of keyword, entity, and topic signals. Grounded on the
//! teacher's `entity::matching::calculate_entity_similarity` approach of
//! combining several typed overlap metrics into one score, generalized here
//! to the configured weight triple.

use std::collections::HashSet;

use crate::config::SimilarityWeights;
use crate::entity::types::{entity_overlap, EntitySet};

use super::keywords::keyword_overlap;

pub struct SimilarityInput<'a> {
    pub keywords: &'a HashSet<String>,
    pub entities: &'a EntitySet,
    pub topic: &'a str,
}

/// When both entity sets are empty the entity term cannot contribute
/// information, so its weight is redistributed: 0.8 to keyword overlap,
/// 0.2 to the topic-match term (§4.7 Open Question resolution).
pub fn composite_similarity(
    a: &SimilarityInput,
    b: &SimilarityInput,
    weights: &SimilarityWeights,
) -> f64 {
    let keyword_score = keyword_overlap(a.keywords, b.keywords);
    let topic_score = if a.topic == b.topic { 1.0 } else { 0.0 };

    if a.entities.is_empty() && b.entities.is_empty() {
        return 0.8 * keyword_score + 0.2 * topic_score;
    }

    let entity_score = entity_overlap(a.entities, b.entities);

    weights.keyword_weight * keyword_score
        + weights.entity_weight * entity_score
        + weights.topic_weight * topic_score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> SimilarityWeights {
        SimilarityWeights {
            keyword_weight: 0.3,
            entity_weight: 0.5,
            topic_weight: 0.2,
        }
    }

    #[test]
    fn identical_inputs_score_one() {
        let keywords: HashSet<String> = ["kubernetes", "cluster"].iter().map(|s| s.to_string()).collect();
        let entities = EntitySet::default();
        let a = SimilarityInput {
            keywords: &keywords,
            entities: &entities,
            topic: "cloud-k8s",
        };
        let b = SimilarityInput {
            keywords: &keywords,
            entities: &entities,
            topic: "cloud-k8s",
        };
        assert!((composite_similarity(&a, &b, &weights()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_inputs_score_zero() {
        let kw_a: HashSet<String> = ["alpha"].iter().map(|s| s.to_string()).collect();
        let kw_b: HashSet<String> = ["beta"].iter().map(|s| s.to_string()).collect();
        let entities = EntitySet::default();
        let a = SimilarityInput {
            keywords: &kw_a,
            entities: &entities,
            topic: "security",
        };
        let b = SimilarityInput {
            keywords: &kw_b,
            entities: &entities,
            topic: "business",
        };
        assert_eq!(composite_similarity(&a, &b, &weights()), 0.0);
    }
}
