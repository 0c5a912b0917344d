//! Clusterer (C8): topic-gated greedy single-link clustering over the
//! window's ready articles, with cluster-hash duplicate suppression against
//! stories already synthesised in this window (§4.8).

pub mod keywords;
pub mod similarity;

use std::collections::HashSet;

use crate::config::ClusterConfig;
use crate::entity::types::EntitySet;
use crate::store::Article;
use crate::util::cluster_hash;

use similarity::{composite_similarity, SimilarityInput};

pub struct CandidateCluster {
    pub cluster_hash: String,
    pub topic: String,
    pub article_ids: Vec<i64>,
}

struct ArticleFeatures {
    id: i64,
    topic: String,
    keywords: HashSet<String>,
    entities: EntitySet,
    ranking_score: f64,
}

/// Sorted by `ranking_score` descending so the greedy pass always seeds a
/// new cluster with the richest remaining article in the window first
/// (§4.8 step 1).
fn build_features(articles: &[Article]) -> Vec<ArticleFeatures> {
    let mut features: Vec<ArticleFeatures> = articles
        .iter()
        .filter_map(|article| {
            let text = article.extracted_text.as_deref().unwrap_or("");
            let topic = article.topic.clone()?;
            let entities = article.entities().unwrap_or_default();
            Some(ArticleFeatures {
                id: article.id,
                topic,
                keywords: keywords::extract_keywords(text, 25),
                entities,
                ranking_score: article.ranking_score,
            })
        })
        .collect();
    features.sort_by(|a, b| b.ranking_score.total_cmp(&a.ranking_score));
    features
}

/// Greedy single-link pass: each article joins the first existing cluster
/// where its similarity to *any* current member exceeds the threshold
/// (true single-link, not just comparison against one representative);
/// otherwise it seeds a new cluster. Returns member indices into `features`
/// for clusters meeting `min_articles_per_story`, before duplicate-hash
/// filtering.
fn greedy_clusters(features: &[ArticleFeatures], cfg: &ClusterConfig) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for (index, candidate) in features.iter().enumerate() {
        let mut joined = None;

        for (cluster_index, members) in clusters.iter().enumerate() {
            let links_to_any_member = members.iter().any(|&member_index| {
                let member = &features[member_index];
                if member.topic != candidate.topic {
                    return false;
                }

                let a = SimilarityInput {
                    keywords: &member.keywords,
                    entities: &member.entities,
                    topic: &member.topic,
                };
                let b = SimilarityInput {
                    keywords: &candidate.keywords,
                    entities: &candidate.entities,
                    topic: &candidate.topic,
                };
                composite_similarity(&a, &b, &cfg.weights) >= cfg.similarity_threshold
            });

            if links_to_any_member {
                joined = Some(cluster_index);
                break;
            }
        }

        match joined {
            Some(cluster_index) => clusters[cluster_index].push(index),
            None => clusters.push(vec![index]),
        }
    }

    clusters
        .into_iter()
        .filter(|members| members.len() >= cfg.min_articles_per_story)
        .collect()
}

/// Number of clusters the greedy pass forms before duplicate-hash
/// filtering, used to distinguish "no clusters formed" from "all clusters
/// were duplicates" (§7).
pub fn candidate_count(articles: &[Article], cfg: &ClusterConfig) -> usize {
    let features = build_features(articles);
    greedy_clusters(&features, cfg).len()
}

/// Clusters the window's ready articles and drops any cluster whose hash
/// already names an active story (already synthesised).
pub fn cluster_articles(
    articles: &[Article],
    cfg: &ClusterConfig,
    existing_cluster_hashes: &HashSet<String>,
) -> Vec<CandidateCluster> {
    let features = build_features(articles);

    greedy_clusters(&features, cfg)
        .into_iter()
        .filter_map(|members| {
            let article_ids: Vec<i64> = members.iter().map(|&i| features[i].id).collect();
            let hash = cluster_hash(&article_ids);
            if existing_cluster_hashes.contains(&hash) {
                return None;
            }
            let topic = features[members[0]].topic.clone();
            Some(CandidateCluster {
                cluster_hash: hash,
                topic,
                article_ids,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimilarityWeights;

    fn cfg() -> ClusterConfig {
        ClusterConfig {
            time_window_hours: 24,
            min_articles_per_story: 2,
            similarity_threshold: 0.5,
            weights: SimilarityWeights {
                keyword_weight: 0.3,
                entity_weight: 0.5,
                topic_weight: 0.2,
            },
        }
    }

    fn article(id: i64, topic: &str, text: &str) -> Article {
        Article {
            id,
            feed_id: 1,
            url: format!("https://example.test/{}", id),
            title: format!("article {}", id),
            published: "2026-07-28T00:00:00".to_string(),
            content_hash: None,
            extracted_text: Some(text.to_string()),
            summary_json: None,
            summary_model: None,
            fallback_summary: None,
            entities_json: None,
            entities_model: None,
            topic: Some(topic.to_string()),
            topic_confidence: None,
            ranking_score: 0.0,
            created_at: "2026-07-28T00:00:00".to_string(),
        }
    }

    #[test]
    fn two_similar_same_topic_articles_form_one_cluster() {
        let articles = vec![
            article(1, "ai-ml", "openai releases new model for reasoning"),
            article(2, "ai-ml", "openai releases new model for reasoning tasks"),
        ];
        let clusters = cluster_articles(&articles, &cfg(), &HashSet::new());
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].article_ids.len(), 2);
    }

    #[test]
    fn different_topics_never_cluster_together() {
        let articles = vec![
            article(1, "ai-ml", "openai releases new model"),
            article(2, "politics", "openai releases new model"),
        ];
        let clusters = cluster_articles(&articles, &cfg(), &HashSet::new());
        assert!(clusters.is_empty());
    }

    #[test]
    fn singleton_cluster_is_dropped_by_min_articles_per_story() {
        let articles = vec![article(1, "ai-ml", "a lone unrelated article")];
        assert_eq!(candidate_count(&articles, &cfg()), 0);
        assert!(cluster_articles(&articles, &cfg(), &HashSet::new()).is_empty());
    }

    #[test]
    fn candidate_joins_via_link_to_a_non_representative_member() {
        // c is similar to b but not to a; under first-member-only comparison
        // it would never join. True single-link clustering links it in
        // through b.
        let articles = vec![
            article(1, "ai-ml", "openai releases gpt model update today"),
            article(2, "ai-ml", "openai gpt model update rolls out broadly now"),
            article(3, "ai-ml", "broadly rolled out model update today across regions"),
        ];
        let clusters = cluster_articles(&articles, &cfg(), &HashSet::new());
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].article_ids.len(), 3);
    }

    #[test]
    fn existing_hash_is_filtered_but_still_counted_as_a_candidate() {
        let articles = vec![
            article(1, "ai-ml", "openai releases new model for reasoning"),
            article(2, "ai-ml", "openai releases new model for reasoning tasks"),
        ];
        let formed = cluster_articles(&articles, &cfg(), &HashSet::new());
        assert_eq!(formed.len(), 1);

        let mut existing = HashSet::new();
        existing.insert(formed[0].cluster_hash.clone());

        // candidate_count doesn't know about existing hashes, so it still
        // reports one candidate even though cluster_articles now filters it.
        assert_eq!(candidate_count(&articles, &cfg()), 1);
        assert!(cluster_articles(&articles, &cfg(), &existing).is_empty());
    }
}
