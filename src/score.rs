//! Scorer (C10): importance, freshness, and quality formulas (§4.10),
//! structured the way the Kaikei pulse pipeline's cluster quality metrics
//! bundle several typed components into one struct rather than returning a
//! bare tuple of floats.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoryScore {
    pub importance: f64,
    pub freshness: f64,
    pub quality: f64,
}

pub struct ScoreInputs<'a> {
    pub article_count: usize,
    pub unique_source_count: usize,
    pub entity_count: usize,
    pub published_at: &'a [DateTime<Utc>],
    pub feed_health_scores: &'a [f64],
}

/// Constant placeholder for the engagement term in the quality formula
/// until real engagement signals are wired in (§9 Open Question).
const ENGAGEMENT_PLACEHOLDER: f64 = 0.5;

pub fn score_story(inputs: &ScoreInputs, now: DateTime<Utc>) -> StoryScore {
    let importance = 0.4 * (inputs.article_count as f64 / 10.0).min(1.0)
        + 0.3 * (inputs.unique_source_count as f64 / 5.0).min(1.0)
        + 0.3 * (inputs.entity_count as f64 / 10.0).min(1.0);

    let freshness = freshness_score(inputs.published_at, now);
    let source_quality = source_quality_score(inputs.feed_health_scores);

    let quality =
        0.4 * importance + 0.3 * freshness + 0.2 * source_quality + 0.1 * ENGAGEMENT_PLACEHOLDER;

    StoryScore {
        importance,
        freshness,
        quality,
    }
}

/// `exp(-avg_age_hours / 12)`, 12-hour half-life. Future publication
/// timestamps clamp their age to zero rather than going negative.
fn freshness_score(published_at: &[DateTime<Utc>], now: DateTime<Utc>) -> f64 {
    if published_at.is_empty() {
        return 0.0;
    }

    let total_age_hours: f64 = published_at
        .iter()
        .map(|published| {
            let age_hours = (now - *published).num_milliseconds() as f64 / 3_600_000.0;
            age_hours.max(0.0)
        })
        .sum();

    let avg_age_hours = total_age_hours / published_at.len() as f64;
    (-avg_age_hours / 12.0).exp()
}

fn source_quality_score(feed_health_scores: &[f64]) -> f64 {
    if feed_health_scores.is_empty() {
        return 0.0;
    }
    let sum: f64 = feed_health_scores.iter().map(|h| h / 100.0).sum();
    sum / feed_health_scores.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn brand_new_article_has_freshness_near_one() {
        let now = Utc::now();
        let score = freshness_score(&[now], now);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn twelve_hour_old_article_has_half_life_freshness() {
        let now = Utc::now();
        let published = now - Duration::hours(12);
        let score = freshness_score(&[published], now);
        assert!((score - (-1.0_f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn future_publication_clamps_to_zero_age() {
        let now = Utc::now();
        let published = now + Duration::hours(5);
        let score = freshness_score(&[published], now);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn importance_saturates_at_thresholds() {
        let now = Utc::now();
        let inputs = ScoreInputs {
            article_count: 50,
            unique_source_count: 50,
            entity_count: 50,
            published_at: &[now],
            feed_health_scores: &[100.0],
        };
        let score = score_story(&inputs, now);
        assert!((score.importance - 1.0).abs() < 1e-9);
    }
}
