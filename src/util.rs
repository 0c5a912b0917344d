//! Small cross-cutting helpers: content hashing, cluster hashing, and the
//! UTC-naive ISO-8601 datetime convention the store relies on for correct
//! textual range comparisons (see §4.1 and the "Legacy datetime bug" design
//! note — this is the one thing every caller must get right).

use chrono::{DateTime, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};

/// SHA-256 content hash of extracted article text, hex-encoded.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// md5 of the sorted, comma-joined article id list. Order-invariant: any
/// permutation of the same id set hashes identically (§4.8, §8).
pub fn cluster_hash(article_ids: &[i64]) -> String {
    let mut sorted = article_ids.to_vec();
    sorted.sort_unstable();
    let joined = sorted
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{:x}", md5::compute(joined.as_bytes()))
}

/// Renders a UTC timestamp as naive (no offset suffix) ISO-8601 text, which
/// is what the store persists and compares lexicographically. Never hand a
/// caller a `+00:00`/`Z`-suffixed string to bind into a range filter --
/// textual comparison against naive rows would silently misorder.
pub fn to_naive_iso(dt: DateTime<Utc>) -> String {
    dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

pub fn now_naive_iso() -> String {
    to_naive_iso(Utc::now())
}

/// Parses a naive ISO-8601 string back into a UTC `DateTime`, assuming the
/// text was already normalised to UTC by `to_naive_iso`.
pub fn from_naive_iso(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// A window start timestamp (`now - hours`) in the naive-ISO form the store
/// expects to bind into a `published >= ?` filter.
pub fn window_start_naive_iso(hours: i64) -> String {
    let start = Utc::now() - chrono::Duration::hours(hours);
    to_naive_iso(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_hash_is_order_invariant() {
        assert_eq!(cluster_hash(&[3, 1, 2]), cluster_hash(&[1, 2, 3]));
        assert_eq!(cluster_hash(&[2, 3, 1]), cluster_hash(&[1, 2, 3]));
    }

    #[test]
    fn cluster_hash_differs_for_different_sets() {
        assert_ne!(cluster_hash(&[1, 2, 3]), cluster_hash(&[1, 2, 4]));
    }

    #[test]
    fn naive_iso_round_trips() {
        let now = Utc::now();
        let text = to_naive_iso(now);
        assert!(!text.contains('+'));
        assert!(!text.ends_with('Z'));
        let parsed = from_naive_iso(&text).unwrap();
        assert_eq!(parsed.timestamp(), now.timestamp());
    }
}
