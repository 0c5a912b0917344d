//! Entity types shared between the extractor (C7) and the clusterer (C8).
//!
//! Two JSON shapes coexist on disk: a legacy plain list of names, and the
//! current metadata-bearing form. Modelled as a tagged union so reads from
//! either era deserialize and promote to the same in-memory type (§3, §9).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Companies,
    Products,
    People,
    Technologies,
    Locations,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Companies,
        EntityKind::Products,
        EntityKind::People,
        EntityKind::Technologies,
        EntityKind::Locations,
    ];
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Companies => "companies",
            EntityKind::Products => "products",
            EntityKind::People => "people",
            EntityKind::Technologies => "technologies",
            EntityKind::Locations => "locations",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRole {
    PrimarySubject,
    Mentioned,
    Quoted,
}

impl EntityRole {
    /// Role weight applied to confidence in the overlap formula (§4.7).
    pub fn boost(self) -> f64 {
        match self {
            EntityRole::PrimarySubject => 1.5,
            EntityRole::Quoted => 1.2,
            EntityRole::Mentioned => 1.0,
        }
    }
}

impl Default for EntityRole {
    fn default() -> Self {
        EntityRole::Mentioned
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityWithMeta {
    pub name: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub role: EntityRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disambiguation: Option<String>,
}

fn default_confidence() -> f64 {
    0.8
}

impl EntityWithMeta {
    pub fn weight(&self) -> f64 {
        self.confidence * self.role.boost()
    }
}

/// Accepts either the legacy `["name", ...]` shape or the current
/// `[{"name": ..., "confidence": ..., "role": ...}, ...]` shape and promotes
/// both to `EntityWithMeta` with the legacy defaults (confidence 0.8, role
/// mentioned) called for in §3/§9.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityBucket(pub Vec<EntityWithMeta>);

impl Serialize for EntityBucket {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EntityBucket {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Entry {
            Legacy(String),
            Meta(EntityWithMeta),
        }

        let entries = Vec::<Entry>::deserialize(deserializer)?;
        let promoted = entries
            .into_iter()
            .map(|e| match e {
                Entry::Legacy(name) => EntityWithMeta {
                    name,
                    confidence: default_confidence(),
                    role: EntityRole::default(),
                    disambiguation: None,
                },
                Entry::Meta(m) => m,
            })
            .collect();
        Ok(EntityBucket(promoted))
    }
}

/// The five bounded per-kind entity buckets extracted from one article.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitySet {
    #[serde(default)]
    pub companies: EntityBucket,
    #[serde(default)]
    pub products: EntityBucket,
    #[serde(default)]
    pub people: EntityBucket,
    #[serde(default)]
    pub technologies: EntityBucket,
    #[serde(default)]
    pub locations: EntityBucket,
}

impl Default for EntityBucket {
    fn default() -> Self {
        EntityBucket(Vec::new())
    }
}

impl EntitySet {
    pub const MAX_PER_KIND: usize = 5;

    pub fn bucket(&self, kind: EntityKind) -> &[EntityWithMeta] {
        match kind {
            EntityKind::Companies => &self.companies.0,
            EntityKind::Products => &self.products.0,
            EntityKind::People => &self.people.0,
            EntityKind::Technologies => &self.technologies.0,
            EntityKind::Locations => &self.locations.0,
        }
    }

    pub fn bucket_mut(&mut self, kind: EntityKind) -> &mut Vec<EntityWithMeta> {
        match kind {
            EntityKind::Companies => &mut self.companies.0,
            EntityKind::Products => &mut self.products.0,
            EntityKind::People => &mut self.people.0,
            EntityKind::Technologies => &mut self.technologies.0,
            EntityKind::Locations => &mut self.locations.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        EntityKind::ALL.iter().all(|k| self.bucket(*k).is_empty())
    }

    /// Flat name -> weight map across all five kinds, used by the overlap
    /// formula and by `Story.entities`. Same name appearing in different
    /// roles keeps the higher-confidence (i.e. higher-weight) side.
    pub fn weighted_names(&self) -> HashMap<String, f64> {
        let mut out: HashMap<String, f64> = HashMap::new();
        for kind in EntityKind::ALL {
            for e in self.bucket(kind) {
                let w = e.weight();
                out.entry(e.name.clone())
                    .and_modify(|existing| {
                        if w > *existing {
                            *existing = w;
                        }
                    })
                    .or_insert(w);
            }
        }
        out
    }

    pub fn all_names(&self) -> Vec<String> {
        self.weighted_names().into_keys().collect()
    }
}

/// Confidence-weighted Jaccard overlap between two entity sets (§3, §4.7).
/// `overlap(A, B) = sum(min(w_a, w_b) for n in A∩B) / sum(max(w_a, w_b) for n in A∪B)`
pub fn entity_overlap(a: &EntitySet, b: &EntitySet) -> f64 {
    let wa = a.weighted_names();
    let wb = b.weighted_names();

    if wa.is_empty() && wb.is_empty() {
        return 0.0;
    }

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut seen = std::collections::HashSet::new();

    for (name, &w_a) in &wa {
        seen.insert(name.clone());
        match wb.get(name) {
            Some(&w_b) => {
                numerator += w_a.min(w_b);
                denominator += w_a.max(w_b);
            }
            None => denominator += w_a,
        }
    }
    for (name, &w_b) in &wb {
        if !seen.contains(name) {
            denominator += w_b;
        }
    }

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, confidence: f64, role: EntityRole) -> EntityWithMeta {
        EntityWithMeta {
            name: name.to_string(),
            confidence,
            role,
            disambiguation: None,
        }
    }

    #[test]
    fn overlap_of_two_empty_sets_is_zero() {
        let a = EntitySet::default();
        let b = EntitySet::default();
        assert_eq!(entity_overlap(&a, &b), 0.0);
    }

    #[test]
    fn overlap_full_match_is_one() {
        let mut a = EntitySet::default();
        a.companies
            .0
            .push(entity("Google", 0.9, EntityRole::PrimarySubject));
        let b = a.clone();
        assert!((entity_overlap(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn legacy_string_list_promotes_with_defaults() {
        let json = r#"["Google", "Apple"]"#;
        let bucket: EntityBucket = serde_json::from_str(json).unwrap();
        assert_eq!(bucket.0.len(), 2);
        assert_eq!(bucket.0[0].confidence, 0.8);
        assert_eq!(bucket.0[0].role, EntityRole::Mentioned);
    }
}
