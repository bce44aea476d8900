use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::Serialize;

use crate::model::CatalogRecord;
use crate::normalize::NormalizedKey;
use crate::plan::{DuplicatePolicy, KeyField};

/// One lookup table: normalized key → candidate position.
#[derive(Debug)]
struct KeyTable {
    field: KeyField,
    entries: HashMap<NormalizedKey, usize>,
    collisions: usize,
}

/// Exact-key lookup tables over a candidate pool, built once and never
/// mutated afterwards.
#[derive(Debug)]
pub struct ExactIndex<'c> {
    candidates: &'c [CatalogRecord],
    tables: Vec<KeyTable>,
    invalid_candidates: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub candidates: usize,
    /// Candidates with neither identifier nor display name.
    pub invalid_candidates: usize,
    pub tables: Vec<TableStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStats {
    pub field: String,
    pub keys: usize,
    /// Candidates whose key was already taken (resolved by the duplicate policy).
    pub collisions: usize,
}

impl<'c> ExactIndex<'c> {
    /// Build one table per field. Empty keys and keyless candidates are
    /// never inserted.
    pub fn build(
        candidates: &'c [CatalogRecord],
        fields: &[KeyField],
        policy: DuplicatePolicy,
    ) -> Self {
        let valid: Vec<(usize, &CatalogRecord)> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_keyless())
            .collect();
        let invalid_candidates = candidates.len() - valid.len();

        let tables = fields
            .iter()
            .map(|field| {
                let mut entries: HashMap<NormalizedKey, usize> = HashMap::new();
                let mut collisions = 0;
                for &(pos, candidate) in &valid {
                    let key = field.extract(candidate);
                    if key.is_empty() {
                        continue;
                    }
                    match entries.entry(key) {
                        Entry::Occupied(mut slot) => {
                            collisions += 1;
                            log::debug!(
                                "{field}: key '{}' shared by candidates {} and {pos}",
                                slot.key(),
                                slot.get()
                            );
                            if policy == DuplicatePolicy::LastWins {
                                slot.insert(pos);
                            }
                        }
                        Entry::Vacant(slot) => {
                            slot.insert(pos);
                        }
                    }
                }
                log::debug!(
                    "indexed {} keys by {field} ({collisions} collisions)",
                    entries.len()
                );
                KeyTable {
                    field: field.clone(),
                    entries,
                    collisions,
                }
            })
            .collect();

        Self {
            candidates,
            tables,
            invalid_candidates,
        }
    }

    /// Candidate position for `key` in the table for `field`.
    pub fn position(&self, field: &KeyField, key: &NormalizedKey) -> Option<usize> {
        if key.is_empty() {
            return None;
        }
        self.tables
            .iter()
            .find(|t| &t.field == field)
            .and_then(|t| t.entries.get(key).copied())
    }

    pub fn lookup(&self, field: &KeyField, key: &NormalizedKey) -> Option<&'c CatalogRecord> {
        self.position(field, key).map(|pos| &self.candidates[pos])
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            candidates: self.candidates.len(),
            invalid_candidates: self.invalid_candidates,
            tables: self
                .tables
                .iter()
                .map(|t| TableStats {
                    field: t.field.to_string(),
                    keys: t.entries.len(),
                    collisions: t.collisions,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn pool() -> Vec<CatalogRecord> {
        vec![
            CatalogRecord::new("HMH-100", "Bloom Booster").with_field("slug", "bloom-booster"),
            CatalogRecord::new("hmh100", "Bloom Booster v2").with_field("slug", "bloom-booster-v2"),
            CatalogRecord::new("", "").with_field("slug", "orphan"),
            CatalogRecord::new("", "Nameless SKU").with_field("slug", ""),
        ]
    }

    #[test]
    fn first_seen_wins_by_default() {
        let pool = pool();
        let idx = ExactIndex::build(&pool, &[KeyField::Identifier], DuplicatePolicy::FirstWins);
        let hit = idx.lookup(&KeyField::Identifier, &normalize("HMH 100")).unwrap();
        assert_eq!(hit.display_name, "Bloom Booster");
        assert_eq!(idx.stats().tables[0].collisions, 1);
    }

    #[test]
    fn last_wins_policy() {
        let pool = pool();
        let idx = ExactIndex::build(&pool, &[KeyField::Identifier], DuplicatePolicy::LastWins);
        assert_eq!(idx.position(&KeyField::Identifier, &normalize("hmh100")), Some(1));
    }

    #[test]
    fn empty_keys_and_keyless_candidates_are_skipped() {
        let pool = pool();
        let slug = KeyField::Column("slug".into());
        let idx = ExactIndex::build(&pool, &[KeyField::Identifier, slug.clone()], DuplicatePolicy::FirstWins);

        assert!(idx.lookup(&KeyField::Identifier, &normalize("")).is_none());
        // keyless candidate is not indexed even though its slug is set
        assert!(idx.lookup(&slug, &normalize("orphan")).is_none());

        let stats = idx.stats();
        assert_eq!(stats.candidates, 4);
        assert_eq!(stats.invalid_candidates, 1);
        assert_eq!(stats.tables[0].keys, 1);
        assert_eq!(stats.tables[1].keys, 2);
    }

    #[test]
    fn unknown_field_finds_nothing() {
        let pool = pool();
        let idx = ExactIndex::build(&pool, &[KeyField::Identifier], DuplicatePolicy::FirstWins);
        assert!(idx.lookup(&KeyField::DisplayName, &normalize("bloombooster")).is_none());
    }
}
