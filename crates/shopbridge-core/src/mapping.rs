//! Heuristic auto-mapping between two schemas
//!
//! Every target field is matched against every source field by name
//! similarity. The best candidate at or above the threshold becomes a
//! [`FieldMapping`]; target fields without a candidate stay unmapped.

use crate::schema::{FieldDefinition, Schema};
use crate::transforms::FieldMapping;

/// Default acceptance threshold for [`generate_mappings`]
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Score given to the `sku` / `id` pairing
const SKU_ID_SCORE: f64 = 0.9;
/// Score given when one name contains the other
const SUBSTRING_SCORE: f64 = 0.8;
/// Tokens this short never count as shared
const MIN_TOKEN_LEN: usize = 3;

/// Propose mappings from `source` fields onto `target` fields.
///
/// The result follows the target schema's field order. Ties between source
/// candidates keep the first one in source order, unless a later candidate
/// has exactly the target's path.
pub fn generate_mappings(source: &Schema, target: &Schema, threshold: f64) -> Vec<FieldMapping> {
    let mut mappings = Vec::new();

    for target_field in target.fields.values() {
        let mut best: Option<(&FieldDefinition, f64)> = None;

        for source_field in source.fields.values() {
            let score = similarity(&source_field.name, &target_field.name);
            if score <= 0.0 || score < threshold {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, best_score)) if score > best_score => true,
                Some((current, best_score)) => {
                    score == best_score
                        && current.path != target_field.path
                        && source_field.path == target_field.path
                }
            };
            if better {
                best = Some((source_field, score));
            }
        }

        match best {
            Some((source_field, score)) => {
                tracing::debug!(
                    source = %source_field.path,
                    target = %target_field.path,
                    score,
                    "auto-mapped field"
                );
                mappings.push(FieldMapping::new(&source_field.path, &target_field.path));
            }
            None => {
                tracing::debug!(target = %target_field.path, "no source candidate for field");
            }
        }
    }

    mappings
}

/// Similarity between two field names in `[0.0, 1.0]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if is_sku_id_pair(&a, &b) {
        return SKU_ID_SCORE;
    }
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return SUBSTRING_SCORE;
    }

    let tokens_a: Vec<&str> = a.split('_').collect();
    let tokens_b: Vec<&str> = b.split('_').collect();
    let shared = tokens_a
        .iter()
        .filter(|t| t.len() >= MIN_TOKEN_LEN && tokens_b.contains(t))
        .count();
    if shared == 0 {
        return 0.0;
    }
    shared as f64 / tokens_a.len().max(tokens_b.len()) as f64
}

fn normalize(name: &str) -> String {
    let lower = name.to_lowercase();
    match lower.strip_prefix("id_") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

fn is_sku_id_pair(a: &str, b: &str) -> bool {
    matches!((a, b), ("sku", "id") | ("id", "sku"))
}
