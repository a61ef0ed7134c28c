// cliprate-core/src/domain/sampler.rs
//
// Selects which videos a participant sees. Either a plain uniform draw or a
// hierarchical stratified allocation over categorical metadata variables.
//
// Known quirk, kept on purpose: when a bucket cannot fill its quota the
// shortfall is NOT redistributed to sibling buckets, so the overall count can
// land under the literal target.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::metadata::MetadataTable;

/// One level of the stratification hierarchy.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StratumSpec {
    #[serde(default)]
    pub variable: String,
    #[serde(default)]
    pub levels: Vec<String>,
    #[serde(default)]
    pub proportions: Vec<f64>,
}

/// Reduce `pool` to at most `target` video ids.
///
/// Empty `strata` means a uniform draw without replacement (the whole pool,
/// shuffled, when `target` is absent or covers the pool). Otherwise the pool
/// is partitioned by the first stratification variable, each bucket gets
/// `round(target * proportion)`, and the next variable recurses inside each
/// bucket. The final selection is flattened and shuffled once so presentation
/// order does not reveal the strata.
pub fn select<R: Rng>(
    pool: &[String],
    metadata: &MetadataTable,
    target: Option<usize>,
    strata: &[StratumSpec],
    rng: &mut R,
) -> Vec<String> {
    if strata.is_empty() {
        let mut selected: Vec<String> = match target {
            Some(t) if t < pool.len() => pool
                .choose_multiple(rng, t)
                .cloned()
                .collect(),
            _ => pool.to_vec(),
        };
        selected.shuffle(rng);
        return selected;
    }

    let available = metadata.restrict_to(pool);
    if available.is_empty() {
        warn!("No metadata found for available videos. Skipping stratification.");
        return pool.to_vec();
    }

    // Cap at what is actually available; never pad.
    let target = target.unwrap_or(available.len()).min(available.len());

    let mut selected = sample_recursive(&available, strata, Some(target), 0, rng);
    selected.shuffle(rng);
    selected
}

fn sample_recursive<R: Rng>(
    available: &MetadataTable,
    strata: &[StratumSpec],
    target: Option<usize>,
    depth: usize,
    rng: &mut R,
) -> Vec<String> {
    // Deepest level reached: sample uniformly within the bucket.
    if depth >= strata.len() {
        let ids = available.ids();
        return match target {
            Some(t) if t < ids.len() => ids.choose_multiple(rng, t).cloned().collect(),
            _ => ids,
        };
    }

    let spec = &strata[depth];

    // A structurally broken level degrades to "take up to target unfiltered"
    // instead of failing the whole selection.
    if spec.variable.is_empty() || spec.levels.is_empty() || spec.proportions.is_empty() {
        warn!(depth, "Invalid stratification config, taking candidates unfiltered");
        return take_first(available, target);
    }
    if spec.levels.len() != spec.proportions.len() {
        warn!(variable = %spec.variable, "Levels and proportions length mismatch");
        return take_first(available, target);
    }

    let proportion_sum: f64 = spec.proportions.iter().sum();
    if (proportion_sum - 1.0).abs() > 0.01 {
        warn!(
            variable = %spec.variable,
            sum = proportion_sum,
            "Proportions don't sum to 1.0"
        );
    }

    if !available.has_column(&spec.variable) {
        warn!(variable = %spec.variable, "Variable not found in metadata. Skipping stratification.");
        return take_first(available, target);
    }

    let mut any_level_matched = false;
    for level in &spec.levels {
        if available.filter_eq(&spec.variable, level).len() > 0 {
            any_level_matched = true;
            break;
        }
    }
    if !any_level_matched {
        warn!(variable = %spec.variable, levels = ?spec.levels, "No videos found for any level");
        return take_first(available, target);
    }

    let mut selected = Vec::new();

    for (level, proportion) in spec.levels.iter().zip(&spec.proportions) {
        let bucket = available.filter_eq(&spec.variable, level);
        if bucket.is_empty() {
            info!(variable = %spec.variable, level = %level, "No videos for level, skipping");
            continue;
        }

        let mut bucket_target = target.map(|t| (t as f64 * proportion).round() as usize);

        // Short supply silently reduces the quota. No redistribution.
        if let Some(quota) = bucket_target {
            if bucket.len() < quota {
                info!(
                    variable = %spec.variable,
                    level = %level,
                    requested = quota,
                    available = bucket.len(),
                    "Bucket under-supplied, taking all"
                );
                bucket_target = Some(bucket.len());
            }
        }

        selected.extend(sample_recursive(&bucket, strata, bucket_target, depth + 1, rng));
    }

    selected
}

fn take_first(available: &MetadataTable, target: Option<usize>) -> Vec<String> {
    let mut ids = available.ids();
    if let Some(t) = target {
        ids.truncate(t);
    }
    ids
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::metadata::MetaRow;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn row(id: &str, outcome: &str, phase: &str) -> MetaRow {
        BTreeMap::from([
            ("id".to_string(), id.to_string()),
            ("WinLoss".to_string(), outcome.to_string()),
            ("phase".to_string(), phase.to_string()),
        ])
    }

    /// 6 win (4 open + 2 set) and 4 loss (2 open + 2 set).
    fn fixture() -> (Vec<String>, MetadataTable) {
        let rows = vec![
            row("w1", "win", "open"),
            row("w2", "win", "open"),
            row("w3", "win", "open"),
            row("w4", "win", "open"),
            row("w5", "win", "set"),
            row("w6", "win", "set"),
            row("l1", "loss", "open"),
            row("l2", "loss", "open"),
            row("l3", "loss", "set"),
            row("l4", "loss", "set"),
        ];
        let pool = rows.iter().map(|r| r["id"].clone()).collect();
        (pool, MetadataTable::new(rows))
    }

    fn outcome_spec() -> StratumSpec {
        StratumSpec {
            variable: "WinLoss".into(),
            levels: vec!["win".into(), "loss".into()],
            proportions: vec![0.5, 0.5],
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_uniform_sample_respects_target() {
        let (pool, meta) = fixture();
        let selected = select(&pool, &meta, Some(3), &[], &mut rng());
        assert_eq!(selected.len(), 3);
        for id in &selected {
            assert!(pool.contains(id));
        }
    }

    #[test]
    fn test_uniform_no_target_returns_shuffled_pool() {
        let (pool, meta) = fixture();
        let mut selected = select(&pool, &meta, None, &[], &mut rng());
        assert_eq!(selected.len(), pool.len());
        selected.sort();
        let mut sorted_pool = pool.clone();
        sorted_pool.sort();
        assert_eq!(selected, sorted_pool);
    }

    #[test]
    fn test_two_level_outcome_balance() {
        let (pool, meta) = fixture();
        let selected = select(&pool, &meta, Some(4), &[outcome_spec()], &mut rng());
        assert_eq!(selected.len(), 4);

        let wins = selected.iter().filter(|id| id.starts_with('w')).count();
        let losses = selected.iter().filter(|id| id.starts_with('l')).count();
        assert_eq!(wins, 2);
        assert_eq!(losses, 2);
    }

    #[test]
    fn test_never_exceeds_pool_or_target() {
        let (pool, meta) = fixture();
        for target in [1, 4, 10, 50] {
            let selected = select(&pool, &meta, Some(target), &[outcome_spec()], &mut rng());
            assert!(selected.len() <= target);
            assert!(selected.len() <= pool.len());
        }
    }

    #[test]
    fn test_under_supplied_bucket_is_not_redistributed() {
        // Ask for 8 at 0.5/0.5: loss bucket only has 4, win bucket keeps its 4.
        let (pool, meta) = fixture();
        let selected = select(&pool, &meta, Some(8), &[outcome_spec()], &mut rng());
        let wins = selected.iter().filter(|id| id.starts_with('w')).count();
        let losses = selected.iter().filter(|id| id.starts_with('l')).count();
        assert_eq!(wins, 4);
        assert_eq!(losses, 4);
    }

    #[test]
    fn test_nested_stratification() {
        let (pool, meta) = fixture();
        let strata = vec![
            outcome_spec(),
            StratumSpec {
                variable: "phase".into(),
                levels: vec!["open".into(), "set".into()],
                proportions: vec![0.5, 0.5],
            },
        ];
        let selected = select(&pool, &meta, Some(4), &strata, &mut rng());
        // 2 win (1 open + 1 set) and 2 loss (1 open + 1 set).
        assert_eq!(selected.len(), 4);
        for (outcome, phase) in [("win", "open"), ("win", "set"), ("loss", "open"), ("loss", "set")]
        {
            let count = selected
                .iter()
                .filter(|id| {
                    let row = meta.get(id).unwrap();
                    row["WinLoss"] == outcome && row["phase"] == phase
                })
                .count();
            assert_eq!(count, 1, "expected one {outcome}/{phase} clip");
        }
    }

    #[test]
    fn test_unknown_variable_degrades_unfiltered() {
        let (pool, meta) = fixture();
        let strata = vec![StratumSpec {
            variable: "does_not_exist".into(),
            levels: vec!["a".into()],
            proportions: vec![1.0],
        }];
        let selected = select(&pool, &meta, Some(5), &strata, &mut rng());
        assert_eq!(selected.len(), 5);
    }

    #[test]
    fn test_length_mismatch_degrades_unfiltered() {
        let (pool, meta) = fixture();
        let strata = vec![StratumSpec {
            variable: "WinLoss".into(),
            levels: vec!["win".into(), "loss".into()],
            proportions: vec![1.0],
        }];
        let selected = select(&pool, &meta, Some(3), &strata, &mut rng());
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_no_metadata_returns_pool_untouched() {
        let (pool, _) = fixture();
        let empty = MetadataTable::default();
        let selected = select(&pool, &empty, Some(4), &[outcome_spec()], &mut rng());
        assert_eq!(selected, pool);
    }

    #[test]
    fn test_sampling_without_replacement() {
        let (pool, meta) = fixture();
        let selected = select(&pool, &meta, Some(8), &[outcome_spec()], &mut rng());
        let mut deduped = selected.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), selected.len());
    }
}
