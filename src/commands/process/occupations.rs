use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{
    metric_f64, ONET_TASK_COUNT, ONET_TASK_PCT, OccupationAggregate, TaskEntry, TaxonomyEntry,
};

/// Normalized task text → occupation reference entry.
pub type TaxonomyMapping = HashMap<String, TaxonomyEntry>;

pub fn normalize_task(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Loads the task→occupation mapping document produced by `aui taxonomy`,
/// re-keying it by normalized task text. Callers treat a failure here as a
/// degradation (empty mapping), not a pipeline abort.
pub fn load_mapping(path: &Path) -> Result<TaxonomyMapping> {
    let raw = fs::read(path)
        .with_context(|| format!("failed to read taxonomy mapping: {}", path.display()))?;
    let entries: Vec<TaxonomyEntry> = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse taxonomy mapping: {}", path.display()))?;

    Ok(entries
        .into_iter()
        .map(|entry| (normalize_task(&entry.task), entry))
        .collect())
}

/// Rolls task-level usage up to one aggregate per SOC code. Tasks whose
/// normalized text has no mapping entry are dropped. Totals are plain sums
/// over contributing tasks (missing metrics count as 0), not renormalized.
/// The result is sorted descending by `total_usage_pct`.
pub fn aggregate_occupations(
    tasks: &[TaskEntry],
    mapping: &TaxonomyMapping,
) -> Vec<OccupationAggregate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut aggregates: Vec<OccupationAggregate> = Vec::new();

    for task in tasks {
        let Some(entry) = mapping.get(&normalize_task(&task.task)) else {
            continue;
        };

        let slot = match index.get(&entry.soc_code) {
            Some(&slot) => slot,
            None => {
                aggregates.push(OccupationAggregate {
                    soc_code: entry.soc_code.clone(),
                    occupation_title: entry.occupation_title.clone(),
                    soc_major_group: entry.soc_major_group.clone(),
                    tasks: Vec::new(),
                    total_usage_count: 0.0,
                    total_usage_pct: 0.0,
                });
                let slot = aggregates.len() - 1;
                index.insert(entry.soc_code.clone(), slot);
                slot
            }
        };

        let aggregate = &mut aggregates[slot];
        aggregate.total_usage_count += metric_f64(&task.metrics, ONET_TASK_COUNT);
        aggregate.total_usage_pct += metric_f64(&task.metrics, ONET_TASK_PCT);
        aggregate.tasks.push(task.clone());
    }

    aggregates.sort_by(|a, b| b.total_usage_pct.total_cmp(&a.total_usage_pct));
    aggregates
}
