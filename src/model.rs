use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel geo/cluster id for observations the upstream classifier could
/// not attribute; rows carrying it are dropped during grouping.
pub const NOT_CLASSIFIED: &str = "not_classified";

pub const USAGE_PCT: &str = "usage_pct";
pub const USAGE_RANK: &str = "usage_rank";
pub const USAGE_TIER: &str = "usage_tier";
pub const USAGE_PER_CAPITA_INDEX: &str = "usage_per_capita_index";
pub const ONET_TASK_COUNT: &str = "onet_task_count";
pub const ONET_TASK_PCT: &str = "onet_task_pct";

/// Variable → value map for one geography or one facet entry. Values stay
/// `serde_json::Value` so ranks/tiers serialize as integers, percentages as
/// full-precision floats, and blank source cells as null.
pub type MetricMap = BTreeMap<String, Value>;

/// Reads a metric as a number, treating missing and null as 0.
pub fn metric_f64(metrics: &MetricMap, key: &str) -> f64 {
    metrics.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Geography {
    Country,
    StateUs,
    Global,
}

impl Geography {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "country" => Some(Self::Country),
            "state_us" => Some(Self::StateUs),
            "global" => Some(Self::Global),
            _ => None,
        }
    }
}

/// Analytical dimension of one observation row. The cross-facet variants are
/// accepted by the parser but never materialized into geography records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Country,
    StateUs,
    OnetTask,
    Collaboration,
    Request,
    OnetTaskCollaboration,
    RequestCollaboration,
    OnetTaskPromptTokens,
    OnetTaskCompletionTokens,
    OnetTaskCost,
}

impl Facet {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "country" => Some(Self::Country),
            "state_us" => Some(Self::StateUs),
            "onet_task" => Some(Self::OnetTask),
            "collaboration" => Some(Self::Collaboration),
            "request" => Some(Self::Request),
            "onet_task::collaboration" => Some(Self::OnetTaskCollaboration),
            "request::collaboration" => Some(Self::RequestCollaboration),
            "onet_task::prompt_tokens" => Some(Self::OnetTaskPromptTokens),
            "onet_task::completion_tokens" => Some(Self::OnetTaskCompletionTokens),
            "onet_task::cost" => Some(Self::OnetTaskCost),
            _ => None,
        }
    }
}

/// One parsed observation. Immutable once produced by the row parser.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub geo_id: String,
    pub geography: Geography,
    pub facet: Facet,
    pub level: Option<i64>,
    pub variable: String,
    pub cluster_name: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEntry {
    pub task: String,
    pub metrics: MetricMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEntry {
    pub cluster_name: String,
    pub level: Option<i64>,
    pub metrics: MetricMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationEntry {
    pub mode: String,
    pub metrics: MetricMap,
}

/// Denormalized per-geography document: summary metrics plus one merged
/// entry list per facet, each ordered by first appearance in the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeographyRecord {
    pub geo_id: String,
    pub geography: Geography,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    pub metrics: MetricMap,
    pub tasks: Vec<TaskEntry>,
    pub requests: Vec<RequestEntry>,
    pub collaboration: Vec<CollaborationEntry>,
}

impl GeographyRecord {
    pub fn new(geo_id: impl Into<String>, geography: Geography) -> Self {
        Self {
            geo_id: geo_id.into(),
            geography,
            platform: None,
            metrics: MetricMap::new(),
            tasks: Vec::new(),
            requests: Vec::new(),
            collaboration: Vec::new(),
        }
    }

    pub fn metric(&self, key: &str) -> f64 {
        metric_f64(&self.metrics, key)
    }
}

/// One row of the task→occupation reference mapping; `task` holds the
/// normalized (lowercased, trimmed) statement text used as the join key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub task: String,
    pub soc_code: String,
    pub occupation_title: String,
    pub soc_major_group: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OccupationAggregate {
    pub soc_code: String,
    pub occupation_title: String,
    pub soc_major_group: String,
    pub tasks: Vec<TaskEntry>,
    pub total_usage_count: f64,
    pub total_usage_pct: f64,
}

/// Per-SOC summary emitted alongside the mapping by `aui taxonomy`.
#[derive(Debug, Clone, Serialize)]
pub struct OccupationSummary {
    pub soc_code: String,
    pub occupation_title: String,
    pub soc_major_group: String,
    pub task_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeographyCounts {
    pub countries: usize,
    pub states: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub generated: String,
    pub date_range: DateRange,
    pub counts: GeographyCounts,
    pub parse_warnings: usize,
}
