use std::collections::HashMap;

use serde_json::Value;

use crate::model::{
    CollaborationEntry, Facet, Geography, GeographyRecord, MetricMap, NOT_CLASSIFIED, RawRow,
    RequestEntry, TaskEntry,
};

/// Geography records for one source export, split by geography kind. Records
/// keep the order in which their geo_id first appeared.
pub struct GroupedRecords {
    pub countries: Vec<GeographyRecord>,
    pub states: Vec<GeographyRecord>,
    pub global: Option<GeographyRecord>,
}

/// Consumes the row stream once, in order, creating records lazily and
/// routing each row's value into the owning record. Rows attributed to the
/// `not_classified` sentinel geography are discarded before any record is
/// created.
pub fn group_rows(rows: &[RawRow]) -> GroupedRecords {
    let mut countries = RecordTable::new();
    let mut states = RecordTable::new();
    let mut global: Option<RecordBuilder> = None;

    for row in rows {
        if row.geo_id == NOT_CLASSIFIED {
            continue;
        }

        let builder = match row.geography {
            Geography::Country => countries.get_or_create(&row.geo_id, row.geography),
            Geography::StateUs => states.get_or_create(&row.geo_id, row.geography),
            Geography::Global => {
                global.get_or_insert_with(|| RecordBuilder::new(&row.geo_id, Geography::Global))
            }
        };
        builder.route(row);
    }

    GroupedRecords {
        countries: countries.into_records(),
        states: states.into_records(),
        global: global.map(RecordBuilder::into_record),
    }
}

/// Builds the single platform-scoped record for a secondary export. Only the
/// entry facets are routed; summary facets of a platform file have no
/// per-geography document to land in.
pub fn build_platform_record(rows: &[RawRow], geo_id: &str, platform: &str) -> GeographyRecord {
    let mut builder = RecordBuilder::new(geo_id, Geography::Global);

    for row in rows {
        if row.geo_id == NOT_CLASSIFIED {
            continue;
        }
        if matches!(
            row.facet,
            Facet::OnetTask | Facet::Request | Facet::Collaboration
        ) {
            builder.route(row);
        }
    }

    let mut record = builder.into_record();
    record.platform = Some(platform.to_string());
    record
}

/// Insertion-ordered record set keyed by geo_id.
struct RecordTable {
    index: HashMap<String, usize>,
    builders: Vec<RecordBuilder>,
}

impl RecordTable {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            builders: Vec::new(),
        }
    }

    fn get_or_create(&mut self, geo_id: &str, geography: Geography) -> &mut RecordBuilder {
        let slot = match self.index.get(geo_id) {
            Some(&slot) => slot,
            None => {
                self.builders.push(RecordBuilder::new(geo_id, geography));
                self.index.insert(geo_id.to_string(), self.builders.len() - 1);
                self.builders.len() - 1
            }
        };
        &mut self.builders[slot]
    }

    fn into_records(self) -> Vec<GeographyRecord> {
        self.builders
            .into_iter()
            .map(RecordBuilder::into_record)
            .collect()
    }
}

/// One geography record under construction, with a key→index map per entry
/// list so repeated cluster rows merge in constant time.
pub struct RecordBuilder {
    record: GeographyRecord,
    task_index: HashMap<String, usize>,
    request_index: HashMap<String, usize>,
    collaboration_index: HashMap<String, usize>,
}

impl RecordBuilder {
    pub fn new(geo_id: &str, geography: Geography) -> Self {
        Self {
            record: GeographyRecord::new(geo_id, geography),
            task_index: HashMap::new(),
            request_index: HashMap::new(),
            collaboration_index: HashMap::new(),
        }
    }

    /// The facet router: dispatches one row's variable/value pair into the
    /// record. Cross-facet rows are accepted but not materialized.
    pub fn route(&mut self, row: &RawRow) {
        match row.facet {
            Facet::Country | Facet::StateUs => {
                self.record
                    .metrics
                    .insert(row.variable.clone(), metric_value(row.value));
            }
            Facet::OnetTask => {
                if row.cluster_name == NOT_CLASSIFIED {
                    return;
                }
                let slot = match self.task_index.get(&row.cluster_name) {
                    Some(&slot) => slot,
                    None => {
                        self.record.tasks.push(TaskEntry {
                            task: row.cluster_name.clone(),
                            metrics: MetricMap::new(),
                        });
                        let slot = self.record.tasks.len() - 1;
                        self.task_index.insert(row.cluster_name.clone(), slot);
                        slot
                    }
                };
                self.record.tasks[slot]
                    .metrics
                    .insert(row.variable.clone(), metric_value(row.value));
            }
            Facet::Request => {
                if row.cluster_name == NOT_CLASSIFIED {
                    return;
                }
                let slot = match self.request_index.get(&row.cluster_name) {
                    Some(&slot) => slot,
                    None => {
                        // Level is stamped from the creating row only.
                        self.record.requests.push(RequestEntry {
                            cluster_name: row.cluster_name.clone(),
                            level: row.level,
                            metrics: MetricMap::new(),
                        });
                        let slot = self.record.requests.len() - 1;
                        self.request_index.insert(row.cluster_name.clone(), slot);
                        slot
                    }
                };
                self.record.requests[slot]
                    .metrics
                    .insert(row.variable.clone(), metric_value(row.value));
            }
            Facet::Collaboration => {
                if row.cluster_name == NOT_CLASSIFIED {
                    return;
                }
                let slot = match self.collaboration_index.get(&row.cluster_name) {
                    Some(&slot) => slot,
                    None => {
                        self.record.collaboration.push(CollaborationEntry {
                            mode: row.cluster_name.clone(),
                            metrics: MetricMap::new(),
                        });
                        let slot = self.record.collaboration.len() - 1;
                        self.collaboration_index.insert(row.cluster_name.clone(), slot);
                        slot
                    }
                };
                self.record.collaboration[slot]
                    .metrics
                    .insert(row.variable.clone(), metric_value(row.value));
            }
            Facet::OnetTaskCollaboration
            | Facet::RequestCollaboration
            | Facet::OnetTaskPromptTokens
            | Facet::OnetTaskCompletionTokens
            | Facet::OnetTaskCost => {}
        }
    }

    pub fn into_record(self) -> GeographyRecord {
        self.record
    }
}

fn metric_value(value: Option<f64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}
