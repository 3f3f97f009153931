use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord};

use crate::model::{Facet, Geography, RawRow};

/// Parsed contents of one source export: rows in source order plus the
/// row-level warnings collected along the way. Warnings never abort a batch;
/// only an unreadable source does.
#[derive(Debug)]
pub struct ParsedSource {
    pub rows: Vec<RawRow>,
    pub warnings: Vec<String>,
}

struct Columns {
    geo_id: usize,
    geography: usize,
    facet: usize,
    level: usize,
    variable: usize,
    cluster_name: usize,
    value: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord, source: &str) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or_else(|| anyhow::anyhow!("{source}: missing required column '{name}'"))
        };

        Ok(Self {
            geo_id: find("geo_id")?,
            geography: find("geography")?,
            facet: find("facet")?,
            level: find("level")?,
            variable: find("variable")?,
            cluster_name: find("cluster_name")?,
            value: find("value")?,
        })
    }
}

pub fn parse_file(path: &Path) -> Result<ParsedSource> {
    let file = File::open(path)
        .with_context(|| format!("failed to open source file: {}", path.display()))?;
    parse_reader(file, &path.display().to_string())
}

/// Decodes a delimited byte source into typed rows, preserving source order.
/// Unrecognized columns (date range, platform label) are ignored; blank
/// records are skipped; malformed rows are recorded as warnings and dropped.
pub fn parse_reader<R: Read>(reader: R, source: &str) -> Result<ParsedSource> {
    let mut csv = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv
        .headers()
        .with_context(|| format!("failed to read header row from {source}"))?
        .clone();
    if headers.is_empty() {
        bail!("{source}: empty header row");
    }
    let columns = Columns::from_headers(&headers, source)?;

    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    for (offset, result) in csv.records().enumerate() {
        // 1-based data line, counting the header as line 1.
        let line = offset + 2;

        let record = match result {
            Ok(record) => record,
            Err(err) => {
                warnings.push(format!("{source}:{line}: unreadable record: {err}"));
                continue;
            }
        };

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let geography_raw = field(&record, columns.geography);
        let Some(geography) = Geography::parse(geography_raw) else {
            warnings.push(format!("{source}:{line}: unknown geography '{geography_raw}'"));
            continue;
        };

        let facet_raw = field(&record, columns.facet);
        let Some(facet) = Facet::parse(facet_raw) else {
            warnings.push(format!("{source}:{line}: unknown facet '{facet_raw}'"));
            continue;
        };

        let level = match parse_integer(field(&record, columns.level)) {
            Ok(level) => level,
            Err(raw) => {
                warnings.push(format!("{source}:{line}: non-numeric level '{raw}'"));
                continue;
            }
        };

        let value = match parse_number(field(&record, columns.value)) {
            Ok(value) => value,
            Err(raw) => {
                warnings.push(format!("{source}:{line}: non-numeric value '{raw}'"));
                continue;
            }
        };

        rows.push(RawRow {
            geo_id: field(&record, columns.geo_id).to_string(),
            geography,
            facet,
            level,
            variable: field(&record, columns.variable).to_string(),
            cluster_name: field(&record, columns.cluster_name).to_string(),
            value,
        });
    }

    Ok(ParsedSource { rows, warnings })
}

fn field<'a>(record: &'a StringRecord, index: usize) -> &'a str {
    record.get(index).unwrap_or("").trim()
}

/// Numeric inference for value cells: blank stays null, numeric text becomes
/// a number, anything else is a row-level warning at the call site.
fn parse_number(raw: &str) -> Result<Option<f64>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|_| raw.to_string())
}

fn parse_integer(raw: &str) -> Result<Option<i64>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(level) = raw.parse::<i64>() {
        return Ok(Some(level));
    }
    // Some exports serialize integer levels as floats.
    match raw.parse::<f64>() {
        Ok(level) if level.fract() == 0.0 => Ok(Some(level as i64)),
        _ => Err(raw.to_string()),
    }
}
