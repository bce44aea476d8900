//! Turn exported CSV / JSON tables into catalog records.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{InputFormat, RoleConfig};
use crate::error::ReconError;
use crate::model::{CatalogRecord, LoadedRecords};

/// Read `path` and parse it in the role's configured format.
pub fn load_file(role: &str, path: &Path, role_config: &RoleConfig) -> Result<LoadedRecords, ReconError> {
    let data = std::fs::read_to_string(path)?;
    let loaded = match role_config.input_format() {
        InputFormat::Csv => load_csv_records(role, &data, role_config)?,
        InputFormat::Json => load_json_records(role, &data, role_config)?,
    };
    log::debug!("{role}: loaded {} records from {}", loaded.records.len(), path.display());
    Ok(loaded)
}

/// Load delimited rows, applying column mapping and filter.
pub fn load_csv_records(
    role: &str,
    csv_data: &str,
    role_config: &RoleConfig,
) -> Result<LoadedRecords, ReconError> {
    let csv_err = |e: csv::Error| ReconError::Csv {
        role: role.into(),
        message: e.to_string(),
    };

    // Validated as ASCII when the config was loaded.
    let mut delimiter = [0u8; 4];
    role_config.delimiter.encode_utf8(&mut delimiter);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter[0])
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mapper = RowMapper::new(role, &headers, role_config)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        let cell = |i: usize| row.get(i).unwrap_or("");
        if let Some(record) = mapper.map(cell) {
            records.push(record);
        }
    }

    Ok(LoadedRecords {
        headers: mapper.payload_headers(),
        records,
    })
}

/// Load a JSON array of flat objects. Scalars are stringified, `null` is
/// empty; nested arrays/objects are rejected.
pub fn load_json_records(
    role: &str,
    json_data: &str,
    role_config: &RoleConfig,
) -> Result<LoadedRecords, ReconError> {
    let json_err = |message: String| ReconError::Json {
        role: role.into(),
        message,
    };

    let value: serde_json::Value =
        serde_json::from_str(json_data).map_err(|e| json_err(e.to_string()))?;
    let rows = value
        .as_array()
        .ok_or_else(|| json_err("expected an array of objects".into()))?;

    // Header order: first appearance across rows.
    let mut headers: Vec<String> = Vec::new();
    let mut flat_rows: Vec<BTreeMap<String, String>> = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .ok_or_else(|| json_err(format!("row {i}: expected object")))?;
        let mut flat = BTreeMap::new();
        for (key, val) in obj {
            let text = match val {
                serde_json::Value::Null => String::new(),
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => return Err(json_err(format!("row {i}, key \"{key}\": non-scalar value"))),
            };
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
            flat.insert(key.clone(), text);
        }
        flat_rows.push(flat);
    }

    let mapper = RowMapper::new(role, &headers, role_config)?;
    let records = flat_rows
        .iter()
        .filter_map(|flat| {
            mapper.map(|i| flat.get(&headers[i]).map(String::as_str).unwrap_or(""))
        })
        .collect();

    Ok(LoadedRecords {
        headers: mapper.payload_headers(),
        records,
    })
}

/// Resolved column positions for one role.
struct RowMapper<'a> {
    headers: &'a [String],
    identifier: Option<usize>,
    display_name: Option<usize>,
    payload: Vec<usize>,
    filter: Option<(usize, &'a [String])>,
}

impl<'a> RowMapper<'a> {
    fn new(role: &str, headers: &'a [String], role_config: &'a RoleConfig) -> Result<Self, ReconError> {
        let idx = |name: &str| -> Result<usize, ReconError> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ReconError::MissingColumn {
                    role: role.into(),
                    column: name.into(),
                })
        };

        let cols = &role_config.columns;
        let identifier = cols.identifier.as_deref().map(idx).transpose()?;
        let display_name = cols.display_name.as_deref().map(idx).transpose()?;

        let payload = if cols.payload.is_empty() {
            (0..headers.len()).collect()
        } else {
            cols.payload
                .iter()
                .map(|c| idx(c))
                .collect::<Result<Vec<_>, _>>()?
        };

        let filter = match role_config.filter {
            Some(ref f) => Some((idx(&f.column)?, f.values.as_slice())),
            None => None,
        };

        Ok(Self {
            headers,
            identifier,
            display_name,
            payload,
            filter,
        })
    }

    /// Build a record from a cell accessor, or `None` if the row is filtered out.
    fn map<'r>(&self, cell: impl Fn(usize) -> &'r str) -> Option<CatalogRecord> {
        if let Some((fi, values)) = self.filter {
            let val = cell(fi);
            if !values.iter().any(|v| v == val) {
                return None;
            }
        }

        let payload = self
            .payload
            .iter()
            .map(|&i| (self.headers[i].clone(), cell(i).to_string()))
            .collect();

        Some(CatalogRecord {
            identifier: self.identifier.map(&cell).unwrap_or("").to_string(),
            display_name: self.display_name.map(&cell).unwrap_or("").to_string(),
            payload,
        })
    }

    fn payload_headers(&self) -> Vec<String> {
        self.payload.iter().map(|&i| self.headers[i].clone()).collect()
    }
}
