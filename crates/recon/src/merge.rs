//! Write source rows back out with the matched candidate's values appended.

use std::collections::HashMap;
use std::io::Write;

use crate::error::ReconError;
use crate::model::{LoadedRecords, MatchResult};

const MATCH_COLUMNS: [&str; 4] = ["match_identifier", "match_strategy", "match_step", "match_score"];

/// One output row per source record, in input order.
///
/// Columns: the source payload columns (input order), `match_<column>`
/// for each carried candidate column, then the match diagnostics.
pub fn write_merged_csv<W: Write>(
    writer: W,
    source: &LoadedRecords,
    results: &[MatchResult],
    carry: &[String],
) -> Result<(), ReconError> {
    let csv_err = |e: csv::Error| ReconError::Csv {
        role: "merged".into(),
        message: e.to_string(),
    };

    let mut out = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = source.headers.clone();
    header.extend(carry.iter().map(|c| format!("match_{c}")));
    header.extend(MATCH_COLUMNS.iter().map(|c| c.to_string()));
    out.write_record(&header).map_err(csv_err)?;

    let by_source: HashMap<usize, &MatchResult> =
        results.iter().map(|r| (r.source_index, r)).collect();

    for (i, record) in source.records.iter().enumerate() {
        let result = by_source.get(&i).copied();
        let candidate = result.and_then(|r| r.matched_candidate.as_ref());

        let mut row: Vec<&str> = source
            .headers
            .iter()
            .map(|h| record.payload.get(h).map(String::as_str).unwrap_or(""))
            .collect();
        for column in carry {
            row.push(
                candidate
                    .and_then(|c| c.payload.get(column))
                    .map(String::as_str)
                    .unwrap_or(""),
            );
        }

        let strategy = result.map(|r| r.strategy.to_string()).unwrap_or_default();
        let score = match result {
            Some(r) if r.is_matched() => format!("{:.4}", r.score),
            _ => String::new(),
        };
        row.push(candidate.map(|c| c.identifier.as_str()).unwrap_or(""));
        row.push(&strategy);
        row.push(result.and_then(|r| r.step.as_deref()).unwrap_or(""));
        row.push(&score);

        out.write_record(&row).map_err(csv_err)?;
    }

    out.flush()?;
    Ok(())
}
