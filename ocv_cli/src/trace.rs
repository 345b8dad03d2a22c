//! Recorded telemetry traces: CSV with a `time_ms` column plus the voltage
//! and throttle columns named in `[sensors]`. An empty cell is a missing sample.

use std::path::Path;

use ocv_core::Sample;

pub const TIME_COLUMN: &str = "time_ms";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceRow {
    pub time_ms: u64,
    pub voltage: Option<f32>,
    pub throttle: Option<f32>,
}

impl From<TraceRow> for Sample {
    fn from(r: TraceRow) -> Self {
        Self {
            now_ms: r.time_ms,
            pack_voltage: r.voltage,
            throttle: r.throttle,
        }
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn optional_value(
    rec: &csv::StringRecord,
    idx: usize,
    name: &str,
    line: usize,
) -> eyre::Result<Option<f32>> {
    let raw = rec.get(idx).map_or("", str::trim);
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f32>()
        .map(Some)
        .map_err(|e| eyre::eyre!("invalid trace row {line}: {name} {raw:?}: {e}"))
}

pub fn load_trace_csv(
    path: &Path,
    voltage_col: &str,
    throttle_col: &str,
) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let (Some(t_idx), Some(v_idx), Some(thr_idx)) = (
        column(&headers, TIME_COLUMN),
        column(&headers, voltage_col),
        column(&headers, throttle_col),
    ) else {
        let actual: Vec<&str> = headers.iter().collect();
        eyre::bail!(
            "trace CSV must have columns '{TIME_COLUMN},{voltage_col},{throttle_col}', got: {}",
            actual.join(",")
        );
    };

    let mut rows = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let line = idx + 2;
        let rec = rec.map_err(|e| eyre::eyre!("invalid trace row {line}: {e}"))?;
        let raw_t = rec.get(t_idx).map_or("", str::trim);
        let time_ms = raw_t
            .parse::<u64>()
            .map_err(|e| eyre::eyre!("invalid trace row {line}: {TIME_COLUMN} {raw_t:?}: {e}"))?;
        rows.push(TraceRow {
            time_ms,
            voltage: optional_value(&rec, v_idx, voltage_col, line)?,
            throttle: optional_value(&rec, thr_idx, throttle_col, line)?,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_named_columns_in_any_order_with_gaps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "thr,extra,time_ms,RxBt\n0,x,0,16.8\n,x,100,16.7\n50,x,200,\n").unwrap();
        let rows = load_trace_csv(&path, "RxBt", "thr").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            TraceRow {
                time_ms: 0,
                voltage: Some(16.8),
                throttle: Some(0.0)
            }
        );
        assert_eq!(rows[1].throttle, None);
        assert_eq!(rows[2].voltage, None);
        assert_eq!(rows[2].throttle, Some(50.0));
    }

    #[test]
    fn missing_column_names_the_expected_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "time_ms,volts,thr\n0,16.8,0\n").unwrap();
        let err = load_trace_csv(&path, "RxBt", "thr").unwrap_err();
        assert!(err.to_string().contains("time_ms,RxBt,thr"), "{err}");
    }

    #[test]
    fn bad_time_reports_line_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "time_ms,RxBt,thr\n0,16.8,0\nsoon,16.8,0\n").unwrap();
        let err = load_trace_csv(&path, "RxBt", "thr").unwrap_err();
        assert!(err.to_string().contains("row 3"), "{err}");
    }
}
