//! `ocv inspect`: decode and print the stored record for one model.

use std::path::Path;

use ocv_core::bucket::bucket_throttle;
use ocv_core::codec::PersistedRecord;
use ocv_core::identity::model_key;
use ocv_core::persistence::read_record;
use ocv_host::FileStore;
use serde_json::json;

use crate::session;

pub fn run_inspect(
    cfg: &ocv_config::Config,
    model: Option<&str>,
    store: Option<&Path>,
    json: bool,
) -> eyre::Result<()> {
    let key = model_key(session::model_name(cfg, model));
    let dir = session::store_dir(cfg, store);
    let mut fs_store = FileStore::new(&dir);
    let record = read_record(&mut fs_store, &key)?;
    tracing::debug!(key = %key, dir = %dir.display(), found = record.is_some(), "inspect");

    let Some(record) = record else {
        if json {
            println!("{}", json!({ "key": key, "record": null }));
        } else {
            println!("No stored record for {key} in {}", dir.display());
        }
        return Ok(());
    };
    if json {
        println!("{}", record_json(&key, &record));
    } else {
        print!("{}", record_text(&key, &record));
    }
    Ok(())
}

fn record_json(key: &str, r: &PersistedRecord) -> serde_json::Value {
    json!({
        "key": key,
        "record": {
            "recovery_delay_ms": r.recovery_delay_ms,
            "chemistry": r.chemistry.map(|c| c.as_str()),
            "sag": r.sag.map(|s| s.to_vec()),
            "down": r.down.map(|d| d.to_vec()),
            "decay": r.decay.map(|d| d.to_vec()),
        }
    })
}

fn record_text(key: &str, r: &PersistedRecord) -> String {
    let mut out = format!("Record: {key}\n");
    match r.recovery_delay_ms {
        Some(d) => out.push_str(&format!("Recovery delay: {d:.0}ms\n")),
        None => out.push_str("Recovery delay: (default)\n"),
    }
    out.push_str(&format!(
        "Chemistry: {}\n",
        r.chemistry.map_or("(default)", |c| c.as_str())
    ));
    out.push_str("bucket  throttle     sag    down     decay\n");
    for i in 0..ocv_core::bucket::BUCKET_COUNT {
        let sag = r
            .sag
            .and_then(|s| s[i])
            .map_or_else(|| "   -  ".to_string(), |v| format!("{v:.3}"));
        let down = r
            .down
            .map_or_else(|| "  -  ".to_string(), |d| format!("{:.3}", d[i]));
        let decay = r
            .decay
            .map_or_else(|| "    -    ".to_string(), |d| format!("{:.6}", d[i]));
        out.push_str(&format!(
            "{i:>6}  {:>7.0}%  {sag:>6}  {down:>6}  {decay:>8}\n",
            bucket_throttle(i) * 100.0
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocv_core::bucket::BUCKET_COUNT;
    use ocv_core::codec::ChemistryFlag;

    #[test]
    fn undefined_sag_prints_as_dash() {
        let mut sag = [None; BUCKET_COUNT];
        sag[15] = Some(0.31);
        let r = PersistedRecord {
            recovery_delay_ms: Some(3_650.0),
            chemistry: Some(ChemistryFlag::HighVoltage),
            sag: Some(sag),
            ..PersistedRecord::default()
        };
        let text = record_text("Test_Quad", &r);
        assert!(text.contains("Recovery delay: 3650ms"));
        assert!(text.contains("HIGH_VOLTAGE"));
        assert!(text.contains("0.310"));
        assert_eq!(text.lines().count(), 4 + BUCKET_COUNT);

        let v = record_json("Test_Quad", &r);
        assert!(v["record"]["sag"][0].is_null());
        assert_eq!(v["record"]["down"], serde_json::Value::Null);
    }
}
