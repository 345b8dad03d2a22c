use ocv_config::{ChemistryMode, VoltageUnit, load_file, load_toml};
use rstest::rstest;
use std::io::Write;

const FULL: &str = r#"
[pack]
cells = 6
voltage_unit = "centivolts"

[sensors]
voltage = "VFAS"
throttle = "ch3"
model = "Trainer 40"

[chemistry]
mode = "high_voltage"
detect_cell_v = 4.27
detect_count = 12

[rate]
adaptive = false
min_update_ms = 50
max_update_ms = 500
fixed_period_ms = 100

[throttle]
rest = 0.04
capture = 0.2
no_comp = 0.04
ramp_end = 0.3

[recovery]
plateau_hold_ms = 2000
min_low_ms = 3000

[persistence]
enabled = false
dir = "/tmp/ocv"
save_interval_ms = 60000

[logging]
rotation = "daily"
"#;

#[test]
fn full_config_parses_and_validates() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.pack.voltage_unit, VoltageUnit::Centivolts);
    assert_eq!(cfg.chemistry.mode, ChemistryMode::HighVoltage);
    assert_eq!(cfg.sensors.model.as_deref(), Some("Trainer 40"));
    assert!(!cfg.rate.adaptive);
    assert_eq!(cfg.recovery.plateau_hold_ms, 2000);
    // untouched fields keep their defaults
    assert_eq!(cfg.recovery.delay_default_ms, 4000.0);
    assert!(!cfg.persistence.enabled);
}

#[rstest]
#[case("[pack]\ncells = 0\n", "pack.cells")]
#[case("[pack]\ncells = 3\n[throttle]\nrest = 0.2\ncapture = 0.1\n", "throttle.capture must be > throttle.rest")]
#[case("[pack]\ncells = 3\n[throttle]\nno_comp = 0.3\nramp_end = 0.2\n", "throttle.ramp_end")]
#[case("[pack]\ncells = 3\n[rate]\nmin_update_ms = 500\nmax_update_ms = 100\n", "rate.max_update_ms")]
#[case("[pack]\ncells = 3\n[recovery]\ndelay_default_ms = 100.0\n", "recovery.delay_default_ms")]
#[case("[pack]\ncells = 3\n[sag]\nfast_ema = 0.0\n", "sag.fast_ema")]
#[case("[pack]\ncells = 3\n[sag]\ndown_confirmations = 0\n", "sag.down_confirmations")]
#[case("[pack]\ncells = 3\n[decay]\nrate_min = 0.02\n", "decay.rate_min")]
#[case("[pack]\ncells = 3\n[output]\nmin_cell_v = 4.5\n", "output voltage limits")]
#[case("[pack]\ncells = 3\n[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
#[case("[pack]\ncells = 3\n[chemistry]\ndetect_count = 0\n", "chemistry.detect_count")]
fn rejects_out_of_range(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "message {msg:?} lacks {needle:?}");
}

#[test]
fn unknown_chemistry_mode_is_a_parse_error() {
    let err = load_toml("[pack]\ncells = 3\n[chemistry]\nmode = \"nimh\"\n").unwrap_err();
    assert!(format!("{err}").contains("unknown variant"));
}

#[test]
fn load_file_reads_from_disk() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(FULL.as_bytes()).unwrap();
    let cfg = load_file(f.path()).expect("load");
    assert_eq!(cfg.pack.cells, 6);
}

#[test]
fn load_file_reports_path_on_missing_file() {
    let err = load_file(std::path::Path::new("/nonexistent/ocv.toml")).unwrap_err();
    assert!(format!("{err}").contains("read config"));
}
