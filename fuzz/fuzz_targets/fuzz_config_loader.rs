#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not. A config that
    // validates must also convert and build.
    let Ok(cfg) = toml::from_str::<ocv_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        let est_cfg = ocv_core::config::EstimatorCfg::from(&cfg);
        let _ = ocv_core::build_estimator(est_cfg, ocv_core::mocks::NullStore, cfg.sensors.model.as_deref());
    }
});
