#![no_main]
use libfuzzer_sys::fuzz_target;

use ocv_core::codec;
use ocv_core::mocks::MemoryStore;
use ocv_core::{Estimator, Sample};

fuzz_target!(|data: &str| {
    // Any accepted record must re-encode to a record that decodes again.
    if let Ok(record) = codec::decode(data) {
        let again = codec::decode(&codec::encode(&record));
        assert!(again.is_ok());
    }

    // Loading arbitrary bytes never panics and never poisons the estimate.
    let mut store = MemoryStore::new();
    store.insert("default", data);
    let Ok(mut est) = Estimator::builder().cells(1).store(store).build() else {
        return;
    };
    est.load_persisted();
    if let Some(e) = est.tick(Sample::new(0, 3.8, 0.0)).estimate() {
        assert!(e.percent.is_finite() && (0.0..=100.0).contains(&e.percent));
    }
});
