use ocv_host::{PackModel, SimulatedPack, ThrottleProfile};
use ocv_traits::Telemetry;
use rstest::rstest;

fn quiet() -> PackModel {
    PackModel {
        noise_v: 0.0,
        ..PackModel::default()
    }
}

#[rstest]
fn sags_under_load_and_recovers_slowly() {
    let profile: ThrottleProfile = "0:1000,100:3000,0:10000".parse().unwrap();
    let mut pack = SimulatedPack::new(quiet(), profile);
    let idle = pack.loaded_cell_v();
    assert!((idle - 4.20).abs() < 1e-6);

    while pack.time_ms() < 4_000 {
        pack.step(100);
    }
    let loaded = pack.loaded_cell_v();
    assert!(idle - loaded > 0.3, "sag {}", idle - loaded);

    pack.step(100);
    let just_released = pack.loaded_cell_v();
    assert!(just_released < pack.rest_cell_v() - 0.2);
    while pack.time_ms() < 12_000 {
        pack.step(100);
    }
    assert!((pack.loaded_cell_v() - pack.rest_cell_v()).abs() < 0.01);
    assert!(pack.rest_cell_v() < idle, "charge was drawn");
}

#[rstest]
fn reports_in_host_units() {
    let model = PackModel {
        cells: 3,
        unit_scale: 100.0,
        ..quiet()
    };
    let mut pack = SimulatedPack::new(model, ThrottleProfile::default_flight())
        .with_soc(0.5)
        .with_name("Sim Wing");
    let v = pack.pack_voltage().unwrap();
    assert!((v - 3.75 * 3.0 * 100.0).abs() < 0.01);
    assert_eq!(pack.throttle(), Some(0.0));
    assert_eq!(pack.model_name().as_deref(), Some("Sim Wing"));
}

#[rstest]
#[case::empty("")]
#[case::no_colon("50")]
#[case::bad_pct("x:100")]
#[case::over_range("150:100")]
#[case::zero_length("50:0")]
fn bad_profiles_are_rejected(#[case] text: &str) {
    assert!(text.parse::<ThrottleProfile>().is_err());
}
