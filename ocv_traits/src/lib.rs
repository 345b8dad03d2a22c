//! Boundary traits between the estimator and its host.
//!
//! The estimator never touches the telemetry bus or the filesystem directly;
//! the host injects implementations of these traits.
pub mod clock;
pub mod store;

pub use clock::{Clock, MonotonicClock};
pub use store::{BlobStore, StoreError};

/// Host telemetry bus: raw sensor values as the host reports them.
///
/// `None` means the sensor has no value this tick. Units are host-specific;
/// the estimator normalizes them (see `ocv_core::throttle` and `VoltageUnit`).
pub trait Telemetry {
    fn pack_voltage(&mut self) -> Option<f32>;
    fn throttle(&mut self) -> Option<f32>;
    /// Aircraft/model name used as the persistence identity, if the host knows it.
    fn model_name(&self) -> Option<String> {
        None
    }
}
