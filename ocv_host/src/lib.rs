//! Host-side collaborators for the estimator: a directory-backed store and a
//! simulated pack that stands in for the telemetry bus.
pub mod error;
pub mod profile;
pub mod sim;
pub mod store;
pub mod util;

pub use profile::{Segment, ThrottleProfile};
pub use sim::{PackModel, SimulatedPack};
pub use store::FileStore;
