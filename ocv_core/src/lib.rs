#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::float_cmp
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Open-circuit voltage estimation without a current sensor (hardware-agnostic).
//!
//! The estimator sees one loaded pack voltage and one throttle value per tick
//! and reports the voltage each cell would show at rest. All host interaction
//! goes through `ocv_traits::Telemetry` and `ocv_traits::BlobStore`.
//!
//! ## Architecture
//!
//! - **Gating**: adaptive processing cadence (`rate`)
//! - **Chemistry**: standard vs. high-voltage latch (`chemistry`, `percent`)
//! - **Learning**: per-bucket sag (`sag`) and open-circuit decay (`decay`)
//! - **State**: composite recovery/episode machine (`machine`, `recovery`, `episode`)
//! - **Anchor**: confirmed rest voltage (`cap`)
//! - **Persistence**: record codec and load/save lifecycle (`codec`, `persistence`)
//! - **Orchestration**: the per-tick driver (`estimator`)
//!
//! Internally every voltage is per cell, in volts; time is host milliseconds.

pub mod bucket;
pub mod builder;
pub mod cap;
pub mod chemistry;
pub mod codec;
pub mod config;
pub mod conversions;
pub mod decay;
pub mod episode;
pub mod error;
pub mod estimator;
pub mod identity;
pub mod machine;
pub mod mocks;
pub mod output;
pub mod percent;
pub mod persistence;
pub mod rate;
pub mod recovery;
pub mod sag;
pub mod status;
pub mod throttle;
pub mod util;

pub use builder::{EstimatorBuilder, Missing, Set, build_estimator};
pub use chemistry::Chemistry;
pub use codec::{ChemistryFlag, PersistedRecord};
pub use error::{BuildError, CodecError, EstimatorError, Result};
pub use estimator::{Estimator, Sample};
pub use machine::{Phase, PhaseKind};
pub use output::{Estimate, Frame};
pub use persistence::PersistenceState;
pub use status::{SkipReason, TickStatus};
