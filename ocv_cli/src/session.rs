//! Config-to-estimator assembly shared by the subcommands.

use std::path::{Path, PathBuf};

use ocv_core::config::EstimatorCfg;
use ocv_core::mocks::NullStore;
use ocv_core::{Estimator, Result as CoreResult};
use ocv_host::FileStore;
use ocv_traits::BlobStore;

pub type HostEstimator = Estimator<Box<dyn BlobStore>>;

/// Store directory: the CLI override wins over `[persistence].dir`.
pub fn store_dir(cfg: &ocv_config::Config, dir: Option<&Path>) -> PathBuf {
    dir.map_or_else(|| cfg.persistence.dir.clone(), Path::to_path_buf)
}

/// The store the estimator persists to. Disabled persistence gets a store
/// that reports itself unavailable, so the session never touches disk.
pub fn open_store(cfg: &ocv_config::Config, dir: Option<&Path>) -> Box<dyn BlobStore> {
    if cfg.persistence.enabled {
        Box::new(FileStore::new(store_dir(cfg, dir)))
    } else {
        Box::new(NullStore)
    }
}

/// Model name for the persistence identity: the CLI flag, then `[sensors].model`.
pub fn model_name<'a>(cfg: &'a ocv_config::Config, flag: Option<&'a str>) -> Option<&'a str> {
    flag.or(cfg.sensors.model.as_deref())
}

pub fn build(
    cfg: &ocv_config::Config,
    store: Box<dyn BlobStore>,
    model: Option<&str>,
) -> CoreResult<HostEstimator> {
    let est_cfg = EstimatorCfg::from(cfg);
    let est = ocv_core::build_estimator(est_cfg, store, model)?;
    tracing::info!(
        cells = cfg.pack.cells,
        key = %est.persistence().key(),
        persistence = ?est.persistence_state(),
        "estimator ready"
    );
    Ok(est)
}
