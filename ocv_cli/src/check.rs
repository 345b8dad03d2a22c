//! `ocv self-check`: the config builds an estimator and the store is usable.

use std::path::Path;

use eyre::WrapErr;
use ocv_core::EstimatorError;
use ocv_core::mocks::NullStore;
use ocv_host::FileStore;
use ocv_traits::BlobStore;
use serde_json::json;

use crate::session;

pub fn run_self_check(cfg: &ocv_config::Config, json: bool) -> eyre::Result<()> {
    // Core-side validation, independent of the TOML checks already done.
    session::build(cfg, Box::new(NullStore), cfg.sensors.model.as_deref())?;

    let store = if cfg.persistence.enabled {
        let dir = session::store_dir(cfg, None::<&Path>);
        let mut fs_store = FileStore::new(&dir);
        fs_store
            .probe()
            .map_err(EstimatorError::from)
            .wrap_err_with(|| format!("probe store {}", dir.display()))?;
        Some(dir)
    } else {
        None
    };

    if json {
        println!(
            "{}",
            json!({
                "status": "ok",
                "cells": cfg.pack.cells,
                "store": store.as_ref().map(|d| d.display().to_string()),
            })
        );
    } else {
        match &store {
            Some(d) => println!("OK (cells={}, store={})", cfg.pack.cells, d.display()),
            None => println!("OK (cells={}, persistence disabled)", cfg.pack.cells),
        }
    }
    Ok(())
}
