//! Human-readable error descriptions and structured JSON error formatting.

use ocv_core::error::{BuildError, CodecError, EstimatorError};
use ocv_traits::StoreError;

/// Stable reason name for JSON output and exit codes.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<EstimatorError>() {
        Some(EstimatorError::Store(StoreError::Unavailable(_))) => "StoreUnavailable",
        Some(EstimatorError::Store(StoreError::Failed(_))) => "StoreFailed",
        Some(EstimatorError::Codec(_)) => "RecordRejected",
        None => "Error",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingCells => {
                "What happened: No cell count was given to the estimator.\nLikely causes: The [pack] section is missing `cells`.\nHow to fix: Set pack.cells to the series cell count (e.g. `cells = 4` for a 4S pack).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range or inconsistent values in the TOML.\nHow to fix: Edit the config file, then rerun `ocv self-check`."
            ),
        };
    }

    if let Some(ee) = err.downcast_ref::<EstimatorError>() {
        return match ee {
            EstimatorError::Store(StoreError::Unavailable(detail)) => format!(
                "What happened: The record store cannot be used ({detail}).\nLikely causes: The store directory does not exist and cannot be created, or is read-only.\nHow to fix: Point --store or persistence.dir at a writable directory."
            ),
            EstimatorError::Store(StoreError::Failed(detail)) => format!(
                "What happened: Reading or writing the stored record failed ({detail}).\nLikely causes: Permissions changed, the disk is full, or the file is locked.\nHow to fix: Check the store directory, then rerun."
            ),
            EstimatorError::Codec(CodecError::BucketCount { expected, found }) => format!(
                "What happened: The stored record has {found} throttle buckets; this build uses {expected}.\nLikely causes: The record was written by a build with a different bucket count.\nHow to fix: Delete the record; it will be relearned."
            ),
            EstimatorError::Codec(ce) => format!(
                "What happened: The stored record was rejected ({ce}).\nLikely causes: The file was edited by hand or truncated.\nHow to fix: Delete the record; it will be relearned."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config with an existing TOML file. Original: {msg}"
        );
    }

    if lower.contains("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nLikely causes: A typo, a missing [pack] section, or a value of the wrong type.\nHow to fix: Compare against etc/ocv_config.toml. Original: {err:#}"
        );
    }

    if lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid ({}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the TOML config and try again.",
            err.root_cause()
        );
    }

    if lower.contains("trace csv must have columns") {
        return format!(
            "Invalid headers in trace CSV. {}",
            err.root_cause()
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Map typed errors to stable exit codes; anything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "InvalidConfig" => 2,
        "StoreUnavailable" | "StoreFailed" => 3,
        "RecordRejected" => 4,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
