//! Staged extract-transform-load pipeline for the credit card fraud dataset.
//!
//! The flow is strictly sequential: fetch the source snapshot over HTTP,
//! upload it to the staging slot of an object store, clean it (column
//! projection, row identifier assignment, data-quality scan), publish the
//! cleaned artifact to the transformed slot, and load it into the
//! destination table with full-replace semantics so re-runs are idempotent.
//!
//! External collaborators (HTTP source, object store, warehouse) sit behind
//! ports in [`app::ports`]; adapters live in [`infra`]. The stage functions
//! themselves are in [`pipeline::tasks`] and an external orchestrator (cron,
//! Airflow, a shell loop) is expected to invoke them in order.

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod infra;
pub mod logging;
pub mod pipeline;
pub mod types;
