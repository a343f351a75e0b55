//! Event DQ Library
//!
//! Data-quality validation for batches of analytics events.
//! Exposes the check core plus the ingestion and report boundaries used by the
//! `dq_validate` binary and the integration tests.

pub mod ingest;
pub mod quality;
pub mod report_writer;
