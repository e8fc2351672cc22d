//! Background Jobs Module
//!
//! Jobs scheduled by the job scheduler service. Each job is idempotent for a
//! given day and logs per-item failures instead of aborting.
//!
//! - `daily_snapshot_job` - Records end-of-day portfolio totals and benchmark closes

pub mod daily_snapshot_job;
