pub mod ingest;
pub mod liveness;
pub mod query;
pub mod readiness;
