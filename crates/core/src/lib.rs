//! clusterlens core types: normalized job records, scope summaries, config.

#![forbid(unsafe_code)]

pub mod config;
pub mod record;
pub mod summary;

pub use config::{qualifies, AgentConfig, ConfigHandle};
pub use record::{truncate_field, JobRecord, RecordKey};
pub use summary::{flatten_points, summarize, MetricPoint, ScopeSummary};

/// Sentinel scope under which cluster-wide aggregates are reported.
pub const ALL_SCOPE: &str = "ALL";

/// Maximum serialized length of flattened label/annotation fields.
pub const MAX_FIELD_LENGTH: usize = 4000;

pub mod prelude {
    pub use super::{
        qualifies, AgentConfig, ConfigHandle, JobRecord, MetricPoint, RecordKey, ScopeSummary,
        ALL_SCOPE, MAX_FIELD_LENGTH,
    };
}
