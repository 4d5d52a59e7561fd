//! clusterlens kube integration: job list+watch wiring and record shaping.

#![forbid(unsafe_code)]

pub mod cache;
pub mod normalize;
pub mod watcher;

pub use cache::{job_cache, CacheHandle, CacheWriter};
pub use normalize::{job_key, normalize, normalize_at};
pub use watcher::{run_job_watch, RawEvent};
