//! The resource watch -> normalize -> aggregate -> flush pipeline.
//!
//! Four cooperating tasks per resource kind: the watch loop feeding raw
//! events, a relay doing scope filtering and normalization, and two
//! independently scheduled periodic tasks (metrics aggregation, event flush).
//! A single cancellation token stops everything; the controller joins every
//! task before returning.

#![forbid(unsafe_code)]

pub mod aggregate;
pub mod controller;
pub mod flush;
pub mod queue;
pub mod relay;

pub use aggregate::Aggregator;
pub use controller::PipelineController;
pub use flush::Flusher;
pub use queue::IngestQueue;
pub use relay::spawn_relay;
