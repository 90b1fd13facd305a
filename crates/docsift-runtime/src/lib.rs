//! Docsift Runtime — batch expansion, the worker pool and instrumentation.

pub mod aggregate;
pub mod batch;
pub mod instrument;
pub mod pipeline;

pub use aggregate::BatchAggregator;
pub use batch::{expand, BatchRequest, Expansion};
pub use instrument::{Instrumentation, LogSink, Observation, ObservationSink};
pub use pipeline::Pipeline;
