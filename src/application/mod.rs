// Use cases: the per-app pipeline, the batch driver and inspection.

pub mod batch;
pub mod inspect;
pub mod pipeline;

pub use batch::{BatchRunner, BatchSummary};
pub use inspect::inspect;
pub use pipeline::{AppOutcome, AppPipeline, AppReport};
