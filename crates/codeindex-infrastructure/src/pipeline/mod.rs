//! Directory scanner and dual-store ingestion pipeline.

pub mod batch;
pub mod scanner;

pub use batch::{Batch, BatchAccumulator, BatchAccumulatorConfig};
pub use scanner::{ScanConfig, ScanStats, Scanner};
