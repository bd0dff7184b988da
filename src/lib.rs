// Re-export modules for benchmarking and testing
pub mod processor;
pub mod record;
pub mod report;
pub mod tracker;
pub mod value;
