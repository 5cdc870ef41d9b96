// aetune engine: runs searches per model family and persists what they find

pub mod report;
pub mod runner;

pub use runner::{FamilyJob, RunReport, TuningRunner, TuningSession};
