//! Step-interpretation engine: bilingual (Traditional Chinese / English)
//! test-step text in, either a generated Python/Selenium script or a live
//! browser run summary out.

pub mod classifier;
pub mod codegen;
pub mod config;
pub mod errors;
pub mod executors;
pub mod extractors;
pub mod limits;
pub mod loader;
pub mod parser;
pub mod planner;
pub mod protocol;
pub mod telemetry;
