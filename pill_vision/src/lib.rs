// THEORY:
// This file is the main entry point for the `pill_vision` library crate.
//
// The primary goal is to export the counting pipeline (`pipeline::segment`,
// `pipeline::estimate_points`, `CountingPipeline` and their data structures) as
// the clean, high-level interface. The individual stages live in `core_modules`
// and stay public so callers and tests can run them in isolation, but ordinary
// consumers only ever need `pipeline` and, from async code, `parallel_pipeline`.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use error::{PipelineError, Result};
