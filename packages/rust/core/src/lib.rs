//! Core pipeline orchestration and domain logic for DealScout.
//!
//! This crate ties together change detection, content extraction, founder
//! resolution, entity extraction and the CRM/mail side effects into one
//! polling cycle (see [`pipeline::Pipeline::run_cycle`]).

pub mod entities;
pub mod followup;
pub mod naming;
pub mod pipeline;
pub mod resolver;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use pipeline::{
    Collaborators, CycleSummary, DocumentFailure, Pipeline, PipelineOptions, ProgressReporter,
    SilentProgress, Stage, StageFailure, next_high_water_mark,
};
pub use scheduler::{run_forever, run_until};
