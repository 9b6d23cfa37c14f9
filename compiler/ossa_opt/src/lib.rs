//! Optimizer passes over ownership-form IR.
//!
//! - [`lifetime`]: lexical/escaping characteristics of value lifetimes.
//! - [`move_elim`]: redundant `move_value` elimination and its decision log.
//! - [`pipeline`]: verify-run-verify driver over a [`Module`], parallel per
//!   function.
//!
//! # Debug Environment Variables
//!
//! - `RUST_LOG=ossa_opt=debug`: per-function summaries and verification
//!   phases. Call [`init_tracing`] first.
//! - `RUST_LOG=ossa_opt::move_elim=trace`: one event per move decision.
//! - `OSSA_VERIFY`, `OSSA_PARALLEL`, `OSSA_DUMP_MOVES`: read by
//!   [`PipelineConfig::from_env`].

pub mod lifetime;
pub mod move_elim;
pub mod pipeline;
mod tracing_setup;

#[cfg(test)]
mod test_helpers;

pub use lifetime::{is_escaping, is_lexical, lifetime_traits, LifetimeTraits};
pub use move_elim::{
    eliminate_redundant_moves, eliminate_redundant_moves_with_decisions, format_decisions,
    IndeterminateOwnership, MoveDecision, MoveElimReport, MoveOutcome,
};
pub use pipeline::{
    run_move_elimination, FunctionReport, Module, PassContext, PipelineConfig, PipelineError,
    PipelineReport,
};
pub use tracing_setup::init_tracing;
