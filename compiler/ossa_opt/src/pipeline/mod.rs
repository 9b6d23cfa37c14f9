//! Pipeline driver: verify, eliminate, verify.
//!
//! Runs move elimination over every function of a [`Module`]. Functions
//! are independent, so with [`PipelineConfig::parallel`] they are processed
//! on the rayon pool; the report lists functions in module order either
//! way.
//!
//! The verifier brackets the pass. A function that fails verification on
//! input is rejected before anything is mutated ([`PipelineError::InvalidInput`]).
//! A function that fails on output means the pass broke its contract
//! ([`PipelineError::InvariantViolated`]); that is a compiler defect, not a
//! user error.

use ossa_ir::{verify_function, Function, Name, StringInterner, VerifyError};
use rayon::prelude::*;

use crate::move_elim::{eliminate_redundant_moves_with_decisions, format_decisions, MoveDecision};

/// A compilation unit: the functions the pipeline runs over.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Module {
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(functions: Vec<Function>) -> Self {
        Self { functions }
    }
}

/// Session state shared by every function's pass invocation.
///
/// Read-only while the pipeline runs, so it is shared across rayon workers
/// by reference.
#[derive(Clone, Copy)]
pub struct PassContext<'a> {
    interner: &'a StringInterner,
}

impl<'a> PassContext<'a> {
    pub fn new(interner: &'a StringInterner) -> Self {
        Self { interner }
    }

    #[inline]
    pub fn interner(&self) -> &'a StringInterner {
        self.interner
    }

    /// A function's name as written in source.
    pub fn function_name(&self, name: Name) -> String {
        self.interner.lookup(name).to_owned()
    }
}

/// Pipeline settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Verify every function before the pass.
    pub verify_input: bool,
    /// Verify every function after the pass.
    pub verify_output: bool,
    /// Process functions on the rayon pool.
    pub parallel: bool,
    /// Keep per-move decisions in the report.
    pub record_decisions: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            verify_input: true,
            verify_output: true,
            parallel: true,
            record_decisions: false,
        }
    }
}

impl PipelineConfig {
    /// Environment variable toggling both verification phases.
    pub const VERIFY_VAR: &'static str = "OSSA_VERIFY";
    /// Environment variable toggling parallel execution.
    pub const PARALLEL_VAR: &'static str = "OSSA_PARALLEL";
    /// Environment variable toggling decision recording.
    pub const DUMP_MOVES_VAR: &'static str = "OSSA_DUMP_MOVES";

    /// Defaults, overridden by `OSSA_VERIFY`, `OSSA_PARALLEL` and
    /// `OSSA_DUMP_MOVES` (`0` or `1`) when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults, overridden by whatever `lookup` returns for each variable.
    ///
    /// Values other than `0`/`1` (also `false`/`true`) are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |var: &str| lookup(var).and_then(|value| parse_flag(&value));
        let mut config = Self::default();
        if let Some(verify) = flag(Self::VERIFY_VAR) {
            config.verify_input = verify;
            config.verify_output = verify;
        }
        if let Some(parallel) = flag(Self::PARALLEL_VAR) {
            config.parallel = parallel;
        }
        if let Some(record) = flag(Self::DUMP_MOVES_VAR) {
            config.record_decisions = record;
        }
        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Pipeline failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// A function handed to the pipeline is not valid ownership IR.
    #[error("@{function} is not valid ownership IR: {}", join_errors(.errors))]
    InvalidInput {
        function: String,
        errors: Vec<VerifyError>,
    },

    /// Move elimination produced invalid ownership IR.
    #[error("move elimination broke @{function}: {}", join_errors(.errors))]
    InvariantViolated {
        function: String,
        errors: Vec<VerifyError>,
    },
}

fn join_errors(errors: &[VerifyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Per-function outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionReport {
    pub name: Name,
    pub eliminated: usize,
    /// Empty unless [`PipelineConfig::record_decisions`] is set.
    pub decisions: Vec<MoveDecision>,
}

/// Outcome of a pipeline run, in module order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub functions: Vec<FunctionReport>,
    pub total_eliminated: usize,
}

impl PipelineReport {
    /// Recorded decisions for every function, headed by the function name.
    /// Functions without recorded decisions are skipped.
    pub fn dump(&self, ctx: &PassContext<'_>) -> String {
        let mut out = String::new();
        for function in self.functions.iter().filter(|f| !f.decisions.is_empty()) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push('@');
            out.push_str(&ctx.function_name(function.name));
            out.push_str(":\n");
            out.push_str(&format_decisions(&function.decisions));
        }
        out
    }
}

/// Run move elimination over `module`.
///
/// # Errors
/// [`PipelineError::InvalidInput`] for the first function (in module order)
/// failing input verification; nothing is mutated in that case.
/// [`PipelineError::InvariantViolated`] for the first function failing
/// output verification.
pub fn run_move_elimination(
    module: &mut Module,
    ctx: &PassContext<'_>,
    config: &PipelineConfig,
) -> Result<PipelineReport, PipelineError> {
    tracing::debug!(
        functions = module.functions.len(),
        parallel = config.parallel,
        "running move elimination",
    );

    if config.verify_input {
        for func in &module.functions {
            verify_function(func).map_err(|errors| PipelineError::InvalidInput {
                function: ctx.function_name(func.name()),
                errors,
            })?;
        }
        tracing::debug!("input verification passed");
    }

    let run_one = |func: &mut Function| -> Result<FunctionReport, PipelineError> {
        let report = eliminate_redundant_moves_with_decisions(func);
        if config.verify_output {
            verify_function(func).map_err(|errors| PipelineError::InvariantViolated {
                function: ctx.function_name(func.name()),
                errors,
            })?;
        }
        Ok(FunctionReport {
            name: func.name(),
            eliminated: report.eliminated,
            decisions: if config.record_decisions {
                report.decisions
            } else {
                Vec::new()
            },
        })
    };

    let results: Vec<Result<FunctionReport, PipelineError>> = if config.parallel {
        module.functions.par_iter_mut().map(&run_one).collect()
    } else {
        module.functions.iter_mut().map(&run_one).collect()
    };
    let functions = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    if config.verify_output {
        tracing::debug!("output verification passed");
    }

    let total_eliminated = functions.iter().map(|f| f.eliminated).sum();
    tracing::debug!(total_eliminated, "move elimination finished");

    Ok(PipelineReport {
        functions,
        total_eliminated,
    })
}
