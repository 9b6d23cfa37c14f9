//! Redundant move elimination.
//!
//! A `move_value` ends its source's lifetime and starts a new one. When the
//! two lifetimes have identical characteristics (lexical and escaping, see
//! [`crate::lifetime`]) the move carries no information: every use of the
//! destination is rewritten to the source and the move is deleted, merging
//! the two lifetimes into one.
//!
//! # Algorithm
//!
//! Moves are visited once, in block order and then instruction order. For a
//! move `M: %S' = move_value %S`:
//!
//! 1. **Ownership gate.** Unless the definer of `%S` is known to produce an
//!    owned value, `M` is kept. Block parameters and call results qualify
//!    when their kind is `@owned`; `move_value`, `copy_value` and `struct`
//!    always do; `enum` qualifies only through an owned payload. A
//!    payload-free `enum` is never an owned producer, whatever its type.
//! 2. **Old lifetime**: `(is_lexical(%S), is_escaping(%S, until M))`.
//! 3. **New lifetime**: `(M.lexical, is_escaping(%S'))`.
//! 4. Equal tuples: replace all uses of `%S'` with `%S`, erase `M`.
//!
//! One sweep reaches a fixed point. A later move reads its source after
//! earlier substitutions, so chains `a -> b -> c` collapse in one
//! invocation, and a merge never changes the tuple of a move already
//! decided: merged lifetimes had equal characteristics to begin with.
//!
//! # Side effects
//!
//! Only `move_value` instructions are erased. Every other instruction keeps
//! its position; only operand slots naming an eliminated destination change.

use std::fmt;

use ossa_ir::{Function, InstId, InstKind, OwnershipKind, ValueDef, ValueId};

use crate::lifetime::{is_escaping, is_lexical, LifetimeTraits};

// Ownership gate

/// Why a move source was not attributed to an owned producer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndeterminateOwnership {
    /// `enum` without a payload: nothing owned flows into it.
    PayloadFreeEnum,
    /// The definer produces a value of a non-owned kind.
    NonOwnedDefinition(OwnershipKind),
    /// `enum` whose payload is not owned.
    NonOwnedPayload(OwnershipKind),
}

impl fmt::Display for IndeterminateOwnership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadFreeEnum => f.write_str("payload-free enum"),
            Self::NonOwnedDefinition(kind) => write!(f, "{kind} definition"),
            Self::NonOwnedPayload(kind) => write!(f, "{kind} enum payload"),
        }
    }
}

/// Does the definer of `value` guarantee an owned value?
fn attribute_ownership(func: &Function, value: ValueId) -> Result<(), IndeterminateOwnership> {
    let owned_kind = |kind: OwnershipKind| {
        if kind.is_owned() {
            Ok(())
        } else {
            Err(IndeterminateOwnership::NonOwnedDefinition(kind))
        }
    };

    let inst = match func.value_def(value) {
        ValueDef::Param { .. } => return owned_kind(func.ownership_kind(value)),
        ValueDef::Inst(inst) => inst,
    };

    match func.inst(inst) {
        InstKind::Move { .. } | InstKind::Copy { .. } | InstKind::Construct { .. } => Ok(()),
        InstKind::Apply { .. } => owned_kind(func.ownership_kind(value)),
        InstKind::Enum {
            payload: Some(payload),
            ..
        } => {
            let kind = func.ownership_kind(*payload);
            if kind.is_owned() {
                Ok(())
            } else {
                Err(IndeterminateOwnership::NonOwnedPayload(kind))
            }
        }
        InstKind::Enum { payload: None, .. } => Err(IndeterminateOwnership::PayloadFreeEnum),
        InstKind::Borrow { .. } | InstKind::UnmanagedEscape { .. } | InstKind::RefToUnowned { .. } => {
            Err(IndeterminateOwnership::NonOwnedDefinition(
                func.ownership_kind(value),
            ))
        }
        kind @ (InstKind::Destroy { .. } | InstKind::EndBorrow { .. }) => {
            panic!("{value} is defined by {}, which has no result", kind.opcode())
        }
    }
}

// Decisions

/// What happened to one move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Both lifetimes matched; the move was erased.
    Removed {
        old: LifetimeTraits,
        new: LifetimeTraits,
    },
    /// The lifetimes differ; the move stays.
    Kept {
        old: LifetimeTraits,
        new: LifetimeTraits,
    },
    /// The source's ownership could not be attributed; the move stays
    /// without its lifetimes being compared.
    Indeterminate(IndeterminateOwnership),
}

/// The record of one visited move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveDecision {
    /// The `move_value` instruction (erased if removed).
    pub inst: InstId,
    /// The move's source at the time it was visited.
    pub source: ValueId,
    /// The move's result.
    pub result: ValueId,
    /// The move's own lexical flag.
    pub lexical: bool,
    pub outcome: MoveOutcome,
}

impl MoveDecision {
    #[inline]
    pub fn is_removed(&self) -> bool {
        matches!(self.outcome, MoveOutcome::Removed { .. })
    }
}

impl fmt::Display for MoveDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "move {} = {}", self.result, self.source)?;
        if self.lexical {
            f.write_str(" [lexical]")?;
        }
        let (verdict, old, new) = match self.outcome {
            MoveOutcome::Removed { old, new } => ("removed", old, new),
            MoveOutcome::Kept { old, new } => ("kept", old, new),
            MoveOutcome::Indeterminate(reason) => {
                return write!(f, ": kept (indeterminate ownership: {reason})");
            }
        };
        write!(
            f,
            ": {verdict} (lexical_old={}, escaping_old={}, lexical_new={}, escaping_new={})",
            u8::from(old.lexical),
            u8::from(old.escaping),
            u8::from(new.lexical),
            u8::from(new.escaping),
        )
    }
}

/// Result of running the pass over one function.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveElimReport {
    /// Number of moves erased.
    pub eliminated: usize,
    /// One entry per visited move, in visit order.
    pub decisions: Vec<MoveDecision>,
}

/// Render decisions one per line, in order.
pub fn format_decisions(decisions: &[MoveDecision]) -> String {
    decisions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

// Pass driver

/// Eliminate redundant moves in `func`, returning how many were erased.
pub fn eliminate_redundant_moves(func: &mut Function) -> usize {
    eliminate_redundant_moves_with_decisions(func).eliminated
}

/// Eliminate redundant moves in `func`, recording the decision for every
/// move visited.
///
/// # Panics
/// Panics if a move reads an undefined value or a move's result is missing:
/// both mean the input was never verified.
pub fn eliminate_redundant_moves_with_decisions(func: &mut Function) -> MoveElimReport {
    let moves: Vec<InstId> = func
        .insts_in_order()
        .filter(|&inst| func.inst(inst).is_move())
        .collect();

    let mut report = MoveElimReport {
        eliminated: 0,
        decisions: Vec::with_capacity(moves.len()),
    };

    for inst in moves {
        let decision = decide(func, inst);
        tracing::trace!(
            function = func.name().raw(),
            decision = %decision,
            "move decision",
        );
        if decision.is_removed() {
            func.replace_all_uses_with(decision.result, decision.source);
            func.erase_inst(inst);
            report.eliminated += 1;
        }
        report.decisions.push(decision);
    }

    if !report.decisions.is_empty() {
        tracing::debug!(
            function = func.name().raw(),
            moves = report.decisions.len(),
            eliminated = report.eliminated,
            "move elimination",
        );
    }

    report
}

fn decide(func: &Function, inst: InstId) -> MoveDecision {
    let InstKind::Move { operand: source, lexical } = *func.inst(inst) else {
        panic!("instruction {} is not a move_value", inst.raw());
    };
    let Some(result) = func.inst_result(inst) else {
        panic!("move_value {} has no result", inst.raw());
    };
    assert!(
        func.is_defined(source),
        "move_value {} reads undefined {source}",
        inst.raw(),
    );

    let outcome = match attribute_ownership(func, source) {
        Err(reason) => MoveOutcome::Indeterminate(reason),
        Ok(()) => {
            let old = LifetimeTraits::new(
                is_lexical(func, source),
                is_escaping(func, source, Some(inst)),
            );
            let new = LifetimeTraits::new(lexical, is_escaping(func, result, None));
            if old == new {
                MoveOutcome::Removed { old, new }
            } else {
                MoveOutcome::Kept { old, new }
            }
        }
    };

    MoveDecision {
        inst,
        source,
        result,
        lexical,
        outcome,
    }
}
