//! Ownership verifier.
//!
//! Checks that a [`Function`] is well-formed ownership IR. Optimization
//! passes take verified IR as input and must produce verified IR; the
//! pipeline driver runs the verifier on both sides of every pass.
//!
//! # Checks
//!
//! 1. **Structure**: every operand names a defined value, use-lists match
//!    operand slots exactly, jumps pass one argument per target parameter,
//!    `cond_br` only targets blocks without parameters.
//! 2. **Kinds**: move sources are owned, `ref_to_unmanaged` converts an
//!    owned or guaranteed reference, `end_borrow` closes a `begin_borrow`,
//!    consuming operands are owned (or trivial), jump arguments match the
//!    target parameter's kind.
//! 3. **Linearity**: a forward dataflow over the CFG in reverse postorder
//!    tracks the set of live owned values and open borrows. Each owned value
//!    is consumed at most once per path and never read afterwards, nothing
//!    owned is live at `return`, a value is never consumed while a borrow of
//!    it is open, and every join sees the same live set from all
//!    predecessors.
//!
//! Linearity is only checked when the structural and kind checks pass:
//! dataflow over malformed IR would report noise.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::graph::{reverse_postorder, successors};
use crate::ir::{BlockId, InstKind, OperandRole, OwnershipKind, Terminator, Use, User, ValueId};
use crate::Function;

/// A single ownership-IR well-formedness violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("{user:?} reads {value}, which is not defined")]
    UndefinedOperand { value: ValueId, user: User },

    #[error("use-list of {value} does not match its operand slots")]
    UseListMismatch { value: ValueId },

    #[error("branch from {from} to {to}, which does not exist")]
    UnknownBlock { from: BlockId, to: BlockId },

    #[error("jump from {from} to {to} passes {found} arguments, expected {expected}")]
    JumpArity {
        from: BlockId,
        to: BlockId,
        expected: usize,
        found: usize,
    },

    #[error("jump from {from} passes {value} ({found}) to a {expected} parameter")]
    JumpKindMismatch {
        from: BlockId,
        value: ValueId,
        expected: OwnershipKind,
        found: OwnershipKind,
    },

    #[error("cond_br from {from} to {to}, which takes {params} parameters")]
    BranchToBlockWithParams {
        from: BlockId,
        to: BlockId,
        params: usize,
    },

    #[error("move_value source {value} is {kind}, expected @owned")]
    MoveOfNonOwned { value: ValueId, kind: OwnershipKind },

    #[error("end_borrow of {value}, which is not a begin_borrow result")]
    EndBorrowOfNonBorrow { value: ValueId },

    #[error("ref_to_unmanaged of {value}, which is {kind}, expected @owned or @guaranteed")]
    EscapeOfNonReference { value: ValueId, kind: OwnershipKind },

    #[error("{opcode} consumes {value}, which is {kind}")]
    ConsumeOfNonOwned {
        value: ValueId,
        kind: OwnershipKind,
        opcode: &'static str,
    },

    #[error("{value} is used in {block} after its lifetime ended (or on a path where it is not live)")]
    UseOfDeadValue { value: ValueId, block: BlockId },

    #[error("{value} is consumed in {block} while borrowed by {borrow}")]
    ConsumedWhileBorrowed {
        value: ValueId,
        borrow: ValueId,
        block: BlockId,
    },

    #[error("{value} is still live when {block} returns")]
    Leak { value: ValueId, block: BlockId },

    #[error("{block} is reached with different live values from its predecessors")]
    InconsistentJoin { block: BlockId },
}

/// Verify a function, returning every violation found.
pub fn verify_function(func: &Function) -> Result<(), Vec<VerifyError>> {
    let mut errors = Vec::new();
    check_structure(func, &mut errors);
    if errors.is_empty() {
        check_kinds(func, &mut errors);
    }
    if errors.is_empty() {
        check_linearity(func, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(
            function = func.name().raw(),
            errors = errors.len(),
            "ownership verification failed",
        );
        Err(errors)
    }
}

// Structure

fn check_structure(func: &Function, errors: &mut Vec<VerifyError>) {
    let mut expected: FxHashMap<ValueId, Vec<Use>> = FxHashMap::default();
    let mut record = |errors: &mut Vec<VerifyError>, value: ValueId, user: User, slot: usize| {
        if func.is_defined(value) {
            expected.entry(value).or_default().push(Use {
                user,
                operand: u32::try_from(slot).unwrap_or(u32::MAX),
            });
        } else {
            errors.push(VerifyError::UndefinedOperand { value, user });
        }
    };

    for block in func.block_ids() {
        let data = func.block(block);
        for &inst in data.insts() {
            for (slot, (value, _)) in func.inst(inst).operands().into_iter().enumerate() {
                record(errors, value, User::Inst(inst), slot);
            }
        }
        let terminator = data.terminator();
        for (slot, (value, _)) in terminator.operands().into_iter().enumerate() {
            record(errors, value, User::Terminator(block), slot);
        }
        for succ in successors(terminator) {
            if succ.index() >= func.num_blocks() {
                errors.push(VerifyError::UnknownBlock {
                    from: block,
                    to: succ,
                });
            }
        }
        match terminator {
            Terminator::Jump { target, args } if target.index() < func.num_blocks() => {
                let expected = func.block(*target).params().len();
                if expected != args.len() {
                    errors.push(VerifyError::JumpArity {
                        from: block,
                        to: *target,
                        expected,
                        found: args.len(),
                    });
                }
            }
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => {
                // cond_br passes no arguments.
                for target in [*then_block, *else_block] {
                    if target.index() >= func.num_blocks() {
                        continue;
                    }
                    let params = func.block(target).params().len();
                    if params != 0 {
                        errors.push(VerifyError::BranchToBlockWithParams {
                            from: block,
                            to: target,
                            params,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    for raw in 0..func.num_values() {
        let value = ValueId::new(u32::try_from(raw).unwrap_or(u32::MAX));
        let mut actual = func.uses(value).to_vec();
        let mut wanted = expected.remove(&value).unwrap_or_default();
        actual.sort_unstable();
        wanted.sort_unstable();
        if actual != wanted {
            errors.push(VerifyError::UseListMismatch { value });
        }
    }
}

// Kinds

fn check_kinds(func: &Function, errors: &mut Vec<VerifyError>) {
    for inst in func.insts_in_order() {
        let kind = func.inst(inst);
        match kind {
            InstKind::Move { operand, .. } => {
                let found = func.ownership_kind(*operand);
                if !found.is_owned() {
                    errors.push(VerifyError::MoveOfNonOwned {
                        value: *operand,
                        kind: found,
                    });
                    continue;
                }
            }
            InstKind::UnmanagedEscape { operand } => {
                let found = func.ownership_kind(*operand);
                if !matches!(found, OwnershipKind::Owned | OwnershipKind::Guaranteed) {
                    errors.push(VerifyError::EscapeOfNonReference {
                        value: *operand,
                        kind: found,
                    });
                }
            }
            InstKind::EndBorrow { operand } => {
                if borrow_base(func, *operand).is_none() {
                    errors.push(VerifyError::EndBorrowOfNonBorrow { value: *operand });
                }
                continue;
            }
            _ => {}
        }
        check_consumed_kinds(func, &kind.operands(), kind.opcode(), errors);
    }

    for block in func.block_ids() {
        let terminator = func.block(block).terminator();
        check_consumed_kinds(func, &terminator.operands(), "terminator", errors);
        if let Terminator::Jump { target, args } = terminator {
            for (&arg, &param) in args.iter().zip(func.block(*target).params()) {
                let found = func.ownership_kind(arg);
                let expected = func.ownership_kind(param);
                if found != expected {
                    errors.push(VerifyError::JumpKindMismatch {
                        from: block,
                        value: arg,
                        expected,
                        found,
                    });
                }
            }
        }
    }
}

fn check_consumed_kinds(
    func: &Function,
    operands: &[(ValueId, OperandRole)],
    opcode: &'static str,
    errors: &mut Vec<VerifyError>,
) {
    for &(value, role) in operands {
        if role != OperandRole::Consume {
            continue;
        }
        let kind = func.ownership_kind(value);
        if !matches!(kind, OwnershipKind::Owned | OwnershipKind::Trivial) {
            errors.push(VerifyError::ConsumeOfNonOwned {
                value,
                kind,
                opcode,
            });
        }
    }
}

/// The owned value borrowed by `value`, if `value` is a `begin_borrow` result.
fn borrow_base(func: &Function, value: ValueId) -> Option<ValueId> {
    match func.inst(func.defining_inst(value)?) {
        InstKind::Borrow { operand } => Some(*operand),
        _ => None,
    }
}

// Linearity

/// Live owned values and open borrows (borrow → base) at a program point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct LiveState {
    owned: BTreeSet<ValueId>,
    borrows: BTreeMap<ValueId, ValueId>,
}

impl LiveState {
    fn is_live(&self, value: ValueId) -> bool {
        self.owned.contains(&value) || self.borrows.contains_key(&value)
    }
}

/// Is `value` tracked by the linearity check?
///
/// Owned values and borrow results are. Trivial, unowned and unmanaged values
/// carry no obligation; guaranteed block parameters are borrowed from the
/// caller for the whole function.
fn is_tracked(func: &Function, value: ValueId) -> bool {
    match func.ownership_kind(value) {
        OwnershipKind::Owned => true,
        OwnershipKind::Guaranteed => borrow_base(func, value).is_some(),
        OwnershipKind::Unowned | OwnershipKind::Unmanaged | OwnershipKind::Trivial => false,
    }
}

fn check_linearity(func: &Function, errors: &mut Vec<VerifyError>) {
    let mut entry_states: Vec<Option<LiveState>> = vec![None; func.num_blocks()];
    let mut reported_joins: BTreeSet<BlockId> = BTreeSet::new();

    let mut entry_state = LiveState::default();
    for &param in func.params() {
        if func.ownership_kind(param).is_owned() {
            entry_state.owned.insert(param);
        }
    }
    entry_states[func.entry().index()] = Some(entry_state);

    for block in reverse_postorder(func) {
        let Some(mut state) = entry_states[block.index()].clone() else {
            continue;
        };
        let data = func.block(block);

        for &inst in data.insts() {
            let kind = func.inst(inst);
            apply_operands(func, block, &kind.operands(), &mut state, errors);
            if let Some(result) = func.inst_result(inst) {
                if let InstKind::Borrow { operand } = kind {
                    state.borrows.insert(result, *operand);
                } else if func.ownership_kind(result).is_owned() {
                    state.owned.insert(result);
                }
            }
        }

        let terminator = data.terminator();
        apply_operands(func, block, &terminator.operands(), &mut state, errors);

        match terminator {
            Terminator::Return { .. } => {
                let leaked = state.owned.iter().chain(state.borrows.keys());
                for &value in leaked {
                    errors.push(VerifyError::Leak { value, block });
                }
            }
            Terminator::Jump { target, .. } => {
                let mut out = state.clone();
                for &param in func.block(*target).params() {
                    if func.ownership_kind(param).is_owned() {
                        out.owned.insert(param);
                    }
                }
                merge_into(&mut entry_states, *target, out, &mut reported_joins, errors);
            }
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => {
                for succ in [*then_block, *else_block] {
                    merge_into(
                        &mut entry_states,
                        succ,
                        state.clone(),
                        &mut reported_joins,
                        errors,
                    );
                }
            }
            Terminator::Unreachable => {}
        }
    }
}

fn apply_operands(
    func: &Function,
    block: BlockId,
    operands: &[(ValueId, OperandRole)],
    state: &mut LiveState,
    errors: &mut Vec<VerifyError>,
) {
    for &(value, role) in operands {
        if !is_tracked(func, value) {
            continue;
        }
        if !state.is_live(value) {
            errors.push(VerifyError::UseOfDeadValue { value, block });
            continue;
        }
        match role {
            OperandRole::Consume => {
                let open_borrow = state
                    .borrows
                    .iter()
                    .find(|&(_, &base)| base == value)
                    .map(|(&borrow, _)| borrow);
                if let Some(borrow) = open_borrow {
                    errors.push(VerifyError::ConsumedWhileBorrowed {
                        value,
                        borrow,
                        block,
                    });
                }
                state.owned.remove(&value);
            }
            OperandRole::EndBorrow => {
                state.borrows.remove(&value);
            }
            OperandRole::Instantaneous => {}
        }
    }
}

fn merge_into(
    entry_states: &mut [Option<LiveState>],
    target: BlockId,
    incoming: LiveState,
    reported: &mut BTreeSet<BlockId>,
    errors: &mut Vec<VerifyError>,
) {
    match &entry_states[target.index()] {
        None => entry_states[target.index()] = Some(incoming),
        Some(existing) => {
            if *existing != incoming && reported.insert(target) {
                errors.push(VerifyError::InconsistentJoin { block: target });
            }
        }
    }
}

#[cfg(test)]
mod tests;
