//! Lifetime characteristics: lexical and escaping.
//!
//! A lifetime runs from a value's introduction to its consumption on every
//! path. Two characteristics of a lifetime matter to later passes:
//!
//! - **lexical**: the lifetime is pinned to its source scope and must not be
//!   shortened. Read directly from the introducer: a `move_value`'s own flag
//!   or a block parameter's binding flag. Every other introducer is
//!   non-lexical.
//!
//! - **escaping**: some use reachable before the lifetime ends converts the
//!   value to an unmanaged reference. Never stored; computed on demand by
//!   [`is_escaping`].
//!
//! # Escape walk
//!
//! [`is_escaping`] is a reachability query over the CFG starting right after
//! the definition. Within a block it scans instructions in order; a
//! lifetime-ending use of the value (or the boundary instruction) stops the
//! path, a `ref_to_unmanaged` of the value answers `true`. When a block is
//! exhausted without the value being consumed, every successor is explored.
//! Uses in several successors therefore all count, even when no single linear
//! scan would reach them. Each block is entered at most once; re-entering the
//! defining block (around a loop) stops at the definition, which starts a
//! different instance of the value.
//!
//! A `begin_borrow` of the value (or of one of its borrows) aliases it: a
//! `ref_to_unmanaged` of the borrow is an escape of the value. Closing the
//! borrow with `end_borrow` does not end the value's lifetime.

use std::fmt;

use ossa_ir::graph::successors;
use ossa_ir::{BlockId, Function, InstId, InstKind, User, ValueDef, ValueId};
use rustc_hash::FxHashSet;
use smallvec::{smallvec, SmallVec};

/// A point in the {Lexical, NonLexical} × {Escaping, NonEscaping} lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LifetimeTraits {
    pub lexical: bool,
    pub escaping: bool,
}

impl LifetimeTraits {
    #[inline]
    pub fn new(lexical: bool, escaping: bool) -> Self {
        Self { lexical, escaping }
    }
}

impl fmt::Display for LifetimeTraits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lexical = if self.lexical { "lexical" } else { "non-lexical" };
        let escaping = if self.escaping {
            "escaping"
        } else {
            "non-escaping"
        };
        write!(f, "{lexical}, {escaping}")
    }
}

/// Characteristics of `value`'s lifetime, with the escape walk cut off at
/// `boundary` (or at the lifetime's own end when `None`).
pub fn lifetime_traits(func: &Function, value: ValueId, boundary: Option<InstId>) -> LifetimeTraits {
    LifetimeTraits {
        lexical: is_lexical(func, value),
        escaping: is_escaping(func, value, boundary),
    }
}

/// Is `value`'s lifetime lexical?
///
/// Read from the introducer; never inferred from uses.
pub fn is_lexical(func: &Function, value: ValueId) -> bool {
    match func.value_def(value) {
        ValueDef::Param { lexical, .. } => lexical,
        ValueDef::Inst(inst) => matches!(func.inst(inst), InstKind::Move { lexical: true, .. }),
    }
}

/// Outcome of scanning one block for uses of the tracked value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockScan {
    /// An unmanaged escape of the value was found.
    Escapes,
    /// The path ended: consumed, hit the boundary, or reached the definition.
    Ended,
    /// Reached the terminator with the value still live.
    FallsThrough,
}

/// Is `value`'s lifetime escaping before `boundary`?
///
/// Walks every use reachable from the definition, stopping along each path
/// at the first lifetime-ending use or at `boundary`. With `boundary ==
/// None` the walk covers the whole lifetime.
///
/// # Panics
/// Panics if `value`'s defining instruction has been erased.
pub fn is_escaping(func: &Function, value: ValueId, boundary: Option<InstId>) -> bool {
    let aliases = borrow_aliases(func, value);

    // No escaping user of the value or its borrows: nothing to walk.
    let has_escape_user = aliases.iter().any(|&alias| {
        func.uses(alias).iter().any(|u| match u.user {
            User::Inst(inst) => func.inst(inst).is_unmanaged_escape(),
            User::Terminator(_) => false,
        })
    });
    if !has_escape_user {
        return false;
    }

    let def = func.value_def(value);
    let (def_block, start) = match def {
        ValueDef::Param { block, .. } => (block, 0),
        ValueDef::Inst(inst) => match func.inst_position(inst) {
            Some((block, pos)) => (block, pos + 1),
            None => panic!("{value} is defined by erased instruction {}", inst.raw()),
        },
    };

    let mut visited: FxHashSet<BlockId> = FxHashSet::default();
    let mut worklist: SmallVec<[(BlockId, usize); 8]> = smallvec![(def_block, start)];

    while let Some((block, from)) = worklist.pop() {
        match scan_block(func, value, &aliases, def, boundary, block, from) {
            BlockScan::Escapes => {
                tracing::trace!(value = value.raw(), block = block.raw(), "lifetime escapes");
                return true;
            }
            BlockScan::Ended => {}
            BlockScan::FallsThrough => {
                for succ in successors(func.block(block).terminator()) {
                    // A parameter of the defining block is rebound on entry.
                    let rebinds = matches!(def, ValueDef::Param { .. }) && succ == def_block;
                    if !rebinds && visited.insert(succ) {
                        worklist.push((succ, 0));
                    }
                }
            }
        }
    }

    false
}

/// `value` followed by every `begin_borrow` result reachable from it through
/// further borrows.
fn borrow_aliases(func: &Function, value: ValueId) -> SmallVec<[ValueId; 4]> {
    let mut aliases: SmallVec<[ValueId; 4]> = smallvec![value];
    let mut next = 0;
    while let Some(&alias) = aliases.get(next) {
        next += 1;
        for u in func.uses(alias) {
            let User::Inst(inst) = u.user else { continue };
            if !matches!(func.inst(inst), InstKind::Borrow { .. }) {
                continue;
            }
            if let Some(borrowed) = func.inst_result(inst) {
                if !aliases.contains(&borrowed) {
                    aliases.push(borrowed);
                }
            }
        }
    }
    aliases
}

fn scan_block(
    func: &Function,
    value: ValueId,
    aliases: &[ValueId],
    def: ValueDef,
    boundary: Option<InstId>,
    block: BlockId,
    from: usize,
) -> BlockScan {
    let data = func.block(block);
    for &inst in data.insts().get(from..).unwrap_or_default() {
        if Some(inst) == boundary || def == ValueDef::Inst(inst) {
            return BlockScan::Ended;
        }
        let kind = func.inst(inst);
        let mut ends = false;
        for (operand, role) in kind.operands() {
            if kind.is_unmanaged_escape() && aliases.contains(&operand) {
                return BlockScan::Escapes;
            }
            // Only the value itself ends its lifetime; `end_borrow` of an
            // alias closes the borrow scope.
            ends |= operand == value && role.is_lifetime_ending();
        }
        if ends {
            return BlockScan::Ended;
        }
    }

    let consumed_by_terminator = data
        .terminator()
        .operands()
        .iter()
        .any(|&(operand, role)| operand == value && role.is_lifetime_ending());
    if consumed_by_terminator {
        BlockScan::Ended
    } else {
        BlockScan::FallsThrough
    }
}
