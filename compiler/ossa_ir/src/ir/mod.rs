//! Ownership-form IR vocabulary: IDs, ownership kinds, instructions, terminators.
//!
//! The IR is a basic-block representation in which every value states how it
//! is owned. Instructions are a closed set ([`InstKind`]); each operand slot
//! has an [`OperandRole`] that says whether the instruction consumes the
//! value (ending its lifetime), merely observes it, or closes a borrow scope.
//!
//! Storage (instruction arena, value table, use-lists) lives in
//! [`Function`](crate::Function); this module only defines the vocabulary.

use std::fmt;

use smallvec::{smallvec, SmallVec};

use crate::Name;

// ID newtypes

/// Value ID within a single [`Function`](crate::Function).
///
/// Values are defined exactly once, either by an instruction result or by a
/// block parameter. IDs are allocated sequentially starting from 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct ValueId(u32);

impl ValueId {
    /// Create a new value ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Instruction ID: a slot in the function's instruction arena.
///
/// Slots are never reused. An erased instruction keeps its slot as a
/// tombstone, so a stale `InstId` can be detected instead of silently
/// aliasing a newer instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct InstId(u32);

impl InstId {
    /// Create a new instruction ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Basic block ID within a single [`Function`](crate::Function).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Create a new block ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

// Types

/// Opaque nominal type handle.
///
/// The optimizer never inspects types; it only carries them so the printer
/// and verifier can report them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Ty(Name);

impl Ty {
    #[inline]
    pub fn new(name: Name) -> Self {
        Self(name)
    }

    #[inline]
    pub fn name(self) -> Name {
        self.0
    }
}

// Ownership

/// How a value's release obligation is managed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum OwnershipKind {
    /// The holder must consume the value exactly once (destroy, move, or
    /// forward it).
    Owned,
    /// Borrowed for the duration of a scope. Must not be released.
    Guaranteed,
    /// A reference that carries no refcount obligation.
    Unowned,
    /// A raw reference outside ownership tracking.
    Unmanaged,
    /// No ownership at all (integers, booleans).
    Trivial,
}

impl OwnershipKind {
    #[inline]
    pub fn is_owned(self) -> bool {
        self == OwnershipKind::Owned
    }

    /// Keyword used by the printer: `@owned`, `@guaranteed`, ...
    pub fn keyword(self) -> &'static str {
        match self {
            OwnershipKind::Owned => "@owned",
            OwnershipKind::Guaranteed => "@guaranteed",
            OwnershipKind::Unowned => "@unowned",
            OwnershipKind::Unmanaged => "@unmanaged",
            OwnershipKind::Trivial => "@trivial",
        }
    }
}

impl fmt::Display for OwnershipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

// Operands

/// What an instruction does to the value in one of its operand slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandRole {
    /// Ends the operand's lifetime (destroy, move source, forwarding into
    /// an aggregate, return, jump argument).
    Consume,
    /// Reads the operand without affecting its lifetime.
    Instantaneous,
    /// Closes the borrow scope of a guaranteed value.
    EndBorrow,
}

impl OperandRole {
    /// Returns `true` if a use in this role terminates the operand's lifetime.
    #[inline]
    pub fn is_lifetime_ending(self) -> bool {
        matches!(self, OperandRole::Consume | OperandRole::EndBorrow)
    }
}

// Instructions

/// A non-terminator instruction.
///
/// Result types and ownership kinds are recorded on the result value (see
/// [`Function::value`](crate::Function::value)), not on the instruction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum InstKind {
    /// Direct call: `%r = apply @callee(args...)`. Arguments are borrowed for
    /// the duration of the call.
    Apply { callee: Name, args: Vec<ValueId> },

    /// Transfer an owned value into a new owned value, starting a new
    /// lifetime tagged with `lexical`.
    Move { operand: ValueId, lexical: bool },

    /// Produce a new owned copy of a value.
    Copy { operand: ValueId },

    /// Terminal consumption of an owned value.
    Destroy { operand: ValueId },

    /// Begin a borrow scope; the result is guaranteed.
    Borrow { operand: ValueId },

    /// End the borrow scope opened by a [`Borrow`](InstKind::Borrow).
    EndBorrow { operand: ValueId },

    /// Convert an owned or guaranteed reference into an unmanaged one. The
    /// only instruction that makes a lifetime escaping.
    UnmanagedEscape { operand: ValueId },

    /// Produce an unowned reference to a value.
    RefToUnowned { operand: ValueId },

    /// Build a fresh aggregate from its fields. Fields are consumed.
    Construct { fields: Vec<ValueId> },

    /// Enum variant construction. A payload is consumed and its ownership
    /// forwarded to the result; without a payload nothing is forwarded.
    Enum {
        variant: Name,
        payload: Option<ValueId>,
    },
}

impl InstKind {
    /// Returns every operand with the role it is used in, in slot order.
    pub fn operands(&self) -> SmallVec<[(ValueId, OperandRole); 4]> {
        match self {
            InstKind::Apply { args, .. } => args
                .iter()
                .map(|&a| (a, OperandRole::Instantaneous))
                .collect(),
            InstKind::Move { operand, .. } | InstKind::Destroy { operand } => {
                smallvec![(*operand, OperandRole::Consume)]
            }
            InstKind::Copy { operand }
            | InstKind::Borrow { operand }
            | InstKind::UnmanagedEscape { operand }
            | InstKind::RefToUnowned { operand } => {
                smallvec![(*operand, OperandRole::Instantaneous)]
            }
            InstKind::EndBorrow { operand } => smallvec![(*operand, OperandRole::EndBorrow)],
            InstKind::Construct { fields } => {
                fields.iter().map(|&f| (f, OperandRole::Consume)).collect()
            }
            InstKind::Enum { payload, .. } => payload
                .iter()
                .map(|&p| (p, OperandRole::Consume))
                .collect(),
        }
    }

    /// Returns the operand in slot `index`, if any.
    pub fn operand(&self, index: usize) -> Option<ValueId> {
        self.operands().get(index).map(|&(v, _)| v)
    }

    /// Overwrite the operand in slot `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range for this instruction.
    pub(crate) fn set_operand(&mut self, index: usize, value: ValueId) {
        let slot = match self {
            InstKind::Apply { args, .. } => args.get_mut(index),
            InstKind::Construct { fields } => fields.get_mut(index),
            InstKind::Move { operand, .. }
            | InstKind::Copy { operand }
            | InstKind::Destroy { operand }
            | InstKind::Borrow { operand }
            | InstKind::EndBorrow { operand }
            | InstKind::UnmanagedEscape { operand }
            | InstKind::RefToUnowned { operand } => (index == 0).then_some(operand),
            InstKind::Enum { payload, .. } => payload.as_mut().filter(|_| index == 0),
        };
        match slot {
            Some(slot) => *slot = value,
            None => panic!("operand slot {index} out of range for {}", self.opcode()),
        }
    }

    /// Returns `true` for [`UnmanagedEscape`](InstKind::UnmanagedEscape).
    #[inline]
    pub fn is_unmanaged_escape(&self) -> bool {
        matches!(self, InstKind::UnmanagedEscape { .. })
    }

    /// Returns `true` for [`Move`](InstKind::Move).
    #[inline]
    pub fn is_move(&self) -> bool {
        matches!(self, InstKind::Move { .. })
    }

    /// Returns `true` if this instruction produces a result value.
    pub fn has_result(&self) -> bool {
        !matches!(self, InstKind::Destroy { .. } | InstKind::EndBorrow { .. })
    }

    /// Textual opcode used by the printer and in diagnostics.
    pub fn opcode(&self) -> &'static str {
        match self {
            InstKind::Apply { .. } => "apply",
            InstKind::Move { .. } => "move_value",
            InstKind::Copy { .. } => "copy_value",
            InstKind::Destroy { .. } => "destroy_value",
            InstKind::Borrow { .. } => "begin_borrow",
            InstKind::EndBorrow { .. } => "end_borrow",
            InstKind::UnmanagedEscape { .. } => "ref_to_unmanaged",
            InstKind::RefToUnowned { .. } => "ref_to_unowned",
            InstKind::Construct { .. } => "struct",
            InstKind::Enum { .. } => "enum",
        }
    }
}

// Terminators

/// Block terminator: how control leaves a basic block.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Terminator {
    /// Return from the function, consuming the returned value.
    Return { value: Option<ValueId> },

    /// Unconditional jump, passing (and consuming) arguments bound to the
    /// target block's parameters.
    Jump { target: BlockId, args: Vec<ValueId> },

    /// Conditional branch on a trivial boolean.
    Branch {
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    },

    /// Control never reaches the end of this block.
    Unreachable,
}

impl Terminator {
    /// Returns every operand with the role it is used in, in slot order.
    pub fn operands(&self) -> SmallVec<[(ValueId, OperandRole); 4]> {
        match self {
            Terminator::Return { value } => value
                .iter()
                .map(|&v| (v, OperandRole::Consume))
                .collect(),
            Terminator::Jump { args, .. } => {
                args.iter().map(|&a| (a, OperandRole::Consume)).collect()
            }
            Terminator::Branch { cond, .. } => smallvec![(*cond, OperandRole::Instantaneous)],
            Terminator::Unreachable => SmallVec::new(),
        }
    }

    /// Overwrite the operand in slot `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range for this terminator.
    pub(crate) fn set_operand(&mut self, index: usize, new_value: ValueId) {
        let slot = match self {
            Terminator::Return { value } => value.as_mut().filter(|_| index == 0),
            Terminator::Jump { args, .. } => args.get_mut(index),
            Terminator::Branch { cond, .. } => (index == 0).then_some(cond),
            Terminator::Unreachable => None,
        };
        match slot {
            Some(slot) => *slot = new_value,
            None => panic!("terminator operand slot {index} out of range"),
        }
    }
}

// Uses

/// The entity reading a value: an instruction or a block's terminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum User {
    Inst(InstId),
    Terminator(BlockId),
}

/// One entry of a value's use-list: who reads it and through which slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Use {
    pub user: User,
    pub operand: u32,
}

/// Where a value comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueDef {
    /// Block parameter. Entry-block parameters are the function arguments;
    /// `lexical` is the binding's scoping flag.
    Param {
        block: BlockId,
        index: u32,
        lexical: bool,
    },
    /// Result of an instruction.
    Inst(InstId),
}
