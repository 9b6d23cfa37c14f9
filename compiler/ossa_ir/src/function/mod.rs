//! Function bodies: blocks, the instruction arena, values and their use-lists.
//!
//! A [`Function`] owns three tables:
//!
//! - **blocks**: each block lists its parameters, the IDs of its
//!   instructions in execution order, and its terminator;
//! - **instructions**: an arena indexed by [`InstId`]. Erased instructions
//!   stay in the arena as tombstones so stale IDs are caught;
//! - **values**: indexed by [`ValueId`], recording type, ownership kind,
//!   definition site and use-list.
//!
//! Every mutation goes through methods on `Function`, which keep operand
//! slots and use-lists in sync. Violating a structural invariant (erasing an
//! instruction whose result is still used, touching an erased instruction)
//! is a compiler bug and panics.

use crate::ir::{
    BlockId, InstId, InstKind, OwnershipKind, Terminator, Ty, Use, User, ValueDef,
    ValueId,
};
use crate::Name;

/// Type, ownership, definition and uses of one value.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueData {
    ty: Ty,
    ownership: OwnershipKind,
    def: ValueDef,
    uses: Vec<Use>,
}

impl ValueData {
    #[inline]
    pub fn ty(&self) -> Ty {
        self.ty
    }

    #[inline]
    pub fn ownership(&self) -> OwnershipKind {
        self.ownership
    }

    #[inline]
    pub fn def(&self) -> ValueDef {
        self.def
    }

    #[inline]
    pub fn uses(&self) -> &[Use] {
        &self.uses
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
struct InstData {
    kind: InstKind,
    result: Option<ValueId>,
    /// `None` once the instruction has been erased.
    block: Option<BlockId>,
}

/// A basic block: parameters, instruction order, terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockData {
    params: Vec<ValueId>,
    insts: Vec<InstId>,
    terminator: Terminator,
}

impl BlockData {
    /// Block parameters, bound by `Jump` arguments (or the caller, for the
    /// entry block).
    #[inline]
    pub fn params(&self) -> &[ValueId] {
        &self.params
    }

    /// Instructions in execution order. Never contains erased instructions.
    #[inline]
    pub fn insts(&self) -> &[InstId] {
        &self.insts
    }

    #[inline]
    pub fn terminator(&self) -> &Terminator {
        &self.terminator
    }
}

/// A function body in ownership-form IR.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    name: Name,
    entry: BlockId,
    blocks: Vec<BlockData>,
    insts: Vec<InstData>,
    values: Vec<ValueData>,
}

impl Function {
    /// Create an empty function with a single entry block (`bb0`) that ends
    /// in `unreachable` until a terminator is set.
    pub fn new(name: Name) -> Self {
        let mut func = Self {
            name,
            entry: BlockId::new(0),
            blocks: Vec::new(),
            insts: Vec::new(),
            values: Vec::new(),
        };
        func.add_block();
        func
    }

    #[inline]
    pub fn name(&self) -> Name {
        self.name
    }

    #[inline]
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// The function's arguments: the entry block's parameters.
    pub fn params(&self) -> &[ValueId] {
        &self.blocks[self.entry.index()].params
    }

    // Blocks

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// All block IDs in definition order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(|i| BlockId::new(to_u32(i, "block")))
    }

    /// # Panics
    /// Panics if `block` does not belong to this function.
    #[inline]
    pub fn block(&self, block: BlockId) -> &BlockData {
        &self.blocks[block.index()]
    }

    /// Append a new empty block terminated by `unreachable`.
    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId::new(to_u32(self.blocks.len(), "block"));
        self.blocks.push(BlockData {
            params: Vec::new(),
            insts: Vec::new(),
            terminator: Terminator::Unreachable,
        });
        id
    }

    /// Append a parameter to `block`.
    pub fn add_block_param(
        &mut self,
        block: BlockId,
        ty: Ty,
        ownership: OwnershipKind,
        lexical: bool,
    ) -> ValueId {
        let index = to_u32(self.blocks[block.index()].params.len(), "block parameter");
        let value = self.new_value(
            ty,
            ownership,
            ValueDef::Param {
                block,
                index,
                lexical,
            },
        );
        self.blocks[block.index()].params.push(value);
        value
    }

    /// Replace `block`'s terminator, unregistering the old operands' uses and
    /// registering the new ones.
    pub fn set_terminator(&mut self, block: BlockId, terminator: Terminator) {
        let user = User::Terminator(block);
        let old = std::mem::replace(&mut self.blocks[block.index()].terminator, terminator);
        for (slot, (value, _)) in old.operands().into_iter().enumerate() {
            self.remove_use(value, user, slot);
        }
        let operands = self.blocks[block.index()].terminator.operands();
        for (slot, (value, _)) in operands.into_iter().enumerate() {
            self.add_use(value, user, slot);
        }
    }

    // Instructions

    /// Append an instruction at the end of `block` (before its terminator).
    ///
    /// `result` gives the type and ownership kind of the produced value and
    /// must be present exactly when the instruction kind produces one.
    ///
    /// # Panics
    /// Panics if `result` disagrees with [`InstKind::has_result`], or if an
    /// operand is not a value of this function.
    pub fn append_inst(
        &mut self,
        block: BlockId,
        kind: InstKind,
        result: Option<(Ty, OwnershipKind)>,
    ) -> InstId {
        assert_eq!(
            kind.has_result(),
            result.is_some(),
            "{} result presence mismatch",
            kind.opcode(),
        );
        let id = InstId::new(to_u32(self.insts.len(), "instruction"));
        let operands = kind.operands();
        self.insts.push(InstData {
            kind,
            result: None,
            block: Some(block),
        });
        for (slot, (value, _)) in operands.into_iter().enumerate() {
            self.add_use(value, User::Inst(id), slot);
        }
        if let Some((ty, ownership)) = result {
            let value = self.new_value(ty, ownership, ValueDef::Inst(id));
            self.insts[id.index()].result = Some(value);
        }
        self.blocks[block.index()].insts.push(id);
        id
    }

    /// # Panics
    /// Panics if `inst` has been erased.
    pub fn inst(&self, inst: InstId) -> &InstKind {
        match self.try_inst(inst) {
            Some(kind) => kind,
            None => panic!("use of erased instruction {}", inst.raw()),
        }
    }

    /// The instruction's kind, or `None` if it has been erased.
    pub fn try_inst(&self, inst: InstId) -> Option<&InstKind> {
        let data = self.insts.get(inst.index())?;
        data.block.map(|_| &data.kind)
    }

    #[inline]
    pub fn inst_result(&self, inst: InstId) -> Option<ValueId> {
        self.insts[inst.index()].result
    }

    /// The block containing `inst`, or `None` if it has been erased.
    #[inline]
    pub fn inst_block(&self, inst: InstId) -> Option<BlockId> {
        self.insts.get(inst.index()).and_then(|d| d.block)
    }

    #[inline]
    pub fn is_erased(&self, inst: InstId) -> bool {
        self.inst_block(inst).is_none()
    }

    /// Position of `inst` within its block, or `None` if erased.
    pub fn inst_position(&self, inst: InstId) -> Option<(BlockId, usize)> {
        let block = self.inst_block(inst)?;
        let pos = self.blocks[block.index()]
            .insts
            .iter()
            .position(|&i| i == inst)?;
        Some((block, pos))
    }

    /// All live instructions in program order (blocks in definition order,
    /// instructions in execution order).
    pub fn insts_in_order(&self) -> impl Iterator<Item = InstId> + '_ {
        self.blocks.iter().flat_map(|b| b.insts.iter().copied())
    }

    /// Number of live instructions satisfying `pred`.
    pub fn count_insts(&self, pred: impl Fn(&InstKind) -> bool) -> usize {
        self.insts_in_order()
            .filter(|&i| pred(&self.insts[i.index()].kind))
            .count()
    }

    // Values

    #[inline]
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// # Panics
    /// Panics if `value` does not belong to this function.
    #[inline]
    pub fn value(&self, value: ValueId) -> &ValueData {
        &self.values[value.index()]
    }

    #[inline]
    pub fn ownership_kind(&self, value: ValueId) -> OwnershipKind {
        self.values[value.index()].ownership
    }

    #[inline]
    pub fn value_ty(&self, value: ValueId) -> Ty {
        self.values[value.index()].ty
    }

    #[inline]
    pub fn value_def(&self, value: ValueId) -> ValueDef {
        self.values[value.index()].def
    }

    /// The instruction defining `value`, or `None` for block parameters.
    pub fn defining_inst(&self, value: ValueId) -> Option<InstId> {
        match self.values[value.index()].def {
            ValueDef::Inst(inst) => Some(inst),
            ValueDef::Param { .. } => None,
        }
    }

    /// Returns `false` once the defining instruction has been erased.
    pub fn is_defined(&self, value: ValueId) -> bool {
        match self.values.get(value.index()).map(ValueData::def) {
            Some(ValueDef::Inst(inst)) => !self.is_erased(inst),
            Some(ValueDef::Param { .. }) => true,
            None => false,
        }
    }

    /// Every use of `value`, in registration order.
    #[inline]
    pub fn uses(&self, value: ValueId) -> &[Use] {
        &self.values[value.index()].uses
    }

    // Mutation

    /// Rewrite every use of `old` to read `new` instead.
    ///
    /// # Panics
    /// Panics if `old == new`.
    pub fn replace_all_uses_with(&mut self, old: ValueId, new: ValueId) {
        assert_ne!(old, new, "replacing {old} with itself");
        let uses = std::mem::take(&mut self.values[old.index()].uses);
        for use_ in &uses {
            let slot = use_.operand as usize;
            match use_.user {
                User::Inst(inst) => self.insts[inst.index()].kind.set_operand(slot, new),
                User::Terminator(block) => {
                    self.blocks[block.index()].terminator.set_operand(slot, new);
                }
            }
        }
        self.values[new.index()].uses.extend(uses);
    }

    /// Remove `inst` from its block and from its operands' use-lists, leaving
    /// a tombstone in the arena.
    ///
    /// # Panics
    /// Panics if `inst` is already erased or its result still has uses.
    pub fn erase_inst(&mut self, inst: InstId) {
        let Some((block, pos)) = self.inst_position(inst) else {
            panic!("erasing instruction {} twice", inst.raw());
        };
        if let Some(result) = self.insts[inst.index()].result {
            assert!(
                self.values[result.index()].uses.is_empty(),
                "erasing {} while its result {result} still has uses",
                self.insts[inst.index()].kind.opcode(),
            );
        }
        let operands = self.insts[inst.index()].kind.operands();
        for (slot, (value, _)) in operands.into_iter().enumerate() {
            self.remove_use(value, User::Inst(inst), slot);
        }
        self.blocks[block.index()].insts.remove(pos);
        self.insts[inst.index()].block = None;
    }

    fn new_value(&mut self, ty: Ty, ownership: OwnershipKind, def: ValueDef) -> ValueId {
        let id = ValueId::new(to_u32(self.values.len(), "value"));
        self.values.push(ValueData {
            ty,
            ownership,
            def,
            uses: Vec::new(),
        });
        id
    }

    fn add_use(&mut self, value: ValueId, user: User, slot: usize) {
        let Some(data) = self.values.get_mut(value.index()) else {
            panic!("operand {value} is not a value of this function");
        };
        data.uses.push(Use {
            user,
            operand: to_u32(slot, "operand"),
        });
    }

    fn remove_use(&mut self, value: ValueId, user: User, slot: usize) {
        let target = Use {
            user,
            operand: to_u32(slot, "operand"),
        };
        let uses = &mut self.values[value.index()].uses;
        match uses.iter().position(|u| *u == target) {
            Some(pos) => {
                uses.remove(pos);
            }
            None => panic!("use-list of {value} is missing {target:?}"),
        }
    }
}

fn to_u32(n: usize, what: &str) -> u32 {
    u32::try_from(n).unwrap_or_else(|_| panic!("{what} count exceeds u32::MAX"))
}
