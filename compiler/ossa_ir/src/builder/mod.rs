//! Convenience builder for well-formed [`Function`]s.
//!
//! Lowering and tests construct IR through this builder rather than poking
//! at [`Function::append_inst`] directly: each method fixes the result
//! ownership that the instruction kind implies, so callers only choose it
//! where the IR genuinely leaves it open (call results, enum results).

use crate::ir::{BlockId, InstId, InstKind, OwnershipKind, Terminator, Ty, ValueId};
use crate::{Function, Name};

/// Appends instructions to a current block of a function under construction.
pub struct FunctionBuilder {
    func: Function,
    current: BlockId,
}

impl FunctionBuilder {
    /// Start a new function positioned at its entry block.
    pub fn new(name: Name) -> Self {
        let func = Function::new(name);
        let current = func.entry();
        Self { func, current }
    }

    /// Finish construction and return the function.
    pub fn finish(self) -> Function {
        self.func
    }

    /// Read access to the function built so far.
    pub fn func(&self) -> &Function {
        &self.func
    }

    #[inline]
    pub fn current_block(&self) -> BlockId {
        self.current
    }

    /// Create a new block without switching to it.
    pub fn create_block(&mut self) -> BlockId {
        self.func.add_block()
    }

    /// Continue appending to `block`.
    pub fn switch_to(&mut self, block: BlockId) {
        self.current = block;
    }

    /// Add a function argument (an entry-block parameter).
    pub fn param(&mut self, ty: Ty, ownership: OwnershipKind, lexical: bool) -> ValueId {
        let entry = self.func.entry();
        self.func.add_block_param(entry, ty, ownership, lexical)
    }

    /// Add a parameter to a non-entry block.
    pub fn block_param(&mut self, block: BlockId, ty: Ty, ownership: OwnershipKind) -> ValueId {
        self.func.add_block_param(block, ty, ownership, false)
    }

    // Value-producing instructions

    /// `%r = apply @callee(args)`, with the callee's result convention.
    pub fn apply(
        &mut self,
        callee: Name,
        args: &[ValueId],
        ty: Ty,
        ownership: OwnershipKind,
    ) -> ValueId {
        let kind = InstKind::Apply {
            callee,
            args: args.to_vec(),
        };
        self.push_value(kind, ty, ownership)
    }

    /// `%r = move_value [lexical] %operand`.
    pub fn move_value(&mut self, operand: ValueId, lexical: bool) -> ValueId {
        let ty = self.func.value_ty(operand);
        self.push_value(InstKind::Move { operand, lexical }, ty, OwnershipKind::Owned)
    }

    /// `%r = copy_value %operand`.
    pub fn copy_value(&mut self, operand: ValueId) -> ValueId {
        let ty = self.func.value_ty(operand);
        self.push_value(InstKind::Copy { operand }, ty, OwnershipKind::Owned)
    }

    /// `%r = begin_borrow %operand`.
    pub fn begin_borrow(&mut self, operand: ValueId) -> ValueId {
        let ty = self.func.value_ty(operand);
        self.push_value(InstKind::Borrow { operand }, ty, OwnershipKind::Guaranteed)
    }

    /// `%r = ref_to_unmanaged %operand`.
    pub fn unmanaged_escape(&mut self, operand: ValueId) -> ValueId {
        let ty = self.func.value_ty(operand);
        self.push_value(
            InstKind::UnmanagedEscape { operand },
            ty,
            OwnershipKind::Unmanaged,
        )
    }

    /// `%r = ref_to_unowned %operand`.
    pub fn ref_to_unowned(&mut self, operand: ValueId) -> ValueId {
        let ty = self.func.value_ty(operand);
        self.push_value(InstKind::RefToUnowned { operand }, ty, OwnershipKind::Unowned)
    }

    /// `%r = struct (fields)`: a fresh owned aggregate.
    pub fn construct(&mut self, fields: &[ValueId], ty: Ty) -> ValueId {
        let kind = InstKind::Construct {
            fields: fields.to_vec(),
        };
        self.push_value(kind, ty, OwnershipKind::Owned)
    }

    /// `%r = enum #variant(payload)`.
    ///
    /// With a payload the result takes the payload's ownership kind. Without
    /// one the caller states the kind the enum type requires.
    pub fn enum_value(
        &mut self,
        variant: Name,
        payload: Option<ValueId>,
        ty: Ty,
        payload_free_kind: OwnershipKind,
    ) -> ValueId {
        let ownership = match payload {
            Some(p) => self.func.ownership_kind(p),
            None => payload_free_kind,
        };
        self.push_value(InstKind::Enum { variant, payload }, ty, ownership)
    }

    // Non-value instructions

    /// `destroy_value %operand`.
    pub fn destroy(&mut self, operand: ValueId) -> InstId {
        self.func
            .append_inst(self.current, InstKind::Destroy { operand }, None)
    }

    /// `end_borrow %operand`.
    pub fn end_borrow(&mut self, operand: ValueId) -> InstId {
        self.func
            .append_inst(self.current, InstKind::EndBorrow { operand }, None)
    }

    // Terminators

    pub fn ret(&mut self, value: Option<ValueId>) {
        self.func
            .set_terminator(self.current, Terminator::Return { value });
    }

    pub fn jump(&mut self, target: BlockId, args: &[ValueId]) {
        self.func.set_terminator(
            self.current,
            Terminator::Jump {
                target,
                args: args.to_vec(),
            },
        );
    }

    pub fn branch(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId) {
        self.func.set_terminator(
            self.current,
            Terminator::Branch {
                cond,
                then_block,
                else_block,
            },
        );
    }

    pub fn unreachable(&mut self) {
        self.func
            .set_terminator(self.current, Terminator::Unreachable);
    }

    fn push_value(&mut self, kind: InstKind, ty: Ty, ownership: OwnershipKind) -> ValueId {
        let inst = self
            .func
            .append_inst(self.current, kind, Some((ty, ownership)));
        match self.func.inst_result(inst) {
            Some(value) => value,
            None => panic!("instruction {} produced no result", inst.raw()),
        }
    }
}
