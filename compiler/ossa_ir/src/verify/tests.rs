use pretty_assertions::assert_eq;

use crate::ir::{BlockId, OwnershipKind};
use crate::test_helpers::{bool_ty, callee, fname, klass};
use crate::{FunctionBuilder, Name};

use super::*;

fn errors_of(func: &Function) -> Vec<VerifyError> {
    verify_function(func).err().unwrap_or_default()
}

// Accepted IR

#[test]
fn accepts_move_chain() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Owned, true);
    let y = b.move_value(x, true);
    let raw = b.unmanaged_escape(y);
    b.apply(callee(), &[raw], bool_ty(), OwnershipKind::Trivial);
    let z = b.move_value(y, false);
    b.destroy(z);
    b.ret(None);
    assert_eq!(verify_function(&b.finish()), Ok(()));
}

#[test]
fn accepts_balanced_branches_and_block_params() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Owned, false);
    let cond = b.apply(callee(), &[], bool_ty(), OwnershipKind::Trivial);
    let left = b.create_block();
    let right = b.create_block();
    let join = b.create_block();
    b.branch(cond, left, right);

    b.switch_to(left);
    let moved = b.move_value(x, false);
    b.jump(join, &[moved]);

    b.switch_to(right);
    b.jump(join, &[x]);

    let p = b.block_param(join, klass(), OwnershipKind::Owned);
    b.switch_to(join);
    b.ret(Some(p));
    assert_eq!(verify_function(&b.finish()), Ok(()));
}

#[test]
fn accepts_borrow_scope_and_payload_free_enum_move() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Owned, false);
    let borrowed = b.begin_borrow(x);
    b.apply(callee(), &[borrowed], bool_ty(), OwnershipKind::Trivial);
    b.end_borrow(borrowed);
    b.destroy(x);
    let none = b.enum_value(Name::from_raw(20), None, klass(), OwnershipKind::Owned);
    let moved = b.move_value(none, true);
    b.destroy(moved);
    b.ret(None);
    assert_eq!(verify_function(&b.finish()), Ok(()));
}

#[test]
fn unreachable_may_leave_values_live() {
    let mut b = FunctionBuilder::new(fname());
    b.param(klass(), OwnershipKind::Owned, false);
    b.unreachable();
    assert_eq!(verify_function(&b.finish()), Ok(()));
}

// Rejected IR

#[test]
fn rejects_double_destroy() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Owned, false);
    b.destroy(x);
    b.destroy(x);
    b.ret(None);
    let func = b.finish();
    assert_eq!(
        errors_of(&func),
        vec![VerifyError::UseOfDeadValue {
            value: x,
            block: func.entry(),
        }]
    );
}

#[test]
fn rejects_leak_at_return() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Owned, false);
    let y = b.move_value(x, false);
    b.ret(None);
    let func = b.finish();
    assert_eq!(
        errors_of(&func),
        vec![VerifyError::Leak {
            value: y,
            block: func.entry(),
        }]
    );
}

#[test]
fn rejects_move_of_guaranteed() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Guaranteed, false);
    let y = b.move_value(x, false);
    b.destroy(y);
    b.ret(None);
    assert_eq!(
        errors_of(&b.finish()),
        vec![VerifyError::MoveOfNonOwned {
            value: x,
            kind: OwnershipKind::Guaranteed,
        }]
    );
}

#[test]
fn rejects_destroy_of_unowned() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Owned, false);
    let weak = b.ref_to_unowned(x);
    b.destroy(weak);
    b.destroy(x);
    b.ret(None);
    assert_eq!(
        errors_of(&b.finish()),
        vec![VerifyError::ConsumeOfNonOwned {
            value: weak,
            kind: OwnershipKind::Unowned,
            opcode: "destroy_value",
        }]
    );
}

#[test]
fn rejects_consume_inside_borrow_scope() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Owned, false);
    let borrowed = b.begin_borrow(x);
    b.destroy(x);
    b.end_borrow(borrowed);
    b.ret(None);
    let func = b.finish();
    assert_eq!(
        errors_of(&func),
        vec![VerifyError::ConsumedWhileBorrowed {
            value: x,
            borrow: borrowed,
            block: func.entry(),
        }]
    );
}

#[test]
fn rejects_end_borrow_of_plain_value() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Guaranteed, false);
    b.end_borrow(x);
    b.ret(None);
    assert_eq!(
        errors_of(&b.finish()),
        vec![VerifyError::EndBorrowOfNonBorrow { value: x }]
    );
}

#[test]
fn rejects_value_consumed_on_one_path_only() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Owned, false);
    let cond = b.apply(callee(), &[], bool_ty(), OwnershipKind::Trivial);
    let left = b.create_block();
    let right = b.create_block();
    let join = b.create_block();
    b.branch(cond, left, right);
    b.switch_to(left);
    b.destroy(x);
    b.jump(join, &[]);
    b.switch_to(right);
    b.jump(join, &[]);
    b.switch_to(join);
    b.ret(None);
    let func = b.finish();

    let errors = errors_of(&func);
    assert!(errors.contains(&VerifyError::InconsistentJoin { block: join }));
}

#[test]
fn rejects_jump_arity_and_unknown_block() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Owned, false);
    let next = b.create_block();
    b.block_param(next, klass(), OwnershipKind::Owned);
    b.jump(next, &[]);
    b.switch_to(next);
    b.jump(BlockId::new(9), &[x]);
    let func = b.finish();

    let errors = errors_of(&func);
    assert!(errors.contains(&VerifyError::JumpArity {
        from: BlockId::new(0),
        to: next,
        expected: 1,
        found: 0,
    }));
    assert!(errors.contains(&VerifyError::UnknownBlock {
        from: next,
        to: BlockId::new(9),
    }));
}

#[test]
fn rejects_cond_br_to_block_with_params() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Owned, false);
    let cond = b.apply(callee(), &[], bool_ty(), OwnershipKind::Trivial);
    let left = b.create_block();
    let right = b.create_block();
    let p = b.block_param(left, klass(), OwnershipKind::Owned);
    b.branch(cond, left, right);
    b.switch_to(left);
    b.destroy(p);
    b.destroy(x);
    b.ret(None);
    b.switch_to(right);
    b.destroy(x);
    b.ret(None);
    let func = b.finish();

    assert_eq!(
        errors_of(&func),
        vec![VerifyError::BranchToBlockWithParams {
            from: func.entry(),
            to: left,
            params: 1,
        }]
    );
}

#[test]
fn rejects_escape_of_trivial_and_unowned_values() {
    let mut b = FunctionBuilder::new(fname());
    let x = b.param(klass(), OwnershipKind::Owned, false);
    let flag = b.apply(callee(), &[], bool_ty(), OwnershipKind::Trivial);
    let raw_flag = b.unmanaged_escape(flag);
    b.apply(callee(), &[raw_flag], bool_ty(), OwnershipKind::Trivial);
    let weak = b.ref_to_unowned(x);
    let raw_weak = b.unmanaged_escape(weak);
    b.apply(callee(), &[raw_weak], bool_ty(), OwnershipKind::Trivial);
    b.destroy(x);
    b.ret(None);

    assert_eq!(
        errors_of(&b.finish()),
        vec![
            VerifyError::EscapeOfNonReference {
                value: flag,
                kind: OwnershipKind::Trivial,
            },
            VerifyError::EscapeOfNonReference {
                value: weak,
                kind: OwnershipKind::Unowned,
            },
        ]
    );
}

#[test]
fn error_messages_name_values() {
    let err = VerifyError::Leak {
        value: crate::ir::ValueId::new(3),
        block: BlockId::new(1),
    };
    assert_eq!(err.to_string(), "%3 is still live when bb1 returns");
}
