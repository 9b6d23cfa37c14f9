//! Shared test utilities for the IR model, printer and verifier.
//! Only compiled in test builds.

use crate::ir::{InstKind, Ty};
use crate::{Function, Name};

/// A reference-counted class type.
pub(crate) fn klass() -> Ty {
    Ty::new(Name::from_raw(1))
}

/// A trivial boolean type.
pub(crate) fn bool_ty() -> Ty {
    Ty::new(Name::from_raw(2))
}

/// Callee name used by `apply` instructions in tests.
pub(crate) fn callee() -> Name {
    Name::from_raw(3)
}

/// Function name used by tests.
pub(crate) fn fname() -> Name {
    Name::from_raw(4)
}

/// Count live `move_value` instructions.
pub(crate) fn count_moves(func: &Function) -> usize {
    func.count_insts(InstKind::is_move)
}
