//! Shared test utilities for optimizer unit tests.
//! Only compiled in test builds.

use ossa_ir::{FunctionBuilder, Name, OwnershipKind, Ty, ValueId};

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

/// `apply @callee(value)` with a trivial result: an instantaneous use.
pub(crate) fn observe(b: &mut FunctionBuilder, value: ValueId) -> ValueId {
    b.apply(callee(), &[value], bool_ty(), OwnershipKind::Trivial)
}

/// A trivial branch condition.
pub(crate) fn condition(b: &mut FunctionBuilder) -> ValueId {
    b.apply(callee(), &[], bool_ty(), OwnershipKind::Trivial)
}

/// `ref_to_unmanaged %value` followed by a use of the raw reference.
pub(crate) fn escape(b: &mut FunctionBuilder, value: ValueId) -> ValueId {
    let raw = b.unmanaged_escape(value);
    observe(b, raw);
    raw
}
