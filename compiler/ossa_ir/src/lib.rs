//! Ownership-form IR for the OSSA optimizer.
//!
//! This crate provides:
//!
//! - **Names** ([`Name`], [`StringInterner`]): interned identifiers. The
//!   interner is the compilation session's context object and is passed
//!   explicitly to whatever prints or creates names.
//!
//! - **IR vocabulary** ([`ir`]): value/instruction/block IDs, the five
//!   [`OwnershipKind`]s, the closed instruction set [`InstKind`] and block
//!   [`Terminator`]s. Every operand slot has an [`OperandRole`] stating
//!   whether it consumes, observes, or closes a borrow of its value.
//!
//! - **Function bodies** ([`Function`]): an instruction arena plus a value
//!   table with use-lists. All mutation (appending, replacing uses, erasing)
//!   keeps use-lists exact, so passes can delete instructions without
//!   leaving dangling references.
//!
//! - **Construction and inspection** ([`FunctionBuilder`], the textual
//!   printer, CFG utilities in [`graph`]).
//!
//! - **Verification** ([`verify_function`]): the ownership verifier that
//!   every pass's input and output must satisfy.
//!
//! Types are opaque nominal handles ([`Ty`]); there is no type system here.

mod builder;
mod function;
pub mod graph;
mod interner;
pub mod ir;
mod name;
mod printer;
pub mod verify;

#[cfg(test)]
mod test_helpers;

pub use builder::FunctionBuilder;
pub use function::{BlockData, Function, ValueData};
pub use interner::{InternError, StringInterner};
pub use ir::{
    BlockId, InstId, InstKind, OperandRole, OwnershipKind, Terminator, Ty, Use, User, ValueDef,
    ValueId,
};
pub use name::Name;
pub use printer::FunctionDisplay;
pub use verify::{verify_function, VerifyError};
