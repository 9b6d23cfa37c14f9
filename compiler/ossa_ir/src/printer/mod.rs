//! Textual rendering of ownership-form IR.
//!
//! ```text
//! func @consume {
//! bb0(%0 : @owned $Klass [lexical]):
//!   %1 = move_value [lexical] %0 : @owned $Klass
//!   destroy_value %1
//!   return
//! }
//! ```
//!
//! The format is stable: golden tests compare against it verbatim.

use std::fmt::{self, Write as _};

use crate::ir::{InstId, InstKind, Terminator, ValueDef, ValueId};
use crate::{Function, StringInterner};

/// Displays a [`Function`] with names resolved through an interner.
pub struct FunctionDisplay<'a> {
    func: &'a Function,
    interner: &'a StringInterner,
}

impl Function {
    /// Render this function with names resolved through `interner`.
    pub fn display<'a>(&'a self, interner: &'a StringInterner) -> FunctionDisplay<'a> {
        FunctionDisplay {
            func: self,
            interner,
        }
    }
}

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.func;
        writeln!(f, "func @{} {{", self.interner.lookup(func.name()))?;
        for block in func.block_ids() {
            let data = func.block(block);
            write!(f, "{block}")?;
            if !data.params().is_empty() {
                f.write_char('(')?;
                for (i, &param) in data.params().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.write_param(f, param)?;
                }
                f.write_char(')')?;
            }
            f.write_str(":\n")?;
            for &inst in data.insts() {
                f.write_str("  ")?;
                self.write_inst(f, inst)?;
                f.write_char('\n')?;
            }
            f.write_str("  ")?;
            write_terminator(f, data.terminator())?;
            f.write_char('\n')?;
        }
        f.write_char('}')
    }
}

impl FunctionDisplay<'_> {
    fn write_param(&self, f: &mut fmt::Formatter<'_>, param: ValueId) -> fmt::Result {
        let value = self.func.value(param);
        write!(
            f,
            "{param} : {} ${}",
            value.ownership(),
            self.interner.lookup(value.ty().name())
        )?;
        if let ValueDef::Param { lexical: true, .. } = value.def() {
            f.write_str(" [lexical]")?;
        }
        Ok(())
    }

    fn write_inst(&self, f: &mut fmt::Formatter<'_>, inst: InstId) -> fmt::Result {
        let kind = self.func.inst(inst);
        let result = self.func.inst_result(inst);
        if let Some(result) = result {
            write!(f, "{result} = ")?;
        }
        f.write_str(kind.opcode())?;
        match kind {
            InstKind::Apply { callee, args } => {
                write!(f, " @{}", self.interner.lookup(*callee))?;
                write_list(f, args)?;
            }
            InstKind::Move { operand, lexical } => {
                if *lexical {
                    f.write_str(" [lexical]")?;
                }
                write!(f, " {operand}")?;
            }
            InstKind::Copy { operand }
            | InstKind::Destroy { operand }
            | InstKind::Borrow { operand }
            | InstKind::EndBorrow { operand }
            | InstKind::UnmanagedEscape { operand }
            | InstKind::RefToUnowned { operand } => write!(f, " {operand}")?,
            InstKind::Construct { fields } => {
                f.write_char(' ')?;
                write_list(f, fields)?;
            }
            InstKind::Enum { variant, payload } => {
                write!(f, " #{}", self.interner.lookup(*variant))?;
                if let Some(payload) = payload {
                    write!(f, "({payload})")?;
                }
            }
        }
        if let Some(result) = result {
            let value = self.func.value(result);
            write!(
                f,
                " : {} ${}",
                value.ownership(),
                self.interner.lookup(value.ty().name())
            )?;
        }
        Ok(())
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[ValueId]) -> fmt::Result {
    f.write_char('(')?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{v}")?;
    }
    f.write_char(')')
}

fn write_terminator(f: &mut fmt::Formatter<'_>, terminator: &Terminator) -> fmt::Result {
    match terminator {
        Terminator::Return { value: None } => f.write_str("return"),
        Terminator::Return { value: Some(v) } => write!(f, "return {v}"),
        Terminator::Jump { target, args } => {
            write!(f, "br {target}")?;
            if args.is_empty() {
                Ok(())
            } else {
                write_list(f, args)
            }
        }
        Terminator::Branch {
            cond,
            then_block,
            else_block,
        } => write!(f, "cond_br {cond}, {then_block}, {else_block}"),
        Terminator::Unreachable => f.write_str("unreachable"),
    }
}
