/**
 * compiler/tests
 *
 * Tests for the parser's validation, the generated listings and the results of
 * running those listings on the virtual machine. Each test goes through the
 * `Tester` harness so that failures report the name of the offending case.
 */

mod utils;
mod eval;
mod parser_validation;

pub(crate) use utils::Tester; // the testing harness
pub(crate) use crate::common::Logger;
pub(crate) use crate::compiler::ast::*;
pub(crate) use crate::compiler::error::CompileErrorKind;
pub(crate) use crate::compiler::{CompileConfig, Compiler};
pub(crate) use crate::vm::error::RuntimeErrorKind;
pub(crate) use crate::vm::logging::StringLogger;
pub(crate) use crate::vm::value::Value;
