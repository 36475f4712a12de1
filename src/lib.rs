#[macro_use]
mod macros;

mod common;
pub mod compiler;
pub mod vm;

pub use common::Logger;
pub use compiler::codegen::Listing;
pub use compiler::error::{CompileError, CompileErrorKind};
pub use compiler::{CompileConfig, Compiler};
pub use vm::bytecode::{assemble, Instruction, Program};
pub use vm::error::{AssembleError, RuntimeError, RuntimeErrorKind};
pub use vm::logging::{DummyLogger, FileLogger, StringLogger};
pub use vm::value::Value;
pub use vm::{Frame, VirtualMachine, VmConfig};

/// Any failure along the pipeline from source text to a finished run.
#[derive(Debug, derive_more::From)]
pub enum Error {
    Compile(CompileError),
    Assemble(AssembleError),
    Runtime(RuntimeError),
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Compile(e) => write!(f, "compilation failed:\n{}", e),
            Error::Assemble(e) => write!(f, "assembly failed: {}", e),
            Error::Runtime(e) => write!(f, "execution failed: {}", e),
            Error::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

/// Compiles, assembles and runs `source` with default settings, returning the
/// machine in its final state for inspection.
pub fn run_source(source: &str) -> Result<VirtualMachine, Error> {
    let listing = Compiler::default().compile(source)?;
    let program = listing.assemble()?;
    let mut vm = VirtualMachine::new(VmConfig::default());
    vm.run(&program)?;
    Ok(vm)
}
