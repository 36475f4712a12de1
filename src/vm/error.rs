use std::fmt;

/// Failure while turning bytecode text into a `Program`. `statement` is the
/// 0-based index of the offending `;`-terminated statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    UnknownInstruction { statement: usize, mnemonic: String },
    MissingOperand { statement: usize, mnemonic: String },
    UnexpectedOperand { statement: usize, mnemonic: String },
    InvalidOperand { statement: usize, operand: String },
    UnknownLabel { statement: usize, label: String },
    DuplicateLabel { statement: usize, label: String },
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AssembleError::*;
        match self {
            UnknownInstruction { statement, mnemonic } => {
                write!(f, "statement {}: unknown instruction '{}'", statement, mnemonic)
            }
            MissingOperand { statement, mnemonic } => {
                write!(f, "statement {}: '{}' requires an operand", statement, mnemonic)
            }
            UnexpectedOperand { statement, mnemonic } => {
                write!(f, "statement {}: '{}' takes no operand", statement, mnemonic)
            }
            InvalidOperand { statement, operand } => {
                write!(f, "statement {}: invalid operand '{}'", statement, operand)
            }
            UnknownLabel { statement, label } => write!(f, "statement {}: unknown label '{}'", statement, label),
            DuplicateLabel { statement, label } => {
                write!(f, "statement {}: label '{}' is defined more than once", statement, label)
            }
        }
    }
}

impl std::error::Error for AssembleError {}

/// Violated machine invariant. Every kind aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Popping or reading below the current frame's floor. `required` is the
    /// number of values the instruction needed, `available` what the frame had.
    StackUnderflow { instruction: &'static str, required: usize, available: usize },
    /// A frame-relative address outside `[mem_start, mem_end)`.
    MemoryOutOfBounds { address: usize, mem_start: usize, mem_end: usize },
    InvalidAlloc { requested: String },
    InvalidDealloc { requested: String, allocated: usize },
    DivisionByZero,
    ReturnFromRootFrame,
    InvalidJumpTarget { target: usize, num_instructions: usize },
    /// An operand taken from the stack had to be a non-negative integer.
    TypeMismatch { instruction: &'static str, found: String },
    StackOverflow { limit: usize },
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RuntimeErrorKind::*;
        match self {
            StackUnderflow { instruction, required, available } => write!(
                f, "Stack underflow in {}: requires {} value(s) but the frame holds {}",
                instruction, required, available
            ),
            MemoryOutOfBounds { address, mem_start, mem_end } => write!(
                f, "Memory access outside the frame! Requested {}, but memory bounds are [{}; {})",
                address, mem_start, mem_end
            ),
            InvalidAlloc { requested } => write!(f, "Invalid argument to alloc: {}", requested),
            InvalidDealloc { requested, allocated } => write!(
                f, "Invalid argument to dealloc: requested {} but the frame holds {}", requested, allocated
            ),
            DivisionByZero => write!(f, "Division by zero"),
            ReturnFromRootFrame => write!(f, "Return without a matching call"),
            InvalidJumpTarget { target, num_instructions } => write!(
                f, "Jump target {} lies outside the program ({} instructions)", target, num_instructions
            ),
            TypeMismatch { instruction, found } => {
                write!(f, "{} expects a non-negative integer on the stack, found {}", instruction, found)
            }
            StackOverflow { limit } => write!(f, "Stack overflow: more than {} values", limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    // index of the instruction that failed
    pub ip: usize,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at instruction {})", self.kind, self.ip)
    }
}

impl std::error::Error for RuntimeError {}
