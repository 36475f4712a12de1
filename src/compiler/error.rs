use std::fmt;

use super::input_source::*;

/// What went wrong during compilation. All kinds abort compilation
/// immediately; there is no recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    Lexical,
    UnexpectedToken { found: String, index: usize },
    UndeclaredType(String),
    UndeclaredIdentifier(String),
    Redefinition(String),
    ArityMismatch { function: String, expected: usize, found: usize },
    NotAFunction(String),
    NotAVariable(String),
    VariableOutsideFrame(String),
    FrameTooLarge(String),
    InvalidAssignmentTarget,
    InvalidReturn,
    LoopError { statement: &'static str },
    ArraySubscriptUnsupported,
    NestingTooDeep,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CompileErrorKind::*;
        match self {
            Lexical => write!(f, "invalid input"),
            UnexpectedToken { found, index } => write!(f, "Unexpected token <{}> at position {}", found, index),
            UndeclaredType(name) => write!(f, "Undeclared type <{}>", name),
            UndeclaredIdentifier(name) => write!(f, "Undeclared identifier <{}>", name),
            Redefinition(name) => write!(f, "Symbol <{}> is already defined in this scope", name),
            ArityMismatch { function, expected, found } => {
                write!(f, "Invalid arity in call to {}: expected {} argument(s), got {}", function, expected, found)
            }
            NotAFunction(name) => write!(f, "<{}> is not a function", name),
            NotAVariable(name) => write!(f, "<{}> is not a variable", name),
            VariableOutsideFrame(name) => {
                write!(f, "Variable <{}> belongs to another function's frame and cannot be accessed here", name)
            }
            FrameTooLarge(name) => write!(f, "Variable <{}> does not fit in the frame's address space", name),
            InvalidAssignmentTarget => write!(f, "Left side of an assignment must be a variable"),
            InvalidReturn => write!(f, "Return statement outside function definition"),
            LoopError { statement } => write!(f, "<{}> statement is outside a loop", statement),
            ArraySubscriptUnsupported => write!(f, "Array subscript is not supported"),
            NestingTooDeep => write!(f, "Too deeply nested expression or statement"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub position: Option<InputPosition>,
    // rendered source context; empty when compiling a bare token stream
    pub report: ErrorReport,
}

impl CompileError {
    pub(crate) fn new(kind: CompileErrorKind, position: Option<InputPosition>, source: Option<&InputSource>) -> Self {
        let report = match (source, position) {
            (Some(source), Some(position)) => ErrorReport::error(source, position, &kind.to_string()),
            _ => ErrorReport::empty(),
        };
        Self { kind, position, report }
    }

    pub(crate) fn from_lexical(err: ErrorReport) -> Self {
        let position = err.first_position();
        Self { kind: CompileErrorKind::Lexical, position, report: err }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.report.is_empty() {
            return write!(f, "{}", self.report);
        }
        match self.position {
            Some(position) => write!(f, "{} (at {})", self.kind, position),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for CompileError {}
