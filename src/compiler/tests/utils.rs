use crate::compiler::{
    ast::*,
    ast_printer::print_ast,
    codegen::{CodeGenerator, Listing},
    error::{CompileError, CompileErrorKind},
    parser::ParsedProgram,
    CompileConfig, Compiler,
};
use crate::vm::{
    error::{RuntimeError, RuntimeErrorKind},
    value::Value,
    VirtualMachine, VmConfig,
};

//------------------------------------------------------------------------------
// Interface for parsing and compiling
//------------------------------------------------------------------------------

pub(crate) struct Tester {
    test_name: String,
    source: String,
    config: CompileConfig,
}

impl Tester {
    pub(crate) fn new<T: ToString, S: ToString>(test_name: T, source: S) -> Self {
        Self { test_name: test_name.to_string(), source: source.to_string(), config: CompileConfig::default() }
    }

    /// Utility for quick tests that expect the compilation to succeed.
    pub(crate) fn new_single_source_expect_ok<T: ToString, S: ToString>(test_name: T, source: S) -> CompiledTester {
        Self::new(test_name, source).compile().expect_ok()
    }

    /// Utility for quick tests that expect the compilation to fail.
    pub(crate) fn new_single_source_expect_err<T: ToString, S: ToString>(test_name: T, source: S) -> ErrTester {
        Self::new(test_name, source).compile().expect_err()
    }

    pub(crate) fn with_config(mut self, config: CompileConfig) -> Self {
        self.config = config;
        self
    }

    pub(crate) fn compile(self) -> TesterResult {
        let mut compiler = Compiler::new(self.config);
        match compiler.parse(&self.source) {
            Ok(parsed) => {
                let listing = CodeGenerator::new().generate(&parsed.root);
                TesterResult::Ok(CompiledTester { test_name: self.test_name, parsed, listing })
            }
            Err(error) => TesterResult::Err(ErrTester { test_name: self.test_name, error }),
        }
    }
}

pub(crate) enum TesterResult {
    Ok(CompiledTester),
    Err(ErrTester),
}

impl TesterResult {
    pub(crate) fn expect_ok(self) -> CompiledTester {
        match self {
            TesterResult::Ok(v) => v,
            TesterResult::Err(err) => {
                println!("DEBUG: Full error:\n{}", &err.error);
                panic!("[{}] Expected compilation to succeed, but it failed with {:?}", err.test_name, err.error.kind);
            }
        }
    }

    pub(crate) fn expect_err(self) -> ErrTester {
        match self {
            TesterResult::Ok(ok) => {
                panic!("[{}] Expected compilation to fail, but it succeeded with:\n{}", ok.test_name, ok.listing);
            }
            TesterResult::Err(err) => err,
        }
    }
}

//------------------------------------------------------------------------------
// Interface for successful compilation
//------------------------------------------------------------------------------

pub(crate) struct CompiledTester {
    test_name: String,
    parsed: ParsedProgram,
    listing: Listing,
}

impl CompiledTester {
    pub(crate) fn assert_listing(self, expected: &[&str]) -> Self {
        let lines: Vec<&str> = self.listing.lines.iter().map(|l| l.as_str()).collect();
        assert_eq!(
            expected, lines.as_slice(),
            "[{}] Listing differs from expected one:\n{}", self.test_name, self.listing
        );
        self
    }

    /// Checks that the lines appear in the listing consecutively.
    pub(crate) fn assert_listing_has(self, expected: &[&str]) -> Self {
        let found = self.listing.lines.windows(expected.len().max(1)).any(|window| {
            window.iter().map(|l| l.as_str()).eq(expected.iter().copied())
        });
        assert!(
            found, "[{}] Expected listing to contain {:?} for:\n{}",
            self.test_name, expected, self.listing
        );
        self
    }

    pub(crate) fn assert_no_line(self, line: &str) -> Self {
        assert!(
            !self.listing.lines.iter().any(|l| l == line),
            "[{}] Expected listing not to contain '{}' for:\n{}", self.test_name, line, self.listing
        );
        self
    }

    /// Checks the address of the first declaration of `name`, in source order.
    pub(crate) fn assert_var_address(self, name: &str, address: u32) -> Self {
        let found = find_declaration(&self.parsed.root, name).and_then(|d| d.variable.address);
        assert_eq!(
            found, Some(address),
            "[{}] Expected variable '{}' at address {}, found {:?}", self.test_name, name, address, found
        );
        self
    }

    pub(crate) fn for_ast<F: Fn(&str)>(self, f: F) -> Self {
        f(&print_ast(&self.parsed.root));
        self
    }

    pub(crate) fn for_root<F: Fn(&Node)>(self, f: F) -> Self {
        f(&self.parsed.root);
        self
    }

    pub(crate) fn run(self) -> RunTester {
        let program = match self.listing.assemble() {
            Ok(program) => program,
            Err(err) => panic!("[{}] Failed to assemble: {}\n{}", self.test_name, err, self.listing),
        };
        let mut vm = VirtualMachine::new(VmConfig::default());
        let result = vm.run(&program);
        RunTester { test_name: self.test_name, listing: self.listing, vm, result }
    }
}

fn find_declaration<'a>(node: &'a Node, name: &str) -> Option<&'a DeclarationNode> {
    match node {
        Node::Declaration(decl) if decl.variable.name == name => Some(decl),
        Node::CodeBlock(block) => block.statements.iter().find_map(|s| find_declaration(s, name)),
        Node::If(stmt) => find_declaration(&stmt.body, name),
        Node::While(stmt) => find_declaration(&stmt.body, name),
        Node::FunctionDefinition(def) => find_declaration(&def.body, name),
        _ => None,
    }
}

//------------------------------------------------------------------------------
// Interface for running compiled code
//------------------------------------------------------------------------------

pub(crate) struct RunTester {
    test_name: String,
    listing: Listing,
    vm: VirtualMachine,
    result: Result<(), RuntimeError>,
}

impl RunTester {
    pub(crate) fn expect_ok(self) -> Self {
        if let Err(err) = &self.result {
            panic!("[{}] Expected execution to succeed, but got: {}\n{}", self.test_name, err, self.listing);
        }
        self
    }

    pub(crate) fn expect_err(self, expected: RuntimeErrorKind) -> Self {
        match &self.result {
            Ok(()) => panic!("[{}] Expected execution to fail, but it succeeded", self.test_name),
            Err(err) => assert_eq!(
                err.kind, expected,
                "[{}] Unexpected runtime error at instruction {}", self.test_name, err.ip
            ),
        }
        self
    }

    pub(crate) fn assert_memory(self, address: usize, value: Value) -> Self {
        let found = self.vm.memory().get(address).copied();
        assert_eq!(
            found, Some(value),
            "[{}] Expected memory slot {} to hold {}, machine state:\n{}",
            self.test_name, address, value, self.vm.show(2)
        );
        self
    }

    pub(crate) fn assert_stack(self, expected: &[Value]) -> Self {
        assert_eq!(
            self.vm.stack(), expected,
            "[{}] Unexpected stack contents, machine state:\n{}", self.test_name, self.vm.show(2)
        );
        self
    }

    /// Every block gives back what it allocated, so the root frame ends empty.
    pub(crate) fn assert_memory_released(self) -> Self {
        let frames = self.vm.frames();
        assert_eq!(frames.len(), 1, "[{}] Expected only the root frame to remain", self.test_name);
        assert_eq!(
            frames[0].allocated(), 0,
            "[{}] Expected all memory to be released, machine state:\n{}", self.test_name, self.vm.show(2)
        );
        self
    }
}

//------------------------------------------------------------------------------
// Utilities for failed compilation
//------------------------------------------------------------------------------

pub(crate) struct ErrTester {
    test_name: String,
    error: CompileError,
}

impl ErrTester {
    pub(crate) fn assert_kind(self, kind: CompileErrorKind) -> Self {
        assert_eq!(
            self.error.kind, kind,
            "[{}] Unexpected error kind for:\n{}", self.test_name, self.error
        );
        self
    }

    pub(crate) fn assert_num(self, num: usize) -> Self {
        assert_eq!(
            num, self.error.report.entries.len(),
            "[{}] Expected error to consist of '{}' parts for:\n{}", self.test_name, num, self.error
        );
        self
    }

    pub(crate) fn assert_msg_has(self, idx: usize, msg: &str) -> Self {
        assert!(
            self.error.report.entries[idx].message.contains(msg),
            "[{}] Expected report entry {}'s message to contain '{}' for:\n{}",
            self.test_name, idx, msg, self.error
        );
        self
    }

    /// Seeks the pattern in the rendered source line, then checks that the
    /// error position points at it.
    pub(crate) fn assert_occurs_at(self, pattern: &str) -> Self {
        let entry = &self.error.report.entries[0];
        let idx = entry.line_text.find(pattern);
        assert!(
            idx.is_some(),
            "[{}] Pattern '{}' does not occur in the error context for:\n{}", self.test_name, pattern, self.error
        );
        assert_eq!(
            entry.position.column, idx.unwrap() + 1,
            "[{}] Expected error to occur at '{}' for:\n{}", self.test_name, pattern, self.error
        );
        self
    }

    pub(crate) fn assert_line(self, line: usize) -> Self {
        let found = self.error.position.map(|p| p.line);
        assert_eq!(found, Some(line), "[{}] Unexpected error line for:\n{}", self.test_name, self.error);
        self
    }
}
