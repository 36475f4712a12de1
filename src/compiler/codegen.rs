/// codegen.rs
///
/// Turns a parsed program into the textual instruction listing understood by
/// the virtual machine's assembler. All names, addresses and labels have been
/// settled by the parser, so generation cannot fail.

use std::fmt;

use crate::vm::bytecode::{self, Program, ENTRY_LABEL};
use crate::vm::error::AssembleError;
use super::ast::*;
use super::symbol_table::VariableSymbol;

/// Ordered list of emitted statements. Each entry is either a label marker
/// (`name:`) or an instruction (`mnemonic [operand]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub lines: Vec<String>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn has_entry_point(&self) -> bool {
        let entry = format!("{}:", ENTRY_LABEL);
        self.lines.iter().any(|l| *l == entry)
    }

    /// Renders the bytecode text, terminating every instruction with `;` and
    /// appending the final `halt`.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            if !line.ends_with(':') {
                out.push(';');
            }
            out.push('\n');
        }
        out.push_str("halt;\n");
        out
    }

    pub fn assemble(&self) -> Result<Program, AssembleError> {
        bytecode::assemble(&self.to_source())
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_source())
    }
}

pub struct CodeGenerator {
    out: Vec<String>,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self { out: Vec::new() }
    }

    pub fn generate(mut self, root: &Node) -> Listing {
        self.emit_statement(root);
        Listing { lines: self.out }
    }

    fn instr(&mut self, mnemonic: &str) {
        self.out.push(mnemonic.to_string());
    }

    fn instr_arg<D: fmt::Display>(&mut self, mnemonic: &str, arg: D) {
        self.out.push(format!("{} {}", mnemonic, arg));
    }

    fn label(&mut self, label: &str) {
        self.out.push(format!("{}:", label));
    }

    fn address_of(variable: &VariableSymbol) -> u32 {
        // the parser places every variable before it can be referenced
        debug_assert!(variable.address.is_some(), "variable {} has no address", variable.name);
        variable.address.unwrap_or_default()
    }

    /// Emits a node in statement position. Assignments used as statements do
    /// not leave their value on the stack; other expressions do.
    fn emit_statement(&mut self, node: &Node) {
        match node {
            Node::Expression(expr) if expr.operation == ExpressionOperator::Assign => {
                self.emit_assignment(expr, false);
            }
            Node::Identifier(_) | Node::NumberLiteral(_) | Node::Expression(_) | Node::FunctionCall(_) => {
                self.emit_expression(node);
            }
            Node::EntryPoint(_) => {
                self.label(ENTRY_LABEL);
            }
            Node::Declaration(decl) => {
                self.instr_arg("push", decl.type_symbol.size);
                self.instr("alloc");
                if let Some(initializer) = &decl.initializer {
                    self.emit_expression(initializer);
                    self.instr_arg("store", Self::address_of(&decl.variable));
                }
            }
            Node::If(stmt) => {
                self.emit_expression(&stmt.condition);
                self.instr_arg("jz", &stmt.after_label);
                self.emit_statement(&stmt.body);
                self.label(&stmt.after_label);
            }
            Node::While(stmt) => {
                self.label(&stmt.cond_label);
                self.emit_expression(&stmt.condition);
                self.instr_arg("jz", &stmt.after_label);
                self.emit_statement(&stmt.body);
                self.instr_arg("jump", &stmt.cond_label);
                self.label(&stmt.after_label);
            }
            Node::Continue(stmt) | Node::Break(stmt) => {
                if stmt.release > 0 {
                    self.instr_arg("push", stmt.release);
                    self.instr("dealloc");
                }
                self.instr_arg("jump", &stmt.target_label);
            }
            Node::CodeBlock(block) => {
                for statement in &block.statements {
                    self.emit_statement(statement);
                }
                // a block without declarations has nothing to give back
                if block.total_size > 0 {
                    self.instr_arg("push", block.total_size);
                    self.instr("dealloc");
                }
            }
            Node::FunctionDefinition(def) => {
                self.label(&def.function.label);
                // The parameter area is claimed at once, since the last
                // argument is on top of the stack but has the highest address.
                if def.function.params_size > 0 {
                    self.instr_arg("push", def.function.params_size);
                    self.instr("alloc");
                }
                for param in def.params.iter().rev() {
                    self.instr_arg("store", Self::address_of(param));
                }
                self.emit_statement(&def.body);
                self.instr("ret");
            }
            Node::Return(stmt) => {
                self.emit_expression(&stmt.value);
                self.instr("ret");
            }
        }
    }

    /// Emits a node whose value is consumed. Leaves exactly one value on the
    /// stack.
    fn emit_expression(&mut self, node: &Node) {
        match node {
            Node::NumberLiteral(lit) => self.instr_arg("push", lit.value),
            Node::Identifier(ident) => self.instr_arg("load", Self::address_of(&ident.symbol)),
            Node::Expression(expr) => match expr.operation {
                ExpressionOperator::Assign => self.emit_assignment(expr, true),
                ExpressionOperator::Binary(op) => {
                    self.emit_expression(&expr.left);
                    self.emit_expression(&expr.right);
                    self.instr(op.mnemonic());
                }
            },
            Node::FunctionCall(call) => {
                for argument in &call.arguments {
                    self.emit_expression(argument);
                }
                self.instr_arg("push", call.arguments.len());
                self.instr_arg("call", &call.function.label);
            }
            _ => unreachable!("emitting {} in expression position", node.kind_name()),
        }
    }

    fn emit_assignment(&mut self, expr: &ExpressionNode, keep_value: bool) {
        let address = match &*expr.left {
            Node::Identifier(ident) => Self::address_of(&ident.symbol),
            _ => unreachable!("assignment target is not an identifier"),
        };
        self.emit_expression(&expr.right);
        if keep_value {
            self.instr("dup");
        }
        self.instr_arg("store", address);
    }
}
