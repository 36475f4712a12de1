/// ast_printer.rs
///
/// Debug rendering of a parsed program. Every node gets a tag made of a short
/// kind prefix and its visiting index, followed by its properties indented
/// one level deeper.

use std::fmt::Display;

use super::ast::*;

const INDENT: usize = 2;
// width of a rendered "SBl [0000]" tag
const TAG_WIDTH: usize = 10;

const PREFIX_BLOCK_ID: &'static str = "SBl ";
const PREFIX_ENTRY_ID: &'static str = "SEnt";
const PREFIX_DECLARATION_ID: &'static str = "SDcl";
const PREFIX_IF_STMT_ID: &'static str = "SIf ";
const PREFIX_WHILE_STMT_ID: &'static str = "SWhi";
const PREFIX_BREAK_STMT_ID: &'static str = "SBre";
const PREFIX_CONTINUE_STMT_ID: &'static str = "SCon";
const PREFIX_RETURN_STMT_ID: &'static str = "SRet";
const PREFIX_FUNCTION_ID: &'static str = "DefF";
const PREFIX_ASSIGNMENT_EXPR_ID: &'static str = "EAsi";
const PREFIX_BINARY_EXPR_ID: &'static str = "EBin";
const PREFIX_CONST_EXPR_ID: &'static str = "ECns";
const PREFIX_CALL_EXPR_ID: &'static str = "ECll";
const PREFIX_VARIABLE_EXPR_ID: &'static str = "EVar";

/// Renders a tree with one key/value line per node property.
pub fn print_ast(root: &Node) -> String {
    let mut writer = ASTWriter::new();
    writer.write_node(root, 0);
    writer.buffer
}

/// One output line. The line is appended to the buffer when the builder is
/// dropped.
struct KV<'a> {
    buffer: &'a mut String,
    tag: Option<(&'static str, u32)>,
    depth: usize,
    key: String,
    value: String,
}

impl<'a> KV<'a> {
    fn new(buffer: &'a mut String, depth: usize) -> Self {
        KV { buffer, tag: None, depth, key: String::new(), value: String::new() }
    }

    fn with_id(mut self, prefix: &'static str, id: u32) -> Self {
        self.tag = Some((prefix, id));
        self
    }

    fn with_s_key(mut self, key: &str) -> Self {
        self.key.push_str(key);
        self
    }

    fn with_s_val(mut self, val: &str) -> Self {
        self.value.push_str(val);
        self
    }

    fn with_disp_val<D: Display>(mut self, val: &D) -> Self {
        self.value.push_str(&val.to_string());
        self
    }

    fn with_opt_disp_val<D: Display>(self, val: Option<&D>) -> Self {
        match val {
            Some(v) => self.with_s_val(&format!("Some({})", v)),
            None => self.with_s_val("None"),
        }
    }
}

impl<'a> Drop for KV<'a> {
    fn drop(&mut self) {
        let tag = match self.tag {
            Some((prefix, id)) => format!("{}[{:04}]", prefix, id),
            None => " ".repeat(TAG_WIDTH),
        };
        let separator = if self.value.is_empty() { ":" } else { ": " };
        let line = format!(
            "{}{}- {}{}{}\n",
            tag, " ".repeat(self.depth * INDENT), self.key, separator, self.value
        );
        self.buffer.push_str(&line);
    }
}

struct ASTWriter {
    buffer: String,
    // nodes are numbered in visiting order
    next_id: u32,
}

impl ASTWriter {
    fn new() -> Self {
        Self { buffer: String::with_capacity(4096), next_id: 0 }
    }

    fn kv(&mut self, indent: usize) -> KV {
        KV::new(&mut self.buffer, indent)
    }

    fn mint_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id - 1
    }

    fn write_node(&mut self, node: &Node, indent: usize) {
        let id = self.mint_id();
        let indent2 = indent + 1;

        match node {
            Node::CodeBlock(block) => {
                self.kv(indent).with_id(PREFIX_BLOCK_ID, id).with_s_key("Block");
                self.kv(indent2).with_s_key("BaseOffset").with_disp_val(&block.base_offset);
                self.kv(indent2).with_s_key("TotalSize").with_disp_val(&block.total_size);
                self.kv(indent2).with_s_key("Statements");
                for statement in &block.statements {
                    self.write_node(statement, indent2 + 1);
                }
            }
            Node::EntryPoint(_) => {
                self.kv(indent).with_id(PREFIX_ENTRY_ID, id).with_s_key("EntryPoint");
            }
            Node::Declaration(decl) => {
                self.kv(indent).with_id(PREFIX_DECLARATION_ID, id).with_s_key("Declaration");
                self.kv(indent2).with_s_key("Name").with_s_val(&decl.variable.name);
                self.kv(indent2).with_s_key("Type").with_s_val(&decl.type_symbol.name);
                self.kv(indent2).with_s_key("Address").with_opt_disp_val(decl.variable.address.as_ref());
                if let Some(initializer) = &decl.initializer {
                    self.kv(indent2).with_s_key("Initializer");
                    self.write_node(initializer, indent2 + 1);
                }
            }
            Node::If(stmt) => {
                self.kv(indent).with_id(PREFIX_IF_STMT_ID, id).with_s_key("If");
                self.kv(indent2).with_s_key("AfterLabel").with_s_val(&stmt.after_label);
                self.kv(indent2).with_s_key("Condition");
                self.write_node(&stmt.condition, indent2 + 1);
                self.kv(indent2).with_s_key("Body");
                self.write_node(&stmt.body, indent2 + 1);
            }
            Node::While(stmt) => {
                self.kv(indent).with_id(PREFIX_WHILE_STMT_ID, id).with_s_key("While");
                self.kv(indent2).with_s_key("CondLabel").with_s_val(&stmt.cond_label);
                self.kv(indent2).with_s_key("AfterLabel").with_s_val(&stmt.after_label);
                self.kv(indent2).with_s_key("Condition");
                self.write_node(&stmt.condition, indent2 + 1);
                self.kv(indent2).with_s_key("Body");
                self.write_node(&stmt.body, indent2 + 1);
            }
            Node::Break(stmt) => {
                self.kv(indent).with_id(PREFIX_BREAK_STMT_ID, id).with_s_key("Break");
                self.kv(indent2).with_s_key("Target").with_s_val(&stmt.target_label);
                self.kv(indent2).with_s_key("Release").with_disp_val(&stmt.release);
            }
            Node::Continue(stmt) => {
                self.kv(indent).with_id(PREFIX_CONTINUE_STMT_ID, id).with_s_key("Continue");
                self.kv(indent2).with_s_key("Target").with_s_val(&stmt.target_label);
                self.kv(indent2).with_s_key("Release").with_disp_val(&stmt.release);
            }
            Node::Return(stmt) => {
                self.kv(indent).with_id(PREFIX_RETURN_STMT_ID, id).with_s_key("Return");
                self.write_node(&stmt.value, indent2);
            }
            Node::FunctionDefinition(def) => {
                self.kv(indent).with_id(PREFIX_FUNCTION_ID, id).with_s_key("FunctionDefinition");
                self.kv(indent2).with_s_key("Name").with_s_val(&def.function.name);
                self.kv(indent2).with_s_key("ReturnType").with_s_val(&def.function.return_type.name);
                self.kv(indent2).with_s_key("Label").with_s_val(&def.function.label);
                self.kv(indent2).with_s_key("Parameters");
                for param in &def.params {
                    self.kv(indent2 + 1).with_s_key(&param.name)
                        .with_s_val(&param.var_type.name)
                        .with_s_val(" @ ")
                        .with_opt_disp_val(param.address.as_ref());
                }
                self.kv(indent2).with_s_key("Body");
                self.write_node(&def.body, indent2 + 1);
            }
            Node::Expression(expr) => {
                let prefix = match expr.operation {
                    ExpressionOperator::Assign => PREFIX_ASSIGNMENT_EXPR_ID,
                    ExpressionOperator::Binary(_) => PREFIX_BINARY_EXPR_ID,
                };
                self.kv(indent).with_id(prefix, id).with_s_key("Expression");
                self.kv(indent2).with_s_key("Operation").with_disp_val(&expr.operation);
                self.kv(indent2).with_s_key("Left");
                self.write_node(&expr.left, indent2 + 1);
                self.kv(indent2).with_s_key("Right");
                self.write_node(&expr.right, indent2 + 1);
            }
            Node::NumberLiteral(lit) => {
                self.kv(indent).with_id(PREFIX_CONST_EXPR_ID, id).with_s_key("Number").with_disp_val(&lit.value);
            }
            Node::Identifier(ident) => {
                self.kv(indent).with_id(PREFIX_VARIABLE_EXPR_ID, id).with_s_key("Variable").with_s_val(&ident.name);
                self.kv(indent2).with_s_key("Address").with_opt_disp_val(ident.symbol.address.as_ref());
            }
            Node::FunctionCall(call) => {
                self.kv(indent).with_id(PREFIX_CALL_EXPR_ID, id).with_s_key("Call").with_s_val(&call.name);
                self.kv(indent2).with_s_key("Label").with_s_val(&call.function.label);
                self.kv(indent2).with_s_key("Arguments");
                for argument in &call.arguments {
                    self.write_node(argument, indent2 + 1);
                }
            }
        }
    }
}
