use std::fmt;

use super::input_source::InputPosition;
use super::symbol_table::*;
use super::tokens::Literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    LessThan,
    GreaterThan,
    Equality,
    Inequality,
}

impl BinaryOperator {
    /// Mnemonic of the instruction implementing the operator.
    pub fn mnemonic(&self) -> &'static str {
        use BinaryOperator as BO;
        match self {
            BO::Add => "add",
            BO::Subtract => "sub",
            BO::Multiply => "mul",
            BO::Divide => "div",
            BO::LessThan => "lt",
            BO::GreaterThan => "gt",
            BO::Equality => "eq",
            BO::Inequality => "neq",
        }
    }

    pub fn symbol(&self) -> &'static str {
        use BinaryOperator as BO;
        match self {
            BO::Add => "+",
            BO::Subtract => "-",
            BO::Multiply => "*",
            BO::Divide => "/",
            BO::LessThan => "<",
            BO::GreaterThan => ">",
            BO::Equality => "==",
            BO::Inequality => "!=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionOperator {
    Assign,
    Binary(BinaryOperator),
}

impl fmt::Display for ExpressionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionOperator::Assign => write!(f, "="),
            ExpressionOperator::Binary(op) => write!(f, "{}", op.symbol()),
        }
    }
}

/// Tree produced by the parser. Every name has been resolved and every
/// variable has its frame-relative address by the time the tree exists.
#[derive(Debug, Clone)]
pub enum Node {
    Identifier(IdentifierNode),
    NumberLiteral(NumberLiteralNode),
    Expression(ExpressionNode),
    EntryPoint(EntryPointNode),
    Declaration(DeclarationNode),
    If(IfNode),
    While(WhileNode),
    Continue(JumpNode),
    Break(JumpNode),
    CodeBlock(CodeBlockNode),
    FunctionDefinition(FunctionDefinitionNode),
    FunctionCall(FunctionCallNode),
    Return(ReturnNode),
}

#[derive(Debug, Clone)]
pub struct IdentifierNode {
    pub position: InputPosition,
    pub name: String,
    pub symbol: VariableSymbol,
}

#[derive(Debug, Clone)]
pub struct NumberLiteralNode {
    pub position: InputPosition,
    pub value: Literal,
}

/// Binary operation or assignment. For assignments `left` is always an
/// `Identifier` node.
#[derive(Debug, Clone)]
pub struct ExpressionNode {
    pub position: InputPosition,
    pub operation: ExpressionOperator,
    pub left: Box<Node>,
    pub right: Box<Node>,
}

#[derive(Debug, Clone)]
pub struct EntryPointNode {
    pub position: InputPosition,
}

#[derive(Debug, Clone)]
pub struct DeclarationNode {
    pub position: InputPosition,
    pub type_symbol: TypeSymbol,
    pub variable: VariableSymbol,
    pub initializer: Option<Box<Node>>,
}

#[derive(Debug, Clone)]
pub struct IfNode {
    pub position: InputPosition,
    pub condition: Box<Node>,
    pub body: Box<Node>,
    pub after_label: String,
}

#[derive(Debug, Clone)]
pub struct WhileNode {
    pub position: InputPosition,
    pub condition: Box<Node>,
    pub body: Box<Node>,
    pub cond_label: String,
    pub after_label: String,
}

/// `continue` or `break`: an unconditional jump to a label of the enclosing
/// loop. `release` is the amount of block memory allocated between the loop
/// body's entry and the jump, which must be given back before leaving.
#[derive(Debug, Clone)]
pub struct JumpNode {
    pub position: InputPosition,
    pub target_label: String,
    pub release: u32,
}

#[derive(Debug, Clone)]
pub struct CodeBlockNode {
    pub position: InputPosition,
    pub scope: ScopeId,
    // frame offset at which the block's first declaration is placed
    pub base_offset: u32,
    // memory claimed by the block's own declarations
    pub total_size: u32,
    pub statements: Vec<Node>,
}

impl CodeBlockNode {
    /// Frame offset after the last declaration of this block.
    pub fn current_offset(&self) -> u32 {
        self.base_offset + self.total_size
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDefinitionNode {
    pub position: InputPosition,
    pub function: FunctionSymbol,
    // parameters with their frame addresses, in declared order
    pub params: Vec<VariableSymbol>,
    pub scope: ScopeId,
    pub body: Box<Node>,
}

#[derive(Debug, Clone)]
pub struct FunctionCallNode {
    pub position: InputPosition,
    pub name: String,
    pub function: FunctionSymbol,
    pub arguments: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct ReturnNode {
    pub position: InputPosition,
    pub value: Box<Node>,
}

impl Node {
    pub fn position(&self) -> InputPosition {
        match self {
            Node::Identifier(n) => n.position,
            Node::NumberLiteral(n) => n.position,
            Node::Expression(n) => n.position,
            Node::EntryPoint(n) => n.position,
            Node::Declaration(n) => n.position,
            Node::If(n) => n.position,
            Node::While(n) => n.position,
            Node::Continue(n) | Node::Break(n) => n.position,
            Node::CodeBlock(n) => n.position,
            Node::FunctionDefinition(n) => n.position,
            Node::FunctionCall(n) => n.position,
            Node::Return(n) => n.position,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Identifier(_) => "Identifier",
            Node::NumberLiteral(_) => "NumberLiteral",
            Node::Expression(_) => "Expression",
            Node::EntryPoint(_) => "EntryPoint",
            Node::Declaration(_) => "Declaration",
            Node::If(_) => "If",
            Node::While(_) => "While",
            Node::Continue(_) => "Continue",
            Node::Break(_) => "Break",
            Node::CodeBlock(_) => "CodeBlock",
            Node::FunctionDefinition(_) => "FunctionDefinition",
            Node::FunctionCall(_) => "FunctionCall",
            Node::Return(_) => "Return",
        }
    }

    pub fn as_code_block(&self) -> Option<&CodeBlockNode> {
        match self {
            Node::CodeBlock(block) => Some(block),
            _ => None,
        }
    }
}
