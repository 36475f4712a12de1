/// bytecode.rs
///
/// Textual bytecode and its assembled form. Text is a sequence of
/// `;`-terminated statements, each optionally prefixed by `label:` markers.
/// Assembling strips the labels into a name to index map, rewrites the label
/// operands of control-flow instructions to instruction indices and decodes
/// every mnemonic once into an `Instruction`.

use std::fmt;

use crate::common::*;
use crate::compiler::input_source::strip_comments;
use super::error::AssembleError;
use super::value::Value;

pub const ENTRY_LABEL: &'static str = "program";
const COMMENT_MARKER: &'static str = "//";

/// Decoded machine instruction. Control-flow targets are instruction indices.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Instruction {
    Push(Value),
    Pop,
    Dup,
    Swap,
    PutNext,
    Load(usize),
    Store(usize),
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Eq,
    Neq,
    Inc,
    Dec,
    Jump(usize),
    Jz(usize),
    Jnz(usize),
    Call(usize),
    Ret,
    Alloc,
    Dealloc,
    Show(u32),
    Nop,
    Halt,
}

/// What kind of operand a mnemonic takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandKind {
    None,
    Value,
    Address,
    Target,
    Level,
}

fn operand_kind(mnemonic: &str) -> Option<OperandKind> {
    use OperandKind as OK;
    let kind = match mnemonic {
        "push" => OK::Value,
        "load" | "store" => OK::Address,
        "jump" | "jz" | "jnz" | "call" => OK::Target,
        "show" => OK::Level,
        "pop" | "dup" | "swap" | "putnext" | "add" | "sub" | "mul" | "div" | "lt" | "gt" | "eq" | "neq"
        | "inc" | "dec" | "ret" | "alloc" | "dealloc" | "nop" | "halt" => OK::None,
        _ => return None,
    };
    Some(kind)
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        use Instruction as I;
        match self {
            I::Push(_) => "push",
            I::Pop => "pop",
            I::Dup => "dup",
            I::Swap => "swap",
            I::PutNext => "putnext",
            I::Load(_) => "load",
            I::Store(_) => "store",
            I::Add => "add",
            I::Sub => "sub",
            I::Mul => "mul",
            I::Div => "div",
            I::Lt => "lt",
            I::Gt => "gt",
            I::Eq => "eq",
            I::Neq => "neq",
            I::Inc => "inc",
            I::Dec => "dec",
            I::Jump(_) => "jump",
            I::Jz(_) => "jz",
            I::Jnz(_) => "jnz",
            I::Call(_) => "call",
            I::Ret => "ret",
            I::Alloc => "alloc",
            I::Dealloc => "dealloc",
            I::Show(_) => "show",
            I::Nop => "nop",
            I::Halt => "halt",
        }
    }

    fn without_operand(mnemonic: &str) -> Instruction {
        use Instruction as I;
        match mnemonic {
            "pop" => I::Pop,
            "dup" => I::Dup,
            "swap" => I::Swap,
            "putnext" => I::PutNext,
            "add" => I::Add,
            "sub" => I::Sub,
            "mul" => I::Mul,
            "div" => I::Div,
            "lt" => I::Lt,
            "gt" => I::Gt,
            "eq" => I::Eq,
            "neq" => I::Neq,
            "inc" => I::Inc,
            "dec" => I::Dec,
            "ret" => I::Ret,
            "alloc" => I::Alloc,
            "dealloc" => I::Dealloc,
            "halt" => I::Halt,
            _ => I::Nop,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction as I;
        match self {
            I::Push(v) => write!(f, "push {}", v),
            I::Load(a) | I::Store(a) => write!(f, "{} {}", self.mnemonic(), a),
            I::Jump(t) | I::Jz(t) | I::Jnz(t) | I::Call(t) => write!(f, "{} {}", self.mnemonic(), t),
            I::Show(level) => write!(f, "show {}", level),
            _ => f.write_str(self.mnemonic()),
        }
    }
}

/// An assembled, ready to run program.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub labels: HashMap<String, usize>,
    // index execution starts at
    pub entry: usize,
}

impl Program {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Program, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// One instruction per line, prefixed by its index and by the labels
    /// pointing at it.
    pub fn disassemble(&self) -> String {
        let mut by_index: HashMap<usize, Vec<&str>> = HashMap::new();
        for (label, index) in &self.labels {
            by_index.entry(*index).or_default().push(label);
        }
        let mut out = String::new();
        for index in 0..=self.instructions.len() {
            if let Some(labels) = by_index.get_mut(&index) {
                labels.sort();
                for label in labels.iter() {
                    out.push_str(&format!("{}:\n", label));
                }
            }
            if let Some(instruction) = self.instructions.get(index) {
                out.push_str(&format!("{:4}  {}\n", index, instruction));
            }
        }
        out
    }
}

/// One `;`-terminated statement, split into its label markers and the
/// instruction text.
struct Statement<'a> {
    index: usize,
    labels: Vec<&'a str>,
    body: &'a str,
}

fn split_statements(text: &str) -> Vec<Statement> {
    text.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(index, s)| {
            let mut parts: Vec<&str> = s.split(':').map(str::trim).collect();
            let body = parts.pop().unwrap_or("");
            Statement { index, labels: parts, body }
        })
        .collect()
}

fn parse_value(statement: usize, operand: &str) -> Result<Value, AssembleError> {
    if let Ok(v) = operand.parse::<i64>() {
        return Ok(Value::Int(v));
    }
    match operand.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Value::Float(v)),
        _ => Err(AssembleError::InvalidOperand { statement, operand: operand.to_string() }),
    }
}

fn parse_index<T: std::str::FromStr>(statement: usize, operand: &str) -> Result<T, AssembleError> {
    operand.parse::<T>().map_err(|_| AssembleError::InvalidOperand { statement, operand: operand.to_string() })
}

/// Assembles bytecode text. Labels bind to the next instruction; a label at
/// the very end binds to the index one past the last instruction. Execution
/// starts at the `program` label, or at index 0 if there is none.
pub fn assemble(text: &str) -> Result<Program, AssembleError> {
    let text = strip_comments(text, COMMENT_MARKER);
    let statements = split_statements(&text);

    // First pass: label positions
    let mut labels = HashMap::new();
    let mut num_instructions = 0;
    for statement in &statements {
        for label in &statement.labels {
            if label.is_empty() {
                return Err(AssembleError::InvalidOperand { statement: statement.index, operand: String::from(":") });
            }
            if labels.insert(label.to_string(), num_instructions).is_some() {
                return Err(AssembleError::DuplicateLabel { statement: statement.index, label: label.to_string() });
            }
        }
        if !statement.body.is_empty() {
            num_instructions += 1;
        }
    }

    // Second pass: decode instructions
    let mut instructions = Vec::with_capacity(num_instructions);
    for statement in &statements {
        if statement.body.is_empty() {
            continue;
        }
        instructions.push(decode(statement, &labels)?);
    }

    let entry = labels.get(ENTRY_LABEL).copied().unwrap_or(0);
    Ok(Program { instructions, labels, entry })
}

fn decode(statement: &Statement, labels: &HashMap<String, usize>) -> Result<Instruction, AssembleError> {
    let index = statement.index;
    let mut words = statement.body.split_whitespace();
    let mnemonic = words.next().unwrap_or("").to_lowercase();
    let operand = words.next();
    if let Some(extra) = words.next() {
        return Err(AssembleError::InvalidOperand { statement: index, operand: extra.to_string() });
    }

    let kind = match operand_kind(&mnemonic) {
        Some(kind) => kind,
        None => return Err(AssembleError::UnknownInstruction { statement: index, mnemonic }),
    };

    let operand = match (kind, operand) {
        (OperandKind::None, None) => return Ok(Instruction::without_operand(&mnemonic)),
        (OperandKind::None, Some(_)) => return Err(AssembleError::UnexpectedOperand { statement: index, mnemonic }),
        (_, None) => return Err(AssembleError::MissingOperand { statement: index, mnemonic }),
        (_, Some(operand)) => operand,
    };

    let instruction = match kind {
        OperandKind::Value => Instruction::Push(parse_value(index, operand)?),
        OperandKind::Address => {
            let address = parse_index(index, operand)?;
            if mnemonic == "load" { Instruction::Load(address) } else { Instruction::Store(address) }
        }
        OperandKind::Target => {
            let target = match labels.get(operand) {
                Some(target) => *target,
                None if operand.starts_with(|c: char| c.is_ascii_digit()) => parse_index(index, operand)?,
                None => return Err(AssembleError::UnknownLabel { statement: index, label: operand.to_string() }),
            };
            match mnemonic.as_str() {
                "jump" => Instruction::Jump(target),
                "jz" => Instruction::Jz(target),
                "jnz" => Instruction::Jnz(target),
                _ => Instruction::Call(target),
            }
        }
        OperandKind::Level => Instruction::Show(parse_index(index, operand)?),
        OperandKind::None => unreachable!(),
    };
    Ok(instruction)
}
