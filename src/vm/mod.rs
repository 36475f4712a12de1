/// vm
///
/// Stack machine executing assembled bytecode. State consists of a value
/// stack, a stack of call frames and one memory array shared by all frames.
/// Each frame owns the window `[mem_start, mem_end)` of that memory and a
/// floor on the value stack below which it may not pop.

pub mod bytecode;
pub mod error;
pub mod logging;
pub mod value;


use std::convert::TryFrom;
use std::fmt;

use crate::common::*;
use self::bytecode::{Instruction, Program};
use self::error::{RuntimeError, RuntimeErrorKind};
use self::logging::DummyLogger;
use self::value::{apply_arithmetic, ArithmeticOp, Value};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VmConfig {
    // initial reservations, both grow on demand
    pub stack_capacity: usize,
    pub memory_capacity: usize,
    // hard limit on the number of values on the stack
    pub max_stack: Option<usize>,
    // hard limit on the number of memory cells across all frames
    pub max_memory: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self { stack_capacity: 1000, memory_capacity: 100, max_stack: None, max_memory: Some(1 << 24) }
    }
}

/// A call activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Stack height when the frame was entered, minus its arguments.
    pub floor: usize,
    /// Index of the `call` instruction that created the frame.
    pub return_ip: usize,
    pub mem_start: usize,
    pub mem_end: usize,
}

impl Frame {
    fn root() -> Self {
        Frame { floor: 0, return_ip: 0, mem_start: 0, mem_end: 0 }
    }

    pub fn allocated(&self) -> usize {
        self.mem_end - self.mem_start
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "floor={}; return_ip={}; mem:[{},{})", self.floor, self.return_ip, self.mem_start, self.mem_end)
    }
}

#[derive(Debug)]
pub struct VirtualMachine {
    config: VmConfig,
    stack: Vec<Value>,
    memory: Vec<Value>,
    frames: Vec<Frame>,
    ip: usize,
    // set by instructions that redirect control flow
    ip_changed: bool,
    halted: bool,
    logger: Box<dyn Logger>,
}

type StepResult = Result<(), RuntimeErrorKind>;

impl VirtualMachine {
    pub fn new(config: VmConfig) -> Self {
        Self::with_logger(config, Box::new(DummyLogger::new()))
    }

    pub fn with_logger(config: VmConfig, logger: Box<dyn Logger>) -> Self {
        let stack = Vec::with_capacity(config.stack_capacity);
        let memory = Vec::with_capacity(config.memory_capacity);
        Self { config, stack, memory, frames: vec![Frame::root()], ip: 0, ip_changed: false, halted: false, logger }
    }

    //--------------------------------------------------------------------------
    // Inspection
    //--------------------------------------------------------------------------

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn memory(&self) -> &[Value] {
        &self.memory
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn logger(&self) -> &dyn Logger {
        &*self.logger
    }

    fn frame(&self) -> &Frame {
        // the root frame is never popped
        &self.frames[self.frames.len() - 1]
    }

    fn frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Values pushed within the current frame.
    pub fn local_stack(&self) -> &[Value] {
        &self.stack[self.frame().floor..]
    }

    /// Memory window of the current frame.
    pub fn local_memory(&self) -> &[Value] {
        let frame = self.frame();
        &self.memory[frame.mem_start..frame.mem_end]
    }

    /// Textual dump of the machine state. Level 0 is empty, level 1 shows the
    /// stack and the frames, level 2 additionally shows memory.
    pub fn show(&self, level: u32) -> String {
        fn values(values: &[Value]) -> String {
            let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            format!("[{}]", items.join(", "))
        }

        let mut out = String::new();
        if level == 0 {
            return out;
        }

        let frame = self.frame();
        out.push_str(&format!(
            "Stack (sp={}, floor={}, size={}):\n {}\n",
            self.stack.len(), frame.floor, self.local_stack().len(), values(self.local_stack())
        ));
        out.push_str(&format!("Full stack: {}\n", values(&self.stack)));
        out.push_str("Frames:\n");
        for frame in self.frames.iter().rev() {
            out.push_str(&format!("  {}\n", frame));
        }

        if level >= 2 {
            out.push_str(&format!("Memory (size={}):\n {}\n", self.memory.len(), values(&self.memory)));
            let local = self.local_memory();
            out.push_str(&format!("Local memory (size={}):\n {}\n", local.len(), values(local)));
        }
        out
    }

    //--------------------------------------------------------------------------
    // Execution
    //--------------------------------------------------------------------------

    fn reset(&mut self) {
        self.stack.clear();
        self.memory.clear();
        self.frames.clear();
        self.frames.push(Frame::root());
        self.ip = 0;
        self.ip_changed = false;
        self.halted = false;
    }

    /// Runs `program` from its entry point until `halt` or until the
    /// instruction pointer leaves the program. Any previous state is
    /// discarded first.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        self.reset();
        log!(self.logger, "Running {} instruction(s) from entry {}", program.len(), program.entry);
        if program.entry > program.len() {
            let kind = RuntimeErrorKind::InvalidJumpTarget { target: program.entry, num_instructions: program.len() };
            return Err(RuntimeError { kind, ip: 0 });
        }
        self.ip = program.entry;

        while !self.halted && self.ip < program.len() {
            let instruction = program.instructions[self.ip];
            if let Err(kind) = self.execute(instruction, program.len()) {
                log!(self.logger, "Aborted at {} ({}): {}", self.ip, instruction, kind);
                return Err(RuntimeError { kind, ip: self.ip });
            }
            if !self.ip_changed {
                self.ip += 1;
            }
            self.ip_changed = false;
        }

        log!(self.logger, "Stopped at {} with {} value(s) on the stack", self.ip, self.stack.len());
        Ok(())
    }

    fn execute(&mut self, instruction: Instruction, num_instructions: usize) -> StepResult {
        use Instruction as I;
        match instruction {
            I::Push(value) => self.push(value)?,
            I::Pop => {
                self.pop("pop")?;
            }
            I::Dup => {
                let top = self.peek("dup", 1)?;
                self.push(top)?;
            }
            I::Swap => {
                self.require("swap", 2)?;
                let v2 = self.pop("swap")?;
                let v1 = self.pop("swap")?;
                self.push(v2)?;
                self.push(v1)?;
            }
            I::PutNext => {
                let next = self.peek("putnext", 2)?;
                self.push(next)?;
            }
            I::Load(address) => {
                let absolute = self.check_address(address)?;
                let value = self.memory[absolute];
                self.push(value)?;
            }
            I::Store(address) => {
                self.require("store", 1)?;
                let absolute = self.check_address(address)?;
                let value = self.pop("store")?;
                self.memory[absolute] = value;
            }
            I::Add => self.binary("add", ArithmeticOp::Add)?,
            I::Sub => self.binary("sub", ArithmeticOp::Sub)?,
            I::Mul => self.binary("mul", ArithmeticOp::Mul)?,
            I::Div => self.binary("div", ArithmeticOp::Div)?,
            I::Lt => self.binary("lt", ArithmeticOp::Lt)?,
            I::Gt => self.binary("gt", ArithmeticOp::Gt)?,
            I::Eq => self.binary("eq", ArithmeticOp::Eq)?,
            I::Neq => self.binary("neq", ArithmeticOp::Neq)?,
            I::Inc => {
                self.require("inc", 1)?;
                self.push(Value::Int(1))?;
                self.binary("inc", ArithmeticOp::Add)?;
            }
            I::Dec => {
                self.require("dec", 1)?;
                self.push(Value::Int(1))?;
                self.binary("dec", ArithmeticOp::Sub)?;
            }
            I::Jump(target) => self.jump(target, num_instructions)?,
            I::Jz(target) => {
                if self.pop("jz")?.is_zero() {
                    self.jump(target, num_instructions)?;
                }
            }
            I::Jnz(target) => {
                if !self.pop("jnz")?.is_zero() {
                    self.jump(target, num_instructions)?;
                }
            }
            I::Call(target) => self.call(target, num_instructions)?,
            I::Ret => self.ret()?,
            I::Alloc => {
                let size = self.pop_size("alloc")?;
                let mem_start = self.frame().mem_start;
                let mem_end = self.reserve_memory(size)?;
                self.frame_mut().mem_end = mem_end;
                log!(self.logger, "alloc {} -> frame memory [{},{})", size, mem_start, mem_end);
            }
            I::Dealloc => {
                let size = self.pop_size("dealloc")?;
                let allocated = self.frame().allocated();
                if size > allocated {
                    return Err(RuntimeErrorKind::InvalidDealloc { requested: size.to_string(), allocated });
                }
                self.frame_mut().mem_end -= size;
            }
            I::Show(level) => {
                let dump = self.show(level);
                if !dump.is_empty() {
                    log!(self.logger, "show {} at {}:\n{}", level, self.ip, dump.trim_end());
                }
            }
            I::Nop => {}
            I::Halt => {
                log!(self.logger, "halt at {}", self.ip);
                self.halted = true;
            }
        }
        Ok(())
    }

    //--------------------------------------------------------------------------
    // Stack primitives
    //--------------------------------------------------------------------------

    fn available(&self) -> usize {
        self.stack.len() - self.frame().floor
    }

    fn require(&self, instruction: &'static str, required: usize) -> StepResult {
        let available = self.available();
        if available < required {
            return Err(RuntimeErrorKind::StackUnderflow { instruction, required, available });
        }
        Ok(())
    }

    fn push(&mut self, value: Value) -> StepResult {
        if let Some(limit) = self.config.max_stack {
            if self.stack.len() >= limit {
                return Err(RuntimeErrorKind::StackOverflow { limit });
            }
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, instruction: &'static str) -> Result<Value, RuntimeErrorKind> {
        self.require(instruction, 1)?;
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(RuntimeErrorKind::StackUnderflow { instruction, required: 1, available: 0 }),
        }
    }

    /// Reads the value `depth` places from the top (1 is the top).
    fn peek(&self, instruction: &'static str, depth: usize) -> Result<Value, RuntimeErrorKind> {
        self.require(instruction, depth)?;
        Ok(self.stack[self.stack.len() - depth])
    }

    /// Pops an operand that has to be a non-negative integer.
    fn pop_size(&mut self, instruction: &'static str) -> Result<usize, RuntimeErrorKind> {
        let value = self.pop(instruction)?;
        let v = match value.as_int() {
            Some(v) => v,
            None => return Err(RuntimeErrorKind::TypeMismatch { instruction, found: value.to_string() }),
        };
        if let Ok(size) = usize::try_from(v) {
            return Ok(size);
        }
        match instruction {
            "alloc" => Err(RuntimeErrorKind::InvalidAlloc { requested: v.to_string() }),
            "dealloc" => Err(RuntimeErrorKind::InvalidDealloc {
                requested: v.to_string(),
                allocated: self.frame().allocated(),
            }),
            _ => Err(RuntimeErrorKind::TypeMismatch { instruction, found: value.to_string() }),
        }
    }

    fn binary(&mut self, instruction: &'static str, op: ArithmeticOp) -> StepResult {
        self.require(instruction, 2)?;
        let rhs = self.pop(instruction)?;
        let lhs = self.pop(instruction)?;
        let result = apply_arithmetic(lhs, op, rhs).map_err(|_| RuntimeErrorKind::DivisionByZero)?;
        self.push(result)
    }

    /// Grows the current frame's window by `size` cells and returns its new
    /// end. Memory beyond the end of a frame may hold stale values.
    fn reserve_memory(&mut self, size: usize) -> Result<usize, RuntimeErrorKind> {
        let invalid = || RuntimeErrorKind::InvalidAlloc { requested: size.to_string() };
        let mem_end = self.frame().mem_end.checked_add(size).ok_or_else(invalid)?;
        if let Some(limit) = self.config.max_memory {
            if mem_end > limit {
                return Err(invalid());
            }
        }
        if self.memory.len() < mem_end {
            self.memory.try_reserve(mem_end - self.memory.len()).map_err(|_| invalid())?;
            self.memory.resize(mem_end, Value::default());
        }
        Ok(mem_end)
    }

    fn check_address(&self, address: usize) -> Result<usize, RuntimeErrorKind> {
        let frame = self.frame();
        // saturates to an address no frame can own
        let absolute = frame.mem_start.saturating_add(address);
        if absolute >= frame.mem_end {
            return Err(RuntimeErrorKind::MemoryOutOfBounds {
                address: absolute,
                mem_start: frame.mem_start,
                mem_end: frame.mem_end,
            });
        }
        Ok(absolute)
    }

    //--------------------------------------------------------------------------
    // Control flow
    //--------------------------------------------------------------------------

    fn jump(&mut self, target: usize, num_instructions: usize) -> StepResult {
        // jumping to one past the end terminates the run
        if target > num_instructions {
            return Err(RuntimeErrorKind::InvalidJumpTarget { target, num_instructions });
        }
        self.ip = target;
        self.ip_changed = true;
        Ok(())
    }

    /// The arguments already on the stack become the bottom of the callee's
    /// stack window.
    fn call(&mut self, target: usize, num_instructions: usize) -> StepResult {
        let num_args = self.pop_size("call")?;
        self.require("call", num_args)?;

        let caller = *self.frame();
        let frame = Frame {
            floor: self.stack.len() - num_args,
            return_ip: self.ip,
            mem_start: caller.mem_end,
            mem_end: caller.mem_end,
        };
        self.frames.push(frame);
        log!(self.logger, "call {} with {} argument(s) at depth {}", target, num_args, self.frames.len() - 1);
        self.jump(target, num_instructions)
    }

    fn ret(&mut self) -> StepResult {
        if self.frames.len() <= 1 {
            return Err(RuntimeErrorKind::ReturnFromRootFrame);
        }
        let value = self.pop("ret")?;
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return Err(RuntimeErrorKind::ReturnFromRootFrame),
        };
        self.stack.truncate(frame.floor);
        self.push(value)?;
        log!(self.logger, "ret {} to {}", value, frame.return_ip + 1);

        self.ip = frame.return_ip + 1;
        self.ip_changed = true;
        Ok(())
    }
}
