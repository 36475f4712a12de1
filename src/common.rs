///////////////////// PRELUDE /////////////////////

pub(crate) use core::fmt::Debug;
pub(crate) use maplit::hashmap;
pub(crate) use std::collections::{HashMap, HashSet};

/// Sink for human-readable log lines, shared by the compiler and the virtual
/// machine. Every call to `line_writer` begins a new line, after which the
/// caller writes the line contents.
pub trait Logger: Debug {
    fn line_writer(&mut self) -> &mut dyn std::fmt::Write;
    fn dump_log(&self, w: &mut dyn std::io::Write);
}

/// Source of fresh numbers, used to keep generated labels unique within one
/// compilation.
#[derive(Debug, Default)]
pub struct U32Stream {
    next: u32,
}

///////////////////// IMPL /////////////////////
impl U32Stream {
    pub(crate) fn next(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.checked_add(1).unwrap_or(u32::MAX);
        id
    }
}
