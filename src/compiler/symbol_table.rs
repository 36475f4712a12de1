/// symbol_table.rs
///
/// Chained scope tables used to resolve names while parsing. Each lexical
/// block (and each function parameter list) owns one `ScopeTable`; the tables
/// live in an arena and refer to their parent through an id, so resolution
/// walks outwards without the tables borrowing each other.

use std::collections::hash_map::Entry;
use std::fmt;

use crate::common::*;
use super::arena::{Arena, Id};

pub type ScopeId = Id<ScopeTable>;

/// A primitive type descriptor. `size` is measured in memory slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSymbol {
    pub name: String,
    pub size: u32,
}

/// A variable or parameter. The address is frame-relative and is set by the
/// block (or function) that declares the variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSymbol {
    pub name: String,
    pub var_type: TypeSymbol,
    pub address: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSymbol {
    pub name: String,
    pub return_type: TypeSymbol,
    pub params: Vec<(TypeSymbol, String)>,
    pub label: String,
    pub params_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolClass {
    Type,
    Variable,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Type(TypeSymbol),
    Variable(VariableSymbol),
    Function(FunctionSymbol),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Type(s) => &s.name,
            Symbol::Variable(s) => &s.name,
            Symbol::Function(s) => &s.name,
        }
    }
    pub fn symbol_class(&self) -> SymbolClass {
        match self {
            Symbol::Type(_) => SymbolClass::Type,
            Symbol::Variable(_) => SymbolClass::Variable,
            Symbol::Function(_) => SymbolClass::Function,
        }
    }
    pub fn as_type(&self) -> Option<&TypeSymbol> {
        match self {
            Symbol::Type(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_variable(&self) -> Option<&VariableSymbol> {
        match self {
            Symbol::Variable(s) => Some(s),
            _ => None,
        }
    }
}

impl FunctionSymbol {
    pub fn new(name: &str, return_type: TypeSymbol, params: Vec<(TypeSymbol, String)>, label: String) -> Self {
        let params_size = params.iter().map(|(t, _)| t.size).sum();
        Self { name: name.to_string(), return_type, params, label, params_size }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Type(s) => write!(f, "Type <{}> of size {}", s.name, s.size),
            Symbol::Variable(s) => {
                write!(f, "Variable <{}> of type <{}>", s.name, s.var_type.name)?;
                match s.address {
                    Some(address) => write!(f, " at {}", address),
                    None => write!(f, " (unplaced)"),
                }
            }
            Symbol::Function(s) => {
                write!(f, "Function {} {}(", s.return_type.name, s.name)?;
                for (idx, (t, name)) in s.params.iter().enumerate() {
                    if idx != 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{} {}", t.name, name)?;
                }
                write!(f, ") -> {}", s.label)
            }
        }
    }
}

/// Returned by `declare` when the name already exists at that level. Carries
/// back the rejected symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSymbol(pub Symbol);

/// Symbols declared in one lexical block.
#[derive(Debug)]
pub struct ScopeTable {
    pub this: ScopeId,
    pub parent: Option<ScopeId>,
    // call frame whose memory holds this scope's variables
    pub frame: u32,
    symbols: HashMap<String, Symbol>,
}

impl ScopeTable {
    /// Declares a symbol at this level only. Shadowing names of a parent scope
    /// is allowed.
    pub fn declare(&mut self, symbol: Symbol) -> Result<(), DuplicateSymbol> {
        match self.symbols.entry(symbol.name().to_string()) {
            Entry::Occupied(_) => Err(DuplicateSymbol(symbol)),
            Entry::Vacant(v) => {
                v.insert(symbol);
                Ok(())
            }
        }
    }

    pub fn get_local(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// Owner of all scope tables created during one compilation.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Arena<ScopeTable>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { scopes: Arena::new() }
    }

    /// Creates a new, empty scope chained to `parent`.
    pub fn insert_scope(&mut self, parent: Option<ScopeId>, frame: u32) -> ScopeId {
        debug_assert!(
            parent.map_or(true, |p| p.index() < self.scopes.len()),
            "inserting scope with parent {:?} that does not exist", parent
        );
        self.scopes.alloc_with_id(|this| ScopeTable { this, parent, frame, symbols: HashMap::new() })
    }

    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> Result<(), DuplicateSymbol> {
        self.scopes[scope].declare(symbol)
    }

    /// Resolves a name by walking the scope chain outwards, starting at
    /// `scope`.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut seek_scope = Some(scope);
        while let Some(scope) = seek_scope {
            let table = &self.scopes[scope];
            if let Some(symbol) = table.get_local(name) {
                return Some(symbol);
            }
            seek_scope = table.parent;
        }
        None
    }

    pub fn get_scope(&self, scope: ScopeId) -> &ScopeTable {
        &self.scopes[scope]
    }

    pub fn num_scopes(&self) -> usize {
        self.scopes.len()
    }

    /// Lists the symbols visible from `scope`, innermost level first. Symbols
    /// within one level are sorted by name.
    pub fn show(&self, scope: ScopeId) -> String {
        let mut out = String::new();
        let mut prefix = String::new();
        let mut seek_scope = Some(scope);
        while let Some(scope) = seek_scope {
            let table = &self.scopes[scope];
            let mut symbols: Vec<&Symbol> = table.symbols().collect();
            symbols.sort_by(|a, b| a.name().cmp(b.name()));
            for symbol in symbols {
                out.push_str(&format!("{}{}\n", prefix, symbol));
            }
            seek_scope = table.parent;
            if seek_scope.is_some() {
                out.push_str(&format!("{}Parent:\n", prefix));
                prefix.push(' ');
            }
        }
        out
    }
}
