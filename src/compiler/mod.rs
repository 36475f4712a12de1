pub mod arena;
pub mod ast;
pub mod ast_printer;
pub mod codegen;
pub mod error;
pub mod input_source;
pub mod parser;
pub mod symbol_table;
pub mod tokenizer;
pub mod tokens;

#[cfg(test)]
mod tests;

use std::path::Path;

use crate::common::*;
use crate::vm::logging::DummyLogger;
use self::codegen::{CodeGenerator, Listing};
use self::error::CompileError;
use self::input_source::{strip_comments, InputSource};
use self::parser::{ParsedProgram, Parser};
use self::tokenizer::Tokenizer;
use self::tokens::Token;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompileConfig {
    pub comment_marker: String,
    // type name and size in memory slots, declared in the global scope
    pub builtin_types: Vec<(String, u32)>,
    // bound on nested blocks and expressions
    pub max_nesting: usize,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            comment_marker: String::from("//"),
            builtin_types: vec![(String::from("int"), 1), (String::from("float"), 1)],
            max_nesting: 128,
        }
    }
}

/// Runs the front end: comment stripping, tokenizing, parsing with name
/// resolution and code generation.
#[derive(Debug)]
pub struct Compiler {
    config: CompileConfig,
    logger: Box<dyn Logger>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileConfig::default())
    }
}

impl Compiler {
    pub fn new(config: CompileConfig) -> Self {
        Self::with_logger(config, Box::new(DummyLogger::new()))
    }

    pub fn with_logger(config: CompileConfig, logger: Box<dyn Logger>) -> Self {
        Self { config, logger }
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    pub fn logger(&self) -> &dyn Logger {
        &*self.logger
    }

    /// Compiles source text into a listing. The first error aborts.
    pub fn compile(&mut self, source: &str) -> Result<Listing, CompileError> {
        let parsed = self.parse(source)?;
        Ok(self.generate(&parsed))
    }

    /// Compiles a source file. Error reports name the file.
    pub fn compile_file(&mut self, path: &Path) -> Result<Listing, crate::Error> {
        let source = InputSource::from_file(path)?;
        let text = String::from_utf8_lossy(&source.input).to_string();
        log!(self.logger, "Compiling {}", source.filename);
        let parsed = self.parse_named(&source.filename, &text)?;
        Ok(self.generate(&parsed))
    }

    /// Parses source text into a resolved tree without generating code.
    pub fn parse(&mut self, source: &str) -> Result<ParsedProgram, CompileError> {
        self.parse_named("", source)
    }

    fn parse_named(&mut self, filename: &str, source: &str) -> Result<ParsedProgram, CompileError> {
        let text = strip_comments(source, &self.config.comment_marker);
        let mut input = InputSource::from_named_string(filename, &text);
        let tokens = Tokenizer::new(&mut input).tokenize().map_err(CompileError::from_lexical)?;
        log!(self.logger, "Tokenized {} token(s)", tokens.len());

        let parser = Parser::new(&tokens, Some(&input), &self.config.builtin_types, self.config.max_nesting);
        let parsed = parser.parse()?;
        log!(self.logger, "Parsed program with {} scope(s)", parsed.symbols.num_scopes());
        Ok(parsed)
    }

    /// Compiles an already tokenized program. Errors carry positions but no
    /// rendered source.
    pub fn compile_tokens(&mut self, tokens: &[Token]) -> Result<Listing, CompileError> {
        let parser = Parser::new(tokens, None, &self.config.builtin_types, self.config.max_nesting);
        let parsed = parser.parse()?;
        Ok(self.generate(&parsed))
    }

    fn generate(&mut self, parsed: &ParsedProgram) -> Listing {
        let listing = CodeGenerator::new().generate(&parsed.root);
        log!(self.logger, "Generated {} statement(s)", listing.len());
        listing
    }
}
