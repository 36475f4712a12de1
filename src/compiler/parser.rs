/// parser.rs
///
/// Recursive-descent parser. Builds the AST and resolves every identifier
/// against the chain of scope tables at the point of use; there is no
/// separate semantic pass. Frame-relative addresses of variables and
/// parameters are assigned here as well, so that the code generator only has
/// to read them.
///
/// Enclosing loops and functions are tracked with an explicit context stack,
/// which is what `continue`, `break` and `return` are checked against.

use crate::common::*;
use super::ast::*;
use super::error::*;
use super::input_source::*;
use super::symbol_table::*;
use super::tokens::*;

/// A lexical construct that `continue`/`break`/`return` may refer to.
enum ControlContext {
    Loop { cond_label: String, after_label: String, body_offset: u32 },
    Function,
}

/// Result of a successful parse: the program block plus the scope tables it
/// refers to.
#[derive(Debug)]
pub struct ParsedProgram {
    pub root: Node,
    pub symbols: SymbolTable,
    pub global_scope: ScopeId,
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
    source: Option<&'a InputSource>,
    symbols: SymbolTable,
    global_scope: ScopeId,
    scope: ScopeId,
    // frame the current scope belongs to, variables of other frames are not
    // addressable from here
    frame: u32,
    num_frames: u32,
    // next free frame-relative address
    offset: u32,
    contexts: Vec<ControlContext>,
    label_ids: U32Stream,
    function_labels: HashSet<String>,
    level: usize,
    max_level: usize,
}

impl<'a> Parser<'a> {
    /// Prepares a parser over a token stream. The builtin types are declared
    /// in the global scope. If `source` is given, errors carry a rendering of
    /// the offending line.
    pub fn new(tokens: &'a [Token], source: Option<&'a InputSource>, builtin_types: &[(String, u32)], max_level: usize) -> Self {
        let mut symbols = SymbolTable::new();
        let global_scope = symbols.insert_scope(None, 0);
        for (name, size) in builtin_types {
            // duplicates in the configuration are harmless, the first one wins
            let _ = symbols.declare(global_scope, Symbol::Type(TypeSymbol { name: name.clone(), size: *size }));
        }

        Parser {
            tokens,
            idx: 0,
            source,
            symbols,
            global_scope,
            scope: global_scope,
            frame: 0,
            num_frames: 1,
            offset: 0,
            contexts: Vec::new(),
            label_ids: U32Stream::default(),
            function_labels: HashSet::new(),
            level: 0,
            max_level,
        }
    }

    pub fn parse(mut self) -> Result<ParsedProgram, CompileError> {
        let root = self.consume_code_block()?;
        if self.idx < self.tokens.len() {
            return Err(self.unexpected_token());
        }
        Ok(ParsedProgram { root, symbols: self.symbols, global_scope: self.global_scope })
    }

    //--------------------------------------------------------------------------
    // Token handling
    //--------------------------------------------------------------------------

    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.idx)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn lookahead_kind(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.idx + n).map(|t| t.kind)
    }

    fn has(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn current_pos(&self) -> Option<InputPosition> {
        match self.current() {
            Some(token) => Some(token.pos),
            None => self.tokens.last().map(|t| t.pos),
        }
    }

    fn advance(&mut self) {
        if self.idx < self.tokens.len() {
            self.idx += 1;
        }
    }

    /// Consumes a token of the expected kind, or fails with an unexpected
    /// token error at the current position.
    fn consume(&mut self, expected: TokenKind) -> Result<&'a Token, CompileError> {
        match self.current() {
            Some(token) if token.kind == expected => {
                self.advance();
                Ok(token)
            }
            _ => {
                let mut err = self.unexpected_token();
                if let (Some(source), Some(position)) = (self.source, err.position) {
                    let hint = format!("expected '{}' here", expected.token_chars());
                    err.report = err.report.with_info(source, position, &hint);
                }
                Err(err)
            }
        }
    }

    /// Consumes the token if it is of the given kind.
    fn consume_if(&mut self, kind: TokenKind) -> bool {
        if self.has(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_ident(&mut self) -> Result<&'a Token, CompileError> {
        self.consume(TokenKind::Ident)
    }

    //--------------------------------------------------------------------------
    // Errors
    //--------------------------------------------------------------------------

    fn error_at(&self, kind: CompileErrorKind, pos: Option<InputPosition>) -> CompileError {
        CompileError::new(kind, pos, self.source)
    }

    /// Reserves room for a value of `var_type` in the current frame and
    /// returns its address.
    fn place(&mut self, var_type: &TypeSymbol, name: &Token) -> Result<u32, CompileError> {
        let address = self.offset;
        match address.checked_add(var_type.size) {
            Some(end) => {
                self.offset = end;
                Ok(address)
            }
            None => Err(self.error_at(CompileErrorKind::FrameTooLarge(name.lexeme.clone()), Some(name.pos))),
        }
    }

    fn unexpected_token(&self) -> CompileError {
        let found = match self.current() {
            Some(token) => token.lexeme.clone(),
            None => String::from("<eof>"),
        };
        self.error_at(CompileErrorKind::UnexpectedToken { found, index: self.idx }, self.current_pos())
    }

    fn enter_level(&mut self) -> Result<(), CompileError> {
        if self.level >= self.max_level {
            return Err(self.error_at(CompileErrorKind::NestingTooDeep, self.current_pos()));
        }
        self.level += 1;
        Ok(())
    }

    //--------------------------------------------------------------------------
    // Scopes and symbols
    //--------------------------------------------------------------------------

    fn mint_label_id(&mut self) -> u32 {
        self.label_ids.next()
    }

    fn function_label(&mut self, name: &str) -> String {
        let mut label = format!("func_{}", name);
        while self.function_labels.contains(&label) {
            label = format!("func_{}_{}", name, self.mint_label_id());
        }
        self.function_labels.insert(label.clone());
        label
    }

    fn declare(&mut self, scope: ScopeId, symbol: Symbol, pos: InputPosition) -> Result<(), CompileError> {
        match self.symbols.declare(scope, symbol) {
            Ok(()) => Ok(()),
            Err(DuplicateSymbol(symbol)) => {
                Err(self.error_at(CompileErrorKind::Redefinition(symbol.name().to_string()), Some(pos)))
            }
        }
    }

    /// Names introduced by a declaration must not exist at the current level.
    fn check_absent(&self, scope: ScopeId, token: &Token) -> Result<(), CompileError> {
        if self.symbols.get_scope(scope).get_local(&token.lexeme).is_some() {
            return Err(self.error_at(CompileErrorKind::Redefinition(token.lexeme.clone()), Some(token.pos)));
        }
        Ok(())
    }

    /// Consumes an identifier that must name a type.
    fn consume_type(&mut self) -> Result<TypeSymbol, CompileError> {
        let token = self.consume_ident()?;
        match self.symbols.resolve(self.scope, &token.lexeme).and_then(|s| s.as_type()) {
            Some(type_symbol) => Ok(type_symbol.clone()),
            None => Err(self.error_at(CompileErrorKind::UndeclaredType(token.lexeme.clone()), Some(token.pos))),
        }
    }

    fn resolve_variable(&self, token: &Token) -> Result<VariableSymbol, CompileError> {
        let mut seek_scope = Some(self.scope);
        while let Some(scope) = seek_scope {
            let table = self.symbols.get_scope(scope);
            if let Some(symbol) = table.get_local(&token.lexeme) {
                return match symbol {
                    Symbol::Variable(variable) if table.frame == self.frame => Ok(variable.clone()),
                    Symbol::Variable(_) => Err(self.error_at(
                        CompileErrorKind::VariableOutsideFrame(token.lexeme.clone()), Some(token.pos)
                    )),
                    _ => Err(self.error_at(CompileErrorKind::NotAVariable(token.lexeme.clone()), Some(token.pos))),
                };
            }
            seek_scope = table.parent;
        }
        Err(self.error_at(CompileErrorKind::UndeclaredIdentifier(token.lexeme.clone()), Some(token.pos)))
    }

    fn resolve_function(&self, token: &Token) -> Result<FunctionSymbol, CompileError> {
        match self.symbols.resolve(self.scope, &token.lexeme) {
            Some(Symbol::Function(function)) => Ok(function.clone()),
            Some(_) => Err(self.error_at(CompileErrorKind::NotAFunction(token.lexeme.clone()), Some(token.pos))),
            None => Err(self.error_at(CompileErrorKind::UndeclaredIdentifier(token.lexeme.clone()), Some(token.pos))),
        }
    }

    //--------------------------------------------------------------------------
    // Statements
    //--------------------------------------------------------------------------

    fn consume_code_block(&mut self) -> Result<Node, CompileError> {
        self.enter_level()?;
        let position = self.consume(TokenKind::OpenCurly)?.pos;

        let parent_scope = self.scope;
        let scope = self.symbols.insert_scope(Some(parent_scope), self.frame);
        self.scope = scope;
        let base_offset = self.offset;

        let mut statements = Vec::new();
        let result = loop {
            if self.has(TokenKind::CloseCurly) {
                self.advance();
                break Ok(());
            }
            match self.consume_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) => break Err(err),
            }
        };

        let total_size = self.offset - base_offset;
        self.scope = parent_scope;
        self.offset = base_offset;
        self.level -= 1;
        result?;

        Ok(Node::CodeBlock(CodeBlockNode { position, scope, base_offset, total_size, statements }))
    }

    fn consume_statement(&mut self) -> Result<Node, CompileError> {
        use TokenKind as TK;
        let kind = match self.current_kind() {
            Some(kind) => kind,
            None => return Err(self.unexpected_token()),
        };

        match kind {
            TK::Var => {
                let declaration = self.consume_declaration()?;
                self.consume(TK::SemiColon)?;
                Ok(declaration)
            }
            TK::Func => self.consume_function_definition(),
            TK::Return => self.consume_return_statement(),
            TK::Ident | TK::OpenParen | TK::Number => {
                let expression = self.consume_expression()?;
                self.consume(TK::SemiColon)?;
                Ok(expression)
            }
            TK::If => self.consume_if_statement(),
            TK::While => self.consume_while_statement(),
            TK::Continue | TK::Break => {
                let statement = self.consume_loop_jump(kind)?;
                self.consume(TK::SemiColon)?;
                Ok(statement)
            }
            TK::Entry => {
                let position = self.consume(TK::Entry)?.pos;
                Ok(Node::EntryPoint(EntryPointNode { position }))
            }
            TK::OpenCurly => self.consume_code_block(),
            _ => Err(self.unexpected_token()),
        }
    }

    fn consume_declaration(&mut self) -> Result<Node, CompileError> {
        let position = self.consume(TokenKind::Var)?.pos;
        let type_symbol = self.consume_type()?;
        let name = self.consume_ident()?;
        self.check_absent(self.scope, name)?;

        // The initializer is parsed before the variable is visible, so that
        // `var int x = x;` does not read its own uninitialized slot.
        let initializer = if self.consume_if(TokenKind::Equal) {
            Some(Box::new(self.consume_expression()?))
        } else {
            None
        };

        let variable = VariableSymbol {
            name: name.lexeme.clone(),
            var_type: type_symbol.clone(),
            address: Some(self.place(&type_symbol, name)?),
        };
        self.declare(self.scope, Symbol::Variable(variable.clone()), name.pos)?;

        Ok(Node::Declaration(DeclarationNode { position, type_symbol, variable, initializer }))
    }

    fn consume_function_definition(&mut self) -> Result<Node, CompileError> {
        let position = self.consume(TokenKind::Func)?.pos;
        let return_type = self.consume_type()?;
        let name = self.consume_ident()?;
        let outer_scope = self.scope;
        self.check_absent(outer_scope, name)?;

        // Parameters live in a dedicated frame scope, addressed from 0
        let outer_frame = self.frame;
        let outer_offset = self.offset;
        let frame = self.num_frames;
        self.num_frames += 1;
        let frame_scope = self.symbols.insert_scope(Some(outer_scope), frame);

        let result = self.consume_function_rest(position, return_type, name, frame_scope, frame);

        self.scope = outer_scope;
        self.frame = outer_frame;
        self.offset = outer_offset;
        result
    }

    fn consume_function_rest(
        &mut self, position: InputPosition, return_type: TypeSymbol, name: &'a Token,
        frame_scope: ScopeId, frame: u32,
    ) -> Result<Node, CompileError> {
        self.scope = frame_scope;
        self.frame = frame;
        self.offset = 0;

        self.consume(TokenKind::OpenParen)?;
        let mut params = Vec::new();
        let mut typed_params = Vec::new();
        if !self.has(TokenKind::CloseParen) {
            loop {
                let param_type = self.consume_type()?;
                let param_name = self.consume_ident()?;
                let variable = VariableSymbol {
                    name: param_name.lexeme.clone(),
                    var_type: param_type.clone(),
                    address: Some(self.place(&param_type, param_name)?),
                };
                self.declare(frame_scope, Symbol::Variable(variable.clone()), param_name.pos)?;
                typed_params.push((param_type, param_name.lexeme.clone()));
                params.push(variable);

                if !self.consume_if(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::CloseParen)?;

        // Declared before the body is parsed to allow recursion
        let label = self.function_label(&name.lexeme);
        let function = FunctionSymbol::new(&name.lexeme, return_type, typed_params, label);
        let outer_scope = self.symbols.get_scope(frame_scope).parent.unwrap_or(self.global_scope);
        self.declare(outer_scope, Symbol::Function(function.clone()), name.pos)?;

        self.contexts.push(ControlContext::Function);
        let body = self.consume_code_block();
        self.contexts.pop();
        let body = Box::new(body?);

        Ok(Node::FunctionDefinition(FunctionDefinitionNode { position, function, params, scope: frame_scope, body }))
    }

    fn consume_return_statement(&mut self) -> Result<Node, CompileError> {
        let position = self.consume(TokenKind::Return)?.pos;
        let inside_function = self.contexts.iter().any(|c| matches!(c, ControlContext::Function));
        if !inside_function {
            return Err(self.error_at(CompileErrorKind::InvalidReturn, Some(position)));
        }
        let value = Box::new(self.consume_expression()?);
        self.consume(TokenKind::SemiColon)?;
        Ok(Node::Return(ReturnNode { position, value }))
    }

    fn consume_paren_expression(&mut self) -> Result<Node, CompileError> {
        self.consume(TokenKind::OpenParen)?;
        let expression = self.consume_expression()?;
        self.consume(TokenKind::CloseParen)?;
        Ok(expression)
    }

    fn consume_if_statement(&mut self) -> Result<Node, CompileError> {
        let position = self.consume(TokenKind::If)?.pos;
        let after_label = format!("_if{}", self.mint_label_id());
        let condition = Box::new(self.consume_paren_expression()?);
        let body = Box::new(self.consume_code_block()?);
        Ok(Node::If(IfNode { position, condition, body, after_label }))
    }

    fn consume_while_statement(&mut self) -> Result<Node, CompileError> {
        let position = self.consume(TokenKind::While)?.pos;
        let label_id = self.mint_label_id();
        let cond_label = format!("_while_cond{}", label_id);
        let after_label = format!("_while_after{}", label_id);
        let condition = Box::new(self.consume_paren_expression()?);

        self.contexts.push(ControlContext::Loop {
            cond_label: cond_label.clone(),
            after_label: after_label.clone(),
            body_offset: self.offset,
        });
        let body = self.consume_code_block();
        self.contexts.pop();
        let body = Box::new(body?);

        Ok(Node::While(WhileNode { position, condition, body, cond_label, after_label }))
    }

    fn consume_loop_jump(&mut self, kind: TokenKind) -> Result<Node, CompileError> {
        let position = self.consume(kind)?.pos;
        let is_continue = kind == TokenKind::Continue;

        // Loops outside the innermost function are not reachable
        let target = match self.contexts.last() {
            Some(ControlContext::Loop { cond_label, after_label, body_offset }) => {
                let label = if is_continue { cond_label } else { after_label };
                Some((label.clone(), *body_offset))
            }
            _ => None,
        };
        let (target_label, body_offset) = match target {
            Some(target) => target,
            None => {
                let statement = if is_continue { "continue" } else { "break" };
                return Err(self.error_at(CompileErrorKind::LoopError { statement }, Some(position)));
            }
        };

        let node = JumpNode { position, target_label, release: self.offset - body_offset };
        Ok(if is_continue { Node::Continue(node) } else { Node::Break(node) })
    }

    //--------------------------------------------------------------------------
    // Expressions
    //--------------------------------------------------------------------------

    fn consume_expression(&mut self) -> Result<Node, CompileError> {
        self.enter_level()?;
        let result = self.consume_assignment_expression();
        self.level -= 1;
        result
    }

    fn consume_assignment_expression(&mut self) -> Result<Node, CompileError> {
        let left = self.consume_comparison_expression()?;
        if !self.has(TokenKind::Equal) {
            return Ok(left);
        }

        let position = self.consume(TokenKind::Equal)?.pos;
        if !matches!(left, Node::Identifier(_)) {
            return Err(self.error_at(CompileErrorKind::InvalidAssignmentTarget, Some(left.position())));
        }
        let right = self.consume_expression()?;
        Ok(Node::Expression(ExpressionNode {
            position,
            operation: ExpressionOperator::Assign,
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    fn consume_comparison_expression(&mut self) -> Result<Node, CompileError> {
        let mut result = self.consume_additive_expression()?;
        loop {
            let operation = match self.current_kind() {
                Some(TokenKind::OpenAngle) => BinaryOperator::LessThan,
                Some(TokenKind::CloseAngle) => BinaryOperator::GreaterThan,
                Some(TokenKind::EqualEqual) => BinaryOperator::Equality,
                Some(TokenKind::NotEqual) => BinaryOperator::Inequality,
                _ => break,
            };
            result = self.consume_binary_rest(result, operation, Self::consume_additive_expression)?;
        }
        Ok(result)
    }

    fn consume_additive_expression(&mut self) -> Result<Node, CompileError> {
        let mut result = self.consume_multiplicative_expression()?;
        loop {
            let operation = match self.current_kind() {
                Some(TokenKind::Plus) => BinaryOperator::Add,
                Some(TokenKind::Minus) => BinaryOperator::Subtract,
                _ => break,
            };
            result = self.consume_binary_rest(result, operation, Self::consume_multiplicative_expression)?;
        }
        Ok(result)
    }

    fn consume_multiplicative_expression(&mut self) -> Result<Node, CompileError> {
        let mut result = self.consume_postfix_expression()?;
        loop {
            let operation = match self.current_kind() {
                Some(TokenKind::Star) => BinaryOperator::Multiply,
                Some(TokenKind::Slash) => BinaryOperator::Divide,
                _ => break,
            };
            result = self.consume_binary_rest(result, operation, Self::consume_postfix_expression)?;
        }
        Ok(result)
    }

    /// Consumes the operator token and the right operand, folding them onto
    /// `left`. Repeated application yields a left-leaning tree.
    fn consume_binary_rest(
        &mut self, left: Node, operation: BinaryOperator,
        consume_operand: fn(&mut Self) -> Result<Node, CompileError>,
    ) -> Result<Node, CompileError> {
        let position = self.current_pos().unwrap_or_default();
        self.advance();
        let right = consume_operand(self)?;
        Ok(Node::Expression(ExpressionNode {
            position,
            operation: ExpressionOperator::Binary(operation),
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    fn consume_postfix_expression(&mut self) -> Result<Node, CompileError> {
        let result = self.consume_primary_expression()?;
        if self.has(TokenKind::OpenSquare) {
            return Err(self.error_at(CompileErrorKind::ArraySubscriptUnsupported, self.current_pos()));
        }
        Ok(result)
    }

    fn consume_primary_expression(&mut self) -> Result<Node, CompileError> {
        match self.current_kind() {
            Some(TokenKind::Number) => {
                let token = self.consume(TokenKind::Number)?;
                match token.value {
                    Some(value) => Ok(Node::NumberLiteral(NumberLiteralNode { position: token.pos, value })),
                    None => Err(self.error_at(CompileErrorKind::Lexical, Some(token.pos))),
                }
            }
            Some(TokenKind::Ident) if self.lookahead_kind(1) == Some(TokenKind::OpenParen) => {
                self.consume_function_call()
            }
            Some(TokenKind::Ident) => {
                let token = self.consume_ident()?;
                let symbol = self.resolve_variable(token)?;
                Ok(Node::Identifier(IdentifierNode { position: token.pos, name: token.lexeme.clone(), symbol }))
            }
            _ => self.consume_paren_expression(),
        }
    }

    fn consume_function_call(&mut self) -> Result<Node, CompileError> {
        let token = self.consume_ident()?;
        let function = self.resolve_function(token)?;

        self.consume(TokenKind::OpenParen)?;
        let mut arguments = Vec::new();
        if !self.has(TokenKind::CloseParen) {
            loop {
                arguments.push(self.consume_expression()?);
                if !self.consume_if(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::CloseParen)?;

        if arguments.len() != function.params.len() {
            return Err(self.error_at(
                CompileErrorKind::ArityMismatch {
                    function: function.name.clone(),
                    expected: function.params.len(),
                    found: arguments.len(),
                },
                Some(token.pos),
            ));
        }

        Ok(Node::FunctionCall(FunctionCallNode { position: token.pos, name: token.lexeme.clone(), function, arguments }))
    }
}
