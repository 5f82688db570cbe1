use solz_ast::*;
use solz_lexer::{File, Pos, Scanner, SpannedToken, Token};
use thiserror::Error;
use tracing::{debug, trace};

/// Fatal grammar violation; no partial program is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {pos}")]
pub struct ParseError {
    pub message: String,
    pub token: Token,
    pub literal: String,
    pub pos: Pos,
}

impl ParseError {
    fn at(message: impl Into<String>, found: &SpannedToken) -> Self {
        Self {
            message: message.into(),
            token: found.token,
            literal: found.literal.clone(),
            pos: found.pos,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser over a lazily scanned token stream.
///
/// Only the part of the document that was actually scanned ends up in the
/// position index.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: SpannedToken,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, file: &'a mut File) -> Self {
        let mut scanner = Scanner::new(source, file);
        let current = scanner.scan();
        Self { scanner, current }
    }

    pub fn parse(source: &str, file: &mut File) -> ParseResult<Program> {
        Parser::new(source, file).parse_program()
    }

    // === Token Access ===

    fn peek(&self) -> Token {
        self.current.token
    }

    fn check(&self, token: Token) -> bool {
        self.current.token == token
    }

    fn is_keyword(&self, word: &str) -> bool {
        self.check(Token::Ident) && self.current.literal == word
    }

    fn advance(&mut self) -> SpannedToken {
        let next = self.scanner.scan();
        std::mem::replace(&mut self.current, next)
    }

    fn found(&self) -> String {
        match self.peek() {
            Token::Eof => "end of input".to_string(),
            token => format!("{} '{}'", token, self.current.literal),
        }
    }

    fn expect(&mut self, expected: Token) -> ParseResult<SpannedToken> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(ParseError::at(
                format!("expected '{}', found {}", expected, self.found()),
                &self.current,
            ))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<Ident> {
        let tok = self.expect(Token::Ident)?;
        Ok(Ident::new(tok.literal, tok.pos))
    }

    // === Top Level ===

    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut program = Program::default();

        loop {
            match self.peek() {
                Token::Eof => break,
                Token::Ident if self.current.literal == "pragma" => {
                    program.pragma = Some(self.parse_pragma()?);
                }
                Token::Ident if self.current.literal == "import" => {
                    program.imports.push(self.parse_import()?);
                }
                Token::Ident if self.current.literal == "contract" => {
                    program.contracts.push(self.parse_contract()?);
                }
                // Anything else at top level is outside the supported grammar
                _ => {
                    self.advance();
                }
            }
        }

        Ok(program)
    }

    fn parse_pragma(&mut self) -> ParseResult<PragmaDirective> {
        self.advance(); // pragma
        let name = self.expect_ident()?;

        let mut value = String::new();
        while !self.check(Token::Semicolon) {
            if self.check(Token::Eof) {
                return Err(ParseError::at(
                    format!("unterminated pragma '{}'", name.name),
                    &self.current,
                ));
            }
            value.push_str(&self.advance().literal);
        }
        self.advance(); // ;

        trace!(name = %name.name, %value, "pragma");
        Ok(PragmaDirective { name, value })
    }

    fn parse_import(&mut self) -> ParseResult<ImportDirective> {
        self.advance(); // import
        if self.check(Token::Eof) {
            return Err(ParseError::at("expected import path, found end of input", &self.current));
        }
        let path = self.advance().literal;

        trace!(%path, "import");
        Ok(ImportDirective { path })
    }

    // === Contracts ===

    fn parse_contract(&mut self) -> ParseResult<ContractPart> {
        self.advance(); // contract
        let name = self.expect_ident()?;

        let mut inherits = Vec::new();
        if self.is_keyword("is") {
            self.advance();
            loop {
                inherits.push(self.expect_ident()?);
                if !self.check(Token::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(Token::LBrace)?;

        let mut contract = ContractPart {
            name,
            inherits,
            state_variables: Vec::new(),
            functions: Vec::new(),
        };

        loop {
            match self.peek() {
                // Incomplete documents keep whatever was parsed so far
                Token::Eof => break,
                Token::RBrace => {
                    self.advance();
                    break;
                }
                Token::Ident if matches!(self.current.literal.as_str(), "constructor" | "function") => {
                    contract.functions.push(self.parse_function()?);
                }
                Token::Ident => {
                    contract.state_variables.push(self.parse_state_variable()?);
                }
                _ => {
                    self.advance();
                }
            }
        }

        debug!(
            contract = %contract.name.name,
            inherits = contract.inherits.len(),
            state_variables = contract.state_variables.len(),
            functions = contract.functions.len(),
            "parsed contract"
        );
        Ok(contract)
    }

    fn parse_state_variable(&mut self) -> ParseResult<StateVariableDeclaration> {
        let ty = self.expect_ident()?;
        let mut visibility = None;
        let mut is_constant = false;

        let name = loop {
            match self.peek() {
                Token::Eof => {
                    return Err(ParseError::at(
                        format!("unterminated declaration of type '{}'", ty.name),
                        &self.current,
                    ));
                }
                Token::Ident if self.current.literal == "constant" => {
                    is_constant = true;
                    self.advance();
                }
                Token::Ident => {
                    if let Some(v) = Visibility::from_keyword(&self.current.literal) {
                        visibility = Some(v);
                        self.advance();
                    } else {
                        break self.expect_ident()?;
                    }
                }
                _ => {
                    self.advance();
                }
            }
        };

        self.expect(Token::Assign)?;
        let rhs = self.parse_expr()?;
        self.expect(Token::Semicolon)?;

        Ok(StateVariableDeclaration {
            ty,
            visibility,
            is_constant,
            name,
            rhs,
        })
    }

    fn parse_function(&mut self) -> ParseResult<FunctionDefinition> {
        // A constructor is named by its own keyword
        if !self.is_keyword("constructor") {
            self.advance(); // function
        }
        let name = self.expect_ident()?;

        // Parameter lists are not supported
        self.expect(Token::LParen)?;
        self.expect(Token::RParen)?;

        let visibility = match Visibility::from_keyword(&self.current.literal) {
            Some(v) if self.check(Token::Ident) => {
                self.advance();
                v
            }
            _ => Visibility::Public,
        };
        self.expect(Token::LBrace)?;

        let mut body = Vec::new();
        loop {
            match self.peek() {
                Token::Eof => break,
                Token::RBrace => {
                    self.advance();
                    break;
                }
                Token::Semicolon => {
                    self.advance();
                }
                _ => {
                    body.push(self.parse_expr()?);
                    // `emit Transfer(..)` and `return x` leave one entry per expression
                    while !matches!(self.peek(), Token::Semicolon | Token::RBrace | Token::Eof) {
                        body.push(self.parse_expr()?);
                    }
                    self.expect(Token::Semicolon)?;
                }
            }
        }

        trace!(function = %name.name, statements = body.len(), "parsed function");
        Ok(FunctionDefinition {
            name,
            visibility,
            body,
        })
    }

    // === Expressions ===

    /// Binary expression. Every operator binds equally and groups to the right,
    /// so `a = b + c * d` is `a = (b + (c * d))` and `a * b + c` is `a * (b + c)`.
    fn parse_expr(&mut self) -> ParseResult<Expr> {
        let left = self.parse_primary()?;

        let op = match self.peek() {
            Token::Assign => BinOp::Assign,
            Token::Add => BinOp::Add,
            Token::Mul => BinOp::Mul,
            Token::Pow => BinOp::Pow,
            _ => return Ok(left),
        };
        let op_pos = self.advance().pos;
        let right = self.parse_expr()?;

        Ok(Expr::Binary(BinaryExpr {
            left: Box::new(left),
            op,
            op_pos,
            right: Box::new(right),
        }))
    }

    /// Operand with at most one selector, call or index suffix
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let operand = self.parse_operand()?;

        match self.peek() {
            Token::Period => {
                self.advance();
                let member = self.expect_ident()?;
                Ok(Expr::Selector(SelectorExpr {
                    base: Box::new(operand),
                    member,
                }))
            }
            Token::LParen => {
                let lparen = self.advance().pos;
                let mut args = Vec::new();
                while !self.check(Token::RParen) && !self.check(Token::Eof) {
                    if self.check(Token::Comma) {
                        self.advance();
                        continue;
                    }
                    args.push(self.parse_primary()?);
                }
                let rparen = self.expect(Token::RParen)?.pos;
                Ok(Expr::Call(CallExpr {
                    callee: Box::new(operand),
                    args,
                    lparen,
                    rparen,
                }))
            }
            Token::LBrack => {
                self.advance();
                let index = self.parse_expr()?;
                self.expect(Token::RBrack)?;
                Ok(Expr::Index(IndexExpr {
                    base: Box::new(operand),
                    index: Box::new(index),
                }))
            }
            _ => Ok(operand),
        }
    }

    fn parse_operand(&mut self) -> ParseResult<Expr> {
        match self.peek() {
            Token::Ident => Ok(Expr::Ident(self.expect_ident()?)),
            Token::Int | Token::String => {
                let kind = if self.check(Token::Int) {
                    LitKind::Int
                } else {
                    LitKind::String
                };
                let tok = self.advance();
                Ok(Expr::BasicLit(BasicLit {
                    kind,
                    value: tok.literal,
                    pos: tok.pos,
                }))
            }
            Token::LParen => {
                let lparen = self.advance().pos;
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Paren(ParenExpr {
                    lparen,
                    inner: Box::new(inner),
                }))
            }
            _ => Err(ParseError::at(
                format!("expected expression, found {}", self.found()),
                &self.current,
            )),
        }
    }
}
