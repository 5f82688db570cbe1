//! Lexical scanner for Solidity sources.
//!
//! The scanner hands out `(position, token, literal)` triples one at a time and
//! records every character it consumes in a [`File`], so that positions can be
//! mapped back to line/character coordinates afterwards.

mod file;

pub use file::{File, Pos};

use logos::Logos;
use serde::Serialize;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[logos(skip r"[ \t\r\n]+")]  // Skip whitespace
#[logos(skip r"//[^\n]*")]     // Skip line comments
pub enum Token {
    // === Literals ===
    #[regex(r"[\p{L}_][\p{L}_0-9]*")]
    Ident,

    #[regex(r"[0-9]+")]
    Int,

    // No escapes: an embedded quote ends the literal, a missing one runs to end of input
    #[regex(r#""[^"]*"?"#)]
    String,

    // === Operators ===
    #[token("+")]
    Add,
    #[token("*")]
    Mul,
    #[token("**")]
    Pow,
    #[token("=")]
    Assign,
    #[token("==")]
    Eq,
    #[token("^")]
    Xor,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBrack,
    #[token("]")]
    RBrack,

    // === Punctuation ===
    #[token(";")]
    Semicolon,
    #[token(".")]
    Period,
    #[token(",")]
    Comma,

    // === Special ===
    Illegal,
    Eof,
}

impl Token {
    /// Upper-case kind name, as shown in token dumps
    pub fn name(self) -> &'static str {
        match self {
            Token::Ident => "IDENT",
            Token::Int => "INT",
            Token::String => "STRING",
            Token::Add => "ADD",
            Token::Mul => "MUL",
            Token::Pow => "POW",
            Token::Assign => "ASSIGN",
            Token::Eq => "EQ",
            Token::Xor => "XOR",
            Token::LParen => "LPAREN",
            Token::RParen => "RPAREN",
            Token::LBrace => "LBRACE",
            Token::RBrace => "RBRACE",
            Token::LBrack => "LBRACK",
            Token::RBrack => "RBRACK",
            Token::Semicolon => "SEMICOLON",
            Token::Period => "PERIOD",
            Token::Comma => "COMMA",
            Token::Illegal => "ILLEGAL",
            Token::Eof => "EOF",
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident => write!(f, "identifier"),
            Token::Int => write!(f, "integer"),
            Token::String => write!(f, "string"),
            Token::Add => write!(f, "+"),
            Token::Mul => write!(f, "*"),
            Token::Pow => write!(f, "**"),
            Token::Assign => write!(f, "="),
            Token::Eq => write!(f, "=="),
            Token::Xor => write!(f, "^"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBrack => write!(f, "["),
            Token::RBrack => write!(f, "]"),
            Token::Semicolon => write!(f, ";"),
            Token::Period => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::Illegal => write!(f, "illegal character"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// A token with its position and source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpannedToken {
    pub pos: Pos,
    pub token: Token,
    pub literal: String,
}

/// Pull-based scanner over one document.
///
/// Characters are recorded in the [`File`] only as far as the scanner has
/// advanced, skipped whitespace and comments included.
pub struct Scanner<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, Token>,
    file: &'a mut File,
    /// Byte offset up to which characters have been recorded
    recorded: usize,
    /// Character offset of `recorded`
    offset: usize,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str, file: &'a mut File) -> Self {
        Self {
            source,
            inner: Token::lexer(source),
            file,
            recorded: 0,
            offset: 0,
            finished: false,
        }
    }

    /// Next token; `Token::Eof` once the source is exhausted, on every call.
    pub fn scan(&mut self) -> SpannedToken {
        if self.finished {
            return self.eof();
        }

        match self.inner.next() {
            Some(result) => {
                let span = self.inner.span();
                self.record_until(span.start);
                let pos = Pos(self.offset);
                self.record_until(span.end);
                SpannedToken {
                    pos,
                    token: result.unwrap_or(Token::Illegal),
                    literal: self.inner.slice().to_string(),
                }
            }
            None => {
                self.record_until(self.source.len());
                self.finished = true;
                self.eof()
            }
        }
    }

    fn eof(&self) -> SpannedToken {
        SpannedToken {
            pos: Pos(self.offset),
            token: Token::Eof,
            literal: String::new(),
        }
    }

    fn record_until(&mut self, end: usize) {
        let Some(text) = self.source.get(self.recorded..end) else {
            return;
        };
        for ch in text.chars() {
            if ch == '\n' {
                self.file.add_line();
            } else {
                self.file.add_character(Pos(self.offset));
            }
            self.offset += 1;
        }
        self.recorded = end;
    }
}

/// Scan a whole document, ending with the `Eof` token
pub fn tokenize(source: &str, file: &mut File) -> Vec<SpannedToken> {
    let mut scanner = Scanner::new(source, file);
    let mut tokens = Vec::new();

    loop {
        let spanned = scanner.scan();
        let is_eof = spanned.token == Token::Eof;
        tokens.push(spanned);
        if is_eof {
            break;
        }
    }

    tokens
}
