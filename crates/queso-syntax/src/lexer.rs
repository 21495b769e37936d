//! Hand-written lexer for queso source code.
//!
//! Spans are byte offsets, so `λ` (two bytes in UTF-8) widens the spans of
//! everything after it on the line. Identifiers cover most of the printable
//! ASCII punctuation; `(`, `)` and whitespace are the only delimiters.

use queso_ast::{FileId, Span};
use queso_diag::{Category, Diagnostic};

use crate::token::{Token, TokenKind};

/// First byte of the UTF-8 encoding of `λ` (0xCE 0xBB).
const LAMBDA_B0: u8 = 0xCE;
/// Second byte of the UTF-8 encoding of `λ`.
const LAMBDA_B1: u8 = 0xBB;

/// Lex source text into a sequence of tokens.
///
/// Returns `Ok(tokens)` where the last token is always `Eof`, or `Err` with
/// a diagnostic per byte no token can start with.
pub fn lex(source: &str, file: FileId) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let mut lexer = Lexer::new(source, file);
    lexer.scan_all();
    if lexer.errors.is_empty() {
        Ok(lexer.tokens)
    } else {
        Err(lexer.errors)
    }
}

struct Lexer<'src> {
    text: &'src str,
    source: &'src [u8],
    file: FileId,
    pos: usize,
    tokens: Vec<Token>,
    errors: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str, file: FileId) -> Self {
        Self {
            text: source,
            source: source.as_bytes(),
            file,
            pos: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn scan_all(&mut self) {
        loop {
            self.skip_trivia();
            if self.is_at_end() {
                self.emit(TokenKind::Eof, self.pos, self.pos);
                break;
            }
            self.scan_token();
        }
    }

    fn scan_token(&mut self) {
        let start = self.pos;
        let b = self.advance();

        match b {
            b'(' => self.emit(TokenKind::LParen, start, self.pos),
            b')' => self.emit(TokenKind::RParen, start, self.pos),
            b'#' => {
                // `#t`/`#f` are booleans only when a delimiter follows;
                // a bare `#` never starts an identifier.
                match self.peek() {
                    Some(b't') if self.delimiter_at(self.pos + 1) => {
                        self.advance();
                        self.emit(TokenKind::Bool(true), start, self.pos);
                    }
                    Some(b'f') if self.delimiter_at(self.pos + 1) => {
                        self.advance();
                        self.emit(TokenKind::Bool(false), start, self.pos);
                    }
                    _ => self.error_char(start),
                }
            }
            b'0'..=b'9' => {
                while matches!(self.peek(), Some(b'0'..=b'9')) {
                    self.advance();
                }
                let text = self.text[start..self.pos].to_string();
                self.emit(TokenKind::Num(text), start, self.pos);
            }
            _ if starts_ident(b, self.peek()) => {
                if b == LAMBDA_B0 {
                    self.advance();
                }
                self.eat_ident();
                let text = &self.text[start..self.pos];
                let kind = match text {
                    "define" => TokenKind::Define,
                    "lambda" | "λ" => TokenKind::Lambda,
                    _ => TokenKind::Ident(text.to_string()),
                };
                self.emit(kind, start, self.pos);
            }
            _ => self.error_char(start),
        }
    }

    fn eat_ident(&mut self) {
        loop {
            match self.peek() {
                Some(b) if is_ident_byte(b) => {
                    self.advance();
                }
                Some(LAMBDA_B0) if self.source.get(self.pos + 1) == Some(&LAMBDA_B1) => {
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn skip_trivia(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.advance();
        }
    }

    fn delimiter_at(&self, pos: usize) -> bool {
        match self.source.get(pos) {
            None => true,
            Some(&b) => !is_ident_byte(b) && b != LAMBDA_B0,
        }
    }

    fn emit(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(self.file, start as u32, end as u32),
        });
    }

    /// Report the character starting at `start` as unlexable. `self.pos` is
    /// already one byte past it; widen to the full character.
    fn error_char(&mut self, start: usize) {
        let ch = self.text[start..]
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        let end = start + ch.len_utf8();
        self.pos = self.pos.max(end);
        self.errors.push(
            Diagnostic::error(Category::Lex, format!("unexpected character `{ch}`")).at(
                queso_diag::SourceLocation {
                    file_id: self.file.0,
                    start: start as u32,
                    end: end as u32,
                },
            ),
        );
    }

    fn advance(&mut self) -> u8 {
        let b = self.source[self.pos];
        self.pos += 1;
        b
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

/// Whether `b` can appear in an identifier (ASCII portion; `λ` is handled
/// as its byte pair by the scanner).
fn is_ident_byte(b: u8) -> bool {
    matches!(b,
        b'!'
        | b'#'..=b'&'
        | b'*'
        | b'+'
        | b'-'..=b'/'
        | b'0'..=b'9'
        | b':'..=b'@'
        | b'A'..=b'Z'
        | b'\\'
        | b'^'
        | b'_'
        | b'a'..=b'z'
        | b'|'
        | b'~')
}

/// Whether a token starting with byte `b` is an identifier. Digits and `#`
/// are excluded here: they start numbers and booleans instead.
fn starts_ident(b: u8, next: Option<u8>) -> bool {
    if b == LAMBDA_B0 {
        return next == Some(LAMBDA_B1);
    }
    is_ident_byte(b) && !b.is_ascii_digit() && b != b'#'
}
