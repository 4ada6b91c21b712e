//! Streaming lexer for Lox source text.
//!
//! [`Scanner`] is an iterator of `Result<Token, LoxError>`.  A lexical error
//! is yielded in place of a token and scanning resumes right after the
//! offending character, so a single pass reports every bad character.  The
//! stream always ends with exactly one `EOF` token, after which the iterator
//! is fused.
//!
//! Lexemes are slices of the input.  Only string and number literals carry an
//! owned payload.  Comments are skipped with `memchr`; keywords are looked up
//! in a compile‑time perfect‑hash map.
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! for result in Scanner::new("print 123; // example") {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Lexer over one source text.  Every emitted token's `lexeme` borrows from
/// that text.
pub struct Scanner<'a> {
    text: &'a str,
    /// `text` as bytes; all lexical decisions are made on ASCII bytes.
    src: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// One past the last byte consumed.
    curr: usize,
    line: usize,
    /// Set once EOF has been emitted.
    done: bool,
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `text`.
    #[inline]
    pub fn new(text: &'a str) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            src: text.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            done: false,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    /// Consumes one byte.  Callers guard with [`Self::is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Byte `offset` positions ahead, or `0` past the end.
    #[inline(always)]
    fn peek_at(&self, offset: usize) -> u8 {
        self.src.get(self.curr + offset).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    /// Picks `matched` and consumes `expected` if it is next, else `single`.
    #[inline(always)]
    fn either(&mut self, expected: u8, matched: TokenType, single: TokenType) -> TokenType {
        if self.peek() == expected {
            self.curr += 1;
            matched
        } else {
            single
        }
    }

    /// Token boundaries always fall on ASCII bytes, so the slice is valid
    /// UTF‑8; `get` keeps that an invariant rather than an assumption.
    #[inline(always)]
    fn slice(&self, from: usize, to: usize) -> &'a str {
        self.text.get(from..to).unwrap_or("")
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scans one lexeme starting at `self.start`.  `Ok(None)` means
    /// whitespace or a comment was skipped.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let kind = match self.advance() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'/' => {
                if self.peek() != b'/' {
                    TokenType::SLASH
                } else {
                    // The newline is left for the main loop so the line
                    // counter stays correct.
                    self.curr = match memchr(b'\n', &self.src[self.curr..]) {
                        Some(pos) => self.curr + pos,
                        None => self.src.len(),
                    };
                    return Ok(None);
                }
            }

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            other => {
                debug!("Unexpected byte {:#04x} on line {}", other, self.line);
                // One error per character, not per UTF‑8 byte.
                while self.peek() & 0xC0 == 0x80 {
                    self.curr += 1;
                }
                return Err(LoxError::lex(self.line, "Unexpected character."));
            }
        };

        Ok(Some(kind))
    }

    /// Rest of a string literal after its opening quote.  Strings may span
    /// lines and have no escape sequences.
    fn string(&mut self) -> Result<TokenType> {
        let Some(len) = memchr(b'"', &self.src[self.curr..]) else {
            self.line += self.src[self.curr..].iter().filter(|&&b| b == b'\n').count();
            self.curr = self.src.len();
            return Err(LoxError::lex(self.line, "Unterminated string."));
        };

        let contents = self.slice(self.curr, self.curr + len);
        self.line += contents.bytes().filter(|&b| b == b'\n').count();
        self.curr += len + 1;

        Ok(TokenType::STRING(contents.to_owned()))
    }

    /// Integer part, then an optional fraction.  A trailing `.` with no digit
    /// after it is left for the next token.
    fn number(&mut self) -> TokenType {
        self.skip_digits();

        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.curr += 1;
            self.skip_digits();
        }

        // Digits with at most one inner '.', which always parses.
        let value = self.slice(self.start, self.curr).parse::<f64>().unwrap_or(0.0);
        TokenType::NUMBER(value)
    }

    fn skip_digits(&mut self) {
        while self.peek().is_ascii_digit() {
            self.curr += 1;
        }
    }

    /// Identifier or keyword; keywords win.
    fn identifier(&mut self) -> TokenType {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.curr += 1;
        }

        KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.is_at_end() {
            self.start = self.curr;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),
                Ok(Some(kind)) => {
                    let lexeme = self.slice(self.start, self.curr);
                    return Some(Ok(Token::new(kind, lexeme, self.line)));
                }
                Ok(None) => {}
            }
        }

        if self.done {
            return None;
        }

        // Exactly one EOF, then the iterator stays exhausted.
        self.done = true;
        Some(Ok(Token::new(TokenType::EOF, "", self.line)))
    }
}

impl FusedIterator for Scanner<'_> {}
