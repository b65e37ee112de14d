//! Tokenizer for the pipe language.

use loq_common::{LoqError, Result};

/// Kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Unquoted word: field names, keywords, numbers.
    Word,
    /// Double-quoted string with `\"` / `\\` escapes resolved.
    Quoted,
    /// `|`
    Pipe,
    /// `,`
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// End of input.
    Eof,
}

/// One lexed token plus its byte offset into the query text.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Decoded token text; empty for [`TokenKind::Eof`].
    pub text: String,
    /// Byte offset of the token start in the original input.
    pub offset: usize,
}

impl Token {
    /// Case-insensitive keyword check. Quoted tokens never match keywords, so
    /// `"by"` stays usable as a field name.
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(kw)
    }

    /// Render the token for error messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of query".to_string(),
            _ => format!("`{}`", self.text),
        }
    }
}

/// Returns whether `c` may appear in an unquoted word token.
pub fn is_token_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '|' | ',' | '(' | ')' | '"')
}

/// Single-token-lookahead lexer over a query tail.
#[derive(Debug)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    /// The current token. Advanced by [`Lexer::next_token`].
    pub token: Token,
}

impl<'a> Lexer<'a> {
    /// Create a lexer positioned at the first token.
    pub fn new(input: &'a str) -> Result<Self> {
        let mut lex = Self {
            input,
            pos: 0,
            token: Token {
                kind: TokenKind::Eof,
                text: String::new(),
                offset: 0,
            },
        };
        lex.next_token()?;
        Ok(lex)
    }

    /// Advance to the next token.
    pub fn next_token(&mut self) -> Result<()> {
        self.skip_whitespace();
        let offset = self.pos;
        let Some(c) = self.peek() else {
            self.token = Token {
                kind: TokenKind::Eof,
                text: String::new(),
                offset,
            };
            return Ok(());
        };

        let (kind, text) = match c {
            '|' => {
                self.pos += 1;
                (TokenKind::Pipe, "|".to_string())
            }
            ',' => {
                self.pos += 1;
                (TokenKind::Comma, ",".to_string())
            }
            '(' => {
                self.pos += 1;
                (TokenKind::LParen, "(".to_string())
            }
            ')' => {
                self.pos += 1;
                (TokenKind::RParen, ")".to_string())
            }
            '"' => (TokenKind::Quoted, self.read_quoted(offset)?),
            _ => (TokenKind::Word, self.read_word()),
        };
        self.token = Token { kind, text, offset };
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_token_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.input[start..self.pos].to_string()
    }

    fn read_quoted(&mut self, offset: usize) -> Result<String> {
        // Skip the opening quote.
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(LoqError::Parse(format!(
                    "unterminated quoted token at offset {offset}"
                )));
            };
            self.pos += c.len_utf8();
            match c {
                '"' => return Ok(out),
                '\\' => {
                    let Some(esc) = self.peek() else {
                        return Err(LoqError::Parse(format!(
                            "unterminated escape in quoted token at offset {offset}"
                        )));
                    };
                    self.pos += esc.len_utf8();
                    match esc {
                        '"' | '\\' => out.push(esc),
                        _ => {
                            return Err(LoqError::Parse(format!(
                                "unsupported escape `\\{esc}` in quoted token at offset {offset}"
                            )))
                        }
                    }
                }
                _ => out.push(c),
            }
        }
    }
}
