//! Lexer for GraphQL operation headers.
//!
//! Only the tokens needed to read `query name($var: Type!, ...)` are produced.
//! Commas and comments are trivia, as in the GraphQL grammar. Everything after
//! the opening brace of the selection set is never lexed.

/// The kind of a header token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    Name(&'a str),
    Dollar,
    Colon,
    Bang,
    Equals,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    Unknown(char),
    Eof,
}

/// A token with the byte offset it starts at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub offset: usize,
}

/// A lexer over operation text.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\t' | b'\n' | b'\r' | b',' => self.pos += 1,
                // BOM
                0xEF if self.bytes[self.pos..].starts_with(&[0xEF, 0xBB, 0xBF]) => {
                    self.pos += 3
                }
                b'#' => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' || c == b'\r' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    /// Scans the next token.
    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_trivia();

        let offset = self.pos;
        let Some(c) = self.peek() else {
            return Token {
                kind: TokenKind::Eof,
                offset,
            };
        };

        let kind = match c {
            b'$' => TokenKind::Dollar,
            b':' => TokenKind::Colon,
            b'!' => TokenKind::Bang,
            b'=' => TokenKind::Equals,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'{' => TokenKind::LBrace,
            c if c == b'_' || c.is_ascii_alphabetic() => {
                while matches!(self.peek(), Some(c) if c == b'_' || c.is_ascii_alphanumeric()) {
                    self.pos += 1;
                }
                return Token {
                    kind: TokenKind::Name(&self.source[offset..self.pos]),
                    offset,
                };
            }
            _ => {
                let ch = self.source[offset..].chars().next().unwrap_or('\u{FFFD}');
                self.pos += ch.len_utf8();
                return Token {
                    kind: TokenKind::Unknown(ch),
                    offset,
                };
            }
        };

        self.pos += 1;
        Token { kind, offset }
    }
}
