// src/parser.rs
use crate::errors::{BlockError, Result};

/// Character cursor over date text. Only ASCII is meaningful to the grammar,
/// anything else stops a read and surfaces as a parse error upstream.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Alphabetic run, lower-cased.
    pub fn parse_word(&mut self) -> Result<String> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphabetic() {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.i == start {
            return Err(BlockError::Parse("word expected".into()));
        }
        Ok(self.s[start..self.i].to_ascii_lowercase())
    }

    /// Integer with an optional leading `+` or `-`.
    pub fn parse_int(&mut self) -> Result<i64> {
        let start = self.i;
        if self.peek_char() == Some('-') || self.peek_char() == Some('+') {
            self.i += 1;
        }
        let digits = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.i == digits {
            self.i = start;
            return Err(BlockError::Parse("expected integer".into()));
        }
        self.s[start..self.i]
            .parse::<i64>()
            .map_err(|_| BlockError::Parse("bad integer".into()))
    }

    pub fn position(&self) -> usize {
        self.i
    }

    pub fn rewind(&mut self, pos: usize) {
        self.i = pos.min(self.s.len());
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_sign_or_digit(&self) -> bool {
        matches!(self.peek_char(), Some(c) if c == '+' || c == '-' || c.is_ascii_digit())
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_signed_ints_and_words() {
        let mut p = Parser::new("+3 Days ago");
        assert_eq!(p.parse_int().unwrap(), 3);
        p.skip_ws();
        assert_eq!(p.parse_word().unwrap(), "days");
        p.skip_ws();
        assert_eq!(p.parse_word().unwrap(), "ago");
        assert!(p.eof());
    }

    #[test]
    fn lone_sign_is_not_an_integer() {
        let mut p = Parser::new("-x");
        assert!(p.parse_int().is_err());
        assert_eq!(p.peek_char(), Some('-'));
    }

    #[test]
    fn clock_time_pieces() {
        let mut p = Parser::new("09:30");
        assert_eq!(p.parse_int().unwrap(), 9);
        assert!(p.consume_char(':'));
        assert!(!p.consume_char(':'));
        assert_eq!(p.parse_int().unwrap(), 30);
        assert!(p.eof());
    }
}
