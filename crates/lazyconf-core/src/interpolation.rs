//! Interpolation parsing
//!
//! Parses interpolation expressions embedded in string values:
//! - `${path.to.value}` - reference to another field in the same store
//! - `${.sibling}` / `${..parent}` - relative references
//! - `\${escaped}` - escaped (literal) text
//!
//! A string that is exactly one reference substitutes the referenced value
//! of any type; mixed text concatenates string renderings.

use crate::error::{Error, Result};

/// A parsed interpolation expression
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolation {
    /// A literal string (no interpolation or escaped interpolation)
    Literal(String),
    /// A reference to another field: ${path.to.value}
    Reference {
        /// The path to reference
        path: String,
        /// Whether this is a relative path (starts with .)
        relative: bool,
    },
    /// A concatenation of multiple parts
    Concat(Vec<Interpolation>),
}

/// Parser for interpolation expressions
pub struct InterpolationParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> InterpolationParser<'a> {
    /// Create a new parser for the given input
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Parse the entire input string
    pub fn parse(&mut self) -> Result<Interpolation> {
        let mut parts = Vec::new();

        while !self.is_eof() {
            if self.check_escape() {
                // \${ -> literal ${
                self.advance(); // skip backslash
                self.advance(); // skip $
                self.advance(); // skip {
                parts.push(Interpolation::Literal("${".to_string()));
            } else if self.check_interpolation_start() {
                parts.push(self.parse_reference()?);
            } else {
                // Collect literal text until next interpolation or end
                let literal = self.collect_literal();
                if !literal.is_empty() {
                    parts.push(Interpolation::Literal(literal));
                }
            }
        }

        // Simplify result
        match parts.len() {
            0 => Ok(Interpolation::Literal(String::new())),
            1 => Ok(parts.remove(0)),
            _ => {
                let merged = merge_adjacent_literals(parts);
                if merged.len() == 1 {
                    Ok(merged.into_iter().next().unwrap())
                } else {
                    Ok(Interpolation::Concat(merged))
                }
            }
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn peek_n(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.pos += c.len_utf8();
        }
    }

    /// Check if we're at an escape sequence (\${)
    fn check_escape(&self) -> bool {
        self.current() == Some('\\') && self.peek() == Some('$') && self.peek_n(2) == Some('{')
    }

    /// Check if we're at an interpolation start (${)
    fn check_interpolation_start(&self) -> bool {
        self.current() == Some('$') && self.peek() == Some('{')
    }

    /// Collect literal text until interpolation or end
    fn collect_literal(&mut self) -> String {
        let mut result = String::new();

        while !self.is_eof() {
            if self.check_escape() || self.check_interpolation_start() {
                break;
            }
            if let Some(c) = self.current() {
                result.push(c);
                self.advance();
            }
        }

        result
    }

    /// Parse a reference expression (starting at ${)
    fn parse_reference(&mut self) -> Result<Interpolation> {
        // Skip ${
        self.advance(); // $
        self.advance(); // {

        self.skip_whitespace();

        let relative = self.current() == Some('.');
        let mut path = String::new();
        let mut closed = false;

        while !self.is_eof() {
            match self.current() {
                Some('}') => {
                    self.advance();
                    closed = true;
                    break;
                }
                Some(c) if c.is_whitespace() => {
                    self.skip_whitespace();
                    // Only trailing whitespace before the brace is allowed
                    if self.current() != Some('}') {
                        return Err(Error::parse("Unexpected whitespace in reference path"));
                    }
                }
                Some(c) if c.is_alphanumeric() || c == '_' || c == '.' || c == '[' || c == ']' => {
                    path.push(c);
                    self.advance();
                }
                Some(c) => {
                    return Err(Error::parse(format!(
                        "Invalid character '{}' in reference path",
                        c
                    )));
                }
                None => break,
            }
        }

        if !closed {
            return Err(Error::parse("Unexpected end of input in interpolation"));
        }
        if path.is_empty() {
            return Err(Error::parse("Empty interpolation expression"));
        }

        Ok(Interpolation::Reference { path, relative })
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }
}

/// Merge adjacent literal parts
fn merge_adjacent_literals(parts: Vec<Interpolation>) -> Vec<Interpolation> {
    let mut result = Vec::new();
    let mut current_literal = String::new();

    for part in parts {
        match part {
            Interpolation::Literal(s) => {
                current_literal.push_str(&s);
            }
            other => {
                if !current_literal.is_empty() {
                    result.push(Interpolation::Literal(current_literal));
                    current_literal = String::new();
                }
                result.push(other);
            }
        }
    }

    if !current_literal.is_empty() {
        result.push(Interpolation::Literal(current_literal));
    }

    result
}

/// Parse an interpolation string
pub fn parse(input: &str) -> Result<Interpolation> {
    InterpolationParser::new(input).parse()
}

/// Check if a string needs processing (has interpolations OR escape sequences)
pub fn needs_processing(input: &str) -> bool {
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'$') {
            return true;
        } else if c == '$' && chars.peek() == Some(&'{') {
            return true;
        }
    }

    false
}
