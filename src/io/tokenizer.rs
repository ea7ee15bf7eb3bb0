//! Line-oriented tokenizer for the chunked scene text format.
//!
//! The format is nominally line-structured, but the modeler's own reader
//! behaves like a plain token scanner, so that is what this implements:
//! tokens are separated by whitespace (including the full-width space the
//! format allows) and by parentheses, quoted substrings are captured as
//! single atomic tokens including their quotes, and `{` / `}` are always
//! emitted standalone while driving an explicit chunk-nesting counter.
//!
//! Typed readers ([`Tokenizer::read_single`], [`Tokenizer::read_vector3`],
//! …) consume exactly the token count implied by their arity and parse
//! with culture-independent formatting; failures carry the current line
//! number.

use std::path::Path;

use nalgebra::{Vector2, Vector3, Vector4};

use crate::error::{MqError, Result};
use crate::mesh::Rgba;

/// Token scanner over the scene text.
pub struct Tokenizer {
    lines: std::vec::IntoIter<String>,
    tokens: Vec<String>,
    token_cursor: usize,
    line_number: usize,
    depth: isize,
    consumed_bytes: usize,
    total_bytes: usize,
}

impl Tokenizer {
    /// Open a file and decode it with the given encoding.
    pub fn from_path<P: AsRef<Path>>(path: P, encoding: &'static encoding_rs::Encoding) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let (text, _, _) = encoding.decode(&bytes);
        Ok(Self::from_text(&text))
    }

    /// Tokenize in-memory text.
    pub fn from_text(text: &str) -> Self {
        let total_bytes = text.len();
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        Self {
            lines: lines.into_iter(),
            tokens: Vec::new(),
            token_cursor: 0,
            line_number: 0,
            depth: 0,
            consumed_bytes: 0,
            total_bytes,
        }
    }

    /// The 1-based line number of the most recently read line.
    #[inline]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// The current chunk-nesting depth (`{` increments, `}` decrements).
    #[inline]
    pub fn depth(&self) -> isize {
        self.depth
    }

    /// Fraction of the input consumed so far, in `[0, 1]`.
    ///
    /// Informational only, intended for host progress reporting.
    pub fn progress(&self) -> f32 {
        if self.total_bytes == 0 {
            1.0
        } else {
            self.consumed_bytes as f32 / self.total_bytes as f32
        }
    }

    /// Get the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<String> {
        if self.token_cursor >= self.tokens.len() && !self.advance_line() {
            return None;
        }

        let token = self.tokens[self.token_cursor].clone();
        self.token_cursor += 1;

        if token == "{" {
            self.depth += 1;
        } else if token == "}" {
            self.depth -= 1;
        }

        Some(token)
    }

    /// Consume and case-insensitively validate a fixed token sequence.
    pub fn ensure_tokens(&mut self, expected: &[&str]) -> bool {
        for want in expected {
            match self.next_token() {
                Some(token) if token.eq_ignore_ascii_case(want) => {}
                _ => return false,
            }
        }
        true
    }

    /// Advance to the next `{` and discard everything up to its matching `}`.
    pub fn skip_chunk(&mut self) {
        loop {
            match self.next_token() {
                Some(token) if token == "{" => break,
                Some(_) => {}
                None => return,
            }
        }
        self.skip_tokens();
    }

    /// Discard tokens until the nesting depth drops below its current level
    /// (abandons the remaining content of an already-opened chunk).
    pub fn skip_tokens(&mut self) {
        let target = self.depth - 1;
        while self.depth != target {
            if self.next_token().is_none() {
                return;
            }
        }
    }

    // ==================== Typed readers ====================

    /// Read the next token as a signed 32-bit integer.
    pub fn read_int32(&mut self) -> Result<i32> {
        let token = self.expect_token()?;
        token
            .parse()
            .map_err(|_| self.bad_literal("integer", &token))
    }

    /// Read the next token as a hexadecimal 32-bit integer.
    pub fn read_hex32(&mut self) -> Result<i32> {
        let token = self.expect_token()?;
        i64::from_str_radix(token.trim_start_matches("0x"), 16)
            .map(|v| v as i32)
            .map_err(|_| self.bad_literal("hex integer", &token))
    }

    /// Read the next token as a 32-bit float.
    pub fn read_single(&mut self) -> Result<f32> {
        let token = self.expect_token()?;
        token.parse().map_err(|_| self.bad_literal("number", &token))
    }

    /// Read the next token as a packed 32-bit RGBA color (R in the low byte).
    pub fn read_color(&mut self) -> Result<Rgba> {
        let token = self.expect_token()?;
        let value: i64 = token
            .parse()
            .map_err(|_| self.bad_literal("color", &token))?;
        Ok(Rgba::from_packed(value as u32))
    }

    /// Read the next two tokens as a 2D vector.
    pub fn read_vector2(&mut self) -> Result<Vector2<f32>> {
        let x = self.read_single()?;
        let y = self.read_single()?;
        Ok(Vector2::new(x, y))
    }

    /// Read the next three tokens as a 3D vector.
    pub fn read_vector3(&mut self) -> Result<Vector3<f32>> {
        let x = self.read_single()?;
        let y = self.read_single()?;
        let z = self.read_single()?;
        Ok(Vector3::new(x, y, z))
    }

    /// Read the next four tokens as a 4D vector.
    pub fn read_vector4(&mut self) -> Result<Vector4<f32>> {
        let x = self.read_single()?;
        let y = self.read_single()?;
        let z = self.read_single()?;
        let w = self.read_single()?;
        Ok(Vector4::new(x, y, z, w))
    }

    /// Read the next token as a string, trimming surrounding quotes.
    pub fn read_string(&mut self) -> Result<String> {
        let token = self.expect_token()?;
        Ok(token.trim_matches('"').to_string())
    }

    // ==================== Internals ====================

    fn expect_token(&mut self) -> Result<String> {
        self.next_token()
            .ok_or_else(|| MqError::format(self.line_number, "unexpected end of file"))
    }

    fn bad_literal(&self, kind: &str, token: &str) -> MqError {
        MqError::format(self.line_number, format!("invalid {kind} literal `{token}`"))
    }

    /// Read lines until one produces tokens. Returns false at end of input.
    fn advance_line(&mut self) -> bool {
        loop {
            let Some(line) = self.lines.next() else {
                return false;
            };
            self.line_number += 1;
            self.consumed_bytes += line.len() + 1;

            self.tokens.clear();
            self.token_cursor = 0;
            tokenize_line(&line, &mut self.tokens);

            if !self.tokens.is_empty() {
                return true;
            }
        }
    }
}

/// Split one line into tokens.
fn tokenize_line(line: &str, tokens: &mut Vec<String>) {
    let mut token = String::new();
    let mut recording_string = false;

    for c in line.chars() {
        if recording_string {
            token.push(c);
            if c == '"' {
                tokens.push(std::mem::take(&mut token));
                recording_string = false;
            }
        } else if c.is_whitespace() || c == '(' || c == ')' {
            if !token.is_empty() {
                tokens.push(std::mem::take(&mut token));
            }
        } else {
            match c {
                '{' | '}' => {
                    if !token.is_empty() {
                        tokens.push(std::mem::take(&mut token));
                    }
                    tokens.push(c.to_string());
                }
                '"' => {
                    token.push(c);
                    recording_string = true;
                }
                _ => token.push(c),
            }
        }
    }

    if !token.is_empty() {
        tokens.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_reads_consume_one_line() {
        let mut tok = Tokenizer::from_text("translation 1.0 2.0 3.0\nscale 1 1 1\n");

        assert_eq!(tok.next_token().as_deref(), Some("translation"));
        assert_eq!(tok.read_single().unwrap(), 1.0);
        assert_eq!(tok.read_single().unwrap(), 2.0);
        assert_eq!(tok.read_single().unwrap(), 3.0);
        assert_eq!(tok.next_token().as_deref(), Some("scale"));
        assert_eq!(tok.line_number(), 2);
    }

    #[test]
    fn test_quoted_string_is_one_token() {
        let mut tok = Tokenizer::from_text("Object \"left arm\" {\n");
        assert_eq!(tok.next_token().as_deref(), Some("Object"));
        assert_eq!(tok.next_token().as_deref(), Some("\"left arm\""));
        assert_eq!(tok.next_token().as_deref(), Some("{"));
    }

    #[test]
    fn test_read_string_trims_quotes() {
        let mut tok = Tokenizer::from_text("\"body.png\"\n");
        assert_eq!(tok.read_string().unwrap(), "body.png");
    }

    #[test]
    fn test_braces_drive_depth() {
        let mut tok = Tokenizer::from_text("a{b{c}d}\n");
        assert_eq!(tok.next_token().as_deref(), Some("a"));
        tok.next_token();
        assert_eq!(tok.depth(), 1);
        tok.next_token(); // b
        tok.next_token(); // {
        assert_eq!(tok.depth(), 2);
        tok.next_token(); // c
        tok.next_token(); // }
        assert_eq!(tok.depth(), 1);
        tok.next_token(); // d
        tok.next_token(); // }
        assert_eq!(tok.depth(), 0);
    }

    #[test]
    fn test_parentheses_delimit_tokens() {
        let mut tok = Tokenizer::from_text("col(0.8 0.8 0.8 1.0)\n");
        assert_eq!(tok.next_token().as_deref(), Some("col"));
        let col = tok.read_vector4().unwrap();
        assert_eq!(col, Vector4::new(0.8, 0.8, 0.8, 1.0));
    }

    #[test]
    fn test_full_width_space_is_a_delimiter() {
        let mut tok = Tokenizer::from_text("vertex\u{3000}8\n");
        assert_eq!(tok.next_token().as_deref(), Some("vertex"));
        assert_eq!(tok.read_int32().unwrap(), 8);
    }

    #[test]
    fn test_skip_chunk_consumes_nested_blocks() {
        let mut tok = Tokenizer::from_text("Thumbnail 64 64 24 rgb {\ninner { 1 2 3 }\n}\nEof\n");
        assert_eq!(tok.next_token().as_deref(), Some("Thumbnail"));
        tok.skip_chunk();
        assert_eq!(tok.depth(), 0);
        assert_eq!(tok.next_token().as_deref(), Some("Eof"));
    }

    #[test]
    fn test_skip_tokens_abandons_open_chunk() {
        let mut tok = Tokenizer::from_text("{ a b { c } d } next\n");
        tok.next_token(); // {
        tok.next_token(); // a
        tok.skip_tokens();
        assert_eq!(tok.next_token().as_deref(), Some("next"));
    }

    #[test]
    fn test_ensure_tokens_is_case_insensitive() {
        let mut tok = Tokenizer::from_text("Metasequoia Document\n");
        assert!(tok.ensure_tokens(&["metasequoia", "DOCUMENT"]));
    }

    #[test]
    fn test_ensure_tokens_rejects_mismatch() {
        let mut tok = Tokenizer::from_text("Metasequoia Doc\n");
        assert!(!tok.ensure_tokens(&["Metasequoia", "Document"]));
    }

    #[test]
    fn test_color_decodes_packed_rgba() {
        let mut tok = Tokenizer::from_text("4278190335\n"); // 0xFF0000FF
        let color = tok.read_color().unwrap();
        assert_eq!(color, Rgba::new(0xFF, 0x00, 0x00, 0xFF));
    }

    #[test]
    fn test_malformed_number_reports_line() {
        let mut tok = Tokenizer::from_text("facet 59.5\nsegment banana\n");
        tok.next_token();
        tok.read_single().unwrap();
        tok.next_token();
        let err = tok.read_int32().unwrap_err();
        match err {
            MqError::Format { line, .. } => assert_eq!(line, 2),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_end_of_input_returns_none() {
        let mut tok = Tokenizer::from_text("last\n");
        assert_eq!(tok.next_token().as_deref(), Some("last"));
        assert_eq!(tok.next_token(), None);
        assert!(tok.progress() >= 1.0);
    }

    #[test]
    fn test_blank_lines_are_skipped_but_counted() {
        let mut tok = Tokenizer::from_text("a\n\n\nb\n");
        tok.next_token();
        assert_eq!(tok.line_number(), 1);
        assert_eq!(tok.next_token().as_deref(), Some("b"));
        assert_eq!(tok.line_number(), 4);
    }
}
