//! Parser and writer for the game's SJSON resource format: a JSON superset
//! with `Key = Value` entries, bare keys, comments, and no required commas.
//! Key order is significant and preserved on write, and line comments
//! attached to entries are re-emitted, so unrelated tooling can still diff
//! rewritten files.

use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Object(Vec<Entry>),
    Array(Vec<Value>),
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// One `Key = Value` entry of an object, with the line comments that
/// preceded it in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Value,
    pub comments: Vec<String>,
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Parse failure with 1-based source position.
#[derive(Debug)]
pub struct SjsonError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

pub fn parse(text: &str) -> Result<Value, SjsonError> {
    let mut parser = Parser {
        bytes: text.as_bytes(),
        pos: 0,
        line: 1,
        column: 1,
    };
    let entries = parser.parse_entries(None)?;
    Ok(Value::Object(entries))
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Parser<'a> {
    fn error<T>(&self, message: impl Into<String>) -> Result<T, SjsonError> {
        Err(SjsonError {
            line: self.line,
            column: self.column,
            message: message.into(),
        })
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    /// Skip whitespace and commas, collecting any `//` line comments seen on
    /// the way so they can be re-attached to the next entry. Block comments
    /// are skipped without preservation.
    fn skip_trivia(&mut self) -> Result<Vec<String>, SjsonError> {
        let mut comments = Vec::new();
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() || b == b',' => {
                    self.bump();
                }
                Some(b'/') => match self.bytes.get(self.pos + 1) {
                    Some(b'/') => {
                        let start = self.pos;
                        while let Some(b) = self.peek() {
                            if b == b'\n' {
                                break;
                            }
                            self.bump();
                        }
                        let comment = std::str::from_utf8(&self.bytes[start..self.pos])
                            .unwrap_or_default();
                        comments.push(comment.trim_end().to_string());
                    }
                    Some(b'*') => {
                        self.bump();
                        self.bump();
                        loop {
                            match self.bump() {
                                Some(b'*') if self.peek() == Some(b'/') => {
                                    self.bump();
                                    break;
                                }
                                Some(_) => {}
                                None => return self.error("unterminated block comment"),
                            }
                        }
                    }
                    _ => return Ok(comments),
                },
                _ => return Ok(comments),
            }
        }
    }

    /// Parse entries until `terminator` (or end of input for the implicit
    /// top-level object).
    fn parse_entries(&mut self, terminator: Option<u8>) -> Result<Vec<Entry>, SjsonError> {
        let mut entries = Vec::new();
        loop {
            let comments = self.skip_trivia()?;
            match self.peek() {
                None => {
                    if terminator.is_some() {
                        return self.error("unexpected end of input inside object");
                    }
                    return Ok(entries);
                }
                Some(b) if Some(b) == terminator => {
                    self.bump();
                    return Ok(entries);
                }
                Some(_) => {
                    let key = self.parse_key()?;
                    self.skip_trivia()?;
                    match self.peek() {
                        Some(b'=') => {
                            self.bump();
                        }
                        _ => return self.error(format!("expected '=' after key '{key}'")),
                    }
                    self.skip_trivia()?;
                    let value = self.parse_value()?;
                    entries.push(Entry { key, value, comments });
                }
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, SjsonError> {
        match self.peek() {
            Some(b'"') => self.parse_string(),
            Some(b) if b.is_ascii_alphanumeric() || b == b'_' => {
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if b.is_ascii_alphanumeric() || b == b'_' {
                        self.bump();
                    } else {
                        break;
                    }
                }
                Ok(std::str::from_utf8(&self.bytes[start..self.pos])
                    .unwrap_or_default()
                    .to_string())
            }
            _ => self.error("expected a key"),
        }
    }

    fn parse_value(&mut self) -> Result<Value, SjsonError> {
        match self.peek() {
            Some(b'{') => {
                self.bump();
                Ok(Value::Object(self.parse_entries(Some(b'}'))?))
            }
            Some(b'[') => {
                self.bump();
                let mut items = Vec::new();
                loop {
                    self.skip_trivia()?;
                    match self.peek() {
                        Some(b']') => {
                            self.bump();
                            return Ok(Value::Array(items));
                        }
                        None => return self.error("unexpected end of input inside array"),
                        Some(_) => items.push(self.parse_value()?),
                    }
                }
            }
            Some(b'"') => Ok(Value::String(self.parse_string()?)),
            Some(b) if b == b'-' || b.is_ascii_digit() => self.parse_number(),
            Some(b) if b.is_ascii_alphabetic() => {
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if b.is_ascii_alphanumeric() || b == b'_' {
                        self.bump();
                    } else {
                        break;
                    }
                }
                let word = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default();
                match word {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    other => self.error(format!("unexpected bare word '{other}'")),
                }
            }
            Some(b) => self.error(format!("unexpected character '{}'", b as char)),
            None => self.error("expected a value"),
        }
    }

    fn parse_string(&mut self) -> Result<String, SjsonError> {
        self.bump(); // opening quote
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(b'"') => return Ok(out),
                Some(b'\\') => match self.bump() {
                    Some(b'"') => out.push('"'),
                    Some(b'\\') => out.push('\\'),
                    Some(b'/') => out.push('/'),
                    Some(b'n') => out.push('\n'),
                    Some(b't') => out.push('\t'),
                    Some(b'r') => out.push('\r'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other as char);
                    }
                    None => return self.error("unterminated string escape"),
                },
                Some(b) if b < 0x80 => out.push(b as char),
                Some(b) => {
                    // Re-assemble a multi-byte UTF-8 scalar.
                    let start = self.pos - 1;
                    let width = match b {
                        0xC0..=0xDF => 2,
                        0xE0..=0xEF => 3,
                        _ => 4,
                    };
                    for _ in 1..width {
                        self.bump();
                    }
                    match std::str::from_utf8(&self.bytes[start..self.pos]) {
                        Ok(s) => out.push_str(s),
                        Err(_) => return self.error("invalid UTF-8 in string"),
                    }
                }
                None => return self.error("unterminated string"),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, SjsonError> {
        let start = self.pos;
        let mut is_float = false;
        if self.peek() == Some(b'-') {
            self.bump();
        }
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => {
                    self.bump();
                }
                b'.' | b'e' | b'E' | b'+' | b'-' => {
                    is_float = true;
                    self.bump();
                }
                _ => break,
            }
        }
        let raw = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default();
        if is_float {
            match raw.parse::<f64>() {
                Ok(f) => Ok(Value::Float(f)),
                Err(_) => self.error(format!("invalid number '{raw}'")),
            }
        } else {
            match raw.parse::<i64>() {
                Ok(i) => Ok(Value::Int(i)),
                Err(_) => match raw.parse::<f64>() {
                    Ok(f) => Ok(Value::Float(f)),
                    Err(_) => self.error(format!("invalid number '{raw}'")),
                },
            }
        }
    }
}

/// Serialize a tree back to SJSON text. The root must be the implicit
/// top-level object produced by [`parse`].
pub fn to_string(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(entries) => write_entries(&mut out, entries, 0),
        other => write_value(&mut out, other, 0),
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn write_entries(out: &mut String, entries: &[Entry], depth: usize) {
    for entry in entries {
        for comment in &entry.comments {
            indent(out, depth);
            out.push_str(comment);
            out.push('\n');
        }
        indent(out, depth);
        if is_bare_key(&entry.key) {
            out.push_str(&entry.key);
        } else {
            write_string(out, &entry.key);
        }
        out.push_str(" = ");
        write_value(out, &entry.value, depth);
        out.push('\n');
    }
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Object(entries) => {
            out.push_str("{\n");
            write_entries(out, entries, depth + 1);
            indent(out, depth);
            out.push('}');
        }
        Value::Array(items) => {
            out.push_str("[\n");
            for item in items {
                indent(out, depth + 1);
                write_value(out, item, depth + 1);
                out.push('\n');
            }
            indent(out, depth);
            out.push(']');
        }
        Value::String(s) => write_string(out, s),
        Value::Int(i) => {
            let _ = write!(out, "{i}");
        }
        // Debug formatting keeps a trailing `.0` so floats survive a
        // round-trip as floats.
        Value::Float(f) => {
            let _ = write!(out, "{f:?}");
        }
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Null => out.push_str("null"),
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
}
