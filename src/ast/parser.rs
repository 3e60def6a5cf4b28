use super::{Node, Primitive};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected '{found}' at offset {offset}")]
    UnexpectedDelimiter { found: char, offset: usize },
    #[error("unclosed '{opened}' opened at offset {offset}")]
    Unclosed { opened: char, offset: usize },
    #[error("no expressions found")]
    Empty,
}

pub struct AstParser;

impl AstParser {
    /// Parse a single expression starting at `offset`.
    ///
    /// On success `offset` points just past the expression, so callers can
    /// keep reading further top-level forms from the same buffer.
    pub fn parse_expression(input: &[u8], offset: &mut usize) -> Result<Node, ParseError> {
        skip_trivia(input, offset);

        let Some(&byte) = input.get(*offset) else {
            return Err(ParseError::Empty);
        };

        match byte {
            b'(' | b'[' => {
                let opened_at = *offset;
                *offset += 1;
                Self::parse_container(input, offset, opened_at, byte == b'[')
            }
            b')' | b']' => Err(ParseError::UnexpectedDelimiter {
                found: byte as char,
                offset: *offset,
            }),
            _ => {
                let atom = Self::read_atom(input, offset);
                Ok(Self::parse_atom(&atom))
            }
        }
    }

    fn parse_container(
        input: &[u8],
        offset: &mut usize,
        opened_at: usize,
        is_vector: bool,
    ) -> Result<Node, ParseError> {
        let close = if is_vector { b']' } else { b')' };
        let mut items = Vec::new();

        loop {
            skip_trivia(input, offset);
            match input.get(*offset) {
                None => {
                    return Err(ParseError::Unclosed {
                        opened: input[opened_at] as char,
                        offset: opened_at,
                    })
                }
                Some(&c) if c == close => {
                    *offset += 1;
                    break;
                }
                Some(&c) if c == b')' || c == b']' => {
                    return Err(ParseError::UnexpectedDelimiter {
                        found: c as char,
                        offset: *offset,
                    })
                }
                Some(_) => items.push(Self::parse_expression(input, offset)?),
            }
        }

        if is_vector {
            Ok(Node::new_vector_from_raw(items))
        } else {
            Ok(Node::new_list_from_raw(items))
        }
    }

    fn read_atom(input: &[u8], offset: &mut usize) -> String {
        let start = *offset;
        while let Some(&c) = input.get(*offset) {
            if c.is_ascii_whitespace() || matches!(c, b'(' | b')' | b'[' | b']' | b';') {
                break;
            }
            *offset += 1;
        }
        String::from_utf8_lossy(&input[start..*offset]).into_owned()
    }

    fn parse_atom(buffer: &str) -> Node {
        if let Ok(num) = buffer.parse::<i64>() {
            return Node::new_integer(num);
        }

        match buffer {
            "true" => Node::Primitive {
                value: Primitive::Boolean(true),
            },
            "false" => Node::Primitive {
                value: Primitive::Boolean(false),
            },
            _ if looks_numeric(buffer) => match buffer.parse::<f64>() {
                Ok(num) => Node::new_decimal(num),
                Err(_) => Node::new_symbol(buffer),
            },
            _ => Node::new_symbol(buffer),
        }
    }
}

/// Only digit-led tokens are numbers; keeps `inf` and `nan` usable as names.
fn looks_numeric(buffer: &str) -> bool {
    let digits = buffer.strip_prefix('-').unwrap_or(buffer);
    let digits = digits.strip_prefix('.').unwrap_or(digits);
    digits.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

/// Skip whitespace and `;` line comments.
fn skip_trivia(input: &[u8], offset: &mut usize) {
    while let Some(&c) = input.get(*offset) {
        if c.is_ascii_whitespace() {
            *offset += 1;
        } else if c == b';' {
            while *offset < input.len() && input[*offset] != b'\n' {
                *offset += 1;
            }
        } else {
            break;
        }
    }
}

/// Parse every top-level expression in a source file.
pub fn parse_file(file_content: &str) -> Result<Vec<Node>, ParseError> {
    let bytes = file_content.as_bytes();
    let mut expressions = Vec::new();
    let mut offset = 0;

    loop {
        skip_trivia(bytes, &mut offset);
        if offset >= bytes.len() {
            break;
        }
        expressions.push(AstParser::parse_expression(bytes, &mut offset)?);
    }

    if expressions.is_empty() {
        Err(ParseError::Empty)
    } else {
        Ok(expressions)
    }
}
