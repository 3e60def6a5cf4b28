/// AST (Abstract Syntax Tree) module
///
/// Front-end syntax for cusp sources. A source file is a sequence of
/// s-expressions, each one a function definition such as
/// `(defn axpy:double [a:double x:double y:double] (+ (* a x) y))`.
pub mod parser;

// Re-export the main types for convenience
pub use parser::{parse_file, AstParser, ParseError};

#[derive(PartialEq, Debug, Clone)]
pub enum Primitive {
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
}

#[derive(PartialEq, Debug, Clone)]
pub enum Node {
    List { root: Vec<Node> },
    Vector { root: Vec<Node> },
    Primitive { value: Primitive },
    Symbol { value: String },
}

impl Node {
    pub fn new_integer(number: i64) -> Node {
        Node::Primitive {
            value: Primitive::Integer(number),
        }
    }

    pub fn new_decimal(number: f64) -> Node {
        Node::Primitive {
            value: Primitive::Decimal(number),
        }
    }

    pub fn new_symbol(value: &str) -> Node {
        Node::Symbol {
            value: value.to_string(),
        }
    }

    pub fn new_list_from_raw(nodes: Vec<Node>) -> Node {
        Node::List { root: nodes }
    }

    pub fn new_vector_from_raw(nodes: Vec<Node>) -> Node {
        Node::Vector { root: nodes }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Node::Symbol { value } => Some(value),
            _ => None,
        }
    }
}
