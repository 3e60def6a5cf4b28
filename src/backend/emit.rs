//! Expression printers for the generated sources.
//!
//! Every binary operation is fully parenthesized so neither printer needs
//! precedence tables.

use crate::ir::{BinaryOp, Expr, Function, ScalarType};

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
    "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal",
    "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

const C_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break", "case", "catch", "char",
    "char16_t", "char32_t", "class", "compl", "const", "const_cast", "constexpr", "continue", "decltype",
    "default", "delete", "do", "double", "dynamic_cast", "else", "enum", "explicit", "export", "extern", "false",
    "float", "for", "friend", "goto", "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept",
    "not_eq", "nullptr", "operator", "or_eq", "private", "protected", "public", "register", "reinterpret_cast",
    "restrict", "return", "short", "signed", "sizeof", "static", "static_assert", "static_cast", "struct",
    "switch", "template", "this", "thread_local", "throw", "true", "try", "typedef", "typeid", "typename",
    "union", "unsigned", "using", "virtual", "void", "volatile", "wchar_t", "while", "xor", "xor_eq",
];

/// Names the generated `__global__` kernel declares for itself.
const KERNEL_NAMES: &[&str] = &["_i", "_n", "_result"];

fn is_kernel_argument(name: &str) -> bool {
    name.strip_prefix("_arg")
        .map_or(false, |index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

pub fn is_reserved(name: &str) -> bool {
    PYTHON_KEYWORDS.contains(&name)
        || C_KEYWORDS.contains(&name)
        || KERNEL_NAMES.contains(&name)
        || is_kernel_argument(name)
        || name.starts_with("__")
}

fn variable(function: &Function, expr: &Expr) -> Option<String> {
    match expr {
        Expr::Param(index) => function.params.get(*index).map(|p| p.name.clone()),
        Expr::Local(index) => function.locals.get(*index).map(|l| l.name.clone()),
        _ => None,
    }
}

fn decimal(n: f64) -> String {
    // Debug formatting keeps a trailing `.0`, valid in both languages.
    format!("{:?}", n)
}

/// Render `expr` as a Python expression.
pub fn python_expr(function: &Function, expr: &Expr) -> String {
    match expr {
        Expr::Integer(n) => n.to_string(),
        Expr::Decimal(n) => decimal(*n),
        Expr::Boolean(true) => "True".to_string(),
        Expr::Boolean(false) => "False".to_string(),
        Expr::Param(_) | Expr::Local(_) => variable(function, expr).unwrap_or_else(|| "None".to_string()),
        Expr::Not(operand) => format!("(not {})", python_expr(function, operand)),
        Expr::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => format!(
            "({} if {} else {})",
            python_expr(function, then_branch),
            python_expr(function, condition),
            python_expr(function, else_branch)
        ),
        Expr::Binary { op, lhs, rhs, ty } => {
            let left = python_expr(function, lhs);
            let right = python_expr(function, rhs);
            match op {
                BinaryOp::And => format!("(bool({}) and bool({}))", left, right),
                BinaryOp::Or => format!("(bool({}) or bool({}))", left, right),
                BinaryOp::Div if !ty.is_floating() => {
                    // C semantics: truncate toward zero.
                    format!("int({} / {})", left, right)
                }
                _ => format!("({} {} {})", left, op.c_symbol(), right),
            }
        }
    }
}

/// Python conversion applied to values of `ty`.
pub fn python_cast(ty: ScalarType) -> &'static str {
    match ty {
        ScalarType::Bool => "bool",
        ScalarType::Int | ScalarType::Long => "int",
        ScalarType::Float | ScalarType::Double => "float",
    }
}

/// Render `expr` as a C++/CUDA expression.
pub fn c_expr(function: &Function, expr: &Expr) -> String {
    match expr {
        Expr::Integer(n) => n.to_string(),
        Expr::Decimal(n) => decimal(*n),
        Expr::Boolean(b) => b.to_string(),
        Expr::Param(_) | Expr::Local(_) => variable(function, expr).unwrap_or_else(|| "0".to_string()),
        Expr::Not(operand) => format!("(!{})", c_expr(function, operand)),
        Expr::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => format!(
            "({} ? {} : {})",
            c_expr(function, condition),
            c_expr(function, then_branch),
            c_expr(function, else_branch)
        ),
        Expr::Binary { op, lhs, rhs, .. } => format!(
            "({} {} {})",
            c_expr(function, lhs),
            op.c_symbol(),
            c_expr(function, rhs)
        ),
    }
}

/// Format a function signature, with a `__global__` or `__device__` qualifier when given.
pub fn c_signature(qualifier: Option<&str>, return_type: &str, name: &str, params: &[(String, String)]) -> String {
    let params = params
        .iter()
        .map(|(ty, name)| format!("{} {}", ty, name))
        .collect::<Vec<_>>()
        .join(", ");
    match qualifier {
        Some(qualifier) => format!("{} {} {}({})", qualifier, return_type, name, params),
        None => format!("{} {}({})", return_type, name, params),
    }
}

pub fn indent(level: usize) -> String {
    "    ".repeat(level)
}
