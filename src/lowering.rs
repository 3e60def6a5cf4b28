//! Front-end AST to backend IR conversion.
//!
//! `AstConverter` is the seam the orchestrator lowers through; `SexpLowering`
//! is the converter for `defn` forms produced by [`crate::ast`].

use crate::ast::{Node, Primitive};
use crate::ir::{static_type, BinaryOp, Expr, Function, Local, Param, ScalarType};
use std::collections::HashMap;
use thiserror::Error;

const DEFAULT_TYPE: ScalarType = ScalarType::Double;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoweringError {
    #[error("malformed definition: {0}")]
    MalformedDefinition(String),
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("invalid name '{0}'")]
    InvalidName(String),
    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),
    #[error("unsupported operation '{0}'")]
    UnsupportedOperation(String),
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
    #[error("arity error in '{op}': expected {expected} arguments, got {actual}")]
    ArityError { op: String, expected: usize, actual: usize },
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
}

/// Pure transform from a front-end AST into backend IR.
pub trait AstConverter {
    type Ast;

    fn convert(&self, ast: &Self::Ast) -> Result<Function, LoweringError>;
}

/// Converter for `(defn name[:type] [param[:type] ...] body)` forms.
#[derive(Debug, Default, Clone, Copy)]
pub struct SexpLowering;

impl AstConverter for SexpLowering {
    type Ast = Node;

    fn convert(&self, ast: &Node) -> Result<Function, LoweringError> {
        lower_definition(ast)
    }
}

/// Name bound by a `defn` form, without lowering its body.
pub fn definition_name(node: &Node) -> Result<String, LoweringError> {
    let (head, _, _) = split_definition(node)?;
    let (name, _) = parse_annotated(head)?;
    Ok(name)
}

#[derive(Debug, Default)]
struct Scope {
    params: HashMap<String, usize>,
    variables: HashMap<String, usize>, // let-bound name -> local slot
    locals: Vec<Local>,
}

impl Scope {
    fn lookup(&self, name: &str) -> Option<Expr> {
        if let Some(slot) = self.variables.get(name) {
            return Some(Expr::Local(*slot));
        }
        self.params.get(name).map(|index| Expr::Param(*index))
    }

    /// Bind `name` to a fresh slot, returning the binding it shadows.
    fn bind(&mut self, name: &str, local: Local) -> Option<usize> {
        let slot = self.locals.len();
        self.locals.push(local);
        self.variables.insert(name.to_string(), slot)
    }

    fn restore(&mut self, name: &str, previous: Option<usize>) {
        match previous {
            Some(slot) => {
                self.variables.insert(name.to_string(), slot);
            }
            None => {
                self.variables.remove(name);
            }
        }
    }
}

fn split_definition(node: &Node) -> Result<(&Node, &[Node], &Node), LoweringError> {
    let Node::List { root } = node else {
        return Err(LoweringError::MalformedDefinition(
            "expected (defn name [params] body)".to_string(),
        ));
    };

    match root.as_slice() {
        [keyword, head, Node::Vector { root: params }, body] if keyword.as_symbol() == Some("defn") => {
            Ok((head, params.as_slice(), body))
        }
        [keyword, ..] if keyword.as_symbol() == Some("defn") => Err(LoweringError::MalformedDefinition(
            format!("defn takes a name, a parameter vector and one body, got {} forms", root.len() - 1),
        )),
        _ => Err(LoweringError::MalformedDefinition(
            "expected (defn name [params] body)".to_string(),
        )),
    }
}

fn lower_definition(node: &Node) -> Result<Function, LoweringError> {
    let (head, raw_params, body) = split_definition(node)?;
    let (name, result) = parse_annotated(head)?;

    let mut scope = Scope::default();
    let mut params = Vec::with_capacity(raw_params.len());
    for (index, raw) in raw_params.iter().enumerate() {
        let (param_name, ty) = parse_annotated(raw)?;
        if scope.params.insert(param_name.clone(), index).is_some() {
            return Err(LoweringError::DuplicateParameter(param_name));
        }
        params.push(Param { name: param_name, ty });
    }

    let body = lower_node(body, &params, &mut scope)?;

    Ok(Function {
        name,
        params,
        result,
        locals: scope.locals,
        body,
    })
}

/// Split `name:type` into its parts; the type defaults to `double`.
fn parse_annotated(node: &Node) -> Result<(String, ScalarType), LoweringError> {
    let symbol = node.as_symbol().ok_or_else(|| {
        LoweringError::MalformedDefinition(format!("expected a name, found {:?}", node))
    })?;

    let (name, ty) = match symbol.split_once(':') {
        Some((name, ty_name)) => {
            let ty = ScalarType::from_name(ty_name)
                .ok_or_else(|| LoweringError::UnknownType(ty_name.to_string()))?;
            (name, ty)
        }
        None => (symbol, DEFAULT_TYPE),
    };

    if !is_identifier(name) {
        return Err(LoweringError::InvalidName(name.to_string()));
    }
    Ok((name.to_string(), ty))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn lower_node(node: &Node, params: &[Param], scope: &mut Scope) -> Result<Expr, LoweringError> {
    match node {
        Node::Primitive { value } => Ok(match value {
            Primitive::Integer(n) => Expr::Integer(*n),
            Primitive::Decimal(n) => Expr::Decimal(*n),
            Primitive::Boolean(b) => Expr::Boolean(*b),
        }),
        Node::Symbol { value } => scope
            .lookup(value)
            .ok_or_else(|| LoweringError::UndefinedVariable(value.clone())),
        Node::List { root } => lower_list(root, params, scope),
        Node::Vector { .. } => Err(LoweringError::InvalidExpression(
            "vectors are only allowed for parameters and let bindings".to_string(),
        )),
    }
}

fn lower_list(nodes: &[Node], params: &[Param], scope: &mut Scope) -> Result<Expr, LoweringError> {
    let Some((operator, args)) = nodes.split_first() else {
        return Err(LoweringError::InvalidExpression("empty list".to_string()));
    };

    let Some(op) = operator.as_symbol() else {
        return Err(LoweringError::InvalidExpression(
            "first element must be a symbol".to_string(),
        ));
    };

    match op {
        "+" => lower_fold(args, params, scope, BinaryOp::Add, op),
        "-" => lower_fold(args, params, scope, BinaryOp::Sub, op),
        "*" => lower_fold(args, params, scope, BinaryOp::Mul, op),
        "/" => lower_fold(args, params, scope, BinaryOp::Div, op),
        "and" => lower_fold(args, params, scope, BinaryOp::And, op),
        "or" => lower_fold(args, params, scope, BinaryOp::Or, op),
        "=" => lower_comparison(args, params, scope, BinaryOp::Equal, op),
        "<" => lower_comparison(args, params, scope, BinaryOp::Less, op),
        ">" => lower_comparison(args, params, scope, BinaryOp::Greater, op),
        "<=" => lower_comparison(args, params, scope, BinaryOp::LessEqual, op),
        ">=" => lower_comparison(args, params, scope, BinaryOp::GreaterEqual, op),
        "not" => {
            let [operand] = args else {
                return Err(arity(op, 1, args.len()));
            };
            Ok(Expr::Not(Box::new(lower_node(operand, params, scope)?)))
        }
        "if" => lower_if(args, params, scope),
        "let" => lower_let(args, params, scope),
        other => Err(LoweringError::UnsupportedOperation(other.to_string())),
    }
}

fn arity(op: &str, expected: usize, actual: usize) -> LoweringError {
    LoweringError::ArityError {
        op: op.to_string(),
        expected,
        actual,
    }
}

/// Left fold of a variadic operator: `(+ a b c)` becomes `((a + b) + c)`.
fn lower_fold(
    args: &[Node],
    params: &[Param],
    scope: &mut Scope,
    op: BinaryOp,
    op_name: &str,
) -> Result<Expr, LoweringError> {
    if args.len() < 2 {
        return Err(arity(op_name, 2, args.len()));
    }

    let mut acc = lower_node(&args[0], params, scope)?;
    for arg in &args[1..] {
        let rhs = lower_node(arg, params, scope)?;
        let lhs_ty = value_type(&acc, params, &scope.locals);
        let rhs_ty = value_type(&rhs, params, &scope.locals);
        acc = Expr::binary(op, acc, lhs_ty, rhs, rhs_ty);
    }
    Ok(acc)
}

fn lower_comparison(
    args: &[Node],
    params: &[Param],
    scope: &mut Scope,
    op: BinaryOp,
    op_name: &str,
) -> Result<Expr, LoweringError> {
    let [lhs, rhs] = args else {
        return Err(arity(op_name, 2, args.len()));
    };

    let lhs = lower_node(lhs, params, scope)?;
    let rhs = lower_node(rhs, params, scope)?;
    let lhs_ty = value_type(&lhs, params, &scope.locals);
    let rhs_ty = value_type(&rhs, params, &scope.locals);
    Ok(Expr::binary(op, lhs, lhs_ty, rhs, rhs_ty))
}

fn lower_if(args: &[Node], params: &[Param], scope: &mut Scope) -> Result<Expr, LoweringError> {
    let [condition, then_branch, else_branch] = args else {
        return Err(arity("if", 3, args.len()));
    };

    let condition = lower_node(condition, params, scope)?;
    let then_branch = lower_node(then_branch, params, scope)?;
    let else_branch = lower_node(else_branch, params, scope)?;
    let then_ty = value_type(&then_branch, params, &scope.locals);
    let else_ty = value_type(&else_branch, params, &scope.locals);
    Ok(Expr::conditional(condition, then_branch, then_ty, else_branch, else_ty))
}

/// `(let [x v y w] body)`: bindings are sequential and hoisted into locals.
fn lower_let(args: &[Node], params: &[Param], scope: &mut Scope) -> Result<Expr, LoweringError> {
    let [Node::Vector { root: bindings }, body] = args else {
        return Err(LoweringError::InvalidExpression(
            "let expects a binding vector and one body".to_string(),
        ));
    };

    if bindings.len() % 2 != 0 {
        return Err(LoweringError::InvalidExpression(
            "let bindings must come in name/value pairs".to_string(),
        ));
    }

    let mut shadowed = Vec::with_capacity(bindings.len() / 2);
    for pair in bindings.chunks(2) {
        let name = pair[0].as_symbol().ok_or_else(|| {
            LoweringError::InvalidExpression("let binding name must be a symbol".to_string())
        })?;
        if !is_identifier(name) {
            return Err(LoweringError::InvalidName(name.to_string()));
        }

        let value = lower_node(&pair[1], params, scope)?;
        let local = Local {
            name: format!("{}_{}", name, scope.locals.len()),
            ty: value_type(&value, params, &scope.locals),
            value,
        };
        shadowed.push((name, scope.bind(name, local)));
    }

    let body = lower_node(body, params, scope);

    for (name, previous) in shadowed.into_iter().rev() {
        scope.restore(name, previous);
    }
    body
}

fn value_type(value: &Expr, params: &[Param], locals: &[Local]) -> ScalarType {
    static_type(value, params, locals)
}
