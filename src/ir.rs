use std::fmt;

/// Scalar types understood by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int,
    Long,
    Float,
    Double,
}

impl ScalarType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(ScalarType::Bool),
            "int" => Some(ScalarType::Int),
            "long" => Some(ScalarType::Long),
            "float" => Some(ScalarType::Float),
            "double" => Some(ScalarType::Double),
            _ => None,
        }
    }

    /// Spelling used in C++ and CUDA sources.
    pub fn c_name(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Long => "long",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
        }
    }

    pub fn is_floating(self) -> bool {
        matches!(self, ScalarType::Float | ScalarType::Double)
    }

    /// Result type of an arithmetic operation on `self` and `other`.
    ///
    /// Follows the usual promotion order bool < int < long < float < double,
    /// with bool promoted to int as soon as it takes part in arithmetic.
    pub fn unify(self, other: Self) -> Self {
        let widest = self.rank().max(other.rank());
        match widest {
            0 | 1 => ScalarType::Int,
            2 => ScalarType::Long,
            3 => ScalarType::Float,
            _ => ScalarType::Double,
        }
    }

    fn rank(self) -> u8 {
        match self {
            ScalarType::Bool => 0,
            ScalarType::Int => 1,
            ScalarType::Long => 2,
            ScalarType::Float => 3,
            ScalarType::Double => 4,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,

    // Comparison
    Equal,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div)
    }

    /// Operator spelling shared by C++, CUDA and (for arithmetic and comparisons) Python.
    pub fn c_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Equal => "==",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Param(usize), // index into Function::params
    Local(usize), // index into Function::locals
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ty: ScalarType,
    },
    Not(Box<Expr>),
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
        ty: ScalarType,
    },
}

impl Expr {
    /// Build a binary node; `lhs_ty`/`rhs_ty` are the operand types.
    pub fn binary(op: BinaryOp, lhs: Expr, lhs_ty: ScalarType, rhs: Expr, rhs_ty: ScalarType) -> Expr {
        let ty = if op.is_arithmetic() {
            lhs_ty.unify(rhs_ty)
        } else {
            ScalarType::Bool
        };
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty,
        }
    }

    /// Build a conditional; the branches' types are unified unless they agree.
    pub fn conditional(condition: Expr, then_branch: Expr, then_ty: ScalarType, else_branch: Expr, else_ty: ScalarType) -> Expr {
        let ty = if then_ty == else_ty {
            then_ty
        } else {
            then_ty.unify(else_ty)
        };
        Expr::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            ty,
        }
    }
}

/// Static type of `expr` given the parameters and the locals in scope.
///
/// Compound nodes carry their type, so this never recurses.
pub fn static_type(expr: &Expr, params: &[Param], locals: &[Local]) -> ScalarType {
    match expr {
        Expr::Integer(_) => ScalarType::Int,
        Expr::Decimal(_) => ScalarType::Double,
        Expr::Boolean(_) | Expr::Not(_) => ScalarType::Bool,
        Expr::Param(index) => params.get(*index).map_or(ScalarType::Double, |p| p.ty),
        Expr::Local(index) => locals.get(*index).map_or(ScalarType::Double, |l| l.ty),
        Expr::Binary { ty, .. } | Expr::If { ty, .. } => *ty,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ScalarType,
}

/// A `let`-bound value hoisted to function scope.
///
/// Locals are evaluated in order before the body; each one may only refer
/// to parameters and to locals that precede it.
#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    pub name: String,
    pub ty: ScalarType,
    pub value: Expr,
}

/// Backend IR for a single function.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub result: ScalarType,
    pub locals: Vec<Local>,
    pub body: Expr,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Static type of an expression inside this function.
    pub fn type_of(&self, expr: &Expr) -> ScalarType {
        static_type(expr, &self.params, &self.locals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Function {
        Function {
            name: "scale".to_string(),
            params: vec![
                Param { name: "n".to_string(), ty: ScalarType::Int },
                Param { name: "x".to_string(), ty: ScalarType::Float },
            ],
            result: ScalarType::Double,
            locals: vec![],
            body: Expr::binary(BinaryOp::Mul, Expr::Param(0), ScalarType::Int, Expr::Param(1), ScalarType::Float),
        }
    }

    #[test]
    fn test_type_names_round_trip() {
        for ty in [ScalarType::Bool, ScalarType::Int, ScalarType::Long, ScalarType::Float, ScalarType::Double] {
            assert_eq!(ScalarType::from_name(ty.c_name()), Some(ty));
        }
        assert_eq!(ScalarType::from_name("complex"), None);
    }

    #[test]
    fn test_unify_promotes() {
        assert_eq!(ScalarType::Bool.unify(ScalarType::Bool), ScalarType::Int);
        assert_eq!(ScalarType::Int.unify(ScalarType::Long), ScalarType::Long);
        assert_eq!(ScalarType::Float.unify(ScalarType::Int), ScalarType::Float);
        assert_eq!(ScalarType::Double.unify(ScalarType::Float), ScalarType::Double);
    }

    #[test]
    fn test_type_of_expressions() {
        let function = sample();
        assert_eq!(function.arity(), 2);
        assert_eq!(function.type_of(&function.body), ScalarType::Float);

        let comparison = Expr::binary(BinaryOp::Less, Expr::Param(0), ScalarType::Int, Expr::Integer(3), ScalarType::Int);
        assert_eq!(function.type_of(&comparison), ScalarType::Bool);

        let branch = Expr::conditional(
            Expr::Boolean(true),
            Expr::Boolean(true),
            ScalarType::Bool,
            Expr::Boolean(false),
            ScalarType::Bool,
        );
        assert_eq!(function.type_of(&branch), ScalarType::Bool);

        let mixed = Expr::conditional(
            Expr::Boolean(true),
            Expr::Param(0),
            ScalarType::Int,
            Expr::Decimal(0.5),
            ScalarType::Double,
        );
        assert_eq!(function.type_of(&mixed), ScalarType::Double);
    }

    #[test]
    fn test_type_of_reads_cached_node_type() {
        // A deep left fold is typed from the outermost node alone.
        let mut acc = Expr::Param(0);
        for _ in 0..2_000 {
            acc = Expr::binary(BinaryOp::Add, acc, ScalarType::Int, Expr::Integer(1), ScalarType::Int);
        }
        let function = Function {
            name: "deep".to_string(),
            params: vec![Param { name: "n".to_string(), ty: ScalarType::Int }],
            result: ScalarType::Int,
            locals: vec![],
            body: acc,
        };
        assert_eq!(function.type_of(&function.body), ScalarType::Int);
    }
}
