/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    // Comparison
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Arithmetic
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Modulo (`%`)
    Modulo,

    // Logical
    /// Logical AND (`AND`, `&&`)
    And,
    /// Logical OR (`OR`, `||`)
    Or,

    // Null-coalescing
    /// Null-coalescing (`??`)
    NullCoalesce,

    /// The `k` nearest vectors of the left operand to the right operand (`KNN<k>`)
    Knn(u32),
}

impl BinOp {
    pub fn symbol(&self) -> String {
        match self {
            BinOp::Equal => "==".into(),
            BinOp::NotEqual => "!=".into(),
            BinOp::LessThan => "<".into(),
            BinOp::GreaterThan => ">".into(),
            BinOp::LessEqual => "<=".into(),
            BinOp::GreaterEqual => ">=".into(),
            BinOp::Add => "+".into(),
            BinOp::Subtract => "-".into(),
            BinOp::Multiply => "*".into(),
            BinOp::Divide => "/".into(),
            BinOp::Modulo => "%".into(),
            BinOp::And => "AND".into(),
            BinOp::Or => "OR".into(),
            BinOp::NullCoalesce => "??".into(),
            BinOp::Knn(k) => format!("KNN<{}>", k),
        }
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// `-x`
    Negate,
    /// `!x` or `NOT x`
    Not,
}
