/// Binary operators, lowest-binding first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Logical
    /// Logical OR (`or`)
    Or,
    /// Logical AND (`and`)
    And,

    // Comparison
    /// Equal (`eq`)
    Equal,
    /// Not equal (`ne`)
    NotEqual,
    /// Greater than (`gt`)
    GreaterThan,
    /// Greater than or equal (`ge`)
    GreaterThanOrEqual,
    /// Less than (`lt`)
    LessThan,
    /// Less than or equal (`le`)
    LessThanOrEqual,

    // Arithmetic
    /// Addition (`add`)
    Add,
    /// Subtraction (`sub`)
    Subtract,
    /// Multiplication (`mul`)
    Multiply,
    /// Division (`div`)
    Divide,
    /// Modulo (`mod`)
    Modulo,
}

impl BinaryOp {
    /// The keyword this operator is spelled with on the wire.
    pub fn odata_keyword(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Equal => "eq",
            BinaryOp::NotEqual => "ne",
            BinaryOp::GreaterThan => "gt",
            BinaryOp::GreaterThanOrEqual => "ge",
            BinaryOp::LessThan => "lt",
            BinaryOp::LessThanOrEqual => "le",
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "sub",
            BinaryOp::Multiply => "mul",
            BinaryOp::Divide => "div",
            BinaryOp::Modulo => "mod",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation (`-`)
    Negate,
    /// Logical negation (`not`)
    Not,
}
