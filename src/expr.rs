//! Expression nodes of the syntax tree.

use crate::token::Token;

/// Identity of a node that names a binding (`Variable`, `Assign`, `This`,
/// `Super`).  Unique within one parse; the resolver's hop counts are keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub(crate) usize);

/// Literal payload copied out of its token at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    /// Without the surrounding quotes.
    Str(String),
    True,
    False,
    Nil,
}

/// Expression nodes.  Tokens are borrowed from the scanner output, so the
/// tree lives no longer than the token vector.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    Literal(LiteralValue),

    /// `-x`, `!x`
    Unary {
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Arithmetic, comparison and equality operators.
    Binary {
        left: Box<Expr<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    Grouping(Box<Expr<'a>>),

    Variable {
        id: ExprId,
        name: &'a Token<'a>,
    },

    Assign {
        id: ExprId,
        name: &'a Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// `and` / `or`; kept apart from `Binary` because the right side may
    /// never run.
    Logical {
        left: Box<Expr<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    Call {
        callee: Box<Expr<'a>>,
        /// Closing parenthesis; runtime call errors report its line.
        paren: &'a Token<'a>,
        arguments: Vec<Expr<'a>>,
    },

    /// Property read, `object.name`.
    Get {
        object: Box<Expr<'a>>,
        name: &'a Token<'a>,
    },

    /// Property write, `object.name = value`.
    Set {
        object: Box<Expr<'a>>,
        name: &'a Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: &'a Token<'a>,
        method: &'a Token<'a>,
    },

    This {
        id: ExprId,
        keyword: &'a Token<'a>,
    },
}
