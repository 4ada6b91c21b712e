use crate::expr::{Expr, LiteralValue};

/// Renders an expression in parenthesized prefix form, e.g.
/// `(* (- 123.0) (group 45.67))`.  Used by the `parse` subcommand.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr<'_>) -> String {
        match expr {
            Expr::Literal(literal) => Self::literal(literal),

            Expr::Grouping(inner) => Self::parenthesize("group", &[inner.as_ref()]),

            Expr::Unary { operator, right } => Self::parenthesize(operator.lexeme, &[right.as_ref()]),

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => Self::parenthesize(operator.lexeme, &[left.as_ref(), right.as_ref()]),

            Expr::Variable { name, .. } => name.lexeme.to_string(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut parts: Vec<&Expr<'_>> = vec![callee.as_ref()];
                parts.extend(arguments);
                Self::parenthesize("call", &parts)
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This { .. } => "this".to_string(),

            Expr::Super { method, .. } => format!("(super.{})", method.lexeme),
        }
    }

    fn literal(literal: &LiteralValue) -> String {
        match literal {
            // Integral numbers keep one decimal place: `1.0`, not `1`.
            LiteralValue::Number(n) if n.fract() == 0.0 => format!("{:.1}", n),
            LiteralValue::Number(n) => n.to_string(),
            LiteralValue::Str(s) => s.clone(),
            LiteralValue::True => "true".to_string(),
            LiteralValue::False => "false".to_string(),
            LiteralValue::Nil => "nil".to_string(),
        }
    }

    fn parenthesize(name: &str, exprs: &[&Expr<'_>]) -> String {
        let mut out = format!("({}", name);
        for expr in exprs {
            out.push(' ');
            out.push_str(&Self::print(expr));
        }
        out.push(')');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::runner::scan;

    fn render(source: &str) -> String {
        let (tokens, _) = scan(source);
        let expr = Parser::new(&tokens).parse_expression().expect("valid expression");
        AstPrinter::print(&expr)
    }

    #[test]
    fn nested_unary_and_grouping() {
        assert_eq!(render("-123 * (45.67)"), "(* (- 123.0) (group 45.67))");
    }

    #[test]
    fn call_without_arguments() {
        assert_eq!(render("f()"), "(call f)");
    }
}
