//! Kokiri parser: turns a rule's token stream into an expression tree.

mod parse_expr;
mod parser;

pub use parse_expr::Precedence;
pub use parser::Parser;

use kokiri_lexer::Lexer;
use kokiri_types::{ast::Expr, RuleSource};

/// Lex and parse one rule.
pub fn parse(source: &RuleSource) -> kokiri_types::Result<Expr> {
    Parser::new(Lexer::new(source)).parse()
}
