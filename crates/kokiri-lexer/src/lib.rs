//! Kokiri lexer: turns rule text into tokens, one at a time.

pub mod lexer;
pub mod token;

pub use lexer::Lexer;
pub use token::{keyword, Token, TokenKind, KEYWORDS};
