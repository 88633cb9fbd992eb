//! Positional filename grammar.

use crate::constants::pattern;
use crate::error::{Error, Result};

/// Role of one delimiter-separated filename field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Field must be a member of the accepted set for its position.
    Literal,
    /// Field is ignored.
    Ignored,
    /// Field is an integer key (solar day).
    Integer,
}

/// Ordered list of field roles, e.g. `s.x.x.s.i.x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    tokens: Vec<Token>,
}

impl Grammar {
    /// Parse a grammar string whose tokens are joined by `delimiter`.
    ///
    /// Tokens are `s` (literal-match), `x` (ignorable) and `i` (integer).
    pub fn parse(grammar: &str, delimiter: &str) -> Result<Self> {
        if delimiter.is_empty() {
            return Err(Error::Grammar {
                message: "delimiter must not be empty".to_string(),
            });
        }

        let tokens = grammar
            .split(delimiter)
            .map(|token| match token {
                pattern::LITERAL => Ok(Token::Literal),
                pattern::IGNORED => Ok(Token::Ignored),
                pattern::INTEGER => Ok(Token::Integer),
                other => Err(Error::Grammar {
                    message: format!("unknown token '{other}' in grammar '{grammar}'"),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { tokens })
    }

    /// Field roles in order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of fields a matching filename has.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the grammar has no fields.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of literal-match fields.
    pub fn literal_count(&self) -> usize {
        self.count(Token::Literal)
    }

    /// Number of integer fields.
    pub fn integer_count(&self) -> usize {
        self.count(Token::Integer)
    }

    fn count(&self, kind: Token) -> usize {
        self.tokens.iter().filter(|&&t| t == kind).count()
    }
}
