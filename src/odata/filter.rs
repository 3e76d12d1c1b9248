//! `$filter` compilation into a parameterized WHERE fragment.
//!
//! The compiler walks the token stream linearly and emits SQL text token by
//! token. Field names pass through the resource whitelist and come out as
//! backend columns; every literal value becomes a fresh `@filterN`
//! parameter, never SQL text. Parentheses are copied through unchecked;
//! AND/OR precedence on the server matches OData's, so the caller's grouping
//! survives intact.

use crate::db::{Params, SqlValue};
use crate::error::{ApiError, ApiResult};
use crate::odata::lexer::{Lexer, Token};
use crate::resource::Resource;

#[derive(Debug, Clone, PartialEq)]
pub struct WhereFragment {
    pub sql: String,
    pub params: Params,
}

struct Emitter {
    sql: String,
    params: Params,
}

impl Emitter {
    fn new() -> Self {
        Self {
            sql: String::new(),
            params: Params::new(),
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Emit with a single separating space before, unless at a boundary
    /// where one would be redundant.
    fn push_spaced(&mut self, text: &str) {
        if !self.sql.is_empty() && !self.sql.ends_with(' ') && !self.sql.ends_with('(') {
            self.sql.push(' ');
        }
        self.sql.push_str(text);
        self.sql.push(' ');
    }

    /// Allocate the next `@filterN` parameter and emit its marker.
    fn bind(&mut self, value: SqlValue) {
        let name = format!("filter{}", self.params.len());
        self.push(&format!("@{}", name));
        self.params.push((name, value));
    }
}

pub fn compile_filter(input: &str, resource: &Resource) -> ApiResult<WhereFragment> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut out = Emitter::new();

    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Identifier(name) => {
                let column = resource
                    .column(name)
                    .ok_or_else(|| ApiError::UnknownField(name.clone()))?;
                out.push(column);
            }
            Token::Operator(op) => out.push_spaced(op.sql()),
            Token::Logical(op) => out.push_spaced(op.sql()),
            Token::String(s) => out.bind(SqlValue::Str(s.clone())),
            Token::Number(n) => out.bind(n.clone()),
            Token::Datetime(d) => out.bind(SqlValue::DateTime(d.clone())),
            Token::Literal(lit) => out.push(lit.sql()),
            Token::LeftParen => out.push("("),
            Token::RightParen => out.push(")"),
            Token::Comma => {
                return Err(ApiError::InvalidFilter(
                    "Unexpected ',' outside function call".to_string(),
                ))
            }
            Token::Function(func) => {
                // fixed shape: function '(' identifier ',' string ')'
                match (
                    tokens.get(i + 1),
                    tokens.get(i + 2),
                    tokens.get(i + 3),
                    tokens.get(i + 4),
                    tokens.get(i + 5),
                ) {
                    (
                        Some(Token::LeftParen),
                        Some(Token::Identifier(field)),
                        Some(Token::Comma),
                        Some(Token::String(value)),
                        Some(Token::RightParen),
                    ) => {
                        let column = resource
                            .column(field)
                            .ok_or_else(|| ApiError::UnknownField(field.clone()))?;
                        out.push(column);
                        out.push_spaced("LIKE");
                        out.bind(SqlValue::Str(func.pattern(value)));
                    }
                    _ => {
                        return Err(ApiError::InvalidFilter(
                            "Expected function(Field, 'value')".to_string(),
                        ))
                    }
                }
                i += 5;
            }
        }
        i += 1;
    }

    Ok(WhereFragment {
        sql: out.sql.trim_end().to_string(),
        params: out.params,
    })
}
