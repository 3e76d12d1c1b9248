use crate::db::SqlValue;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl LogicalOp {
    pub fn sql(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::Not => "NOT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterFunction {
    Contains,
    StartsWith,
    EndsWith,
}

impl FilterFunction {
    /// Wrap a literal into the LIKE pattern this function stands for.
    pub fn pattern(&self, value: &str) -> String {
        match self {
            FilterFunction::Contains => format!("%{}%", value),
            FilterFunction::StartsWith => format!("{}%", value),
            FilterFunction::EndsWith => format!("%{}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Null,
    True,
    False,
}

impl Literal {
    /// SQL Server spelling: booleans are bit values.
    pub fn sql(&self) -> &'static str {
        match self {
            Literal::Null => "NULL",
            Literal::True => "1",
            Literal::False => "0",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    Operator(CompareOp),
    Logical(LogicalOp),
    Function(FilterFunction),
    String(String),
    Number(SqlValue),
    Datetime(String),
    Literal(Literal),
    LeftParen,
    RightParen,
    Comma,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// True when the next ten characters spell `YYYY-MM-DD`.
    fn at_date_head(&self) -> bool {
        let digits = |mut range: std::ops::Range<usize>| {
            range.all(|i| {
                self.input
                    .get(self.position + i)
                    .map(|c| c.is_ascii_digit())
                    .unwrap_or(false)
            })
        };
        let dash =
            |i: usize| self.input.get(self.position + i).copied() == Some('-');

        digits(0..4) && dash(4) && digits(5..7) && dash(7) && digits(8..10)
    }

    fn read_datetime(&mut self) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() || matches!(ch, ':' | '.' | '-' | 'T' | 'Z' | '+') {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        // The literal text rides through to the parameter untouched.
        Token::Datetime(text)
    }

    fn read_number(&mut self) -> ApiResult<Token> {
        let mut text = String::new();
        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() || matches!(ch, '.' | 'e' | 'E' | '+' | '-') {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if !text.contains('.') && !text.contains('e') && !text.contains('E') {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Token::Number(SqlValue::Int(i)));
            }
        }
        text.parse::<f64>()
            .map(|f| Token::Number(SqlValue::Float(f)))
            .map_err(|_| ApiError::InvalidFilter(format!("Invalid number: {}", text)))
    }

    fn read_string(&mut self) -> ApiResult<Token> {
        self.advance(); // skip opening quote

        let mut string = String::new();
        while let Some(ch) = self.current_char {
            if ch == '\'' {
                // two consecutive quotes inside the literal mean one quote
                if self.input.get(self.position + 1).copied() == Some('\'') {
                    string.push('\'');
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    return Ok(Token::String(string));
                }
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(ApiError::InvalidFilter(
            "Unterminated string literal".to_string(),
        ))
    }

    fn read_word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match word.to_ascii_lowercase().as_str() {
            "eq" => Token::Operator(CompareOp::Eq),
            "ne" => Token::Operator(CompareOp::Ne),
            "gt" => Token::Operator(CompareOp::Gt),
            "ge" => Token::Operator(CompareOp::Ge),
            "lt" => Token::Operator(CompareOp::Lt),
            "le" => Token::Operator(CompareOp::Le),
            "and" => Token::Logical(LogicalOp::And),
            "or" => Token::Logical(LogicalOp::Or),
            "not" => Token::Logical(LogicalOp::Not),
            "contains" => Token::Function(FilterFunction::Contains),
            "startswith" => Token::Function(FilterFunction::StartsWith),
            "endswith" => Token::Function(FilterFunction::EndsWith),
            "null" => Token::Literal(Literal::Null),
            "true" => Token::Literal(Literal::True),
            "false" => Token::Literal(Literal::False),
            // field names keep their original case
            _ => Token::Identifier(word),
        }
    }

    pub fn next_token(&mut self) -> ApiResult<Option<Token>> {
        self.skip_whitespace();

        let token = match self.current_char {
            None => return Ok(None),

            Some('\'') => return self.read_string().map(Some),

            Some(ch) if ch.is_ascii_digit() || ch == '.' || ch == '-' => {
                if self.at_date_head() {
                    return Ok(Some(self.read_datetime()));
                }
                return self.read_number().map(Some);
            }

            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                return Ok(Some(self.read_word()));
            }

            Some('(') => {
                self.advance();
                Token::LeftParen
            }
            Some(')') => {
                self.advance();
                Token::RightParen
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }

            Some(ch) => return Err(ApiError::UnexpectedCharacter(ch)),
        };

        Ok(Some(token))
    }

    pub fn tokenize(&mut self) -> ApiResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}
