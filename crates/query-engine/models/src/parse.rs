//! Parse predicate text such as `user.age >= 16 and not user.name == None` into an
//! [`Expression`].
//!
//! Field references may carry an object variable prefix (`user.age`), which is dropped.
//! `==`/`!=` against a null literal become null checks, a bare field is shorthand for
//! `field == true`, and a literal on the left of a comparison is moved to the right.

use query_engine_metadata::metadata::ComparisonOperator;
use thiserror::Error;

use crate::expression::{Expression, Literal};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("unterminated string starting at position {position}")]
    UnterminatedString { position: usize },
    #[error("invalid number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },
    #[error("unexpected {found} at position {position}")]
    UnexpectedToken { found: String, position: usize },
    #[error("unexpected end of predicate")]
    UnexpectedEnd,
    #[error("nested field reference '{0}' is not supported")]
    NestedField(String),
    #[error("operator '{0}' cannot compare against null")]
    NullComparison(ComparisonOperator),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    Literal(Literal),
    Operator(ComparisonOperator),
    And,
    Or,
    Not,
    In,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Identifier(name) => format!("identifier '{name}'"),
            Token::Literal(literal) => format!("literal {literal}"),
            Token::Operator(operator) => format!("operator '{operator}'"),
            Token::And => "'and'".to_string(),
            Token::Or => "'or'".to_string(),
            Token::Not => "'not'".to_string(),
            Token::In => "'in'".to_string(),
            Token::OpenParen => "'('".to_string(),
            Token::CloseParen => "')'".to_string(),
            Token::OpenBracket => "'['".to_string(),
            Token::CloseBracket => "']'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

/// Parse predicate text into an expression.
pub fn parse_predicate(text: &str) -> Result<Expression, ParseError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, index: 0 };
    let expression = parser.parse_or()?;
    match parser.tokens.get(parser.index) {
        None => Ok(expression),
        Some((token, position)) => Err(ParseError::UnexpectedToken {
            found: token.describe(),
            position: *position,
        }),
    }
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = vec![];
    let mut i = 0;

    while i < chars.len() {
        let (position, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push((Token::OpenParen, position));
                i += 1;
            }
            ')' => {
                tokens.push((Token::CloseParen, position));
                i += 1;
            }
            '[' => {
                tokens.push((Token::OpenBracket, position));
                i += 1;
            }
            ']' => {
                tokens.push((Token::CloseBracket, position));
                i += 1;
            }
            ',' => {
                tokens.push((Token::Comma, position));
                i += 1;
            }
            '=' | '!' | '<' | '>' => {
                let (operator, width) = match (c, next) {
                    ('=', Some('=')) => (ComparisonOperator::Equals, 2),
                    ('=', _) => (ComparisonOperator::Equals, 1),
                    ('!', Some('=')) | ('<', Some('>')) => (ComparisonOperator::NotEquals, 2),
                    ('<', Some('=')) => (ComparisonOperator::LessThanOrEqualTo, 2),
                    ('<', _) => (ComparisonOperator::LessThan, 1),
                    ('>', Some('=')) => (ComparisonOperator::GreaterThanOrEqualTo, 2),
                    ('>', _) => (ComparisonOperator::GreaterThan, 1),
                    _ => {
                        return Err(ParseError::UnexpectedCharacter {
                            character: c,
                            position,
                        })
                    }
                };
                tokens.push((Token::Operator(operator), position));
                i += width;
            }
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                let mut j = i + 1;
                loop {
                    match chars.get(j) {
                        None => return Err(ParseError::UnterminatedString { position }),
                        Some((_, '\\')) => {
                            match chars.get(j + 1) {
                                Some((_, escaped)) => value.push(*escaped),
                                None => return Err(ParseError::UnterminatedString { position }),
                            }
                            j += 2;
                        }
                        Some((_, c)) if *c == quote => break,
                        Some((_, c)) => {
                            value.push(*c);
                            j += 1;
                        }
                    }
                }
                tokens.push((Token::Literal(Literal::String(value)), position));
                i = j + 1;
            }
            c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let mut j = i + 1;
                while chars
                    .get(j)
                    .is_some_and(|(_, c)| c.is_ascii_alphanumeric() || *c == '.')
                {
                    j += 1;
                }
                let end = chars.get(j).map_or(text.len(), |(p, _)| *p);
                let number = &text[position..end];
                let literal = if number.contains(['.', 'e', 'E']) {
                    number.parse::<f64>().map(Literal::Float).ok()
                } else {
                    number.parse::<i64>().map(Literal::Integer).ok()
                };
                match literal {
                    Some(literal) => tokens.push((Token::Literal(literal), position)),
                    None => {
                        return Err(ParseError::InvalidNumber {
                            text: number.to_string(),
                            position,
                        })
                    }
                }
                i = j;
            }
            c if c.is_alphabetic() || c == '_' || c == ':' => {
                let mut j = i + 1;
                while chars
                    .get(j)
                    .is_some_and(|(_, c)| c.is_alphanumeric() || matches!(c, '_' | '.' | ':'))
                {
                    j += 1;
                }
                let end = chars.get(j).map_or(text.len(), |(p, _)| *p);
                let word = &text[position..end];
                let token = match word {
                    "and" | "AND" => Token::And,
                    "or" | "OR" => Token::Or,
                    "not" | "NOT" => Token::Not,
                    "in" | "IN" => Token::In,
                    "None" | "null" | "NULL" => Token::Literal(Literal::Null),
                    "True" | "true" | "TRUE" => Token::Literal(Literal::Bool(true)),
                    "False" | "false" | "FALSE" => Token::Literal(Literal::Bool(false)),
                    _ => Token::Identifier(word.to_string()),
                };
                tokens.push((token, position));
                i = j;
            }
            _ => {
                return Err(ParseError::UnexpectedCharacter {
                    character: c,
                    position,
                })
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(token, _)| token)
    }

    fn peek_second(&self) -> Option<&Token> {
        self.tokens.get(self.index + 1).map(|(token, _)| token)
    }

    fn next(&mut self) -> Result<(Token, usize), ParseError> {
        let token = self
            .tokens
            .get(self.index)
            .cloned()
            .ok_or(ParseError::UnexpectedEnd)?;
        self.index += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        let (token, position) = self.next()?;
        if token == *expected {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                found: token.describe(),
                position,
            })
        }
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut expressions = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.index += 1;
            expressions.push(self.parse_and()?);
        }
        Ok(if expressions.len() == 1 {
            expressions.remove(0)
        } else {
            Expression::Or { expressions }
        })
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut expressions = vec![self.parse_not()?];
        while self.peek() == Some(&Token::And) {
            self.index += 1;
            expressions.push(self.parse_not()?);
        }
        Ok(if expressions.len() == 1 {
            expressions.remove(0)
        } else {
            Expression::And { expressions }
        })
    }

    fn parse_not(&mut self) -> Result<Expression, ParseError> {
        if self.peek() == Some(&Token::Not) {
            self.index += 1;
            Ok(self.parse_not()?.negate())
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let (token, position) = self.next()?;
        match token {
            Token::OpenParen => {
                let expression = self.parse_or()?;
                self.expect(&Token::CloseParen)?;
                Ok(expression)
            }
            Token::Identifier(name) => {
                let field = field_name(&name)?;
                match self.peek() {
                    Some(Token::Operator(operator)) => {
                        let operator = *operator;
                        self.index += 1;
                        let value = self.parse_literal()?;
                        comparison(field, operator, value)
                    }
                    Some(Token::In) => {
                        self.index += 1;
                        let values = self.parse_literal_list()?;
                        Ok(Expression::In { field, values })
                    }
                    Some(Token::Not) if self.peek_second() == Some(&Token::In) => {
                        self.index += 2;
                        let values = self.parse_literal_list()?;
                        Ok(Expression::In { field, values }.negate())
                    }
                    _ => comparison(field, ComparisonOperator::Equals, Literal::Bool(true)),
                }
            }
            Token::Literal(value) => {
                let (token, position) = self.next()?;
                let Token::Operator(operator) = token else {
                    return Err(ParseError::UnexpectedToken {
                        found: token.describe(),
                        position,
                    });
                };
                let (token, position) = self.next()?;
                let Token::Identifier(name) = token else {
                    return Err(ParseError::UnexpectedToken {
                        found: token.describe(),
                        position,
                    });
                };
                comparison(field_name(&name)?, mirror(operator), value)
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.describe(),
                position,
            }),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        match self.next()? {
            (Token::Literal(literal), _) => Ok(literal),
            (other, position) => Err(ParseError::UnexpectedToken {
                found: other.describe(),
                position,
            }),
        }
    }

    fn parse_literal_list(&mut self) -> Result<Vec<Literal>, ParseError> {
        let (open, position) = self.next()?;
        let close = match open {
            Token::OpenParen => Token::CloseParen,
            Token::OpenBracket => Token::CloseBracket,
            other => {
                return Err(ParseError::UnexpectedToken {
                    found: other.describe(),
                    position,
                })
            }
        };
        let mut values = vec![];
        loop {
            if self.peek() == Some(&close) {
                self.index += 1;
                return Ok(values);
            }
            values.push(self.parse_literal()?);
            match self.next()? {
                (Token::Comma, _) => {}
                (token, _) if token == close => return Ok(values),
                (other, position) => {
                    return Err(ParseError::UnexpectedToken {
                        found: other.describe(),
                        position,
                    })
                }
            }
        }
    }
}

/// Drop the object variable prefix of a field reference.
fn field_name(reference: &str) -> Result<String, ParseError> {
    let field = match reference.split_once('.') {
        Some((_variable, field)) => field,
        None => reference,
    };
    if field.is_empty() || field.contains('.') {
        Err(ParseError::NestedField(reference.to_string()))
    } else {
        Ok(field.to_string())
    }
}

fn comparison(
    field: String,
    operator: ComparisonOperator,
    value: Literal,
) -> Result<Expression, ParseError> {
    match (operator, value) {
        (ComparisonOperator::Equals, Literal::Null) => Ok(Expression::IsNull { field }),
        (ComparisonOperator::NotEquals, Literal::Null) => Ok(Expression::IsNull { field }.negate()),
        (operator, Literal::Null) => Err(ParseError::NullComparison(operator)),
        (operator, value) => Ok(Expression::BinaryComparison {
            field,
            operator,
            value,
        }),
    }
}

/// The operator that keeps a comparison's meaning when its operands swap sides.
fn mirror(operator: ComparisonOperator) -> ComparisonOperator {
    match operator {
        ComparisonOperator::LessThan => ComparisonOperator::GreaterThan,
        ComparisonOperator::LessThanOrEqualTo => ComparisonOperator::GreaterThanOrEqualTo,
        ComparisonOperator::GreaterThan => ComparisonOperator::LessThan,
        ComparisonOperator::GreaterThanOrEqualTo => ComparisonOperator::LessThanOrEqualTo,
        other => other,
    }
}
