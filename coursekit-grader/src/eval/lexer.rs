// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tokenizer for the expression language.

use super::EvalError;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    /// Variable or function name. Case handling happens at lookup time.
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

/// Metric-style suffixes accepted after a number literal, as in `5k` or
/// `2u`. `%` divides by one hundred.
fn suffix_factor(c: char) -> Option<f64> {
    match c {
        '%' => Some(1e-2),
        'k' => Some(1e3),
        'M' => Some(1e6),
        'G' => Some(1e9),
        'T' => Some(1e12),
        'c' => Some(1e-2),
        'm' => Some(1e-3),
        'u' => Some(1e-6),
        'n' => Some(1e-9),
        'p' => Some(1e-12),
        _ => None,
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Caret);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else if c == 'e' || c == 'E' {
                        // Scientific notation, only when followed by an
                        // exponent; `2e` alone is `2 * e`.
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        match lookahead.peek() {
                            Some(&next) if next.is_ascii_digit() || next == '+' || next == '-' => {
                                literal.push('e');
                                chars.next();
                                if let Some(&sign) = chars.peek() {
                                    if sign == '+' || sign == '-' {
                                        literal.push(sign);
                                        chars.next();
                                    }
                                }
                            }
                            _ => break,
                        }
                    } else {
                        break;
                    }
                }

                let mut value: f64 = literal
                    .parse()
                    .map_err(|_| EvalError::InvalidNumber(literal.clone()))?;

                // A metric suffix binds to the literal only when it is not
                // the start of a longer identifier (`5m` vs `5min`).
                if let Some(&c) = chars.peek() {
                    if let Some(factor) = suffix_factor(c) {
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        let continues = lookahead
                            .peek()
                            .map(|&next| next.is_alphanumeric() || next == '_')
                            .unwrap_or(false);
                        if !continues {
                            value *= factor;
                            chars.next();
                        }
                    }
                }

                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            other => return Err(EvalError::UnexpectedCharacter(other)),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::{Token, tokenize};

    #[test]
    fn numbers_and_operators() {
        let tokens = tokenize("3.5 + x*2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(3.5),
                Token::Plus,
                Token::Ident("x".to_owned()),
                Token::Star,
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(tokenize("3e8").unwrap(), vec![Token::Number(3e8)]);
        assert_eq!(tokenize("1.5e-3").unwrap(), vec![Token::Number(1.5e-3)]);

        // `2e` is two tokens: the exponent needs digits.
        assert_eq!(
            tokenize("2e").unwrap(),
            vec![Token::Number(2.0), Token::Ident("e".to_owned())]
        );
    }

    #[test]
    fn metric_suffixes() {
        assert_eq!(tokenize("5k").unwrap(), vec![Token::Number(5000.0)]);
        assert_eq!(tokenize("20%").unwrap(), vec![Token::Number(0.2)]);

        // Suffix letters followed by more identifier characters belong to
        // the identifier instead.
        assert_eq!(
            tokenize("5min").unwrap(),
            vec![Token::Number(5.0), Token::Ident("min".to_owned())]
        );
    }

    #[test]
    fn rejects_stray_characters() {
        assert!(tokenize("3 $ 4").is_err());
    }
}
