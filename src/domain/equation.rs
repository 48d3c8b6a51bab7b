// ============================================================
// Layer 3 — Equation Evaluator
// ============================================================
// Evaluates a decoded equation after substituting number
// placeholders with the literals extracted from the question.
//
//   tokens:  ["(", "number0", "+", "number1", ")", "*", "2"]
//   numbers: [3.0, 4.0]
//   result:  14.0
//
// Placeholders are written either `number<i>` or `N<i>` and
// refer to position i of the number list.
//
// Precedence, lowest to highest:
//   + -        left associative
//   * /        left associative
//   unary + -
//   ^ or **    right associative
//
// Every failure is returned as an EvalError. Decoder output
// early in training is mostly garbage, so callers treat an
// error as "incorrect" rather than as a fault.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("empty equation")]
    Empty,

    #[error("unknown token '{0}'")]
    UnknownToken(String),

    #[error("placeholder '{token}' has no number (only {available} available)")]
    MissingNumber { token: String, available: usize },

    #[error("unexpected end of equation")]
    UnexpectedEnd,

    #[error("unexpected token {0:?}")]
    UnexpectedToken(Token),

    #[error("unbalanced parentheses")]
    UnbalancedParens,

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

/// Substitute placeholders and evaluate the equation.
pub fn evaluate<S: AsRef<str>>(tokens: &[S], numbers: &[f64]) -> Result<f64, EvalError> {
    let joined = tokens
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    evaluate_str(&joined, numbers)
}

/// Same as [`evaluate`] for an equation held in a single string.
pub fn evaluate_str(equation: &str, numbers: &[f64]) -> Result<f64, EvalError> {
    let tokens = lex(equation, numbers)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let value = parser.expr()?;

    if let Some(tok) = parser.peek() {
        return Err(match tok {
            Token::RParen => EvalError::UnbalancedParens,
            other => EvalError::UnexpectedToken(other),
        });
    }
    if !value.is_finite() {
        return Err(EvalError::NonFinite);
    }
    Ok(value)
}

/// Resolve `number<i>` / `N<i>` to its index, if the word is a placeholder.
pub fn placeholder_index(word: &str) -> Option<usize> {
    let digits = word
        .strip_prefix("number")
        .or_else(|| word.strip_prefix('N'))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn lex(input: &str, numbers: &[f64]) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => { out.push(Token::Plus);   i += 1; }
            '-' => { out.push(Token::Minus);  i += 1; }
            '/' => { out.push(Token::Slash);  i += 1; }
            '^' => { out.push(Token::Caret);  i += 1; }
            '(' => { out.push(Token::LParen); i += 1; }
            ')' => { out.push(Token::RParen); i += 1; }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    out.push(Token::Caret);
                    i += 2;
                } else {
                    out.push(Token::Star);
                    i += 1;
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| EvalError::UnknownToken(text.clone()))?;
                out.push(Token::Num(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let idx = placeholder_index(&word)
                    .ok_or_else(|| EvalError::UnknownToken(word.clone()))?;
                let value = numbers.get(idx).copied().ok_or(EvalError::MissingNumber {
                    token:     word,
                    available: numbers.len(),
                })?;
                out.push(Token::Num(value));
            }
            other => return Err(EvalError::UnknownToken(other.to_string())),
        }
    }

    Ok(out)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos:    usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut acc = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            acc = if op == Token::Plus { acc + rhs } else { acc - rhs };
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut acc = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            acc = if op == Token::Star {
                acc * rhs
            } else {
                if rhs == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                acc / rhs
            };
        }
        Ok(acc)
    }

    fn unary(&mut self) -> Result<f64, EvalError> {
        match self.peek() {
            Some(Token::Minus) => { self.pos += 1; Ok(-self.unary()?) }
            Some(Token::Plus)  => { self.pos += 1; self.unary() }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Caret) {
            self.pos += 1;
            // right associative: 2 ^ 3 ^ 2 = 2 ^ 9
            let exp = self.unary()?;
            return Ok(base.powf(exp));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, EvalError> {
        match self.next() {
            Some(Token::Num(v)) => Ok(v),
            Some(Token::LParen) => {
                let v = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(v),
                    None => Err(EvalError::UnbalancedParens),
                    Some(other) => Err(EvalError::UnexpectedToken(other)),
                }
            }
            Some(other) => Err(EvalError::UnexpectedToken(other)),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_substitutes_both_placeholder_styles() {
        assert_eq!(evaluate(&toks("N0 + N1"), &[3.0, 4.0]), Ok(7.0));
        assert_eq!(evaluate(&toks("number0 - number1"), &[3.0, 4.0]), Ok(-1.0));
    }

    #[test]
    fn test_operator_precedence() {
        assert_eq!(evaluate_str("2 + 3 * 4", &[]), Ok(14.0));
        assert_eq!(evaluate_str("( 2 + 3 ) * 4", &[]), Ok(20.0));
        assert_eq!(evaluate_str("12 / 3 / 2", &[]), Ok(2.0));
        assert_eq!(evaluate_str("10 - 4 - 3", &[]), Ok(3.0));
    }

    #[test]
    fn test_power_is_right_associative_and_binds_tighter_than_unary() {
        assert_eq!(evaluate_str("2 ^ 3 ^ 2", &[]), Ok(512.0));
        assert_eq!(evaluate_str("- 2 ^ 2", &[]), Ok(-4.0));
        assert_eq!(evaluate_str("2 ** 3", &[]), Ok(8.0));
    }

    #[test]
    fn test_tokens_without_spaces() {
        assert_eq!(evaluate_str("(number0+number1)*number2", &[1.0, 2.0, 3.0]), Ok(9.0));
    }

    #[test]
    fn test_dangling_operator_is_error() {
        assert_eq!(evaluate(&toks("N0 +"), &[3.0, 4.0]), Err(EvalError::UnexpectedEnd));
    }

    #[test]
    fn test_unbalanced_parens() {
        assert_eq!(evaluate_str("( N0 + N1", &[1.0, 2.0]), Err(EvalError::UnbalancedParens));
        assert_eq!(evaluate_str("N0 + N1 )", &[1.0, 2.0]), Err(EvalError::UnbalancedParens));
    }

    #[test]
    fn test_missing_number() {
        let err = evaluate(&toks("N0 + N5"), &[1.0]).unwrap_err();
        assert!(matches!(err, EvalError::MissingNumber { available: 1, .. }));
    }

    #[test]
    fn test_unknown_and_special_tokens_rejected() {
        assert!(matches!(evaluate(&toks("N0 + <unk>"), &[1.0]), Err(EvalError::UnknownToken(_))));
        assert!(matches!(evaluate(&toks("apples + N0"), &[1.0]), Err(EvalError::UnknownToken(_))));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate(&toks("N0 / N1"), &[1.0, 0.0]), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_empty() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(evaluate(&empty, &[]), Err(EvalError::Empty));
    }

    #[test]
    fn test_adjacent_operands_rejected() {
        assert!(matches!(evaluate(&toks("N0 N1"), &[1.0, 2.0]), Err(EvalError::UnexpectedToken(_))));
    }

    #[test]
    fn test_placeholder_index() {
        assert_eq!(placeholder_index("number12"), Some(12));
        assert_eq!(placeholder_index("N3"), Some(3));
        assert_eq!(placeholder_index("N"), None);
        assert_eq!(placeholder_index("numberx"), None);
        assert_eq!(placeholder_index("Nope"), None);
    }
}
