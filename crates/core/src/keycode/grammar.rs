//! Keycode text grammar.
//!
//! ```text
//! expr      := sentinel | hex | composite | ident
//! sentinel  := "" | "-1"
//! hex       := "0x" HEXDIGIT+
//! composite := ident "(" ident ")"
//! ident     := [A-Za-z0-9_]+
//! ```
//!
//! The parser only classifies text; table lookups happen in the codec.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExpr<'a> {
    Sentinel,
    HexLiteral(u16),
    Plain(&'a str),
    Composite { func: &'a str, arg: &'a str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("malformed keycode expression {0:?}")]
    Malformed(String),
    #[error("hex keycode {0:?} does not fit in 16 bits")]
    HexOutOfRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    Open,
    Close,
    Other(char),
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        let token = match c {
            '(' => Token::Open,
            ')' => Token::Close,
            c if is_ident_char(c) => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, c)) = chars.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                Token::Ident(&input[start..end])
            }
            other => Token::Other(other),
        };
        tokens.push(token);
    }
    tokens
}

fn hex_digits(ident: &str) -> Option<&str> {
    ident
        .strip_prefix("0x")
        .or_else(|| ident.strip_prefix("0X"))
        .filter(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Classify keycode text.
pub fn parse_expr(input: &str) -> Result<KeyExpr<'_>, GrammarError> {
    if input.is_empty() || input == "-1" {
        return Ok(KeyExpr::Sentinel);
    }
    match tokenize(input).as_slice() {
        [Token::Ident(ident)] => match hex_digits(ident) {
            Some(digits) => u16::from_str_radix(digits, 16)
                .map(KeyExpr::HexLiteral)
                .map_err(|_| GrammarError::HexOutOfRange(input.to_string())),
            None => Ok(KeyExpr::Plain(ident)),
        },
        [Token::Ident(func), Token::Open, Token::Ident(arg), Token::Close] => {
            Ok(KeyExpr::Composite { func, arg })
        }
        _ => Err(GrammarError::Malformed(input.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels() {
        assert_eq!(parse_expr(""), Ok(KeyExpr::Sentinel));
        assert_eq!(parse_expr("-1"), Ok(KeyExpr::Sentinel));
    }

    #[test]
    fn hex_literals() {
        assert_eq!(parse_expr("0x0104"), Ok(KeyExpr::HexLiteral(0x0104)));
        assert_eq!(parse_expr("0XfF"), Ok(KeyExpr::HexLiteral(0xFF)));
        assert!(matches!(
            parse_expr("0x10000"),
            Err(GrammarError::HexOutOfRange(_))
        ));
        assert_eq!(parse_expr("0xZZ"), Ok(KeyExpr::Plain("0xZZ")));
    }

    #[test]
    fn composites() {
        assert_eq!(
            parse_expr("LCTL(KC_A)"),
            Ok(KeyExpr::Composite {
                func: "LCTL",
                arg: "KC_A"
            })
        );
        assert_eq!(
            parse_expr("MO(3)"),
            Ok(KeyExpr::Composite {
                func: "MO",
                arg: "3"
            })
        );
    }

    #[test]
    fn plain_identifiers() {
        assert_eq!(parse_expr("KC_ENT"), Ok(KeyExpr::Plain("KC_ENT")));
        assert_eq!(parse_expr("_______"), Ok(KeyExpr::Plain("_______")));
        assert_eq!(parse_expr("42"), Ok(KeyExpr::Plain("42")));
    }

    #[test]
    fn malformed_inputs() {
        for text in ["LCTL(", "LCTL(KC_A", "LCTL(KC_A))", "(KC_A)", "A B", "LCTL(S(KC_A))", "-5"] {
            assert!(
                matches!(parse_expr(text), Err(GrammarError::Malformed(_))),
                "{text}"
            );
        }
    }
}
