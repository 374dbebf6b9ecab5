//! Splits VM source text into words and number literals.
//!
//! Comments start at `//` and run to the end of the line. Anything that is
//! neither whitespace, a comment, a word, nor a number is rejected with the
//! position it was found at.

use std::{iter::Peekable, str::Chars};

use crate::error::{Position, Result, TranslateError};

/// Largest value an A-instruction can load.
pub const MAX_LITERAL: u16 = 32767;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Number(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: Position,
}

impl Token {
    pub fn number(&self) -> Option<u16> {
        match self.kind {
            TokenKind::Number(n) => Some(n),
            TokenKind::Word => None,
        }
    }
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '.' | ':')
}

fn is_word_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Lexer<'a> {
        Lexer {
            chars: src.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn take_while(&mut self, pred: fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }

    fn skip_comment(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn number(&mut self, pos: Position) -> Result<Token> {
        let mut text = self.take_while(|c| c.is_ascii_digit());
        let glued = self.chars.peek().map_or(false, |&c| is_word_continue(c));
        if glued {
            text.push_str(&self.take_while(is_word_continue));
        }

        let leading_zero = text.len() > 1 && text.starts_with('0');
        let value = match text.parse::<u16>() {
            Ok(v) if !glued && !leading_zero && v <= MAX_LITERAL => v,
            _ => return Err(TranslateError::InvalidNumber { pos, text }),
        };

        Ok(Token {
            kind: TokenKind::Number(value),
            text,
            pos,
        })
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(&c) = self.chars.peek() {
            let pos = self.pos();
            if c.is_whitespace() {
                self.bump();
            } else if c == '/' {
                self.bump();
                if self.chars.peek() != Some(&'/') {
                    return Err(TranslateError::UnexpectedChar { pos, ch: '/' });
                }
                self.skip_comment();
            } else if c.is_ascii_digit() {
                tokens.push(self.number(pos)?);
            } else if is_word_start(c) {
                let text = self.take_while(is_word_continue);
                tokens.push(Token {
                    kind: TokenKind::Word,
                    text,
                    pos,
                });
            } else {
                return Err(TranslateError::UnexpectedChar { pos, ch: c });
            }
        }

        Ok(tokens)
    }
}

/// Tokenize one source unit.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    Lexer::new(src).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        tokenize(src).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn strips_comments() {
        let src = "// header only\npush constant 7 // trailing\n\n//\nadd";
        assert_eq!(texts(src), vec!["push", "constant", "7", "add"]);
    }

    #[test]
    fn comment_without_newline_at_eof() {
        assert_eq!(texts("return // done"), vec!["return"]);
        assert!(tokenize("// nothing else").unwrap().is_empty());
    }

    #[test]
    fn words_keep_symbol_characters() {
        assert_eq!(
            texts("if-goto LOOP_START\ncall Main.fibonacci 1\nlabel a:b"),
            vec!["if-goto", "LOOP_START", "call", "Main.fibonacci", "1", "label", "a:b"]
        );
    }

    #[test]
    fn numbers_carry_values_and_positions() {
        let tokens = tokenize("push constant 0\n  pop local 17").unwrap();
        assert_eq!(tokens[2].number(), Some(0));
        assert_eq!(tokens[5].number(), Some(17));
        assert_eq!(tokens[5].pos, Position::new(2, 13));
        assert_eq!(tokens[3].pos, Position::new(2, 3));
        assert_eq!(tokens[3].number(), None);
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = tokenize("push constant 7\npush # 1").unwrap_err();
        assert!(matches!(
            err,
            TranslateError::UnexpectedChar { pos, ch: '#' } if pos == Position::new(2, 6)
        ));
    }

    #[test]
    fn rejects_single_slash() {
        assert!(matches!(
            tokenize("add / sub"),
            Err(TranslateError::UnexpectedChar { ch: '/', .. })
        ));
    }

    #[test]
    fn rejects_malformed_numbers() {
        for src in ["push constant 007", "push constant 12ab", "push constant 32768", "push constant 99999999"] {
            assert!(
                matches!(tokenize(src), Err(TranslateError::InvalidNumber { .. })),
                "{}",
                src
            );
        }
        assert_eq!(tokenize("push constant 32767").unwrap()[2].number(), Some(32767));
    }

    #[test]
    fn handles_crlf_line_endings() {
        let tokens = tokenize("push constant 1\r\nadd\r\n").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[3].pos, Position::new(2, 1));
    }
}
