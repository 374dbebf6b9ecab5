use std::fmt;

use log::debug;

use crate::error::{Position, Result, TranslateError};
use crate::lexer::{self, Token, TokenKind, MAX_LITERAL};

/// Largest argument count whose `ARG = SP - n - 5` immediate still fits.
pub const MAX_ARGS: u16 = MAX_LITERAL - 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Local,
    Argument,
    This,
    That,
    Temp,
    Pointer,
    Static,
}

impl Segment {
    pub fn new(raw: &str) -> Option<Segment> {
        match raw {
            "constant" => Some(Segment::Constant),
            "local" => Some(Segment::Local),
            "argument" => Some(Segment::Argument),
            "this" => Some(Segment::This),
            "that" => Some(Segment::That),
            "temp" => Some(Segment::Temp),
            "pointer" => Some(Segment::Pointer),
            "static" => Some(Segment::Static),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Local => "local",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Temp => "temp",
            Segment::Pointer => "pointer",
            Segment::Static => "static",
        }
    }

    /// Base pointer register for segments addressed through one.
    pub fn base_pointer(&self) -> Option<&'static str> {
        match self {
            Segment::Local => Some("LCL"),
            Segment::Argument => Some("ARG"),
            Segment::This => Some("THIS"),
            Segment::That => Some("THAT"),
            _ => None,
        }
    }

    /// First register of the fixed-address segments and the highest valid index.
    pub fn fixed_base(&self) -> Option<(u16, u16)> {
        match self {
            Segment::Temp => Some((5, 7)),
            Segment::Pointer => Some((3, 1)),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    pub fn new(raw: &str) -> Option<ArithmeticOp> {
        match raw {
            "add" => Some(ArithmeticOp::Add),
            "sub" => Some(ArithmeticOp::Sub),
            "neg" => Some(ArithmeticOp::Neg),
            "eq" => Some(ArithmeticOp::Eq),
            "gt" => Some(ArithmeticOp::Gt),
            "lt" => Some(ArithmeticOp::Lt),
            "and" => Some(ArithmeticOp::And),
            "or" => Some(ArithmeticOp::Or),
            "not" => Some(ArithmeticOp::Not),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Arithmetic { op: ArithmeticOp },
    Push { segment: Segment, index: u16 },
    Pop { segment: Segment, index: u16 },
    Label { name: String },
    Goto { name: String },
    IfGoto { name: String },
    Function { name: String, locals: u16 },
    Call { name: String, args: u16 },
    Return,
    Undefined { token: String, pos: Position },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Arithmetic { op } => f.write_str(op.mnemonic()),
            Command::Push { segment, index } => write!(f, "push {} {}", segment, index),
            Command::Pop { segment, index } => write!(f, "pop {} {}", segment, index),
            Command::Label { name } => write!(f, "label {}", name),
            Command::Goto { name } => write!(f, "goto {}", name),
            Command::IfGoto { name } => write!(f, "if-goto {}", name),
            Command::Function { name, locals } => write!(f, "function {} {}", name, locals),
            Command::Call { name, args } => write!(f, "call {} {}", name, args),
            Command::Return => f.write_str("return"),
            Command::Undefined { token, .. } => write!(f, "{} (undefined)", token),
        }
    }
}

/// Cursor over the tokens of one source unit, yielding one command at a time.
#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        Parser {
            tokens,
            position: 0,
        }
    }

    pub fn from_source(src: &str) -> Result<Parser> {
        Ok(Parser::new(lexer::tokenize(src)?))
    }

    pub fn has_next(&self) -> bool {
        self.position < self.tokens.len()
    }

    fn advance(&mut self, head: &Token) -> Result<Token> {
        let token = self
            .tokens
            .get(self.position)
            .cloned()
            .ok_or_else(|| TranslateError::UnexpectedEof {
                pos: head.pos,
                command: head.text.clone(),
            })?;
        self.position += 1;
        Ok(token)
    }

    fn symbol(&mut self, head: &Token) -> Result<String> {
        let token = self.advance(head)?;
        if token.kind != TokenKind::Word || token.text.contains('-') {
            return Err(TranslateError::InvalidSymbol {
                pos: token.pos,
                name: token.text,
            });
        }
        Ok(token.text)
    }

    /// Function names share the symbol table with statics, so `Foo.0` would
    /// alias static 0 of module `Foo`.
    fn function_name(&mut self, head: &Token) -> Result<String> {
        let pos = self.tokens.get(self.position).map_or(head.pos, |t| t.pos);
        let name = self.symbol(head)?;
        let numeric_tail = name
            .rsplit_once('.')
            .map_or(false, |(_, tail)| !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()));
        if numeric_tail {
            return Err(TranslateError::InvalidSymbol { pos, name });
        }
        Ok(name)
    }

    fn number(&mut self, head: &Token) -> Result<(u16, Position)> {
        let token = self.advance(head)?;
        match token.number() {
            Some(n) => Ok((n, token.pos)),
            None => Err(TranslateError::ExpectedNumber {
                pos: token.pos,
                command: head.text.clone(),
                found: token.text,
            }),
        }
    }

    fn segment(&mut self, head: &Token) -> Result<(Segment, u16)> {
        let token = self.advance(head)?;
        let segment = match token.kind {
            TokenKind::Word => Segment::new(&token.text),
            TokenKind::Number(_) => None,
        }
        .ok_or_else(|| TranslateError::UnknownSegment {
            pos: token.pos,
            name: token.text.clone(),
        })?;

        let (index, pos) = self.number(head)?;
        if let Some((_, max)) = segment.fixed_base() {
            if index > max {
                return Err(TranslateError::IndexOutOfRange {
                    pos,
                    segment: segment.name().to_string(),
                    index,
                    max,
                });
            }
        }
        Ok((segment, index))
    }

    /// Consume the tokens of the next command.
    pub fn next_command(&mut self) -> Result<Command> {
        let head = self
            .tokens
            .get(self.position)
            .cloned()
            .ok_or(TranslateError::Exhausted)?;
        self.position += 1;

        if let Some(op) = ArithmeticOp::new(&head.text) {
            return Ok(Command::Arithmetic { op });
        }

        let command = match head.text.as_str() {
            "label" => Command::Label {
                name: self.symbol(&head)?,
            },
            "goto" => Command::Goto {
                name: self.symbol(&head)?,
            },
            "if-goto" => Command::IfGoto {
                name: self.symbol(&head)?,
            },
            "push" => {
                let (segment, index) = self.segment(&head)?;
                Command::Push { segment, index }
            }
            "pop" => {
                let (segment, index) = self.segment(&head)?;
                if segment == Segment::Constant {
                    return Err(TranslateError::PopConstant { pos: head.pos });
                }
                Command::Pop { segment, index }
            }
            "function" => {
                let name = self.function_name(&head)?;
                let (locals, _) = self.number(&head)?;
                Command::Function { name, locals }
            }
            "call" => {
                let name = self.function_name(&head)?;
                let (args, pos) = self.number(&head)?;
                if args > MAX_ARGS {
                    return Err(TranslateError::IndexOutOfRange {
                        pos,
                        segment: "call arguments".to_string(),
                        index: args,
                        max: MAX_ARGS,
                    });
                }
                Command::Call { name, args }
            }
            "return" => Command::Return,
            _ => Command::Undefined {
                token: head.text.clone(),
                pos: head.pos,
            },
        };

        debug!("{}: {:?}", head.pos, command);
        Ok(command)
    }
}
