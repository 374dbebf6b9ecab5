//! Translates stack-machine VM code into Hack assembly.
//!
//! Source text is tokenized, read one command at a time, and each command is
//! lowered straight to assembly; nothing is kept once emitted except the
//! counters that keep generated labels unique across the whole run.

pub mod bootstrap;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod translator;

mod test_utils;

pub use codegen::CodeGen;
pub use error::{Position, Result, TranslateError};
pub use parser::{ArithmeticOp, Command, Parser, Segment};
pub use translator::{discover, Options, Sources, Translator};
