use log::trace;

use crate::error::{Result, TranslateError};
use crate::lexer::MAX_LITERAL;
use crate::parser::{ArithmeticOp, Command, Segment, MAX_ARGS};

/// Holds the state that must survive across commands and source units:
/// the naming context and the counters that keep generated labels unique.
#[derive(Debug, Default)]
pub struct CodeGen {
    module: Option<String>,
    function: Option<String>,
    jmps: usize,
    calls: usize,
}

impl CodeGen {
    pub fn new() -> CodeGen {
        CodeGen::default()
    }

    /// Start a new source unit. Counters carry over; the function scope does not.
    pub fn set_module(&mut self, name: &str) {
        self.module = Some(name.to_string());
        self.function = None;
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    fn get_jmp_id(&mut self) -> usize {
        let jmp_id = self.jmps;
        self.jmps += 1;
        jmp_id
    }

    fn get_return_label(&mut self, callee: &str) -> String {
        let call_id = self.calls;
        self.calls += 1;
        format!("{}$ret${}", callee, call_id)
    }

    /// User labels live in the namespace of the enclosing function, or of
    /// the module for code outside any function.
    fn scoped_label(&self, name: &str) -> String {
        let scope = self
            .function
            .as_deref()
            .or(self.module.as_deref())
            .unwrap_or("");
        format!("{}${}", scope, name)
    }

    fn get_static_variable(&self, index: u16) -> Result<String> {
        match &self.module {
            Some(module) => Ok(format!("{}.{}", module, index)),
            None => Err(TranslateError::NoModule),
        }
    }

    fn push_d(asm: &mut Vec<String>) {
        asm.push("@SP".to_string());
        asm.push("A=M".to_string());
        asm.push("M=D".to_string());
        asm.push("@SP".to_string());
        asm.push("M=M+1".to_string());
    }

    fn pop_d(asm: &mut Vec<String>) {
        asm.push("@SP".to_string());
        asm.push("AM=M-1".to_string());
        asm.push("D=M".to_string());
    }

    /// Symbol whose memory word is the segment slot, for segments that do not
    /// need a base pointer.
    fn direct_address(&self, segment: Segment, index: u16) -> Result<Option<String>> {
        if let Some((base, _)) = segment.fixed_base() {
            return Ok(Some(format!("R{}", base + index)));
        }
        if let Segment::Static = segment {
            return Ok(Some(self.get_static_variable(index)?));
        }
        Ok(None)
    }

    fn gen_push(&self, segment: Segment, index: u16) -> Result<Vec<String>> {
        let mut asm = Vec::new();

        if let Segment::Constant = segment {
            asm.push(format!("@{}", index));
            asm.push("D=A".to_string());
        } else if let Some(address) = self.direct_address(segment, index)? {
            asm.push(format!("@{}", address));
            asm.push("D=M".to_string());
        } else if let Some(base) = segment.base_pointer() {
            // offset segment by index
            asm.push(format!("@{}", base));
            asm.push("D=M".to_string());
            asm.push(format!("@{}", index));
            asm.push("A=D+A".to_string());
            asm.push("D=M".to_string());
        }

        CodeGen::push_d(&mut asm);
        Ok(asm)
    }

    fn gen_pop(&self, segment: Segment, index: u16) -> Result<Vec<String>> {
        let mut asm = Vec::new();

        if let Some(address) = self.direct_address(segment, index)? {
            CodeGen::pop_d(&mut asm);
            asm.push(format!("@{}", address));
            asm.push("M=D".to_string());
            return Ok(asm);
        }

        let base = segment.base_pointer().ok_or_else(|| TranslateError::Unencodable {
            command: format!("pop {} {}", segment, index),
            reason: "segment is not addressable".to_string(),
        })?;

        // park the target address in R13 while the stack is popped
        asm.push(format!("@{}", base));
        asm.push("D=M".to_string());
        asm.push(format!("@{}", index));
        asm.push("D=D+A".to_string());
        asm.push("@R13".to_string());
        asm.push("M=D".to_string());
        CodeGen::pop_d(&mut asm);
        asm.push("@R13".to_string());
        asm.push("A=M".to_string());
        asm.push("M=D".to_string());

        Ok(asm)
    }

    fn gen_unary_block(&self, operation: &str) -> Vec<String> {
        vec![
            "@SP".to_string(),
            "A=M-1".to_string(),
            operation.to_string(),
        ]
    }

    fn gen_binary_block(&self, operation: &str) -> Vec<String> {
        let mut asm = Vec::new();
        CodeGen::pop_d(&mut asm);
        asm.push("A=A-1".to_string());
        asm.push(operation.to_string());
        asm
    }

    fn gen_comparison_block(&mut self, cnd_jmp: &str) -> Vec<String> {
        let jmp_id = self.get_jmp_id();
        let if_match = format!("{}_TRUE${}", cnd_jmp, jmp_id);
        let done = format!("{}_END${}", cnd_jmp, jmp_id);

        let mut asm = Vec::new();
        // D = x - y, A at x
        CodeGen::pop_d(&mut asm);
        asm.push("A=A-1".to_string());
        asm.push("D=M-D".to_string());

        asm.push(format!("@{}", if_match));
        asm.push(format!("D;{}", cnd_jmp));

        // false is all bits clear
        asm.push("@SP".to_string());
        asm.push("A=M-1".to_string());
        asm.push("M=0".to_string());
        asm.push(format!("@{}", done));
        asm.push("0;JMP".to_string());

        // true is all bits set
        asm.push(format!("({})", if_match));
        asm.push("@SP".to_string());
        asm.push("A=M-1".to_string());
        asm.push("M=-1".to_string());
        asm.push(format!("({})", done));

        asm
    }

    fn gen_arithmetic_block(&mut self, op: ArithmeticOp) -> Vec<String> {
        match op {
            ArithmeticOp::Add => self.gen_binary_block("M=D+M"),
            ArithmeticOp::Sub => self.gen_binary_block("M=M-D"),
            ArithmeticOp::And => self.gen_binary_block("M=D&M"),
            ArithmeticOp::Or => self.gen_binary_block("M=D|M"),
            ArithmeticOp::Neg => self.gen_unary_block("M=-M"),
            ArithmeticOp::Not => self.gen_unary_block("M=!M"),
            ArithmeticOp::Eq => self.gen_comparison_block("JEQ"),
            ArithmeticOp::Gt => self.gen_comparison_block("JGT"),
            ArithmeticOp::Lt => self.gen_comparison_block("JLT"),
        }
    }

    fn gen_goto_block(&self, target: &str) -> Vec<String> {
        vec![format!("@{}", target), "0;JMP".to_string()]
    }

    fn gen_if_goto_block(&self, name: &str) -> Vec<String> {
        let mut asm = Vec::new();
        CodeGen::pop_d(&mut asm);
        asm.push(format!("@{}", self.scoped_label(name)));
        asm.push("D;JNE".to_string());
        asm
    }

    fn gen_function_block(&mut self, name: &str, locals: u16) -> Vec<String> {
        self.function = Some(name.to_string());

        let jmp_id = self.get_jmp_id();
        let init_loop = format!("{}$INIT_LOOP${}", name, jmp_id);
        let init_end = format!("{}$INIT_END${}", name, jmp_id);

        let mut asm = Vec::new();
        asm.push(format!("({})", name));

        // D counts the locals still to be zeroed
        asm.push(format!("@{}", locals));
        asm.push("D=A".to_string());
        asm.push(format!("({})", init_loop));
        asm.push(format!("@{}", init_end));
        asm.push("D;JEQ".to_string());
        asm.push("@SP".to_string());
        asm.push("A=M".to_string());
        asm.push("M=0".to_string());
        asm.push("@SP".to_string());
        asm.push("M=M+1".to_string());
        asm.push("D=D-1".to_string());
        asm.push(format!("@{}", init_loop));
        asm.push("0;JMP".to_string());
        asm.push(format!("({})", init_end));

        asm
    }

    /// Lower `call name args`. Also used by the bootstrap sequence.
    pub(crate) fn gen_call_block(&mut self, name: &str, args: u16) -> Vec<String> {
        let return_label = self.get_return_label(name);
        let mut asm = Vec::new();

        asm.push(format!("@{}", return_label));
        asm.push("D=A".to_string());
        CodeGen::push_d(&mut asm);

        for register in ["LCL", "ARG", "THIS", "THAT"] {
            asm.push(format!("@{}", register));
            asm.push("D=M".to_string());
            CodeGen::push_d(&mut asm);
        }

        // ARG = SP - args - 5
        asm.push("@SP".to_string());
        asm.push("D=M".to_string());
        asm.push(format!("@{}", args + 5));
        asm.push("D=D-A".to_string());
        asm.push("@ARG".to_string());
        asm.push("M=D".to_string());

        // LCL = SP
        asm.push("@SP".to_string());
        asm.push("D=M".to_string());
        asm.push("@LCL".to_string());
        asm.push("M=D".to_string());

        asm.extend(self.gen_goto_block(name));
        asm.push(format!("({})", return_label));

        asm
    }

    fn gen_return_block(&self) -> Vec<String> {
        let mut asm = Vec::new();

        // R13 = frame
        asm.push("@LCL".to_string());
        asm.push("D=M".to_string());
        asm.push("@R13".to_string());
        asm.push("M=D".to_string());

        // R14 = *(frame - 5)
        asm.push("@5".to_string());
        asm.push("A=D-A".to_string());
        asm.push("D=M".to_string());
        asm.push("@R14".to_string());
        asm.push("M=D".to_string());

        // *ARG = pop()
        CodeGen::pop_d(&mut asm);
        asm.push("@ARG".to_string());
        asm.push("A=M".to_string());
        asm.push("M=D".to_string());

        // SP = ARG + 1
        asm.push("@ARG".to_string());
        asm.push("D=M+1".to_string());
        asm.push("@SP".to_string());
        asm.push("M=D".to_string());

        // walk the saved frame downwards
        for register in ["THAT", "THIS", "ARG", "LCL"] {
            asm.push("@R13".to_string());
            asm.push("AM=M-1".to_string());
            asm.push("D=M".to_string());
            asm.push(format!("@{}", register));
            asm.push("M=D".to_string());
        }

        asm.push("@R14".to_string());
        asm.push("A=M".to_string());
        asm.push("0;JMP".to_string());

        asm
    }

    /// Commands built outside the reader skip its range checks; every
    /// immediate the lowering emits must still fit an A-instruction.
    fn check_operands(command: &Command) -> Result<()> {
        let unencodable = |reason: String| {
            Err(TranslateError::Unencodable {
                command: command.to_string(),
                reason,
            })
        };
        match command {
            Command::Push { segment, index } | Command::Pop { segment, index } => {
                if let Some((_, max)) = segment.fixed_base() {
                    if *index > max {
                        return unencodable(format!("{} index must be at most {}", segment, max));
                    }
                }
                if *index > MAX_LITERAL {
                    return unencodable(format!("index must be at most {}", MAX_LITERAL));
                }
                if let (Command::Pop { .. }, Segment::Constant) = (command, segment) {
                    return unencodable("constant is not addressable".to_string());
                }
            }
            Command::Function { locals, .. } if *locals > MAX_LITERAL => {
                return unencodable(format!("local count must be at most {}", MAX_LITERAL));
            }
            Command::Call { args, .. } if *args > MAX_ARGS => {
                return unencodable(format!("argument count must be at most {}", MAX_ARGS));
            }
            _ => {}
        }
        Ok(())
    }

    /// Lower one command into target assembly lines.
    pub fn gen_block(&mut self, command: &Command) -> Result<Vec<String>> {
        CodeGen::check_operands(command)?;
        let asm = match command {
            Command::Arithmetic { op } => self.gen_arithmetic_block(*op),
            Command::Push { segment, index } => self.gen_push(*segment, *index)?,
            Command::Pop { segment, index } => self.gen_pop(*segment, *index)?,
            Command::Label { name } => vec![format!("({})", self.scoped_label(name))],
            Command::Goto { name } => self.gen_goto_block(&self.scoped_label(name)),
            Command::IfGoto { name } => self.gen_if_goto_block(name),
            Command::Function { name, locals } => self.gen_function_block(name, *locals),
            Command::Call { name, args } => self.gen_call_block(name, *args),
            Command::Return => self.gen_return_block(),
            Command::Undefined { token, pos } => {
                return Err(TranslateError::UndefinedCommand {
                    pos: *pos,
                    token: token.clone(),
                })
            }
        };
        trace!("{} => {} lines", command, asm.len());
        Ok(asm)
    }
}
