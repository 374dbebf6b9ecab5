//! Fixed code placed around the translated program: the startup sequence
//! and the halt loop that ends a standalone translation.

use crate::codegen::CodeGen;

/// First address of the stack.
pub const STACK_BASE: u16 = 256;

/// Function the startup sequence transfers control to.
pub const ENTRY_POINT: &str = "Sys.init";

/// Label of the terminating loop.
pub const HALT_LABEL: &str = "$HALT";

/// `SP = 256`, then `call Sys.init 0` through the regular call protocol so
/// the return label draws from the same counter as every other call site.
pub fn gen_init(cg: &mut CodeGen) -> Vec<String> {
    let mut asm = vec![
        format!("@{}", STACK_BASE),
        "D=A".to_string(),
        "@SP".to_string(),
        "M=D".to_string(),
    ];
    asm.extend(cg.gen_call_block(ENTRY_POINT, 0));
    asm
}

/// The target has no halt instruction; spin forever instead.
pub fn gen_halt() -> Vec<String> {
    vec![
        format!("({})", HALT_LABEL),
        format!("@{}", HALT_LABEL),
        "0;JMP".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::test_utils::hack::{Hack, ARG, LCL, SP};

    fn program(body: &str, halt: bool) -> String {
        let mut cg = CodeGen::new();
        let mut asm = gen_init(&mut cg);
        cg.set_module("Sys");
        let mut parser = Parser::from_source(body).unwrap();
        while parser.has_next() {
            asm.extend(cg.gen_block(&parser.next_command().unwrap()).unwrap());
        }
        if halt {
            asm.extend(gen_halt());
        }
        asm.join("\n")
    }

    #[test]
    fn init_sets_up_stack_and_calls_entry() {
        let asm = program(
            "function Sys.init 1\npush constant 3\npop static 0\nlabel HOLD\ngoto HOLD",
            false,
        );
        assert!(asm.starts_with("@256\nD=A\n@SP\nM=D\n"));
        assert!(asm.contains("(Sys.init$ret$0)"));

        let mut hack = Hack::assemble(&asm);
        hack.run_until(hack.label("Sys.init$HOLD"));
        // five saved words plus one zeroed local
        assert_eq!(hack.ram[SP], 262);
        assert_eq!(hack.ram[LCL], 261);
        assert_eq!(hack.ram[ARG], 256);
        assert_eq!(hack.ram[261], 0);
        assert_eq!(hack.ram[16], 3);
    }

    #[test]
    fn bootstrap_call_shares_the_call_counter() {
        let asm = program("function Sys.init 0\ncall Sys.init 0", false);
        assert!(asm.contains("(Sys.init$ret$0)"));
        assert!(asm.contains("(Sys.init$ret$1)"));
    }

    #[test]
    fn halt_loop_spins_on_itself() {
        let asm = gen_halt().join("\n");
        let mut hack = Hack::assemble(&asm);
        let halt = hack.label(HALT_LABEL);
        assert_eq!(halt, Some(0));
        // one lap returns to the loop head
        hack.run_until(Some(1));
        hack.run_until(halt);
        assert_eq!(asm, "($HALT)\n@$HALT\n0;JMP");
    }
}
