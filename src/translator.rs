use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use log::info;

use crate::bootstrap;
use crate::codegen::CodeGen;
use crate::error::{Result, TranslateError};
use crate::parser::Parser;

#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Emit `SP = 256; call Sys.init 0` before the first unit.
    pub bootstrap: bool,
    /// Append the halt loop after the last unit.
    pub halt: bool,
    /// Write a `// <command>` line before each block.
    pub comments: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            bootstrap: true,
            halt: false,
            comments: true,
        }
    }
}

/// One translated command: its source text and the lines it lowered to.
#[derive(Debug)]
pub struct Asm {
    pub src: String,
    pub bin: Vec<String>,
}

#[derive(Debug)]
pub struct Translator {
    cg: CodeGen,
    pub asm: Vec<Asm>,
    options: Options,
    finished: bool,
}

impl Translator {
    pub fn new(options: Options) -> Translator {
        let mut cg = CodeGen::new();
        let mut asm = Vec::new();
        if options.bootstrap {
            asm.push(Asm {
                src: "// bootstrap".to_string(),
                bin: bootstrap::gen_init(&mut cg),
            });
        }
        Translator {
            cg,
            asm,
            options,
            finished: false,
        }
    }

    /// Translate one source unit. Output is committed only if the whole unit
    /// translates, so a bad unit leaves earlier units' output intact.
    pub fn translate_unit(&mut self, module: &str, src: &str) -> Result<()> {
        info!("translating module {}", module);
        self.cg.set_module(module);

        let mut staged = Vec::new();
        let mut parser = Parser::from_source(src).map_err(|e| e.in_unit(module))?;
        while parser.has_next() {
            let command = parser.next_command().map_err(|e| e.in_unit(module))?;
            let bin = self.cg.gen_block(&command).map_err(|e| e.in_unit(module))?;
            staged.push(Asm {
                src: format!("// {}", command),
                bin,
            });
        }

        info!("{}: {} commands", module, staged.len());
        self.asm.extend(staged);
        Ok(())
    }

    /// Translate a `.vm` file; its stem names the module.
    pub fn translate_file(&mut self, path: &Path) -> Result<()> {
        let src = fs::read_to_string(path).map_err(|source| TranslateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let module = module_name(path).unwrap_or_default();
        self.translate_unit(&module, &src)
    }

    /// Close the program, appending the halt loop if requested. Idempotent.
    pub fn finish(&mut self) {
        if self.options.halt && !self.finished {
            self.asm.push(Asm {
                src: "// halt".to_string(),
                bin: bootstrap::gen_halt(),
            });
        }
        self.finished = true;
    }

    pub fn write_to<W: Write>(&self, out: &mut W, source_name: &str) -> io::Result<()> {
        writeln!(out, "// Hack ASM (for nand2tetris book) generated from VM code")?;
        writeln!(out, "// source: {}", source_name)?;
        for asm in &self.asm {
            if self.options.comments {
                write!(out, "\n{}\n", &asm.src)?;
            }
            for binline in &asm.bin {
                writeln!(out, "{}", binline)?;
            }
        }
        Ok(())
    }

    pub fn write_bin(&self, binname: &Path, source_name: &str) -> Result<()> {
        let io_err = |source| TranslateError::Io {
            path: binname.to_path_buf(),
            source,
        };
        let mut buf = Vec::new();
        self.write_to(&mut buf, source_name).map_err(io_err)?;
        fs::write(binname, buf).map_err(io_err)?;
        Ok(())
    }
}

fn module_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

fn is_vm_file(path: &Path) -> bool {
    path.is_file() && path.extension().map_or(false, |ext| ext == "vm")
}

/// The source units of one run and where their translation goes.
#[derive(Debug, PartialEq, Eq)]
pub struct Sources {
    pub files: Vec<PathBuf>,
    pub output: PathBuf,
    /// A single file was given rather than a directory.
    pub standalone: bool,
}

/// Resolve a `.vm` file or a directory of them.
pub fn discover(path: &Path) -> anyhow::Result<Sources> {
    if path.is_dir() {
        let mut files = Vec::new();
        let entries =
            fs::read_dir(path).with_context(|| format!("reading directory {}", path.display()))?;
        for entry in entries {
            let file = entry?.path();
            if is_vm_file(&file) {
                files.push(file);
            }
        }
        if files.is_empty() {
            return Err(anyhow!("no .vm files in {}", path.display()));
        }
        files.sort();

        let dirname = fs::canonicalize(path)?
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .ok_or_else(|| anyhow!("cannot name output for {}", path.display()))?;
        let output = path.join(format!("{}.asm", dirname));
        return Ok(Sources {
            files,
            output,
            standalone: false,
        });
    }

    if !is_vm_file(path) {
        return Err(anyhow!(
            "file must be vm file or directory. (provided: {})",
            path.display()
        ));
    }
    if module_name(path).is_none() {
        return Err(anyhow!("file name is not valid UTF-8: {}", path.display()));
    }
    Ok(Sources {
        files: vec![path.to_path_buf()],
        output: path.with_extension("asm"),
        standalone: true,
    })
}
