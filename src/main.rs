use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use vm_translator::{discover, Options, Translator};

#[derive(Parser, Debug)]
#[command(author, version, about = "Translate VM code into Hack assembly")]
struct Config {
    /// A .vm file or a directory of .vm files
    src: PathBuf,

    /// Output file (default: <file>.asm, or <dir>/<dir>.asm)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not emit the SP/Sys.init startup sequence
    #[arg(long)]
    no_bootstrap: bool,

    /// Do not annotate each block with its VM command
    #[arg(long)]
    no_comments: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Config {
    fn log_level(&self) -> LevelFilter {
        if env::var("DEBUG").is_ok() {
            return LevelFilter::Debug;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn main() -> Result<()> {
    let config = Config::parse();
    env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .init();

    let sources = discover(&config.src)?;
    let binname = config.output.clone().unwrap_or(sources.output);
    let mut translator = Translator::new(Options {
        bootstrap: !config.no_bootstrap,
        halt: sources.standalone,
        comments: !config.no_comments,
    });

    for file in &sources.files {
        println!("translating {}", file.display());
        translator
            .translate_file(file)
            .with_context(|| format!("failed to translate {}", file.display()))?;
    }
    translator.finish();

    translator.write_bin(&binname, &config.src.display().to_string())?;
    info!("{} blocks", translator.asm.len());
    println!("written to {}", binname.display());

    Ok(())
}
