use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use clap_stdin::FileOrStdin;
use tracing::{info, Level};

use tinyc::{error::CompileResult, lexer::Lexer};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Source file to compile, or `-` to read stdin
    input: FileOrStdin,

    /// Where to write the generated assembly
    #[arg(short, long, default_value = "output.asm")]
    output: PathBuf,

    /// Print the token sequence to stderr
    #[arg(long)]
    dump_tokens: bool,

    /// Print the syntax tree to stderr
    #[arg(long)]
    dump_ast: bool,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let filename = args.input.filename().to_string();
    let user_input = args
        .input
        .contents()
        .with_context(|| format!("reading {filename}"))?;
    info!(input = %filename, "compiling");

    if args.dump_tokens || args.dump_ast {
        dump_stages(&user_input, args.dump_tokens, args.dump_ast)
            .with_context(|| format!("compiling {filename}"))?;
    }

    let asm = tinyc::compile(&user_input).with_context(|| format!("compiling {filename}"))?;

    fs::write(&args.output, asm)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(output = %args.output.display(), "wrote assembly");

    Ok(())
}

/// Prints the intermediate stages the flags ask for to stderr.
fn dump_stages(user_input: &str, tokens: bool, ast: bool) -> CompileResult<()> {
    let token_list = Lexer::tokenize(user_input)?;
    if tokens {
        eprintln!("{token_list:#?}");
    }

    if ast {
        let program = tinyc::parser::Parser::new(token_list).parse()?;
        eprintln!("{program:#?}");
    }

    Ok(())
}
