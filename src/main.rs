use std::fs;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;

use calc::lex::TokenKind;
use calc::parse::{DEFAULT_MAX_DEPTH, ParserConfig};
use calc::session::{Response, Step};
use calc::{Lexer, Parser, Session, SessionConfig};
use clap::{Subcommand, ValueEnum};
use miette::IntoDiagnostic;
use miette::WrapErr;

#[derive(clap::Parser, Debug)]
#[command(name = "calc", version, about = "Arbitrary-precision expression calculator")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Evaluate a line of input and exit
    #[arg(short, long)]
    eval: Option<String>,

    /// Log every scanned token and evaluation to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,

    /// Longest operator chain accepted in one expression
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, global = true)]
    max_depth: usize,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Tokenize { filename: PathBuf },
    Parse { filename: PathBuf },
    Run { filename: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl Args {
    fn session_config(&self, prompt: &str, filename: Option<String>) -> SessionConfig {
        let color = match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => io::stdout().is_terminal(),
        };
        let parser = ParserConfig {
            max_depth: self.max_depth,
        };
        let mut config = SessionConfig {
            parser,
            color,
            prompt: prompt.to_string(),
            filename,
            ..SessionConfig::default()
        };
        config.eval.max_depth = config.eval.max_depth.max(self.max_depth * 2);
        config
    }
}

fn read(filename: &PathBuf) -> miette::Result<String> {
    fs::read_to_string(filename)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading `{}` failed", filename.display()))
}

fn main() -> miette::Result<()> {
    let args = <Args as clap::Parser>::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(io::stderr)
        .init();

    if let Some(line) = &args.eval {
        let mut session = Session::new(args.session_config("", None));
        let Step::Continue(responses) = session.feed_line(line) else {
            return Ok(());
        };
        let mut failed = false;
        for response in responses {
            match response {
                Response::Value(text) => println!("{text}"),
                Response::Error(e) => {
                    failed = true;
                    eprintln!("{:?}", miette::Report::new(e));
                }
            }
        }
        if failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    match args.command {
        None => {
            let mut session = Session::new(args.session_config(calc::session::PROMPT, None));
            session
                .run_editor(&mut io::stdout())
                .into_diagnostic()
                .wrap_err("interactive session failed")?;
        }
        Some(Commands::Tokenize { ref filename }) => {
            let file_contents = read(filename)?;
            let mut illegal = false;
            for token in Lexer::new(&file_contents) {
                match token.token {
                    TokenKind::Whitespace => continue,
                    TokenKind::Illegal => {
                        illegal = true;
                        eprintln!(
                            "[line {}] Error: Unexpected character: {}",
                            token.pos.line + 1,
                            token.literal
                        );
                    }
                    _ => println!("{token}"),
                }
            }
            println!("EOF");
            if illegal {
                std::process::exit(65);
            }
        }
        Some(Commands::Parse { ref filename }) => {
            let file_contents = read(filename)?;
            let name = filename.display().to_string();
            let config = ParserConfig {
                max_depth: args.max_depth,
            };
            let parser = Parser::new(Some(name.as_str()), &file_contents).with_config(config);
            for expr in parser {
                let expr = match expr {
                    Ok(expr) => expr,
                    Err(e) => return Err(e.into()),
                };
                println!("{expr}");
            }
        }
        Some(Commands::Run { ref filename }) => {
            let file = fs::File::open(filename)
                .into_diagnostic()
                .wrap_err_with(|| format!("opening `{}` failed", filename.display()))?;
            let name = filename.display().to_string();
            let mut session = Session::new(args.session_config("", Some(name)));
            session
                .run(BufReader::new(file), &mut io::stdout())
                .into_diagnostic()
                .wrap_err_with(|| format!("running `{}` failed", filename.display()))?;
        }
    }
    Ok(())
}
