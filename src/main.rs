use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::expr::Expr;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::runner::{self, Outcome, EXIT_RUNTIME_FAILURE, EXIT_STATIC_FAILURE};
use rox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the tokens as a JSON array instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    let text = String::from_utf8(buf).context(format!("{:?} is not valid UTF-8", filename))?;
    Ok(text)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn no_input(command: &str) -> ! {
    info!("No filepath provided for {}", command);
    println!("No input filepath was provided. Exiting...");
    process::exit(0);
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let (tokens, errors) = runner::scan(source);

    for e in &errors {
        eprintln!("{}", e);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer(&mut out, &tokens).context("Failed to serialize tokens")?;
        writeln!(out)?;
    } else {
        for token in &tokens {
            writeln!(out, "{}", token)?;
        }
    }
    out.flush()?;

    if !errors.is_empty() {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_FAILURE);
        process::exit(EXIT_STATIC_FAILURE);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

/// Prints lexical and syntax errors, exiting with the static failure code if any.
fn parse_single_expression<'a>(
    tokens: &'a [Token<'a>],
    lex_errors: &[LoxError],
) -> Expr<'a> {
    let parsed = Parser::new(tokens).parse_expression();

    for e in lex_errors {
        eprintln!("{}", e);
    }

    match parsed {
        Ok(expr) if lex_errors.is_empty() => {
            info!("Expression parsed successfully");
            expr
        }
        Ok(_) => process::exit(EXIT_STATIC_FAILURE),
        Err(errors) => {
            for e in &errors {
                debug!("Parse debug: {}", e);
                eprintln!("{}", e);
            }
            process::exit(EXIT_STATIC_FAILURE);
        }
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            let Some(filename) = filename else {
                no_input("Tokenize")
            };
            info!("Running Tokenize subcommand");
            let source = read_file(filename)?;
            tokenize(&source, json)?;
        }

        Commands::Parse { filename } => {
            let Some(filename) = filename else {
                no_input("Parse")
            };
            info!("Running Parse subcommand");
            let source = read_file(filename)?;
            let (tokens, errors) = runner::scan(&source);
            let expr = parse_single_expression(&tokens, &errors);

            let ast_str = AstPrinter::print(&expr);
            debug!("AST: {}", ast_str);
            println!("{}", ast_str);

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else {
                no_input("Evaluate")
            };
            info!("Running Evaluate subcommand");
            let source = read_file(filename)?;
            let (tokens, errors) = runner::scan(&source);
            let expr = parse_single_expression(&tokens, &errors);

            let mut interpreter = Interpreter::new();
            match interpreter.evaluate_expression(&expr) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);
                    println!("{}", value);
                }

                Err(e) => {
                    debug!("Evaluation debug: {}", e);
                    eprintln!("{}", e);
                    process::exit(EXIT_RUNTIME_FAILURE);
                }
            }

            info!("Evaluate subcommand completed");
        }

        Commands::Run { filename } => {
            let Some(filename) = filename else {
                no_input("Run")
            };
            info!("Running Run subcommand");
            let source = read_file(filename)?;
            info!("Provided input:\n {}", source);

            let outcome = runner::run(&source, io::stdout());
            match &outcome {
                Outcome::Success => info!("Program executed successfully"),

                Outcome::StaticFailure(errors) => {
                    for e in errors {
                        debug!("Static error: {}", e);
                        eprintln!("{}", e);
                    }
                }

                Outcome::RuntimeFailure(e) => {
                    debug!("Runtime debug: {}", e);
                    eprintln!("{}", e);
                }
            }

            if !outcome.is_success() {
                process::exit(outcome.exit_code());
            }
        }
    }

    Ok(())
}
