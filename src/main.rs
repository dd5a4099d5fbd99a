use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::Read;
use std::path::PathBuf;
use std::process;

use lox_interpreter as lox;

use clap::Parser as ClapParser;
use clap::Subcommand;

use lox::ast_printer::AstPrinter;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prints the token stream of a source file
    Tokenize { filename: PathBuf },

    /// Prints the parenthesized AST of a single expression
    Parse { filename: PathBuf },

    /// Evaluates a single expression and prints its value
    Evaluate { filename: PathBuf },

    /// Executes a program
    Run { filename: PathBuf },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    match args.commands {
        Commands::Tokenize { filename } => {
            let buf = read_source(&filename)?;

            let mut had_error = false;
            for result in Scanner::new(&buf) {
                match result {
                    Ok(token) => println!("{}", token),

                    Err(e) => {
                        had_error = true;
                        eprintln!("{}", e);
                    }
                }
            }

            if had_error {
                process::exit(65);
            }
        }

        Commands::Parse { filename } => {
            let buf = read_source(&filename)?;

            let tokens = scan_or_exit(&buf);

            let mut parser = Parser::new(tokens);
            match parser.parse_expression() {
                Ok(expr) => println!("{}", AstPrinter::print(&expr)),

                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(65);
                }
            }
        }

        Commands::Evaluate { filename } => {
            let buf = read_source(&filename)?;

            let tokens = scan_or_exit(&buf);

            let mut parser = Parser::new(tokens);
            let expr = match parser.parse_expression() {
                Ok(expr) => expr,

                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(65);
                }
            };

            let mut interpreter = Interpreter::new(io::stdout());
            match interpreter.evaluate(&expr) {
                Ok(value) => println!("{}", value),

                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(70);
                }
            }
        }

        Commands::Run { filename } => {
            let buf = read_source(&filename)?;

            let tokens = scan_or_exit(&buf);

            let mut parser = Parser::new(tokens);
            let statements = parser.parse_program();
            if parser.had_error() {
                process::exit(65);
            }

            let mut interpreter = Interpreter::new(io::stdout());

            let mut resolver = Resolver::new(&mut interpreter);
            resolver.resolve(&statements);
            if resolver.had_error() {
                process::exit(65);
            }

            interpreter.interpret(&statements);
            if interpreter.had_runtime_error() {
                process::exit(70);
            }
        }
    }

    Ok(())
}

fn read_source(filename: &PathBuf) -> anyhow::Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(File::open(filename)?);
    reader.read_to_end(&mut buf)?;

    Ok(buf)
}

/// Scan the whole source, reporting lexical errors to stderr; exits 65 when
/// any occurred. Used by the modes that need the full token vector.
fn scan_or_exit(buf: &[u8]) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut had_error = false;

    for result in Scanner::new(buf) {
        match result {
            Ok(token) => tokens.push(token),

            Err(e) => {
                had_error = true;
                eprintln!("{}", e);
            }
        }
    }

    if had_error {
        process::exit(65);
    }

    tokens
}
