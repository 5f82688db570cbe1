use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{ArgAction, CommandFactory, Parser as CliParser, Subcommand};
use clap_complete::Shell;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use solz_ast::Program;
use solz_lexer::{tokenize, File, Token};
use solz_parser::{ParseError, Parser};
use solz_resolve::{resolve_definition, DefinitionError};

/// Solidity scanner, parser and go-to-definition tools
#[derive(CliParser, Debug)]
#[command(name = "solz", version, about, long_about = None)]
struct Cli {
    /// Log more (-v debug, -vv trace); otherwise SOLZ_LOG, default warn
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show scanner output (tokens)
    Lex { file: PathBuf },
    /// Show parser output (AST)
    Parse {
        file: PathBuf,
        /// Print the AST as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find the declaration of the identifier at a 1-based line and character
    Definition {
        file: PathBuf,
        line: usize,
        character: usize,
    },
    /// Run the language server over stdio
    Lsp,
    /// Print a shell completion script
    Completions { shell: Shell },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("error reading file '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    /// Already rendered as a report
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error("{line}:{character} is not a position in the file")]
    NoSuchPosition { line: usize, character: usize },
    #[error("failed to serialize AST: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to start runtime: {0}")]
    Runtime(io::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Parse(_)) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays free for the LSP channel.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("SOLZ_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Lex { file } => {
            let source = read_source(&file)?;
            print!("{}", lex_output(&source));
        }
        Command::Parse { file, json } => {
            let source = read_source(&file)?;
            let program = parse_reported(&file, &source, &mut File::new())?;
            print!("{}", parse_output(&program, json)?);
        }
        Command::Definition {
            file,
            line,
            character,
        } => {
            let source = read_source(&file)?;
            let mut index = File::new();
            let program = parse_reported(&file, &source, &mut index)?;
            let (def_line, def_character) = find_definition(&program, &index, line, character)?;
            println!("{}:{}:{}", file.display(), def_line, def_character);
        }
        Command::Lsp => {
            let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
            runtime.block_on(solz_lsp::run_server());
        }
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "solz", &mut io::stdout());
        }
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<String, CliError> {
    debug!(path = %path.display(), "reading source");
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Token table with 1-based line:character columns
fn lex_output(source: &str) -> String {
    let mut file = File::new();
    let tokens = tokenize(source, &mut file);

    let mut out = format!("{:<8} {:<10} {:<12} {}\n", "POS", "LINE:COL", "TOKEN", "LITERAL");
    out.push_str(&"-".repeat(48));
    out.push('\n');

    for spanned in &tokens {
        let location = file
            .location(spanned.pos)
            .map(|(line, character)| format!("{}:{}", line, character))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<8} {:<10} {:<12} {}\n",
            spanned.pos.offset(),
            location,
            spanned.token.name(),
            spanned.literal
        ));
    }

    let idents = tokens.iter().filter(|t| t.token == Token::Ident).count();
    let illegal = tokens.iter().filter(|t| t.token == Token::Illegal).count();
    out.push_str(&format!(
        "\nTotal tokens: {} ({} identifiers, {} illegal), lines: {}\n",
        tokens.len(),
        idents,
        illegal,
        file.line_count()
    ));
    out
}

fn parse_output(program: &Program, json: bool) -> Result<String, CliError> {
    if json {
        let mut out = serde_json::to_string_pretty(program)?;
        out.push('\n');
        return Ok(out);
    }

    let mut out = program.pretty_print();
    let variables: usize = program.contracts.iter().map(|c| c.state_variables.len()).sum();
    let functions: usize = program.contracts.iter().map(|c| c.functions.len()).sum();
    out.push_str(&format!(
        "\nContracts: {}, state variables: {}, functions: {}\n",
        program.contracts.len(),
        variables,
        functions
    ));
    Ok(out)
}

/// 1-based location of the declaration for a 1-based query location
fn find_definition(
    program: &Program,
    file: &File,
    line: usize,
    character: usize,
) -> Result<(usize, usize), CliError> {
    let target = file
        .offset_of(line, character)
        .ok_or(CliError::NoSuchPosition { line, character })?;
    let def = resolve_definition(program, target)?;

    // Declarations are always scanned identifiers
    file.location(def)
        .ok_or(CliError::Definition(DefinitionError::UnknownPosition))
}

fn parse_reported(path: &Path, source: &str, file: &mut File) -> Result<Program, CliError> {
    Parser::parse(source, file).map_err(|err| {
        report_parse_error(path, source, &err);
        CliError::Parse(err)
    })
}

fn report_parse_error(path: &Path, source: &str, err: &ParseError) {
    let name = path.display().to_string();
    let start = err.pos.offset();
    let end = start + err.literal.chars().count();

    let label = match err.token {
        Token::Eof => "input ends here".to_string(),
        token => format!("unexpected {}", token),
    };

    let _ = Report::build(ReportKind::Error, name.as_str(), start)
        .with_message(&err.message)
        .with_label(
            Label::new((name.as_str(), start..end))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .eprint((name.as_str(), Source::from(source)));
}
