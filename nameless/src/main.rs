use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{anyhow, Context, Result};
use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use clap::{Parser, ValueEnum};
use nameless::{
    parser::{self, ParseError},
    printer::{Glyph, Notation, PrintConfig},
    Reducer, Strategy, Term,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use util::repl;

#[derive(Parser, Debug)]
#[command(name = "nameless", version)]
#[command(about = "Normalizes untyped lambda calculus terms", long_about = None)]
struct Cli {
    /// Input file; `-` or nothing reads standard input
    input: Option<PathBuf>,

    /// Output file; `-` or nothing writes standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Syntax of the input
    #[arg(short, long, value_enum, default_value_t = SyntaxArg::DeBruijn)]
    syntax: SyntaxArg,

    /// Notation of the output [default: the input syntax]
    #[arg(short, long, value_enum)]
    print: Option<SyntaxArg>,

    /// Reduction strategy
    #[arg(long, value_enum, default_value_t = StrategyArg::NormalOrder)]
    strategy: StrategyArg,

    /// Give up after this many beta steps
    #[arg(long)]
    max_steps: Option<usize>,

    /// Print `\` instead of `λ`
    #[arg(long)]
    ascii: bool,

    /// Start an interactive session
    #[arg(short, long)]
    interactive: bool,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum SyntaxArg {
    Classic,
    DeBruijn,
}

impl From<SyntaxArg> for Notation {
    fn from(syntax: SyntaxArg) -> Self {
        match syntax {
            SyntaxArg::Classic => Notation::Classic,
            SyntaxArg::DeBruijn => Notation::DeBruijn,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum StrategyArg {
    NormalOrder,
    CallByName,
    ApplicativeOrder,
}

impl From<StrategyArg> for Strategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::NormalOrder => Strategy::NormalOrder,
            StrategyArg::CallByName => Strategy::CallByName,
            StrategyArg::ApplicativeOrder => Strategy::ApplicativeOrder,
        }
    }
}

struct Settings {
    syntax: Notation,
    print: PrintConfig,
    strategy: Strategy,
    max_steps: Option<usize>,
}

impl Settings {
    fn from_cli(cli: &Cli) -> Self {
        let glyph = if cli.ascii {
            Glyph::Ascii
        } else {
            Glyph::Unicode
        };
        Self {
            syntax: cli.syntax.into(),
            print: PrintConfig::new(cli.print.unwrap_or(cli.syntax).into(), glyph),
            strategy: cli.strategy.into(),
            max_steps: cli.max_steps,
        }
    }

    fn reducer(&self) -> Reducer {
        match self.max_steps {
            Some(limit) => Reducer::with_fuel(limit),
            None => Reducer::new(),
        }
    }
}

fn is_stdio(path: &Path) -> bool {
    path == Path::new("-")
}

fn read_input(path: Option<&Path>) -> Result<(String, String)> {
    match path.filter(|path| !is_stdio(path)) {
        Some(path) => {
            let name = path.display().to_string();
            let source = fs::read_to_string(path).with_context(|| name.clone())?;
            Ok((name, source))
        }
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("<stdin>")?;
            Ok(("<stdin>".to_string(), source))
        }
    }
}

fn write_output(path: Option<&Path>, rendered: &str) -> Result<()> {
    match path.filter(|path| !is_stdio(path)) {
        Some(path) => {
            fs::write(path, format!("{rendered}\n")).with_context(|| path.display().to_string())
        }
        None => writeln!(io::stdout().lock(), "{rendered}").context("<stdout>"),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::from_cli(cli);
    let (name, source) = read_input(cli.input.as_deref())?;
    let mut term = parser::parse(&source, settings.syntax)
        .map_err(|e| anyhow!("{name}:{}:{}: {e}", e.line, e.column))?;
    debug!(size = term.size(), depth = term.depth(), "parsed {name}");

    let mut reducer = settings.reducer();
    reducer
        .run(settings.strategy, &mut term)
        .with_context(|| name.clone())?;
    info!(steps = reducer.steps(), strategy = %settings.strategy, "reduced {name}");

    write_output(
        cli.output.as_deref(),
        &term.display(settings.print).to_string(),
    )
}

fn build_report(e: &ParseError) -> Report {
    Report::build(ReportKind::Error, (), e.span.start)
        .with_message(e.to_string())
        .with_label(
            Label::new(e.span.clone())
                .with_message(format!("{}", e.cause.fg(Color::Red)))
                .with_color(Color::Red),
        )
        .finish()
}

type CommandResult<'a> = Result<(), (&'a str, ParseError)>;

struct Repl {
    settings: Settings,
}

/// Splits `:cmd term` into its command and argument; plain input has no command.
fn split_command(input: &str) -> (&str, &str) {
    match input.strip_prefix(':') {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .split_once(char::is_whitespace)
                .unwrap_or((stripped, ""))
        }
        None => ("", input),
    }
}

impl Repl {
    /// `None` when there is no term to parse; the user has been told.
    fn parse_term<'i>(&self, input: &'i str) -> Result<Option<Term>, (&'i str, ParseError)> {
        if input.trim().is_empty() {
            eprintln!("Expected a term after the command");
            return Ok(None);
        }
        parser::parse(input, self.settings.syntax)
            .map(Some)
            .map_err(|e| (input, e))
    }

    fn parse<'i>(&self, input: &'i str) -> CommandResult<'i> {
        let Some(term) = self.parse_term(input)? else {
            return Ok(());
        };
        let glyph = self.settings.print.glyph;
        println!(
            "{}",
            term.display(PrintConfig::new(Notation::Classic, glyph))
        );
        println!(
            "{}",
            term.display(PrintConfig::new(Notation::DeBruijn, glyph))
        );
        Ok(())
    }

    fn reduce<'i>(&self, input: &'i str, strategy: Strategy) -> CommandResult<'i> {
        let Some(mut term) = self.parse_term(input)? else {
            return Ok(());
        };
        let mut reducer = self.settings.reducer();
        let result = reducer.run(strategy, &mut term);
        let rendered = term.display(self.settings.print);
        match result {
            Ok(()) => println!("{rendered}"),
            Err(e) => {
                eprintln!("{e}");
                println!("{rendered}");
            }
        }
        debug!(steps = reducer.steps(), %strategy, "reduced input");
        Ok(())
    }

    fn show_help() {
        println!(
            "{}",
            r#"
term                    -- same as :normal term
:parse          term    -- show the parsed term in both notations
:cbn            term    -- reduce to weak head normal form, call-by-name
:normal         term    -- reduce to normal form, normal order
:applicative    term    -- reduce to normal form, applicative order
:help                   -- show this message
        "#
            .trim()
        );
    }

    fn handle_repl_input<'i>(&mut self, input: &'i str) -> CommandResult<'i> {
        let (cmd, input) = split_command(input);
        match cmd {
            "p" | "parse" => {
                self.parse(input)?;
            }
            "c" | "cbn" => {
                self.reduce(input, Strategy::CallByName)?;
            }
            "" | "n" | "normal" => {
                self.reduce(input, Strategy::NormalOrder)?;
            }
            "a" | "applicative" => {
                self.reduce(input, Strategy::ApplicativeOrder)?;
            }
            "h" | "help" => {
                Self::show_help();
            }
            _ => {
                eprintln!("Unknown command {cmd}");
                Self::show_help();
            }
        }
        Ok(())
    }
}

impl repl::Repl for Repl {
    type Error = anyhow::Error;

    fn history(&self) -> Option<PathBuf> {
        Some(std::env::temp_dir().join("nameless.history"))
    }

    fn is_complete(&self, input: &str) -> bool {
        let depth = input
            .lines()
            .flat_map(|line| line.split(';').next().unwrap_or_default().chars())
            .fold(0isize, |depth, c| match c {
                '(' => depth + 1,
                ')' => depth - 1,
                _ => depth,
            });
        depth <= 0
    }

    fn evaluate(&mut self, input: String) -> Result<(), Self::Error> {
        if input.trim().is_empty() {
            return Ok(());
        }
        if let Err((input, e)) = self.handle_repl_input(&input) {
            build_report(&e).eprint(Source::from(input))?;
        }
        Ok(())
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let result = if cli.interactive {
        println!("Hi, this is an untyped lambda calculus REPL. :h to show help");
        println!();
        repl::start_repl(Repl {
            settings: Settings::from_cli(&cli),
        })
        .map_err(anyhow::Error::from)
    } else {
        run(&cli)
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
