use clap::{Args, Parser as ClapParser, Subcommand};
use quarry_lang::cli::{self, CheckOptions, CheckResult, CliError, OutputFormat};
use quarry_lang::{EvalConfig, ParseConfig, UnboundPolicy};
use std::fs;
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "quarry")]
#[command(about = "Quarry - a transactional query language with typed strings and block values")]
#[command(version)]
struct Cli {
    /// Log parser and transaction activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ParseArgs {
    /// Deepest allowed nesting of expressions and blocks
    #[arg(long, env = "QUARRY_MAX_DEPTH", default_value_t = ParseConfig::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a query against an in-memory store
    Run {
        /// The query text, or '-' to read it from stdin
        query: String,

        /// JSON file of seed records: {"table": [records]}
        #[arg(short, long)]
        seed: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// What an unbound variable reads as: null or failure
        #[arg(long, env = "QUARRY_UNBOUND", default_value_t = UnboundPolicy::Null)]
        unbound: UnboundPolicy,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Lex, parse and resolve a query without running it
    Check {
        /// The query text, or '-' to read it from stdin
        query: String,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Print a query in canonical form
    Fmt {
        /// The query text, or '-' to read it from stdin
        query: String,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'quarry docs' to list categories)
        category: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            query,
            seed,
            pretty,
            format,
            unbound,
            parse,
        } => run_query(query, seed, pretty, format, unbound, parse),
        Commands::Check { query, parse } => run_check(query, parse),
        Commands::Fmt { query, parse } => read_query(query).and_then(|query| {
            println!("{}", cli::format_query(&query, parse_config(&parse))?);
            Ok(())
        }),
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { category } => cli::get_doc_category(&category).map(|content| print!("{}", content)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("QUARRY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn parse_config(args: &ParseArgs) -> ParseConfig {
    ParseConfig {
        max_depth: args.max_depth,
    }
}

/// `-` reads the query from stdin when stdin is not a terminal.
fn read_query(query: String) -> Result<String, CliError> {
    if query != "-" {
        return Ok(query);
    }
    if atty::is(atty::Stream::Stdin) {
        return Err(CliError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "'-' given but stdin is a terminal; pipe the query in",
        )));
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn run_query(
    query: String,
    seed: Option<String>,
    pretty: bool,
    format: OutputFormat,
    unbound: UnboundPolicy,
    parse: ParseArgs,
) -> Result<(), CliError> {
    let options = CheckOptions {
        query: read_query(query)?,
        seed: seed.map(fs::read_to_string).transpose()?,
        syntax_only: false,
        parse: parse_config(&parse),
        eval: EvalConfig { unbound },
    };

    if let CheckResult::Success(result) = cli::execute_check(&options)? {
        println!("{}", cli::render(result, format, pretty)?);
    }
    Ok(())
}

fn run_check(query: String, parse: ParseArgs) -> Result<(), CliError> {
    let options = CheckOptions {
        query: read_query(query)?,
        syntax_only: true,
        parse: parse_config(&parse),
        ..Default::default()
    };

    if let CheckResult::SyntaxValid = cli::execute_check(&options)? {
        println!("Query is valid");
    }
    Ok(())
}
