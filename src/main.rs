use abuse::{EXAMPLE_GRAMMAR, Generation, Grammar, GrammarConfig, RandomSelector, parse};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::PathBuf;

/// Insult generator driven by a grammar file
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the grammar file
    #[arg(help = "Path to the grammar file")]
    grammar_file: Option<PathBuf>,

    /// Number of sentences to generate
    #[arg(help = "Number of sentences to generate", default_value = "1")]
    count: usize,

    /// Print every sentence the grammar can produce instead of random ones
    #[arg(long)]
    all: bool,

    /// Maximum nesting of rule expansions
    #[arg(long, default_value_t = abuse::grammar::DEFAULT_MAX_DEPTH, conflicts_with = "unbounded")]
    max_depth: usize,

    /// Expand without a depth limit (cyclic grammars may never finish)
    #[arg(long)]
    unbounded: bool,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Print the sequence of choices after each sentence
    #[arg(long)]
    sequence: bool,

    /// Print each result as a JSON object
    #[arg(long)]
    json: bool,

    /// Generate even if the grammar has errors
    #[arg(long)]
    force: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the bundled example grammar to a file
    Example {
        /// Output file path
        #[arg(help = "Output file path")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::Example { output }) = cli.command {
        let output_path = output.unwrap_or_else(|| PathBuf::from("example_insults_grammar.txt"));
        fs::write(&output_path, EXAMPLE_GRAMMAR)?;
        eprintln!("Created example grammar at: {}", output_path.display());
        return Ok(());
    }

    let grammar_file = cli.grammar_file.ok_or("Grammar file path required")?;

    eprintln!("Loading grammar from {}...", grammar_file.display());
    let source = fs::read_to_string(&grammar_file)?;
    let parsed = parse(&source);

    for error in &parsed.errors {
        eprintln!("{}: {}", grammar_file.display(), error);
    }
    if !parsed.errors.is_empty() && !cli.force {
        return Err(format!("{} error(s) in grammar, not generating", parsed.errors.len()).into());
    }

    let config = GrammarConfig {
        max_depth: (!cli.unbounded).then_some(cli.max_depth),
    };
    let grammar = Grammar::with_config(parsed.rules, config);
    eprintln!("Loaded {} rules.", grammar.rules().len());

    if cli.all {
        for generation in grammar.generate_all() {
            print_generation(&generation, cli.sequence, cli.json)?;
        }
        return Ok(());
    }

    let mut selector = match cli.seed {
        Some(seed) => RandomSelector::from_seed(seed),
        None => RandomSelector::new(StdRng::from_entropy()),
    };
    for _ in 0..cli.count {
        let generation = grammar.generate(&mut selector)?;
        print_generation(&generation, cli.sequence, cli.json)?;
    }

    Ok(())
}

fn print_generation(generation: &Generation, sequence: bool, json: bool) -> abuse::Result<()> {
    if json {
        println!("{}", serde_json::to_string(generation)?);
    } else if sequence {
        println!("{} {:?}", generation.text, generation.sequence);
    } else {
        println!("{}", generation.text);
    }
    Ok(())
}
