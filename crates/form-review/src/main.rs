use clap::{Parser, Subcommand};
use std::path::PathBuf;

use form_review::config::ReviewOptions;
use form_review::engine::ReviewEngine;
use form_review::paths::PathCache;
use form_review::tree::FieldTree;
use form_review::Result;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to an options TOML (defaults used when absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a submission against a form schema and print the errors
    Validate {
        /// Path to a form schema JSON
        schema: PathBuf,
        /// Path to a submission JSON
        data: PathBuf,
        /// Restrict validation to these field paths
        #[arg(long)]
        field: Vec<String>,
    },
    /// Run the full review cycle and print the summary HTML
    Review {
        /// Path to a form schema JSON
        schema: PathBuf,
        /// Path to a submission JSON
        data: PathBuf,
        /// Print the flattened outline instead of HTML
        #[arg(long)]
        outline: bool,
    },
    /// Normalize field paths and print the result
    Paths {
        /// Raw field paths
        path: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let options = match &args.config {
        Some(path) => ReviewOptions::load(path)?,
        None => ReviewOptions::default(),
    };
    match args.cmd {
        Command::Validate {
            schema,
            data,
            field,
        } => cmd_validate(&schema, &data, &field, options),
        Command::Review {
            schema,
            data,
            outline,
        } => cmd_review(&schema, &data, outline, options),
        Command::Paths { path } => cmd_paths(&path),
    }
}

fn load_tree(schema: &PathBuf, data: &PathBuf) -> Result<FieldTree> {
    let schema_text = std::fs::read_to_string(schema)?;
    let data_text = std::fs::read_to_string(data)?;
    let schema: serde_json::Value = serde_json::from_str(&schema_text)?;
    let data: serde_json::Value = serde_json::from_str(&data_text)?;
    FieldTree::from_schema(&schema, &data)
}

fn cmd_validate(
    schema: &PathBuf,
    data: &PathBuf,
    fields: &[String],
    options: ReviewOptions,
) -> Result<()> {
    let mut tree = load_tree(schema, data)?;
    let engine = ReviewEngine::new(options);
    let result = if fields.is_empty() {
        engine.validate(&mut tree)
    } else {
        engine.validate_fields(&mut tree, fields)
    };

    if result.is_valid {
        println!("valid");
        return Ok(());
    }
    for (path, err) in &result.errors {
        for msg in &err.messages {
            println!("{path}: {msg}");
        }
    }
    std::process::exit(1);
}

fn cmd_review(
    schema: &PathBuf,
    data: &PathBuf,
    outline: bool,
    options: ReviewOptions,
) -> Result<()> {
    let mut tree = load_tree(schema, data)?;
    let mut engine = ReviewEngine::new(options);
    let report = engine.run_review(&mut tree)?;

    if outline {
        for leaf in &report.outline.leaves {
            println!("{:>4}  {}  {}", leaf.source_index, leaf.path, leaf.label);
        }
        return Ok(());
    }
    println!("{}", report.html);
    Ok(())
}

fn cmd_paths(raw: &[String]) -> Result<()> {
    let mut cache = PathCache::new();
    for p in raw {
        println!("{p} -> {}", cache.normalize(p));
    }
    Ok(())
}
