//! shapeshift CLI - render and check response templates

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use shapeshift::error::{FixSuggestion, FormatError};
use shapeshift::{Context, FormatConfig, Template};

#[derive(Parser)]
#[command(name = "shapeshift")]
#[command(about = "Shape JSON responses from <%= req/res %> templates")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./shapeshift.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a template against a context and print the JSON
    Render {
        /// Template file (.json, .yaml, .yml)
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Context file: {"req": {...}, "res": {...}}
        #[arg(long)]
        context: Option<PathBuf>,

        /// Inline JSON for the req view (overrides the context file)
        #[arg(long)]
        req: Option<String>,

        /// Inline JSON for the res view (overrides the context file)
        #[arg(long)]
        res: Option<String>,

        /// Print compact JSON instead of pretty
        #[arg(long)]
        compact: bool,
    },

    /// List placeholders and check their syntax
    Check {
        /// Template file (.json, .yaml, .yml)
        #[arg(short, long)]
        template: Option<PathBuf>,
    },
}

fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Render {
            template,
            context,
            req,
            res,
            compact,
        } => render(&config, template, context, req, res, compact),
        Commands::Check { template } => check(&config, template),
    });

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<FormatConfig, FormatError> {
    let config = match path {
        Some(path) => FormatConfig::load(path)?,
        None => FormatConfig::discover()?,
    };
    Ok(config.with_env())
}

fn load_template(config: &FormatConfig, path: Option<PathBuf>) -> Result<Template, FormatError> {
    match path {
        Some(path) => Template::load(path),
        None => config.load_template(),
    }
}

fn render(
    config: &FormatConfig,
    template: Option<PathBuf>,
    context: Option<PathBuf>,
    req: Option<String>,
    res: Option<String>,
    compact: bool,
) -> Result<(), FormatError> {
    let template = load_template(config, template)?;

    let base = match context {
        Some(path) => Context::from_value(serde_json::from_str(&fs::read_to_string(path)?)?)?,
        None => Context::default(),
    };

    let req = match req {
        Some(json) => serde_json::from_str(&json)?,
        None => base.req().clone(),
    };
    let res = match res {
        Some(json) => serde_json::from_str(&json)?,
        None => base.res().clone(),
    };

    let output = template.resolve(&Context::new(req, res))?;

    let rendered = if compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{}", rendered);

    Ok(())
}

fn check(config: &FormatConfig, template: Option<PathBuf>) -> Result<(), FormatError> {
    let template = load_template(config, template)?;

    for r in template.placeholders() {
        println!("  {} {} {}", r.pointer.cyan(), "→".dimmed(), r.expression);
    }

    let count = template.check()?;
    println!("{} {} placeholders OK", "✓".green(), count);

    Ok(())
}
