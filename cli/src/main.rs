mod schema_dsl;

use std::fs;
use std::io::{self, Read as _};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use jsonish_core::options::OnElementError;
use jsonish_core::Options;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "jsonish")]
#[command(about = "Parse tolerant, LLM-emitted JSON-ish text against a declared schema")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an input file (or stdin, with `-`) against a schema
    Parse {
        /// Input file, or "-" to read from stdin
        input: PathBuf,

        /// Schema DSL file (see `schema_dsl` module docs)
        #[arg(short, long)]
        schema: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,

        /// Disable the Markdown code-fence extractor
        #[arg(long, default_value_t = false)]
        no_markdown: bool,

        /// Disable scanning for multiple embedded JSON objects
        #[arg(long, default_value_t = false)]
        no_multi_object: bool,

        /// Disable the token-level fixing state machine (strict JSON only)
        #[arg(long, default_value_t = false)]
        no_fixes: bool,

        /// Disable the final "treat as opaque string" fallback
        #[arg(long, default_value_t = false)]
        no_string_fallback: bool,

        /// Accept truncated/streamed input, filling in best-effort defaults
        #[arg(long, default_value_t = false)]
        allow_partial: bool,

        /// Print the coercion score and flags to stderr
        #[arg(long, default_value_t = false)]
        explain: bool,
    },

    /// Validate that a schema DSL file parses, printing its shape summary
    CheckSchema {
        /// Schema DSL file
        schema: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Parse {
            input,
            schema,
            format,
            no_markdown,
            no_multi_object,
            no_fixes,
            no_string_fallback,
            allow_partial,
            explain,
        } => {
            let text = read_input(&input)?;
            let schema_dsl: schema_dsl::SchemaDsl = {
                let raw = fs::read_to_string(&schema)
                    .with_context(|| format!("Failed to read schema file: {}", schema.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse schema DSL from: {}", schema.display()))?
            };
            let schema_ref = schema_dsl::to_schema(schema_dsl)?;

            let options = Options {
                allow_markdown_json: !no_markdown,
                find_all_json_objects: !no_multi_object,
                allow_fixes: !no_fixes,
                allow_as_string: !no_string_fallback,
                allow_partial,
                on_element_error: OnElementError::KeepPartial,
                coerce_primitives: true,
                ignore_refinements: false,
                max_depth: 100,
            };

            match jsonish_core::parse(&text, &schema_ref, options) {
                Ok(result) => {
                    if explain {
                        eprintln!("score: {}", result.score);
                        eprintln!("flags: {:?}", result.flags);
                    }
                    print_json(&result.payload, format)?;
                }
                Err(err) => {
                    eprintln!("parse failed: {err}");
                    std::process::exit(1);
                }
            }
        }
        Commands::CheckSchema { schema } => {
            let raw = fs::read_to_string(&schema)
                .with_context(|| format!("Failed to read schema file: {}", schema.display()))?;
            let dsl: schema_dsl::SchemaDsl = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse schema DSL from: {}", schema.display()))?;
            let schema_ref = schema_dsl::to_schema(dsl)?;
            println!("ok: top-level kind = {}", schema_ref.kind_name());
        }
    }

    Ok(())
}

fn read_input(path: &std::path::Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read input file: {}", path.display()))
    }
}

fn print_json(value: &serde_json::Value, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    match format {
        OutputFormat::Pretty => serde_json::to_writer_pretty(&mut writer, value)?,
        OutputFormat::Compact => serde_json::to_writer(&mut writer, value)?,
    }
    use std::io::Write as _;
    writeln!(writer)?;
    Ok(())
}
