//! JSON:API Shape CLI
//!
//! Command-line interface for resolving JSON:API documents against a schema.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use jsonapi_shape::{
    load_json_auto, load_registry, resolve, resolve_selection, DanglingPolicy, DataError,
    ResolveOptions, Selection, ShapeError,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsonapi-shape")]
#[command(about = "Resolve JSON:API sparse fieldsets and include trees")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a document: prune attributes and inline included resources
    Resolve {
        /// Document source: file path or URL (http:// or https://)
        document: String,

        /// Schema source: definition file or OpenAPI document (path or URL)
        #[arg(long, short)]
        schema: String,

        /// Sparse fieldset for one type, e.g. article=title,body (repeatable)
        #[arg(long = "fields", value_name = "TYPE=FIELDS", value_parser = parse_fields_arg)]
        fields: Vec<(String, String)>,

        /// Comma-delimited include paths, e.g. author,author.articles
        #[arg(long)]
        include: Option<String>,

        /// What to do with relationships pointing at missing resources
        #[arg(long, value_enum, default_value_t = DanglingArg::Fail)]
        dangling: DanglingArg,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the effective selection for a primary type without a document
    Plan {
        /// Primary resource type
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Schema source: definition file or OpenAPI document (path or URL)
        #[arg(long, short)]
        schema: String,

        /// Sparse fieldset for one type, e.g. article=title,body (repeatable)
        #[arg(long = "fields", value_name = "TYPE=FIELDS", value_parser = parse_fields_arg)]
        fields: Vec<(String, String)>,

        /// Comma-delimited include paths, e.g. author,author.articles
        #[arg(long)]
        include: Option<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DanglingArg {
    /// Abort with an error
    Fail,
    /// Replace with null (to-one) or drop (to-many)
    Null,
    /// Leave the bare identifier in place
    Keep,
}

impl From<DanglingArg> for DanglingPolicy {
    fn from(arg: DanglingArg) -> Self {
        match arg {
            DanglingArg::Fail => DanglingPolicy::Fail,
            DanglingArg::Null => DanglingPolicy::Null,
            DanglingArg::Keep => DanglingPolicy::KeepIdentifier,
        }
    }
}

fn parse_fields_arg(s: &str) -> Result<(String, String), String> {
    let (type_name, list) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=FIELDS, got \"{}\"", s))?;
    if type_name.is_empty() {
        return Err(format!("missing type name in \"{}\"", s));
    }
    Ok((type_name.to_string(), list.to_string()))
}

fn main() -> ExitCode {
    setup_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            document,
            schema,
            fields,
            include,
            dangling,
            output,
            pretty,
        } => run_resolve(
            &document,
            &schema,
            build_selection(fields, include),
            dangling.into(),
            output,
            pretty,
        ),

        Commands::Plan {
            type_name,
            schema,
            fields,
            include,
            pretty,
        } => run_plan(&type_name, &schema, build_selection(fields, include), pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Logs go to stderr, filtered by `RUST_LOG` (e.g. `RUST_LOG=jsonapi_shape=debug`).
fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn build_selection(fields: Vec<(String, String)>, include: Option<String>) -> Selection {
    let selection = fields
        .into_iter()
        .fold(Selection::new(), |selection, (type_name, list)| {
            selection.with_fields(type_name, &list)
        });
    match include {
        Some(list) => selection.with_include(&list),
        None => selection,
    }
}

fn run_resolve(
    document_source: &str,
    schema_source: &str,
    selection: Selection,
    dangling: DanglingPolicy,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let registry = load_registry(schema_source)
        .map_err(|e| report(&format!("loading schema: {}", e), &e))?;

    let document = load_json_auto(document_source).map_err(|e| {
        let e = ShapeError::from(e);
        report(&format!("loading document: {}", e), &e)
    })?;

    let options = ResolveOptions::new().dangling(dangling);
    let resolved = resolve(&registry, &document, &selection, &options).map_err(|e| {
        if let ShapeError::Data(DataError::MalformedDocument { violations }) = &e {
            eprintln!("Malformed document:");
            for violation in violations {
                eprintln!("  {}", violation);
            }
            return e.exit_code() as u8;
        }
        report(&e.to_string(), &e)
    })?;

    write_json(&resolved, output, pretty)
}

fn run_plan(
    type_name: &str,
    schema_source: &str,
    selection: Selection,
    pretty: bool,
) -> Result<(), u8> {
    let registry = load_registry(schema_source)
        .map_err(|e| report(&format!("loading schema: {}", e), &e))?;

    let plan = resolve_selection(&registry, [type_name], &selection)
        .map_err(|e| report(&e.to_string(), &e))?;

    let value = serde_json::to_value(&plan).map_err(|e| {
        eprintln!("Error serializing plan: {}", e);
        2u8
    })?;
    write_json(&value, None, pretty)
}

/// Print an error and return its exit code.
fn report(msg: &str, err: &ShapeError) -> u8 {
    eprintln!("Error: {}", msg);
    err.exit_code() as u8
}

fn write_json(value: &Value, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}
