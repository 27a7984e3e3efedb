mod render;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::{eyre, Result, WrapErr};
use serde_json::{Map, Value as JsonValue};
use viewkit::service;
use viewkit::{Config, FileSchemaStore, LocalStore, SchemaStore};

use crate::render::{render_view, render_view_json};

#[derive(Parser, Debug)]
#[clap(name = "viewkit", about, version)]
struct Args {
    /// Increase output logging verbosity.
    #[clap(short, long)]
    verbose: bool,

    /// Configuration file (JSON or YAML). Ignored if it does not exist.
    #[clap(long, parse(from_os_str), default_value = "viewkit.yaml")]
    config: PathBuf,

    /// Directory in which views and schemas are stored. Overrides the
    /// configured root.
    #[clap(long, parse(from_os_str))]
    root: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create, edit, inspect and roll back views.
    #[clap(subcommand)]
    View(ViewCommand),
    /// Manage the schema that queries are validated against.
    #[clap(subcommand)]
    Schema(SchemaCommand),
}

#[derive(Parser, Debug, Default)]
struct OutputOpts {
    /// Output the view as JSON.
    #[clap(long)]
    json: bool,
    /// Include the revision history.
    #[clap(long)]
    full: bool,
}

#[derive(Subcommand, Debug)]
enum ViewCommand {
    /// Initialize a new, empty view.
    Init {
        name: String,
        #[clap(flatten)]
        output: OutputOpts,
    },
    /// Show a saved view.
    Inspect {
        name: String,
        #[clap(flatten)]
        output: OutputOpts,
    },
    /// List all saved views.
    List,
    /// Delete a view and all of its assets.
    Delete { name: String },
    /// Add a query, schema definition or lens to a view.
    #[clap(subcommand)]
    Add(AddCommand),
    /// Remove the query, schema definition or a lens from a view.
    #[clap(subcommand)]
    Remove(RemoveCommand),
    /// Roll a view back to a previous version (the latest revision if no
    /// version is given).
    Rollback {
        name: String,
        #[clap(long)]
        version: Option<u64>,
        #[clap(flatten)]
        output: OutputOpts,
    },
    /// Print the payload handed to an execution environment.
    Export { name: String },
}

#[derive(Subcommand, Debug)]
enum AddCommand {
    /// Set the view's query, e.g. "Log { address topics }".
    Query { name: String, query: String },
    /// Set the view's schema definition.
    Sdl { name: String, sdl: String },
    /// Append a lens backed by a WebAssembly module, read from a local file
    /// or downloaded from a URL.
    Lens {
        name: String,
        #[clap(long)]
        label: String,
        #[clap(
            long,
            parse(from_os_str),
            conflicts_with = "url",
            required_unless_present = "url"
        )]
        path: Option<PathBuf>,
        #[clap(long)]
        url: Option<String>,
        /// Lens arguments as a JSON object.
        #[clap(long)]
        args: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum RemoveCommand {
    Query { name: String },
    Sdl { name: String },
    Lens {
        name: String,
        #[clap(long)]
        label: String,
    },
}

#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// List default and custom types.
    List,
    /// Show the definition of a type.
    Inspect { name: String },
    /// Add a custom type, e.g. "type TempLog { address: String }".
    Add { definition: String },
    /// Remove a custom type.
    Remove { name: String },
    /// Remove all custom types.
    Reset,
}

fn main() {
    let args = Args::parse();
    simple_logger::init_with_level(if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    })
    .unwrap();

    if let Err(e) = run(args) {
        log::error!("Failed: {:?}", e);
        std::process::exit(exit_code(&e));
    }
}

/// Missing views, revisions, lenses and types exit with 2, every other
/// failure with 1.
fn exit_code(e: &eyre::Report) -> i32 {
    match e.downcast_ref::<viewkit::Error>() {
        Some(e) if e.is_not_found() => 2,
        _ => 1,
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    if let Some(root) = args.root {
        config = config.with_root(root);
    }
    match args.command {
        Command::View(cmd) => run_view(&config, cmd),
        Command::Schema(cmd) => run_schema(&config.schema_store()?, cmd),
    }
}

fn run_view(config: &Config, cmd: ViewCommand) -> Result<()> {
    let store = config.view_store()?;
    match cmd {
        ViewCommand::Init { name, output } => {
            print_view(&service::init_view(&store, &name)?, &output)
        }
        ViewCommand::Inspect { name, output } => {
            print_view(&service::inspect_view(&store, &name)?, &output)
        }
        ViewCommand::List => {
            let views = service::list_views(&store)?;
            if views.is_empty() {
                println!("No views found.");
            }
            for view in views {
                println!(
                    "{} (version {}, {} lens(es))",
                    view.name,
                    view.metadata.version,
                    view.transform.len()
                );
            }
            Ok(())
        }
        ViewCommand::Delete { name } => {
            service::delete_view(&store, &name)?;
            println!("View {} deleted.", name);
            Ok(())
        }
        ViewCommand::Add(add) => run_add(config, &store, add),
        ViewCommand::Remove(remove) => {
            let view = match remove {
                RemoveCommand::Query { name } => service::clear_query(&store, &name)?,
                RemoveCommand::Sdl { name } => service::clear_sdl(&store, &name)?,
                RemoveCommand::Lens { name, label } => service::remove_lens(&store, &name, &label)?,
            };
            print_view(&view, &OutputOpts::default())
        }
        ViewCommand::Rollback {
            name,
            version,
            output,
        } => print_view(&service::rollback(&store, &name, version)?, &output),
        ViewCommand::Export { name } => {
            let exported = service::export_view(&store, &name)?;
            println!("{}", serde_json::to_string_pretty(&exported)?);
            Ok(())
        }
    }
}

fn run_add(config: &Config, store: &LocalStore, cmd: AddCommand) -> Result<()> {
    let view = match cmd {
        AddCommand::Query { name, query } => {
            let schemas = config.schema_store()?;
            service::update_query(store, &schemas, &name, &query)?
        }
        AddCommand::Sdl { name, sdl } => service::update_sdl(store, &name, &sdl)?,
        AddCommand::Lens {
            name,
            label,
            path,
            url,
            args,
        } => {
            let arguments = parse_arguments(args.as_deref())?;
            match (path, url) {
                (Some(path), _) => {
                    let module = read_module(&path)?;
                    service::add_lens(store, &name, &label, &module, arguments)?
                }
                (None, Some(url)) => {
                    service::add_lens_from_url(store, &name, &label, &url, arguments)?
                }
                (None, None) => return Err(eyre!("either --path or --url is required")),
            }
        }
    };
    print_view(&view, &OutputOpts::default())
}

fn run_schema(schemas: &FileSchemaStore, cmd: SchemaCommand) -> Result<()> {
    match cmd {
        SchemaCommand::List => {
            let (defaults, custom) = schemas.list_types()?;
            println!("Default types:");
            for name in defaults {
                println!(" - {}", name);
            }
            println!("Custom types:");
            if custom.is_empty() {
                println!(" - (none)");
            }
            for name in custom {
                println!(" - {}", name);
            }
        }
        SchemaCommand::Inspect { name } => println!("{}", schemas.type_definition(&name)?),
        SchemaCommand::Add { definition } => {
            let name = schemas
                .add_custom_type(&definition)
                .wrap_err("failed to add schema type")?;
            println!("Type {} added.", name);
        }
        SchemaCommand::Remove { name } => {
            schemas.remove_custom_type(&name)?;
            println!("Type {} removed.", name);
        }
        SchemaCommand::Reset => {
            schemas.reset_custom()?;
            println!("Custom schema reset.");
        }
    }
    Ok(())
}

fn print_view(view: &viewkit::View, output: &OutputOpts) -> Result<()> {
    if output.json {
        println!("{}", render_view_json(view, output.full)?);
    } else {
        print!("{}", render_view(view, output.full));
    }
    Ok(())
}

fn read_module(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).wrap_err_with(|| format!("failed to read lens module {}", path.display()))
}

fn parse_arguments(args: Option<&str>) -> Result<Map<String, JsonValue>> {
    match args {
        Some(args) => serde_json::from_str(args)
            .wrap_err_with(|| format!("invalid lens arguments (expected a JSON object): {}", args)),
        None => Ok(Map::new()),
    }
}
