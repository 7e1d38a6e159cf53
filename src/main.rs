use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};

use erdsql::describe::describe;
use erdsql::{Error, Query, QueryBuilder, Result, SelectOptions, SortDirection};

#[derive(Parser)]
#[command(
    name = "erdsql",
    version,
    about = "Compile Mermaid ER diagrams into PostgreSQL DDL and CRUD queries"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Parse the diagram and print the schema
    Parse {
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,
    },

    /// Check the diagram for parse and structural errors
    Validate {
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,
    },

    /// Print the DDL script
    Sql {
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,
        /// Prefix the script with DROP TABLE statements
        #[arg(long)]
        drop: bool,
    },

    /// Print CRUD statement templates for one entity
    Queries {
        /// Entity name (as written in the diagram, or its table name)
        entity: String,
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        offset: Option<u64>,
        #[arg(long)]
        order_by: Option<String>,
        /// asc or desc
        #[arg(long)]
        order_dir: Option<SortDirection>,
        /// Primary key value as JSON (default: null)
        #[arg(long, value_parser = parse_json)]
        id: Option<Value>,
        /// Row data as a JSON object (default: every column set to null)
        #[arg(long, value_parser = parse_json)]
        data: Option<Value>,
    },

    /// Print tables and columns as an aligned listing
    Describe {
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,
    },
}

fn parse_json(s: &str) -> std::result::Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {e}"))
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        }),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(Error::Stdin)?;
            Ok(buf)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Returns whether the run succeeded; `false` maps to exit status 1.
fn run(cli: Cli) -> Result<bool> {
    let format = cli.format;
    match cli.command {
        Command::Parse { file } => {
            let result = erdsql::parse(&read_input(file.as_ref())?);
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text => {
                    if let Some(schema) = &result.schema {
                        println!(
                            "{} entities, {} relationships",
                            schema.entities.len(),
                            schema.relationships.len()
                        );
                    }
                    for error in result.errors() {
                        eprintln!("{error}");
                    }
                }
            }
            Ok(result.success)
        }
        Command::Validate { file } => {
            let result = erdsql::validate(&read_input(file.as_ref())?);
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text if result.valid => println!("valid"),
                OutputFormat::Text => {
                    for error in &result.errors {
                        println!("{error}");
                    }
                }
            }
            Ok(result.valid)
        }
        Command::Sql { file, drop } => {
            let (parsed, sql) = erdsql::compile(&read_input(file.as_ref())?);
            for error in parsed.errors() {
                log::warn!("{error}");
            }
            match format {
                OutputFormat::Json => print_json(&sql)?,
                OutputFormat::Text => {
                    if drop && !sql.drop_tables.is_empty() {
                        println!("-- Drop tables\n{}\n", sql.drop_tables.join("\n"));
                    }
                    print!("{}", sql.full_script);
                }
            }
            Ok(true)
        }
        Command::Queries {
            entity,
            file,
            limit,
            offset,
            order_by,
            order_dir,
            id,
            data,
        } => {
            let parsed = erdsql::parse(&read_input(file.as_ref())?);
            let schema = parsed.schema.unwrap_or_default();
            let builder = QueryBuilder::for_entity(&schema, &entity)?;

            let id = id.unwrap_or(Value::Null);
            let data: Map<String, Value> = match data {
                Some(Value::Object(map)) => map,
                Some(other) => {
                    log::warn!("--data is not a JSON object, ignoring: {other}");
                    Map::new()
                }
                None => builder
                    .columns()
                    .iter()
                    .map(|c| (c.clone(), Value::Null))
                    .collect(),
            };
            let options = SelectOptions {
                limit,
                offset,
                order_by,
                order_dir,
            };

            let mut queries: Vec<(&str, Query)> = vec![
                ("selectAll", builder.select_all(&options)),
                ("selectById", builder.select_by_id(id.clone())),
                ("insert", builder.insert(&data)),
            ];
            if let Some(update) = builder.update(id.clone(), &data) {
                queries.push(("update", update));
            }
            queries.push(("deleteById", builder.delete_by_id(id)));
            queries.push(("count", builder.count()));

            match format {
                OutputFormat::Json => {
                    let map: Map<String, Value> = queries
                        .into_iter()
                        .map(|(name, q)| Ok((name.to_string(), serde_json::to_value(q)?)))
                        .collect::<Result<_>>()?;
                    print_json(&map)?;
                }
                OutputFormat::Text => {
                    for (name, q) in &queries {
                        println!(
                            "-- {name}\n{};\n-- params: {}\n",
                            q.sql,
                            Value::from(q.params.clone())
                        );
                    }
                }
            }
            Ok(true)
        }
        Command::Describe { file } => {
            let parsed = erdsql::parse(&read_input(file.as_ref())?);
            let schema = parsed.schema.unwrap_or_default();
            match format {
                OutputFormat::Json => print_json(&schema)?,
                OutputFormat::Text => println!("{}", describe(&schema)),
            }
            Ok(true)
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    }
}
