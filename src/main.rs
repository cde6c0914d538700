//! Rowgraph CLI - inspect SQLite databases through the rowgraph object layer

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use rowgraph::config::{self, DatabaseConfig};
use rowgraph::graph::{GraphConnection, NodeRef};
use rowgraph::query::{Operand, Select};
use rowgraph::ui::{self, Icons};
use rowgraph::version::VERSIONS_TABLE;
use rowgraph::{Connection, Filter, Record, RowShape, Value, VersionedConnection};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rowgraph")]
#[command(version = "0.1.0")]
#[command(about = "Inspect SQLite databases: schema, rows, versions and graph edges")]
#[command(long_about = r#"
Rowgraph reads a SQLite database through its object layer:
  • Parsed table schemas with constraints and foreign keys
  • Filtered selects using column__op conditions
  • Per-table schema versions
  • Labelled graph edges between rows

Example usage:
  rowgraph -d app.db tables
  rowgraph -d app.db select users --where age__gte=18 --limit 10
  rowgraph -d app.db edges users 2 --relation owner
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (defaults to `database` in the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables with their rowid column, column count and row count
    Tables {
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show the parsed definition of a table
    Schema {
        table: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Select rows from a table
    Select {
        table: String,

        /// Condition as `column__op=value`; repeatable, AND-joined
        #[arg(short = 'w', long = "where")]
        conditions: Vec<String>,

        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Parse a file of CREATE statements and print the structure as JSON
    Parse { file: PathBuf },

    /// Show the current version and history of a table
    Version {
        table: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// List graph edges touching a row
    Edges {
        table: String,
        rowid: i64,

        /// Only edges where either side carries this relation
        #[arg(short, long)]
        relation: Option<String>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::InitConfig { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            config::write_config(&path, &DatabaseConfig::default(), force)?;
            ui::success(&format!("wrote {}", path.display()));
        }

        Commands::Parse { file } => {
            let sql = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let statements = rowgraph::parser::parse_script(&sql)?;
            println!("{}", serde_json::to_string_pretty(&statements)?);
        }

        Commands::Tables { format } => {
            let (conn, _, database) = open_database(&cli.database, &cli.config)?;
            let mut summaries = Vec::new();
            for table in conn.get_all_tables()? {
                summaries.push(ui::TableSummary {
                    name: table.name().to_string(),
                    rowid: table.table().rowid().unwrap_or_else(|| "-".to_string()),
                    columns: table.table().columns().len(),
                    rows: table.count(Filter::new())?,
                });
            }
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
                Format::Text if summaries.is_empty() => ui::empty("No tables."),
                Format::Text => {
                    ui::header(Icons::DATABASE, &database.display().to_string());
                    println!("{}", ui::rows_table(&summaries));
                }
            }
        }

        Commands::Schema { table, format } => {
            let (conn, _, _) = open_database(&cli.database, &cli.config)?;
            let table = conn.get_table(&table)?;
            if format == Format::Json {
                println!("{}", serde_json::to_string_pretty(&table)?);
                return Ok(());
            }

            ui::header(Icons::TABLE, &table.fullname());
            let columns: Vec<_> = table
                .columns()
                .values()
                .map(|column| ui::ColumnSummary {
                    name: column.name().to_string(),
                    datatype: column.datatype.clone().unwrap_or_default(),
                    constraints: column
                        .constraints
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" "),
                })
                .collect();
            println!("{}", ui::rows_table(&columns));
            if let Some(rowid) = table.rowid() {
                ui::field("rowid", &ui::key(&rowid));
            }
            for constraint in table.tableconstraints() {
                ui::field("constraint", &constraint.to_string());
            }
            for column in table.column_names() {
                if let Some(fk) = table.foreign_key(column) {
                    let target = match fk.column {
                        Some(target) => format!("{}.{}", fk.table.name(), target.name()),
                        None => fk.table.name().to_string(),
                    };
                    ui::field(&format!("{} {}", Icons::LINK, column), &target);
                }
            }
        }

        Commands::Select { table, conditions, limit, format } => {
            let (conn, _, _) = open_database(&cli.database, &cli.config)?;
            let table = conn.get_advanced_table(&table)?.with_shape(RowShape::Map);
            let mut filter = Filter::new();
            for condition in &conditions {
                let (key, value) = condition
                    .split_once('=')
                    .with_context(|| format!("condition `{}` is not column__op=value", condition))?;
                filter = filter.with(key, cli_operand(key, value))?;
            }
            let mut select = Select::new().filter(filter);
            if let Some(limit) = limit {
                select = select.limit(limit);
            }
            let records = table.select(select)?;

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&records)?),
                Format::Text if records.is_empty() => ui::empty("No rows."),
                Format::Text => {
                    let columns: Vec<String> = records
                        .first()
                        .and_then(Record::as_map)
                        .map(|row| row.keys().cloned().collect())
                        .unwrap_or_default();
                    let values: Vec<Vec<Value>> = records.iter().map(Record::values).collect();
                    println!("{}", ui::records_table(&columns, &values));
                }
            }
        }

        Commands::Version { table, format } => {
            let (conn, config, _) = open_database(&cli.database, &cli.config)?;
            if !conn.table_exists(VERSIONS_TABLE)? {
                ui::empty("Database has no version tracking.");
                return Ok(());
            }
            let versioned = VersionedConnection::from_config(conn, &config)?;
            let history = versioned.version_history(&table)?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&history)?),
                Format::Text => match history.last() {
                    None => ui::empty(&format!("{} is not under version control.", table)),
                    Some(current) => {
                        ui::header(Icons::TAG, &format!("{} {}", table, current.version));
                        for record in &history {
                            let scripts = match (&record.update_script, &record.rollback_script) {
                                (None, None) => String::new(),
                                (Some(_), None) => "update".to_string(),
                                (None, Some(_)) => "rollback".to_string(),
                                (Some(_), Some(_)) => "update, rollback".to_string(),
                            };
                            ui::field(&record.version.to_string(), &scripts);
                        }
                    }
                },
            }
        }

        Commands::Edges { table, rowid, relation, format } => {
            let (conn, config, _) = open_database(&cli.database, &cli.config)?;
            let Some(graph) = GraphConnection::from_config(conn, &config)? else {
                ui::empty("Database has no graph tables (set `graph = true` to create them).");
                return Ok(());
            };
            let node = NodeRef::new(table, rowid);
            let edges = match &relation {
                Some(relation) => graph.edges_by_relation(&node, relation)?,
                None => graph.edges(&node)?,
            };
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&edges)?),
                Format::Text if edges.is_empty() => ui::empty(&format!("No edges touch {}.", node)),
                Format::Text => {
                    ui::header(Icons::LINK, &node.to_string());
                    for edge in &edges {
                        let other = if edge.node1_ref() == &node { edge.node2_ref() } else { edge.node1_ref() };
                        println!(
                            "  [{}] {} -> {} ({})",
                            edge.id(),
                            ui::relation(edge.noderelation(&node)),
                            other,
                            ui::relation(edge.noderelation(other)),
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

/// Open the database named on the command line or in the config file.
fn open_database(
    database: &Option<PathBuf>,
    config_path: &Option<PathBuf>,
) -> anyhow::Result<(Connection, DatabaseConfig, PathBuf)> {
    let config = config::load_config(config_path.as_deref())?.unwrap_or_default();
    let database = match database.clone().or_else(|| config.database.clone().map(PathBuf::from)) {
        Some(path) => path,
        None => bail!("no database given (use --database or set `database` in the config)"),
    };
    if !database.exists() {
        bail!("database {} does not exist", database.display());
    }
    let conn = Connection::open_with(&database, &config)?;
    Ok((conn, config, database))
}

/// Interpret a command-line value: integers and reals by their looks,
/// `NULL` as null, comma lists for `__in` / `__notin`.
fn cli_operand(key: &str, raw: &str) -> Operand {
    if key.ends_with("__in") || key.ends_with("__notin") {
        return Operand::List(raw.split(',').map(|item| cli_value(item.trim())).collect());
    }
    Operand::Value(cli_value(raw))
}

fn cli_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        Value::Null
    } else if let Ok(i) = raw.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::Real(f)
    } else {
        Value::Text(raw.to_string())
    }
}
