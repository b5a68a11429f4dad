//! partsmap: DDL generation and statement runner.
//!
//! # Usage
//!
//! ```bash
//! # Print CREATE TABLE statements for the tables in a TOML file
//! partsmap ddl tables.toml --dialect sqlserver
//!
//! # Create them in a database
//! partsmap --database-url sqlite://app.db?mode=rwc ddl tables.toml --execute
//!
//! # Run raw SQL
//! partsmap exec "select * from Customer"
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use partsmap::prelude::*;

#[derive(Parser)]
#[command(name = "partsmap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile table definitions and statements to SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    partsmap ddl tables.toml                 # Print CREATE TABLE statements
    partsmap ddl tables.toml --execute       # Create the tables
    partsmap exec 'select * from Customer'   # Run raw SQL
    partsmap types --dialect sqlserver       # Show column type keywords")]
struct Cli {
    /// Settings file (defaults to ./partsmap.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, global = true, env = "PARTSMAP_DATABASE_URL")]
    database_url: Option<String>,

    /// Target SQL dialect (sqlite, sqlserver)
    #[arg(short, long, global = true)]
    dialect: Option<Dialect>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate CREATE TABLE statements from a table file
    Ddl {
        /// TOML file with [[table]] entries
        file: PathBuf,

        /// Run the statements instead of printing them
        #[arg(short, long)]
        execute: bool,
    },
    /// Execute raw SQL
    Exec {
        /// The statement to run
        sql: String,
    },
    /// Show the column type keywords of each dialect
    Types,
}

/// A `[[table]]` entry of a table file.
#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default, rename = "table")]
    tables: Vec<TableDef>,
}

#[derive(Debug, Deserialize)]
struct TableDef {
    name: String,
    #[serde(default, rename = "column")]
    columns: Vec<ColumnSpec>,
    #[serde(default, rename = "foreign_key")]
    foreign_keys: Vec<ForeignKeySpec>,
}

#[derive(Debug, Deserialize)]
struct ColumnSpec {
    name: String,
    #[serde(rename = "type")]
    sql_type: SqlType,
    #[serde(default = "default_nullable")]
    nullable: bool,
    #[serde(default)]
    key: bool,
    #[serde(default)]
    auto_increment: bool,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ForeignKeySpec {
    column: String,
    table: String,
    references: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())
        .context("Failed to load settings")?
        .with_database_url(cli.database_url.clone());
    if let Some(dialect) = cli.dialect {
        settings.database.dialect = dialect;
    }

    match &cli.command {
        Commands::Ddl { file, execute } => generate_ddl(file, *execute, &settings).await,
        Commands::Exec { sql } => execute_sql(sql, &settings).await,
        Commands::Types => {
            show_types(cli.dialect);
            Ok(())
        }
    }
}

async fn generate_ddl(file: &PathBuf, execute: bool, settings: &Settings) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let table_file: TableFile =
        toml::from_str(&content).with_context(|| format!("Invalid table file {}", file.display()))?;

    let compiler = QueryCompiler::new(settings.database.dialect)
        .qualify_fields(settings.compiler.qualify_fields);
    let mut statements = Vec::with_capacity(table_file.tables.len());
    for table in &table_file.tables {
        statements.push(
            create_table(compiler, table)
                .with_context(|| format!("Cannot build table '{}'", table.name))?,
        );
    }

    if !execute {
        for statement in &statements {
            println!("{};", statement.sql().white());
        }
        return Ok(());
    }

    let mut ctx = DatabaseContext::from_settings(settings)?;
    for statement in statements {
        ctx.add_query(statement);
    }
    ctx.commit().await?;
    println!(
        "{} Created {} table(s)",
        "✓".green(),
        table_file.tables.len().to_string().cyan()
    );
    Ok(())
}

fn create_table(compiler: QueryCompiler, table: &TableDef) -> PartsResult<CompiledQuery> {
    let members = table
        .columns
        .iter()
        .map(|c| {
            let member = Member::new(&c.name, c.sql_type);
            if c.nullable { member.nullable() } else { member }
        })
        .collect();
    let mut query = TableQuery::new(compiler, TableSchema::new(&table.name, members));

    let keys: Vec<&ColumnSpec> = table.columns.iter().filter(|c| c.key).collect();
    match keys.as_slice() {
        [] => {}
        [key] => query = query.key(&key.name, key.auto_increment),
        many => {
            let names: Vec<&str> = many.iter().map(|c| c.name.as_str()).collect();
            query = query.composite_key(&names)?;
        }
    }
    for fk in &table.foreign_keys {
        query = query.foreign_key(&fk.column, &fk.table, &fk.references);
    }
    query.create()
}

async fn execute_sql(sql: &str, settings: &Settings) -> Result<()> {
    let ctx = DatabaseContext::from_settings(settings)?;

    let returns_rows = sql
        .trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"));
    if returns_rows {
        let rows = ctx.fetch_raw(sql).await?;
        print_rows(&rows);
    } else {
        let affected = ctx.execute_raw(sql).await?;
        println!("{} {} rows affected", "✓".green(), affected);
    }
    Ok(())
}

fn print_rows(rows: &[Row]) {
    let Some(first) = rows.first() else {
        println!("{}", "(no results)".dimmed());
        return;
    };

    let columns: Vec<&str> = first.columns().collect();
    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in rows {
        for (i, value) in row.values().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(value.to_string().len());
            }
        }
    }

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:width$}", c, width = *w))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for row in rows {
        let cells: Vec<String> = row
            .values()
            .zip(&widths)
            .map(|(v, w)| format!("{:width$}", v.to_string(), width = *w))
            .collect();
        println!("{}", cells.join(" │ "));
    }

    println!();
    println!("{} row(s) returned", rows.len().to_string().cyan());
}

fn show_types(dialect: Option<Dialect>) {
    let dialects = match dialect {
        Some(d) => vec![d],
        None => vec![Dialect::Sqlite, Dialect::SqlServer],
    };
    let formatters: Vec<_> = dialects.iter().map(|d| d.formatter()).collect();

    print!("{:12}", "Type".white().bold());
    for formatter in &formatters {
        print!(" {:20}", formatter.name().white().bold());
    }
    println!();
    println!("{}", "─".repeat(12 + 21 * formatters.len()).dimmed());

    for ty in SqlType::ALL {
        print!("{:12}", ty.to_string().cyan());
        for formatter in &formatters {
            print!(" {:20}", formatter.map_type(ty).yellow());
        }
        println!();
    }
}
