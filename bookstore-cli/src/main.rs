use bookstore::storage::Row;
use bookstore::{AttributeSet, BookProvider, Column, Filter, ProviderConfig, Query};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;

/// Book store CLI: read and edit the book inventory from the command line
#[derive(Parser)]
#[command(name = "bookstore", version, about)]
struct Cli {
    /// Path to the data directory (default: current directory)
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
    /// One line per book
    Summary,
}

#[derive(Subcommand)]
enum Command {
    /// Read books from a collection or item locator
    Query {
        /// Locator (defaults to the collection)
        locator: Option<String>,
        /// Columns to return (repeatable; default: all)
        #[arg(long = "column")]
        columns: Vec<String>,
        /// Filter expression with ? placeholders (e.g. --where "price > ?")
        #[arg(long = "where")]
        filter: Option<String>,
        /// Filter arguments, in placeholder order
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Sort order (e.g. --order "name ASC, price DESC")
        #[arg(long)]
        order: Option<String>,
    },

    /// Add a new book
    Insert {
        /// Collection locator (defaults to the configured collection)
        locator: Option<String>,
        /// Field values (e.g. --field name="Dune")
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Update books in scope
    Update {
        locator: String,
        /// Field values to write (e.g. --field quantity=4)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
        /// Filter expression, ignored for item locators
        #[arg(long = "where")]
        filter: Option<String>,
        #[arg(long = "arg")]
        args: Vec<String>,
    },

    /// Delete books in scope
    Delete {
        locator: String,
        /// Filter expression, ignored for item locators
        #[arg(long = "where")]
        filter: Option<String>,
        #[arg(long = "arg")]
        args: Vec<String>,
    },

    /// Sell one copy of a book
    Sell {
        /// Book id
        id: i64,
        /// Quantity currently shown for the book
        #[arg(long)]
        quantity: i64,
    },

    /// Show the content type of a locator
    Type { locator: String },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("Invalid key=value pair: no '=' found in '{s}'"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ProviderConfig::load(&cli.data_dir)?;
    log::debug!("Configuration: {config:?}");
    let provider = BookProvider::open(&cli.data_dir, &config)?;
    let collection = provider.matcher().collection_locator().to_string();

    match cli.command {
        Command::Query {
            locator,
            columns,
            filter,
            args,
            order,
        } => {
            let projection = columns
                .iter()
                .map(|name| Column::from_name(name).ok_or_else(|| format!("Unknown column '{name}'")))
                .collect::<Result<Vec<_>, _>>()?;
            let mut query = Query::all()
                .with_projection(projection)
                .with_filter(build_filter(filter, args)?);
            if let Some(order) = order {
                query = query.with_order(&order)?;
            }
            let rows: Vec<Row> = provider
                .read(locator.as_deref().unwrap_or(&collection), &query)?
                .collect();
            print_rows(&rows, &cli.format)?;
        }

        Command::Insert { locator, fields } => {
            let attrs = AttributeSet::from_pairs(fields)?;
            let id = provider.create(locator.as_deref().unwrap_or(&collection), &attrs)?;
            print_output(
                &serde_json::json!({ "id": id, "locator": provider.matcher().item_locator(id) }),
                &cli.format,
            )?;
        }

        Command::Update {
            locator,
            fields,
            filter,
            args,
        } => {
            let attrs = AttributeSet::from_pairs(fields)?;
            let count = provider.update(&locator, &attrs, &build_filter(filter, args)?)?;
            print_output(&serde_json::json!({ "ok": true, "affected": count }), &cli.format)?;
        }

        Command::Delete {
            locator,
            filter,
            args,
        } => {
            let count = provider.delete(&locator, &build_filter(filter, args)?)?;
            print_output(&serde_json::json!({ "ok": true, "deleted": count }), &cli.format)?;
        }

        Command::Sell { id, quantity } => {
            let count = provider.decrement_quantity(id, quantity)?;
            print_output(
                &serde_json::json!({ "sold": count > 0, "affected": count }),
                &cli.format,
            )?;
        }

        Command::Type { locator } => {
            let content_type = provider.content_type(&locator)?;
            print_output(
                &serde_json::json!({ "locator": locator, "content_type": content_type }),
                &cli.format,
            )?;
        }
    }

    Ok(())
}

fn build_filter(expr: Option<String>, args: Vec<String>) -> bookstore::Result<Filter> {
    Filter::new(expr.as_deref().unwrap_or(""), args)
}

fn print_rows(rows: &[Row], format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Summary => {
            for row in rows {
                println!("{}", summary_line(row));
            }
            Ok(())
        }
        _ => {
            let values: Vec<serde_json::Value> = rows.iter().map(Row::to_json).collect();
            print_output(&serde_json::Value::Array(values), format)
        }
    }
}

/// `#id  name  [category]  price x quantity`, or the row's JSON when it is not
/// fully projected.
fn summary_line(row: &Row) -> String {
    match row.to_book() {
        Some(book) => format!(
            "#{}  {}  [{}]  {} x {}",
            book.id,
            book.name,
            book.category_label(),
            book.price,
            book.quantity
        ),
        None => row.to_json().to_string(),
    }
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Summary => match value.as_object() {
            Some(map) => {
                for (key, val) in map {
                    println!("{key}: {val}");
                }
            }
            None => println!("{value}"),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore::storage::StoredValue;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("name=Dune=Messiah").unwrap(),
            ("name".to_string(), "Dune=Messiah".to_string())
        );
        assert!(parse_key_value("name").is_err());
    }

    #[test]
    fn test_summary_line() {
        let row = Row::new(vec![
            (Column::Id, StoredValue::Integer(3)),
            (Column::Name, StoredValue::Text("Dune".into())),
            (Column::Category, StoredValue::Text(String::new())),
            (Column::Price, StoredValue::Integer(12)),
            (Column::Quantity, StoredValue::Integer(4)),
            (Column::SupplierName, StoredValue::Text("Acme".into())),
            (Column::SupplierPhone, StoredValue::Null),
        ]);
        assert_eq!(summary_line(&row), "#3  Dune  [unknown]  12 x 4");

        let partial = Row::new(vec![(Column::Name, StoredValue::Text("Dune".into()))]);
        assert_eq!(summary_line(&partial), r#"{"name":"Dune"}"#);
    }

    #[test]
    fn test_build_filter() {
        assert!(build_filter(None, vec![]).unwrap().is_all());
        assert!(build_filter(Some("price > ?".into()), vec![]).is_err());
        assert!(build_filter(None, vec!["1".into()]).is_err());
    }

    #[test]
    fn test_cli_parses_sell() {
        let cli = Cli::try_parse_from(["bookstore", "sell", "7", "--quantity", "3"]).unwrap();
        assert!(matches!(cli.command, Command::Sell { id: 7, quantity: 3 }));
    }
}
