pub mod sqlite;

pub use sqlite::SqliteStorage;

use crate::error::{BookStoreError, Result};
use crate::notify::Subscription;
use crate::schema::{Book, Column, RowId};
use crate::values::AttributeSet;
use serde::{Deserialize, Serialize};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::fmt;

/// Storage engine behind the provider.
///
/// `insert` reports a row the engine refused (a constraint violation) as
/// `Ok(None)`; `Err` is reserved for engine faults.
pub trait Storage: Send + Sync {
    fn query(&self, table: &str, query: &Query) -> Result<RowSequence>;

    fn insert(&self, table: &str, attrs: &AttributeSet) -> Result<Option<RowId>>;

    fn update(&self, table: &str, attrs: &AttributeSet, filter: &Filter) -> Result<usize>;

    fn delete(&self, table: &str, filter: &Filter) -> Result<usize>;
}

// ── Filters ──────────────────────────────────────────────────────────

/// A row filter: an SQL boolean expression with positional `?` placeholders,
/// and the text arguments bound to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    expr: Option<String>,
    args: Vec<String>,
}

impl Filter {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse and check a filter expression. The expression must be a single
    /// SQL expression and carry exactly one `?` per argument. Numbered (`?1`,
    /// `$1`) and named (`:x`, `@x`, `$x`) parameters are rejected.
    ///
    /// The expression is checked with sqlparser's generic dialect, so
    /// SQLite-only operators that dialect cannot parse, such as `GLOB`, are
    /// rejected even though SQLite would accept them. Use `LIKE` instead.
    pub fn new(expr: &str, args: Vec<String>) -> Result<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            if !args.is_empty() {
                return Err(BookStoreError::InvalidFilter(format!(
                    "{} argument(s) given without an expression",
                    args.len()
                )));
            }
            return Ok(Filter::all());
        }

        let dialect = GenericDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql(expr)
            .map_err(|e| BookStoreError::InvalidFilter(format!("{expr}: {e}")))?;
        parser
            .parse_expr()
            .map_err(|e| BookStoreError::InvalidFilter(format!("{expr}: {e}")))?;
        if parser.peek_token().token != Token::EOF {
            return Err(BookStoreError::InvalidFilter(format!(
                "{expr}: unexpected input after expression"
            )));
        }

        let placeholders = count_placeholders(expr)?;
        if placeholders != args.len() {
            return Err(BookStoreError::InvalidFilter(format!(
                "{expr}: {placeholders} placeholder(s) but {} argument(s)",
                args.len()
            )));
        }

        Ok(Filter {
            expr: Some(expr.to_string()),
            args,
        })
    }

    /// Exact match on the row id.
    pub fn by_id(id: RowId) -> Self {
        Filter {
            expr: Some(format!("{} = ?", Column::Id)),
            args: vec![id.to_string()],
        }
    }

    pub fn expr(&self) -> Option<&str> {
        self.expr.as_deref()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_all(&self) -> bool {
        self.expr.is_none()
    }
}

fn count_placeholders(expr: &str) -> Result<usize> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, expr)
        .tokenize()
        .map_err(|e| BookStoreError::InvalidFilter(format!("{expr}: {e}")))?;
    let unsupported = |found: String| {
        BookStoreError::InvalidFilter(format!(
            "{expr}: only positional '?' placeholders are supported, found '{found}'"
        ))
    };
    let mut count = 0;
    let mut tokens = tokens.into_iter().peekable();
    while let Some(token) = tokens.next() {
        match token {
            Token::Placeholder(p) if p == "?" => count += 1,
            Token::Placeholder(p) => return Err(unsupported(p)),
            // `:name` and `@name` are not placeholder tokens to sqlparser but
            // are named parameters to SQLite
            Token::Colon | Token::AtSign => {
                if let Some(Token::Word(word)) = tokens.peek() {
                    return Err(unsupported(format!("{token}{}", word.value)));
                }
            }
            Token::Word(word) if word.quote_style.is_none() && word.value.starts_with('@') => {
                return Err(unsupported(word.value));
            }
            _ => {}
        }
    }
    Ok(count)
}

// ── Queries ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: Column,
    pub direction: Direction,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction)
    }
}

/// Parse a sort order such as `"name ASC, price DESC"`. Direction defaults to
/// ascending and is case-insensitive.
pub fn parse_order(order: &str) -> Result<Vec<SortKey>> {
    let mut keys = Vec::new();
    for part in order.split(',') {
        let words: Vec<&str> = part.split_whitespace().collect();
        let (name, direction) = match words.as_slice() {
            [] if order.trim().is_empty() => continue,
            [name] => (*name, Direction::Asc),
            [name, dir] if dir.eq_ignore_ascii_case("asc") => (*name, Direction::Asc),
            [name, dir] if dir.eq_ignore_ascii_case("desc") => (*name, Direction::Desc),
            _ => return Err(BookStoreError::InvalidOrder(order.to_string())),
        };
        let column = Column::from_name(name)
            .ok_or_else(|| BookStoreError::InvalidOrder(format!("unknown column '{name}'")))?;
        keys.push(SortKey { column, direction });
    }
    Ok(keys)
}

/// A read request: which columns, which rows, in which order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Columns to return. Empty means every column.
    pub projection: Vec<Column>,
    pub filter: Filter,
    pub order: Vec<SortKey>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_projection(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.projection = columns.into_iter().collect();
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_order(mut self, order: &str) -> Result<Self> {
        self.order = parse_order(order)?;
        Ok(self)
    }

    /// The effective projection, with an empty list expanded to all columns.
    pub fn columns(&self) -> Vec<Column> {
        if self.projection.is_empty() {
            Column::ALL.to_vec()
        } else {
            self.projection.clone()
        }
    }
}

// ── Rows ─────────────────────────────────────────────────────────────

/// A value read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Null,
    Integer(i64),
    Text(String),
}

impl StoredValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StoredValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoredValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            StoredValue::Null => serde_json::Value::Null,
            StoredValue::Integer(n) => serde_json::Value::from(*n),
            StoredValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// One result row, in projection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<(Column, StoredValue)>,
}

impl Row {
    pub fn new(values: Vec<(Column, StoredValue)>) -> Self {
        Row { values }
    }

    pub fn get(&self, column: Column) -> Option<&StoredValue> {
        self.values
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.values.iter().map(|(c, _)| *c)
    }

    pub fn id(&self) -> Option<RowId> {
        self.get(Column::Id).and_then(StoredValue::as_integer)
    }

    /// Typed view of the row. `None` unless every column was projected with a
    /// value of its storage type.
    pub fn to_book(&self) -> Option<Book> {
        let text = |c| self.get(c).and_then(StoredValue::as_text).map(str::to_string);
        let integer = |c| self.get(c).and_then(StoredValue::as_integer);
        let category = match self.get(Column::Category)? {
            StoredValue::Null => None,
            StoredValue::Text(s) => Some(s.clone()),
            StoredValue::Integer(_) => return None,
        };
        let supplier_phone = match self.get(Column::SupplierPhone)? {
            StoredValue::Null => 0,
            other => other.as_integer()?,
        };
        Some(Book {
            id: integer(Column::Id)?,
            name: text(Column::Name)?,
            category,
            price: integer(Column::Price)?,
            quantity: integer(Column::Quantity)?,
            supplier_name: text(Column::SupplierName)?,
            supplier_phone,
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .values
            .iter()
            .map(|(c, v)| (c.as_str().to_string(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Result of a read: a finite, forward-only sequence of rows.
///
/// Once consumed it cannot be restarted. A sequence returned by the provider
/// carries the change subscription registered for its locator.
#[derive(Debug)]
pub struct RowSequence {
    rows: std::vec::IntoIter<Row>,
    subscription: Option<Subscription>,
}

impl RowSequence {
    pub fn new(rows: Vec<Row>) -> Self {
        RowSequence {
            rows: rows.into_iter(),
            subscription: None,
        }
    }

    pub fn attach_subscription(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Detach the subscription so it outlives the rows.
    pub fn take_subscription(&mut self) -> Option<Subscription> {
        self.subscription.take()
    }
}

impl Iterator for RowSequence {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for RowSequence {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_counts_placeholders() {
        let filter = Filter::new("price > ? AND name = ?", vec!["5".into(), "Dune".into()]).unwrap();
        assert_eq!(filter.expr(), Some("price > ? AND name = ?"));
        assert_eq!(filter.args().len(), 2);

        let err = Filter::new("price > ?", vec![]).unwrap_err();
        assert!(matches!(err, BookStoreError::InvalidFilter(_)));

        let err = Filter::new("price > 1", vec!["extra".into()]).unwrap_err();
        assert!(matches!(err, BookStoreError::InvalidFilter(_)));
    }

    #[test]
    fn test_filter_ignores_question_marks_in_literals() {
        let filter = Filter::new("name = 'Why?'", vec![]).unwrap();
        assert!(!filter.is_all());
    }

    #[test]
    fn test_filter_rejects_malformed_expressions() {
        assert!(Filter::new("price >", vec![]).is_err());
        assert!(Filter::new("1 = 1; DROP TABLE books", vec![]).is_err());
        assert!(Filter::new("id = $1", vec!["1".into()]).is_err());
        assert!(Filter::new("id = ?1", vec!["1".into()]).is_err());
    }

    #[test]
    fn test_filter_rejects_named_parameters() {
        for expr in ["id = :x", "id = @x", "id = $x", "price > ? AND id = :id"] {
            let err = Filter::new(expr, vec![]).unwrap_err();
            assert!(matches!(err, BookStoreError::InvalidFilter(_)), "{expr}");
        }
        let err = Filter::new("id = :x", vec!["1".into()]).unwrap_err();
        assert!(matches!(err, BookStoreError::InvalidFilter(_)));
    }

    #[test]
    fn test_filter_rejects_operators_outside_the_generic_dialect() {
        let err = Filter::new("name GLOB ?", vec!["D*".into()]).unwrap_err();
        assert!(matches!(err, BookStoreError::InvalidFilter(_)));
        assert!(Filter::new("name LIKE ?", vec!["D%".into()]).is_ok());
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(Filter::new("  ", vec![]).unwrap().is_all());
        assert!(Filter::new("", vec!["1".into()]).is_err());
    }

    #[test]
    fn test_filter_by_id() {
        let filter = Filter::by_id(12);
        assert_eq!(filter.expr(), Some("id = ?"));
        assert_eq!(filter.args(), &["12".to_string()]);
    }

    #[test]
    fn test_parse_order() {
        let keys = parse_order("name, price DESC, quantity asc").unwrap();
        assert_eq!(
            keys,
            vec![
                SortKey { column: Column::Name, direction: Direction::Asc },
                SortKey { column: Column::Price, direction: Direction::Desc },
                SortKey { column: Column::Quantity, direction: Direction::Asc },
            ]
        );
        assert_eq!(keys[1].to_string(), "price DESC");
        assert!(parse_order("").unwrap().is_empty());
        assert!(parse_order("author").is_err());
        assert!(parse_order("name sideways").is_err());
        assert!(parse_order("name,,price").is_err());
    }

    #[test]
    fn test_query_columns_default_to_all() {
        assert_eq!(Query::all().columns(), Column::ALL.to_vec());
        let query = Query::all().with_projection([Column::Name, Column::Price]);
        assert_eq!(query.columns(), vec![Column::Name, Column::Price]);
    }

    #[test]
    fn test_row_to_book() {
        let row = Row::new(vec![
            (Column::Id, StoredValue::Integer(1)),
            (Column::Name, StoredValue::Text("Dune".into())),
            (Column::Category, StoredValue::Null),
            (Column::Price, StoredValue::Integer(10)),
            (Column::Quantity, StoredValue::Integer(3)),
            (Column::SupplierName, StoredValue::Text("Acme".into())),
            (Column::SupplierPhone, StoredValue::Integer(0)),
        ]);
        let book = row.to_book().unwrap();
        assert_eq!(book.name, "Dune");
        assert_eq!(book.category_label(), "unknown");
        assert_eq!(row.id(), Some(1));

        let partial = Row::new(vec![(Column::Name, StoredValue::Text("Dune".into()))]);
        assert_eq!(partial.to_book(), None);
        assert_eq!(partial.to_json(), serde_json::json!({ "name": "Dune" }));
    }

    #[test]
    fn test_row_sequence_is_forward_only() {
        let mut rows = RowSequence::new(vec![Row::new(vec![]), Row::new(vec![])]);
        assert_eq!(rows.len(), 2);
        assert!(rows.next().is_some());
        assert!(rows.next().is_some());
        assert!(rows.next().is_none());
        assert!(rows.next().is_none());
    }
}
