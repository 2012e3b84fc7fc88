use rusqlite::types::{Value, ValueRef};
use rusqlite::{Batch, Connection};
use serde::Serialize;
use serde_json::{json, Map};
use thiserror::Error;
use tracing::debug;

/// A statement the store rejected. `message` is SQLite's text, unmodified,
/// except for input that is blank or holds more than one statement.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct QueryError {
    pub sql: String,
    pub message: String,
}

impl QueryError {
    fn new(sql: &str, err: rusqlite::Error) -> Self {
        Self {
            sql: sql.to_string(),
            message: err.to_string(),
        }
    }

    fn rejected(sql: &str, message: &str) -> Self {
        Self {
            sql: sql.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    NonNumeric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub kinds: Vec<ColumnKind>,
}

impl QueryResult {
    /// Columns a chart can plot.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .zip(&self.kinds)
            .filter(|(_, kind)| **kind == ColumnKind::Numeric)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (name, value) in self.columns.iter().zip(row) {
                    obj.insert(name.clone(), value_to_json(value));
                }
                serde_json::Value::Object(obj)
            })
            .collect();
        json!({
            "columns": self.columns,
            "kinds": self.kinds,
            "rows": rows,
        })
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(n) => json!(n),
        Value::Real(x) => json!(x),
        Value::Text(s) => json!(s),
        Value::Blob(b) => json!(format!("<blob {} bytes>", b.len())),
    }
}

pub fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(n) => n.to_string(),
        Value::Real(x) => x.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

/// A column is numeric when it holds at least one value and every non-null
/// value is an integer or a real.
fn classify(rows: &[Vec<Value>], column: usize) -> ColumnKind {
    let mut saw_number = false;
    for row in rows {
        match row.get(column) {
            Some(Value::Integer(_)) | Some(Value::Real(_)) => saw_number = true,
            Some(Value::Null) | None => {}
            Some(_) => return ColumnKind::NonNumeric,
        }
    }
    if saw_number {
        ColumnKind::Numeric
    } else {
        ColumnKind::NonNumeric
    }
}

/// Runs `sql` as given and collects the full result set. Any single statement
/// is accepted. Text with no statement, or with more than one, is rejected
/// before anything executes.
pub fn execute(conn: &Connection, sql: &str) -> Result<QueryResult, QueryError> {
    let mut statements = Batch::new(conn, sql);
    let mut stmt = statements
        .next()
        .map_err(|e| QueryError::new(sql, e))?
        .ok_or_else(|| QueryError::rejected(sql, "empty statement"))?;
    if statements.next().map_err(|e| QueryError::new(sql, e))?.is_some() {
        return Err(QueryError::rejected(sql, "You can only execute one statement at a time."));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(|e| QueryError::new(sql, e))?;
    while let Some(row) = cursor.next().map_err(|e| QueryError::new(sql, e))? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            let value = row.get_ref(i).map_err(|e| QueryError::new(sql, e))?;
            values.push(match value {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(n) => Value::Integer(n),
                ValueRef::Real(x) => Value::Real(x),
                ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(b) => Value::Blob(b.to_vec()),
            });
        }
        rows.push(values);
    }

    let kinds = (0..width).map(|i| classify(&rows, i)).collect();
    debug!(columns = width, rows = rows.len(), "Query executed");
    Ok(QueryResult { columns, rows, kinds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::RawRecord;
    use crate::database::predefined::PREDEFINED_QUERIES;
    use crate::database::repo::{load, open_in_memory};
    use crate::transform::normalizer::normalize;
    use anyhow::Result;

    fn seeded() -> Result<Connection> {
        let mut conn = open_in_memory()?;
        let records: Vec<RawRecord> = [
            json!({ "id": 1, "department": "Asian Art", "rank": 5, "colors": [{ "color": "#000", "percent": 12.5 }] }),
            json!({ "id": 2, "department": "Asian Art", "rank": 9 }),
            json!({ "id": 3, "department": "Modern Art", "rank": 1 }),
            json!({ "id": 4, "rank": 3 }),
        ]
        .iter()
        .map(RawRecord::from_json)
        .collect();
        load(&mut conn, &normalize(&records))?;
        Ok(conn)
    }

    #[test]
    fn test_department_counts() -> Result<()> {
        let conn = seeded()?;
        let result = execute(
            &conn,
            "SELECT department, COUNT(*) as cnt FROM artifact_metadata GROUP BY department;",
        )?;

        assert_eq!(result.columns, vec!["department", "cnt"]);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.kinds, vec![ColumnKind::NonNumeric, ColumnKind::Numeric]);
        assert_eq!(result.numeric_columns(), vec!["cnt"]);

        let asian = result
            .rows
            .iter()
            .find(|row| row[0] == Value::Text("Asian Art".into()))
            .map(|row| row[1].clone());
        assert_eq!(asian, Some(Value::Integer(2)));
        assert!(result.rows.iter().any(|row| row[0] == Value::Null && row[1] == Value::Integer(1)));
        Ok(())
    }

    #[test]
    fn test_unknown_table_is_structured_error() {
        let conn = open_in_memory().unwrap();
        let err = execute(&conn, "SELECT * FROM no_such_table;").unwrap_err();
        assert!(err.message.contains("no such table: no_such_table"));
        assert_eq!(err.sql, "SELECT * FROM no_such_table;");
    }

    #[test]
    fn test_malformed_sql_is_structured_error() {
        let conn = open_in_memory().unwrap();
        let err = execute(&conn, "SELEC id FROM artifact_metadata").unwrap_err();
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_multiple_statements_are_rejected_unexecuted() -> Result<()> {
        let conn = seeded()?;
        let err = execute(&conn, "DELETE FROM artifact_metadata; SELECT 1").unwrap_err();
        assert!(err.message.contains("one statement"));
        assert!(execute(&conn, "SELECT 1; SELECT 2;").is_err());

        let remaining = execute(&conn, "SELECT COUNT(*) FROM artifact_metadata")?;
        assert_eq!(remaining.rows, vec![vec![Value::Integer(4)]]);
        Ok(())
    }

    #[test]
    fn test_trailing_comment_is_single_statement() -> Result<()> {
        let conn = seeded()?;
        let result = execute(&conn, "SELECT 1 AS one; -- done")?;
        assert_eq!(result.rows, vec![vec![Value::Integer(1)]]);
        Ok(())
    }

    #[test]
    fn test_blank_input_is_empty_statement() {
        let conn = open_in_memory().unwrap();
        for sql in ["", "   ", "-- hi"] {
            let err = execute(&conn, sql).unwrap_err();
            assert_eq!(err.message, "empty statement", "input {:?}", sql);
        }
    }

    #[test]
    fn test_real_and_null_columns() -> Result<()> {
        let conn = seeded()?;
        let result = execute(&conn, "SELECT AVG(rank) AS avg_rank, NULL AS nothing FROM artifact_media;")?;
        assert_eq!(result.kinds, vec![ColumnKind::Numeric, ColumnKind::NonNumeric]);
        assert_eq!(result.rows[0][0], Value::Real(4.5));
        Ok(())
    }

    #[test]
    fn test_empty_result_is_non_numeric() -> Result<()> {
        let conn = open_in_memory()?;
        let result = execute(&conn, "SELECT id FROM artifact_metadata;")?;
        assert!(result.rows.is_empty());
        assert_eq!(result.kinds, vec![ColumnKind::NonNumeric]);
        Ok(())
    }

    #[test]
    fn test_every_predefined_query_runs() -> Result<()> {
        let conn = seeded()?;
        for (label, sql) in PREDEFINED_QUERIES {
            assert!(execute(&conn, sql).is_ok(), "predefined query failed: {}", label);
        }
        Ok(())
    }

    #[test]
    fn test_json_rendering() -> Result<()> {
        let conn = seeded()?;
        let result = execute(&conn, "SELECT id, percent FROM artifact_metadata JOIN artifact_colors ON id = objectid;")?;
        let rendered = result.to_json();
        assert_eq!(rendered["kinds"], json!(["numeric", "numeric"]));
        assert_eq!(rendered["rows"][0], json!({ "id": 1, "percent": 12.5 }));
        Ok(())
    }
}
