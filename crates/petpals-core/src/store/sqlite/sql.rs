//! Translation of [`Query`] into `SQLite` over JSON document bodies

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::store::{CursorMarker, Direction, Filter, Query};

/// SQL text plus its positional parameters
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Expression extracting `field` from the document body.
///
/// Field names are validated by [`Query::validate`] before reaching here.
fn key_expr(field: &str) -> String {
    format!("json_extract(data, '$.{field}')")
}

pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => number.as_i64().map_or_else(
            || SqlValue::Real(number.as_f64().unwrap_or_default()),
            SqlValue::Integer,
        ),
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

fn filter_clause(filter: &Filter, params: &mut Vec<SqlValue>) -> String {
    match filter {
        Filter::Equal { field, value } if value.is_null() => {
            format!("{} IS NULL", key_expr(field))
        }
        Filter::Equal { field, value } => {
            params.push(to_sql_value(value));
            format!("{} = ?", key_expr(field))
        }
        Filter::Prefix { field, prefix } => {
            let key = key_expr(field);
            params.push(SqlValue::Integer(
                i64::try_from(prefix.chars().count()).unwrap_or(i64::MAX),
            ));
            params.push(SqlValue::Text(prefix.clone()));
            format!("(typeof({key}) = 'text' AND substr({key}, 1, ?) = ?)")
        }
    }
}

/// Rows on one side of `marker`.
///
/// `greater` selects rows above the marker in ascending (value, id) terms.
/// `NULL` sorts first in `SQLite`, so a null marker needs its own shape.
fn bound_clause(
    key: &str,
    marker: &CursorMarker,
    greater: bool,
    inclusive: bool,
    params: &mut Vec<SqlValue>,
) -> String {
    let id_op = match (greater, inclusive) {
        (true, false) => ">",
        (true, true) => ">=",
        (false, false) => "<",
        (false, true) => "<=",
    };
    let id = SqlValue::Text(marker.id().as_str().to_string());

    if marker.value().is_null() {
        params.push(id);
        if greater {
            format!("({key} IS NOT NULL OR ({key} IS NULL AND id {id_op} ?))")
        } else {
            format!("({key} IS NULL AND id {id_op} ?)")
        }
    } else {
        let value_op = if greater { ">" } else { "<" };
        let value = to_sql_value(marker.value());
        params.push(value.clone());
        params.push(value);
        params.push(id);
        format!("({key} {value_op} ? OR ({key} = ? AND id {id_op} ?))")
    }
}

fn where_clause(query: &Query, with_bounds: bool, params: &mut Vec<SqlValue>) -> String {
    params.push(SqlValue::Text(query.collection_name().to_string()));
    let mut clauses = vec!["collection = ?".to_string()];

    for filter in query.filter_list() {
        clauses.push(filter_clause(filter, params));
    }

    if with_bounds {
        let order = query.order();
        let key = key_expr(&order.field);
        let ascending = order.direction == Direction::Ascending;

        if let Some(start) = query.start() {
            clauses.push(bound_clause(
                &key,
                start.marker(),
                ascending,
                start.is_inclusive(),
                params,
            ));
        }
        if let Some(end) = query.end() {
            clauses.push(bound_clause(&key, end, !ascending, false, params));
        }
    }

    clauses.join(" AND ")
}

pub fn select(query: &Query) -> CompiledQuery {
    let mut params = Vec::new();
    let filter = where_clause(query, true, &mut params);
    let order = query.order();
    let direction = order.direction.as_sql();

    let mut sql = format!(
        "SELECT id, data FROM documents WHERE {filter} ORDER BY {} {direction}, id {direction}",
        key_expr(&order.field)
    );
    if let Some(limit) = query.limit_value() {
        sql.push_str(" LIMIT ?");
        params.push(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    }

    CompiledQuery { sql, params }
}

pub fn count(query: &Query) -> CompiledQuery {
    let mut params = Vec::new();
    let filter = where_clause(query, false, &mut params);
    CompiledQuery {
        sql: format!("SELECT COUNT(*) FROM documents WHERE {filter}"),
        params,
    }
}
