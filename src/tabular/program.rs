use crate::errors::{Error, Result};
use crate::llm::{build_validator, check_value};
use crate::utils::strip_code_fences;
use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;

pub type Row = Map<String, Value>;

/// JSON Schema every generated program must satisfy
pub const PROGRAM_SCHEMA: &str = r#"{
  "type": "object",
  "additionalProperties": false,
  "properties": {
    "filters": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["column", "op", "value"],
        "additionalProperties": false,
        "properties": {
          "column": { "type": "string", "minLength": 1 },
          "op": { "enum": ["eq", "ne", "contains", "gt", "gte", "lt", "lte"] },
          "value": {}
        }
      }
    },
    "sort": {
      "type": "object",
      "required": ["column"],
      "additionalProperties": false,
      "properties": {
        "column": { "type": "string", "minLength": 1 },
        "descending": { "type": "boolean" }
      }
    },
    "limit": { "type": "integer", "minimum": 1 },
    "select": { "type": "array", "items": { "type": "string" } },
    "aggregate": {
      "type": "object",
      "required": ["op"],
      "additionalProperties": false,
      "properties": {
        "op": { "enum": ["count", "sum", "avg", "min", "max"] },
        "column": { "type": "string" }
      }
    },
    "set": { "type": "object" }
  }
}"#;

static PROGRAM_VALIDATOR: Lazy<std::result::Result<Validator, String>> =
    Lazy::new(|| build_validator(PROGRAM_SCHEMA).map_err(|e| e.to_string()));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Contains,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub op: AggregateOp,
    #[serde(default)]
    pub column: Option<String>,
}

/// A declarative query over one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryProgram {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Option<Sort>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub select: Vec<String>,
    #[serde(default)]
    pub aggregate: Option<Aggregate>,
    /// Column assignments, only meaningful for updates
    #[serde(default)]
    pub set: Row,
}

impl QueryProgram {
    /// Parses LLM output (markdown fences allowed) into a schema-checked program
    pub fn parse(text: &str) -> Result<Self> {
        let cleaned = strip_code_fences(text);
        let value: Value = serde_json::from_str(&cleaned)
            .map_err(|e| Error::Validation(format!("query program is not JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let validator = PROGRAM_VALIDATOR
            .as_ref()
            .map_err(|e| Error::Schema(e.clone()))?;
        check_value(validator, &value)?;
        let program: QueryProgram = serde_json::from_value(value)?;
        if let Some(aggregate) = &program.aggregate {
            if aggregate.op != AggregateOp::Count && aggregate.column.is_none() {
                return Err(Error::Validation(format!(
                    "aggregate {:?} needs a column",
                    aggregate.op
                )));
            }
        }
        Ok(program)
    }

    /// Read-only programs must not carry assignments
    pub fn ensure_read_only(&self) -> Result<()> {
        if self.set.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(
                "search programs cannot assign columns".to_string(),
            ))
        }
    }

    /// Mutation guard: an update assigns at least one column, targets rows
    /// through at least one filter and does nothing else.
    pub fn ensure_update(&self) -> Result<()> {
        if self.set.is_empty() {
            return Err(Error::Validation("update program has no `set`".into()));
        }
        if self.filters.is_empty() {
            return Err(Error::Validation(
                "update program must filter the rows it changes".into(),
            ));
        }
        if self.aggregate.is_some() || self.sort.is_some() || !self.select.is_empty() {
            return Err(Error::Validation(
                "update program may only contain `filters`, `set` and `limit`".into(),
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| filter_matches(f, row))
    }

    /// Evaluates the program against `rows` without mutating them
    pub fn evaluate(&self, rows: &[Row]) -> Value {
        let mut matched: Vec<&Row> = rows.iter().filter(|row| self.matches(row)).collect();

        if let Some(sort) = &self.sort {
            matched.sort_by(|a, b| {
                let ordering = compare_cells(a.get(&sort.column), b.get(&sort.column));
                if sort.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        if let Some(aggregate) = &self.aggregate {
            return json!({
                "aggregate": aggregate.op,
                "column": aggregate.column,
                "value": aggregate_rows(aggregate, &matched),
                "matched": matched.len(),
            });
        }

        let projected: Vec<Value> = matched
            .iter()
            .map(|row| Value::Object(self.project(row)))
            .collect();
        json!({ "matched": projected.len(), "rows": projected })
    }

    /// Applies `set` to matching rows (up to `limit`); returns how many changed
    pub fn apply(&self, rows: &mut [Row]) -> usize {
        let limit = self.limit.unwrap_or(usize::MAX);
        let mut updated = 0;
        for row in rows.iter_mut() {
            if updated >= limit {
                break;
            }
            if self.matches(row) {
                for (column, value) in &self.set {
                    row.insert(column.clone(), value.clone());
                }
                updated += 1;
            }
        }
        updated
    }

    fn project(&self, row: &Row) -> Row {
        if self.select.is_empty() {
            return row.clone();
        }
        self.select
            .iter()
            .filter_map(|column| row.get(column).map(|v| (column.clone(), v.clone())))
            .collect()
    }
}

/// Reads a cell as a number; strings like "5.2m" or "$1,200" keep their
/// leading numeric part.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s.trim().trim_start_matches('$').replace(',', "");
            let end = cleaned
                .char_indices()
                .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-'))
                .map(|(i, c)| i + c.len_utf8())
                .last()?;
            cleaned[..end].parse().ok()
        }
        _ => None,
    }
}

fn filter_matches(filter: &Filter, row: &Row) -> bool {
    let Some(cell) = row.get(&filter.column) else {
        return filter.op == FilterOp::Ne;
    };
    match filter.op {
        FilterOp::Eq => values_equal(cell, &filter.value),
        FilterOp::Ne => !values_equal(cell, &filter.value),
        FilterOp::Contains => text_of(cell)
            .to_lowercase()
            .contains(&text_of(&filter.value).to_lowercase()),
        FilterOp::Gt => numeric_cmp(cell, &filter.value) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(
            numeric_cmp(cell, &filter.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::Lt => numeric_cmp(cell, &filter.value) == Some(Ordering::Less),
        FilterOp::Lte => matches!(
            numeric_cmp(cell, &filter.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

fn values_equal(cell: &Value, expected: &Value) -> bool {
    match (cell, expected) {
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            match (numeric_value(cell), numeric_value(expected)) {
                (Some(a), Some(b)) => a == b,
                _ => cell == expected,
            }
        }
        _ => cell == expected,
    }
}

fn numeric_cmp(cell: &Value, expected: &Value) -> Option<Ordering> {
    numeric_value(cell)?.partial_cmp(&numeric_value(expected)?)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (numeric_value(a), numeric_value(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => text_of(a).cmp(&text_of(b)),
        },
    }
}

fn aggregate_rows(aggregate: &Aggregate, rows: &[&Row]) -> Value {
    if aggregate.op == AggregateOp::Count {
        return json!(rows.len());
    }
    let column = aggregate.column.as_deref().unwrap_or_default();
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.get(column).and_then(numeric_value))
        .collect();
    if values.is_empty() {
        return Value::Null;
    }
    let result = match aggregate.op {
        AggregateOp::Sum => values.iter().sum(),
        AggregateOp::Avg => values.iter().sum::<f64>() / values.len() as f64,
        AggregateOp::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        AggregateOp::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregateOp::Count => values.len() as f64,
    };
    json!(result)
}
