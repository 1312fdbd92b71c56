use serde_json::{Map, Value};

/// One sort criterion: a field and an optional direction/options value.
#[derive(Debug, Clone, PartialEq)]
pub struct SortClause {
    pub field: String,
    pub options: Option<Value>,
}

impl SortClause {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            options: None,
        }
    }

    pub fn with_options(field: impl Into<String>, options: Value) -> Self {
        Self {
            field: field.into(),
            options: Some(options),
        }
    }

    pub fn render(&self) -> Value {
        match &self.options {
            None => Value::String(self.field.clone()),
            Some(options) => {
                let mut clause = Map::new();
                clause.insert(self.field.clone(), options.clone());
                Value::Object(clause)
            }
        }
    }
}

/// Parse `"name"`, `{"age": "desc"}` or an array of those into clauses.
pub fn parse(fragment: Value) -> Vec<SortClause> {
    match fragment {
        Value::String(field) if !field.trim().is_empty() => vec![SortClause::new(field)],
        Value::Object(map) => map
            .into_iter()
            .map(|(field, options)| SortClause::with_options(field, options))
            .collect(),
        Value::Array(items) => items.into_iter().flat_map(parse).collect(),
        _ => vec![],
    }
}

/// Later clauses replace earlier ones for the same field in place; new fields append.
pub(crate) fn merge(current: &[SortClause], new: Vec<SortClause>) -> Vec<SortClause> {
    let mut result = current.to_vec();
    for clause in new {
        match result.iter_mut().find(|c| c.field == clause.field) {
            Some(existing) => *existing = clause,
            None => result.push(clause),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_strings_objects_and_arrays() {
        let clauses = parse(json!(["name", {"age": "desc"}]));
        assert_eq!(
            clauses,
            vec![
                SortClause::new("name"),
                SortClause::with_options("age", json!("desc"))
            ]
        );
        assert!(parse(json!(null)).is_empty());
        assert!(parse(json!("")).is_empty());
    }

    #[test]
    fn merge_replaces_same_field_in_place() {
        let current = parse(json!(["name", "age"]));
        let merged = merge(&current, parse(json!([{"name": "desc"}, "rating"])));
        let rendered: Vec<Value> = merged.iter().map(SortClause::render).collect();
        assert_eq!(rendered, vec![json!({"name": "desc"}), json!("age"), json!("rating")]);
    }
}
