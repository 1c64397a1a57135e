//! Field maps for positional rows
//!
//! Orders and positions arrive as long positional arrays. Keyed
//! representations project them into labeled records through a field map.

use serde_json::{Map, Value};

/// Label and wire index of a projected field
pub type FieldMap = [(&'static str, usize)];

/// Project a positional row through a field map. Indexes past the end of
/// the row read as null.
pub fn project(row: &[Value], fields: &FieldMap) -> Value {
    let mut record = Map::new();
    for (label, idx) in fields {
        record.insert((*label).to_string(), row.get(*idx).cloned().unwrap_or(Value::Null));
    }
    Value::Object(record)
}

/// A delta payload in the scope's representation mode
#[derive(Debug, Clone, PartialEq)]
pub enum Record<T> {
    /// The row as received
    Raw(Value),
    /// The projected, typed record
    Keyed(T),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_pads_missing_indexes() {
        let fields: &FieldMap = &[("id", 0), ("flags", 12)];
        let row = vec![json!(7), json!(null)];
        assert_eq!(project(&row, fields), json!({ "id": 7, "flags": null }));
    }
}
