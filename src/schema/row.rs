/// Source rows: one spreadsheet line of named, sparsely-populated cells.
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single cell value as it arrives from the spreadsheet reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Empty,
}

impl Value {
    /// Empty cells, empty strings and `NaN` are all the same "no data".
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(n) => n.is_nan(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            // Spreadsheet cells hold whole numbers far more often than not;
            // `3.0` should read back as `3`.
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Self::Number(n) if n.is_nan() => Ok(()),
            Self::Number(n) => write!(f, "{}", n),
            Self::Empty => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

/// An ordered mapping of field name to cell value.
///
/// Field order follows the source columns. Inserting an existing name
/// replaces the value in place and keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builder-style insert, handy for literals in tests and tools.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns the value only if it carries data.
    pub fn present(&self, name: &str) -> Option<&Value> {
        self.get(name).filter(|v| !v.is_absent())
    }

    /// True if `name` exists and is not absent.
    pub fn has(&self, name: &str) -> bool {
        self.present(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Copy out the listed fields that carry data, in the order of `names`.
    pub fn project<'a, I>(&self, names: I) -> Row
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = Row::new();
        for name in names {
            if let Some(value) = self.present(name) {
                out.insert(name, value.clone());
            }
        }
        out
    }

    /// Copy out every field that carries data.
    pub fn non_absent(&self) -> Row {
        Row {
            fields: self
                .fields
                .iter()
                .filter(|(_, v)| !v.is_absent())
                .cloned()
                .collect(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = Row;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of field name to cell value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
        let mut row = Row::new();
        while let Some((name, value)) = access.next_entry::<String, Value>()? {
            row.insert(name, value);
        }
        Ok(row)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Row, D::Error> {
        deserializer.deserialize_map(RowVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_values() {
        assert!(Value::Empty.is_absent());
        assert!(Value::Text(String::new()).is_absent());
        assert!(Value::Number(f64::NAN).is_absent());
        assert!(!Value::Text("stop".to_string()).is_absent());
        assert!(!Value::Number(0.0).is_absent());
    }

    #[test]
    fn whole_numbers_display_without_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Number(-2.0).to_string(), "-2");
        assert_eq!(Value::Empty.to_string(), "");
    }

    #[test]
    fn insert_keeps_position_on_replace() {
        let mut row = Row::new().with("A", "1").with("B", "2");
        row.insert("A", "3");
        let names: Vec<&str> = row.names().collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(row.get("A"), Some(&Value::from("3")));
    }

    #[test]
    fn project_skips_absent_and_missing() {
        let row = Row::new()
            .with("Music", "bgm_main")
            .with("Sound", "")
            .with("Volume", f64::NAN)
            .with("Text", "Hello");
        let subset = row.project(["Music", "Sound", "Volume", "Speaker"]);
        assert_eq!(subset.len(), 1);
        assert!(subset.has("Music"));
        assert!(!subset.has("Text"));
    }

    #[test]
    fn non_absent_filters_everything() {
        let row = Row::new().with("A", "").with("B", Value::Empty).with("C", "x");
        let filtered = row.non_absent();
        assert_eq!(filtered.len(), 1);
        assert!(filtered.has("C"));
    }

    #[test]
    fn ron_preserves_column_order() {
        let input = r#"{"Text": "Hello", "Music": "bgm_main", "Pause": 1.5, "Note": ()}"#;
        let row: Row = ron::from_str(input).unwrap();
        let names: Vec<&str> = row.names().collect();
        assert_eq!(names, vec!["Text", "Music", "Pause", "Note"]);
        assert_eq!(row.get("Pause"), Some(&Value::Number(1.5)));
        assert_eq!(row.get("Note"), Some(&Value::Empty));
    }
}
