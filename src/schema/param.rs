/// Parameter declarations: the contract between a generator and the row
/// fields it reacts to.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel value that switches a field to its `stop_format`.
pub const DEFAULT_STOP_WORD: &str = "stop";

/// How a field's raw value is rewritten before emission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Translate {
    /// Pass the value through unmodified.
    #[default]
    None,
    /// Always look the value up under this translation type.
    Type(String),
    /// Try each type in order; the first one that knows the value wins.
    Candidates(Vec<String>),
}

/// Declaration for a single row field.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "RawParamDecl")]
pub struct ParamDecl {
    /// Grouping label, informational only.
    pub category: Option<String>,
    pub translate: Translate,
    /// Template with a single `{value}` placeholder.
    pub format: Option<String>,
    /// Used instead of `format` when the value equals `stop_word`.
    pub stop_format: Option<String>,
    pub stop_word: Option<String>,
    pub default: Option<String>,
    /// Destination column for record-oriented engines.
    pub output_key: Option<String>,
}

impl ParamDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn translate(mut self, translate_type: &str) -> Self {
        self.translate = Translate::Type(translate_type.to_string());
        self
    }

    pub fn candidates(mut self, types: &[&str]) -> Self {
        self.translate = Translate::Candidates(types.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn stop_format(mut self, stop_format: &str) -> Self {
        self.stop_format = Some(stop_format.to_string());
        self
    }

    pub fn stop_word(mut self, stop_word: &str) -> Self {
        self.stop_word = Some(stop_word.to_string());
        self
    }

    pub fn default_value(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn output_key(mut self, key: &str) -> Self {
        self.output_key = Some(key.to_string());
        self
    }

    pub fn effective_stop_word(&self) -> &str {
        self.stop_word.as_deref().unwrap_or(DEFAULT_STOP_WORD)
    }

    /// Translation types this declaration may consult, in lookup order.
    pub fn translate_types(&self) -> Vec<&str> {
        match &self.translate {
            Translate::None => Vec::new(),
            Translate::Type(t) => vec![t.as_str()],
            Translate::Candidates(ts) => ts.iter().map(String::as_str).collect(),
        }
    }
}

// Authoring shape. Unknown keys are ignored so that declaration files can
// carry tool-specific metadata.
#[derive(Debug, Deserialize)]
struct RawParamDecl {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    translate_type: Option<String>,
    #[serde(default)]
    translate_candidates: Option<Vec<String>>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    stop_format: Option<String>,
    #[serde(default)]
    stop_word: Option<String>,
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    output_key: Option<String>,
}

impl TryFrom<RawParamDecl> for ParamDecl {
    type Error = String;

    fn try_from(raw: RawParamDecl) -> Result<Self, Self::Error> {
        let translate = match (raw.translate_type, raw.translate_candidates) {
            (Some(_), Some(_)) => {
                return Err(
                    "translate_type and translate_candidates are mutually exclusive".to_string(),
                )
            }
            (Some(t), None) => Translate::Type(t),
            (None, Some(ts)) if !ts.is_empty() => Translate::Candidates(ts),
            _ => Translate::None,
        };
        Ok(ParamDecl {
            category: raw.category,
            translate,
            format: raw.format,
            stop_format: raw.stop_format,
            stop_word: raw.stop_word,
            default: raw.default,
            output_key: raw.output_key,
        })
    }
}

/// Ordered set of field declarations owned by one generator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSchema {
    entries: Vec<(String, ParamDecl)>,
}

impl ParamSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style declaration. Redeclaring a field replaces it.
    pub fn field(mut self, name: &str, decl: ParamDecl) -> Self {
        self.insert(name, decl);
        self
    }

    pub fn insert(&mut self, name: &str, decl: ParamDecl) {
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| n == name) {
            slot.1 = decl;
        } else {
            self.entries.push((name.to_string(), decl));
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamDecl> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamDecl)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a schema from RON: a map of field name to declaration.
    pub fn parse_ron(input: &str) -> Result<ParamSchema, ron::error::SpannedError> {
        // RON maps carry no order guarantee through HashMap; sort by name so
        // the result is at least deterministic.
        let raw: HashMap<String, ParamDecl> = ron::from_str(input)?;
        let mut entries: Vec<(String, ParamDecl)> = raw.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ParamSchema { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let decl = ParamDecl::new()
            .translate("Music")
            .format("play music {value}")
            .stop_format("stop music");
        assert_eq!(decl.translate, Translate::Type("Music".to_string()));
        assert_eq!(decl.effective_stop_word(), "stop");
        assert_eq!(decl.translate_types(), vec!["Music"]);
    }

    #[test]
    fn candidates_replace_single_type() {
        let decl = ParamDecl::new()
            .translate("Character")
            .candidates(&["Character", "Background"]);
        assert_eq!(decl.translate_types(), vec!["Character", "Background"]);
    }

    #[test]
    fn schema_redeclare_replaces_in_place() {
        let schema = ParamSchema::new()
            .field("Music", ParamDecl::new())
            .field("Text", ParamDecl::new())
            .field("Music", ParamDecl::new().format("{value}"));
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["Music", "Text"]);
        assert_eq!(schema.get("Music").unwrap().format.as_deref(), Some("{value}"));
    }

    #[test]
    fn parse_ron_ignores_unknown_keys() {
        let input = r#"{
            "Hide": (
                translate_candidates: ["Character", "Background", "Event"],
                format: "hide {value}",
                folder: "images/",
            ),
            "Volume": (format: " volume {value}"),
        }"#;
        let schema = ParamSchema::parse_ron(input).unwrap();
        assert_eq!(schema.len(), 2);
        let hide = schema.get("Hide").unwrap();
        assert_eq!(
            hide.translate,
            Translate::Candidates(vec![
                "Character".to_string(),
                "Background".to_string(),
                "Event".to_string()
            ])
        );
    }

    #[test]
    fn parse_ron_rejects_both_translation_kinds() {
        let input = r#"{ "X": (translate_type: "A", translate_candidates: ["B"]) }"#;
        assert!(ParamSchema::parse_ron(input).is_err());
    }
}
