/// The generator contract: one pipeline stage that claims some row fields
/// and turns them into commands.
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::core::config::EngineConfig;
use crate::core::template::{self, TemplateError};
use crate::core::translate::Translator;
use crate::schema::command::Command;
use crate::schema::param::ParamSchema;
use crate::schema::row::Row;

/// Priority for generators that do not state one: run last.
pub const DEFAULT_PRIORITY: i32 = 999;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("failed to construct generator '{generator}': {message}")]
    Construction { generator: String, message: String },
    #[error("generator '{generator}' failed: {message}")]
    Execution { generator: String, message: String },
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}

impl GeneratorError {
    pub fn execution(generator: &str, message: impl Into<String>) -> Self {
        Self::Execution {
            generator: generator.to_string(),
            message: message.into(),
        }
    }

    pub fn construction(generator: &str, message: impl Into<String>) -> Self {
        Self::Construction {
            generator: generator.to_string(),
            message: message.into(),
        }
    }
}

/// Which row fields a generator is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputScope {
    /// Only the fields named in its schema.
    #[default]
    Declared,
    /// Every field of the row that carries data.
    AllFields,
}

/// Shared, read-only state every generator is built from.
#[derive(Debug, Clone)]
pub struct GeneratorContext {
    pub translator: Arc<Translator>,
    pub config: EngineConfig,
}

impl GeneratorContext {
    pub fn new(translator: Arc<Translator>, config: EngineConfig) -> Self {
        Self { translator, config }
    }
}

/// A pipeline stage.
///
/// `process` receives only the fields the stage declared (or all fields for
/// [`InputScope::AllFields`]), never an empty row. Returning `Ok(vec![])`
/// means "nothing to emit"; `Err` is reserved for states the stage cannot
/// handle, and only drops this stage's output for the current row.
pub trait Generator: Send + Sync {
    /// Stable identity used in logs and pipeline info.
    fn name(&self) -> &str;

    /// Output family, informational.
    fn category(&self) -> &str;

    /// Lower runs first.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Fields this stage reacts to. An empty schema is never invoked.
    fn params(&self) -> &ParamSchema;

    fn input_scope(&self) -> InputScope {
        InputScope::Declared
    }

    /// A field that, when present, gives this stage the row to itself.
    fn exclusive_trigger(&self) -> Option<&str> {
        None
    }

    /// Whether this stage still runs on rows claimed by an exclusive stage.
    fn runs_alongside_exclusive(&self) -> bool {
        false
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError>;
}

impl fmt::Debug for dyn Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("name", &self.name())
            .field("category", &self.category())
            .field("priority", &self.priority())
            .finish()
    }
}

/// Read helpers over a (resolved) row, driven by a generator's schema.
pub struct Fields<'a> {
    schema: &'a ParamSchema,
    row: &'a Row,
}

impl<'a> Fields<'a> {
    pub fn new(schema: &'a ParamSchema, row: &'a Row) -> Self {
        Self { schema, row }
    }

    pub fn row(&self) -> &'a Row {
        self.row
    }

    pub fn has(&self, name: &str) -> bool {
        self.row.has(name)
    }

    /// The field's text, if it carries data.
    pub fn value(&self, name: &str) -> Option<String> {
        self.row.present(name).map(|v| v.to_string())
    }

    /// The field's text, or `""`.
    pub fn text(&self, name: &str) -> String {
        self.value(name).unwrap_or_default()
    }

    /// The field's text, falling back to the declared default.
    pub fn value_or_default(&self, name: &str) -> Option<String> {
        self.value(name)
            .or_else(|| self.schema.get(name).and_then(|d| d.default.clone()))
    }

    /// Render the field's `format` with its value; `""` when the field is
    /// absent or declares no format.
    pub fn sentence(&self, name: &str) -> Result<String, TemplateError> {
        match self.value(name) {
            Some(value) => self.render(name, &value),
            None => Ok(String::new()),
        }
    }

    /// Like [`Fields::sentence`], but an absent field uses its default.
    pub fn sentence_or_default(&self, name: &str) -> Result<String, TemplateError> {
        match self.value_or_default(name) {
            Some(value) => self.render(name, &value),
            None => Ok(String::new()),
        }
    }

    /// True if the field's value equals its declared stop word.
    pub fn is_stop(&self, name: &str) -> bool {
        let stop_word = self
            .schema
            .get(name)
            .map(|d| d.effective_stop_word())
            .unwrap_or(crate::schema::param::DEFAULT_STOP_WORD);
        self.row
            .present(name)
            .is_some_and(|v| v.to_string() == stop_word)
    }

    pub fn stop_format(&self, name: &str) -> Option<&'a str> {
        self.schema.get(name).and_then(|d| d.stop_format.as_deref())
    }

    /// Destination column declared for the field, or the field name itself.
    pub fn output_key(&self, name: &'a str) -> &'a str {
        self.schema
            .get(name)
            .and_then(|d| d.output_key.as_deref())
            .unwrap_or(name)
    }

    fn render(&self, name: &str, value: &str) -> Result<String, TemplateError> {
        match self.schema.get(name).and_then(|d| d.format.as_deref()) {
            Some(format) => template::render(format, value),
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::param::ParamDecl;

    fn make_schema() -> ParamSchema {
        ParamSchema::new()
            .field(
                "Music",
                ParamDecl::new()
                    .format("play music {value}")
                    .stop_format("stop music"),
            )
            .field("With", ParamDecl::new().format(" with {value}").default_value("dissolve"))
            .field("Bgm", ParamDecl::new().output_key("Arg1"))
            .field("Broken", ParamDecl::new().format("{oops}"))
    }

    #[test]
    fn sentence_renders_format() {
        let schema = make_schema();
        let row = Row::new().with("Music", "bgm_main");
        let fields = Fields::new(&schema, &row);
        assert_eq!(fields.sentence("Music").unwrap(), "play music bgm_main");
        assert_eq!(fields.sentence("With").unwrap(), "");
        assert_eq!(fields.sentence_or_default("With").unwrap(), " with dissolve");
    }

    #[test]
    fn stop_detection() {
        let schema = make_schema();
        let row = Row::new().with("Music", "stop");
        let fields = Fields::new(&schema, &row);
        assert!(fields.is_stop("Music"));
        assert_eq!(fields.stop_format("Music"), Some("stop music"));
        assert!(!fields.is_stop("With"));
    }

    #[test]
    fn output_key_falls_back_to_name() {
        let schema = make_schema();
        let row = Row::new();
        let fields = Fields::new(&schema, &row);
        assert_eq!(fields.output_key("Bgm"), "Arg1");
        assert_eq!(fields.output_key("Volume"), "Volume");
    }

    #[test]
    fn numeric_values_render_as_text() {
        let schema = make_schema();
        let row = Row::new().with("With", 2.0);
        let fields = Fields::new(&schema, &row);
        assert_eq!(fields.text("With"), "2");
        assert_eq!(fields.sentence("With").unwrap(), " with 2");
    }

    #[test]
    fn bad_format_is_error() {
        let schema = make_schema();
        let row = Row::new().with("Broken", "x");
        let fields = Fields::new(&schema, &row);
        assert!(fields.sentence("Broken").is_err());
    }
}
