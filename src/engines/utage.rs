/// Utage sheet generators. Every stage emits records keyed by the sheet's
/// column names.
use std::sync::Arc;

use crate::core::config::{EngineConfig, MacroTable};
use crate::core::engine::{standard_factory, EngineDescriptor};
use crate::core::generator::{Fields, Generator, GeneratorContext, GeneratorError, InputScope};
use crate::core::registry::GeneratorEntry;
use crate::core::resolve::resolve_row;
use crate::core::translate::Translator;
use crate::engines::is_hide_keyword;
use crate::schema::command::{Command, Record};
use crate::schema::param::{ParamDecl, ParamSchema};
use crate::schema::row::Row;

pub const ENGINE: &str = "utage";

/// Field that switches a row into macro mode.
pub const MACRO_FIELD: &str = "Macro";
const COMMAND_COLUMN: &str = "Command";

pub fn entries() -> Vec<GeneratorEntry> {
    vec![
        GeneratorEntry::new(ENGINE, MacroGenerator::NAME, MacroGenerator::create),
        GeneratorEntry::new(ENGINE, AudioGenerator::NAME, AudioGenerator::create),
        GeneratorEntry::new(ENGINE, FadeGenerator::NAME, FadeGenerator::create),
        GeneratorEntry::new(ENGINE, BackgroundGenerator::NAME, BackgroundGenerator::create),
        GeneratorEntry::new(
            ENGINE,
            CharacterTextGenerator::NAME,
            CharacterTextGenerator::create,
        ),
    ]
}

pub fn descriptor() -> EngineDescriptor {
    let config = EngineConfig::utage();
    EngineDescriptor {
        name: ENGINE.to_string(),
        display_name: "Utage".to_string(),
        file_extension: config.file_extension.clone(),
        description: "Utage scenario sheet for Unity".to_string(),
        default_config: config,
        factory: standard_factory,
    }
}

fn record<'a, I>(cells: I) -> Record
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    cells
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(column, value)| (column.to_string(), value))
        .collect()
}

/// Expands a configured macro into one record.
///
/// Each mapping entry names an output column and either a row field to copy
/// from or, when the row has no such field, literal text. A row naming a
/// macro belongs to this stage alone, apart from dialogue.
pub struct MacroGenerator {
    params: ParamSchema,
    macros: MacroTable,
}

impl MacroGenerator {
    pub const NAME: &'static str = "MacroGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        let macros = ctx.config.macros().cloned().unwrap_or_default();
        if let Some(columns) = ctx.config.columns() {
            for (name, mapping) in &macros {
                for column in mapping.keys() {
                    if !columns.iter().any(|c| c == column) {
                        tracing::warn!(
                            macro_name = name.as_str(),
                            column = column.as_str(),
                            "macro writes a column the sheet does not have"
                        );
                    }
                }
            }
        }
        tracing::debug!(macros = macros.len(), "macro table loaded");

        Ok(Box::new(Self {
            params: ParamSchema::new().field(MACRO_FIELD, ParamDecl::new().category("Macro")),
            macros,
        }))
    }
}

impl Generator for MacroGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Macro"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn input_scope(&self) -> InputScope {
        InputScope::AllFields
    }

    fn exclusive_trigger(&self) -> Option<&str> {
        Some(MACRO_FIELD)
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let Some(name) = data.present(MACRO_FIELD).map(|v| v.to_string()) else {
            return Ok(Vec::new());
        };
        let Some(mapping) = self.macros.get(&name) else {
            return Err(GeneratorError::execution(
                Self::NAME,
                format!("macro '{name}' is not defined"),
            ));
        };

        let mut cells = vec![(COMMAND_COLUMN, name.clone())];
        for (column, source) in mapping {
            let value = match data.present(source) {
                Some(value) => value.to_string(),
                None => source.clone(),
            };
            cells.push((column.as_str(), value));
        }
        Ok(vec![Command::Record(record(cells))])
    }
}

pub struct AudioGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl AudioGenerator {
    pub const NAME: &'static str = "AudioGenerator";
    /// Row field → (play command, stop command).
    const CHANNELS: [(&'static str, &'static str, &'static str); 3] = [
        ("Music", "Bgm", "StopBgm"),
        ("Sound", "Se", "StopSe"),
        ("Ambience", "Ambience", "StopAmbience"),
    ];

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        let mut params = ParamSchema::new();
        for (field, _, _) in Self::CHANNELS {
            params.insert(
                field,
                ParamDecl::new()
                    .category("Audio")
                    .translate(field)
                    .output_key("Arg1"),
            );
        }
        let params = params
            .field("Volume", ParamDecl::new().output_key("Arg3"))
            .field("AudioFade", ParamDecl::new().output_key("Arg6"));

        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params,
        }))
    }
}

impl Generator for AudioGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Audio"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        let fade = (fields.output_key("AudioFade"), fields.text("AudioFade"));

        let mut out = Vec::new();
        for (field, play, stop) in Self::CHANNELS {
            if !fields.has(field) {
                continue;
            }
            let cells = if fields.is_stop(field) {
                vec![(COMMAND_COLUMN, stop.to_string()), fade.clone()]
            } else {
                vec![
                    (COMMAND_COLUMN, play.to_string()),
                    (fields.output_key(field), fields.text(field)),
                    (fields.output_key("Volume"), fields.text("Volume")),
                    fade.clone(),
                ]
            };
            out.push(Command::Record(record(cells)));
        }
        Ok(out)
    }
}

/// Screen fades. `FadeType` names the sheet command; the colour, camera,
/// rule image and duration fill its arguments.
pub struct FadeGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl FadeGenerator {
    pub const NAME: &'static str = "FadeGenerator";
    const ARGUMENTS: [&'static str; 4] = ["FadeColor", "FadeCamera", "FadeRule", "FadeTime"];

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field(
                    "FadeType",
                    ParamDecl::new()
                        .category("Fade")
                        .translate("FadeType")
                        .output_key(COMMAND_COLUMN),
                )
                .field(
                    "FadeColor",
                    ParamDecl::new().translate("FadeColor").output_key("Arg1"),
                )
                .field("FadeCamera", ParamDecl::new().output_key("Arg2"))
                .field("FadeRule", ParamDecl::new().translate("Rule").output_key("Arg3"))
                .field(
                    "FadeTime",
                    ParamDecl::new().output_key("Arg6").default_value("1.0"),
                ),
        }))
    }
}

impl Generator for FadeGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Fade"
    }

    fn priority(&self) -> i32 {
        150
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        let Some(command) = fields.value("FadeType") else {
            if Self::ARGUMENTS.iter().any(|f| fields.has(f)) {
                tracing::debug!(generator = Self::NAME, "fade arguments without a fade type");
            }
            return Ok(Vec::new());
        };

        let mut cells = vec![(fields.output_key("FadeType"), command)];
        for field in Self::ARGUMENTS {
            cells.push((
                fields.output_key(field),
                fields.value_or_default(field).unwrap_or_default(),
            ));
        }
        Ok(vec![Command::Record(record(cells))])
    }
}

pub struct BackgroundGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl BackgroundGenerator {
    pub const NAME: &'static str = "BackgroundGenerator";
    /// Row field → (show command, hide command).
    const LAYERS: [(&'static str, &'static str, &'static str); 2] = [
        ("Background", "Bg", "BgOff"),
        ("Event", "BgEvent", "BgEventOff"),
    ];

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field(
                    "Background",
                    ParamDecl::new()
                        .category("Background")
                        .translate("Background")
                        .output_key("Arg1"),
                )
                .field(
                    "Event",
                    ParamDecl::new()
                        .category("Background")
                        .translate("Event")
                        .output_key("Arg1"),
                )
                .field("BgFade", ParamDecl::new().output_key("Arg6")),
        }))
    }
}

impl Generator for BackgroundGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Background"
    }

    fn priority(&self) -> i32 {
        200
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        let fade = (fields.output_key("BgFade"), fields.text("BgFade"));

        let mut out = Vec::new();
        for (field, show, hide) in Self::LAYERS {
            let Some(image) = fields.value(field) else {
                continue;
            };
            let cells = if is_hide_keyword(&image) {
                vec![(COMMAND_COLUMN, hide.to_string()), fade.clone()]
            } else {
                vec![
                    (COMMAND_COLUMN, show.to_string()),
                    (fields.output_key(field), image),
                    fade.clone(),
                ]
            };
            out.push(Command::Record(record(cells)));
        }
        Ok(out)
    }
}

/// Shows the speaking character (`Arg1` id, `Arg2` pattern, `Arg3` layer)
/// in one record, then the dialogue (`Arg2` display name, text, voice) in
/// another. Runs on macro rows too.
pub struct CharacterTextGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl CharacterTextGenerator {
    pub const NAME: &'static str = "CharacterTextGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field(
                    "Character",
                    ParamDecl::new()
                        .category("Character")
                        .translate("Character")
                        .output_key("Arg1"),
                )
                .field("Variant", ParamDecl::new().output_key("Arg2"))
                .field("CharacterLayer", ParamDecl::new().output_key("Arg3"))
                .field(
                    "Name",
                    ParamDecl::new()
                        .category("Text")
                        .translate("Name")
                        .output_key("Arg2"),
                )
                .field("Text", ParamDecl::new().category("Text").output_key("Text"))
                .field("Voice", ParamDecl::new().translate("Voice").output_key("Voice")),
        }))
    }
}

impl Generator for CharacterTextGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Text"
    }

    fn priority(&self) -> i32 {
        900
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn runs_alongside_exclusive(&self) -> bool {
        true
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);

        let mut out = Vec::new();
        if let Some(character) = fields.value("Character") {
            let pattern = fields
                .value("Variant")
                .map(|v| self.translator.translate_variant(&v, Some(&character)))
                .unwrap_or_default();
            out.push(record([
                (fields.output_key("Character"), character),
                (fields.output_key("Variant"), pattern),
                (fields.output_key("CharacterLayer"), fields.text("CharacterLayer")),
            ]));
        }

        if fields.has("Name") || fields.has("Text") {
            out.push(record([
                (fields.output_key("Voice"), fields.text("Voice")),
                (fields.output_key("Name"), fields.text("Name")),
                (fields.output_key("Text"), fields.text("Text")),
            ]));
        }
        Ok(out.into_iter().map(Command::Record).collect())
    }
}
