/// Ren'Py script generators. Every stage emits line commands.
use std::sync::Arc;

use crate::core::config::EngineConfig;
use crate::core::engine::{standard_factory, EngineDescriptor};
use crate::core::generator::{Fields, Generator, GeneratorContext, GeneratorError};
use crate::core::registry::GeneratorEntry;
use crate::core::resolve::resolve_row;
use crate::core::translate::Translator;
use crate::engines::{lines, WindowMode};
use crate::schema::command::Command;
use crate::schema::param::{ParamDecl, ParamSchema};
use crate::schema::row::Row;

pub const ENGINE: &str = "renpy";

/// Speaker whose text is copied into the script verbatim.
pub const RAW_SPEAKER: &str = "renpy";
/// Speaker whose text names a label.
pub const LABEL_SPEAKER: &str = "label";

/// Transition values that switch the transition off.
const NO_TRANSITION: [&str; 2] = ["none", "empty"];

pub fn entries() -> Vec<GeneratorEntry> {
    vec![
        GeneratorEntry::new(ENGINE, NoteGenerator::NAME, NoteGenerator::create),
        GeneratorEntry::new(ENGINE, SceneClearGenerator::NAME, SceneClearGenerator::create),
        GeneratorEntry::new(ENGINE, AudioGenerator::NAME, AudioGenerator::create),
        GeneratorEntry::new(ENGINE, ClearLayerGenerator::NAME, ClearLayerGenerator::create),
        GeneratorEntry::new(ENGINE, BackgroundGenerator::NAME, BackgroundGenerator::create),
        GeneratorEntry::new(ENGINE, AtlGenerator::NAME, AtlGenerator::create),
        GeneratorEntry::new(ENGINE, CharacterGenerator::NAME, CharacterGenerator::create),
        GeneratorEntry::new(ENGINE, AtlGenerator::SPRITE_NAME, AtlGenerator::create_sprite),
        GeneratorEntry::new(ENGINE, HideGenerator::NAME, HideGenerator::create),
        GeneratorEntry::new(ENGINE, PauseGenerator::NAME, PauseGenerator::create),
        GeneratorEntry::new(ENGINE, TransitionGenerator::NAME, TransitionGenerator::create),
        GeneratorEntry::new(ENGINE, VoiceGenerator::NAME, VoiceGenerator::create),
        GeneratorEntry::new(ENGINE, TextGenerator::NAME, TextGenerator::create),
    ]
}

pub fn descriptor() -> EngineDescriptor {
    let config = EngineConfig::renpy();
    EngineDescriptor {
        name: ENGINE.to_string(),
        display_name: "Ren'Py".to_string(),
        file_extension: config.file_extension.clone(),
        description: "Ren'Py visual novel script".to_string(),
        default_config: config,
        factory: standard_factory,
    }
}

/// Ren'Py only takes arguments on transition classes, not on the
/// lower-case transition instances.
fn is_transition_class(transition: &str) -> bool {
    transition.chars().next().is_some_and(char::is_uppercase)
}

fn transition_expr(transition: &str, args: Option<String>) -> String {
    match args {
        Some(args) if is_transition_class(transition) => format!("{transition}({args})"),
        _ => transition.to_string(),
    }
}

/// ` with <transition>` built from a transition field and its argument
/// field, falling back to the field's default.
fn with_clause(fields: &Fields<'_>, with: &str, args: &str) -> String {
    match fields.value_or_default(with) {
        Some(transition) if !NO_TRANSITION.contains(&transition.as_str()) => {
            format!(" with {}", transition_expr(&transition, fields.value(args)))
        }
        _ => String::new(),
    }
}

fn escape_dialogue(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Writer notes, kept as script comments.
pub struct NoteGenerator {
    params: ParamSchema,
}

impl NoteGenerator {
    pub const NAME: &'static str = "NoteGenerator";

    pub fn create(_ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            params: ParamSchema::new().field("Note", ParamDecl::new().category("Note")),
        }))
    }
}

impl Generator for NoteGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Note"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let fields = Fields::new(&self.params, data);
        let note = fields.text("Note");
        Ok(lines(note.lines().map(|line| format!("# {}", line.trim_end()))))
    }
}

/// Clears the master layer with a bare `scene`.
pub struct SceneClearGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl SceneClearGenerator {
    pub const NAME: &'static str = "SceneClearGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field("SceneClear", ParamDecl::new().category("Scene"))
                .field(
                    "SceneClearWith",
                    ParamDecl::new().translate("Transition").format(" with {value}"),
                ),
        }))
    }
}

impl Generator for SceneClearGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Scene"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        if !fields.has("SceneClear") {
            return Ok(Vec::new());
        }
        Ok(vec![Command::line(format!(
            "scene{}",
            fields.sentence("SceneClearWith")?
        ))])
    }
}

/// Clears a named layer.
pub struct ClearLayerGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl ClearLayerGenerator {
    pub const NAME: &'static str = "ClearLayerGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new().field(
                "ClearLayer",
                ParamDecl::new()
                    .category("Scene")
                    .translate("Layer")
                    .format("scene onlayer {value}"),
            ),
        }))
    }
}

impl Generator for ClearLayerGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Scene"
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
        Ok(lines([fields.sentence("ClearLayer")?]))
    }
}

/// Music, sound effects and ambience. `AudioFade` fades in on play and out
/// on stop.
pub struct AudioGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl AudioGenerator {
    pub const NAME: &'static str = "AudioGenerator";
    const CHANNELS: [&'static str; 3] = ["Music", "Sound", "Ambience"];

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field(
                    "Music",
                    ParamDecl::new()
                        .category("Audio")
                        .translate("Music")
                        .format("play music {value}")
                        .stop_format("stop music"),
                )
                .field(
                    "Sound",
                    ParamDecl::new()
                        .category("Audio")
                        .translate("Sound")
                        .format("play sound {value}")
                        .stop_format("stop sound"),
                )
                .field(
                    "Ambience",
                    ParamDecl::new()
                        .category("Audio")
                        .translate("Ambience")
                        .format("play ambience {value} loop")
                        .stop_format("stop ambience"),
                )
                .field("Volume", ParamDecl::new().format(" volume {value}"))
                .field("AudioFade", ParamDecl::new()),
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
        let fade = fields.value("AudioFade");

        let mut out = Vec::new();
        for channel in Self::CHANNELS {
            if !fields.has(channel) {
                continue;
            }
            let line = if fields.is_stop(channel) {
                let stop = fields.stop_format(channel).unwrap_or_default();
                match &fade {
                    Some(fade) => format!("{stop} fadeout {fade}"),
                    None => stop.to_string(),
                }
            } else {
                let fade_in = fade.as_ref().map(|f| format!(" fadein {f}")).unwrap_or_default();
                format!(
                    "{}{fade_in}{}",
                    fields.sentence(channel)?,
                    fields.sentence("Volume")?
                )
            };
            out.push(line);
        }
        Ok(lines(out))
    }
}

pub struct BackgroundGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl BackgroundGenerator {
    pub const NAME: &'static str = "BackgroundGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        let default_transition = ctx.config.default_transition().unwrap_or("dissolve");
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field(
                    "Background",
                    ParamDecl::new().category("Background").translate("Background"),
                )
                .field("Event", ParamDecl::new().category("Background").translate("Event"))
                .field("EventVariant", ParamDecl::new())
                .field("At", ParamDecl::new().format(" at {value}"))
                .field("Onlayer", ParamDecl::new().format(" onlayer {value}"))
                .field(
                    "With",
                    ParamDecl::new()
                        .translate("Transition")
                        .default_value(default_transition),
                )
                .field("WithAtr", ParamDecl::new()),
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
        let placement = format!("{}{}", fields.sentence("At")?, fields.sentence("Onlayer")?);
        let transition = with_clause(&fields, "With", "WithAtr");

        let mut out = Vec::new();
        if let Some(background) = fields.value("Background") {
            out.push(format!("scene {background}{placement}{transition}"));
        }
        if let Some(event) = fields.value("Event") {
            let variant = fields
                .value("EventVariant")
                .map(|v| format!(" {v}"))
                .unwrap_or_default();
            out.push(format!("scene {event}{variant}{placement}{transition}"));
        }
        Ok(lines(out))
    }
}

pub struct CharacterGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl CharacterGenerator {
    pub const NAME: &'static str = "CharacterGenerator";
    const ATTRIBUTES: [&'static str; 3] = ["Atr1", "Atr2", "Atr3"];

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        let default_transition = ctx.config.default_transition().unwrap_or("dissolve");
        let mut params = ParamSchema::new()
            .field(
                "Character",
                ParamDecl::new().category("Character").translate("Character"),
            )
            .field("Variant", ParamDecl::new().category("Character"));
        for attribute in Self::ATTRIBUTES {
            params.insert(attribute, ParamDecl::new().format(" {value}"));
        }
        let params = params
            .field("SpriteAt", ParamDecl::new().format(" at {value}"))
            .field("SpriteOnlayer", ParamDecl::new().format(" onlayer {value}"))
            .field(
                "SpriteWith",
                ParamDecl::new()
                    .translate("Transition")
                    .default_value(default_transition),
            )
            .field("SpriteWithAtr", ParamDecl::new());

        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params,
        }))
    }
}

impl Generator for CharacterGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Character"
    }

    fn priority(&self) -> i32 {
        250
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        let Some(character) = fields.value("Character") else {
            tracing::debug!(generator = Self::NAME, "sprite fields without a character");
            return Ok(Vec::new());
        };

        let mut line = format!("show {character}");
        if let Some(variant) = fields.value("Variant") {
            line.push(' ');
            line.push_str(&self.translator.translate_variant(&variant, Some(&character)));
        }
        for attribute in Self::ATTRIBUTES {
            line.push_str(&fields.sentence(attribute)?);
        }
        line.push_str(&fields.sentence("SpriteAt")?);
        line.push_str(&fields.sentence("SpriteOnlayer")?);
        line.push_str(&with_clause(&fields, "SpriteWith", "SpriteWithAtr"));
        Ok(vec![Command::Line(line)])
    }
}

/// One step of an ATL block. Sheets name steps in Chinese; the English
/// names are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtlStep {
    Transform,
    Animation,
    Wait,
    Raw,
    CustomAnimation,
    Animate,
}

impl AtlStep {
    pub fn parse(value: &str) -> Option<AtlStep> {
        match value {
            "变换" | "transform" => Some(AtlStep::Transform),
            "动画" | "animation" => Some(AtlStep::Animation),
            "等待" | "wait" => Some(AtlStep::Wait),
            "直接输入" | "raw" => Some(AtlStep::Raw),
            "自定义动画" | "custom" => Some(AtlStep::CustomAnimation),
            "动画开始" | "animate" => Some(AtlStep::Animate),
            _ => None,
        }
    }
}

/// Indented ATL lines for the statement emitted just before: the scene
/// block (`ATL*` fields, after the background) or the sprite block
/// (`SpriteATL*` fields, after the character).
pub struct AtlGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
    name: &'static str,
    priority: i32,
    step: String,
    warp: String,
    time: String,
    transform: String,
    value: String,
    indent: String,
}

impl AtlGenerator {
    pub const NAME: &'static str = "ATLGenerator";
    pub const SPRITE_NAME: &'static str = "SpriteATLGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self::with_prefix(ctx, "ATL", Self::NAME, 201)))
    }

    pub fn create_sprite(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self::with_prefix(ctx, "SpriteATL", Self::SPRITE_NAME, 251)))
    }

    fn with_prefix(ctx: &GeneratorContext, prefix: &str, name: &'static str, priority: i32) -> Self {
        let step = format!("{prefix}Type");
        let warp = format!("{prefix}Warp");
        let time = format!("{prefix}Time");
        let transform = format!("{prefix}Transform");
        let value = format!("{prefix}Value");
        let params = ParamSchema::new()
            .field(&step, ParamDecl::new().category("ATL").translate("ATLType"))
            .field(&warp, ParamDecl::new().translate("Warp").default_value("linear"))
            .field(&time, ParamDecl::new().default_value("1.0"))
            .field(&transform, ParamDecl::new().translate("Transform"))
            .field(&value, ParamDecl::new());

        Self {
            translator: Arc::clone(&ctx.translator),
            params,
            name,
            priority,
            step,
            warp,
            time,
            transform,
            value,
            indent: " ".repeat(ctx.config.indent_size),
        }
    }

    fn required(&self, fields: &Fields<'_>, field: &str) -> Result<String, GeneratorError> {
        fields.value(field).ok_or_else(|| {
            GeneratorError::execution(self.name, format!("ATL step needs '{field}'"))
        })
    }
}

impl Generator for AtlGenerator {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> &str {
        "ATL"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        let Some(raw) = fields.value(&self.step) else {
            return Ok(Vec::new());
        };
        let Some(step) = AtlStep::parse(&raw) else {
            tracing::warn!(generator = self.name, step = raw.as_str(), "unknown ATL step");
            return Ok(Vec::new());
        };

        let warp = || fields.value_or_default(&self.warp).unwrap_or_default();
        let time = || fields.value_or_default(&self.time).unwrap_or_default();
        let body = match step {
            AtlStep::Transform => self.required(&fields, &self.transform)?,
            AtlStep::Animation => {
                let transform = self.required(&fields, &self.transform)?;
                format!("{} {} {transform}", warp(), time())
            }
            AtlStep::Wait => format!("pause {}", time()),
            AtlStep::Raw => self.required(&fields, &self.value)?,
            AtlStep::CustomAnimation => {
                let value = self.required(&fields, &self.value)?;
                format!("{} {} {value}", warp(), time())
            }
            AtlStep::Animate => "animate".to_string(),
        };
        Ok(vec![Command::Line(format!("{}{body}", self.indent))])
    }
}

/// Hides a sprite, background or event. The target may belong to any of
/// those vocabularies; the first one that knows it wins.
pub struct HideGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl HideGenerator {
    pub const NAME: &'static str = "HideGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field(
                    "Hide",
                    ParamDecl::new()
                        .category("Character")
                        .candidates(&["Character", "Background", "Event"])
                        .format("hide {value}"),
                )
                .field(
                    "HideWith",
                    ParamDecl::new().translate("Transition").format(" with {value}"),
                ),
        }))
    }
}

impl Generator for HideGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Character"
    }

    fn priority(&self) -> i32 {
        300
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        if !fields.has("Hide") {
            return Ok(Vec::new());
        }
        Ok(vec![Command::Line(format!(
            "{}{}",
            fields.sentence("Hide")?,
            fields.sentence("HideWith")?
        ))])
    }
}

/// A number pauses for that many seconds, negative ones included; any
/// other value waits for a click.
pub struct PauseGenerator {
    params: ParamSchema,
}

impl PauseGenerator {
    pub const NAME: &'static str = "PauseGenerator";

    pub fn create(_ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            params: ParamSchema::new().field("Pause", ParamDecl::new().category("Flow")),
        }))
    }
}

impl Generator for PauseGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Flow"
    }

    fn priority(&self) -> i32 {
        500
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let fields = Fields::new(&self.params, data);
        let Some(value) = fields.value("Pause") else {
            return Ok(Vec::new());
        };
        match value.parse::<f64>() {
            Ok(seconds) if !seconds.is_finite() => Err(GeneratorError::execution(
                Self::NAME,
                format!("invalid pause duration '{value}'"),
            )),
            Ok(seconds) => Ok(vec![Command::Line(format!("pause {seconds:?}"))]),
            Err(_) => Ok(vec![Command::line("pause")]),
        }
    }
}

/// A standalone `with` statement.
pub struct TransitionGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl TransitionGenerator {
    pub const NAME: &'static str = "TransitionGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field(
                    "UseTrans",
                    ParamDecl::new().category("Transition").translate("Transition"),
                )
                .field("UseTransAtr", ParamDecl::new()),
        }))
    }
}

impl Generator for TransitionGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Transition"
    }

    fn priority(&self) -> i32 {
        800
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        let Some(transition) = fields.value("UseTrans") else {
            return Ok(Vec::new());
        };
        Ok(vec![Command::Line(format!(
            "with {}",
            transition_expr(&transition, fields.value("UseTransAtr"))
        ))])
    }
}

pub struct VoiceGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl VoiceGenerator {
    pub const NAME: &'static str = "VoiceGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new().field(
                "Voice",
                ParamDecl::new()
                    .category("Voice")
                    .translate("Voice")
                    .format("voice \"{value}\"")
                    .stop_format("voice sustain"),
            ),
        }))
    }
}

impl Generator for VoiceGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Voice"
    }

    fn priority(&self) -> i32 {
        890
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        if fields.is_stop("Voice") {
            return Ok(lines(fields.stop_format("Voice").map(str::to_string)));
        }
        Ok(lines([fields.sentence("Voice")?]))
    }
}

/// Dialogue, narration, raw script lines and labels, wrapped in the
/// requested window statements.
pub struct TextGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl TextGenerator {
    pub const NAME: &'static str = "TextGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field("Window", ParamDecl::new().category("Text").translate("Window"))
                .field("Name", ParamDecl::new().category("Text"))
                .field("Text", ParamDecl::new().category("Text")),
        }))
    }

    fn body(&self, name: Option<&str>, text: &str) -> Result<Vec<String>, GeneratorError> {
        match name {
            Some(RAW_SPEAKER) => Ok(text.lines().map(str::to_string).collect()),
            Some(LABEL_SPEAKER) => {
                let label = text.trim();
                if label.is_empty() || label.contains(char::is_whitespace) {
                    return Err(GeneratorError::execution(
                        Self::NAME,
                        format!("'{text}' is not a valid label name"),
                    ));
                }
                Ok(vec![format!("label {label}:")])
            }
            Some(name) => Ok(vec![format!(
                "{} \"{}\"",
                self.translator.translate("Name", name),
                escape_dialogue(text)
            )]),
            None => Ok(vec![format!("\"{}\"", escape_dialogue(text))]),
        }
    }
}

impl Generator for TextGenerator {
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

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        let window = fields.value("Window").and_then(|raw| {
            let mode = WindowMode::parse(&raw);
            if mode.is_none() {
                tracing::warn!(generator = Self::NAME, window = raw.as_str(), "unknown window mode");
            }
            mode
        });
        let name = fields.value("Name");

        let mut out = Vec::new();
        if window.is_some_and(WindowMode::shows) {
            out.push("window show".to_string());
        }
        match fields.value("Text") {
            Some(text) => out.extend(self.body(name.as_deref(), &text)?),
            None if name.as_deref() == Some(LABEL_SPEAKER) => {
                return Err(GeneratorError::execution(
                    Self::NAME,
                    "label speaker without a label name",
                ));
            }
            None => {}
        }
        if window.is_some_and(WindowMode::hides) {
            out.push("window hide".to_string());
        }
        Ok(lines(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_translator() -> Translator {
        let types = r#"{
            "Music": {"主题曲": "bgm_main"},
            "Character": {"爱丽丝": "alice"},
            "Background": {"教室": "bg classroom"},
            "Event": {"爱丽丝": "cg alice"},
            "Transition": {"淡入": "dissolve", "渐变": "Fade"},
            "Name": {"爱丽丝": "a"},
            "Layer": {"前景": "front"},
            "Window": {"开窗": "show", "关窗": "hide"},
            "Warp": {"缓出": "easeout"},
            "Transform": {"左移": "xalign 0.0"},
        }"#;
        let variants = r#"{
            "alice": {"微笑": "smile_02"},
        }"#;
        Translator::parse_ron(Some(types), Some(variants)).unwrap()
    }

    fn make_ctx() -> GeneratorContext {
        GeneratorContext::new(Arc::new(make_translator()), EngineConfig::renpy())
    }

    fn run(create: fn(&GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError>, row: Row) -> Vec<String> {
        let generator = create(&make_ctx()).unwrap();
        generator
            .process(&row)
            .unwrap()
            .into_iter()
            .filter_map(|c| c.as_line().map(str::to_string))
            .collect()
    }

    #[test]
    fn priorities_follow_stage_order() {
        let ctx = make_ctx();
        let priorities: Vec<i32> = entries()
            .iter()
            .map(|e| (e.factory)(&ctx).unwrap().priority())
            .collect();
        assert_eq!(
            priorities,
            vec![0, 50, 100, 150, 200, 201, 250, 251, 300, 500, 800, 890, 900]
        );
    }

    #[test]
    fn note_becomes_comments() {
        let row = Row::new().with("Note", "first\nsecond");
        assert_eq!(run(NoteGenerator::create, row), vec!["# first", "# second"]);
    }

    #[test]
    fn scene_clear_and_layer() {
        let row = Row::new().with("SceneClear", "x").with("SceneClearWith", "淡入");
        assert_eq!(run(SceneClearGenerator::create, row), vec!["scene with dissolve"]);
        let row = Row::new().with("ClearLayer", "前景");
        assert_eq!(run(ClearLayerGenerator::create, row), vec!["scene onlayer front"]);
    }

    #[test]
    fn audio_play_translates_and_appends_options() {
        let row = Row::new()
            .with("Music", "主题曲")
            .with("Volume", 0.5)
            .with("AudioFade", 2.0);
        assert_eq!(
            run(AudioGenerator::create, row),
            vec!["play music bgm_main fadein 2 volume 0.5"]
        );
    }

    #[test]
    fn audio_stop_uses_stop_format() {
        let row = Row::new().with("Music", "stop").with("Sound", "click").with("AudioFade", 1.0);
        assert_eq!(
            run(AudioGenerator::create, row),
            vec!["stop music fadeout 1", "play sound click fadein 1"]
        );
    }

    #[test]
    fn background_uses_config_transition() {
        let row = Row::new().with("Background", "教室");
        assert_eq!(
            run(BackgroundGenerator::create, row),
            vec!["scene bg classroom with dissolve"]
        );

        let row = Row::new().with("Background", "教室").with("With", "none");
        assert_eq!(run(BackgroundGenerator::create, row), vec!["scene bg classroom"]);
    }

    #[test]
    fn background_event_with_transition_class() {
        let row = Row::new()
            .with("Event", "爱丽丝")
            .with("EventVariant", "night")
            .with("At", "center")
            .with("With", "渐变")
            .with("WithAtr", 0.5);
        assert_eq!(
            run(BackgroundGenerator::create, row),
            vec!["scene cg alice night at center with Fade(0.5)"]
        );
    }

    #[test]
    fn character_resolves_variant_against_character() {
        let row = Row::new()
            .with("Character", "爱丽丝")
            .with("Variant", "微笑")
            .with("SpriteAt", "left");
        assert_eq!(
            run(CharacterGenerator::create, row),
            vec!["show alice smile_02 at left with dissolve"]
        );
    }

    #[test]
    fn character_without_name_emits_nothing() {
        let row = Row::new().with("Variant", "微笑");
        assert!(run(CharacterGenerator::create, row).is_empty());
    }

    #[test]
    fn hide_tries_candidates_in_order() {
        let row = Row::new().with("Hide", "爱丽丝");
        assert_eq!(run(HideGenerator::create, row), vec!["hide alice"]);
        let row = Row::new().with("Hide", "教室").with("HideWith", "淡入");
        assert_eq!(
            run(HideGenerator::create, row),
            vec!["hide bg classroom with dissolve"]
        );
    }

    #[test]
    fn pause_variants() {
        assert_eq!(run(PauseGenerator::create, Row::new().with("Pause", 1.5)), vec!["pause 1.5"]);
        assert_eq!(run(PauseGenerator::create, Row::new().with("Pause", 2.0)), vec!["pause 2.0"]);
        assert_eq!(run(PauseGenerator::create, Row::new().with("Pause", "click")), vec!["pause"]);

        let generator = PauseGenerator::create(&make_ctx()).unwrap();
        assert!(generator.process(&Row::new().with("Pause", "inf")).is_err());
    }

    #[test]
    fn atl_steps() {
        let row = Row::new().with("ATLType", "变换").with("ATLTransform", "左移");
        assert_eq!(run(AtlGenerator::create, row), vec!["    xalign 0.0"]);

        let row = Row::new().with("ATLType", "动画").with("ATLTransform", "左移");
        assert_eq!(run(AtlGenerator::create, row), vec!["    linear 1.0 xalign 0.0"]);

        let row = Row::new()
            .with("ATLType", "动画")
            .with("ATLWarp", "缓出")
            .with("ATLTime", 0.5)
            .with("ATLTransform", "zoom 1.2");
        assert_eq!(run(AtlGenerator::create, row), vec!["    easeout 0.5 zoom 1.2"]);

        let row = Row::new().with("ATLType", "等待");
        assert_eq!(run(AtlGenerator::create, row), vec!["    pause 1.0"]);

        let row = Row::new().with("ATLType", "直接输入").with("ATLValue", "repeat");
        assert_eq!(run(AtlGenerator::create, row), vec!["    repeat"]);

        let row = Row::new()
            .with("ATLType", "自定义动画")
            .with("ATLTime", 2.0)
            .with("ATLValue", "alpha 0.0");
        assert_eq!(run(AtlGenerator::create, row), vec!["    linear 2 alpha 0.0"]);

        let row = Row::new().with("ATLType", "动画开始");
        assert_eq!(run(AtlGenerator::create, row), vec!["    animate"]);
    }

    #[test]
    fn sprite_atl_reads_its_own_fields() {
        let row = Row::new()
            .with("ATLType", "等待")
            .with("SpriteATLType", "变换")
            .with("SpriteATLTransform", "左移");
        assert_eq!(run(AtlGenerator::create_sprite, row), vec!["    xalign 0.0"]);

        let generator = AtlGenerator::create_sprite(&make_ctx()).unwrap();
        assert_eq!(generator.name(), "SpriteATLGenerator");
        assert_eq!(generator.priority(), 251);
    }

    #[test]
    fn atl_step_missing_its_field_is_error() {
        let generator = AtlGenerator::create(&make_ctx()).unwrap();
        assert!(generator.process(&Row::new().with("ATLType", "变换")).is_err());
        assert_eq!(
            run(AtlGenerator::create, Row::new().with("ATLType", "spin")),
            Vec::<String>::new()
        );
    }

    #[test]
    fn negative_pause_passes_through() {
        assert_eq!(run(PauseGenerator::create, Row::new().with("Pause", -1.0)), vec!["pause -1.0"]);
        assert_eq!(run(PauseGenerator::create, Row::new().with("Pause", "-0.5")), vec!["pause -0.5"]);
    }

    #[test]
    fn standalone_transition() {
        let row = Row::new().with("UseTrans", "渐变").with("UseTransAtr", 1.0);
        assert_eq!(run(TransitionGenerator::create, row), vec!["with Fade(1)"]);
        let row = Row::new().with("UseTrans", "淡入").with("UseTransAtr", 1.0);
        assert_eq!(run(TransitionGenerator::create, row), vec!["with dissolve"]);
    }

    #[test]
    fn voice_play_and_stop() {
        assert_eq!(
            run(VoiceGenerator::create, Row::new().with("Voice", "a_001")),
            vec!["voice \"a_001\""]
        );
        assert_eq!(
            run(VoiceGenerator::create, Row::new().with("Voice", "stop")),
            vec!["voice sustain"]
        );
    }

    #[test]
    fn text_dialogue_and_narration() {
        let row = Row::new().with("Name", "爱丽丝").with("Text", "Say \"hi\"");
        assert_eq!(run(TextGenerator::create, row), vec!["a \"Say \\\"hi\\\"\""]);
        let row = Row::new().with("Text", "It was quiet.");
        assert_eq!(run(TextGenerator::create, row), vec!["\"It was quiet.\""]);
    }

    #[test]
    fn text_unknown_speaker_passes_through() {
        let row = Row::new().with("Name", "UnknownCharacter").with("Text", "Hi");
        assert_eq!(run(TextGenerator::create, row), vec!["UnknownCharacter \"Hi\""]);
    }

    #[test]
    fn text_special_speakers() {
        let row = Row::new().with("Name", "renpy").with("Text", "$ score += 1\njump end");
        assert_eq!(run(TextGenerator::create, row), vec!["$ score += 1", "jump end"]);
        let row = Row::new().with("Name", "label").with("Text", "chapter_1");
        assert_eq!(run(TextGenerator::create, row), vec!["label chapter_1:"]);

        let generator = TextGenerator::create(&make_ctx()).unwrap();
        assert!(generator
            .process(&Row::new().with("Name", "label").with("Text", "bad name"))
            .is_err());
        assert!(generator.process(&Row::new().with("Name", "label")).is_err());
    }

    #[test]
    fn text_window_wraps_dialogue() {
        let row = Row::new().with("Window", "显示和隐藏").with("Text", "...");
        assert_eq!(
            run(TextGenerator::create, row),
            vec!["window show", "\"...\"", "window hide"]
        );
        let row = Row::new().with("Window", "hide");
        assert_eq!(run(TextGenerator::create, row), vec!["window hide"]);
    }

    #[test]
    fn text_window_value_is_translated() {
        let row = Row::new().with("Window", "开窗").with("Text", "Morning.");
        assert_eq!(
            run(TextGenerator::create, row),
            vec!["window show", "\"Morning.\""]
        );
        let row = Row::new().with("Window", "关窗");
        assert_eq!(run(TextGenerator::create, row), vec!["window hide"]);
    }
}
