/// Naninovel script generators. Commands take the configured prefix
/// (`@` unless overridden); generic text lines carry dialogue.
use std::sync::Arc;

use crate::core::config::EngineConfig;
use crate::core::engine::{standard_factory, EngineDescriptor};
use crate::core::generator::{Fields, Generator, GeneratorContext, GeneratorError};
use crate::core::registry::GeneratorEntry;
use crate::core::resolve::resolve_row;
use crate::core::translate::Translator;
use crate::engines::{is_hide_keyword, lines, WindowMode};
use crate::schema::command::Command;
use crate::schema::param::{ParamDecl, ParamSchema};
use crate::schema::row::Row;

pub const ENGINE: &str = "naninovel";

/// Speaker whose text is copied into the script verbatim.
pub const RAW_SPEAKER: &str = "naninovel";

/// Background actor id used when a row does not name one.
const MAIN_BACKGROUND: &str = "MainBackground";
/// Background actor id for event CGs.
const EVENT_BACKGROUND: &str = "CG";
/// `Character` value that hides every character at once.
const HIDE_ALL_CHARACTERS: &str = "hideAll";
/// Image transition used when a dissolve mask is given.
const CUSTOM_TRANSITION: &str = "Custom";
/// Indentation of commands nested in an enclosing block.
const NESTED_INDENT: &str = "    ";

pub fn entries() -> Vec<GeneratorEntry> {
    vec![
        GeneratorEntry::new(ENGINE, NoteGenerator::NAME, NoteGenerator::create),
        GeneratorEntry::new(ENGINE, AudioGenerator::NAME, AudioGenerator::create),
        GeneratorEntry::new(ENGINE, EffectGenerator::NAME, EffectGenerator::create),
        GeneratorEntry::new(ENGINE, CameraGenerator::NAME, CameraGenerator::create),
        GeneratorEntry::new(ENGINE, BackgroundGenerator::NAME, BackgroundGenerator::create),
        GeneratorEntry::new(ENGINE, CharacterGenerator::NAME, CharacterGenerator::create),
        GeneratorEntry::new(ENGINE, HideGenerator::NAME, HideGenerator::create),
        GeneratorEntry::new(ENGINE, TransitionGenerator::NAME, TransitionGenerator::create),
        GeneratorEntry::new(ENGINE, MovieGenerator::NAME, MovieGenerator::create),
        GeneratorEntry::new(ENGINE, PauseWaitGenerator::NAME, PauseWaitGenerator::create),
        GeneratorEntry::new(ENGINE, VoiceGenerator::NAME, VoiceGenerator::create),
        GeneratorEntry::new(ENGINE, TextGenerator::NAME, TextGenerator::create),
    ]
}

pub fn descriptor() -> EngineDescriptor {
    let config = EngineConfig::naninovel();
    EngineDescriptor {
        name: ENGINE.to_string(),
        display_name: "Naninovel".to_string(),
        file_extension: config.file_extension.clone(),
        description: "Naninovel script for Unity".to_string(),
        default_config: config,
        factory: standard_factory,
    }
}

fn prefix(ctx: &GeneratorContext) -> String {
    ctx.config.command_prefix().unwrap_or("@").to_string()
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
        Ok(lines(note.lines().map(|line| format!("; {}", line.trim_end()))))
    }
}

/// Background music, sound effects and looping ambience.
pub struct AudioGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl AudioGenerator {
    pub const NAME: &'static str = "AudioGenerator";
    const CHANNELS: [&'static str; 3] = ["Music", "Sound", "Ambience"];

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        let p = prefix(ctx);
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field(
                    "Music",
                    ParamDecl::new()
                        .category("Audio")
                        .translate("Music")
                        .format(&format!("{p}bgm {{value}}"))
                        .stop_format(&format!("{p}stopBgm")),
                )
                .field(
                    "Sound",
                    ParamDecl::new()
                        .category("Audio")
                        .translate("Sound")
                        .format(&format!("{p}sfx {{value}}"))
                        .stop_format(&format!("{p}stopSfx")),
                )
                .field(
                    "Ambience",
                    ParamDecl::new()
                        .category("Audio")
                        .translate("Ambience")
                        .format(&format!("{p}sfx {{value}} loop:true"))
                        .stop_format(&format!("{p}stopSfx")),
                )
                .field("Volume", ParamDecl::new().format(" volume:{value}"))
                .field("AudioFade", ParamDecl::new().format(" fade:{value}")),
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
        let fade = fields.sentence("AudioFade")?;

        let mut out = Vec::new();
        for channel in Self::CHANNELS {
            if !fields.has(channel) {
                continue;
            }
            if fields.is_stop(channel) {
                let stop = fields.stop_format(channel).unwrap_or_default();
                out.push(format!("{stop}{fade}"));
            } else {
                out.push(format!(
                    "{}{}{fade}",
                    fields.sentence(channel)?,
                    fields.sentence("Volume")?
                ));
            }
        }
        Ok(lines(out))
    }
}

/// A packed effect line copied as is, or a `blur`/`shake` effect built
/// from its parts.
pub struct EffectGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
    prefix: String,
}

impl EffectGenerator {
    pub const NAME: &'static str = "EffectGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field(
                    "PackedEffect",
                    ParamDecl::new().category("Effect").translate("PackedEffect"),
                )
                .field("Effect", ParamDecl::new().category("Effect").translate("Effect"))
                .field("EffectId", ParamDecl::new().translate("Id").format(" {value}"))
                .field("EffectAtr1", ParamDecl::new().format(" count:{value}"))
                .field("EffectPower", ParamDecl::new().format(" power:{value}"))
                .field(
                    "EffectTime",
                    ParamDecl::new().format(" time:{value}").default_value("1"),
                )
                .field("EffectWait", ParamDecl::new().format(" wait:{value}")),
            prefix: prefix(ctx),
        }))
    }
}

impl Generator for EffectGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Effect"
    }

    fn priority(&self) -> i32 {
        120
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        if let Some(packed) = fields.value("PackedEffect") {
            return Ok(vec![Command::Line(packed)]);
        }
        let Some(effect) = fields.value("Effect") else {
            return Ok(Vec::new());
        };

        let p = &self.prefix;
        let id = fields.sentence("EffectId")?;
        let power = fields.sentence("EffectPower")?;
        let tail = format!(
            "{}{}",
            fields.sentence("EffectWait")?,
            fields.sentence_or_default("EffectTime")?
        );
        let line = match effect.as_str() {
            "blur" => format!("{p}blur{id}{power}{tail}"),
            "shake" => format!("{p}shake{id}{power}{}{tail}", fields.sentence("EffectAtr1")?),
            _ => {
                tracing::warn!(generator = Self::NAME, effect = effect.as_str(), "unknown effect");
                return Ok(Vec::new());
            }
        };
        Ok(vec![Command::Line(line)])
    }
}

/// What a `Camera` cell asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    /// A plain `@camera` move.
    Move,
    /// `@trans` followed by the camera move inside it.
    Cut,
    /// `@trans` back to the neutral camera.
    Reset,
    /// A camera move nested in an enclosing block.
    Nested,
}

impl CameraMode {
    /// Anything that is not a move, cut or reset is nested.
    pub fn parse(value: &str) -> CameraMode {
        match value {
            "镜头" | "camera" => CameraMode::Move,
            "切镜头" | "cut" => CameraMode::Cut,
            "重置" | "reset" => CameraMode::Reset,
            _ => CameraMode::Nested,
        }
    }
}

pub struct CameraGenerator {
    params: ParamSchema,
    prefix: String,
}

impl CameraGenerator {
    pub const NAME: &'static str = "CameraGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            params: ParamSchema::new()
                .field("Camera", ParamDecl::new().category("Camera"))
                .field("Zoom", ParamDecl::new().format(" zoom:{value}"))
                .field(
                    "OffsetX",
                    ParamDecl::new().format(" offset:{value}").default_value("0"),
                )
                .field("OffsetY", ParamDecl::new().format(",{value}").default_value("0"))
                .field("CameraWait", ParamDecl::new().format(" wait:{value}"))
                .field(
                    "CameraTime",
                    ParamDecl::new().format(" time:{value}").default_value("0"),
                ),
            prefix: prefix(ctx),
        }))
    }
}

impl Generator for CameraGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Camera"
    }

    fn priority(&self) -> i32 {
        140
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let fields = Fields::new(&self.params, data);
        let Some(mode) = fields.value("Camera").map(|v| CameraMode::parse(&v)) else {
            return Ok(Vec::new());
        };
        let p = &self.prefix;
        let time = fields.sentence_or_default("CameraTime")?;

        if mode == CameraMode::Reset {
            return Ok(lines([
                format!("{p}trans"),
                format!("{NESTED_INDENT}{p}camera offset:0,0 zoom:0 rotation:0,0,0{time}"),
            ]));
        }

        let offset = if fields.has("OffsetX") || fields.has("OffsetY") {
            format!(
                "{}{}",
                fields.sentence_or_default("OffsetX")?,
                fields.sentence_or_default("OffsetY")?
            )
        } else {
            String::new()
        };
        let indent = if mode == CameraMode::Move { "" } else { NESTED_INDENT };
        let line = format!(
            "{indent}{p}camera{}{offset}{}{time}",
            fields.sentence("Zoom")?,
            fields.sentence("CameraWait")?
        );

        let mut out = Vec::new();
        if mode == CameraMode::Cut {
            out.push(format!("{p}trans"));
        }
        out.push(line);
        Ok(lines(out))
    }
}

/// How a `TransBack` cell stages a background change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackStaging {
    Inline,
    /// `@trans` with the timing, then the change without it.
    Trans,
    /// Indented into an enclosing block.
    Nested,
    Hide,
}

impl BackStaging {
    fn parse(value: Option<&str>) -> BackStaging {
        match value {
            Some("转场" | "trans") => BackStaging::Trans,
            Some("模块" | "nested") => BackStaging::Nested,
            Some(v) if is_hide_keyword(v) => BackStaging::Hide,
            _ => BackStaging::Inline,
        }
    }
}

/// Backgrounds and event CGs. A hide keyword in either field, or in
/// `TransBack`, hides that background actor instead. A `Dissolve` mask
/// switches the image to the `Custom` transition.
pub struct BackgroundGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
    prefix: String,
}

impl BackgroundGenerator {
    pub const NAME: &'static str = "BackgroundGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field("Background", ParamDecl::new().category("Background").translate("Background"))
                .field("Event", ParamDecl::new().category("Background").translate("Event"))
                .field("TransBack", ParamDecl::new().category("Background"))
                .field("BackID", ParamDecl::new())
                .field("BackTrans", ParamDecl::new().translate("Transition").format(".{value}"))
                .field("BackPos", ParamDecl::new().format(" pos:{value}"))
                .field("BackScale", ParamDecl::new().format(" scale:{value}"))
                .field("BackVisible", ParamDecl::new().format(" visible:{value}"))
                .field("BackTint", ParamDecl::new().translate("Tint").format(" tint:{value}"))
                .field(
                    "Dissolve",
                    ParamDecl::new().translate("Transition").format(" dissolve:{value}"),
                )
                .field(
                    "DissolveParam",
                    ParamDecl::new().format(" params:{value}").default_value("90"),
                )
                .field("BackWait", ParamDecl::new().format(" wait:{value}"))
                .field(
                    "BackTime",
                    ParamDecl::new().format(" time:{value}").default_value("1.0"),
                ),
            prefix: prefix(ctx),
        }))
    }

    /// The `@back`/`@hide` command without its timing.
    fn line(
        &self,
        fields: &Fields<'_>,
        image: &str,
        id: &str,
        hide: bool,
    ) -> Result<String, GeneratorError> {
        let p = &self.prefix;
        let mut dissolve = fields.sentence("Dissolve")?;
        if !dissolve.is_empty() {
            dissolve.push_str(&fields.sentence_or_default("DissolveParam")?);
        }
        let wait = fields.sentence("BackWait")?;
        if hide {
            return Ok(format!("{p}hide {id}{dissolve}{wait}"));
        }

        let transition = if dissolve.is_empty() {
            fields.sentence("BackTrans")?
        } else {
            format!(".{CUSTOM_TRANSITION}")
        };
        let id = if id == MAIN_BACKGROUND {
            String::new()
        } else {
            format!(" id:{id}")
        };
        Ok(format!(
            "{p}back {image}{transition}{id}{}{}{}{}{dissolve}{wait}",
            fields.sentence("BackPos")?,
            fields.sentence("BackScale")?,
            fields.sentence("BackVisible")?,
            fields.sentence("BackTint")?,
        ))
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
        let staging = BackStaging::parse(fields.value("TransBack").as_deref());
        let time = fields.sentence_or_default("BackTime")?;

        let mut targets = Vec::new();
        if let Some(back) = fields.value("Background") {
            let id = fields
                .value("BackID")
                .unwrap_or_else(|| MAIN_BACKGROUND.to_string());
            targets.push((back, id));
        }
        if let Some(event) = fields.value("Event") {
            targets.push((event, EVENT_BACKGROUND.to_string()));
        }

        let p = &self.prefix;
        let mut out = Vec::new();
        for (image, id) in targets {
            let hide = staging == BackStaging::Hide || is_hide_keyword(&image);
            let line = self.line(&fields, &image, &id, hide)?;
            match staging {
                BackStaging::Trans => {
                    out.push(format!("{p}trans{time}"));
                    out.push(line);
                }
                BackStaging::Nested => out.push(format!("{NESTED_INDENT}{line}{time}")),
                BackStaging::Inline | BackStaging::Hide => out.push(format!("{line}{time}")),
            }
        }
        Ok(lines(out))
    }
}

/// Character sprites. The appearance is resolved against the character's
/// own variant table first.
pub struct CharacterGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
    prefix: String,
}

impl CharacterGenerator {
    pub const NAME: &'static str = "CharacterGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field("Character", ParamDecl::new().category("Character").translate("Character"))
                .field("Variant", ParamDecl::new().category("Character"))
                .field("CharPos", ParamDecl::new().format(" pos:{value}"))
                .field("CharScale", ParamDecl::new().format(" scale:{value}"))
                .field("CharTint", ParamDecl::new().translate("Tint").format(" tint:{value}"))
                .field("CharTime", ParamDecl::new().format(" time:{value}"))
                .field("CharWait", ParamDecl::new().format(" wait:{value}")),
            prefix: prefix(ctx),
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
        300
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        let p = &self.prefix;
        let Some(character) = fields.value("Character") else {
            tracing::debug!(generator = Self::NAME, "sprite fields without a character");
            return Ok(Vec::new());
        };
        if character == HIDE_ALL_CHARACTERS {
            return Ok(vec![Command::Line(format!(
                "{p}hideChars{}",
                fields.sentence("CharTime")?
            ))]);
        }

        let appearance = fields
            .value("Variant")
            .map(|v| format!(".{}", self.translator.translate_variant(&v, Some(&character))))
            .unwrap_or_default();
        Ok(vec![Command::Line(format!(
            "{p}char {character}{appearance}{}{}{}{}{}",
            fields.sentence("CharPos")?,
            fields.sentence("CharScale")?,
            fields.sentence("CharTint")?,
            fields.sentence("CharTime")?,
            fields.sentence("CharWait")?,
        ))])
    }
}

pub struct HideGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl HideGenerator {
    pub const NAME: &'static str = "HideGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        let p = prefix(ctx);
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field(
                    "Hide",
                    ParamDecl::new()
                        .category("Character")
                        .candidates(&["Character", "Background"])
                        .format(&format!("{p}hide {{value}}")),
                )
                .field("HideTime", ParamDecl::new().format(" time:{value}"))
                .field("HideWait", ParamDecl::new().format(" wait:{value}")),
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
        310
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
            "{}{}{}",
            fields.sentence("Hide")?,
            fields.sentence("HideTime")?,
            fields.sentence("HideWait")?
        ))])
    }
}

pub struct TransitionGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl TransitionGenerator {
    pub const NAME: &'static str = "TransitionGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        let p = prefix(ctx);
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new().field(
                "Transition",
                ParamDecl::new()
                    .category("Transition")
                    .translate("Transition")
                    .format(&format!("{p}transition {{value}}")),
            ),
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
        400
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let row = resolve_row(&self.params, &self.translator, data);
        let fields = Fields::new(&self.params, &row);
        Ok(lines([fields.sentence("Transition")?]))
    }
}

/// Full-screen movie playback.
pub struct MovieGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl MovieGenerator {
    pub const NAME: &'static str = "MovieGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        let p = prefix(ctx);
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field(
                    "Movie",
                    ParamDecl::new()
                        .category("Movie")
                        .translate("Movie")
                        .format(&format!("{p}movie {{value}}")),
                )
                .field("MovieWait", ParamDecl::new().format(" wait:{value}")),
        }))
    }
}

impl Generator for MovieGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Movie"
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
        if !fields.has("Movie") {
            return Ok(Vec::new());
        }
        Ok(vec![Command::Line(format!(
            "{}{}",
            fields.sentence("Movie")?,
            fields.sentence("MovieWait")?
        ))])
    }
}

/// `@wait` for a number of seconds, or for player input on any other value.
pub struct PauseWaitGenerator {
    params: ParamSchema,
    prefix: String,
}

impl PauseWaitGenerator {
    pub const NAME: &'static str = "PauseWaitGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Self {
            params: ParamSchema::new().field("PauseWait", ParamDecl::new().category("Flow")),
            prefix: prefix(ctx),
        }))
    }
}

impl Generator for PauseWaitGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn category(&self) -> &str {
        "Flow"
    }

    fn priority(&self) -> i32 {
        850
    }

    fn params(&self) -> &ParamSchema {
        &self.params
    }

    fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
        let fields = Fields::new(&self.params, data);
        let Some(value) = fields.value("PauseWait") else {
            return Ok(Vec::new());
        };
        let p = &self.prefix;
        match value.parse::<f64>() {
            Ok(seconds) if !seconds.is_finite() || seconds < 0.0 => Err(
                GeneratorError::execution(Self::NAME, format!("invalid wait duration '{value}'")),
            ),
            Ok(_) => Ok(vec![Command::Line(format!("{p}wait {value}"))]),
            Err(_) => Ok(vec![Command::Line(format!("{p}wait i"))]),
        }
    }
}

pub struct VoiceGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
}

impl VoiceGenerator {
    pub const NAME: &'static str = "VoiceGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        let p = prefix(ctx);
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new().field(
                "Voice",
                ParamDecl::new()
                    .category("Voice")
                    .translate("Voice")
                    .format(&format!("{p}voice {{value}}"))
                    .stop_format(&format!("{p}stopVoice")),
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

/// Dialogue and narration as generic text lines, with printer switching
/// and window control.
pub struct TextGenerator {
    translator: Arc<Translator>,
    params: ParamSchema,
    prefix: String,
}

impl TextGenerator {
    pub const NAME: &'static str = "TextGenerator";

    pub fn create(ctx: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        let p = prefix(ctx);
        Ok(Box::new(Self {
            translator: Arc::clone(&ctx.translator),
            params: ParamSchema::new()
                .field("Window", ParamDecl::new().category("Text"))
                .field(
                    "Printer",
                    ParamDecl::new()
                        .category("Text")
                        .translate("Printer")
                        .format(&format!("{p}printer {{value}}")),
                )
                .field("Speaker", ParamDecl::new().category("Text"))
                .field("Text", ParamDecl::new().category("Text")),
            prefix: p,
        }))
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
        let p = &self.prefix;
        let window = fields.value("Window").and_then(|raw| {
            let mode = WindowMode::parse(&raw);
            if mode.is_none() {
                tracing::warn!(generator = Self::NAME, window = raw.as_str(), "unknown window mode");
            }
            mode
        });

        let mut out = vec![fields.sentence("Printer")?];
        if window.is_some_and(WindowMode::shows) {
            out.push(format!("{p}showPrinter"));
        }
        if let Some(text) = fields.value("Text") {
            match fields.value("Speaker").as_deref() {
                Some(RAW_SPEAKER) => out.extend(text.lines().map(str::to_string)),
                Some(speaker) => {
                    let speaker = self.translator.translate("Speaker", speaker);
                    out.push(format!("{speaker}: {text}"));
                }
                None => out.push(text),
            }
        }
        if window.is_some_and(WindowMode::hides) {
            out.push(format!("{p}hidePrinter"));
        }
        Ok(lines(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineOptions;

    fn make_translator() -> Translator {
        let types = r#"{
            "Music": {"主题曲": "Theme"},
            "Character": {"爱丽丝": "Alice"},
            "Background": {"教室": "Classroom"},
            "Event": {"告白": "Confession"},
            "Transition": {"波纹": "Ripple"},
            "Speaker": {"爱丽丝": "Alice"},
            "Printer": {"全屏": "Fullscreen"},
            "Movie": {"开场": "Opening"},
        }"#;
        let variants = r#"{
            "Alice": {"微笑": "Happy"},
        }"#;
        Translator::parse_ron(Some(types), Some(variants)).unwrap()
    }

    fn make_ctx() -> GeneratorContext {
        GeneratorContext::new(Arc::new(make_translator()), EngineConfig::naninovel())
    }

    type Factory = fn(&GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError>;

    fn run_with(ctx: &GeneratorContext, create: Factory, row: Row) -> Vec<String> {
        create(ctx)
            .unwrap()
            .process(&row)
            .unwrap()
            .into_iter()
            .filter_map(|c| c.as_line().map(str::to_string))
            .collect()
    }

    fn run(create: Factory, row: Row) -> Vec<String> {
        run_with(&make_ctx(), create, row)
    }

    #[test]
    fn note_becomes_comment() {
        let row = Row::new().with("Note", "check timing");
        assert_eq!(run(NoteGenerator::create, row), vec!["; check timing"]);
    }

    #[test]
    fn audio_play_and_stop() {
        let row = Row::new()
            .with("Music", "主题曲")
            .with("Volume", 0.8)
            .with("AudioFade", 1.0);
        assert_eq!(run(AudioGenerator::create, row), vec!["@bgm Theme volume:0.8 fade:1"]);

        let row = Row::new().with("Music", "stop").with("Ambience", "rain");
        assert_eq!(
            run(AudioGenerator::create, row),
            vec!["@stopBgm", "@sfx rain loop:true"]
        );
    }

    #[test]
    fn background_show_and_hide() {
        let row = Row::new().with("Background", "教室").with("BackTrans", "波纹").with("BackTime", 2.0);
        assert_eq!(
            run(BackgroundGenerator::create, row),
            vec!["@back Classroom.Ripple time:2"]
        );

        let row = Row::new().with("Event", "告白");
        assert_eq!(
            run(BackgroundGenerator::create, row),
            vec!["@back Confession id:CG time:1.0"]
        );

        let row = Row::new().with("Event", "隐藏");
        assert_eq!(run(BackgroundGenerator::create, row), vec!["@hide CG time:1.0"]);
    }

    #[test]
    fn background_dissolve_mask() {
        let row = Row::new()
            .with("Background", "教室")
            .with("BackTrans", "波纹")
            .with("Dissolve", "波纹");
        assert_eq!(
            run(BackgroundGenerator::create, row),
            vec!["@back Classroom.Custom dissolve:Ripple params:90 time:1.0"]
        );

        let row = Row::new()
            .with("Background", "教室")
            .with("BackVisible", "false")
            .with("Dissolve", "Mask")
            .with("DissolveParam", 60.0);
        assert_eq!(
            run(BackgroundGenerator::create, row),
            vec!["@back Classroom.Custom visible:false dissolve:Mask params:60 time:1.0"]
        );
    }

    #[test]
    fn background_staging() {
        let row = Row::new()
            .with("Background", "教室")
            .with("TransBack", "转场")
            .with("BackTime", 2.0);
        assert_eq!(
            run(BackgroundGenerator::create, row),
            vec!["@trans time:2", "@back Classroom"]
        );

        let row = Row::new().with("Background", "教室").with("TransBack", "模块");
        assert_eq!(
            run(BackgroundGenerator::create, row),
            vec!["    @back Classroom time:1.0"]
        );

        let row = Row::new()
            .with("Background", "教室")
            .with("BackID", "Far")
            .with("TransBack", "隐藏");
        assert_eq!(run(BackgroundGenerator::create, row), vec!["@hide Far time:1.0"]);
    }

    #[test]
    fn effects() {
        let row = Row::new().with("PackedEffect", "@spawn Rain");
        assert_eq!(run(EffectGenerator::create, row), vec!["@spawn Rain"]);

        let row = Row::new()
            .with("Effect", "shake")
            .with("EffectId", "Alice")
            .with("EffectAtr1", 3.0)
            .with("EffectWait", "false");
        assert_eq!(
            run(EffectGenerator::create, row),
            vec!["@shake Alice count:3 wait:false time:1"]
        );

        let row = Row::new().with("Effect", "blur").with("EffectPower", 0.5).with("EffectTime", 2.0);
        assert_eq!(run(EffectGenerator::create, row), vec!["@blur power:0.5 time:2"]);

        let row = Row::new().with("Effect", "glitch");
        assert!(run(EffectGenerator::create, row).is_empty());
    }

    #[test]
    fn camera_modes() {
        let row = Row::new().with("Camera", "镜头").with("Zoom", 0.5).with("OffsetX", 2.0);
        assert_eq!(
            run(CameraGenerator::create, row),
            vec!["@camera zoom:0.5 offset:2,0 time:0"]
        );

        let row = Row::new().with("Camera", "切镜头").with("OffsetY", -1.0).with("CameraTime", 1.5);
        assert_eq!(
            run(CameraGenerator::create, row),
            vec!["@trans", "    @camera offset:0,-1 time:1.5"]
        );

        let row = Row::new().with("Camera", "重置");
        assert_eq!(
            run(CameraGenerator::create, row),
            vec!["@trans", "    @camera offset:0,0 zoom:0 rotation:0,0,0 time:0"]
        );

        let row = Row::new().with("Camera", "模块").with("CameraWait", "false");
        assert_eq!(
            run(CameraGenerator::create, row),
            vec!["    @camera wait:false time:0"]
        );
    }

    #[test]
    fn transition_and_movie() {
        let row = Row::new().with("Transition", "波纹");
        assert_eq!(run(TransitionGenerator::create, row), vec!["@transition Ripple"]);

        let row = Row::new().with("Movie", "开场").with("MovieWait", "true");
        assert_eq!(run(MovieGenerator::create, row), vec!["@movie Opening wait:true"]);
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
            vec![0, 100, 120, 140, 200, 300, 310, 400, 800, 850, 890, 900]
        );
    }

    #[test]
    fn character_with_appearance() {
        let row = Row::new()
            .with("Character", "爱丽丝")
            .with("Variant", "微笑")
            .with("CharPos", "50,0");
        assert_eq!(
            run(CharacterGenerator::create, row),
            vec!["@char Alice.Happy pos:50,0"]
        );
        let row = Row::new().with("Character", "hideAll").with("CharTime", 0.5);
        assert_eq!(run(CharacterGenerator::create, row), vec!["@hideChars time:0.5"]);
    }

    #[test]
    fn hide_resolves_candidates() {
        let row = Row::new().with("Hide", "爱丽丝").with("HideWait", "false");
        assert_eq!(run(HideGenerator::create, row), vec!["@hide Alice wait:false"]);
    }

    #[test]
    fn wait_seconds_or_input() {
        assert_eq!(
            run(PauseWaitGenerator::create, Row::new().with("PauseWait", 1.5)),
            vec!["@wait 1.5"]
        );
        assert_eq!(
            run(PauseWaitGenerator::create, Row::new().with("PauseWait", "click")),
            vec!["@wait i"]
        );
        let generator = PauseWaitGenerator::create(&make_ctx()).unwrap();
        assert!(generator.process(&Row::new().with("PauseWait", -2.0)).is_err());
    }

    #[test]
    fn text_lines() {
        let row = Row::new().with("Speaker", "爱丽丝").with("Text", "Hello!");
        assert_eq!(run(TextGenerator::create, row), vec!["Alice: Hello!"]);

        let row = Row::new().with("Speaker", "UnknownCharacter").with("Text", "Hi");
        assert_eq!(run(TextGenerator::create, row), vec!["UnknownCharacter: Hi"]);

        let row = Row::new().with("Speaker", "naninovel").with("Text", "@goto Chapter2");
        assert_eq!(run(TextGenerator::create, row), vec!["@goto Chapter2"]);
    }

    #[test]
    fn text_printer_and_window() {
        let row = Row::new()
            .with("Printer", "全屏")
            .with("Window", "显示")
            .with("Text", "Night fell.");
        assert_eq!(
            run(TextGenerator::create, row),
            vec!["@printer Fullscreen", "@showPrinter", "Night fell."]
        );
    }

    #[test]
    fn custom_command_prefix() {
        let mut config = EngineConfig::naninovel();
        config.options = EngineOptions::Naninovel {
            command_prefix: "@@".to_string(),
        };
        let ctx = GeneratorContext::new(Arc::new(make_translator()), config);
        let row = Row::new().with("Voice", "alice_001");
        assert_eq!(
            run_with(&ctx, VoiceGenerator::create, row),
            vec!["@@voice alice_001"]
        );
    }
}
