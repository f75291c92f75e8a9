/// The row pipeline: Row → Commands orchestration.
///
/// Projects each row onto the fields every generator declared, runs the
/// generators in priority order, and concatenates what they emit. A
/// generator that fails only loses its own output for that row.
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::core::config::{ConfigError, EngineConfig};
use crate::core::engine::EngineError;
use crate::core::generator::{Generator, GeneratorContext, InputScope};
use crate::core::registry::{GeneratorRegistry, GeneratorSet, RegistryError};
use crate::core::translate::{TranslateError, Translator};
use crate::schema::command::Command;
use crate::schema::param::ParamDecl;
use crate::schema::row::Row;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("translation error: {0}")]
    Translate(#[from] TranslateError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("no configuration supplied for engine '{0}'")]
    MissingConfig(String),
}

/// One row of the debug listing returned by [`ScenarioProcessor::pipeline_info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageInfo {
    /// 1-based position in execution order.
    pub stage: usize,
    pub name: String,
    pub category: String,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineInfo {
    pub engine: String,
    pub total_stages: usize,
    pub stages: Vec<StageInfo>,
}

/// Fields a stage is handed, resolved once at setup.
#[derive(Debug, Clone)]
enum Needed {
    Fields(Vec<String>),
    All,
}

/// A configured pipeline for one engine. Built via [`ScenarioProcessor::builder`].
#[derive(Debug)]
pub struct ScenarioProcessor {
    generators: GeneratorSet,
    needed: Vec<Needed>,
    config: EngineConfig,
    translator: Arc<Translator>,
}

/// Builder for a [`ScenarioProcessor`]; building performs setup.
pub struct ScenarioProcessorBuilder {
    engine: String,
    translator: Option<Arc<Translator>>,
    config: Option<EngineConfig>,
    registry: Option<GeneratorRegistry>,
}

impl ScenarioProcessor {
    pub fn builder(engine: &str) -> ScenarioProcessorBuilder {
        ScenarioProcessorBuilder {
            engine: engine.to_string(),
            translator: None,
            config: None,
            registry: None,
        }
    }

    pub fn engine(&self) -> &str {
        self.generators.engine()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn translator(&self) -> &Arc<Translator> {
        &self.translator
    }

    pub fn generator_set(&self) -> &GeneratorSet {
        &self.generators
    }

    /// Merged field declarations of every active generator.
    pub fn param_index(&self) -> &std::collections::BTreeMap<String, ParamDecl> {
        self.generators.param_index()
    }

    /// Convert one row into its commands. Never fails; an empty vector means
    /// no generator had anything to say.
    pub fn process_row(&self, row: &Row) -> Vec<Command> {
        self.run_row(None, row)
    }

    /// Convert rows in source order.
    pub fn process_rows<'a, I>(&self, rows: I) -> Vec<Vec<Command>>
    where
        I: IntoIterator<Item = &'a Row>,
    {
        rows.into_iter()
            .enumerate()
            .map(|(index, row)| self.run_row(Some(index), row))
            .collect()
    }

    pub fn pipeline_info(&self) -> PipelineInfo {
        let stages: Vec<StageInfo> = self
            .generators
            .generators()
            .iter()
            .enumerate()
            .map(|(i, g)| StageInfo {
                stage: i + 1,
                name: g.name().to_string(),
                category: g.category().to_string(),
                priority: g.priority(),
            })
            .collect();
        PipelineInfo {
            engine: self.engine().to_string(),
            total_stages: stages.len(),
            stages,
        }
    }

    fn run_row(&self, index: Option<usize>, row: &Row) -> Vec<Command> {
        let mut results = Vec::new();
        let exclusive = self.exclusive_stage(row);

        for (i, (generator, needed)) in self
            .generators
            .generators()
            .iter()
            .zip(&self.needed)
            .enumerate()
        {
            if let Some(owner) = exclusive {
                if i != owner && !generator.runs_alongside_exclusive() {
                    continue;
                }
            }

            let subset = match needed {
                Needed::All => row.non_absent(),
                Needed::Fields(names) => row.project(names.iter().map(String::as_str)),
            };
            if subset.is_empty() {
                continue;
            }

            match generator.process(&subset) {
                Ok(commands) => results.extend(commands),
                Err(e) => {
                    let fields: Vec<&str> = subset.names().collect();
                    tracing::error!(
                        generator = generator.name(),
                        category = generator.category(),
                        row = ?index,
                        ?fields,
                        error = %e,
                        "generator failed, skipping its output for this row"
                    );
                }
            }
        }

        results
    }

    /// Index of the first stage whose exclusive trigger field is present.
    fn exclusive_stage(&self, row: &Row) -> Option<usize> {
        self.generators
            .generators()
            .iter()
            .position(|g| g.exclusive_trigger().is_some_and(|field| row.has(field)))
    }
}

impl ScenarioProcessorBuilder {
    pub fn translator(mut self, translator: Arc<Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this registry instead of the built-in one.
    pub fn registry(mut self, registry: &GeneratorRegistry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    pub fn build(self) -> Result<ScenarioProcessor, PipelineError> {
        let config = match self.config {
            Some(config) => config,
            None => builtin_config(&self.engine)
                .ok_or_else(|| PipelineError::MissingConfig(self.engine.clone()))?,
        };
        let translator = self.translator.unwrap_or_default();
        let registry = self.registry.unwrap_or_else(GeneratorRegistry::builtin);

        let ctx = GeneratorContext::new(Arc::clone(&translator), config.clone());
        let generators = registry.instantiate(&self.engine, &ctx)?;
        let needed = generators
            .generators()
            .iter()
            .map(|g| needed_fields(g.as_ref()))
            .collect();

        tracing::info!(
            engine = self.engine.as_str(),
            stages = generators.len(),
            "scenario processor ready"
        );

        Ok(ScenarioProcessor {
            generators,
            needed,
            config,
            translator,
        })
    }
}

fn needed_fields(generator: &dyn Generator) -> Needed {
    match generator.input_scope() {
        InputScope::AllFields => Needed::All,
        InputScope::Declared => {
            Needed::Fields(generator.params().names().map(str::to_string).collect())
        }
    }
}

fn builtin_config(engine: &str) -> Option<EngineConfig> {
    match engine {
        "renpy" => Some(EngineConfig::renpy()),
        "naninovel" => Some(EngineConfig::naninovel()),
        "utage" => Some(EngineConfig::utage()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::generator::GeneratorError;
    use crate::core::registry::GeneratorEntry;
    use crate::schema::param::ParamSchema;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static SILENT_CALLS: AtomicUsize = AtomicUsize::new(0);

    struct Audio {
        params: ParamSchema,
    }

    impl Generator for Audio {
        fn name(&self) -> &str {
            "Audio"
        }
        fn category(&self) -> &str {
            "Audio"
        }
        fn priority(&self) -> i32 {
            10
        }
        fn params(&self) -> &ParamSchema {
            &self.params
        }
        fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
            let fields = crate::core::generator::Fields::new(&self.params, data);
            Ok(vec![Command::Line(fields.sentence("Music")?)])
        }
    }

    struct Text {
        params: ParamSchema,
    }

    impl Generator for Text {
        fn name(&self) -> &str {
            "Text"
        }
        fn category(&self) -> &str {
            "Text"
        }
        fn priority(&self) -> i32 {
            90
        }
        fn params(&self) -> &ParamSchema {
            &self.params
        }
        fn process(&self, data: &Row) -> Result<Vec<Command>, GeneratorError> {
            Ok(data
                .present("Text")
                .map(|v| vec![Command::line(v.to_string())])
                .unwrap_or_default())
        }
    }

    struct Broken {
        params: ParamSchema,
    }

    impl Generator for Broken {
        fn name(&self) -> &str {
            "Broken"
        }
        fn category(&self) -> &str {
            "Broken"
        }
        fn priority(&self) -> i32 {
            50
        }
        fn params(&self) -> &ParamSchema {
            &self.params
        }
        fn process(&self, _data: &Row) -> Result<Vec<Command>, GeneratorError> {
            Err(GeneratorError::execution("Broken", "intentional"))
        }
    }

    struct Silent {
        params: ParamSchema,
    }

    impl Generator for Silent {
        fn name(&self) -> &str {
            "Silent"
        }
        fn category(&self) -> &str {
            "Silent"
        }
        fn params(&self) -> &ParamSchema {
            &self.params
        }
        fn process(&self, _data: &Row) -> Result<Vec<Command>, GeneratorError> {
            SILENT_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Command::line("silent")])
        }
    }

    fn make_text(_: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Text {
            params: ParamSchema::new().field("Text", ParamDecl::new().format("{value}")),
        }))
    }

    fn make_audio(_: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Audio {
            params: ParamSchema::new()
                .field("Music", ParamDecl::new().format("play music {value}")),
        }))
    }

    fn make_broken(_: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Broken {
            params: ParamSchema::new().field("Broken", ParamDecl::new()),
        }))
    }

    fn make_silent(_: &GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError> {
        Ok(Box::new(Silent {
            params: ParamSchema::new()
                .field("X", ParamDecl::new())
                .field("Y", ParamDecl::new()),
        }))
    }

    fn build(entries: &[GeneratorEntry]) -> ScenarioProcessor {
        let mut registry = GeneratorRegistry::new();
        registry.register_all("test", entries);
        ScenarioProcessor::builder("test")
            .config(EngineConfig::renpy())
            .registry(&registry)
            .build()
            .unwrap()
    }

    #[test]
    fn priority_order_independent_of_registration() {
        // Text is registered first but Audio has the lower priority.
        let processor = build(&[
            GeneratorEntry::new("test", "Text", make_text),
            GeneratorEntry::new("test", "Audio", make_audio),
        ]);
        let row = Row::new().with("Music", "bgm_main").with("Text", "Hello");
        let out = processor.process_row(&row);
        assert_eq!(
            out,
            vec![Command::line("play music bgm_main"), Command::line("Hello")]
        );
    }

    #[test]
    fn failing_generator_is_isolated() {
        let processor = build(&[
            GeneratorEntry::new("test", "Broken", make_broken),
            GeneratorEntry::new("test", "Text", make_text),
        ]);
        let row = Row::new().with("Broken", "boom").with("Text", "Hello");
        assert_eq!(processor.process_row(&row), vec![Command::line("Hello")]);
        // Later rows are unaffected too.
        let row = Row::new().with("Text", "Again");
        assert_eq!(processor.process_row(&row), vec![Command::line("Again")]);
    }

    #[test]
    fn empty_projection_skips_generator() {
        let processor = build(&[
            GeneratorEntry::new("test", "Silent", make_silent),
            GeneratorEntry::new("test", "Text", make_text),
        ]);
        let before = SILENT_CALLS.load(Ordering::SeqCst);
        let row = Row::new().with("Text", "Hello").with("X", "");
        assert_eq!(processor.process_row(&row), vec![Command::line("Hello")]);
        assert_eq!(SILENT_CALLS.load(Ordering::SeqCst), before);
    }

    #[test]
    fn empty_row_yields_empty_vec() {
        let processor = build(&[GeneratorEntry::new("test", "Text", make_text)]);
        assert!(processor.process_row(&Row::new()).is_empty());
    }

    #[test]
    fn process_rows_keeps_source_order() {
        let processor = build(&[GeneratorEntry::new("test", "Text", make_text)]);
        let rows = vec![
            Row::new().with("Text", "one"),
            Row::new(),
            Row::new().with("Text", "two"),
        ];
        let out = processor.process_rows(&rows);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], vec![Command::line("one")]);
        assert!(out[1].is_empty());
        assert_eq!(out[2], vec![Command::line("two")]);
    }

    #[test]
    fn pipeline_info_lists_stages_in_order() {
        let processor = build(&[
            GeneratorEntry::new("test", "Text", make_text),
            GeneratorEntry::new("test", "Silent", make_silent),
            GeneratorEntry::new("test", "Audio", make_audio),
        ]);
        let info = processor.pipeline_info();
        assert_eq!(info.engine, "test");
        assert_eq!(info.total_stages, 3);
        let summary: Vec<(usize, &str, i32)> = info
            .stages
            .iter()
            .map(|s| (s.stage, s.name.as_str(), s.priority))
            .collect();
        assert_eq!(
            summary,
            vec![(1, "Audio", 10), (2, "Text", 90), (3, "Silent", 999)]
        );
    }

    #[test]
    fn unknown_engine_without_config_is_error() {
        let result = ScenarioProcessor::builder("mystery").build();
        assert!(matches!(result, Err(PipelineError::MissingConfig(_))));
    }

    #[test]
    fn builtin_engine_builds_with_defaults() {
        let processor = ScenarioProcessor::builder("renpy").build().unwrap();
        assert_eq!(processor.engine(), "renpy");
        assert!(processor.param_index().contains_key("Music"));
    }
}
