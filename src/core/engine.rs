/// Engine registration: binds an engine name to its metadata, default
/// configuration and processor factory.
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::core::config::EngineConfig;
use crate::core::pipeline::{PipelineError, ScenarioProcessor};
use crate::core::registry::GeneratorRegistry;
use crate::core::translate::Translator;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine '{0}' is not registered")]
    NotRegistered(String),
}

/// Builds a configured processor for one engine.
pub type ProcessorFactory =
    fn(&EngineConfig, Arc<Translator>, &GeneratorRegistry) -> Result<ScenarioProcessor, PipelineError>;

/// Everything the caller needs to know about a target engine.
#[derive(Clone)]
pub struct EngineDescriptor {
    pub name: String,
    pub display_name: String,
    pub file_extension: String,
    pub description: String,
    pub default_config: EngineConfig,
    pub factory: ProcessorFactory,
}

impl std::fmt::Debug for EngineDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("file_extension", &self.file_extension)
            .finish()
    }
}

/// Name → engine descriptor. Constructed explicitly and passed around.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    engines: BTreeMap<String, EngineDescriptor>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every engine shipped in this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::engines::register_engines(&mut registry);
        registry
    }

    /// Register an engine. An existing registration with the same name is
    /// replaced.
    pub fn register(&mut self, descriptor: EngineDescriptor) {
        if self.engines.contains_key(&descriptor.name) {
            tracing::warn!(engine = descriptor.name.as_str(), "engine already registered, overwriting");
        }
        tracing::info!(
            engine = descriptor.name.as_str(),
            display_name = descriptor.display_name.as_str(),
            "engine registered"
        );
        self.engines.insert(descriptor.name.clone(), descriptor);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&EngineDescriptor, EngineError> {
        self.engines
            .get(name)
            .ok_or_else(|| EngineError::NotRegistered(name.to_string()))
    }

    pub fn list_all(&self) -> &BTreeMap<String, EngineDescriptor> {
        &self.engines
    }

    pub fn reset(&mut self) {
        self.engines.clear();
        tracing::debug!("engine registry reset");
    }

    /// Look up `name` and build its processor. `config` defaults to the
    /// engine's own default configuration.
    pub fn create_processor(
        &self,
        name: &str,
        config: Option<&EngineConfig>,
        translator: Arc<Translator>,
        generators: &GeneratorRegistry,
    ) -> Result<ScenarioProcessor, PipelineError> {
        let descriptor = self.get(name)?;
        let config = config.unwrap_or(&descriptor.default_config);
        config.expect_engine(name)?;
        (descriptor.factory)(config, translator, generators)
    }
}

/// The factory every built-in engine uses: a plain processor over the
/// engine's registered generators.
pub fn standard_factory(
    config: &EngineConfig,
    translator: Arc<Translator>,
    generators: &GeneratorRegistry,
) -> Result<ScenarioProcessor, PipelineError> {
    ScenarioProcessor::builder(&config.engine)
        .config(config.clone())
        .translator(translator)
        .registry(generators)
        .build()
}
