/// Generator registry: the explicit, build-time list of generator
/// implementations per target engine.
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::core::generator::{Generator, GeneratorContext, GeneratorError};
use crate::schema::param::ParamDecl;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no generators registered for engine '{0}'")]
    NoGenerators(String),
    #[error("none of the generators for engine '{0}' could be constructed")]
    NoneInstantiated(String),
}

/// Builds one generator instance from the run's shared context.
pub type GeneratorFactory = fn(&GeneratorContext) -> Result<Box<dyn Generator>, GeneratorError>;

/// A registered generator implementation.
#[derive(Clone)]
pub struct GeneratorEntry {
    /// Engine the implementation was written for.
    pub namespace: &'static str,
    pub name: &'static str,
    pub factory: GeneratorFactory,
}

impl GeneratorEntry {
    pub const fn new(namespace: &'static str, name: &'static str, factory: GeneratorFactory) -> Self {
        Self {
            namespace,
            name,
            factory,
        }
    }
}

impl std::fmt::Debug for GeneratorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorEntry")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .finish()
    }
}

/// Engine name → generator entries, in registration order.
#[derive(Debug, Clone, Default)]
pub struct GeneratorRegistry {
    engines: BTreeMap<String, Vec<GeneratorEntry>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every engine shipped in this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::engines::register_all(&mut registry);
        registry
    }

    pub fn register(&mut self, engine: &str, entry: GeneratorEntry) {
        self.engines
            .entry(engine.to_string())
            .or_default()
            .push(entry);
    }

    pub fn register_all(&mut self, engine: &str, entries: &[GeneratorEntry]) {
        for entry in entries {
            self.register(engine, entry.clone());
        }
    }

    pub fn entries(&self, engine: &str) -> &[GeneratorEntry] {
        self.engines.get(engine).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn engines(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }

    /// Instantiate and order every generator registered for `engine`.
    ///
    /// Entries from another engine's namespace are skipped, and a factory
    /// that fails is logged and dropped. The result is sorted by priority;
    /// equal priorities keep registration order.
    pub fn instantiate(
        &self,
        engine: &str,
        ctx: &GeneratorContext,
    ) -> Result<GeneratorSet, RegistryError> {
        let entries = self.entries(engine);
        if entries.is_empty() {
            return Err(RegistryError::NoGenerators(engine.to_string()));
        }

        let mut generators: Vec<Box<dyn Generator>> = Vec::with_capacity(entries.len());
        let mut param_index = BTreeMap::new();

        for entry in entries {
            if entry.namespace != engine {
                tracing::warn!(
                    engine,
                    generator = entry.name,
                    namespace = entry.namespace,
                    "skipping generator registered under a foreign namespace"
                );
                continue;
            }

            match (entry.factory)(ctx) {
                Ok(generator) => {
                    for (name, decl) in generator.params().iter() {
                        param_index.insert(name.to_string(), decl.clone());
                    }
                    tracing::debug!(engine, generator = entry.name, "generator discovered");
                    generators.push(generator);
                }
                Err(e) => {
                    tracing::error!(
                        engine,
                        generator = entry.name,
                        error = %e,
                        "failed to construct generator, dropping it"
                    );
                }
            }
        }

        if generators.is_empty() {
            return Err(RegistryError::NoneInstantiated(engine.to_string()));
        }

        // Stable: ties keep registration order.
        generators.sort_by_key(|g| g.priority());

        tracing::info!(
            engine,
            generators = generators.len(),
            params = param_index.len(),
            "generator set ready"
        );
        for (i, generator) in generators.iter().enumerate() {
            tracing::info!(
                stage = i + 1,
                generator = generator.name(),
                priority = generator.priority(),
                "pipeline stage"
            );
        }

        Ok(GeneratorSet {
            engine: engine.to_string(),
            generators,
            param_index,
        })
    }
}

/// The active, priority-ordered generators of one engine.
#[derive(Debug)]
pub struct GeneratorSet {
    engine: String,
    generators: Vec<Box<dyn Generator>>,
    param_index: BTreeMap<String, ParamDecl>,
}

impl GeneratorSet {
    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn generators(&self) -> &[Box<dyn Generator>] {
        &self.generators
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Union of every generator's declarations; on a name clash the later
    /// registration wins. Informational only.
    pub fn param_index(&self) -> &BTreeMap<String, ParamDecl> {
        &self.param_index
    }

    /// Every declared field name, sorted.
    pub fn param_names(&self) -> Vec<&str> {
        self.param_index.keys().map(String::as_str).collect()
    }

    /// Every translation type any generator may consult, sorted.
    pub fn translate_types(&self) -> Vec<&str> {
        let mut types = BTreeSet::new();
        for generator in &self.generators {
            for (_, decl) in generator.params().iter() {
                types.extend(decl.translate_types());
            }
        }
        types.into_iter().collect()
    }
}
