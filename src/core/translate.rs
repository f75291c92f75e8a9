/// Translation tables: authoring vocabulary to engine identifiers.
///
/// Lookups never fail: a value the tables do not know is returned as-is
/// with a warning, so a half-maintained table still produces output.
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Global translation type consulted for variants when no character
/// override applies.
pub const VARIANT_TYPE: &str = "Variant";

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// `{type → {raw → resolved}}`, also used for `{character → {raw → resolved}}`.
pub type MappingTable = FxHashMap<String, FxHashMap<String, String>>;

/// Read-only lookup service shared by every generator of a run.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    types: MappingTable,
    variants: MappingTable,
}

impl Translator {
    pub fn new(types: MappingTable, variants: MappingTable) -> Self {
        Self { types, variants }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from plain nested maps, e.g. in tests or from another loader.
    pub fn from_maps(
        types: BTreeMap<String, BTreeMap<String, String>>,
        variants: BTreeMap<String, BTreeMap<String, String>>,
    ) -> Self {
        Self {
            types: to_fx(types),
            variants: to_fx(variants),
        }
    }

    /// Parse both tables from RON strings. `None` means "no such table".
    pub fn parse_ron(
        types_src: Option<&str>,
        variants_src: Option<&str>,
    ) -> Result<Translator, TranslateError> {
        let types = match types_src {
            Some(src) => ron::from_str(src)?,
            None => MappingTable::default(),
        };
        let variants = match variants_src {
            Some(src) => ron::from_str(src)?,
            None => MappingTable::default(),
        };
        let translator = Translator { types, variants };
        tracing::info!(
            types = translator.types.len(),
            characters = translator.variants.len(),
            "translation tables loaded"
        );
        Ok(translator)
    }

    /// Load both tables from RON files. A missing file degrades to an empty
    /// table; a malformed one is an error.
    pub fn load_from_ron(
        types_path: &Path,
        variants_path: Option<&Path>,
    ) -> Result<Translator, TranslateError> {
        let types_src = read_optional(types_path, true)?;
        let variants_src = match variants_path {
            Some(path) => read_optional(path, false)?,
            None => None,
        };
        Self::parse_ron(types_src.as_deref(), variants_src.as_deref())
    }

    /// Resolve `raw` under `param_type`, or hand it back unchanged.
    pub fn translate(&self, param_type: &str, raw: &str) -> String {
        match self.types.get(param_type) {
            Some(table) => match table.get(raw) {
                Some(resolved) => {
                    tracing::debug!(param_type, raw, resolved = resolved.as_str(), "translated");
                    resolved.clone()
                }
                None => {
                    tracing::warn!(param_type, raw, "value not found in translation type, passing through");
                    raw.to_string()
                }
            },
            None => {
                tracing::warn!(param_type, raw, "translation type not found, passing through");
                raw.to_string()
            }
        }
    }

    /// Membership test that stays silent on a miss.
    pub fn has_mapping(&self, param_type: &str, raw: &str) -> bool {
        self.types
            .get(param_type)
            .is_some_and(|table| table.contains_key(raw))
    }

    /// Resolve a sprite variant, preferring the character's own table.
    ///
    /// Without a character, or when the character has no table or no entry,
    /// the global `Variant` type is consulted before passing through.
    pub fn translate_variant(&self, raw: &str, character: Option<&str>) -> String {
        if let Some(character) = character {
            match self.variants.get(character) {
                Some(table) => {
                    if let Some(resolved) = table.get(raw) {
                        return resolved.clone();
                    }
                    tracing::debug!(character, raw, "variant not in character table");
                }
                None => tracing::debug!(character, "no variant table for character"),
            }
        }

        if let Some(resolved) = self.types.get(VARIANT_TYPE).and_then(|t| t.get(raw)) {
            return resolved.clone();
        }

        tracing::warn!(raw, character, "variant not found, passing through");
        raw.to_string()
    }

    pub fn translate_batch<S: AsRef<str>>(&self, param_type: &str, values: &[S]) -> Vec<String> {
        values
            .iter()
            .map(|v| self.translate(param_type, v.as_ref()))
            .collect()
    }

    /// All translation types, sorted.
    pub fn available_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.types.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Raw values known for a type, sorted. Empty if the type is unknown.
    pub fn params_for_type(&self, param_type: &str) -> Vec<&str> {
        let mut params: Vec<&str> = self
            .types
            .get(param_type)
            .map(|t| t.keys().map(String::as_str).collect())
            .unwrap_or_default();
        params.sort_unstable();
        params
    }

    /// Resolved values for a type, sorted and deduplicated.
    pub fn translations_for_type(&self, param_type: &str) -> Vec<&str> {
        let mut values: Vec<&str> = self
            .types
            .get(param_type)
            .map(|t| t.values().map(String::as_str).collect())
            .unwrap_or_default();
        values.sort_unstable();
        values.dedup();
        values
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.variants.is_empty()
    }
}

fn to_fx(map: BTreeMap<String, BTreeMap<String, String>>) -> MappingTable {
    map.into_iter()
        .map(|(k, inner)| (k, inner.into_iter().collect()))
        .collect()
}

fn read_optional(path: &Path, required_warning: bool) -> Result<Option<String>, TranslateError> {
    if !path.exists() {
        if required_warning {
            tracing::warn!(path = %path.display(), "translation file not found, using empty table");
        } else {
            tracing::debug!(path = %path.display(), "variant file not found, using empty table");
        }
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}
