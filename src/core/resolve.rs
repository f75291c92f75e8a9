/// Translation resolution: rewrite a generator's declared fields through
/// the translation tables before it emits anything.
use crate::core::translate::Translator;
use crate::schema::param::{ParamSchema, Translate};
use crate::schema::row::{Row, Value};

/// Return a copy of `row` with every declared, non-absent field resolved.
///
/// - `Translate::Type` looks the value up unconditionally (warning on miss).
/// - `Translate::Candidates` takes the first type that knows the value and
///   leaves it alone if none does.
/// - Undeclared fields and `Translate::None` pass through.
///
/// Several generators read the same source row in one pass, so the input is
/// never modified.
pub fn resolve_row(schema: &ParamSchema, translator: &Translator, row: &Row) -> Row {
    let mut resolved = row.clone();

    for (name, value) in row.iter() {
        if value.is_absent() {
            continue;
        }
        let Some(decl) = schema.get(name) else {
            continue;
        };
        let raw = value.to_string();

        match &decl.translate {
            Translate::None => {}
            Translate::Type(param_type) => {
                resolved.insert(name, Value::Text(translator.translate(param_type, &raw)));
            }
            Translate::Candidates(candidates) => {
                match candidates
                    .iter()
                    .find(|candidate| translator.has_mapping(candidate, &raw))
                {
                    Some(candidate) => {
                        resolved.insert(name, Value::Text(translator.translate(candidate, &raw)));
                    }
                    None => {
                        tracing::debug!(
                            field = name,
                            raw = raw.as_str(),
                            ?candidates,
                            "value matched no candidate translation type"
                        );
                    }
                }
            }
        }
    }

    resolved
}
