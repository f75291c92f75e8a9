/// Output format templates: `"play music {value}"` style strings.
use thiserror::Error;

/// The only placeholder a format template may contain.
pub const VALUE_PLACEHOLDER: &str = "value";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed brace in '{0}'")]
    Unclosed(String),
    #[error("unmatched closing brace in '{0}'")]
    UnmatchedClose(String),
    #[error("unknown placeholder '{{{placeholder}}}' in '{template}'")]
    UnknownPlaceholder {
        placeholder: String,
        template: String,
    },
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Value,
}

/// A parsed format template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTemplate {
    pub segments: Vec<Segment>,
}

impl FormatTemplate {
    /// Parse a format string.
    ///
    /// Syntax:
    /// - `{value}` → the field value
    /// - `{{` / `}}` → literal braces
    /// - Everything else → literal text
    pub fn parse(input: &str) -> Result<FormatTemplate, TemplateError> {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            match chars[i] {
                '{' if i + 1 < len && chars[i + 1] == '{' => {
                    literal_buf.push('{');
                    i += 2;
                }
                '{' => {
                    let start = i + 1;
                    let end = match chars[start..].iter().position(|&c| c == '}') {
                        Some(offset) => start + offset,
                        None => return Err(TemplateError::Unclosed(input.to_string())),
                    };
                    let name: String = chars[start..end].iter().collect();
                    if name != VALUE_PLACEHOLDER {
                        return Err(TemplateError::UnknownPlaceholder {
                            placeholder: name,
                            template: input.to_string(),
                        });
                    }
                    if !literal_buf.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal_buf)));
                    }
                    segments.push(Segment::Value);
                    i = end + 1;
                }
                '}' if i + 1 < len && chars[i + 1] == '}' => {
                    literal_buf.push('}');
                    i += 2;
                }
                '}' => return Err(TemplateError::UnmatchedClose(input.to_string())),
                c => {
                    literal_buf.push(c);
                    i += 1;
                }
            }
        }

        if !literal_buf.is_empty() {
            segments.push(Segment::Literal(literal_buf));
        }

        Ok(FormatTemplate { segments })
    }

    pub fn render(&self, value: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Value => out.push_str(value),
            }
        }
        out
    }
}

/// Parse and render in one step.
pub fn render(format: &str, value: &str) -> Result<String, TemplateError> {
    Ok(FormatTemplate::parse(format)?.render(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_literal_only() {
        let t = FormatTemplate::parse("stop music").unwrap();
        assert_eq!(t.segments, vec![Segment::Literal("stop music".to_string())]);
    }

    #[test]
    fn render_value() {
        assert_eq!(
            render("play music {value}", "bgm_main").unwrap(),
            "play music bgm_main"
        );
        assert_eq!(render("({value})", "0.5").unwrap(), "(0.5)");
    }

    #[test]
    fn escaped_braces() {
        assert_eq!(render("{{{value}}}", "x").unwrap(), "{x}");
    }

    #[test]
    fn unknown_placeholder_is_error() {
        let err = FormatTemplate::parse("show {image}").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownPlaceholder { ref placeholder, .. } if placeholder == "image"));
    }

    #[test]
    fn unbalanced_braces_are_errors() {
        assert!(matches!(
            FormatTemplate::parse("show {value"),
            Err(TemplateError::Unclosed(_))
        ));
        assert!(matches!(
            FormatTemplate::parse("show value}"),
            Err(TemplateError::UnmatchedClose(_))
        ));
    }
}
