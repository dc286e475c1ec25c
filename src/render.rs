use crate::version::VersionRecord;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Pattern '{pattern}' references undefined field '{field}'")]
    MissingField { pattern: String, field: String },
    #[error("Pattern '{pattern}' has an unclosed '{{' at position {position}")]
    UnclosedPlaceholder { pattern: String, position: usize },
    #[error("Pattern '{pattern}' has an unmatched '}}' at position {position}")]
    UnmatchedBrace { pattern: String, position: usize },
}

/// Renders `pattern`, substituting each `{field}` with its value in `record`.
///
/// `{{` and `}}` produce literal braces.
pub fn render(pattern: &str, record: &VersionRecord) -> Result<String, RenderError> {
    let mut output = String::with_capacity(pattern.len());
    let mut chars = pattern.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                output.push('{');
            }
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    field.push(c);
                }
                if !closed {
                    return Err(RenderError::UnclosedPlaceholder {
                        pattern: pattern.to_string(),
                        position,
                    });
                }
                let value = record.get(&field).ok_or_else(|| RenderError::MissingField {
                    pattern: pattern.to_string(),
                    field: field.clone(),
                })?;
                output.push_str(value);
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                output.push('}');
            }
            '}' => {
                return Err(RenderError::UnmatchedBrace {
                    pattern: pattern.to_string(),
                    position,
                });
            }
            c => output.push(c),
        }
    }

    Ok(output)
}
