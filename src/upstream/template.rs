//! Field substitution for alias templates
//!
//! Alias data uses a fixed `{field}` syntax: `{name}`, `{raw_name}`, `{name[N]}`
//! (the N-th character of the field) and the `{{` / `}}` escapes. Field values
//! come from a caller-supplied lookup. Report summaries are rendered with tera,
//! see [`crate::upstream::summary`].

use crate::upstream::error::TemplateError;

/// Render `template`, resolving every field through `lookup`.
///
/// `lookup` returns `None` for fields it does not know about, which is reported as
/// [`TemplateError::UnknownField`].
pub fn render<F>(template: &str, lookup: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '{' => {
                let mut spec = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => spec.push(c),
                        None => return Err(TemplateError::Unbalanced(template.to_string())),
                    }
                }
                output.push_str(&substitute(&spec, &lookup)?);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '}' => return Err(TemplateError::Unbalanced(template.to_string())),
            c => output.push(c),
        }
    }

    Ok(output)
}

fn substitute<F>(spec: &str, lookup: &F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<String>,
{
    let (field, index) = parse_spec(spec)?;
    let value = lookup(field).ok_or_else(|| TemplateError::UnknownField(field.to_string()))?;

    match index {
        None => Ok(value),
        Some(index) => value
            .chars()
            .nth(index)
            .map(String::from)
            .ok_or_else(|| TemplateError::IndexOutOfRange {
                field: field.to_string(),
                index,
            }),
    }
}

/// Split `name[3]` into `("name", Some(3))`
fn parse_spec(spec: &str) -> Result<(&str, Option<usize>), TemplateError> {
    let Some((field, rest)) = spec.split_once('[') else {
        return Ok((spec, None));
    };

    let index = rest
        .strip_suffix(']')
        .and_then(|digits| digits.parse::<usize>().ok())
        .ok_or_else(|| TemplateError::UnknownField(spec.to_string()))?;

    Ok((field, Some(index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lookup(field: &str) -> Option<String> {
        match field {
            "name" => Some("testpackage".to_string()),
            "raw_name" => Some("drupal6-testpackage".to_string()),
            _ => None,
        }
    }

    #[rstest]
    #[case("http://example.org/{name}/", "http://example.org/testpackage/")]
    #[case("pool/main/{name[0]}/{name}/", "pool/main/t/testpackage/")]
    #[case(">{raw_name[6]}.x-", ">6.x-")]
    #[case("{{literal}} {name}", "{literal} testpackage")]
    #[case("no fields", "no fields")]
    fn render_substitutes_whitelisted_fields(#[case] template: &str, #[case] expected: &str) {
        assert_eq!(render(template, lookup).unwrap(), expected);
    }

    #[rstest]
    #[case("{version}", TemplateError::UnknownField("version".to_string()))]
    #[case("{name[42]}", TemplateError::IndexOutOfRange { field: "name".to_string(), index: 42 })]
    #[case("{name[x]}", TemplateError::UnknownField("name[x]".to_string()))]
    #[case("{name", TemplateError::Unbalanced("{name".to_string()))]
    #[case("name}", TemplateError::Unbalanced("name}".to_string()))]
    fn render_rejects_bad_templates(#[case] template: &str, #[case] expected: TemplateError) {
        assert_eq!(render(template, lookup), Err(expected));
    }
}
