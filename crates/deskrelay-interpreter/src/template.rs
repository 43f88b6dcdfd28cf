//! The template language (§4.2, §9): single-brace `{name}` / `{name.sub}`,
//! trimmed, dotted, no control flow. Unresolved names render as the literal
//! `{UNDEFINED:name}` token — rendering never fails.

use regex::Regex;

use deskrelay_schema::VariableEnv;

fn placeholder_pattern() -> Regex {
    Regex::new(r"\{([a-zA-Z0-9_. ]+)\}").unwrap()
}

/// Renders a template against the variable environment. Always returns a
/// string — unresolved names become `{UNDEFINED:name}` sentinels rather than
/// raising, so the caller never needs to handle a rendering error.
pub fn render(template: &str, env: &VariableEnv) -> String {
    let pattern = placeholder_pattern();
    pattern
        .replace_all(template, |caps: &regex::Captures| {
            let raw_path = &caps[1];
            let trimmed_path = raw_path
                .split('.')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(".");
            match env.resolve_path(&trimmed_path) {
                Some(value) => value,
                None => format!("{{UNDEFINED:{trimmed_path}}}"),
            }
        })
        .into_owned()
}
