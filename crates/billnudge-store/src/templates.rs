//! Placeholder discovery for the template library.

use std::sync::OnceLock;

use regex::Regex;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"))
}

/// Unique `{identifier}` names in `content`, in first-seen order.
pub fn extract_variables(content: &str) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();
    for cap in placeholder_re().captures_iter(content) {
        let name = &cap[1];
        if !vars.iter().any(|v| v == name) {
            vars.push(name.to_string());
        }
    }
    vars
}
