// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::ReferenceId;
use crate::token::parse_tokens;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern compiles"));

/// Expands mention tokens and `{field_id}` placeholders.
///
/// Tokens whose target does not resolve render as their label, so a template
/// that still mentions a deleted field reads sensibly. Unknown placeholders
/// are left as written.
pub fn render_template(text: &str, resolve: impl Fn(&ReferenceId) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for token in parse_tokens(text) {
        out.push_str(&expand_placeholders(
            &text[cursor..token.range.start],
            &resolve,
        ));
        out.push_str(&resolve(&token.target).unwrap_or(token.label));
        cursor = token.range.end;
    }
    out.push_str(&expand_placeholders(&text[cursor..], &resolve));
    out
}

fn expand_placeholders(text: &str, resolve: &impl Fn(&ReferenceId) -> Option<String>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            resolve(&ReferenceId::new(&caps[1])).unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

/// Every target referenced by a token in `text`, in order of appearance.
pub fn referenced_targets(text: &str) -> Vec<ReferenceId> {
    parse_tokens(text)
        .into_iter()
        .map(|token| token.target)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{referenced_targets, render_template};
    use crate::ReferenceId;

    fn resolver(target: &ReferenceId) -> Option<String> {
        match target.as_str() {
            "title" => Some("Dark mode".to_owned()),
            "field_1" => Some("ann@example.com".to_owned()),
            _ => None,
        }
    }

    #[test]
    fn tokens_and_placeholders_expand() {
        let text = "Request: {title} from «Email|field_1»";
        assert_eq!(
            render_template(text, resolver),
            "Request: Dark mode from ann@example.com"
        );
    }

    #[test]
    fn unresolved_tokens_fall_back_to_label() {
        let text = "See «Budget|field_9» and {unknown}";
        assert_eq!(
            render_template(text, resolver),
            "See Budget and {unknown}"
        );
    }

    #[test]
    fn targets_are_listed_in_order() {
        let targets = referenced_targets("«A|field_2» then «B|title»");
        assert_eq!(
            targets,
            vec![ReferenceId::new("field_2"), ReferenceId::new("title")]
        );
    }
}
