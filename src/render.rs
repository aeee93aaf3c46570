//! Markup composition for visible notices.
//!
//! Builds the CSS class set, the accent style for custom-colored kinds,
//! and the final `<div>` wrapper with an optional dismiss link.

use crate::types::{NoticeDefinition, DISMISS_ALL_PARAM, DISMISS_PARAM};

/// Escapes a string for use inside an HTML attribute value.
pub fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Strips everything but ASCII alphanumerics, hyphens and underscores
/// from a CSS class token.
pub fn sanitize_html_class(class: &str) -> String {
    class
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// The base class set for a notice, before hooks run: `notice`, the
/// per-kind class for known kinds, and `is-dismissible` when a dismiss
/// control will be rendered.
pub fn compose_class_list(definition: &NoticeDefinition) -> Vec<String> {
    let mut classes = vec!["notice".to_string()];

    if let Some(token) = definition.kind.css_token() {
        classes.push(format!("notice-{}", token));
    }

    if definition.dismissible || definition.dismiss_globally {
        classes.push("is-dismissible".to_string());
    }

    classes
}

/// Inline style carrying the left-border accent for custom hex kinds.
pub fn accent_style(definition: &NoticeDefinition) -> String {
    match definition.kind.accent_color() {
        Some(color) => format!("border-left-color: {} !important;", color),
        None => String::new(),
    }
}

/// Query parameter of the dismiss link, or `None` when the notice cannot
/// be dismissed. Global dismissal wins when both flags are set.
pub fn dismiss_param(definition: &NoticeDefinition) -> Option<&'static str> {
    if definition.dismiss_globally {
        Some(DISMISS_ALL_PARAM)
    } else if definition.dismissible {
        Some(DISMISS_PARAM)
    } else {
        None
    }
}

/// Dismiss link URL: the action parameter naming the notice plus the
/// anti-forgery token.
pub fn dismiss_url(param: &str, name: &str, token: &str) -> String {
    format!("?{}={}&notice_token={}", param, name, token)
}

pub fn dismiss_link(url: &str) -> String {
    format!(
        "<a href=\"{}\" class=\"notice-dismiss\" style=\"text-decoration: none\"></a>",
        escape_attr(url)
    )
}

/// Sanitizes and de-duplicates the class list, then joins it.
pub fn class_attribute(classes: &[String]) -> String {
    let mut seen: Vec<String> = Vec::with_capacity(classes.len());
    for class in classes {
        let clean = sanitize_html_class(class);
        if !clean.is_empty() && !seen.contains(&clean) {
            seen.push(clean);
        }
    }
    seen.join(" ")
}

/// The final notice wrapper. The body is caller-composed markup and is
/// emitted as-is; attribute values are escaped.
pub fn compose_markup(name: &str, classes: &[String], style: &str, body: &str) -> String {
    format!(
        "<div id=\"notice-{}\" class=\"{}\" style=\"{}\">{}</div>",
        escape_attr(name),
        escape_attr(&class_attribute(classes)),
        escape_attr(style),
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NoticeInput, NoticeKind};

    fn definition(kind: &str, dismissible: bool, dismiss_globally: bool) -> NoticeDefinition {
        NoticeInput {
            kind: Some(kind.to_string()),
            dismissible: Some(dismissible),
            dismiss_globally: Some(dismiss_globally),
            ..Default::default()
        }
        .into_definition()
        .unwrap()
    }

    #[test]
    fn class_list_for_known_kind() {
        let classes = compose_class_list(&definition("warning", true, false));
        assert_eq!(classes, vec!["notice", "notice-warning", "is-dismissible"]);
    }

    #[test]
    fn custom_color_uses_accent_style_instead_of_kind_class() {
        let definition = definition("#aabbcc", false, false);
        assert_eq!(definition.kind, NoticeKind::Custom("#aabbcc".to_string()));
        assert_eq!(compose_class_list(&definition), vec!["notice"]);
        assert_eq!(
            accent_style(&definition),
            "border-left-color: #aabbcc !important;"
        );
    }

    #[test]
    fn known_kind_has_no_accent_style() {
        assert!(accent_style(&definition("info", true, false)).is_empty());
    }

    #[test]
    fn global_dismissal_wins_over_per_viewer() {
        assert_eq!(
            dismiss_param(&definition("info", true, true)),
            Some(DISMISS_ALL_PARAM)
        );
        assert_eq!(
            dismiss_param(&definition("info", true, false)),
            Some(DISMISS_PARAM)
        );
        assert_eq!(dismiss_param(&definition("info", false, false)), None);
    }

    #[test]
    fn class_attribute_sanitizes_and_dedupes() {
        let classes = vec![
            "notice".to_string(),
            "notice".to_string(),
            "is dismissible!".to_string(),
            "".to_string(),
        ];
        assert_eq!(class_attribute(&classes), "notice isdismissible");
    }

    #[test]
    fn markup_escapes_attributes_but_not_body() {
        let markup = compose_markup(
            "up\"grade",
            &["notice".to_string()],
            "",
            "<strong>done</strong>",
        );
        assert!(markup.contains("id=\"notice-up&quot;grade\""));
        assert!(markup.contains("<strong>done</strong>"));
    }

    #[test]
    fn dismiss_url_carries_action_and_token() {
        assert_eq!(
            dismiss_url(DISMISS_PARAM, "n1", "tok"),
            "?dismiss=n1&notice_token=tok"
        );
    }
}
