//! Route templates with `{name}` placeholders.

use std::collections::HashMap;

/// Placeholder used by every video-scoped route.
pub const VIDEO_ID_PARAM: &str = "video_id";

/// Substitute `{name}` placeholders in `template`.
///
/// Placeholders without a mapping are left untouched.
pub fn format_route(template: &str, mapping: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match mapping.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Substitute the `{video_id}` placeholder.
pub fn format_video_route(template: &str, video_id: &str) -> String {
    let mut mapping = HashMap::new();
    mapping.insert(VIDEO_ID_PARAM, video_id.to_string());
    format_route(template, &mapping)
}

/// Check that a template carries a given placeholder.
pub fn has_placeholder(template: &str, name: &str) -> bool {
    template.contains(&format!("{{{}}}", name))
}
