//! Qualified and client-facing names
//!
//! Qualified names use `::` (`app::admin::Users`). Client-facing names
//! join the same segments with the scope separator and capitalize the
//! namespace segments (`App.Admin.Users`).

use crate::scanner::is_identifier;

/// Path separator of qualified names
pub const PATH_SEPARATOR: &str = "::";

/// Normalize a qualified name or namespace
///
/// Accepts `::` or `.` between segments and ignores surrounding
/// separators. Returns `None` when a segment is not an identifier.
pub fn normalize(name: &str) -> Option<String> {
    let trimmed = name.trim().trim_matches(':').trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    let segments: Vec<&str> = if trimmed.contains(PATH_SEPARATOR) {
        trimmed.split(PATH_SEPARATOR).collect()
    } else {
        trimmed.split('.').collect()
    };

    segments
        .iter()
        .all(|s| is_identifier(s))
        .then(|| segments.join(PATH_SEPARATOR))
}

/// Client-facing name for a qualified name
pub fn external_name(qualified: &str, separator: char) -> String {
    let segments: Vec<&str> = qualified.split(PATH_SEPARATOR).collect();
    let last = segments.len().saturating_sub(1);

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if i < last {
                capitalize(segment)
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

/// Client-facing prefix of a namespace
pub fn external_namespace(namespace: &str, separator: char) -> String {
    namespace
        .split(PATH_SEPARATOR)
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

/// Qualified name for a client-facing name below a namespace
pub fn qualify_external(namespace: &str, separator: char, name: &str) -> Option<String> {
    let prefix = external_namespace(namespace, separator);
    let rest = name.strip_prefix(&prefix)?.strip_prefix(separator)?;

    let segments: Vec<&str> = rest.split(separator).collect();
    let last = segments.len().saturating_sub(1);

    let mut qualified = vec![namespace.to_string()];
    for (i, segment) in segments.iter().enumerate() {
        if !is_identifier(segment) {
            return None;
        }
        qualified.push(if i < last {
            decapitalize(segment)
        } else {
            segment.to_string()
        });
    }

    Some(qualified.join(PATH_SEPARATOR))
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decapitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("app::admin::Users").as_deref(), Some("app::admin::Users"));
        assert_eq!(normalize("app.admin").as_deref(), Some("app::admin"));
        assert_eq!(normalize("::app::").as_deref(), Some("app"));
        assert_eq!(normalize("Sample").as_deref(), Some("Sample"));
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("app::my-mod"), None);
        assert_eq!(normalize("app::::x"), None);
    }

    #[test]
    fn test_external_name() {
        assert_eq!(external_name("app::admin::Users", '.'), "App.Admin.Users");
        assert_eq!(external_name("app::admin::Users", '_'), "App_Admin_Users");
        assert_eq!(external_name("Sample", '.'), "Sample");
        assert_eq!(external_namespace("app::admin", '.'), "App.Admin");
    }

    #[test]
    fn test_qualify_external() {
        assert_eq!(
            qualify_external("app", '.', "App.Admin.Users").as_deref(),
            Some("app::admin::Users")
        );
        assert_eq!(qualify_external("app", '.', "App.Users").as_deref(), Some("app::Users"));
        assert_eq!(qualify_external("app", '.', "Other.Users"), None);
        assert_eq!(qualify_external("app", '.', "App"), None);
        assert_eq!(qualify_external("app", '.', "App.bad-name"), None);
    }
}
