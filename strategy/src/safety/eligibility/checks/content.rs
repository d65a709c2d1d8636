use std::collections::HashSet;

use drphil_core::PostMetadata;

/// Tag gate: no skipped tag present, and when an allow-list exists at least
/// one of its tags present.
pub fn tags_allowed(
    metadata: &PostMetadata,
    skip_tags: &HashSet<String>,
    only_tags: &HashSet<String>,
) -> bool {
    if metadata.tags.iter().any(|tag| skip_tags.contains(tag)) {
        return false;
    }
    only_tags.is_empty() || metadata.tags.iter().any(|tag| only_tags.contains(tag))
}

/// App gate, matched on the app name without its version suffix. Posts with
/// no app only pass an empty allow-list.
pub fn app_allowed(
    metadata: &PostMetadata,
    skip_apps: &HashSet<String>,
    only_apps: &HashSet<String>,
) -> bool {
    match metadata.app.as_deref() {
        Some(app) if skip_apps.contains(app) => false,
        Some(app) => only_apps.is_empty() || only_apps.contains(app),
        None => only_apps.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tags() {
        let meta = PostMetadata::parse(r#"{"tags":["life","nsfw"]}"#);
        assert!(!tags_allowed(&meta, &set(&["nsfw"]), &set(&[])));
        assert!(tags_allowed(&meta, &set(&[]), &set(&["life"])));
        assert!(!tags_allowed(&meta, &set(&[]), &set(&["photography"])));
        assert!(tags_allowed(&meta, &set(&[]), &set(&[])));
    }

    #[test]
    fn test_apps() {
        let meta = PostMetadata::parse(r#"{"app":"busy/2.3.0"}"#);
        assert!(!app_allowed(&meta, &set(&["busy"]), &set(&[])));
        assert!(app_allowed(&meta, &set(&[]), &set(&["busy"])));
        assert!(!app_allowed(&meta, &set(&[]), &set(&["steemit"])));

        let none = PostMetadata::parse("");
        assert!(app_allowed(&none, &set(&["busy"]), &set(&[])));
        assert!(!app_allowed(&none, &set(&[]), &set(&["busy"])));
    }
}
