//! Small helpers shared across modules.

/// Generate a new execution id.
pub fn longid() -> String {
    nanoid::nanoid!(21)
}

/// Turn a node label into a context key: lowercase, runs of non-alphanumeric
/// characters collapsed into a single `_`, no leading or trailing `_`.
///
/// `"Write Story!"` becomes `"write_story"`.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_sep = false;

    for ch in label.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }

    slug
}

/// Truncate `text` to at most `max` characters, appending an ellipsis when cut.
pub fn truncate(
    text: &str,
    max: usize,
) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Write Story!"), "write_story");
        assert_eq!(slugify("  LLM -- Node 2 "), "llm_node_2");
        assert_eq!(slugify("trigger"), "trigger");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_longid_unique() {
        assert_ne!(longid(), longid());
        assert_eq!(longid().len(), 21);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hello...");
    }
}
