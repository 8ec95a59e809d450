use std::{collections::BTreeSet, path::Path};

/// Extract a display title from file content.
///
/// Looks for the first markdown heading (line starting with `# `).
/// Falls back to the filename without extension.
pub fn extract_title(content: &str, file_path: &Path) -> String {
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("# ") {
            let title = heading.trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }

    // Fallback: filename without extension
    file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}

/// Tokenize text for the search index.
///
/// Lowercases, splits on non-alphanumeric boundaries, and deduplicates.
/// No stemming, no stop-word removal; the index needs only exact token
/// matches.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Flatten every string value inside a JSON document into one searchable
/// text blob, in traversal order. Numbers and booleans are ignored.
pub fn flatten_json_text(value: &serde_json::Value) -> String {
    let mut parts = Vec::new();
    collect_strings(value, &mut parts);
    parts.join(" ")
}

fn collect_strings<'a>(
    value: &'a serde_json::Value,
    parts: &mut Vec<&'a str>,
) {
    match value {
        serde_json::Value::String(s) => parts.push(s),
        serde_json::Value::Array(items) => {
            for item in items {
                collect_strings(item, parts);
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values() {
                collect_strings(item, parts);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_title_from_heading() {
        let content = "# My Document\n\nSome body text.";
        assert_eq!(extract_title(content, Path::new("file.md")), "My Document");
    }

    #[test]
    fn extract_title_skips_empty_heading() {
        let content = "# \n\nSome text with no real heading.";
        assert_eq!(extract_title(content, Path::new("notes.md")), "notes");
    }

    #[test]
    fn extract_title_fallback_to_filename() {
        let content = "No heading here, just plain text.";
        assert_eq!(
            extract_title(content, Path::new("my-notes.md")),
            "my-notes"
        );
    }

    #[test]
    fn tokenize_lowercases_and_splits() {
        let tokens = tokenize("Click the Button!");
        assert!(tokens.contains("click"));
        assert!(tokens.contains("the"));
        assert!(tokens.contains("button"));
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn tokenize_deduplicates() {
        let tokens = tokenize("button button BUTTON");
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn tokenize_drops_empty_tokens() {
        let tokens = tokenize("--- ...  ");
        assert!(tokens.is_empty());
    }

    #[test]
    fn tokenize_splits_on_punctuation() {
        let tokens = tokenize("foo-bar::baz");
        assert!(tokens.contains("foo"));
        assert!(tokens.contains("bar"));
        assert!(tokens.contains("baz"));
    }

    #[test]
    fn flatten_collects_nested_strings() {
        let value = serde_json::json!({
            "description": "a button",
            "params": [{"name": "label"}, {"name": "onClick"}],
            "arity": 2,
        });
        let text = flatten_json_text(&value);
        assert!(text.contains("a button"));
        assert!(text.contains("label"));
        assert!(text.contains("onClick"));
        assert!(!text.contains('2'));
    }

    #[test]
    fn flatten_empty_object() {
        assert_eq!(flatten_json_text(&serde_json::json!({})), "");
    }
}
