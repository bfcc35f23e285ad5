//! Rendering of user file modifications for the next model turn

use forge_types::{FileModification, FilePath};
use similar::TextDiff;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Element wrapping the modifications block
pub const MODIFICATIONS_TAG_NAME: &str = "bolt_file_modifications";

/// Unified diff hunks between two texts, without the file-name header
pub fn unified_diff(original: &str, current: &str) -> String {
    TextDiff::from_lines(original, current)
        .unified_diff()
        .context_radius(3)
        .to_string()
}

/// Render modifications as a `<bolt_file_modifications>` block.
///
/// Each file gets a `<diff>` element, or a `<file>` element with the full
/// content when the diff would be larger than the content itself. Returns
/// `None` when nothing changed.
pub fn render_modifications(modifications: &BTreeMap<FilePath, FileModification>) -> Option<String> {
    if modifications.is_empty() {
        return None;
    }

    let mut out = String::new();
    let _ = writeln!(out, "<{}>", MODIFICATIONS_TAG_NAME);
    for (path, modification) in modifications {
        let diff = unified_diff(&modification.original, &modification.current);
        let (element, body) = if diff.len() > modification.current.len() {
            ("file", modification.current.as_str())
        } else {
            ("diff", diff.as_str())
        };

        let _ = writeln!(out, "<{} path=\"{}\">", element, path);
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
        let _ = writeln!(out, "</{}>", element);
    }
    let _ = write!(out, "</{}>", MODIFICATIONS_TAG_NAME);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modification(original: &str, current: &str) -> FileModification {
        FileModification {
            original: original.to_string(),
            current: current.to_string(),
        }
    }

    #[test]
    fn test_unified_diff_has_no_header() {
        let diff = unified_diff("a\nb\nc\n", "a\nB\nc\n");
        assert!(diff.starts_with("@@ -1,3 +1,3 @@"));
        assert!(diff.contains("-b\n"));
        assert!(diff.contains("+B\n"));
        assert!(!diff.contains("---"));
    }

    #[test]
    fn test_small_edit_renders_diff() {
        let original: String = (1..=40).map(|n| format!("line {}\n", n)).collect();
        let current = original.replace("line 20\n", "line twenty\n");

        let mut mods = BTreeMap::new();
        mods.insert(FilePath::new("home/project/src/main.js"), modification(&original, &current));

        let rendered = render_modifications(&mods).unwrap();
        assert!(rendered.starts_with("<bolt_file_modifications>\n<diff path=\"/home/project/src/main.js\">\n@@"));
        assert!(rendered.contains("+line twenty\n"));
        assert!(rendered.ends_with("</diff>\n</bolt_file_modifications>"));
    }

    #[test]
    fn test_rewrite_renders_full_file() {
        let mut mods = BTreeMap::new();
        mods.insert(FilePath::new("package.json"), modification("{}", "{\"a\":1}"));

        let rendered = render_modifications(&mods).unwrap();
        assert!(rendered.contains("<file path=\"/package.json\">\n{\"a\":1}\n</file>"));
    }

    #[test]
    fn test_nothing_to_render() {
        assert!(render_modifications(&BTreeMap::new()).is_none());
    }
}
