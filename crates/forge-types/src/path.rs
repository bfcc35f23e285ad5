//! Normalized paths for the virtual file tree

use serde::{Deserialize, Serialize};

/// Path separator used by the virtual file tree
pub const SEPARATOR: char = '/';

/// A normalized path inside the virtual file tree.
///
/// Stored as `/`-joined segments without a leading or trailing separator;
/// empty and `.` segments are dropped. Displayed with a leading separator,
/// which is how paths are shown to users and to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FilePath(String);

impl FilePath {
    pub fn new(path: impl AsRef<str>) -> Self {
        let normalized = path
            .as_ref()
            .split(SEPARATOR)
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self(normalized)
    }

    /// The normalized form, without a leading separator
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty path (the tree root)
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Last segment of the path
    pub fn name(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or("")
    }

    pub fn parent(&self) -> Option<FilePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(idx) => Some(FilePath(self.0[..idx].to_string())),
            None => Some(FilePath::default()),
        }
    }

    /// Every proper ancestor from the top-most folder down, excluding the root.
    pub fn ancestors(&self) -> Vec<FilePath> {
        let mut ancestors = Vec::new();
        let mut current = String::new();
        let segments: Vec<&str> = self.segments().collect();
        for segment in segments.iter().take(segments.len().saturating_sub(1)) {
            if !current.is_empty() {
                current.push(SEPARATOR);
            }
            current.push_str(segment);
            ancestors.push(FilePath(current.clone()));
        }
        ancestors
    }

    /// Segment-wise prefix test: `src` contains `src/a.txt` but not `src2/a.txt`.
    pub fn starts_with(&self, prefix: &FilePath) -> bool {
        if prefix.is_root() {
            return true;
        }
        match self.0.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
            None => false,
        }
    }

    pub fn join(&self, child: impl AsRef<str>) -> FilePath {
        FilePath::new(format!("{}{}{}", self.0, SEPARATOR, child.as_ref()))
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", SEPARATOR, self.0)
    }
}

impl From<String> for FilePath {
    fn from(value: String) -> Self {
        FilePath::new(value)
    }
}

impl From<&str> for FilePath {
    fn from(value: &str) -> Self {
        FilePath::new(value)
    }
}

impl From<&String> for FilePath {
    fn from(value: &String) -> Self {
        FilePath::new(value)
    }
}

impl From<&FilePath> for FilePath {
    fn from(value: &FilePath) -> Self {
        value.clone()
    }
}

impl From<FilePath> for String {
    fn from(value: FilePath) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(FilePath::new("/src//a.txt").as_str(), "src/a.txt");
        assert_eq!(FilePath::new("./src/./a.txt/").as_str(), "src/a.txt");
        assert_eq!(FilePath::new("/src/a.txt").to_string(), "/src/a.txt");
        assert!(FilePath::new("/").is_root());
    }

    #[test]
    fn test_ancestors_and_parent() {
        let path = FilePath::new("home/project/src/main.rs");
        let ancestors: Vec<String> = path
            .ancestors()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();
        assert_eq!(ancestors, vec!["home", "home/project", "home/project/src"]);
        assert_eq!(path.parent(), Some(FilePath::new("home/project/src")));
        assert_eq!(path.name(), "main.rs");
        assert_eq!(FilePath::new("a").parent(), Some(FilePath::default()));
    }

    #[test]
    fn test_starts_with_is_segment_aware() {
        let folder = FilePath::new("/src");
        assert!(FilePath::new("/src/a.txt").starts_with(&folder));
        assert!(FilePath::new("/src/sub/b.txt").starts_with(&folder));
        assert!(FilePath::new("/src").starts_with(&folder));
        assert!(!FilePath::new("/src2/a.txt").starts_with(&folder));
        assert!(!FilePath::new("/other/c.txt").starts_with(&folder));
    }

    #[test]
    fn test_serde_uses_display_form() {
        let path = FilePath::new("src/a.txt");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/src/a.txt\"");
        let back: FilePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
