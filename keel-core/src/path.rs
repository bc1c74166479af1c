use crate::{Error, Result};
use std::{
    fmt::{self, Display},
    str::FromStr,
};

/// Dotted sequence of property names rooted at the query's root entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath {
    path: String,
}

impl PropertyPath {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.is_empty() || path.split('.').any(|v| v.trim().is_empty()) {
            return Err(Error::msg(format!(
                "`{path}` is not a valid property path, it must be a non empty dot separated list of property names"
            )));
        }
        Ok(Self { path })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> + Clone {
        self.path.split('.')
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    pub fn last(&self) -> &str {
        self.path
            .rsplit_once('.')
            .map(|(_, last)| last)
            .unwrap_or(&self.path)
    }

    pub fn parent(&self) -> Option<PropertyPath> {
        self.path.rsplit_once('.').map(|(parent, _)| PropertyPath {
            path: parent.to_string(),
        })
    }

    pub fn child(&self, name: &str) -> PropertyPath {
        PropertyPath {
            path: format!("{}.{}", self.path, name),
        }
    }

    /// Every prefix of the path, shortest first, ending with the path itself.
    pub fn ancestors(&self) -> impl Iterator<Item = PropertyPath> + '_ {
        self.path
            .match_indices('.')
            .map(|(i, _)| i)
            .chain(std::iter::once(self.path.len()))
            .map(|end| PropertyPath {
                path: self.path[..end].to_string(),
            })
    }

    pub fn starts_with(&self, other: &PropertyPath) -> bool {
        self.path == other.path
            || self.path.starts_with(&other.path)
                && self.path[other.path.len()..].starts_with('.')
    }
}

/// Extends an optional parent path (`None` is the root).
pub fn child_path(parent: Option<&PropertyPath>, name: &str) -> PropertyPath {
    match parent {
        Some(parent) => parent.child(name),
        None => PropertyPath {
            path: name.to_string(),
        },
    }
}

impl Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl FromStr for PropertyPath {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        PropertyPath::new(s)
    }
}

impl TryFrom<&str> for PropertyPath {
    type Error = Error;
    fn try_from(value: &str) -> Result<Self> {
        PropertyPath::new(value)
    }
}

impl AsRef<str> for PropertyPath {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::PropertyPath;

    #[test]
    fn ancestors() {
        let path = PropertyPath::new("a.b.c").unwrap();
        assert_eq!(
            path.ancestors().map(|v| v.to_string()).collect::<Vec<_>>(),
            ["a", "a.b", "a.b.c"]
        );
        assert_eq!(path.depth(), 3);
        assert_eq!(path.last(), "c");
        assert_eq!(path.parent().unwrap().as_str(), "a.b");
        assert!(path.starts_with(&PropertyPath::new("a.b").unwrap()));
        assert!(!path.starts_with(&PropertyPath::new("a.bc").unwrap()));
    }

    #[test]
    fn invalid() {
        assert!(PropertyPath::new("").is_err());
        assert!(PropertyPath::new("a..b").is_err());
        assert!(PropertyPath::new(".a").is_err());
    }
}
