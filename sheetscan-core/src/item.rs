use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque identifier of a folder or file in the remote store
///
/// Stores report ids in different native forms (numbers, strings, paths).
/// They are normalized to a string so they can be compared and persisted
/// uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Ids written by other tools may be bare JSON numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => NodeId(s),
            RawId::Number(n) => NodeId::from(n),
        })
    }
}

/// Type of a child reported by a lister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    File,
    /// Anything else the store knows about (web links, shortcuts, ...)
    #[serde(other)]
    Other,
}

impl ItemKind {
    pub fn is_folder(&self) -> bool {
        matches!(self, ItemKind::Folder)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Folder => "folder",
            ItemKind::File => "file",
            ItemKind::Other => "other",
        }
    }
}

/// One direct child of a folder, as reported by a lister
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub id: NodeId,
    pub name: String,
    pub kind: ItemKind,
    /// Size in bytes, when the store reports one
    pub size: Option<u64>,
}

impl TreeItem {
    pub fn folder(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ItemKind::Folder,
            size: None,
        }
    }

    pub fn file(id: impl Into<NodeId>, name: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ItemKind::File,
            size,
        }
    }
}

/// A file whose name matched the target extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    /// Names from the crawl root (exclusive) down to the file (inclusive)
    pub path: Vec<String>,
    pub id: NodeId,
    pub name: String,
    pub size: Option<u64>,
}

impl FileMatch {
    /// Path as recorded in the result file
    pub fn display_path(&self) -> String {
        self.path.join("/")
    }
}
