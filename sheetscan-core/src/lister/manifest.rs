use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use super::{FolderLister, ListError};
use crate::item::{ItemKind, NodeId, TreeItem};
use crate::{Result, ScanError};

/// One entry of an exported tree
///
/// ```json
/// {"id": 0, "name": "root", "type": "folder", "children": [
///     {"id": 10, "name": "x.xls", "type": "file", "size": 2048}
/// ]}
/// ```
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: NodeId,
    name: String,
    #[serde(rename = "type")]
    kind: ItemKind,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    children: Vec<ManifestEntry>,
}

#[derive(Debug)]
struct ManifestNode {
    item: TreeItem,
    children: Vec<usize>,
}

/// Lister over an exported folder tree held in memory
///
/// Nodes live in an arena; the root is always index 0.
#[derive(Debug)]
pub struct ManifestLister {
    nodes: Vec<ManifestNode>,
    index: HashMap<NodeId, usize>,
}

impl ManifestLister {
    /// Create a manifest holding only a root folder
    pub fn new(root_id: impl Into<NodeId>, root_name: impl Into<String>) -> Self {
        let root = TreeItem::folder(root_id, root_name);
        let mut index = HashMap::new();
        index.insert(root.id.clone(), 0);

        Self {
            nodes: vec![ManifestNode {
                item: root,
                children: Vec::new(),
            }],
            index,
        }
    }

    /// Load a manifest from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let root: ManifestEntry =
            serde_json::from_reader(reader).map_err(|e| ScanError::Manifest(e.to_string()))?;
        Self::from_entry(root)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let root: ManifestEntry =
            serde_json::from_str(json).map_err(|e| ScanError::Manifest(e.to_string()))?;
        Self::from_entry(root)
    }

    fn from_entry(root: ManifestEntry) -> Result<Self> {
        if root.kind != ItemKind::Folder {
            return Err(ScanError::Manifest(format!(
                "root {} is a {}, expected a folder",
                root.id,
                root.kind.label()
            )));
        }

        let mut manifest = Self::new(root.id, root.name);

        // Flatten with an explicit stack; siblings keep document order
        let mut pending: Vec<(NodeId, Vec<ManifestEntry>)> =
            vec![(manifest.root_id().clone(), root.children)];
        while let Some((parent, children)) = pending.pop() {
            for entry in children {
                let item = TreeItem {
                    id: entry.id,
                    name: entry.name,
                    kind: entry.kind,
                    size: entry.size,
                };
                let id = item.id.clone();
                manifest.add_item(&parent, item)?;
                if !entry.children.is_empty() {
                    pending.push((id, entry.children));
                }
            }
        }

        Ok(manifest)
    }

    /// Add a child under an existing folder
    pub fn add_item(&mut self, parent: &NodeId, item: TreeItem) -> Result<()> {
        let parent_idx = *self
            .index
            .get(parent)
            .ok_or_else(|| ScanError::Manifest(format!("unknown parent {}", parent)))?;

        if !self.nodes[parent_idx].item.kind.is_folder() {
            return Err(ScanError::Manifest(format!(
                "cannot add {} under non-folder {}",
                item.id, parent
            )));
        }
        if self.index.contains_key(&item.id) {
            return Err(ScanError::Manifest(format!("duplicate id {}", item.id)));
        }

        let idx = self.nodes.len();
        self.index.insert(item.id.clone(), idx);
        self.nodes.push(ManifestNode {
            item,
            children: Vec::new(),
        });
        self.nodes[parent_idx].children.push(idx);

        Ok(())
    }

    pub fn root_id(&self) -> &NodeId {
        &self.nodes[0].item.id
    }

    pub fn root_name(&self) -> &str {
        &self.nodes[0].item.name
    }

    /// Total number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the manifest has nothing but its root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

impl FolderLister for ManifestLister {
    fn list(&self, folder: &NodeId) -> std::result::Result<Vec<TreeItem>, ListError> {
        let idx = *self
            .index
            .get(folder)
            .ok_or_else(|| ListError::NotFound(folder.clone()))?;
        let node = &self.nodes[idx];

        if !node.item.kind.is_folder() {
            return Err(ListError::Malformed(format!(
                "{} is a {}, not a folder",
                folder,
                node.item.kind.label()
            )));
        }

        Ok(node
            .children
            .iter()
            .map(|&child| self.nodes[child].item.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": 0, "name": "root", "type": "folder", "children": [
            {"id": 1, "name": "FolderA", "type": "folder", "children": [
                {"id": 10, "name": "x.xls", "type": "file", "size": 2048}
            ]},
            {"id": 11, "name": "y.txt", "type": "file"},
            {"id": "w1", "name": "Link", "type": "web_link"}
        ]
    }"#;

    #[test]
    fn test_parse_and_list_in_document_order() {
        let manifest = ManifestLister::from_json_str(SAMPLE).unwrap();
        assert_eq!(manifest.len(), 5);
        assert_eq!(manifest.root_id(), &NodeId::from("0"));
        assert_eq!(manifest.root_name(), "root");

        let root_items = manifest.list(&NodeId::from("0")).unwrap();
        let names: Vec<&str> = root_items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["FolderA", "y.txt", "Link"]);
        assert_eq!(root_items[2].kind, ItemKind::Other);

        let folder_a = manifest.list(&NodeId::from("1")).unwrap();
        assert_eq!(folder_a, vec![TreeItem::file("10", "x.xls", Some(2048))]);
    }

    #[test]
    fn test_unknown_folder_is_not_found() {
        let manifest = ManifestLister::from_json_str(SAMPLE).unwrap();
        assert!(matches!(
            manifest.list(&NodeId::from("404")),
            Err(ListError::NotFound(_))
        ));
    }

    #[test]
    fn test_listing_a_file_is_malformed() {
        let manifest = ManifestLister::from_json_str(SAMPLE).unwrap();
        assert!(matches!(
            manifest.list(&NodeId::from("10")),
            Err(ListError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let json = r#"{"id": 0, "name": "r", "type": "folder", "children": [
            {"id": 1, "name": "a", "type": "file"},
            {"id": 1, "name": "b", "type": "file"}
        ]}"#;
        assert!(matches!(
            ManifestLister::from_json_str(json),
            Err(ScanError::Manifest(_))
        ));
    }

    #[test]
    fn test_rejects_file_root_and_bad_json() {
        assert!(ManifestLister::from_json_str(r#"{"id": 0, "name": "r", "type": "file"}"#).is_err());
        assert!(ManifestLister::from_json_str("not json").is_err());
    }

    #[test]
    fn test_build_programmatically() {
        let mut manifest = ManifestLister::new("root", "Root");
        assert!(manifest.is_empty());
        manifest
            .add_item(&NodeId::from("root"), TreeItem::folder("d", "docs"))
            .unwrap();
        manifest
            .add_item(&NodeId::from("d"), TreeItem::file("f", "plan.xlsx", None))
            .unwrap();
        assert!(manifest
            .add_item(&NodeId::from("f"), TreeItem::file("g", "nested", None))
            .is_err());

        assert_eq!(manifest.list(&NodeId::from("d")).unwrap().len(), 1);
    }
}
