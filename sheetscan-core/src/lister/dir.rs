use std::io;
use std::path::{Component, Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use tracing::warn;

use super::{FolderLister, ListError};
use crate::item::{ItemKind, NodeId, TreeItem};

/// Lister over a local directory tree
///
/// Useful for sync-client mounts of a remote store. Ids are `/`-joined
/// paths relative to the root, whose own id is [`DirLister::ROOT_ID`].
/// Symbolic links are reported as [`ItemKind::Other`] and never followed.
#[derive(Debug, Clone)]
pub struct DirLister {
    root: PathBuf,
}

impl DirLister {
    pub const ROOT_ID: &'static str = ".";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_id(&self) -> NodeId {
        NodeId::from(Self::ROOT_ID)
    }

    /// Map an id back to a directory under the root
    fn resolve(&self, folder: &NodeId) -> Result<PathBuf, ListError> {
        if folder.as_str() == Self::ROOT_ID {
            return Ok(self.root.clone());
        }

        let relative = Path::new(folder.as_str());
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(ListError::Malformed(format!(
                "{} is not a path below the root",
                folder
            )));
        }

        Ok(self.root.join(relative))
    }

    fn child_id(folder: &NodeId, name: &str) -> NodeId {
        if folder.as_str() == Self::ROOT_ID {
            NodeId::from(name)
        } else {
            NodeId::from(format!("{}/{}", folder, name))
        }
    }
}

impl FolderLister for DirLister {
    fn list(&self, folder: &NodeId) -> Result<Vec<TreeItem>, ListError> {
        let dir = self.resolve(folder)?;

        match std::fs::symlink_metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(ListError::Malformed(format!("{} is not a directory", folder)));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ListError::NotFound(folder.clone()));
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(ListError::AccessDenied(folder.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        let walker = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .parallelism(Parallelism::Serial);

        let mut items = Vec::new();
        for entry_result in walker {
            let entry = entry_result.map_err(|e| ListError::Io(io::Error::other(e.to_string())))?;

            let path = entry.path();
            let Some(raw_name) = path.file_name() else {
                continue;
            };

            // Ids must map back to the path on disk, which a lossy name cannot
            let Some(name) = raw_name.to_str() else {
                let name = raw_name.to_string_lossy().into_owned();
                warn!(
                    folder = %folder,
                    name = %name,
                    "Ignoring entry whose name is not valid UTF-8"
                );
                items.push(TreeItem {
                    id: Self::child_id(folder, &name),
                    name,
                    kind: ItemKind::Other,
                    size: None,
                });
                continue;
            };
            let name = name.to_string();

            let file_type = entry.file_type();
            let (kind, size) = if file_type.is_dir() {
                (ItemKind::Folder, None)
            } else if file_type.is_file() {
                (ItemKind::File, entry.metadata().ok().map(|m| m.len()))
            } else {
                (ItemKind::Other, None)
            };

            items.push(TreeItem {
                id: Self::child_id(folder, &name),
                name,
                kind,
                size,
            });
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_root_sorted_with_relative_ids() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.xlsx"), "hello").unwrap();
        fs::create_dir(temp.path().join("a_dir")).unwrap();
        fs::write(temp.path().join("a_dir/inner.xls"), "x").unwrap();

        let lister = DirLister::new(temp.path());
        let items = lister.list(&lister.root_id()).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], TreeItem::folder("a_dir", "a_dir"));
        assert_eq!(items[1], TreeItem::file("b.xlsx", "b.xlsx", Some(5)));

        let inner = lister.list(&items[0].id).unwrap();
        assert_eq!(inner, vec![TreeItem::file("a_dir/inner.xls", "inner.xls", Some(1))]);
    }

    #[test]
    fn test_empty_directory() {
        let temp = TempDir::new().unwrap();
        let lister = DirLister::new(temp.path());
        assert!(lister.list(&lister.root_id()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_folder_is_not_found() {
        let temp = TempDir::new().unwrap();
        let lister = DirLister::new(temp.path());
        assert!(matches!(
            lister.list(&NodeId::from("gone")),
            Err(ListError::NotFound(_))
        ));
    }

    #[test]
    fn test_rejects_ids_escaping_root() {
        let temp = TempDir::new().unwrap();
        let lister = DirLister::new(temp.path());
        assert!(matches!(
            lister.list(&NodeId::from("../etc")),
            Err(ListError::Malformed(_))
        ));
        assert!(matches!(
            lister.list(&NodeId::from("/etc")),
            Err(ListError::Malformed(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_is_reported_as_other() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let bad = OsStr::from_bytes(b"report\xff.xls");
        fs::create_dir(temp.path().join(bad)).unwrap();
        fs::write(temp.path().join(bad).join("inner.xls"), "x").unwrap();
        fs::write(temp.path().join("ok.xls"), "x").unwrap();

        let lister = DirLister::new(temp.path());
        let items = lister.list(&lister.root_id()).unwrap();

        assert_eq!(items.len(), 2);
        let odd = items.iter().find(|i| i.name != "ok.xls").unwrap();
        assert_eq!(odd.kind, ItemKind::Other);
        assert_eq!(odd.size, None);
        assert!(items.iter().any(|i| *i == TreeItem::file("ok.xls", "ok.xls", Some(1))));
    }

    #[test]
    fn test_listing_a_file_is_malformed() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("f.txt"), "").unwrap();
        let lister = DirLister::new(temp.path());
        assert!(matches!(
            lister.list(&NodeId::from("f.txt")),
            Err(ListError::Malformed(_))
        ));
    }
}
