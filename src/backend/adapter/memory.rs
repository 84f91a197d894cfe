//! In-process [`Adapter`] backed by a sorted map.

use std::collections::BTreeMap;
use std::time::SystemTime;

use parking_lot::RwLock;

use super::{Adapter, AdapterEntry, AdapterError, Visibility};

#[derive(Debug, Clone)]
enum Node {
    File {
        data: Vec<u8>,
        modified: SystemTime,
        visibility: Visibility,
    },
    Dir {
        modified: SystemTime,
        visibility: Visibility,
    },
}

impl Node {
    fn row(&self, path: &str) -> AdapterEntry {
        match self {
            Node::File {
                data,
                modified,
                visibility,
            } => AdapterEntry {
                path: path.to_owned(),
                is_dir: false,
                size: data.len() as u64,
                last_modified: Some(*modified),
                visibility: Some(*visibility),
            },
            Node::Dir {
                modified,
                visibility,
            } => AdapterEntry {
                path: path.to_owned(),
                is_dir: true,
                size: 0,
                last_modified: Some(*modified),
                visibility: Some(*visibility),
            },
        }
    }
}

/// Adapter keeping every entry in memory.
///
/// Keys are adapter paths; the root (`""`) is implicit. Directories are
/// created implicitly for written files, as object-store adapters do.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl MemoryAdapter {
    /// Empty adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the modification time of an entry.
    pub fn set_last_modified(&self, path: &str, time: SystemTime) -> Result<(), AdapterError> {
        match self.nodes.write().get_mut(path) {
            Some(Node::File { modified, .. } | Node::Dir { modified, .. }) => {
                *modified = time;
                Ok(())
            }
            None => Err(AdapterError::NotFound {
                path: path.to_owned(),
            }),
        }
    }

    /// Create every missing ancestor of `path`.
    fn ensure_parents(
        nodes: &mut BTreeMap<String, Node>,
        path: &str,
        visibility: Visibility,
    ) -> Result<(), AdapterError> {
        let mut end = 0;
        while let Some(idx) = path[end..].find('/') {
            let dir = &path[..end + idx];
            match nodes.get(dir) {
                Some(Node::File { .. }) => {
                    return Err(AdapterError::Other(
                        format!("{dir} is a file").into(),
                    ));
                }
                Some(Node::Dir { .. }) => {}
                None => {
                    nodes.insert(
                        dir.to_owned(),
                        Node::Dir {
                            modified: SystemTime::now(),
                            visibility,
                        },
                    );
                }
            }
            end += idx + 1;
        }
        Ok(())
    }

    fn attribute<T>(
        &self,
        path: &str,
        attribute: &'static str,
        get: impl FnOnce(&Node) -> Option<T>,
    ) -> Result<T, AdapterError> {
        self.nodes
            .read()
            .get(path)
            .and_then(get)
            .ok_or_else(|| AdapterError::MetadataUnavailable {
                path: path.to_owned(),
                attribute,
            })
    }
}

fn is_below(key: &str, dir: &str) -> bool {
    dir.is_empty() || key.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

impl Adapter for MemoryAdapter {
    fn file_exists(&self, path: &str) -> Result<bool, AdapterError> {
        Ok(matches!(self.nodes.read().get(path), Some(Node::File { .. })))
    }

    fn directory_exists(&self, path: &str) -> Result<bool, AdapterError> {
        Ok(path.is_empty() || matches!(self.nodes.read().get(path), Some(Node::Dir { .. })))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, AdapterError> {
        match self.nodes.read().get(path) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            _ => Err(AdapterError::NotFound {
                path: path.to_owned(),
            }),
        }
    }

    fn write(&self, path: &str, contents: &[u8], visibility: Visibility) -> Result<(), AdapterError> {
        let mut nodes = self.nodes.write();
        if matches!(nodes.get(path), Some(Node::Dir { .. })) {
            return Err(AdapterError::Other(format!("{path} is a directory").into()));
        }
        Self::ensure_parents(&mut nodes, path, Visibility::Public)?;
        nodes.insert(
            path.to_owned(),
            Node::File {
                data: contents.to_vec(),
                modified: SystemTime::now(),
                visibility,
            },
        );
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), AdapterError> {
        let mut nodes = self.nodes.write();
        match nodes.get(path) {
            Some(Node::File { .. }) => {
                nodes.remove(path);
                Ok(())
            }
            _ => Err(AdapterError::NotFound {
                path: path.to_owned(),
            }),
        }
    }

    fn delete_directory(&self, path: &str) -> Result<(), AdapterError> {
        let mut nodes = self.nodes.write();
        nodes.retain(|key, _| key != path && !is_below(key, path));
        Ok(())
    }

    fn create_directory(&self, path: &str, visibility: Visibility) -> Result<(), AdapterError> {
        if path.is_empty() {
            return Ok(());
        }
        let mut nodes = self.nodes.write();
        Self::ensure_parents(&mut nodes, path, visibility)?;
        match nodes.get(path) {
            Some(Node::Dir { .. }) => Ok(()),
            Some(Node::File { .. }) => Err(AdapterError::Other(format!("{path} is a file").into())),
            None => {
                nodes.insert(
                    path.to_owned(),
                    Node::Dir {
                        modified: SystemTime::now(),
                        visibility,
                    },
                );
                Ok(())
            }
        }
    }

    fn set_visibility(&self, path: &str, new: Visibility) -> Result<(), AdapterError> {
        match self.nodes.write().get_mut(path) {
            Some(Node::File { visibility, .. } | Node::Dir { visibility, .. }) => {
                *visibility = new;
                Ok(())
            }
            None => Err(AdapterError::NotFound {
                path: path.to_owned(),
            }),
        }
    }

    fn visibility(&self, path: &str) -> Result<Visibility, AdapterError> {
        self.attribute(path, "visibility", |node| match node {
            Node::File { visibility, .. } | Node::Dir { visibility, .. } => Some(*visibility),
        })
    }

    fn mime_type(&self, path: &str) -> Result<String, AdapterError> {
        self.attribute(path, "mime_type", |node| match node {
            Node::File { .. } => Some(
                mime_guess::from_path(path)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_owned(),
            ),
            Node::Dir { .. } => None,
        })
    }

    fn last_modified(&self, path: &str) -> Result<SystemTime, AdapterError> {
        self.attribute(path, "last_modified", |node| match node {
            Node::File { modified, .. } | Node::Dir { modified, .. } => Some(*modified),
        })
    }

    fn file_size(&self, path: &str) -> Result<u64, AdapterError> {
        self.attribute(path, "file_size", |node| match node {
            Node::File { data, .. } => Some(data.len() as u64),
            Node::Dir { .. } => None,
        })
    }

    fn list_contents(&self, path: &str, deep: bool) -> Result<Vec<AdapterEntry>, AdapterError> {
        let nodes = self.nodes.read();
        let offset = if path.is_empty() { 0 } else { path.len() + 1 };
        Ok(nodes
            .iter()
            .filter(|(key, _)| is_below(key, path))
            .filter(|(key, _)| deep || !key[offset..].contains('/'))
            .map(|(key, node)| node.row(key))
            .collect())
    }

    fn move_file(&self, from: &str, to: &str) -> Result<(), AdapterError> {
        let mut nodes = self.nodes.write();
        let node = match nodes.get(from) {
            Some(node @ Node::File { .. }) => node.clone(),
            _ => {
                return Err(AdapterError::NotFound {
                    path: from.to_owned(),
                });
            }
        };
        Self::ensure_parents(&mut nodes, to, Visibility::Public)?;
        nodes.remove(from);
        nodes.insert(to.to_owned(), node);
        Ok(())
    }

    fn copy_file(&self, from: &str, to: &str) -> Result<(), AdapterError> {
        let mut nodes = self.nodes.write();
        let (data, visibility) = match nodes.get(from) {
            Some(Node::File {
                data, visibility, ..
            }) => (data.clone(), *visibility),
            _ => {
                return Err(AdapterError::NotFound {
                    path: from.to_owned(),
                });
            }
        };
        Self::ensure_parents(&mut nodes, to, Visibility::Public)?;
        nodes.insert(
            to.to_owned(),
            Node::File {
                data,
                modified: SystemTime::now(),
                visibility,
            },
        );
        Ok(())
    }
}
