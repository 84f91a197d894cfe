//! Worklist traversal of directory trees.
//!
//! Recursive delete, copy and listing use an explicit stack instead of call
//! recursion, so pathological trees cannot exhaust the thread stack.

use crate::{Entry, StoreError, StorePath};

/// Deepest level any traversal will visit below its starting directory.
pub const MAX_DEPTH: usize = 64;

/// Collect the entries below `root`, parents before their children.
///
/// `children` lists one directory. Directories at `depth` levels below `root`
/// are reported but not expanded; `descend` can veto expansion of others.
pub(crate) fn walk<C, D>(
    root: &StorePath,
    depth: usize,
    mut children: C,
    descend: D,
) -> Result<Vec<Entry>, StoreError>
where
    C: FnMut(&StorePath) -> Result<Vec<Entry>, StoreError>,
    D: Fn(&Entry) -> bool,
{
    let mut out = Vec::new();
    let mut stack = vec![(root.clone(), 1usize)];
    while let Some((dir, level)) = stack.pop() {
        for entry in children(&dir)? {
            if entry.is_dir() && level < depth && descend(&entry) {
                stack.push((entry.path.clone(), level + 1));
            }
            out.push(entry);
        }
    }
    Ok(out)
}

/// Collect the whole tree below `root`.
///
/// # Errors
///
/// - [`StoreError::BackendFailure`] if the tree is deeper than [`MAX_DEPTH`]
pub(crate) fn walk_all<C>(root: &StorePath, mut children: C) -> Result<Vec<Entry>, StoreError>
where
    C: FnMut(&StorePath) -> Result<Vec<Entry>, StoreError>,
{
    let mut out = Vec::new();
    let mut stack = vec![(root.clone(), 1usize)];
    while let Some((dir, level)) = stack.pop() {
        for entry in children(&dir)? {
            if entry.is_dir() {
                if level >= MAX_DEPTH {
                    return Err(StoreError::backend(
                        "walk",
                        &entry.path,
                        format!("directory tree deeper than {MAX_DEPTH} levels"),
                    ));
                }
                stack.push((entry.path.clone(), level + 1));
            }
            out.push(entry);
        }
    }
    Ok(out)
}

/// Paths of a tree in removal order: files first, then directories deepest first.
pub(crate) fn removal_order(entries: Vec<Entry>) -> (Vec<StorePath>, Vec<StorePath>) {
    let (dirs, files): (Vec<_>, Vec<_>) = entries.into_iter().partition(Entry::is_dir);
    let files = files.into_iter().map(|e| e.path).collect();
    let mut dirs: Vec<_> = dirs.into_iter().map(|e| e.path).collect();
    dirs.sort_by_key(|p| std::cmp::Reverse(p.depth()));
    (files, dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Access, FileType};
    use std::collections::BTreeMap;
    use std::time::SystemTime;

    fn entry(path: &StorePath, file_type: FileType) -> Entry {
        Entry {
            path: path.clone(),
            file_type,
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            access: Access::Public,
        }
    }

    /// A fake tree: directory path -> children.
    fn tree(paths: &[&str]) -> BTreeMap<StorePath, Vec<Entry>> {
        let mut map: BTreeMap<StorePath, Vec<Entry>> = BTreeMap::new();
        for raw in paths {
            let path = StorePath::parse(raw.trim_end_matches('/')).unwrap();
            let file_type = if raw.ends_with('/') {
                map.entry(path.clone()).or_default();
                FileType::Directory
            } else {
                FileType::File
            };
            let parent = path.parent().unwrap();
            map.entry(parent).or_default().push(entry(&path, file_type));
        }
        map
    }

    fn lister(
        map: &BTreeMap<StorePath, Vec<Entry>>,
    ) -> impl FnMut(&StorePath) -> Result<Vec<Entry>, StoreError> + '_ {
        |dir| Ok(map.get(dir).cloned().unwrap_or_default())
    }

    #[test]
    fn walk_respects_depth() {
        let map = tree(&["a/", "a/b/", "a/b/c.txt", "d.txt"]);
        let root = StorePath::root();
        let one = walk(&root, 1, lister(&map), |_| true).unwrap();
        assert_eq!(one.len(), 2);
        let all = walk(&root, 3, lister(&map), |_| true).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn walk_visits_parents_first() {
        let map = tree(&["a/", "a/b/", "a/b/c.txt"]);
        let all = walk(&StorePath::root(), 10, lister(&map), |_| true).unwrap();
        let pos = |p: &str| {
            all.iter()
                .position(|e| e.path.to_string() == p)
                .unwrap()
        };
        assert!(pos("a") < pos("a/b"));
        assert!(pos("a/b") < pos("a/b/c.txt"));
    }

    #[test]
    fn walk_honours_descend_veto() {
        let map = tree(&["skip/", "skip/x.txt", "keep/", "keep/y.txt"]);
        let all = walk(&StorePath::root(), 5, lister(&map), |e| e.name() != "skip").unwrap();
        assert!(all.iter().any(|e| e.path.to_string() == "keep/y.txt"));
        assert!(!all.iter().any(|e| e.path.to_string() == "skip/x.txt"));
    }

    #[test]
    fn walk_all_fails_past_max_depth() {
        let deep: Vec<String> = (1..=MAX_DEPTH + 1)
            .map(|n| {
                let segs: Vec<String> = (0..n).map(|i| format!("d{i}")).collect();
                format!("{}/", segs.join("/"))
            })
            .collect();
        let refs: Vec<&str> = deep.iter().map(String::as_str).collect();
        let map = tree(&refs);
        let err = walk_all(&StorePath::root(), lister(&map)).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::BackendFailure);
    }

    #[test]
    fn removal_order_puts_deep_dirs_first() {
        let map = tree(&["a/", "a/b/", "a/b/c/", "a/f.txt"]);
        let all = walk_all(&StorePath::root(), lister(&map)).unwrap();
        let (files, dirs) = removal_order(all);
        assert_eq!(files.len(), 1);
        let rendered: Vec<_> = dirs.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["a/b/c", "a/b", "a"]);
    }
}
