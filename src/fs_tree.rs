/*
    netmd-tfs-fs

    Copyright 2026 netmd-tfs-fs contributors

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the "Software"),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/fs_tree.rs

    The in-memory overlay directory tree (TFS). A node is either a File,
    bound to a hidden on-disc track by ID, or a Directory holding named
    children. No parent pointers are kept; callers re-traverse from the root
    to resolve a path, the same way the teacher's FileTreeNode is navigated.
*/
use std::collections::HashMap;

use crate::error::{Result, TfsError};

/// A file entry in the TFS tree: a display name bound to a hidden track ID
/// and the byte length recorded in the TFS record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileNode {
    pub track_id: u8,
    pub name: String,
    pub byte_len: u32,
}

/// A directory entry: a name and a map of child name to child node.
#[derive(Clone, Debug, Default)]
pub struct DirNode {
    pub name: String,
    pub children: HashMap<String, FsNode>,
}

#[derive(Clone, Debug)]
pub enum FsNode {
    File(FileNode),
    Directory(DirNode),
}

impl FsNode {
    pub fn empty_root() -> Self {
        FsNode::Directory(DirNode {
            name: String::new(),
            children: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            FsNode::File(f) => &f.name,
            FsNode::Directory(d) => &d.name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, FsNode::Directory(_))
    }

    pub fn as_dir(&self) -> Option<&DirNode> {
        match self {
            FsNode::Directory(d) => Some(d),
            FsNode::File(_) => None,
        }
    }

    pub fn as_dir_mut(&mut self) -> Option<&mut DirNode> {
        match self {
            FsNode::Directory(d) => Some(d),
            FsNode::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            FsNode::File(f) => Some(f),
            FsNode::Directory(_) => None,
        }
    }

    /// Renames this node in place, for `rename`'s detach-then-reinsert
    /// sequence.
    pub fn set_name(&mut self, name: String) {
        match self {
            FsNode::File(f) => f.name = name,
            FsNode::Directory(d) => d.name = name,
        }
    }
}

impl DirNode {
    pub fn add(&mut self, node: FsNode) {
        self.children.insert(node.name().to_string(), node);
    }

    pub fn get_child(&self, name: &str) -> Option<&FsNode> {
        self.children.get(name)
    }
}

/// Splits a path on `/`, discarding empty fragments (so `//a//b/` and `a/b`
/// traverse identically).
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Result of a tree traversal: either the directory found at the final
/// fragment, or the file found partway through (traversal stops at the
/// first File encountered, per spec.md §4.2).
pub enum Traversal<'a> {
    Dir(&'a DirNode),
    File(&'a FileNode),
}

/// Walks `path` from `root`. Traversal stops and returns the File the
/// moment one is encountered, even if path fragments remain; a missing
/// intermediate child is `NotFound`.
pub fn traverse<'a>(root: &'a FsNode, path: &str) -> Result<Traversal<'a>> {
    let fragments = split_path(path);
    let mut cur = root;
    for frag in &fragments {
        match cur {
            FsNode::File(f) => return Ok(Traversal::File(f)),
            FsNode::Directory(d) => {
                cur = d.children.get(*frag).ok_or(TfsError::NotFound)?;
            }
        }
    }
    match cur {
        FsNode::File(f) => Ok(Traversal::File(f)),
        FsNode::Directory(d) => Ok(Traversal::Dir(d)),
    }
}

/// Resolves the directory that should contain `path`'s final component,
/// along with that component's name. Fails if any intermediate segment is
/// missing or is itself a file.
pub fn traverse_parent<'a>(root: &'a FsNode, path: &str) -> Result<(&'a DirNode, &'a str)> {
    let fragments = split_path(path);
    let (last, init) = fragments.split_last().ok_or(TfsError::NotFound)?;
    let mut cur = root.as_dir().ok_or(TfsError::NotFound)?;
    for frag in init {
        let child = cur.children.get(*frag).ok_or(TfsError::NotFound)?;
        cur = child.as_dir().ok_or(TfsError::PermissionDenied)?;
    }
    Ok((cur, *last))
}

/// Mutable counterpart of [`traverse_parent`].
pub fn traverse_parent_mut<'a>(root: &'a mut FsNode, path: &str) -> Result<(&'a mut DirNode, String)> {
    let fragments: Vec<String> = split_path(path).into_iter().map(str::to_string).collect();
    let (last, init) = fragments.split_last().ok_or(TfsError::NotFound)?;
    let mut cur = root.as_dir_mut().ok_or(TfsError::NotFound)?;
    for frag in init {
        let child = cur.children.get_mut(frag).ok_or(TfsError::NotFound)?;
        cur = child.as_dir_mut().ok_or(TfsError::PermissionDenied)?;
    }
    Ok((cur, last.clone()))
}

/// Collects every `FileNode` reachable from `root`, depth-first. Used by
/// the cache to recompute `nextFileID` and by callers that need a full
/// listing of bound track IDs.
pub fn all_files(root: &FsNode) -> Vec<&FileNode> {
    let mut out = Vec::new();
    collect_files(root, &mut out);
    out
}

fn collect_files<'a>(node: &'a FsNode, out: &mut Vec<&'a FileNode>) {
    match node {
        FsNode::File(f) => out.push(f),
        FsNode::Directory(d) => {
            for child in d.children.values() {
                collect_files(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> FsNode {
        let mut root = DirNode {
            name: String::new(),
            children: HashMap::new(),
        };
        let mut sub = DirNode {
            name: "sub".to_string(),
            children: HashMap::new(),
        };
        sub.add(FsNode::File(FileNode {
            track_id: 3,
            name: "b.bin".to_string(),
            byte_len: 10,
        }));
        root.add(FsNode::Directory(sub));
        root.add(FsNode::File(FileNode {
            track_id: 1,
            name: "a.bin".to_string(),
            byte_len: 4,
        }));
        FsNode::Directory(root)
    }

    #[test]
    fn traverse_finds_nested_file() {
        let tree = sample_tree();
        match traverse(&tree, "/sub/b.bin").unwrap() {
            Traversal::File(f) => assert_eq!(f.track_id, 3),
            Traversal::Dir(_) => panic!("expected file"),
        }
    }

    #[test]
    fn traverse_stops_at_first_file() {
        let tree = sample_tree();
        match traverse(&tree, "/a.bin/nonsense").unwrap() {
            Traversal::File(f) => assert_eq!(f.name, "a.bin"),
            Traversal::Dir(_) => panic!("expected file"),
        }
    }

    #[test]
    fn traverse_missing_intermediate_is_not_found() {
        let tree = sample_tree();
        assert!(matches!(
            traverse(&tree, "/missing/x"),
            Err(TfsError::NotFound)
        ));
    }

    #[test]
    fn all_files_collects_every_leaf() {
        let tree = sample_tree();
        let mut ids: Vec<u8> = all_files(&tree).iter().map(|f| f.track_id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 3]);
    }
}
