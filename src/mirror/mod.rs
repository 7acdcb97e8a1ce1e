//! Namespace Mirror (C3): the in-memory tree of directories, files, and
//! symlinks rooted at `/` that answers VFS queries synchronously.

pub mod node;

use std::collections::HashMap;

use crate::errno::{Errno, VfsResult};
use node::{Attr, Header, Kind, Node, NodeId, ROOT};

/// Name of the directory the Version Archiver materializes history under.
/// Used here only so Mirror operations can recognize and refuse to
/// recursively monitor it.
pub const VERSION_DIR_MARKER: &str = ".versions";

/// The file-vs-directory heuristic `create` uses on the last path
/// component: a name containing a `.` after its first character is a
/// file, otherwise a directory. Preserved for compatibility even though
/// it misclassifies e.g. dotfiles-with-no-extension as directories.
pub fn looks_like_file(last_component: &str) -> bool {
    last_component.char_indices().skip(1).any(|(_, c)| c == '.')
}

/// Splits a `/`-separated absolute path into its components, ignoring the
/// leading empty segment produced by the root slash.
fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Returns `(parent_path, last_component)`, resolving the parent of the
/// root itself to `/` with an empty last component.
pub fn split_parent(path: &str) -> (String, String) {
    let parts = components(path);
    if parts.is_empty() {
        return ("/".to_string(), String::new());
    }
    let (last, rest) = parts.split_last().unwrap();
    let parent = if rest.is_empty() { "/".to_string() } else { format!("/{}", rest.join("/")) };
    (parent, last.to_string())
}

/// Whether `path` sits inside a version folder.
pub fn is_version_path(path: &str) -> bool {
    components(path).iter().any(|segment| *segment == VERSION_DIR_MARKER)
}

pub struct Mirror {
    arena: HashMap<NodeId, Node>,
    next_id: u64,
}

impl Mirror {
    pub fn new() -> Self {
        let mut arena = HashMap::new();
        arena.insert(ROOT, Node::new_directory("/".to_string(), None));
        Self { arena, next_id: ROOT.0 + 1 }
    }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Splits `path` on `/` and descends from the root.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        if path == "/" {
            return Some(ROOT);
        }
        let mut current = ROOT;
        for segment in components(path) {
            let node = self.arena.get(&current)?;
            let children = node.children()?;
            current = *children.get(segment)?;
        }
        Some(current)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.arena.get_mut(&id)
    }

    pub fn path_of(&self, id: NodeId) -> String {
        if id == ROOT {
            return "/".to_string();
        }
        let mut segments = Vec::new();
        let mut current = id;
        loop {
            let node = match self.arena.get(&current) {
                Some(node) => node,
                None => break,
            };
            if current == ROOT {
                break;
            }
            segments.push(node.header.name.clone());
            match node.header.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    fn resolve_parent(&self, parent_path: &str) -> VfsResult<NodeId> {
        let parent_id = self.find(parent_path).ok_or(Errno::ENOENT)?;
        if !self.node(parent_id).unwrap().is_directory() {
            return Err(Errno::ENOTDIR);
        }
        Ok(parent_id)
    }

    fn insert_child(&mut self, parent: NodeId, name: String, node: Node) -> VfsResult<NodeId> {
        {
            let parent_node = self.node(parent).ok_or(Errno::ENOENT)?;
            let children = parent_node.children().ok_or(Errno::ENOTDIR)?;
            if children.contains_key(&name) {
                return Err(Errno::EEXIST);
            }
        }
        let id = self.allocate();
        self.arena.insert(id, node);
        self.node_mut(parent).unwrap().children_mut().unwrap().insert(name, id);
        Ok(id)
    }

    /// `mkfile`: creates a regular file child of `parent_path`.
    pub fn mkfile(&mut self, parent_path: &str, name: &str) -> VfsResult<NodeId> {
        let parent = self.resolve_parent(parent_path)?;
        let node = Node::new_file(name.to_string(), Some(parent));
        self.insert_child(parent, name.to_string(), node)
    }

    /// `mkdir`: creates a directory child of `parent_path`.
    pub fn mkdir(&mut self, parent_path: &str, name: &str) -> VfsResult<NodeId> {
        let parent = self.resolve_parent(parent_path)?;
        let node = Node::new_directory(name.to_string(), Some(parent));
        self.insert_child(parent, name.to_string(), node)
    }

    /// `symlink`: creates a symlink child aliasing `existing` (which may be
    /// absent if the target has not been created yet — `resolves_to` is
    /// only `Some` when the target is already resolvable).
    pub fn symlink(&mut self, parent_path: &str, name: &str, target: &str) -> VfsResult<NodeId> {
        let parent = self.resolve_parent(parent_path)?;
        let resolves_to = self.find(target);
        let last_component = target.rsplit('/').next().unwrap_or(target).to_string();
        let node = Node::new_symlink(name.to_string(), Some(parent), last_component, resolves_to);
        self.insert_child(parent, name.to_string(), node)
    }

    /// Detaches `id` from its parent. Callers (the VFS Adapter) are
    /// responsible for the corresponding DHT-side removal, since the
    /// Mirror itself has no DHT handle and must stay synchronous.
    pub fn delete(&mut self, id: NodeId) -> VfsResult<Node> {
        if id == ROOT {
            return Err(Errno::EINVAL);
        }
        let node = self.arena.get(&id).ok_or(Errno::ENOENT)?;
        if let Kind::Directory { children } = &node.kind {
            if !children.is_empty() {
                return Err(Errno::ENOTEMPTY);
            }
        }
        let parent = node.header.parent.ok_or(Errno::EINVAL)?;
        let name = node.header.name.clone();
        self.node_mut(parent).and_then(|p| p.children_mut()).map(|c| c.remove(&name));
        Ok(self.arena.remove(&id).unwrap())
    }

    /// `rename(old, new)`: detach at `old`, reattach at `new`. Returns the
    /// node's id so the caller can refresh its monitor record and clean up
    /// old DHT entries.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> VfsResult<NodeId> {
        let id = self.find(old_path).ok_or(Errno::ENOENT)?;
        if id == ROOT {
            return Err(Errno::EINVAL);
        }
        let (new_parent_path, new_name) = split_parent(new_path);
        let new_parent = self.resolve_parent(&new_parent_path)?;
        {
            let parent_node = self.node(new_parent).unwrap();
            if parent_node.children().unwrap().contains_key(&new_name) {
                return Err(Errno::EEXIST);
            }
        }

        let old_parent = self.node(id).unwrap().header.parent.ok_or(Errno::EINVAL)?;
        let old_name = self.node(id).unwrap().header.name.clone();
        self.node_mut(old_parent).and_then(|p| p.children_mut()).map(|c| c.remove(&old_name));

        {
            let node = self.node_mut(id).unwrap();
            node.header.name = new_name.clone();
            node.header.parent = Some(new_parent);
            node.header.touch_modification();
        }
        self.node_mut(new_parent).and_then(|p| p.children_mut()).map(|c| c.insert(new_name, id));
        Ok(id)
    }

    /// Resizes a file's buffer, zero-filling any extension.
    pub fn truncate(&mut self, id: NodeId, offset: u64) -> VfsResult<()> {
        let node = self.node_mut(id).ok_or(Errno::ENOENT)?;
        match &mut node.kind {
            Kind::File { content, loaded } => {
                content.resize(offset as usize, 0);
                *loaded = true;
                node.header.touch_modification();
                Ok(())
            }
            Kind::Directory { .. } => Err(Errno::EISDIR),
            Kind::Symlink { .. } => Err(Errno::EINVAL),
        }
    }

    /// Byte-level copy out of a file's buffer, with bounds checks.
    pub fn read(&mut self, id: NodeId, offset: u64, size: usize) -> VfsResult<Vec<u8>> {
        let node = self.node_mut(id).ok_or(Errno::ENOENT)?;
        let content = match &node.kind {
            Kind::File { content, .. } => content,
            Kind::Directory { .. } => return Err(Errno::EISDIR),
            Kind::Symlink { .. } => return Err(Errno::EINVAL),
        };
        let offset = offset as usize;
        if offset >= content.len() {
            node.header.touch_access();
            return Ok(Vec::new());
        }
        let end = (offset + size).min(content.len());
        let slice = content[offset..end].to_vec();
        node.header.touch_access();
        Ok(slice)
    }

    /// Byte-level copy into a file's buffer, with bounds checks. Grows the
    /// buffer if `offset + data.len()` exceeds its current length.
    pub fn write(&mut self, id: NodeId, offset: u64, data: &[u8]) -> VfsResult<u32> {
        let node = self.node_mut(id).ok_or(Errno::ENOENT)?;
        let content = match &mut node.kind {
            Kind::File { content, loaded } => {
                *loaded = true;
                content
            }
            Kind::Directory { .. } => return Err(Errno::EISDIR),
            Kind::Symlink { .. } => return Err(Errno::EINVAL),
        };
        let offset = offset as usize;
        let end = offset + data.len();
        if content.len() < end {
            content.resize(end, 0);
        }
        content[offset..end].copy_from_slice(data);
        node.header.touch_modification();
        Ok(data.len() as u32)
    }

    /// Fills a stat-like record for `id`.
    pub fn getattr(&self, id: NodeId) -> VfsResult<Attr> {
        Ok(self.node(id).ok_or(Errno::ENOENT)?.attr())
    }

    /// Current content buffer, if the file has been loaded — `None` is the
    /// `capacity() == 0` sentinel for "never fetched from the DHT".
    pub fn content(&self, id: NodeId) -> VfsResult<Option<&[u8]>> {
        match &self.node(id).ok_or(Errno::ENOENT)?.kind {
            Kind::File { content, loaded } => Ok(if *loaded { Some(content) } else { None }),
            Kind::Directory { .. } => Err(Errno::EISDIR),
            Kind::Symlink { .. } => Err(Errno::EINVAL),
        }
    }

    /// Installs content fetched from the DHT (used by the lazy-load path
    /// in `open` and by the Syncer Listener) without touching the write
    /// timestamp — this is a sync from the source of truth, not a local
    /// mutation.
    pub fn install_content(&mut self, id: NodeId, data: Vec<u8>) -> VfsResult<()> {
        let node = self.node_mut(id).ok_or(Errno::ENOENT)?;
        match &mut node.kind {
            Kind::File { content, loaded } => {
                *content = data;
                *loaded = true;
                Ok(())
            }
            Kind::Directory { .. } => Err(Errno::EISDIR),
            Kind::Symlink { .. } => Err(Errno::EINVAL),
        }
    }

    pub fn is_loaded(&self, id: NodeId) -> VfsResult<bool> {
        match &self.node(id).ok_or(Errno::ENOENT)?.kind {
            Kind::File { loaded, .. } => Ok(*loaded),
            _ => Ok(true),
        }
    }

    pub fn readdir(&self, id: NodeId) -> VfsResult<Vec<String>> {
        let node = self.node(id).ok_or(Errno::ENOENT)?;
        let children = node.children().ok_or(Errno::ENOTDIR)?;
        Ok(children.keys().cloned().collect())
    }

    /// Installs a new node directly under the root's descendants, used by
    /// the Syncer Listener when materializing a remote path discovered via
    /// `K_keys`: directory by default, file by the same extension
    /// heuristic `create` uses. Parent directories are created on demand
    /// and are always directories regardless of their own name.
    pub fn materialize(&mut self, path: &str) -> VfsResult<NodeId> {
        if let Some(existing) = self.find(path) {
            return Ok(existing);
        }
        let parts = components(path);
        let mut current = ROOT;
        for (index, segment) in parts.iter().enumerate() {
            let existing = self.node(current).and_then(|n| n.children()).and_then(|c| c.get(*segment).copied());
            current = match existing {
                Some(id) => id,
                None => {
                    let is_last = index + 1 == parts.len();
                    let node = if is_last && looks_like_file(segment) {
                        Node::new_file_unloaded(segment.to_string(), Some(current))
                    } else {
                        Node::new_directory(segment.to_string(), Some(current))
                    };
                    self.insert_child(current, segment.to_string(), node)?
                }
            };
        }
        Ok(current)
    }

    pub fn header(&self, id: NodeId) -> VfsResult<&Header> {
        Ok(&self.node(id).ok_or(Errno::ENOENT)?.header)
    }

    /// Sets explicit access/modification timestamps, for `utimens`.
    pub fn set_times(&mut self, id: NodeId, atime: std::time::SystemTime, mtime: std::time::SystemTime) -> VfsResult<()> {
        self.node_mut(id).ok_or(Errno::ENOENT)?.header.set_times(atime, mtime);
        Ok(())
    }

    /// Depth-first walk of every node, yielding `(id, path)` pairs. Used by
    /// the Syncer Listener (C7) to find files whose lazy-load buffer is
    /// still empty.
    pub fn walk(&self) -> Vec<(NodeId, String)> {
        let mut out = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            out.push((id, self.path_of(id)));
            if let Some(children) = self.node(id).and_then(|n| n.children()) {
                stack.extend(children.values().copied());
            }
        }
        out
    }

    /// Every file node whose content buffer has not yet been loaded from
    /// the DHT.
    pub fn unloaded_files(&self) -> Vec<(NodeId, String)> {
        self.walk()
            .into_iter()
            .filter(|(id, _)| matches!(self.is_loaded(*id), Ok(false)))
            .collect()
    }
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}
