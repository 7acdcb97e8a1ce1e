//! Node types backing the Namespace Mirror.

use std::collections::BTreeMap;
use std::time::SystemTime;

/// Index into the [`super::Mirror`] arena.
///
/// Parent back-references are plain `NodeId`s, resolved through the
/// mirror's root, never an owning link, so parent/child references never
/// form an ownership cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Node identifier reserved for the root directory.
pub const ROOT: NodeId = NodeId(0);

/// Discriminant shared by all three [`Node`] variants.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileType {
    Directory,
    Regular,
    Symlink,
}

/// `getattr`-style snapshot.
#[derive(Debug, Copy, Clone)]
pub struct Attr {
    pub file_type: FileType,
    pub size: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
}

/// Header fields common to every [`Node`] variant.
#[derive(Debug, Clone)]
pub struct Header {
    pub name: String,
    pub parent: Option<NodeId>,
    pub last_access_ts: SystemTime,
    pub last_modification_ts: SystemTime,
}

impl Header {
    pub fn new(name: String, parent: Option<NodeId>) -> Self {
        let now = SystemTime::now();
        Self { name, parent, last_access_ts: now, last_modification_ts: now }
    }

    pub fn touch_access(&mut self) {
        self.last_access_ts = SystemTime::now();
    }

    pub fn touch_modification(&mut self) {
        let now = SystemTime::now();
        self.last_access_ts = now;
        self.last_modification_ts = now;
    }

    /// Sets both timestamps explicitly, for `utimens`.
    pub fn set_times(&mut self, atime: SystemTime, mtime: SystemTime) {
        self.last_access_ts = atime;
        self.last_modification_ts = mtime;
    }
}

/// The three path node variants. Modeled as a tagged variant rather than
/// a trait-object hierarchy: three fixed shapes with no need for dynamic
/// dispatch or open extension.
#[derive(Debug)]
pub enum Kind {
    Directory {
        children: BTreeMap<String, NodeId>,
    },
    File {
        content: Vec<u8>,
        /// Whether `content` has been materialized from the DHT yet.
        /// Stands in for a `capacity() == 0` sentinel: a dedicated flag is
        /// used instead of inspecting `Vec::capacity()` directly, since
        /// `clear()` and small-buffer reuse make capacity an unreliable
        /// signal of "never fetched" versus "fetched then emptied".
        loaded: bool,
    },
    Symlink {
        /// Last path component of the target; the full target path is not
        /// retained.
        target: String,
        resolves_to: Option<NodeId>,
    },
}

impl Kind {
    pub fn file_type(&self) -> FileType {
        match self {
            Kind::Directory { .. } => FileType::Directory,
            Kind::File { .. } => FileType::Regular,
            Kind::Symlink { .. } => FileType::Symlink,
        }
    }
}

#[derive(Debug)]
pub struct Node {
    pub header: Header,
    pub kind: Kind,
}

impl Node {
    pub fn new_directory(name: String, parent: Option<NodeId>) -> Self {
        Self { header: Header::new(name, parent), kind: Kind::Directory { children: BTreeMap::new() } }
    }

    pub fn new_file(name: String, parent: Option<NodeId>) -> Self {
        Self { header: Header::new(name, parent), kind: Kind::File { content: Vec::new(), loaded: true } }
    }

    /// A file placeholder with an empty, not-yet-fetched buffer: used by
    /// the Syncer Listener (C7) when it materializes a path discovered via
    /// `K_keys` but has not yet fetched its content.
    pub fn new_file_unloaded(name: String, parent: Option<NodeId>) -> Self {
        Self { header: Header::new(name, parent), kind: Kind::File { content: Vec::new(), loaded: false } }
    }

    pub fn new_symlink(name: String, parent: Option<NodeId>, target: String, resolves_to: Option<NodeId>) -> Self {
        Self { header: Header::new(name, parent), kind: Kind::Symlink { target, resolves_to } }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, Kind::Directory { .. })
    }

    pub fn children(&self) -> Option<&BTreeMap<String, NodeId>> {
        match &self.kind {
            Kind::Directory { children } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut BTreeMap<String, NodeId>> {
        match &mut self.kind {
            Kind::Directory { children } => Some(children),
            _ => None,
        }
    }

    pub fn attr(&self) -> Attr {
        let size = match &self.kind {
            Kind::File { content, .. } => content.len() as u64,
            Kind::Symlink { target, .. } => target.len() as u64,
            Kind::Directory { .. } => 0,
        };
        Attr {
            file_type: self.kind.file_type(),
            size,
            atime: self.header.last_access_ts,
            mtime: self.header.last_modification_ts,
        }
    }
}
