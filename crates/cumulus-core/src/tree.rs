//! Lazily materialized directory tree over a flat key space
//!
//! A [`VirtualTree`] lists its root prefix once when built. Every other group
//! starts as an unexpanded placeholder and is listed the first time a caller
//! asks for its children; the result is cached for the lifetime of the tree
//! and never refreshed. Nodes live in an arena owned by the tree, and
//! [`Group`] / [`Dataset`] are cheap handles borrowing it.
//!
//! The expansion cache is not thread-safe: a tree is meant to be used from a
//! single thread.

use crate::backend::{DirectoryListing, KeyBackend, ObjectBackend, ObjectInfo};
use crate::key::{clean_key, directory_prefix, is_directory_marker, join, SEPARATOR};
use crate::naming::NameTable;
use crate::utils::format_size;
use crate::{Error, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Group names ending in these extensions hold datasets rather than folders
pub const DEFAULT_CONTAINER_EXTENSIONS: &[&str] =
    &[".hdf", ".h5", ".hf5", ".hdf5", ".h5py", ".grp", ".arr", ".dar"];

/// Options for building a tree
#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// Extensions marking a group as a container of datasets
    pub container_extensions: Vec<String>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            container_extensions: DEFAULT_CONTAINER_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl TreeOptions {
    fn kind_of(&self, name: &str) -> GroupKind {
        let lower = name.to_lowercase();
        if self
            .container_extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_lowercase()))
        {
            GroupKind::Container
        } else {
            GroupKind::Directory
        }
    }
}

/// What a simulated group stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// The scope the tree was built for
    Root,
    /// A plain simulated folder
    Directory,
    /// A simulated file holding named datasets (e.g. `run01.grp`)
    Container,
}

/// Raw child names of an expanded group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Names of child groups
    pub groups: BTreeSet<String>,
    /// Names of datasets directly in the group
    pub datasets: BTreeSet<String>,
}

#[derive(Debug)]
struct Children {
    groups: BTreeMap<String, usize>,
    datasets: BTreeMap<String, usize>,
    names: NameTable,
}

#[derive(Debug)]
enum Expansion {
    Unexpanded,
    Expanded(Children),
    /// Sanitization failed; the node cannot be listed
    Poisoned {
        first: String,
        second: String,
        sanitized: String,
    },
}

#[derive(Debug)]
struct GroupData {
    /// Listing prefix, `/`-terminated except at the bucket root
    prefix: String,
    name: String,
    kind: GroupKind,
    state: Expansion,
}

#[derive(Debug)]
struct DatasetData {
    key: String,
    size: Option<u64>,
}

/// A browsable tree of groups and datasets over one key prefix
#[derive(Debug)]
pub struct VirtualTree<B> {
    backend: B,
    options: TreeOptions,
    groups: RefCell<Vec<GroupData>>,
    datasets: RefCell<Vec<DatasetData>>,
}

const ROOT: usize = 0;

impl<B: KeyBackend> VirtualTree<B> {
    /// Build a tree rooted at `root_prefix` with default options
    ///
    /// Issues exactly one listing call; child groups are recorded by name
    /// only.
    pub fn build(root_prefix: &str, backend: B) -> Result<Self> {
        Self::build_with_options(root_prefix, backend, TreeOptions::default())
    }

    /// Build a tree rooted at `root_prefix`
    pub fn build_with_options(root_prefix: &str, backend: B, options: TreeOptions) -> Result<Self> {
        let root_path = clean_key(root_prefix)
            .trim_end_matches(SEPARATOR)
            .to_string();
        let root_name = root_path
            .rsplit(SEPARATOR)
            .next()
            .unwrap_or_default()
            .to_string();

        let tree = Self {
            backend,
            options,
            groups: RefCell::new(vec![GroupData {
                prefix: directory_prefix(&root_path),
                name: root_name,
                kind: GroupKind::Root,
                state: Expansion::Unexpanded,
            }]),
            datasets: RefCell::new(Vec::new()),
        };

        tree.ensure_expanded(ROOT)?;
        Ok(tree)
    }

    /// The root group
    pub fn root(&self) -> Group<'_, B> {
        Group { tree: self, id: ROOT }
    }

    /// The backend this tree lists from
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The options the tree was built with
    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Resolve a `/`-separated path relative to the root
    ///
    /// Segments may be given raw or sanitized. An empty path is the root.
    pub fn open(&self, path: &str) -> Result<Node<'_, B>> {
        self.root().open(path)
    }

    fn ensure_expanded(&self, id: usize) -> Result<()> {
        let prefix = {
            let groups = self.groups.borrow();
            let group = &groups[id];
            match &group.state {
                Expansion::Expanded(_) => return Ok(()),
                Expansion::Poisoned {
                    first,
                    second,
                    sanitized,
                } => {
                    return Err(Error::NameCollision {
                        group: group_path(&group.prefix).to_string(),
                        first: first.clone(),
                        second: second.clone(),
                        sanitized: sanitized.clone(),
                    })
                }
                Expansion::Unexpanded => group.prefix.clone(),
            }
        };

        let listing = self.backend.list_directory(&prefix)?;
        debug!(
            "Expanded '{}': {} groups, {} datasets",
            prefix,
            listing.prefixes.len(),
            listing.keys.len()
        );

        match self.populate(&prefix, listing) {
            Ok(children) => {
                self.groups.borrow_mut()[id].state = Expansion::Expanded(children);
                Ok(())
            }
            Err(Error::NameCollision {
                group,
                first,
                second,
                sanitized,
            }) => {
                self.groups.borrow_mut()[id].state = Expansion::Poisoned {
                    first: first.clone(),
                    second: second.clone(),
                    sanitized: sanitized.clone(),
                };
                Err(Error::NameCollision {
                    group,
                    first,
                    second,
                    sanitized,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Register the children of one listing; nothing is stored on collision
    fn populate(&self, prefix: &str, listing: DirectoryListing) -> Result<Children> {
        let path = group_path(prefix);
        let dataset_names: Vec<(String, String)> = listing
            .keys
            .into_iter()
            .filter(|key| !is_directory_marker(key))
            .filter_map(|key| {
                let name = key.strip_prefix(prefix)?.to_string();
                Some((name, key))
            })
            .collect();

        let mut names = NameTable::new();
        for name in &listing.prefixes {
            names.insert(path, name)?;
        }
        for (name, _) in &dataset_names {
            names.insert(path, name)?;
        }

        let mut groups = self.groups.borrow_mut();
        let mut child_groups = BTreeMap::new();
        for name in listing.prefixes {
            let id = groups.len();
            groups.push(GroupData {
                prefix: format!("{}{}{}", prefix, name, SEPARATOR),
                name: name.clone(),
                kind: self.options.kind_of(&name),
                state: Expansion::Unexpanded,
            });
            child_groups.insert(name, id);
        }

        let mut datasets = self.datasets.borrow_mut();
        let mut child_datasets = BTreeMap::new();
        for (name, key) in dataset_names {
            let id = datasets.len();
            datasets.push(DatasetData { key, size: None });
            child_datasets.insert(name, id);
        }

        Ok(Children {
            groups: child_groups,
            datasets: child_datasets,
            names,
        })
    }

    fn with_children<T>(&self, id: usize, f: impl FnOnce(&Children) -> T) -> Result<T> {
        self.ensure_expanded(id)?;
        let groups = self.groups.borrow();
        match &groups[id].state {
            Expansion::Expanded(children) => Ok(f(children)),
            _ => Err(Error::NotFound(group_path(&groups[id].prefix).to_string())),
        }
    }
}

/// A simulated directory
pub struct Group<'t, B> {
    tree: &'t VirtualTree<B>,
    id: usize,
}

impl<B> Clone for Group<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for Group<'_, B> {}

impl<'t, B: KeyBackend> Group<'t, B> {
    /// Full simulated path, without trailing separator (`""` at bucket root)
    pub fn path(&self) -> String {
        group_path(&self.tree.groups.borrow()[self.id].prefix).to_string()
    }

    /// The prefix this group lists (`""` at bucket root, else `/`-terminated)
    ///
    /// Unlike [`Group::path`] this is unique per group even when keys contain
    /// empty segments.
    pub fn prefix(&self) -> String {
        self.tree.groups.borrow()[self.id].prefix.clone()
    }

    /// Last segment of the path, which may be empty
    pub fn name(&self) -> String {
        self.tree.groups.borrow()[self.id].name.clone()
    }

    pub fn kind(&self) -> GroupKind {
        self.tree.groups.borrow()[self.id].kind
    }

    /// Whether the children of this group have been listed
    pub fn is_expanded(&self) -> bool {
        matches!(
            self.tree.groups.borrow()[self.id].state,
            Expansion::Expanded(_)
        )
    }

    /// Raw names of child groups and datasets
    ///
    /// The first call lists the group's prefix; later calls are served from
    /// the cache.
    pub fn expand(&self) -> Result<Listing> {
        self.tree.with_children(self.id, |children| Listing {
            groups: children.groups.keys().cloned().collect(),
            datasets: children.datasets.keys().cloned().collect(),
        })
    }

    /// Resolve one child by raw or sanitized name
    ///
    /// A name that is both a group and a dataset resolves to the group; use
    /// [`Group::dataset`] for the other.
    pub fn child(&self, name: &str) -> Result<Node<'t, B>> {
        let found = self.tree.with_children(self.id, |children| {
            let raw = children.names.lookup(name)?;
            if let Some(&id) = children.groups.get(raw) {
                return Some(NodeId::Group(id));
            }
            children.datasets.get(raw).map(|&id| NodeId::Dataset(id))
        })?;

        match found {
            Some(NodeId::Group(id)) => Ok(Node::Group(Group { tree: self.tree, id })),
            Some(NodeId::Dataset(id)) => Ok(Node::Dataset(Dataset { tree: self.tree, id })),
            None => Err(Error::NotFound(join(&self.path(), name))),
        }
    }

    /// Resolve a child group by raw or sanitized name
    pub fn group(&self, name: &str) -> Result<Group<'t, B>> {
        let found = self.tree.with_children(self.id, |children| {
            let raw = children.names.lookup(name)?;
            children.groups.get(raw).copied()
        })?;

        match found {
            Some(id) => Ok(Group { tree: self.tree, id }),
            None => Err(Error::NotFound(join(&self.path(), name))),
        }
    }

    /// Resolve a dataset by raw or sanitized name
    pub fn dataset(&self, name: &str) -> Result<Dataset<'t, B>> {
        let found = self.tree.with_children(self.id, |children| {
            let raw = children.names.lookup(name)?;
            children.datasets.get(raw).copied()
        })?;

        match found {
            Some(id) => Ok(Dataset { tree: self.tree, id }),
            None => Err(Error::NotFound(join(&self.path(), name))),
        }
    }

    /// Walk a `/`-separated relative path from this group
    ///
    /// Separators are not collapsed: `a//b` walks through the child of `a`
    /// whose name is empty. A trailing `/` is ignored.
    pub fn open(&self, path: &str) -> Result<Node<'t, B>> {
        let mut node = Node::Group(*self);
        let path = path.strip_suffix(SEPARATOR).unwrap_or(path);
        if path.is_empty() {
            return Ok(node);
        }

        for segment in path.split(SEPARATOR) {
            node = match node {
                Node::Group(group) => group.child(segment)?,
                Node::Dataset(dataset) => {
                    return Err(Error::NotFound(join(&dataset.key(), segment)));
                }
            };
        }

        Ok(node)
    }

    /// Sanitized child names, groups first, each part sorted
    pub fn list(&self) -> Result<Vec<String>> {
        self.tree.with_children(self.id, |children| {
            let sanitized = |raw: &String| {
                children
                    .names
                    .sanitized(raw)
                    .unwrap_or(raw.as_str())
                    .to_string()
            };
            let mut groups: Vec<String> = children.groups.keys().map(sanitized).collect();
            let mut datasets: Vec<String> = children
                .datasets
                .keys()
                .filter(|raw| !children.groups.contains_key(*raw))
                .map(sanitized)
                .collect();
            groups.sort();
            datasets.sort();
            groups.extend(datasets);
            groups
        })
    }

    /// Number of distinct child names
    pub fn len(&self) -> Result<usize> {
        self.tree.with_children(self.id, |children| children.names.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every key below this group
    ///
    /// Issues a fresh recursive listing; the result is not cached.
    pub fn descendants(&self) -> Result<Vec<String>> {
        let prefix = self.prefix();
        let keys = self.tree.backend.list_keys(&prefix)?;
        Ok(keys.into_iter().filter(|k| !is_directory_marker(k)).collect())
    }
}

impl<B: KeyBackend> fmt::Display for Group<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = self.tree.groups.borrow();
        let group = &groups[self.id];
        let path = match group_path(&group.prefix) {
            "" => "/",
            path => path,
        };

        match (&group.kind, &group.state) {
            (GroupKind::Container, Expansion::Expanded(children)) => {
                write!(f, "cumulus-group <{}> ({} keys)", path, children.names.len())
            }
            (GroupKind::Container, _) => write!(f, "cumulus-group <{}>", path),
            _ => write!(f, "cumulus-path <{}>", path),
        }
    }
}

impl<B> fmt::Debug for Group<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group").field("id", &self.id).finish()
    }
}

/// A simulated file wrapping one key
pub struct Dataset<'t, B> {
    tree: &'t VirtualTree<B>,
    id: usize,
}

impl<B> Clone for Dataset<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for Dataset<'_, B> {}

impl<B: KeyBackend> Dataset<'_, B> {
    /// The backend key
    pub fn key(&self) -> String {
        self.tree.datasets.borrow()[self.id].key.clone()
    }

    /// Last segment of the key
    pub fn name(&self) -> String {
        let key = self.key();
        match key.rfind(SEPARATOR) {
            Some(idx) => key[idx + 1..].to_string(),
            None => key,
        }
    }

    /// Object size in bytes, fetched on first use
    pub fn size(&self) -> Result<u64> {
        if let Some(size) = self.tree.datasets.borrow()[self.id].size {
            return Ok(size);
        }

        let key = self.key();
        let size = self.tree.backend.object_size(&key)?;
        self.tree.datasets.borrow_mut()[self.id].size = Some(size);
        Ok(size)
    }
}

impl<B: ObjectBackend> Dataset<'_, B> {
    /// Download the object bytes
    pub fn read(&self) -> Result<Vec<u8>> {
        self.tree.backend.get_object(&self.key())
    }

    /// Object metadata; also fills the size cache
    pub fn info(&self) -> Result<ObjectInfo> {
        let info = self.tree.backend.object_info(&self.key())?;
        self.tree.datasets.borrow_mut()[self.id].size = Some(info.size);
        Ok(info)
    }
}

impl<B: KeyBackend> fmt::Display for Dataset<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let datasets = self.tree.datasets.borrow();
        let data = &datasets[self.id];
        match data.size {
            Some(size) => write!(f, "cumulus-file <{}> [{}]", data.key, format_size(size)),
            None => write!(f, "cumulus-file <{}>", data.key),
        }
    }
}

impl<B> fmt::Debug for Dataset<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset").field("id", &self.id).finish()
    }
}

/// Strip the trailing separator of a listing prefix
fn group_path(prefix: &str) -> &str {
    prefix.strip_suffix(SEPARATOR).unwrap_or(prefix)
}

enum NodeId {
    Group(usize),
    Dataset(usize),
}

/// Either kind of tree node
#[derive(Debug)]
pub enum Node<'t, B> {
    Group(Group<'t, B>),
    Dataset(Dataset<'t, B>),
}

impl<B> Clone for Node<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for Node<'_, B> {}

impl<'t, B: KeyBackend> Node<'t, B> {
    /// Last path segment
    pub fn name(&self) -> String {
        match self {
            Node::Group(g) => g.name(),
            Node::Dataset(d) => d.name(),
        }
    }

    /// Group path or dataset key
    pub fn path(&self) -> String {
        match self {
            Node::Group(g) => g.path(),
            Node::Dataset(d) => d.key(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Node::Group(_))
    }

    pub fn as_group(&self) -> Option<Group<'t, B>> {
        match self {
            Node::Group(g) => Some(*g),
            Node::Dataset(_) => None,
        }
    }

    pub fn as_dataset(&self) -> Option<Dataset<'t, B>> {
        match self {
            Node::Dataset(d) => Some(*d),
            Node::Group(_) => None,
        }
    }
}

impl<B: KeyBackend> fmt::Display for Node<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Group(g) => g.fmt(f),
            Node::Dataset(d) => d.fmt(f),
        }
    }
}
