use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::models::{ProjectNode, PATH_SEPARATOR};

/// A node together with the ids of its direct children (ascending)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub node: ProjectNode,
    pub children_idx: Vec<i64>,
}

/// Owned nested view of one subtree, used for display and JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedProject {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub children: Vec<NestedProject>,
}

/// Derived views over a snapshot of project nodes
///
/// Built fresh for every command and never persisted. Node storage is the
/// `by_id` arena; every other view refers to nodes by id.
#[derive(Debug, Clone, Default)]
pub struct ProjectTree {
    by_id: BTreeMap<i64, TreeEntry>,
    roots: Vec<i64>,
    flat_paths: BTreeMap<i64, String>,
    reverse_flat_paths: HashMap<String, i64>,
    orphans: Vec<i64>,
}

impl ProjectTree {
    /// Build all views from a flat node list
    ///
    /// Nodes whose parent is missing, or which sit on a parent cycle, are
    /// promoted to roots and reported through [`ProjectTree::orphans`].
    pub fn build(nodes: &[ProjectNode]) -> Self {
        let mut by_id: BTreeMap<i64, TreeEntry> = nodes
            .iter()
            .map(|node| {
                (
                    node.id,
                    TreeEntry {
                        node: node.clone(),
                        children_idx: Vec::new(),
                    },
                )
            })
            .collect();

        let mut roots = Vec::new();
        let mut orphans = Vec::new();
        let mut links: Vec<(i64, i64)> = Vec::new();
        for entry in by_id.values() {
            match entry.node.parent {
                None => roots.push(entry.node.id),
                Some(parent) if by_id.contains_key(&parent) && parent != entry.node.id => {
                    links.push((parent, entry.node.id))
                }
                Some(parent) => {
                    log::warn!(
                        "project {} points at missing parent {}, treating it as a root",
                        entry.node.id,
                        parent
                    );
                    roots.push(entry.node.id);
                    orphans.push(entry.node.id);
                }
            }
        }
        for (parent, child) in links {
            if let Some(entry) = by_id.get_mut(&parent) {
                entry.children_idx.push(child);
            }
        }

        // Anything not reachable from a root sits on a cycle. Break each
        // cycle at its smallest id.
        let mut reached = reachable(&by_id, &roots);
        while reached.len() < by_id.len() {
            let Some(&cut) = by_id.keys().find(|id| !reached.contains(*id)) else {
                break;
            };
            log::warn!("project {} is part of a parent cycle, treating it as a root", cut);
            if let Some(parent) = by_id.get(&cut).and_then(|e| e.node.parent) {
                if let Some(entry) = by_id.get_mut(&parent) {
                    entry.children_idx.retain(|&c| c != cut);
                }
            }
            roots.push(cut);
            orphans.push(cut);
            reached.extend(reachable(&by_id, &[cut]));
        }

        roots.sort_unstable();
        orphans.sort_unstable();

        let mut tree = Self {
            by_id,
            roots,
            flat_paths: BTreeMap::new(),
            reverse_flat_paths: HashMap::new(),
            orphans,
        };
        tree.flatten();
        tree
    }

    /// Breadth-first flattening; each path extends its parent's path
    fn flatten(&mut self) {
        let mut queue: VecDeque<(i64, Option<String>)> =
            self.roots.iter().map(|&id| (id, None)).collect();

        while let Some((id, prefix)) = queue.pop_front() {
            let Some(entry) = self.by_id.get(&id) else {
                continue;
            };
            let path = match prefix {
                Some(prefix) => format!("{}{}{}", prefix, PATH_SEPARATOR, entry.node.name),
                None => entry.node.name.clone(),
            };
            if let Some(existing) = self.reverse_flat_paths.get(&path) {
                log::warn!(
                    "projects {} and {} share the path '{}', keeping {}",
                    existing,
                    id,
                    path,
                    existing
                );
            } else {
                self.reverse_flat_paths.insert(path.clone(), id);
            }
            for &child in &entry.children_idx {
                queue.push_back((child, Some(path.clone())));
            }
            self.flat_paths.insert(id, path);
        }
    }

    pub fn get(&self, id: i64) -> Option<&TreeEntry> {
        self.by_id.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn by_id(&self) -> &BTreeMap<i64, TreeEntry> {
        &self.by_id
    }

    pub fn roots(&self) -> &[i64] {
        &self.roots
    }

    /// Nodes promoted to roots because their parent link was broken
    pub fn orphans(&self) -> &[i64] {
        &self.orphans
    }

    /// Dotted path of a project
    pub fn path(&self, id: i64) -> Option<&str> {
        self.flat_paths.get(&id).map(String::as_str)
    }

    /// Project id for a dotted path (exact match)
    pub fn id_of(&self, path: &str) -> Option<i64> {
        self.reverse_flat_paths.get(path).copied()
    }

    pub fn flat_paths(&self) -> &BTreeMap<i64, String> {
        &self.flat_paths
    }

    pub fn reverse_flat_paths(&self) -> &HashMap<String, i64> {
        &self.reverse_flat_paths
    }

    /// Number of ancestors above a node (roots have depth 0)
    pub fn depth(&self, id: i64) -> usize {
        self.path(id)
            .map(|p| p.matches(PATH_SEPARATOR).count())
            .unwrap_or(0)
    }

    /// All ids below `root`, excluding `root` itself
    pub fn descendants(&self, root: i64) -> BTreeSet<i64> {
        let mut found = BTreeSet::new();
        let mut stack: Vec<i64> = match self.by_id.get(&root) {
            Some(entry) => entry.children_idx.clone(),
            None => return found,
        };
        while let Some(id) = stack.pop() {
            if id == root || !found.insert(id) {
                continue;
            }
            if let Some(entry) = self.by_id.get(&id) {
                stack.extend(entry.children_idx.iter().copied());
            }
        }
        found
    }

    /// `root` together with all of its descendants
    pub fn subtree(&self, root: i64) -> BTreeSet<i64> {
        let mut ids = self.descendants(root);
        if self.by_id.contains_key(&root) {
            ids.insert(root);
        }
        ids
    }

    /// Nested view of the whole forest
    pub fn rooted(&self) -> Vec<NestedProject> {
        self.nested_from(&self.roots)
    }

    /// Nested view starting at the given nodes
    ///
    /// Children are assembled bottom-up in reverse breadth-first order so
    /// the build does not recurse on deep trees.
    pub fn nested_from(&self, tops: &[i64]) -> Vec<NestedProject> {
        let mut order = Vec::new();
        let mut queue: VecDeque<i64> = tops.iter().copied().collect();
        let mut seen = BTreeSet::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(entry) = self.by_id.get(&id) {
                order.push(id);
                queue.extend(entry.children_idx.iter().copied());
            }
        }

        let mut built: HashMap<i64, NestedProject> = HashMap::new();
        for &id in order.iter().rev() {
            let Some(entry) = self.by_id.get(&id) else {
                continue;
            };
            let children = entry
                .children_idx
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(
                id,
                NestedProject {
                    id,
                    name: entry.node.name.clone(),
                    path: self.path(id).unwrap_or(&entry.node.name).to_string(),
                    children,
                },
            );
        }

        tops.iter().filter_map(|id| built.remove(id)).collect()
    }

    /// Find the direct child of `parent` (or a root when `None`) named `name`
    pub fn child_named(&self, parent: Option<i64>, name: &str) -> Option<i64> {
        let siblings: &[i64] = match parent {
            None => &self.roots,
            Some(p) => match self.by_id.get(&p) {
                Some(entry) => &entry.children_idx,
                None => return None,
            },
        };
        siblings
            .iter()
            .copied()
            .find(|id| self.by_id.get(id).is_some_and(|e| e.node.name == name))
    }
}

fn reachable(by_id: &BTreeMap<i64, TreeEntry>, from: &[i64]) -> BTreeSet<i64> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<i64> = from.to_vec();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(entry) = by_id.get(&id) {
            stack.extend(entry.children_idx.iter().copied());
        }
    }
    seen
}
