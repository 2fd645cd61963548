//! Tag hierarchy stored as an arena.
//!
//! `tags.json` is a forest of nested nodes. It is read once into a flat arena
//! where every node records its parent id, then flattened with a single
//! pre-order pass that builds each node's full name from its parent's.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::VocabularyError;

/// Separator between ancestor names in a full name.
pub const PATH_SEPARATOR: &str = " > ";

/// Wire shape of one node in `tags.json`.
#[derive(Debug, Deserialize)]
struct RawTag {
    id: u32,
    name: String,
    #[serde(default)]
    children: Vec<RawTag>,
}

/// One node of the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNode {
    pub id: u32,
    pub name: String,
    /// Id of the enclosing node; `None` for roots.
    pub parent_id: Option<u32>,
}

/// A flattened node with its hierarchical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatTag {
    pub id: u32,
    pub name: String,
    pub full_name: String,
}

/// A forest of tags indexed by id.
#[derive(Debug, Clone, Default)]
pub struct TagTree {
    nodes: Vec<TagNode>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    by_id: HashMap<u32, usize>,
}

impl TagTree {
    /// Parse a `tags.json` document.
    pub fn from_json(json: &str) -> Result<Self, VocabularyError> {
        let raw: Vec<RawTag> = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Read and parse a `tags.json` file.
    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn from_raw(forest: Vec<RawTag>) -> Result<Self, VocabularyError> {
        let mut tree = Self::default();

        // (raw node, arena index of parent)
        let mut stack: Vec<(RawTag, Option<usize>)> =
            forest.into_iter().rev().map(|t| (t, None)).collect();

        while let Some((raw, parent)) = stack.pop() {
            if tree.by_id.contains_key(&raw.id) {
                return Err(VocabularyError::DuplicateId(raw.id));
            }

            let index = tree.nodes.len();
            let parent_id = parent.map(|p| tree.nodes[p].id);
            tree.nodes.push(TagNode {
                id: raw.id,
                name: raw.name,
                parent_id,
            });
            tree.children.push(Vec::new());
            tree.by_id.insert(raw.id, index);

            match parent {
                Some(p) => tree.children[p].push(index),
                None => tree.roots.push(index),
            }

            for child in raw.children.into_iter().rev() {
                stack.push((child, Some(index)));
            }
        }

        Ok(tree)
    }

    /// Number of nodes in the forest.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by id.
    pub fn get(&self, id: u32) -> Option<&TagNode> {
        self.by_id.get(&id).map(|&i| &self.nodes[i])
    }

    /// Largest id in the forest.
    pub fn max_id(&self) -> Option<u32> {
        self.nodes.iter().map(|n| n.id).max()
    }

    /// Pre-order flattening: every parent precedes its children.
    pub fn flatten(&self) -> Vec<FlatTag> {
        let mut flat = Vec::with_capacity(self.nodes.len());
        // (arena index, parent's full name)
        let mut stack: Vec<(usize, Option<String>)> =
            self.roots.iter().rev().map(|&r| (r, None)).collect();

        while let Some((index, prefix)) = stack.pop() {
            let node = &self.nodes[index];
            let full_name = match prefix {
                Some(prefix) => format!("{prefix}{PATH_SEPARATOR}{}", node.name),
                None => node.name.clone(),
            };

            for &child in self.children[index].iter().rev() {
                stack.push((child, Some(full_name.clone())));
            }

            flat.push(FlatTag {
                id: node.id,
                name: node.name.clone(),
                full_name,
            });
        }

        flat
    }

    /// Map from id to flattened entry.
    pub fn flatten_by_id(&self) -> HashMap<u32, FlatTag> {
        self.flatten().into_iter().map(|t| (t.id, t)).collect()
    }
}
