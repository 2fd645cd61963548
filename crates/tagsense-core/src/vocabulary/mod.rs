//! Label vocabulary: the fixed id → tag name mapping of a trained model.
//!
//! The vocabulary is dense: a zero-based array of `max_id + 1` slots where
//! unused ids hold an empty placeholder. It is built once when a model is
//! loaded and shared read-only afterwards.

pub mod tree;

pub use tree::{FlatTag, TagNode, TagTree, PATH_SEPARATOR};

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::VocabularyError;

/// Slots allowed per real label before ids count as too sparse.
const MAX_SLOTS_PER_LABEL: usize = 64;
/// Slot allowance every vocabulary gets regardless of label count.
const MIN_SLOT_LIMIT: usize = 4096;
/// Hard ceiling on vocabulary size.
const MAX_SLOTS: usize = 1 << 20;

/// One slot of the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub id: u32,
    /// Display name; empty for unused slots.
    pub name: String,
    /// Hierarchical name (`"Animals > Cat"`) when a tag tree was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl Label {
    /// Whether this slot is an unused placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty()
    }
}

/// Immutable id → label mapping.
#[derive(Debug, Clone, Default)]
pub struct LabelVocabulary {
    labels: Vec<Label>,
    hierarchical: bool,
}

impl LabelVocabulary {
    /// Build from a model config's `id2label` map (keys are decimal strings).
    pub fn from_id2label(id2label: &HashMap<String, String>) -> Result<Self, VocabularyError> {
        let mut parsed: Vec<(u32, &str)> = Vec::with_capacity(id2label.len());
        for (key, name) in id2label {
            let id = key
                .trim()
                .parse::<u32>()
                .map_err(|_| VocabularyError::InvalidId(key.clone()))?;
            parsed.push((id, name.as_str()));
        }
        Self::from_pairs(parsed)
    }

    /// Build from `(id, name)` pairs, filling gaps with placeholders.
    ///
    /// Ids must stay reasonably dense: an id far beyond the number of
    /// labels would allocate a slot for every gap and is rejected.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (u32, &'a str)>,
    ) -> Result<Self, VocabularyError> {
        let pairs: Vec<(u32, &str)> = pairs.into_iter().collect();
        let limit = pairs
            .len()
            .saturating_mul(MAX_SLOTS_PER_LABEL)
            .clamp(MIN_SLOT_LIMIT, MAX_SLOTS);
        if let Some(&(id, _)) = pairs.iter().find(|(id, _)| *id as usize >= limit) {
            return Err(VocabularyError::InvalidId(id.to_string()));
        }
        let size = pairs.iter().map(|(id, _)| *id as usize + 1).max().unwrap_or(0);

        let mut labels: Vec<Label> = (0..size)
            .map(|id| Label {
                id: id as u32,
                name: String::new(),
                full_name: None,
            })
            .collect();
        for (id, name) in pairs {
            labels[id as usize].name = name.to_string();
        }

        Ok(Self {
            labels,
            hierarchical: false,
        })
    }

    /// Dense label list for a tag tree (what a model is trained against).
    pub fn from_tree(tree: &TagTree) -> Result<Self, VocabularyError> {
        let flat = tree.flatten();
        let mut vocabulary = Self::from_pairs(flat.iter().map(|t| (t.id, t.name.as_str())))?;
        vocabulary.apply_flat(&flat);
        Ok(vocabulary)
    }

    /// Attach hierarchical full names from a tag tree.
    ///
    /// Labels the tree does not know keep their plain name as full name.
    pub fn with_hierarchy(mut self, tree: &TagTree) -> Self {
        self.apply_flat(&tree.flatten());
        self
    }

    fn apply_flat(&mut self, flat: &[FlatTag]) {
        let by_id: HashMap<u32, &FlatTag> = flat.iter().map(|t| (t.id, t)).collect();
        for label in self.labels.iter_mut().filter(|l| !l.is_placeholder()) {
            label.full_name = Some(
                by_id
                    .get(&label.id)
                    .map(|t| t.full_name.clone())
                    .unwrap_or_else(|| label.name.clone()),
            );
        }
        self.hierarchical = true;
    }

    /// Number of slots (L), placeholders included.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn is_hierarchical(&self) -> bool {
        self.hierarchical
    }

    pub fn get(&self, id: usize) -> Option<&Label> {
        self.labels.get(id)
    }

    /// Display name for an id, `None` when out of range.
    pub fn name(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(|l| l.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    /// All slot names in id order.
    pub fn names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name.clone()).collect()
    }

    /// `id -> name` for every slot, ordered by id.
    pub fn id2label(&self) -> BTreeMap<u32, String> {
        self.labels.iter().map(|l| (l.id, l.name.clone())).collect()
    }

    /// `name -> id` for every non-placeholder slot.
    pub fn label2id(&self) -> BTreeMap<String, u32> {
        self.labels
            .iter()
            .filter(|l| !l.is_placeholder())
            .map(|l| (l.name.clone(), l.id))
            .collect()
    }
}
