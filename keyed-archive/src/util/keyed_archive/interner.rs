/*!
 The table of objects built while encoding a keyed archive.
*/

use std::collections::HashMap;

use plist::{Integer, Uid, Value};

use crate::util::keyed_archive::{
    classes::{ClassKind, ClassRegistry},
    models::{ArchiveNode, ClassDescriptor, Leaf, NULL_SENTINEL},
};

/// Values that are stored only once per archive
#[derive(Debug, PartialEq, Eq, Hash)]
enum InternKey {
    String(String),
    Integer(Integer),
    Boolean(bool),
    Class(ClassDescriptor),
}

impl InternKey {
    fn from_node(node: &ArchiveNode) -> Option<Self> {
        match node {
            ArchiveNode::Leaf(Leaf::Null) => Some(InternKey::String(NULL_SENTINEL.to_string())),
            ArchiveNode::Leaf(Leaf::String(text)) => Some(InternKey::String(text.clone())),
            ArchiveNode::Leaf(Leaf::Integer(int)) => Some(InternKey::Integer(*int)),
            ArchiveNode::Leaf(Leaf::Boolean(flag)) => Some(InternKey::Boolean(*flag)),
            ArchiveNode::Class(descriptor) => Some(InternKey::Class(descriptor.clone())),
            _ => None,
        }
    }
}

/// Assigns every archived node its index in the `$objects` table.
///
/// Scalars and class descriptors are deduplicated by value, so equal strings share one
/// reference. Composite nodes are appended every time they are interned, even when an
/// identical node already exists.
#[derive(Debug, Default)]
pub struct ObjectInterner {
    /// Nodes in the order they were registered
    objects: Vec<ArchiveNode>,
    /// References to the nodes that are deduplicated
    refs: HashMap<InternKey, Uid>,
}

impl ObjectInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the reference for a node, adding it to the table if required
    pub fn intern(&mut self, node: ArchiveNode) -> Uid {
        let key = InternKey::from_node(&node);
        if let Some(uid) = key.as_ref().and_then(|key| self.refs.get(key)) {
            return *uid;
        }

        let uid = Uid::new(self.objects.len() as u64);
        self.objects.push(node);
        if let Some(key) = key {
            self.refs.insert(key, uid);
        }
        uid
    }

    /// Get the reference for the class descriptor written for values of `kind`
    pub fn intern_class(&mut self, kind: ClassKind) -> Uid {
        self.intern(ArchiveNode::Class(ClassDescriptor::from(
            ClassRegistry::descriptor(kind),
        )))
    }

    /// The registered nodes, in order, as they are stored in `$objects`
    pub fn snapshot(&self) -> Vec<Value> {
        self.objects.iter().map(ArchiveNode::to_plist).collect()
    }

    /// Remove all registered nodes
    pub fn reset(&mut self) {
        self.objects.clear();
        self.refs.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
