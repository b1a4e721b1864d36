use std::collections::BTreeMap;

use crate::descriptor::ModuleDescriptor;

/// Generated modules grouped by category path.
#[derive(Debug, Clone, PartialEq)]
pub enum NamespaceNode {
    /// Modules sharing a terminal category, written together as one file.
    Leaf(BTreeMap<String, ModuleDescriptor>),
    /// Sub-categories, written as a sub-directory.
    Branch(BTreeMap<String, NamespaceNode>),
}

impl Default for NamespaceNode {
    fn default() -> Self {
        NamespaceNode::Branch(BTreeMap::new())
    }
}

impl NamespaceNode {
    /// Files `descriptor` under its category path.
    pub fn insert(&mut self, descriptor: ModuleDescriptor) {
        let path: Vec<String> = descriptor
            .category_path()
            .into_iter()
            .map(str::to_owned)
            .collect();
        self.insert_at(&path, descriptor);
    }

    fn insert_at(&mut self, path: &[String], descriptor: ModuleDescriptor) {
        let NamespaceNode::Branch(children) = self.as_branch() else {
            unreachable!("as_branch always yields a branch");
        };

        match path {
            [] => {
                // Stored beside sub-categories: one single-module leaf. A
                // sub-category of the same name keeps its modules and the
                // leaf moves inside it.
                let name = descriptor.name.clone();
                match children.get_mut(&name) {
                    Some(node) => match node {
                        NamespaceNode::Leaf(modules) => {
                            modules.insert(name, descriptor);
                        }
                        NamespaceNode::Branch(_) => node.insert_at(&[], descriptor),
                    },
                    None => {
                        children.insert(
                            name.clone(),
                            NamespaceNode::Leaf(BTreeMap::from([(name, descriptor)])),
                        );
                    }
                }
            }
            [group] => {
                let node = children
                    .entry(group.clone())
                    .or_insert_with(|| NamespaceNode::Leaf(BTreeMap::new()));
                match node {
                    NamespaceNode::Leaf(modules) => {
                        modules.insert(descriptor.name.clone(), descriptor);
                    }
                    NamespaceNode::Branch(_) => node.insert_at(&[], descriptor),
                }
            }
            [segment, rest @ ..] => children
                .entry(segment.clone())
                .or_default()
                .insert_at(rest, descriptor),
        }
    }

    /// Turns a leaf into a branch holding one single-module leaf per module.
    fn as_branch(&mut self) -> &mut NamespaceNode {
        if let NamespaceNode::Leaf(modules) = self {
            let children = std::mem::take(modules)
                .into_iter()
                .map(|(name, descriptor)| {
                    (
                        name.clone(),
                        NamespaceNode::Leaf(BTreeMap::from([(name, descriptor)])),
                    )
                })
                .collect();
            *self = NamespaceNode::Branch(children);
        }
        self
    }

    /// Number of modules held anywhere below this node.
    pub fn module_count(&self) -> usize {
        match self {
            NamespaceNode::Leaf(modules) => modules.len(),
            NamespaceNode::Branch(children) => children.values().map(Self::module_count).sum(),
        }
    }
}
