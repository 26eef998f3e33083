//! Mutable phylogenetic trees backed by an arena of nodes.
//!
//! A [`Tree`] owns its nodes in a flat arena; parent/child links are
//! [`NodeId`] indices rather than references, which keeps the structure
//! freely mutable, cheap to copy and trivially `Send`. A node is "active"
//! while its branch length is unset and "fixed" once the length has been
//! written; the simulator relies on that distinction but the tree itself
//! only stores it.

use std::collections::HashMap;

use streaming_iterator::StreamingIterator;

use crate::metadata::{Metadata, STATE_KEY};
use crate::{NodeId, TreesimError};

/// One node of a [`Tree`].
#[derive(Clone, Debug)]
pub struct TreeNode {
    name: String,
    branch_length: Option<f64>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    metadata: Metadata,
}

impl TreeNode {
    fn new(name: String) -> Self {
        Self {
            name,
            branch_length: None,
            parent: None,
            children: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// The name of the node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The branch length to the parent, if it has been fixed.
    pub fn branch_length(&self) -> Option<f64> {
        self.branch_length
    }

    /// Set the branch length to the parent.
    pub fn set_branch_length(&mut self, length: f64) {
        self.branch_length = Some(length);
    }

    /// The parent of the node, if any.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The children of the node, in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The metadata annotations of the node.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable access to the metadata annotations of the node.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// The population label stored under the reserved `"state"` key.
    pub fn state(&self) -> Option<&str> {
        self.metadata.get(STATE_KEY).and_then(|v| v.as_str())
    }
}

/// The order in which [`Tree::traverse`] visits nodes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NodeTraversalOrder {
    /// Parents before their descendants.
    Preorder,
    /// Descendants before their parents.
    Postorder,
}

/// A tree (or forest fragment) of [`TreeNode`]s.
#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new, unattached node and return its id.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId::from(self.nodes.len());
        self.nodes.push(TreeNode::new(name.into()));
        id
    }

    /// The number of nodes in the arena, attached or not.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a node of this arena.
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.as_usize()]
    }

    /// Mutable access to the node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a node of this arena.
    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.as_usize()]
    }

    /// The first node without a parent, if any.
    pub fn root(&self) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.parent.is_none())
            .map(NodeId::from)
    }

    /// Attach `child` under `parent`.
    ///
    /// # Errors
    ///
    /// [`TreesimError::State`] when `child` already has a parent; a node
    /// may only ever have one.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreesimError> {
        if let Some(existing) = self.node(child).parent {
            return Err(TreesimError::state(format!(
                "node {} already has a parent ({})",
                self.node(child).name,
                existing
            )));
        }
        self.link(parent, child);
        Ok(())
    }

    // Raw link; callers have checked that `child` is parentless.
    pub(crate) fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.as_usize()].parent = Some(parent);
        self.nodes[parent.as_usize()].children.push(child);
    }

    /// Detach `child` from `parent`.
    ///
    /// The remaining children keep their order.
    ///
    /// # Errors
    ///
    /// [`TreesimError::State`] when `child` is not currently a child of
    /// `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreesimError> {
        let position = self.nodes[parent.as_usize()]
            .children
            .iter()
            .position(|c| *c == child);
        match position {
            Some(position) => {
                self.nodes[parent.as_usize()].children.remove(position);
                self.nodes[child.as_usize()].parent = None;
                Ok(())
            }
            None => Err(TreesimError::state(format!(
                "node {} is not a child of node {}",
                self.node(child).name,
                self.node(parent).name
            ))),
        }
    }

    /// Move `child` under `new_parent` (or detach it when `None`),
    /// updating both sides of each link.
    ///
    /// # Errors
    ///
    /// [`TreesimError::State`] when an intermediate detach/attach fails.
    pub fn update_parent(
        &mut self,
        child: NodeId,
        new_parent: Option<NodeId>,
    ) -> Result<(), TreesimError> {
        if let Some(current) = self.node(child).parent {
            self.remove_child(current, child)?;
        }
        if let Some(parent) = new_parent {
            self.add_child(parent, child)?;
        }
        Ok(())
    }

    /// Iterate over the ids of the subtree rooted at `root`.
    pub fn traverse(&self, root: NodeId, order: NodeTraversalOrder) -> Traversal<'_> {
        Traversal {
            tree: self,
            order,
            stack: vec![(root, false)],
        }
    }

    /// Lending iteration over the nodes of the subtree rooted at `root`.
    ///
    /// # Examples
    ///
    /// ```
    /// use streaming_iterator::StreamingIterator;
    /// use treesim::{NodeTraversalOrder, Tree};
    ///
    /// let mut tree = Tree::new();
    /// let root = tree.add_node("root");
    /// let child = tree.add_node("child");
    /// tree.add_child(root, child).unwrap();
    ///
    /// let mut names = vec![];
    /// let mut nodes = tree.nodes(root, NodeTraversalOrder::Preorder);
    /// while let Some(node) = nodes.next() {
    ///     names.push(node.name().to_string());
    /// }
    /// assert_eq!(names, vec!["root", "child"]);
    /// ```
    pub fn nodes(&self, root: NodeId, order: NodeTraversalOrder) -> Nodes<'_> {
        Nodes {
            tree: self,
            iter: self.traverse(root, order),
            current: None,
        }
    }

    /// The ids of the leaves below `root`, in traversal order.
    pub fn leaves(&self, root: NodeId) -> Vec<NodeId> {
        self.traverse(root, NodeTraversalOrder::Preorder)
            .filter(|id| self.node(*id).is_leaf())
            .collect()
    }

    /// The number of leaves below `root`.
    pub fn num_leaves(&self, root: NodeId) -> usize {
        let mut count = 0;
        let mut nodes = self.nodes(root, NodeTraversalOrder::Preorder);
        while let Some(node) = nodes.next() {
            if node.is_leaf() {
                count += 1;
            }
        }
        count
    }

    /// Whether every internal node below `root` has exactly two children.
    pub fn is_binary(&self, root: NodeId) -> bool {
        self.traverse(root, NodeTraversalOrder::Preorder)
            .all(|id| self.node(id).is_leaf() || self.node(id).children().len() == 2)
    }

    /// Sum of branch lengths on the path from the arena's root down to
    /// `id`, inclusive. A missing length on the root counts as zero.
    ///
    /// # Errors
    ///
    /// [`TreesimError::State`] when a non-root node on the path has no
    /// branch length yet.
    pub fn distance_from_root(&self, id: NodeId) -> Result<f64, TreesimError> {
        let mut total = 0.0;
        let mut current = id;
        loop {
            let node = self.node(current);
            match (node.parent, node.branch_length) {
                (Some(parent), Some(length)) => {
                    total += length;
                    current = parent;
                }
                (Some(_), None) => {
                    return Err(TreesimError::state(format!(
                        "branch length of node {} is not set",
                        node.name
                    )))
                }
                (None, length) => return Ok(total + length.unwrap_or(0.0)),
            }
        }
    }

    /// Distance in branch-length units from `root` to its farthest leaf.
    ///
    /// # Errors
    ///
    /// [`TreesimError::State`] when a branch length below `root` is unset.
    pub fn height(&self, root: NodeId) -> Result<f64, TreesimError> {
        let origin = self.distance_from_root(root)?;
        let mut height: f64 = 0.0;
        for leaf in self.leaves(root) {
            height = height.max(self.distance_from_root(leaf)? - origin);
        }
        Ok(height)
    }

    /// Deep-copy the subtree rooted at `root` into a fresh, compact arena.
    ///
    /// The copy's root lands at id 0 with no parent; names, branch lengths
    /// and metadata are duplicated.
    pub fn extract(&self, root: NodeId) -> Tree {
        let mut out = Tree::new();
        let mut mapping: HashMap<NodeId, NodeId> = HashMap::new();
        for id in self.traverse(root, NodeTraversalOrder::Preorder) {
            let node = self.node(id);
            let new_id = out.add_node(node.name.clone());
            out.nodes[new_id.as_usize()].branch_length = node.branch_length;
            out.nodes[new_id.as_usize()].metadata = node.metadata.clone();
            if id != root {
                if let Some(parent) = node.parent {
                    // Preorder guarantees the parent was copied already.
                    out.link(mapping[&parent], new_id);
                }
            }
            mapping.insert(id, new_id);
        }
        out
    }
}

/// Iterator over node ids returned by [`Tree::traverse`].
pub struct Traversal<'a> {
    tree: &'a Tree,
    order: NodeTraversalOrder,
    stack: Vec<(NodeId, bool)>,
}

impl Iterator for Traversal<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, expanded)) = self.stack.pop() {
            match self.order {
                NodeTraversalOrder::Preorder => {
                    for child in self.tree.node(id).children.iter().rev() {
                        self.stack.push((*child, false));
                    }
                    return Some(id);
                }
                NodeTraversalOrder::Postorder => {
                    if expanded {
                        return Some(id);
                    }
                    self.stack.push((id, true));
                    for child in self.tree.node(id).children.iter().rev() {
                        self.stack.push((*child, false));
                    }
                }
            }
        }
        None
    }
}

/// Lending iterator over node references returned by [`Tree::nodes`].
pub struct Nodes<'a> {
    tree: &'a Tree,
    iter: Traversal<'a>,
    current: Option<NodeId>,
}

impl StreamingIterator for Nodes<'_> {
    type Item = TreeNode;

    fn advance(&mut self) {
        self.current = self.iter.next();
    }

    fn get(&self) -> Option<&Self::Item> {
        self.current.map(|id| self.tree.node(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cherry() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.add_node("root");
        let left = tree.add_node("left");
        let right = tree.add_node("right");
        tree.add_child(root, left).unwrap();
        tree.add_child(root, right).unwrap();
        (tree, root, left, right)
    }

    #[test]
    fn test_traversal_orders() {
        let (tree, root, ..) = cherry();
        let pre: Vec<String> = tree
            .traverse(root, NodeTraversalOrder::Preorder)
            .map(|id| tree.node(id).name().to_string())
            .collect();
        assert_eq!(pre, vec!["root", "left", "right"]);
        let post: Vec<String> = tree
            .traverse(root, NodeTraversalOrder::Postorder)
            .map(|id| tree.node(id).name().to_string())
            .collect();
        assert_eq!(post, vec!["left", "right", "root"]);
    }

    #[test]
    fn test_single_parent_invariant() {
        let (mut tree, _root, left, right) = cherry();
        assert!(tree.add_child(right, left).is_err());
        assert!(tree.remove_child(left, right).is_err());
    }

    #[test]
    fn test_extract_is_independent() {
        let (mut tree, root, left, _right) = cherry();
        let copy = tree.extract(root);
        tree.node_mut(left).set_branch_length(1.0);
        let copied_left = copy
            .traverse(copy.root().unwrap(), NodeTraversalOrder::Preorder)
            .find(|id| copy.node(*id).name() == "left")
            .unwrap();
        assert_eq!(copy.node(copied_left).branch_length(), None);
    }
}
