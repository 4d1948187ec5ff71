use super::node::{Node, NodeId};
use itertools::Itertools;
use std::collections::VecDeque;

/// An arena-backed rooted tree, the working form of a parsed Newick
/// string.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    /// Arena storage for all nodes
    pub(super) nodes: Vec<Node>,

    /// Optional root ID (a tree might be empty or in construction)
    pub(super) root: Option<NodeId>,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new node to the tree. Returns the new node's ID.
    pub fn add_node(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id));
        id
    }

    /// Get number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get root ID
    pub fn get_root(&self) -> Option<NodeId> {
        self.root
    }

    /// Set a node as the root of the tree.
    pub fn set_root(&mut self, id: NodeId) {
        if id < self.nodes.len() {
            self.root = Some(id);
        }
    }

    /// Get a reference to a node by ID.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a mutable reference to a node by ID.
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Add a child to a parent node.
    /// Updates both parent's `children` list and child's `parent` field.
    pub fn add_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<(), String> {
        if parent_id == child_id {
            return Err("Cannot add node as child of itself".to_string());
        }
        if self.get_node(parent_id).is_none() {
            return Err(format!("Parent node {} not found", parent_id));
        }
        if self.get_node(child_id).is_none() {
            return Err(format!("Child node {} not found", child_id));
        }
        if let Some(old_parent) = self.nodes[child_id].parent {
            return Err(format!(
                "Node {} already has parent {}",
                child_id, old_parent
            ));
        }

        self.nodes[child_id].parent = Some(parent_id);
        self.nodes[parent_id].children.push(child_id);
        Ok(())
    }

    /// Get node IDs in levelorder traversal (BFS)
    pub fn levelorder(&self, start_node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start_node);

        while let Some(id) = queue.pop_front() {
            if let Some(node) = self.get_node(id) {
                result.push(id);
                for &child in &node.children {
                    queue.push_back(child);
                }
            }
        }

        result
    }

    /// Serialize the tree to a Newick string (compact format).
    ///
    /// # Example
    /// ```
    /// use halign::libs::phylo::tree::Tree;
    /// let tree = Tree::from_newick("(A:0.1,B:0.2)Root;").unwrap();
    /// assert_eq!(tree.to_newick(), "(A:0.1,B:0.2)Root;");
    /// ```
    pub fn to_newick(&self) -> String {
        match self.root {
            Some(root) => format!("{};", self.newick_of(root)),
            None => ";".to_string(),
        }
    }

    fn newick_of(&self, id: NodeId) -> String {
        let node = &self.nodes[id];
        let mut info = node.name.clone().unwrap_or_default();
        if let Some(len) = node.length {
            info.push_str(&format!(":{}", len));
        }
        if node.children.is_empty() {
            info
        } else {
            let inner = node
                .children
                .iter()
                .map(|&child| self.newick_of(child))
                .join(",");
            format!("({}){}", inner, info)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_basic_ops() {
        let mut tree = Tree::new();
        // 0(root) -> 1, 2
        // 1 -> 3
        let n0 = tree.add_node();
        let n1 = tree.add_node();
        let n2 = tree.add_node();
        let n3 = tree.add_node();

        tree.set_root(n0);
        assert_eq!(tree.add_child(n0, n1), Ok(()));
        assert_eq!(tree.add_child(n0, n2), Ok(()));
        assert_eq!(tree.add_child(n1, n3), Ok(()));

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.get_node(n0).unwrap().children, vec![n1, n2]);
        assert_eq!(tree.get_node(n1).unwrap().parent, Some(n0));
        assert!(tree.add_child(n2, n3).is_err()); // n3 already linked

        // Levelorder: 0, 1, 2, 3
        assert_eq!(tree.levelorder(n0), vec![n0, n1, n2, n3]);
    }
}
