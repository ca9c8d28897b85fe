use std::collections::HashSet;

use crate::model::task::TaskKind;

use super::tree::TreeStore;

/// A side effect the caller must carry out after an expansion operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandEffect {
    /// Dispatch a child fetch for this node
    FetchChildren(String),
    /// Flow task toggled: navigate to its scoped view instead of expanding
    OpenFlowView(String),
}

/// Tracks which nodes show children and keeps the expand-all flag truthful.
///
/// One controller per tree instance; the flow drill-down view owns its own,
/// so expansion state never leaks across scopes.
#[derive(Debug, Default)]
pub struct ExpansionController {
    expanded: HashSet<String>,
    expand_all: bool,
}

impl ExpansionController {
    pub fn new() -> Self {
        ExpansionController::default()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn expand_all_active(&self) -> bool {
        self.expand_all
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded.len()
    }

    /// Expand or collapse one node.
    ///
    /// Flow tasks are checked before any fetch or flag logic: they never
    /// enter the expanded set and never trigger a lazy fetch.
    pub fn toggle(&mut self, id: &str, tree: &TreeStore) -> Vec<ExpandEffect> {
        if tree.get(id).is_some_and(|t| t.kind == TaskKind::Flow) {
            return vec![ExpandEffect::OpenFlowView(id.to_string())];
        }

        if self.expanded.remove(id) {
            // A single collapse can never leave "all" true
            self.expand_all = false;
            return Vec::new();
        }

        self.expanded.insert(id.to_string());
        let mut effects = Vec::new();
        if !tree.children_loaded(id) {
            effects.push(ExpandEffect::FetchChildren(id.to_string()));
        }
        self.recompute_flag(tree);
        effects
    }

    /// Expand every node with at least one renderable child (direct
    /// children only — grandchildren load lazily via the cascade), or
    /// collapse everything.
    pub fn set_expand_all(&mut self, enabled: bool, tree: &TreeStore) -> Vec<ExpandEffect> {
        if !enabled {
            self.expanded.clear();
            self.expand_all = false;
            return Vec::new();
        }

        self.expand_all = true;
        let mut effects = Vec::new();
        for id in tree.expandable_ids() {
            if self.expanded.insert(id.clone()) && !tree.children_loaded(&id) {
                effects.push(ExpandEffect::FetchChildren(id));
            }
        }
        effects
    }

    /// Called after a node's children arrive. While expand-all is active,
    /// just-revealed children with children of their own are auto-expanded
    /// — this is how expand-all reaches lazily-loaded subtrees.
    pub fn children_loaded(&mut self, parent: &str, tree: &TreeStore) -> Vec<ExpandEffect> {
        if !self.expand_all {
            return Vec::new();
        }
        let mut effects = Vec::new();
        if let Some(kids) = tree.loaded_children(parent) {
            for kid in kids.to_vec() {
                let expandable = tree
                    .get(&kid)
                    .is_some_and(|t| t.kind.expands_inline())
                    && tree.has_renderable_children(&kid);
                if expandable && self.expanded.insert(kid.clone()) && !tree.children_loaded(&kid) {
                    effects.push(ExpandEffect::FetchChildren(kid));
                }
            }
        }
        effects
    }

    /// Derive the expand-all flag. Off when some expandable node is not
    /// expanded; on when every expandable node is expanded with its
    /// children fetched. In between (all expanded, fetches unresolved) the
    /// flag keeps its value: the expandable set is about to grow, so
    /// turning it on would be premature and turning it off would break an
    /// in-progress cascade. Left untouched when the tree has no expandable
    /// nodes (roots may still be loading).
    pub fn recompute_flag(&mut self, tree: &TreeStore) {
        let expandable = tree.expandable_ids();
        if expandable.is_empty() {
            return;
        }
        if expandable.iter().any(|id| !self.expanded.contains(id)) {
            self.expand_all = false;
        } else if expandable.iter().all(|id| tree.children_loaded(id)) {
            self.expand_all = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Task;
    use pretty_assertions::assert_eq;

    fn task(id: &str, snapshot: &[&str]) -> Task {
        let mut t = Task::new(id, id);
        t.children = snapshot.iter().map(|s| s.to_string()).collect();
        t
    }

    fn child(id: &str, parent: &str, snapshot: &[&str]) -> Task {
        let mut t = task(id, snapshot);
        t.parent = Some(parent.to_string());
        t
    }

    fn two_root_tree() -> TreeStore {
        TreeStore::new(vec![task("a", &["a1"]), task("b", &["b1"])])
    }

    #[test]
    fn toggle_expands_and_requests_fetch_once() {
        let tree = two_root_tree();
        let mut exp = ExpansionController::new();
        let effects = exp.toggle("a", &tree);
        assert_eq!(effects, vec![ExpandEffect::FetchChildren("a".into())]);
        assert!(exp.is_expanded("a"));
    }

    #[test]
    fn toggle_with_cached_children_fetches_nothing() {
        let mut tree = two_root_tree();
        tree.insert_children("a", vec![child("a1", "a", &[])]);
        let mut exp = ExpansionController::new();
        assert!(exp.toggle("a", &tree).is_empty());
    }

    #[test]
    fn expanding_every_node_sets_the_flag() {
        let mut tree = two_root_tree();
        tree.insert_children("a", vec![child("a1", "a", &[])]);
        tree.insert_children("b", vec![child("b1", "b", &[])]);
        let mut exp = ExpansionController::new();
        exp.toggle("a", &tree);
        assert!(!exp.expand_all_active());
        exp.toggle("b", &tree);
        assert!(exp.expand_all_active());
    }

    #[test]
    fn flag_stays_off_while_a_child_fetch_is_unresolved() {
        let tree = two_root_tree();
        let mut exp = ExpansionController::new();
        exp.toggle("a", &tree);
        exp.toggle("b", &tree);
        // Both expanded, but neither child list has arrived: the set of
        // expandable nodes is still growing.
        assert!(!exp.expand_all_active());
    }

    #[test]
    fn single_collapse_clears_the_flag() {
        let tree = two_root_tree();
        let mut exp = ExpansionController::new();
        exp.set_expand_all(true, &tree);
        assert!(exp.expand_all_active());
        exp.toggle("a", &tree);
        assert!(!exp.expand_all_active());
        assert!(exp.is_expanded("b"));
    }

    #[test]
    fn set_expand_all_false_clears_everything() {
        let tree = two_root_tree();
        let mut exp = ExpansionController::new();
        exp.set_expand_all(true, &tree);
        exp.set_expand_all(false, &tree);
        assert!(!exp.is_expanded("a"));
        assert!(!exp.is_expanded("b"));
        assert!(!exp.expand_all_active());
    }

    #[test]
    fn cascade_expands_revealed_children_with_children() {
        let mut tree = two_root_tree();
        let mut exp = ExpansionController::new();
        let effects = exp.set_expand_all(true, &tree);
        assert_eq!(effects.len(), 2);

        // a's children arrive; a1 itself has a snapshot child
        tree.insert_children("a", vec![child("a1", "a", &["a1x"])]);
        let effects = exp.children_loaded("a", &tree);
        assert_eq!(effects, vec![ExpandEffect::FetchChildren("a1".into())]);
        assert!(exp.is_expanded("a1"));
    }

    #[test]
    fn cascade_is_inert_without_expand_all() {
        let mut tree = two_root_tree();
        let mut exp = ExpansionController::new();
        exp.toggle("a", &tree);
        exp.toggle("a", &tree); // collapse again: flag off
        tree.insert_children("a", vec![child("a1", "a", &["a1x"])]);
        assert!(exp.children_loaded("a", &tree).is_empty());
        assert!(!exp.is_expanded("a1"));
    }

    #[test]
    fn flow_task_opens_scoped_view_and_never_expands() {
        let mut flow = task("f", &["f1"]);
        flow.kind = TaskKind::Flow;
        let tree = TreeStore::new(vec![task("a", &["a1"]), flow]);

        let mut exp = ExpansionController::new();
        let effects = exp.toggle("f", &tree);
        assert_eq!(effects, vec![ExpandEffect::OpenFlowView("f".into())]);
        assert!(!exp.is_expanded("f"));

        // expand-all skips it too
        let effects = exp.set_expand_all(true, &tree);
        assert_eq!(effects, vec![ExpandEffect::FetchChildren("a".into())]);
        assert!(!exp.is_expanded("f"));
    }

    #[test]
    fn leaf_only_tree_leaves_flag_untouched() {
        let tree = TreeStore::new(vec![task("a", &[]), task("b", &[])]);
        let mut exp = ExpansionController::new();
        exp.recompute_flag(&tree);
        assert!(!exp.expand_all_active());
    }
}
