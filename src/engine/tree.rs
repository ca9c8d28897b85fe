use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::model::task::Task;

use super::expansion::ExpansionController;

/// A flattened row in the tree's visible projection
#[derive(Debug, Clone)]
pub struct Row {
    pub id: String,
    pub depth: usize,
    /// Whether a toggle affordance renders. Derived from the fetched child
    /// list when loaded, else from the embedded snapshot — UI affordance
    /// only, never used for data correctness.
    pub has_children: bool,
    pub is_expanded: bool,
    pub is_last_sibling: bool,
    /// For tree continuation lines: whether each ancestor is the last sibling
    pub ancestor_last: Vec<bool>,
}

/// The partially-materialized task tree for one view scope.
///
/// Tasks arrive incrementally: roots at mount, children per expanded node.
/// A fetched child list is authoritative and supersedes the shallow
/// `children` snapshot embedded on the parent.
#[derive(Debug, Default)]
pub struct TreeStore {
    tasks: IndexMap<String, Task>,
    /// Authoritative fetched child lists, by parent id
    children: HashMap<String, Vec<String>>,
    roots: Vec<String>,
    fetch_pending: HashSet<String>,
    fetch_failed: HashSet<String>,
}

impl TreeStore {
    pub fn new(roots: Vec<Task>) -> Self {
        let mut store = TreeStore::default();
        for task in roots {
            store.roots.push(task.id.clone());
            store.tasks.insert(task.id.clone(), task);
        }
        store
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn children_loaded(&self, id: &str) -> bool {
        self.children.contains_key(id)
    }

    pub fn loaded_children(&self, id: &str) -> Option<&[String]> {
        self.children.get(id).map(|v| v.as_slice())
    }

    pub fn fetch_pending(&self, id: &str) -> bool {
        self.fetch_pending.contains(id)
    }

    pub fn fetch_failed(&self, id: &str) -> bool {
        self.fetch_failed.contains(id)
    }

    pub fn mark_fetch_pending(&mut self, id: &str) {
        self.fetch_failed.remove(id);
        self.fetch_pending.insert(id.to_string());
    }

    /// Record a failed child fetch. The node stays expanded (retryable
    /// empty state); rendering shows it childless until a retry succeeds.
    pub fn mark_fetch_failed(&mut self, id: &str) {
        self.fetch_pending.remove(id);
        self.fetch_failed.insert(id.to_string());
    }

    /// Install a fetched child list, materializing the child tasks
    pub fn insert_children(&mut self, parent: &str, tasks: Vec<Task>) {
        self.fetch_pending.remove(parent);
        self.fetch_failed.remove(parent);
        let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        for task in tasks {
            self.tasks.insert(task.id.clone(), task);
        }
        self.children.insert(parent.to_string(), ids);
    }

    /// Merge an updated entity returned by a save
    pub fn apply_saved(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    /// Apply a field write locally to many tasks (bulk-update reconcile)
    pub fn apply_fields(&mut self, ids: &[String], fields: &IndexMap<String, crate::model::task::FieldValue>) {
        for id in ids {
            if let Some(task) = self.tasks.get_mut(id) {
                for (path, value) in fields {
                    task.set_field(path, value.clone());
                }
            }
        }
    }

    /// Remove deleted tasks from the materialized tree
    pub fn remove_many(&mut self, ids: &[String]) {
        for id in ids {
            self.tasks.shift_remove(id);
            self.children.remove(id);
        }
        let gone: HashSet<&String> = ids.iter().collect();
        self.roots.retain(|r| !gone.contains(r));
        for list in self.children.values_mut() {
            list.retain(|c| !gone.contains(c));
        }
    }

    /// Whether a toggle affordance should render for this node: the
    /// fetched list when loaded, otherwise the embedded snapshot.
    pub fn has_renderable_children(&self, id: &str) -> bool {
        if let Some(kids) = self.children.get(id) {
            return !kids.is_empty();
        }
        self.tasks
            .get(id)
            .is_some_and(|t| t.snapshot_has_children())
    }

    /// Every materialized node that can expand inline: has renderable
    /// children and is not a Flow task.
    pub fn expandable_ids(&self) -> Vec<String> {
        self.tasks
            .values()
            .filter(|t| t.kind.expands_inline() && self.has_renderable_children(&t.id))
            .map(|t| t.id.clone())
            .collect()
    }

    /// Flatten the tree into visible rows, recursing only into expanded
    /// non-Flow nodes whose children have been fetched.
    pub fn visible_rows(&self, expansion: &ExpansionController) -> Vec<Row> {
        let mut rows = Vec::new();
        self.flatten(&self.roots, 0, expansion, &[], &mut rows);
        rows
    }

    fn flatten(
        &self,
        ids: &[String],
        depth: usize,
        expansion: &ExpansionController,
        ancestor_last: &[bool],
        rows: &mut Vec<Row>,
    ) {
        let count = ids.len();
        for (i, id) in ids.iter().enumerate() {
            let Some(task) = self.tasks.get(id) else {
                continue;
            };
            let is_last = i == count - 1;
            let has_children = self.has_renderable_children(id);
            let is_expanded = task.kind.expands_inline() && expansion.is_expanded(id);

            rows.push(Row {
                id: id.clone(),
                depth,
                has_children,
                is_expanded,
                is_last_sibling: is_last,
                ancestor_last: ancestor_last.to_vec(),
            });

            if is_expanded
                && let Some(kids) = self.children.get(id)
            {
                let mut next_ancestors = ancestor_last.to_vec();
                next_ancestors.push(is_last);
                self.flatten(kids, depth + 1, expansion, &next_ancestors, rows);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskKind;
    use pretty_assertions::assert_eq;

    fn task(id: &str, snapshot: &[&str]) -> Task {
        let mut t = Task::new(id, id);
        t.children = snapshot.iter().map(|s| s.to_string()).collect();
        t
    }

    fn child(id: &str, parent: &str) -> Task {
        let mut t = Task::new(id, id);
        t.parent = Some(parent.to_string());
        t
    }

    #[test]
    fn snapshot_drives_affordance_until_fetch() {
        let mut tree = TreeStore::new(vec![task("a", &["a1"])]);
        assert!(tree.has_renderable_children("a"));
        // Fetched empty list supersedes the stale snapshot
        tree.insert_children("a", vec![]);
        assert!(!tree.has_renderable_children("a"));
    }

    #[test]
    fn visible_rows_recurse_only_into_expanded_nodes() {
        let mut tree = TreeStore::new(vec![task("a", &["a1"]), task("b", &[])]);
        tree.insert_children("a", vec![child("a1", "a")]);

        let mut exp = ExpansionController::new();
        let ids: Vec<String> = tree.visible_rows(&exp).iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        exp.toggle("a", &tree);
        let rows = tree.visible_rows(&exp);
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["a", "a1", "b"]);
        assert_eq!(rows[1].depth, 1);
        assert_eq!(rows[1].ancestor_last, vec![false]);
    }

    #[test]
    fn flow_children_never_render_inline() {
        let mut flow = task("f", &["f1"]);
        flow.kind = TaskKind::Flow;
        let mut tree = TreeStore::new(vec![flow]);
        tree.insert_children("f", vec![child("f1", "f")]);

        let mut exp = ExpansionController::new();
        exp.toggle("f", &tree);
        let ids: Vec<String> = tree.visible_rows(&exp).iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["f"]);
    }

    #[test]
    fn remove_many_cleans_roots_and_child_lists() {
        let mut tree = TreeStore::new(vec![task("a", &["a1"]), task("b", &[])]);
        tree.insert_children("a", vec![child("a1", "a")]);
        tree.remove_many(&["a1".to_string(), "b".to_string()]);
        assert_eq!(tree.roots(), &["a".to_string()]);
        assert_eq!(tree.loaded_children("a"), Some(&[][..]));
    }
}
