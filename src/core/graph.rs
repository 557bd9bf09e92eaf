//! core::graph
//!
//! Lineage graph over runs.
//!
//! # Architecture
//!
//! The lineage graph is a forest where:
//! - Nodes are runs
//! - Edges point from child to parent (the run's `parent_id`)
//! - Roots are runs without a parent
//!
//! It is derived, never stored: the run store rebuilds it after every
//! mutation and hands out immutable snapshots.
//!
//! # Branch Resolution
//!
//! A run belongs to the first `branch_name` found walking up from the run to
//! its root, or to the default branch when none is found. Each branch's head
//! is its most recently created run.
//!
//! # Invariants
//!
//! - Every parent pointer resolves to a run in the graph
//! - The graph is acyclic
//! - Child and root orderings are chronological (`created_at`, then `seq`)

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use thiserror::Error;

use super::ledger::schema::{Branch, Run};
use super::types::{BranchName, RunId};

/// Errors from building a lineage graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("run {run} references missing parent {parent}")]
    DanglingParent { run: RunId, parent: RunId },

    #[error("parent chain of run {0} forms a cycle")]
    Cycle(RunId),
}

/// Output layout for [`LineageGraph::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    /// Roots grouped by branch, children nested under parents.
    Tree,
    /// Every run in creation order.
    Timeline,
}

/// Immutable lineage index built from a set of runs.
#[derive(Debug, Clone)]
pub struct LineageGraph {
    runs: HashMap<RunId, Run>,
    children: HashMap<RunId, Vec<RunId>>,
    roots: Vec<RunId>,
    resolved: HashMap<RunId, BranchName>,
    /// Branch members in creation order.
    members: BTreeMap<BranchName, Vec<RunId>>,
    default_branch: BranchName,
}

impl LineageGraph {
    /// An empty graph.
    pub fn empty(default_branch: BranchName) -> Self {
        Self {
            runs: HashMap::new(),
            children: HashMap::new(),
            roots: Vec::new(),
            resolved: HashMap::new(),
            members: BTreeMap::new(),
            default_branch,
        }
    }

    /// Build the graph from a set of runs.
    ///
    /// # Errors
    ///
    /// - [`GraphError::DanglingParent`] if a parent id is not among `runs`
    /// - [`GraphError::Cycle`] if some runs are unreachable from any root
    pub fn build(
        runs: impl IntoIterator<Item = Run>,
        default_branch: BranchName,
    ) -> Result<Self, GraphError> {
        let runs: HashMap<RunId, Run> = runs.into_iter().map(|r| (r.id.clone(), r)).collect();

        let mut children: HashMap<RunId, Vec<RunId>> = HashMap::new();
        let mut roots = Vec::new();
        for run in runs.values() {
            match &run.parent_id {
                Some(parent) if !runs.contains_key(parent) => {
                    return Err(GraphError::DanglingParent {
                        run: run.id.clone(),
                        parent: parent.clone(),
                    });
                }
                Some(parent) => children
                    .entry(parent.clone())
                    .or_default()
                    .push(run.id.clone()),
                None => roots.push(run.id.clone()),
            }
        }

        let chrono = |a: &RunId, b: &RunId| runs[a].chrono_cmp(&runs[b]);
        roots.sort_by(chrono);
        for list in children.values_mut() {
            list.sort_by(chrono);
        }

        // Resolve branches top-down; anything not reached hangs off a cycle.
        let mut resolved: HashMap<RunId, BranchName> = HashMap::with_capacity(runs.len());
        let mut queue: VecDeque<RunId> = roots.iter().cloned().collect();
        while let Some(id) = queue.pop_front() {
            let run = &runs[&id];
            let branch = match (&run.branch_name, &run.parent_id) {
                (Some(name), _) => name.clone(),
                (None, Some(parent)) => resolved[parent].clone(),
                (None, None) => default_branch.clone(),
            };
            resolved.insert(id.clone(), branch);
            if let Some(kids) = children.get(&id) {
                queue.extend(kids.iter().cloned());
            }
        }

        if resolved.len() != runs.len() {
            let stuck = runs
                .keys()
                .filter(|id| !resolved.contains_key(*id))
                .min()
                .cloned();
            if let Some(id) = stuck {
                return Err(GraphError::Cycle(id));
            }
        }

        let mut members: BTreeMap<BranchName, Vec<RunId>> = BTreeMap::new();
        for (id, branch) in &resolved {
            members.entry(branch.clone()).or_default().push(id.clone());
        }
        for list in members.values_mut() {
            list.sort_by(chrono);
        }

        Ok(Self {
            runs,
            children,
            roots,
            resolved,
            members,
            default_branch,
        })
    }

    /// Number of runs in the graph.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether the graph has no runs.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Look up a run.
    pub fn get(&self, id: &RunId) -> Option<&Run> {
        self.runs.get(id)
    }

    /// Whether the graph contains `id`.
    pub fn contains(&self, id: &RunId) -> bool {
        self.runs.contains_key(id)
    }

    /// Iterate over all runs in unspecified order.
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.runs.values()
    }

    /// All runs in creation order.
    pub fn chronological(&self) -> Vec<&Run> {
        let mut runs: Vec<&Run> = self.runs.values().collect();
        runs.sort_by(|a, b| a.chrono_cmp(b));
        runs
    }

    /// Root runs in creation order.
    pub fn roots(&self) -> Vec<&Run> {
        self.roots.iter().map(|id| &self.runs[id]).collect()
    }

    /// Direct children of a run in creation order.
    pub fn children(&self, id: &RunId) -> Vec<&Run> {
        self.children
            .get(id)
            .map(|kids| kids.iter().map(|k| &self.runs[k]).collect())
            .unwrap_or_default()
    }

    /// Number of direct children.
    pub fn child_count(&self, id: &RunId) -> usize {
        self.children.get(id).map_or(0, Vec::len)
    }

    /// The run and its ancestors, leaf-first (the run itself, its parent, ...,
    /// the root).
    ///
    /// Returns an empty vector for an unknown id.
    pub fn ancestors(&self, id: &RunId) -> Vec<&Run> {
        let mut result = Vec::new();
        let mut current = self.runs.get(id);

        while let Some(run) = current {
            result.push(run);
            current = run.parent_id.as_ref().and_then(|p| self.runs.get(p));
        }

        result
    }

    /// Number of ancestors above the run (0 for roots).
    pub fn depth(&self, id: &RunId) -> usize {
        self.ancestors(id).len().saturating_sub(1)
    }

    /// The run followed by all of its descendants in breadth-first order,
    /// siblings in creation order.
    ///
    /// Returns an empty vector for an unknown id.
    pub fn subtree(&self, id: &RunId) -> Vec<&Run> {
        let mut result = Vec::new();
        let Some(root) = self.runs.get(id) else {
            return result;
        };

        let mut queue = VecDeque::from([root]);
        while let Some(run) = queue.pop_front() {
            result.push(run);
            queue.extend(self.children(&run.id));
        }

        result
    }

    /// Branch a run resolves to.
    pub fn resolved_branch(&self, id: &RunId) -> Option<&BranchName> {
        self.resolved.get(id)
    }

    /// Branches touched along the run's ancestor chain.
    pub fn branches_of(&self, id: &RunId) -> BTreeSet<BranchName> {
        self.ancestors(id)
            .into_iter()
            .filter_map(|run| self.resolved.get(&run.id).cloned())
            .collect()
    }

    /// The default branch name.
    pub fn default_branch(&self) -> &BranchName {
        &self.default_branch
    }

    /// Whether a branch currently has any runs.
    pub fn has_branch(&self, name: &BranchName) -> bool {
        self.members.contains_key(name)
    }

    /// Runs on a branch in creation order.
    pub fn branch_members(&self, name: &BranchName) -> Vec<&Run> {
        self.members
            .get(name)
            .map(|ids| ids.iter().map(|id| &self.runs[id]).collect())
            .unwrap_or_default()
    }

    /// Summaries of every live branch, sorted by name.
    pub fn branch_summaries(&self) -> Vec<Branch> {
        self.members
            .iter()
            .filter_map(|(name, ids)| {
                let head = ids.last()?;
                let start = ids
                    .iter()
                    .find(|id| self.runs[*id].branch_name.as_ref() == Some(name))
                    .cloned();
                Some(Branch {
                    name: name.clone(),
                    head_run_id: head.clone(),
                    start_run_id: start,
                    run_count: ids.len(),
                })
            })
            .collect()
    }

    /// Render the graph as text.
    ///
    /// Returns an empty string for an empty graph.
    ///
    /// # Example
    ///
    /// ```
    /// use dusk::core::graph::{LineageGraph, RenderFormat};
    /// use dusk::core::ledger::Run;
    /// use dusk::core::types::{BranchName, RunId, RunStatus, UtcTimestamp};
    ///
    /// let run = Run {
    ///     id: RunId::generate(),
    ///     parent_id: None,
    ///     branch_name: None,
    ///     prompt: "explain X".into(),
    ///     model: "gpt-4".into(),
    ///     status: RunStatus::Pending,
    ///     output: None,
    ///     created_at: UtcTimestamp::now(),
    ///     settled_at: None,
    ///     duration_ms: None,
    ///     seq: 1,
    /// };
    /// let graph = LineageGraph::build([run], BranchName::new("main").unwrap()).unwrap();
    ///
    /// let tree = graph.render(RenderFormat::Tree);
    /// assert!(tree.starts_with("main\n└── run-"));
    /// ```
    pub fn render(&self, format: RenderFormat) -> String {
        match format {
            RenderFormat::Tree => self.render_tree(),
            RenderFormat::Timeline => self.render_timeline(),
        }
    }

    fn render_tree(&self) -> String {
        let mut groups: BTreeMap<&BranchName, Vec<&Run>> = BTreeMap::new();
        for root in self.roots() {
            groups
                .entry(&self.resolved[&root.id])
                .or_default()
                .push(root);
        }

        // Default branch first, the rest by name.
        let mut ordered: Vec<(&BranchName, Vec<&Run>)> = Vec::with_capacity(groups.len());
        if let Some(roots) = groups.remove(&self.default_branch) {
            ordered.push((&self.default_branch, roots));
        }
        ordered.extend(groups);

        let mut out = String::new();
        for (branch, roots) in ordered {
            out.push_str(branch.as_str());
            out.push('\n');
            let count = roots.len();
            for (i, root) in roots.into_iter().enumerate() {
                self.render_node(root, "", i + 1 == count, &mut out);
            }
        }
        out
    }

    fn render_node(&self, run: &Run, prefix: &str, last: bool, out: &mut String) {
        let connector = if last { "└── " } else { "├── " };
        out.push_str(&format!("{prefix}{connector}{}\n", node_label(run)));

        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        let kids = self.children(&run.id);
        let count = kids.len();
        for (i, child) in kids.into_iter().enumerate() {
            self.render_node(child, &child_prefix, i + 1 == count, out);
        }
    }

    fn render_timeline(&self) -> String {
        let runs = self.chronological();
        let width = runs
            .iter()
            .map(|r| self.resolved[&r.id].as_str().len())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for run in runs {
            out.push_str(&format!(
                "{}  {}  {:<width$}  {} ({}) \"{}\"\n",
                run.created_at.display_short(),
                run.id.short(),
                self.resolved[&run.id].as_str(),
                run.status,
                run.model,
                snippet(&run.prompt, 40),
            ));
        }
        out
    }
}

fn node_label(run: &Run) -> String {
    let mut label = format!(
        "{} ({}) {} \"{}\"",
        run.id.short(),
        run.model,
        run.status,
        snippet(&run.prompt, 40)
    );
    if let Some(branch) = &run.branch_name {
        label.push_str(&format!(" [branch: {branch}]"));
    }
    label
}

/// Single-line excerpt of at most `max` characters.
///
/// # Example
///
/// ```
/// use dusk::core::graph::snippet;
///
/// assert_eq!(snippet("short", 10), "short");
/// assert_eq!(snippet("line one\nline two", 40), "line one line two");
/// assert_eq!(snippet("abcdefghij", 5), "ab...");
/// ```
pub fn snippet(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let keep = max.saturating_sub(3);
    let mut cut: String = flat.chars().take(keep).collect();
    cut.push_str("...");
    cut
}
