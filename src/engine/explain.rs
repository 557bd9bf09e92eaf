//! engine::explain
//!
//! Lineage-aware description of a single run.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::graph::LineageGraph;
use crate::core::ledger::{LedgerError, Run};
use crate::core::types::{BranchName, RunId};

/// Everything `dusk explain` reports about a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub run: Run,
    /// Branch the run resolves to
    pub branch: BranchName,
    /// Resolved branches along the ancestor chain
    pub branches: BTreeSet<BranchName>,
    /// Ancestors from the parent up to the root
    pub ancestors: Vec<Run>,
    /// Direct children, oldest first
    pub children: Vec<Run>,
    /// Distance from the root
    pub depth: usize,
}

impl Explanation {
    /// Build an explanation from a graph snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if `id` is not in the graph.
    pub fn build(graph: &LineageGraph, id: &RunId) -> Result<Self, LedgerError> {
        let run = graph
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        let branch = graph
            .resolved_branch(id)
            .cloned()
            .unwrap_or_else(|| graph.default_branch().clone());

        Ok(Self {
            ancestors: graph.ancestors(id).into_iter().skip(1).cloned().collect(),
            children: graph.children(id).into_iter().cloned().collect(),
            branches: graph.branches_of(id),
            depth: graph.depth(id),
            branch,
            run,
        })
    }

    /// Whether this run started its branch.
    pub fn starts_branch(&self) -> bool {
        self.run.branch_name.is_some()
    }
}
