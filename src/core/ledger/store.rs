//! core::ledger::store
//!
//! The run record store.
//!
//! # Architecture
//!
//! `RunStore` owns a storage backend and an in-memory copy of every run.
//! Each mutation:
//!
//! 1. Validates against the current state
//! 2. Builds the next state and its lineage graph
//! 3. Writes the change through the backend
//! 4. Commits the next state in memory
//!
//! All four steps happen under one mutex, so writes are serialized and
//! readers never see a graph that disagrees with the stored runs. The lock
//! is never held across a provider call: callers create a pending run,
//! release the store, and settle it later with [`RunStore::update`].
//!
//! # Branch Index
//!
//! Branch heads are derived from the runs (the most recent run resolving to
//! each branch). The persisted index is rewritten whenever the derived set
//! changes and reconciled on open.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::schema::{Branch, Run, RunDraft, RunFilter, RunPatch};
use super::storage::{FileStorage, MemoryStorage, RunStorage, StorageError};
use super::LedgerError;
use crate::core::graph::LineageGraph;
use crate::core::paths::DuskPaths;
use crate::core::types::{BranchName, RunId, RunStatus, UtcTimestamp};

/// In-memory state guarded by the store mutex.
struct StoreState {
    runs: HashMap<RunId, Run>,
    graph: Arc<LineageGraph>,
    next_seq: u64,
}

/// Durable keyed storage of runs plus the derived lineage graph.
pub struct RunStore {
    storage: Box<dyn RunStorage>,
    default_branch: BranchName,
    state: Mutex<StoreState>,
}

impl std::fmt::Debug for RunStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunStore")
            .field("storage", &self.storage.name())
            .field("default_branch", &self.default_branch)
            .field("runs", &self.len())
            .finish()
    }
}

impl RunStore {
    /// Open the file-backed store at `paths`, taking the ledger lock.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the directory is locked by another
    /// process or holds invalid records, and
    /// [`LedgerError::DefaultBranchConflict`] if `default_branch` names an
    /// existing named branch.
    pub fn open(paths: DuskPaths, default_branch: BranchName) -> Result<Self, LedgerError> {
        let storage = FileStorage::open(paths)?;
        Self::with_storage(Box::new(storage), default_branch)
    }

    /// A store backed by memory only.
    pub fn in_memory(default_branch: BranchName) -> Self {
        Self {
            storage: Box::new(MemoryStorage::new()),
            state: Mutex::new(StoreState {
                runs: HashMap::new(),
                graph: Arc::new(LineageGraph::empty(default_branch.clone())),
                next_seq: 1,
            }),
            default_branch,
        }
    }

    /// Load a store from an arbitrary backend.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DefaultBranchConflict`] if a stored run starts a
    /// named branch called `default_branch`, and `LedgerError::Storage` if the
    /// backend cannot be read.
    pub fn with_storage(
        storage: Box<dyn RunStorage>,
        default_branch: BranchName,
    ) -> Result<Self, LedgerError> {
        let state = Self::load_state(storage.as_ref(), &default_branch)?;
        tracing::debug!(
            backend = storage.name(),
            runs = state.runs.len(),
            "opened run store"
        );
        Ok(Self {
            storage,
            default_branch,
            state: Mutex::new(state),
        })
    }

    fn load_state(
        storage: &dyn RunStorage,
        default_branch: &BranchName,
    ) -> Result<StoreState, LedgerError> {
        let stored = storage.load()?;

        let mut runs = HashMap::with_capacity(stored.runs.len());
        for run in stored.runs {
            if run.branch_name.as_ref() == Some(default_branch) {
                return Err(LedgerError::DefaultBranchConflict(default_branch.clone()));
            }
            if runs.insert(run.id.clone(), run).is_some() {
                return Err(StorageError::Corrupt("duplicate run record".into()).into());
            }
        }

        let graph = build_graph(&runs, default_branch)?;
        let next_seq = runs.values().map(|r| r.seq).max().unwrap_or(0) + 1;

        let derived = graph.branch_summaries();
        if derived != stored.branches {
            tracing::warn!(
                stored = stored.branches.len(),
                derived = derived.len(),
                "branch index out of date; rewriting"
            );
            storage.put_branches(&derived)?;
        }

        Ok(StoreState {
            runs,
            graph: Arc::new(graph),
            next_seq,
        })
    }

    /// The default branch name.
    pub fn default_branch(&self) -> &BranchName {
        &self.default_branch
    }

    /// Number of stored runs.
    pub fn len(&self) -> usize {
        self.state.lock().runs.len()
    }

    /// Whether the store has no runs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the current lineage graph.
    pub fn graph(&self) -> Arc<LineageGraph> {
        Arc::clone(&self.state.lock().graph)
    }

    /// Create a pending run.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] for an empty prompt or model
    /// - [`LedgerError::InvalidParent`] if `parent_id` is unknown
    /// - [`LedgerError::DuplicateBranch`] if `branch_name` already exists or
    ///   names the default branch
    pub fn create(&self, draft: RunDraft) -> Result<Run, LedgerError> {
        if draft.prompt.trim().is_empty() {
            return Err(LedgerError::InvalidInput("prompt cannot be empty".into()));
        }
        if draft.model.trim().is_empty() {
            return Err(LedgerError::InvalidInput("model cannot be empty".into()));
        }

        let mut state = self.state.lock();

        if let Some(parent) = &draft.parent_id {
            if !state.runs.contains_key(parent) {
                return Err(LedgerError::InvalidParent(parent.clone()));
            }
        }
        if let Some(name) = &draft.branch_name {
            if name == &self.default_branch || state.graph.has_branch(name) {
                return Err(LedgerError::DuplicateBranch(name.clone()));
            }
        }

        let mut id = RunId::generate();
        while state.runs.contains_key(&id) {
            id = RunId::generate();
        }

        let run = Run {
            id,
            parent_id: draft.parent_id,
            branch_name: draft.branch_name,
            prompt: draft.prompt,
            model: draft.model,
            status: RunStatus::Pending,
            output: None,
            created_at: UtcTimestamp::now(),
            settled_at: None,
            duration_ms: None,
            seq: state.next_seq,
        };

        let mut next = state.runs.clone();
        next.insert(run.id.clone(), run.clone());
        let graph = build_graph(&next, &self.default_branch)?;

        self.storage.put_run(&run)?;
        if let Err(e) = self.persist_branches(&state.graph, &graph) {
            if let Err(undo) = self.storage.remove_run(&run.id) {
                tracing::warn!(
                    run = %run.id,
                    error = %undo,
                    "failed to roll back run record; it will reappear on next open"
                );
            }
            return Err(e);
        }

        state.runs = next;
        state.graph = Arc::new(graph);
        state.next_seq += 1;

        tracing::debug!(run = %run.id, parent = ?run.parent_id, "created run");
        Ok(run)
    }

    /// Settle a pending run.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if `id` is unknown
    /// - [`LedgerError::InvalidTransition`] if the run is already terminal or
    ///   the patch targets `Pending`
    /// - [`LedgerError::InvalidInput`] for a success without output
    pub fn update(&self, id: &RunId, patch: RunPatch) -> Result<Run, LedgerError> {
        let mut state = self.state.lock();

        let current = state
            .runs
            .get(id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;

        if !current.status.can_transition_to(patch.status) {
            return Err(LedgerError::InvalidTransition {
                id: id.clone(),
                from: current.status,
                to: patch.status,
            });
        }
        if patch.status == RunStatus::Success && patch.output.is_none() {
            return Err(LedgerError::InvalidInput(
                "a successful run needs output".into(),
            ));
        }

        let mut run = current.clone();
        run.status = patch.status;
        run.output = patch.output;
        run.duration_ms = patch.duration_ms;
        run.settled_at = Some(UtcTimestamp::now());

        let mut next = state.runs.clone();
        next.insert(run.id.clone(), run.clone());
        let graph = build_graph(&next, &self.default_branch)?;

        self.storage.put_run(&run)?;

        state.runs = next;
        state.graph = Arc::new(graph);

        tracing::debug!(run = %run.id, status = %run.status, "settled run");
        Ok(run)
    }

    /// Fetch a run by id.
    pub fn get(&self, id: &RunId) -> Result<Run, LedgerError> {
        self.state
            .lock()
            .runs
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    /// Resolve a full id or a unique prefix.
    ///
    /// The `run-` prefix may be omitted.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] for an empty query
    /// - [`LedgerError::NotFound`] if nothing matches
    /// - [`LedgerError::AmbiguousId`] if several runs match
    pub fn resolve(&self, query: &str) -> Result<RunId, LedgerError> {
        let query = query.trim().to_ascii_lowercase();
        let needle = if query.starts_with(RunId::PREFIX) {
            query.clone()
        } else {
            format!("{}{}", RunId::PREFIX, query)
        };
        if needle.len() == RunId::PREFIX.len() {
            return Err(LedgerError::InvalidInput("run id cannot be empty".into()));
        }

        let state = self.state.lock();
        if let Ok(id) = RunId::parse(needle.as_str()) {
            if state.runs.contains_key(&id) {
                return Ok(id);
            }
        }

        let mut matches = state
            .runs
            .keys()
            .filter(|id| id.as_str().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (None, _) => Err(LedgerError::NotFound(query)),
            (Some(id), None) => Ok(id.clone()),
            (Some(_), Some(_)) => Err(LedgerError::AmbiguousId {
                prefix: query,
                matches: 2 + matches.count(),
            }),
        }
    }

    /// List runs newest first.
    ///
    /// The result is a snapshot taken at call time.
    pub fn list(&self, filter: &RunFilter, limit: Option<usize>) -> Vec<Run> {
        let graph = self.graph();
        let mut runs: Vec<&Run> = graph
            .runs()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| {
                filter
                    .branch
                    .as_ref()
                    .map_or(true, |b| graph.resolved_branch(&r.id) == Some(b))
            })
            .collect();

        runs.sort_by(|a, b| b.chrono_cmp(a));
        runs.into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Delete a run, and with `cascade` its whole subtree.
    ///
    /// Returns the removed ids, parents before children.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if `id` is unknown
    /// - [`LedgerError::HasChildren`] if the run has children and `cascade`
    ///   is false; the store is left unchanged
    pub fn delete(&self, id: &RunId, cascade: bool) -> Result<Vec<RunId>, LedgerError> {
        let mut state = self.state.lock();
        let graph = Arc::clone(&state.graph);

        if !graph.contains(id) {
            return Err(LedgerError::NotFound(id.to_string()));
        }
        let children = graph.child_count(id);
        if children > 0 && !cascade {
            return Err(LedgerError::HasChildren {
                id: id.clone(),
                children,
            });
        }

        let doomed: Vec<RunId> = graph.subtree(id).into_iter().map(|r| r.id.clone()).collect();
        self.remove_runs(&mut state, &doomed)?;
        Ok(doomed)
    }

    /// Delete a named branch: the run that started it and its whole subtree.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DefaultBranch`] for the default branch
    /// - [`LedgerError::BranchNotFound`] if no such branch exists
    pub fn delete_branch(&self, name: &BranchName) -> Result<Vec<RunId>, LedgerError> {
        if name == &self.default_branch {
            return Err(LedgerError::DefaultBranch(name.clone()));
        }

        let mut state = self.state.lock();
        let graph = Arc::clone(&state.graph);

        let start = graph
            .branch_summaries()
            .into_iter()
            .find(|b| &b.name == name)
            .and_then(|b| b.start_run_id)
            .ok_or_else(|| LedgerError::BranchNotFound(name.to_string()))?;

        let doomed: Vec<RunId> = graph
            .subtree(&start)
            .into_iter()
            .map(|r| r.id.clone())
            .collect();
        self.remove_runs(&mut state, &doomed)?;
        Ok(doomed)
    }

    /// All live branches sorted by name.
    pub fn branches(&self) -> Vec<Branch> {
        self.graph().branch_summaries()
    }

    /// Look up a single branch.
    pub fn branch(&self, name: &BranchName) -> Result<Branch, LedgerError> {
        self.branches()
            .into_iter()
            .find(|b| &b.name == name)
            .ok_or_else(|| LedgerError::BranchNotFound(name.to_string()))
    }

    /// Remove `doomed` (parents before children) and commit the new state.
    fn remove_runs(&self, state: &mut StoreState, doomed: &[RunId]) -> Result<(), LedgerError> {
        let doomed_set: HashSet<&RunId> = doomed.iter().collect();
        let next: HashMap<RunId, Run> = state
            .runs
            .iter()
            .filter(|(id, _)| !doomed_set.contains(id))
            .map(|(id, run)| (id.clone(), run.clone()))
            .collect();
        let graph = build_graph(&next, &self.default_branch)?;

        // Leaves first so a partial failure never leaves a dangling parent on disk.
        for id in doomed.iter().rev() {
            if let Err(e) = self.storage.remove_run(id) {
                self.recover(state);
                return Err(e.into());
            }
        }
        if let Err(e) = self.persist_branches(&state.graph, &graph) {
            self.recover(state);
            return Err(e);
        }

        state.runs = next;
        state.graph = Arc::new(graph);

        tracing::debug!(removed = doomed.len(), "deleted runs");
        Ok(())
    }

    /// Reload state from the backend after a partially applied write.
    fn recover(&self, state: &mut StoreState) {
        match Self::load_state(self.storage.as_ref(), &self.default_branch) {
            Ok(fresh) => *state = fresh,
            Err(e) => tracing::warn!(error = %e, "failed to reload ledger after write error"),
        }
    }

    fn persist_branches(
        &self,
        before: &LineageGraph,
        after: &LineageGraph,
    ) -> Result<(), LedgerError> {
        let derived = after.branch_summaries();
        if derived != before.branch_summaries() {
            self.storage.put_branches(&derived)?;
        }
        Ok(())
    }
}

fn build_graph(
    runs: &HashMap<RunId, Run>,
    default_branch: &BranchName,
) -> Result<LineageGraph, LedgerError> {
    LineageGraph::build(runs.values().cloned(), default_branch.clone())
        .map_err(|e| StorageError::Corrupt(e.to_string()).into())
}
