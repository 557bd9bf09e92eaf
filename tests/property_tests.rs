//! Property-based tests for ledger and comparison invariants.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::HashSet;

use proptest::prelude::*;

use dusk::core::compare::{compare_runs, diff_lines, CompareMode, DiffOp};
use dusk::core::ledger::{LedgerError, Run, RunDraft, RunFilter, RunPatch, RunStore};
use dusk::core::types::{BranchName, RunStatus};

fn main_branch() -> BranchName {
    BranchName::new("main").unwrap()
}

/// Multi-line text drawn from a small alphabet so diffs share lines, with
/// CRLF lines and trailing newlines mixed in.
fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!["a", "b", "c", "d", "", "a\r"]),
        0..12,
    )
    .prop_map(|lines| lines.join("\n"))
}

/// A status a run can settle into.
fn settled_status() -> impl Strategy<Value = RunStatus> {
    prop_oneof![Just(RunStatus::Success), Just(RunStatus::Failed)]
}

/// Parent choices for a forest: `None` for a root, else an index into the
/// runs created so far (taken modulo their count).
fn forest_shape() -> impl Strategy<Value = Vec<Option<usize>>> {
    prop::collection::vec(prop::option::weighted(0.7, any::<usize>()), 1..25)
}

fn build_forest(store: &RunStore, shape: &[Option<usize>]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for parent in shape {
        let draft = match parent {
            Some(i) if !runs.is_empty() => {
                RunDraft::child(runs[i % runs.len()].id.clone(), "p", "gpt-4")
            }
            _ => RunDraft::root("p", "gpt-4"),
        };
        runs.push(store.create(draft).unwrap());
    }
    runs
}

fn success_run(store: &RunStore, output: &str) -> Run {
    let run = store.create(RunDraft::root("p", "gpt-4")).unwrap();
    store.update(&run.id, RunPatch::success(output, 1)).unwrap()
}

proptest! {
    /// A run settles at most once; every later update is rejected and
    /// leaves the first outcome in place.
    #[test]
    fn status_transitions_at_most_once(
        first in settled_status(),
        second in settled_status(),
    ) {
        let store = RunStore::in_memory(main_branch());
        let run = store.create(RunDraft::root("p", "gpt-4")).unwrap();

        let patch = |status| match status {
            RunStatus::Success => RunPatch::success("out", 5),
            _ => RunPatch::failed("boom", Some(5)),
        };
        let settled = store.update(&run.id, patch(first)).unwrap();
        prop_assert_eq!(settled.status, first);

        let again = store.update(&run.id, patch(second));
        let is_invalid_transition = matches!(again, Err(LedgerError::InvalidTransition { .. }));
        prop_assert!(is_invalid_transition);
        prop_assert_eq!(store.get(&run.id).unwrap(), settled);
    }

    /// Every parent reference points at a live run, before and after a
    /// cascading delete anywhere in the forest.
    #[test]
    fn no_dangling_parents(shape in forest_shape(), pick in any::<usize>()) {
        let store = RunStore::in_memory(main_branch());
        let runs = build_forest(&store, &shape);

        let victim = &runs[pick % runs.len()];
        let removed = store.delete(&victim.id, true).unwrap();
        prop_assert!(removed.contains(&victim.id));

        let live = store.list(&RunFilter::default(), None);
        let ids: HashSet<_> = live.iter().map(|r| r.id.clone()).collect();
        prop_assert_eq!(live.len() + removed.len(), runs.len());
        for run in &live {
            if let Some(parent) = &run.parent_id {
                prop_assert!(ids.contains(parent));
            }
        }
    }

    /// A refused non-cascading delete leaves the store exactly as it was.
    #[test]
    fn refused_delete_is_a_no_op(shape in forest_shape(), pick in any::<usize>()) {
        let store = RunStore::in_memory(main_branch());
        let runs = build_forest(&store, &shape);
        let before = store.list(&RunFilter::default(), None);
        let branches = store.branches();

        let victim = &runs[pick % runs.len()];
        let has_children = runs.iter().any(|r| r.parent_id.as_ref() == Some(&victim.id));
        match store.delete(&victim.id, false) {
            Err(LedgerError::HasChildren { .. }) => {
                prop_assert!(has_children);
                prop_assert_eq!(store.list(&RunFilter::default(), None), before);
                prop_assert_eq!(store.branches(), branches);
            }
            Ok(removed) => {
                prop_assert!(!has_children);
                prop_assert_eq!(removed, vec![victim.id.clone()]);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    /// Comparing the same pair twice gives the same result.
    #[test]
    fn compare_is_deterministic(left in text(), right in text()) {
        let store = RunStore::in_memory(main_branch());
        let a = success_run(&store, &left);
        let b = success_run(&store, &right);

        for mode in [CompareMode::SideBySide, CompareMode::Unified, CompareMode::Json] {
            let first = compare_runs(&a, &b, mode).unwrap();
            let second = compare_runs(&a, &b, mode).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    /// Equal and Delete ops rebuild the left side; Equal and Insert ops
    /// rebuild the right side.
    #[test]
    fn diff_reconstructs_both_sides(left in text(), right in text()) {
        let ops = diff_lines(&left, &right);

        let mut rebuilt_left = Vec::new();
        let mut rebuilt_right = Vec::new();
        for op in &ops {
            match op {
                DiffOp::Equal { lines, .. } => {
                    rebuilt_left.extend(lines.iter().cloned());
                    rebuilt_right.extend(lines.iter().cloned());
                }
                DiffOp::Delete { lines, .. } => rebuilt_left.extend(lines.iter().cloned()),
                DiffOp::Insert { lines, .. } => rebuilt_right.extend(lines.iter().cloned()),
            }
        }

        prop_assert_eq!(rebuilt_left.join("\n"), left);
        prop_assert_eq!(rebuilt_right.join("\n"), right);
    }

    /// Two outputs are reported identical exactly when the diff has no
    /// inserted or deleted lines.
    #[test]
    fn identical_iff_no_changes(left in text(), right in text()) {
        let store = RunStore::in_memory(main_branch());
        let a = success_run(&store, &left);
        let b = success_run(&store, &right);

        let result = compare_runs(&a, &b, CompareMode::Unified).unwrap();
        let unchanged = result.stats.inserted + result.stats.deleted == 0;
        prop_assert_eq!(result.identical, unchanged);
    }

    /// Identical outputs compare as identical with full similarity.
    #[test]
    fn self_comparison_is_identical(output in text()) {
        let store = RunStore::in_memory(main_branch());
        let a = success_run(&store, &output);
        let b = success_run(&store, &output);

        let result = compare_runs(&a, &b, CompareMode::Unified).unwrap();
        prop_assert!(result.identical);
        prop_assert_eq!(result.left_digest, result.right_digest);
        prop_assert!((result.stats.similarity - 1.0).abs() < f64::EPSILON);
        prop_assert_eq!(result.stats.inserted + result.stats.deleted, 0);
    }

    /// A retry resolves to its source's branch; a branch run resolves to
    /// its own name.
    #[test]
    fn retries_inherit_and_branches_start_new_paths(shape in forest_shape(), pick in any::<usize>()) {
        let store = RunStore::in_memory(main_branch());
        let runs = build_forest(&store, &shape);
        let source = &runs[pick % runs.len()];

        let retry = store
            .create(RunDraft::child(source.id.clone(), "p", "gpt-4"))
            .unwrap();
        let name = BranchName::new("exp").unwrap();
        let branched = store
            .create(RunDraft::child(source.id.clone(), "p", "gpt-4").on_branch(name.clone()))
            .unwrap();

        let graph = store.graph();
        prop_assert_eq!(graph.resolved_branch(&retry.id), graph.resolved_branch(&source.id));
        prop_assert_eq!(graph.resolved_branch(&branched.id), Some(&name));
        prop_assert_eq!(store.branch(&name).unwrap().head_run_id, branched.id);
    }
}
