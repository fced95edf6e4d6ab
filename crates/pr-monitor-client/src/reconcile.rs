//! Merge of legacy status contexts and check runs into one pipeline list
//!
//! Both CI APIs can report under the same name. Status contexts are taken
//! first; a check run then replaces an entry of the same name only when the
//! check run itself is problematic. A clean check run never overwrites, even
//! if the existing entry is a failure. Entries keep the position of the first
//! occurrence of their name.

use crate::graphql::{CheckRun, StatusContext};
use crate::mapping::suggest_command;
use crate::types::{PipelineSource, PipelineStatus};
use std::collections::HashMap;

/// Insertion-ordered pipelines keyed by name
#[derive(Debug, Default)]
struct PipelineSet {
    entries: Vec<PipelineStatus>,
    index: HashMap<String, usize>,
}

impl PipelineSet {
    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Insert, or replace in place when the name is already present
    fn upsert(&mut self, pipeline: PipelineStatus) {
        match self.index.get(&pipeline.name) {
            Some(&position) => self.entries[position] = pipeline,
            None => {
                self.index.insert(pipeline.name.clone(), self.entries.len());
                self.entries.push(pipeline);
            }
        }
    }
}

fn from_status_context(context: &StatusContext) -> PipelineStatus {
    let name = context.context.clone().unwrap_or_else(|| "Unknown".to_string());
    PipelineStatus {
        suggested_command: suggest_command(Some(name.as_str())).map(str::to_string),
        state: context
            .state
            .as_deref()
            .unwrap_or("unknown")
            .to_lowercase(),
        // Legacy statuses have no separate outcome; the state is the outcome
        conclusion: context.state.as_deref().map(str::to_lowercase),
        target_url: context.target_url.clone(),
        description: context.description.clone(),
        source: PipelineSource::Status,
        name,
    }
}

fn from_check_run(run: &CheckRun) -> PipelineStatus {
    let name = run.name.clone().unwrap_or_else(|| "Unnamed Check".to_string());
    PipelineStatus {
        suggested_command: suggest_command(Some(name.as_str())).map(str::to_string),
        state: run.status.as_deref().unwrap_or("unknown").to_lowercase(),
        conclusion: run
            .conclusion
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase),
        target_url: run.details_url.clone(),
        description: run.conclusion.clone(),
        source: PipelineSource::Check,
        name,
    }
}

/// Reconcile one commit's CI signals into a de-duplicated pipeline list
pub fn reconcile<'a>(
    contexts: &[StatusContext],
    runs: impl IntoIterator<Item = &'a CheckRun>,
) -> Vec<PipelineStatus> {
    let mut set = PipelineSet::default();

    for context in contexts {
        set.upsert(from_status_context(context));
    }

    for run in runs {
        let candidate = from_check_run(run);
        if !set.contains(&candidate.name) || candidate.is_problematic() {
            set.upsert(candidate);
        }
    }

    set.entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(name: &str, state: &str) -> StatusContext {
        StatusContext {
            context: Some(name.to_string()),
            state: Some(state.to_string()),
            target_url: Some(format!("https://ci/{name}")),
            description: None,
        }
    }

    fn run(name: &str, status: &str, conclusion: Option<&str>) -> CheckRun {
        CheckRun {
            name: Some(name.to_string()),
            status: Some(status.to_string()),
            conclusion: conclusion.map(str::to_string),
            details_url: None,
        }
    }

    #[test]
    fn test_problematic_check_overwrites_status() {
        let result = reconcile(
            &[context("ci/compile", "success")],
            &[run("ci/compile", "completed", Some("failure"))],
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "ci/compile");
        assert_eq!(result[0].conclusion.as_deref(), Some("failure"));
        assert_eq!(result[0].source, PipelineSource::Check);
    }

    #[test]
    fn test_clean_check_does_not_overwrite_failed_status() {
        let result = reconcile(
            &[context("ci/p0", "failure")],
            &[run("ci/p0", "completed", Some("success"))],
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].conclusion.as_deref(), Some("failure"));
        assert_eq!(result[0].source, PipelineSource::Status);
    }

    #[test]
    fn test_first_clean_check_wins_over_later_clean_check() {
        let result = reconcile(
            &[],
            &[
                run("build", "completed", Some("success")),
                run("build", "completed", Some("neutral")),
            ],
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].conclusion.as_deref(), Some("success"));
    }

    #[test]
    fn test_latest_problematic_check_wins() {
        let result = reconcile(
            &[],
            &[
                run("build", "completed", Some("failure")),
                run("build", "in_progress", None),
            ],
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].state, "in_progress");
        assert_eq!(result[0].conclusion, None);
    }

    #[test]
    fn test_order_is_contexts_then_first_seen_checks() {
        let result = reconcile(
            &[context("b", "success"), context("a", "pending")],
            &[
                run("z", "completed", Some("success")),
                run("a", "completed", Some("failure")),
                run("y", "queued", None),
            ],
        );
        let names: Vec<_> = result.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "z", "y"]);
        // "a" was replaced in place
        assert_eq!(result[1].source, PipelineSource::Check);
    }

    #[test]
    fn test_duplicate_status_context_keeps_last() {
        let result = reconcile(
            &[context("ci", "pending"), context("ci", "success")],
            Vec::<&CheckRun>::new(),
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].state, "success");
    }

    #[test]
    fn test_status_context_normalization() {
        let result = reconcile(&[context("P0 Regression", "SUCCESS")], Vec::<&CheckRun>::new());
        let pipeline = &result[0];
        assert_eq!(pipeline.state, "success");
        assert_eq!(pipeline.conclusion.as_deref(), Some("success"));
        assert_eq!(pipeline.suggested_command.as_deref(), Some("run p0"));
        assert_eq!(pipeline.target_url.as_deref(), Some("https://ci/P0 Regression"));
        assert!(!pipeline.is_problematic());
    }

    #[test]
    fn test_check_run_defaults() {
        let anonymous = CheckRun::default();
        let result = reconcile(&[], [&anonymous]);
        assert_eq!(result[0].name, "Unnamed Check");
        assert_eq!(result[0].state, "unknown");
        assert_eq!(result[0].conclusion, None);
        assert!(result[0].is_problematic());
    }

    #[test]
    fn test_check_run_description_is_raw_conclusion() {
        let result = reconcile(&[], &[run("Coverage", "COMPLETED", Some("SUCCESS"))]);
        assert_eq!(result[0].state, "completed");
        assert_eq!(result[0].conclusion.as_deref(), Some("success"));
        assert_eq!(result[0].description.as_deref(), Some("SUCCESS"));
        assert_eq!(result[0].suggested_command.as_deref(), Some("run coverage"));
    }

    #[test]
    fn test_no_signals() {
        assert!(reconcile(&[], Vec::<&CheckRun>::new()).is_empty());
    }
}
