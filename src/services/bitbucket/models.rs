use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// Source or destination side of a pull request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub branch: Branch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<Commit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
}

impl Endpoint {
    pub fn branch(name: impl Into<String>) -> Self {
        Self {
            branch: Branch { name: name.into() },
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedText {
    #[serde(default)]
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl RenderedText {
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            raw: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(default)]
    pub source: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<User>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub close_source_branch: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RenderedText>,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub task_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_commit: Option<Commit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub source: Endpoint,
    pub destination: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
}

/// Only the fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PullRequestUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
}

impl PullRequestUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.draft.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    MergeCommit,
    Squash,
    FastForward,
}

impl MergeStrategy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "merge_commit" => Some(MergeStrategy::MergeCommit),
            "squash" => Some(MergeStrategy::Squash),
            "fast_forward" => Some(MergeStrategy::FastForward),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::MergeCommit => "merge_commit",
            MergeStrategy::Squash => "squash",
            MergeStrategy::FastForward => "fast_forward",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeParameters {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub close_source_branch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<MergeStrategy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<RenderedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<InlinePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<CommentRef>,
    #[serde(default)]
    pub deleted: bool,
}

impl Comment {
    pub fn text(&self) -> &str {
        self.content.as_ref().map(|c| c.raw.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlinePosition {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewComment {
    pub content: RenderedText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<InlinePosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Resolved,
    Unresolved,
}

impl TaskState {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "RESOLVED" => Some(TaskState::Resolved),
            "UNRESOLVED" => Some(TaskState::Unresolved),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Resolved => "RESOLVED",
            TaskState::Unresolved => "UNRESOLVED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRef {
    pub id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TaskState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<RenderedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<User>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<CommentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<DateTime<Utc>>,
}

impl Task {
    pub fn text(&self) -> &str {
        self.content.as_ref().map(|c| c.raw.as_str()).unwrap_or("")
    }
}

/// One page of a paginated listing. Only the first page is ever fetched;
/// `next` is passed through so callers can see there is more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub pagelen: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            size: 0,
            page: 0,
            pagelen: 0,
            next: None,
            values: Vec::new(),
        }
    }
}

impl<T> Page<T> {
    /// Total reported by the API, or the page length when it omits one.
    pub fn total(&self) -> u64 {
        if self.size > 0 {
            self.size
        } else {
            self.values.len() as u64
        }
    }
}

pub type TaskPage = Page<Task>;
pub type CommentPage = Page<Comment>;
pub type DiffStatPage = Page<DiffStat>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffStatFile {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escaped_path: Option<String>,
}

/// Per-file change counts of a pull request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffStat {
    /// added, removed, modified or renamed.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_removed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<DiffStatFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<DiffStatFile>,
}

impl DiffStat {
    pub fn path(&self) -> &str {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(|file| file.path.as_str())
            .unwrap_or("")
    }
}

/// Narrows a diff or diffstat; empty means the whole pull request.
#[derive(Debug, Clone, Default)]
pub struct DiffQuery {
    pub paths: Vec<String>,
    pub context: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    pub content: RenderedText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<CommentRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<RenderedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TaskState>,
}

/// Filters for listing tasks; only one page is fetched.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub pagelen: Option<u32>,
}

/// Outcome of withdrawing an approval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangesRequested {
    pub status: &'static str,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_request_parses_a_trimmed_api_payload() {
        let raw = r#"{
            "id": 42,
            "title": "Add feature",
            "state": "OPEN",
            "source": {"branch": {"name": "feature"}},
            "destination": {"branch": {"name": "main"}},
            "created_on": "2024-05-01T10:00:00.123456+00:00",
            "author": {"display_name": "Dev", "type": "user"}
        }"#;
        let pr: PullRequest = serde_json::from_str(raw).expect("pull request");
        assert_eq!(pr.id, 42);
        assert_eq!(pr.source.branch.name, "feature");
        assert_eq!(pr.destination.expect("destination").branch.name, "main");
        assert!(pr.created_on.is_some());
    }

    #[test]
    fn update_omits_unset_fields() {
        let update = PullRequestUpdate {
            title: Some("New".to_string()),
            ..PullRequestUpdate::default()
        };
        assert_eq!(
            serde_json::to_value(&update).expect("json"),
            serde_json::json!({"title": "New"})
        );
    }

    #[test]
    fn merge_parameters_use_api_names() {
        let params = MergeParameters {
            message: Some("ship it".to_string()),
            close_source_branch: true,
            merge_strategy: Some(MergeStrategy::FastForward),
            ..MergeParameters::default()
        };
        assert_eq!(
            serde_json::to_value(&params).expect("json"),
            serde_json::json!({
                "message": "ship it",
                "close_source_branch": true,
                "merge_strategy": "fast_forward"
            })
        );
    }

    #[test]
    fn deleted_file_diffstat_reports_the_old_path() {
        let page: DiffStatPage = serde_json::from_str(
            r#"{"size": 1, "values": [{"type": "diffstat", "status": "removed",
                "lines_added": 0, "lines_removed": 12,
                "old": {"path": "docs/old.md", "type": "commit_file"}, "new": null}]}"#,
        )
        .expect("diffstat");
        assert_eq!(page.total(), 1);
        assert_eq!(page.values[0].path(), "docs/old.md");
        assert_eq!(page.values[0].lines_removed, 12);
    }

    #[test]
    fn task_state_round_trips_in_upper_case() {
        let task: Task =
            serde_json::from_str(r#"{"id": 3, "state": "RESOLVED", "content": {"raw": "fix"}}"#)
                .expect("task");
        assert_eq!(task.state, Some(TaskState::Resolved));
        assert_eq!(task.text(), "fix");
    }
}
