use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::auth::{AccountAuthFactory, AccountTokenProvider};
use crate::constants::bitbucket::MERGE_STRATEGIES;
use crate::context::RequestContext;
use crate::errors::ToolError;
use crate::mcp::protocol::{CallToolRequest, CallToolResult};
use crate::services::bitbucket::models::{
    DiffQuery, Endpoint, InlinePosition, MergeParameters, MergeStrategy, NewPullRequest,
    PullRequestUpdate, RenderedText, TaskQuery, TaskState, TaskUpdate,
};
use crate::services::bitbucket::{BitbucketClient, PullRequestRef};
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::tool_errors::unknown_tool_error;

pub const BITBUCKET_TOOLS: &[&str] = &[
    "bitbucket_create_pr",
    "bitbucket_read_pr",
    "bitbucket_update_pr",
    "bitbucket_approve_pr",
    "bitbucket_request_pr_changes",
    "bitbucket_merge_pr",
    "bitbucket_add_pr_comment",
    "bitbucket_list_pr_tasks",
    "bitbucket_create_pr_task",
    "bitbucket_update_pr_task",
    "bitbucket_list_pr_comments",
    "bitbucket_get_pr_diffstat",
    "bitbucket_get_pr_diff",
    "bitbucket_get_file_content",
];

const TASK_STATES: &[&str] = &["RESOLVED", "UNRESOLVED"];

#[derive(Clone)]
pub struct BitbucketManager {
    client: BitbucketClient,
    auth: AccountAuthFactory,
    validation: Validation,
}

impl BitbucketManager {
    pub fn new(client: BitbucketClient, auth: AccountAuthFactory, validation: Validation) -> Self {
        Self {
            client,
            auth,
            validation,
        }
    }

    fn tokens(&self, args: &Value) -> Result<AccountTokenProvider, ToolError> {
        let account = self
            .validation
            .ensure_optional_string(args, "account", "account")?
            .unwrap_or_default();
        Ok(self.auth.token_provider(account))
    }

    fn pull_request(&self, args: &Value) -> Result<PullRequestRef, ToolError> {
        let owner = self
            .validation
            .ensure_string(args, "repo_owner", "repository owner")?;
        let repo = self
            .validation
            .ensure_string(args, "repo_name", "repository name")?;
        let id = self
            .validation
            .ensure_positive_id(args, "pr_id", "pull request ID")?;
        Ok(PullRequestRef::new(owner, repo, id))
    }

    fn task_state(&self, args: &Value) -> Result<Option<TaskState>, ToolError> {
        let Some(raw) = self
            .validation
            .ensure_optional_string(args, "state", "state")?
        else {
            return Ok(None);
        };
        TaskState::parse(&raw).map(Some).ok_or_else(|| {
            ToolError::invalid_params("State must be either RESOLVED or UNRESOLVED")
                .with_details(serde_json::json!({ "allowed": TASK_STATES }))
        })
    }

    pub async fn create_pr(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let v = &self.validation;
        let title = v.ensure_string(args, "title", "title")?;
        let source = v.ensure_string(args, "source_branch", "source branch")?;
        let target = v.ensure_string(args, "target_branch", "destination branch")?;
        let owner = v.ensure_string(args, "repo_owner", "repository owner")?;
        let repo = v.ensure_string(args, "repo_name", "repository name")?;
        let request = NewPullRequest {
            title,
            source: Endpoint::branch(source),
            destination: Endpoint::branch(target),
            description: v.ensure_optional_string(args, "description", "description")?,
            draft: v.ensure_optional_bool(args, "draft")?,
        };
        let tokens = self.tokens(args)?;

        let pr = self
            .client
            .create_pr(ctx, &tokens, &owner, &repo, &request)
            .await?;
        Ok(CallToolResult::text(format!(
            "Created pull request #{}: {}",
            pr.id, pr.title
        )))
    }

    pub async fn read_pr(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let tokens = self.tokens(args)?;

        let pr = self.client.get_pr(ctx, &tokens, &pr_ref).await?;
        Ok(CallToolResult::texts([
            format!("Pull request #{}: {} (Status: {})", pr.id, pr.title, pr.state),
            pretty(&pr)?,
        ]))
    }

    pub async fn update_pr(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let v = &self.validation;
        let update = PullRequestUpdate {
            title: v.ensure_optional_string(args, "title", "title")?,
            description: v.ensure_optional_string(args, "description", "description")?,
            draft: v.ensure_optional_bool(args, "draft")?,
        };
        if update.is_empty() {
            return Err(ToolError::invalid_params(
                "either title, description or draft must be provided",
            ));
        }
        let tokens = self.tokens(args)?;

        let pr = self.client.update_pr(ctx, &tokens, &pr_ref, &update).await?;
        Ok(CallToolResult::text(format!(
            "Updated pull request #{}: {}",
            pr.id, pr.title
        )))
    }

    pub async fn approve_pr(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let tokens = self.tokens(args)?;

        let participant = self.client.approve_pr(ctx, &tokens, &pr_ref).await?;
        Ok(CallToolResult::text(format!(
            "Pull request #{} approved by {}",
            pr_ref.id, participant.user.display_name
        )))
    }

    pub async fn request_pr_changes(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let tokens = self.tokens(args)?;

        let outcome = self
            .client
            .request_pr_changes(ctx, &tokens, &pr_ref)
            .await?;
        Ok(CallToolResult::text(format!(
            "Requested changes for pull request #{}: {} at {}",
            pr_ref.id,
            outcome.status,
            outcome.at.to_rfc3339()
        )))
    }

    pub async fn merge_pr(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let v = &self.validation;
        let strategy = match v.ensure_optional_string(args, "merge_strategy", "merge strategy")? {
            Some(raw) => {
                v.ensure_one_of(&raw, "merge strategy", MERGE_STRATEGIES)
                    .map_err(|_| {
                        ToolError::invalid_params(
                            "invalid merge strategy: must be one of merge_commit, squash, or fast_forward",
                        )
                    })?;
                MergeStrategy::parse(&raw)
            }
            None => None,
        };
        let parameters = MergeParameters {
            kind: None,
            message: v.ensure_optional_string(args, "commit_message", "commit message")?,
            close_source_branch: v
                .ensure_optional_bool(args, "close_source_branch")?
                .unwrap_or(false),
            merge_strategy: strategy,
        };
        let tokens = self.tokens(args)?;

        self.client
            .merge_pr(ctx, &tokens, &pr_ref, Some(&parameters))
            .await?;
        let strategy_note = strategy
            .map(|s| format!(" using {} strategy", s.as_str()))
            .unwrap_or_default();
        let branch_note = if parameters.close_source_branch {
            " and source branch was closed"
        } else {
            ""
        };
        Ok(CallToolResult::text(format!(
            "Pull request #{} successfully merged{}{}",
            pr_ref.id, strategy_note, branch_note
        )))
    }

    pub async fn add_pr_comment(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let v = &self.validation;
        let text = v.ensure_string(args, "comment_text", "comment content")?;
        let inline = match v.ensure_optional_string(args, "file_path", "file path")? {
            Some(path) => Some(InlinePosition {
                path,
                from: line_number(v, args, "line_number_from")?,
                to: line_number(v, args, "line_number_to")?,
            }),
            None => None,
        };
        let tokens = self.tokens(args)?;

        let comment = self
            .client
            .add_pr_comment(ctx, &tokens, &pr_ref, &text, inline)
            .await?;
        let content = comment
            .content
            .as_ref()
            .map(|c| c.raw.as_str())
            .unwrap_or(text.as_str());
        Ok(CallToolResult::text(format!(
            "Added comment #{}: {}",
            comment.id, content
        )))
    }

    pub async fn list_pr_tasks(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let v = &self.validation;
        let query = TaskQuery {
            q: v.ensure_optional_string(args, "query", "query")?,
            sort: v.ensure_optional_string(args, "sort", "sort")?,
            pagelen: v
                .ensure_optional_positive_id(args, "pagelen", "pagelen")?
                .map(|n| n.min(u32::MAX as u64) as u32),
        };
        let tokens = self.tokens(args)?;

        let page = self
            .client
            .list_pr_tasks(ctx, &tokens, &pr_ref, &query)
            .await?;
        if page.values.is_empty() {
            return Ok(CallToolResult::text("No tasks found for this pull request"));
        }
        let mut summary = format!("Found {} tasks", page.total());
        for task in &page.values {
            let creator = task
                .creator
                .as_ref()
                .map(|user| user.display_name.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or("unknown user");
            let state = task.state.map(|s| s.as_str()).unwrap_or("UNKNOWN");
            summary.push_str(&format!(
                "\nTask #{}: [{}] {} (by {})",
                task.id,
                state,
                task.text(),
                creator
            ));
        }
        Ok(CallToolResult::texts([summary, pretty(&page)?]))
    }

    pub async fn create_pr_task(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let v = &self.validation;
        let content = v.ensure_string(args, "content", "content")?;
        let comment_id = v.ensure_optional_positive_id(args, "comment_id", "comment ID")?;
        // An unresolved task is created as pending.
        let pending = self
            .task_state(args)?
            .map(|state| state != TaskState::Resolved);
        let tokens = self.tokens(args)?;

        let task = self
            .client
            .create_pr_task(ctx, &tokens, &pr_ref, &content, comment_id, pending)
            .await?;
        let text = match &task.comment {
            Some(comment) => format!(
                "Created task on PR #{}: {} (on comment #{})",
                pr_ref.id,
                task.text(),
                comment.id
            ),
            None => format!("Created task on PR #{}: {}", pr_ref.id, task.text()),
        };
        Ok(CallToolResult::text(text))
    }

    pub async fn update_pr_task(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let v = &self.validation;
        let task_id = v.ensure_positive_id(args, "task_id", "task ID")?;
        let content = v.ensure_optional_string(args, "content", "content")?;
        let state = self.task_state(args)?;
        if content.is_none() && state.is_none() {
            return Err(ToolError::invalid_params(
                "either content or state must be provided",
            ));
        }
        let update = TaskUpdate {
            content: content.as_deref().map(RenderedText::raw),
            state,
        };
        let tokens = self.tokens(args)?;

        let task = self
            .client
            .update_pr_task(ctx, &tokens, &pr_ref, task_id, &update)
            .await?;
        let new_state = task.state.or(state).map(|s| s.as_str()).unwrap_or("UNKNOWN");
        let text = match (content.is_some(), state.is_some()) {
            (true, true) => format!(
                "Updated task #{} content and marked as {}",
                task_id, new_state
            ),
            (true, false) => format!("Updated task #{} content", task_id),
            _ => format!("Updated task #{} state to {}", task_id, new_state),
        };
        Ok(CallToolResult::text(text))
    }

    pub async fn list_pr_comments(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let tokens = self.tokens(args)?;

        let page = self.client.list_pr_comments(ctx, &tokens, &pr_ref).await?;
        Ok(CallToolResult::texts([
            format!(
                "Found {} comments on pull request #{}",
                page.values.len(),
                pr_ref.id
            ),
            pretty(&page)?,
        ]))
    }

    pub async fn get_pr_diffstat(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let tokens = self.tokens(args)?;

        let page = self
            .client
            .get_pr_diffstat(ctx, &tokens, &pr_ref, &DiffQuery::default())
            .await?;
        Ok(CallToolResult::texts([
            format!(
                "Diffstat for PR #{}: {} files changed",
                pr_ref.id,
                page.total()
            ),
            pretty(&page)?,
        ]))
    }

    pub async fn get_pr_diff(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let pr_ref = self.pull_request(args)?;
        let v = &self.validation;
        let query = DiffQuery {
            paths: v.ensure_string_list(args, "file_paths")?,
            context: v
                .ensure_optional_positive_id(args, "context_lines", "context lines")?
                .map(|n| n.min(u32::MAX as u64) as u32),
        };
        let tokens = self.tokens(args)?;

        let diff = self.client.get_pr_diff(ctx, &tokens, &pr_ref, &query).await?;
        Ok(CallToolResult::texts([
            format!(
                "Diff for PR #{} in {}/{}",
                pr_ref.id, pr_ref.owner, pr_ref.repo
            ),
            diff,
        ]))
    }

    pub async fn get_file_content(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<CallToolResult, ToolError> {
        let v = &self.validation;
        let owner = v.ensure_string(args, "repo_owner", "repository owner")?;
        let repo = v.ensure_string(args, "repo_name", "repository name")?;
        let file_path = v.ensure_string(args, "file_path", "file path")?;
        let commit = v.ensure_string(args, "commit_hash", "commit hash")?;
        let tokens = self.tokens(args)?;

        let content = self
            .client
            .get_file_content(ctx, &tokens, &owner, &repo, &commit, &file_path)
            .await?;
        Ok(CallToolResult::texts([
            format!("File content for {} at {}/{}", file_path, owner, repo),
            content,
        ]))
    }
}

fn line_number(v: &Validation, args: &Value, key: &str) -> Result<Option<u32>, ToolError> {
    Ok(v
        .ensure_optional_positive_id(args, key, key)?
        .map(|n| n.min(u32::MAX as u64) as u32))
}

fn pretty<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| ToolError::internal(format!("failed to render response: {}", err)))
}

#[async_trait]
impl ToolHandler for BitbucketManager {
    async fn handle(
        &self,
        ctx: &RequestContext,
        request: CallToolRequest,
    ) -> Result<CallToolResult, ToolError> {
        let args = request.args();
        debug!(tool = %request.name, "bitbucket tool");
        match request.name.as_str() {
            "bitbucket_create_pr" => self.create_pr(ctx, args).await,
            "bitbucket_read_pr" => self.read_pr(ctx, args).await,
            "bitbucket_update_pr" => self.update_pr(ctx, args).await,
            "bitbucket_approve_pr" => self.approve_pr(ctx, args).await,
            "bitbucket_request_pr_changes" => self.request_pr_changes(ctx, args).await,
            "bitbucket_merge_pr" => self.merge_pr(ctx, args).await,
            "bitbucket_add_pr_comment" => self.add_pr_comment(ctx, args).await,
            "bitbucket_list_pr_tasks" => self.list_pr_tasks(ctx, args).await,
            "bitbucket_create_pr_task" => self.create_pr_task(ctx, args).await,
            "bitbucket_update_pr_task" => self.update_pr_task(ctx, args).await,
            "bitbucket_list_pr_comments" => self.list_pr_comments(ctx, args).await,
            "bitbucket_get_pr_diffstat" => self.get_pr_diffstat(ctx, args).await,
            "bitbucket_get_pr_diff" => self.get_pr_diff(ctx, args).await,
            "bitbucket_get_file_content" => self.get_file_content(ctx, args).await,
            other => Err(unknown_tool_error("bitbucket", other, BITBUCKET_TOOLS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{Account, Product};
    use crate::errors::ToolErrorKind;
    use crate::http::client_factory::{compose, ClientOptions};
    use crate::http::testing::{FakeTransport, Scripted};
    use crate::http::HttpExecutor;
    use crate::stores::AccountsStore;
    use bytes::Bytes;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    fn manager(fake: Arc<FakeTransport>) -> BitbucketManager {
        let store = Arc::new(AccountsStore::from_accounts(vec![Account::new("work")
            .as_default()
            .with_bitbucket("tok-work", "acme")]));
        let transport = compose(fake, &ClientOptions::default());
        BitbucketManager::new(
            BitbucketClient::new(HttpExecutor::new(transport), "https://api.example.com/2.0"),
            AccountAuthFactory::new(store, Product::Bitbucket),
            Validation::new(),
        )
    }

    fn pr_args(extra: Value) -> Value {
        let mut args = json!({"repo_owner": "acme", "repo_name": "widgets", "pr_id": 7});
        if let (Some(base), Some(extra)) = (args.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        args
    }

    #[tokio::test]
    async fn read_pr_returns_summary_and_json() {
        let fake = FakeTransport::responding(
            StatusCode::OK,
            r#"{"id":7,"title":"Add widgets","state":"OPEN","source":{"branch":{"name":"feature"}}}"#,
        );
        let result = manager(fake.clone())
            .handle(
                &RequestContext::new(),
                CallToolRequest::new("bitbucket_read_pr", pr_args(json!({}))),
            )
            .await
            .expect("read");

        assert_eq!(result.content.len(), 2);
        assert!(result
            .joined_text()
            .starts_with("Pull request #7: Add widgets (Status: OPEN)"));
        let seen = fake.requests();
        assert_eq!(
            seen[0].url.as_str(),
            "https://api.example.com/2.0/repositories/acme/widgets/pullrequests/7"
        );
        assert_eq!(
            seen[0]
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok()),
            Some("Bearer tok-work")
        );
    }

    #[tokio::test]
    async fn missing_owner_is_rejected_before_any_request() {
        let fake = FakeTransport::responding(StatusCode::OK, "{}");
        let err = manager(fake.clone())
            .handle(
                &RequestContext::new(),
                CallToolRequest::new("bitbucket_read_pr", json!({"repo_name": "w", "pr_id": 1})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.message, "repository owner is required");
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn update_pr_needs_at_least_one_attribute() {
        let err = manager(FakeTransport::responding(StatusCode::OK, "{}"))
            .handle(
                &RequestContext::new(),
                CallToolRequest::new("bitbucket_update_pr", pr_args(json!({}))),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.message,
            "either title, description or draft must be provided"
        );
    }

    #[tokio::test]
    async fn merge_rejects_unknown_strategy() {
        let err = manager(FakeTransport::responding(StatusCode::OK, "{}"))
            .handle(
                &RequestContext::new(),
                CallToolRequest::new(
                    "bitbucket_merge_pr",
                    pr_args(json!({"merge_strategy": "rebase"})),
                ),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.message,
            "invalid merge strategy: must be one of merge_commit, squash, or fast_forward"
        );
    }

    #[tokio::test]
    async fn merge_reports_strategy_and_closed_branch() {
        let fake = FakeTransport::responding(
            StatusCode::OK,
            r#"{"id":7,"title":"t","state":"MERGED","source":{"branch":{"name":"f"}}}"#,
        );
        let result = manager(fake.clone())
            .handle(
                &RequestContext::new(),
                CallToolRequest::new(
                    "bitbucket_merge_pr",
                    pr_args(json!({"merge_strategy": "squash", "close_source_branch": "true"})),
                ),
            )
            .await
            .expect("merge");
        assert_eq!(
            result.joined_text(),
            "Pull request #7 successfully merged using squash strategy and source branch was closed"
        );
        let body: Value =
            serde_json::from_slice(fake.requests()[0].body.as_ref().expect("body")).expect("json");
        assert_eq!(body, json!({"close_source_branch": true, "merge_strategy": "squash"}));
    }

    #[tokio::test]
    async fn list_tasks_formats_each_task() {
        let fake = FakeTransport::default();
        fake.push(Scripted::Respond(
            StatusCode::OK,
            Bytes::from_static(
                br#"{"size":2,"values":[
                    {"id":1,"state":"UNRESOLVED","content":{"raw":"fix typo"},"creator":{"display_name":"Ann"}},
                    {"id":2,"state":"RESOLVED","content":{"raw":"add test"}}
                ]}"#,
            ),
        ));
        let result = manager(Arc::new(fake))
            .handle(
                &RequestContext::new(),
                CallToolRequest::new("bitbucket_list_pr_tasks", pr_args(json!({}))),
            )
            .await
            .expect("list");
        let summary = match &result.content[0] {
            crate::mcp::protocol::Content::Text { text } => text.clone(),
        };
        assert_eq!(
            summary,
            "Found 2 tasks\nTask #1: [UNRESOLVED] fix typo (by Ann)\nTask #2: [RESOLVED] add test (by unknown user)"
        );
    }

    #[tokio::test]
    async fn create_task_maps_state_to_pending() {
        let fake = FakeTransport::responding(
            StatusCode::OK,
            r#"{"id":9,"content":{"raw":"check logs"},"comment":{"id":3}}"#,
        );
        let result = manager(fake.clone())
            .handle(
                &RequestContext::new(),
                CallToolRequest::new(
                    "bitbucket_create_pr_task",
                    pr_args(json!({"content": "check logs", "comment_id": 3, "state": "RESOLVED"})),
                ),
            )
            .await
            .expect("create task");
        assert_eq!(
            result.joined_text(),
            "Created task on PR #7: check logs (on comment #3)"
        );
        let body: Value =
            serde_json::from_slice(fake.requests()[0].body.as_ref().expect("body")).expect("json");
        assert_eq!(body["pending"], false);
        assert_eq!(body["comment"]["id"], 3);
    }

    #[tokio::test]
    async fn update_task_rejects_invalid_state() {
        let err = manager(FakeTransport::responding(StatusCode::OK, "{}"))
            .handle(
                &RequestContext::new(),
                CallToolRequest::new(
                    "bitbucket_update_pr_task",
                    pr_args(json!({"task_id": 4, "state": "DONE"})),
                ),
            )
            .await
            .unwrap_err();
        assert_eq!(err.message, "State must be either RESOLVED or UNRESOLVED");
    }

    #[tokio::test]
    async fn upstream_not_found_becomes_tool_error() {
        let fake = FakeTransport::responding(StatusCode::NOT_FOUND, r#"{"error":{"message":"nope"}}"#);
        let err = manager(fake.clone())
            .handle(
                &RequestContext::new(),
                CallToolRequest::new("bitbucket_read_pr", pr_args(json!({}))),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::NotFound);
        assert!(err.message.contains("get pull request failed"));
        assert!(fake.body_closed());
    }

    #[tokio::test]
    async fn unknown_account_is_reported_without_a_request() {
        let fake = FakeTransport::responding(StatusCode::OK, "{}");
        let err = manager(fake.clone())
            .handle(
                &RequestContext::new(),
                CallToolRequest::new("bitbucket_approve_pr", pr_args(json!({"account": "ghost"}))),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, "ACCOUNT_NOT_FOUND");
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn diff_splits_file_paths_and_returns_the_raw_text() {
        let fake = FakeTransport::responding(StatusCode::OK, "diff --git a/a.rs b/a.rs\n");
        let result = manager(fake.clone())
            .handle(
                &RequestContext::new(),
                CallToolRequest::new(
                    "bitbucket_get_pr_diff",
                    pr_args(json!({"file_paths": "a.rs, src/b.rs", "context_lines": 3})),
                ),
            )
            .await
            .expect("diff");
        assert_eq!(
            result.joined_text(),
            "Diff for PR #7 in acme/widgets\ndiff --git a/a.rs b/a.rs\n"
        );
        let seen = fake.requests();
        assert_eq!(
            seen[0].url.as_str(),
            "https://api.example.com/2.0/repositories/acme/widgets/pullrequests/7/diff?path=a.rs&path=src%2Fb.rs&context=3"
        );
        assert_eq!(
            seen[0].headers.get("accept").and_then(|v| v.to_str().ok()),
            Some("text/plain")
        );
    }

    #[tokio::test]
    async fn comments_and_diffstat_summarise_their_pages() {
        let fake = FakeTransport::default();
        fake.push(Scripted::Respond(
            StatusCode::OK,
            Bytes::from_static(br#"{"size":3,"values":[{"id":1},{"id":2}]}"#),
        ));
        fake.push(Scripted::Respond(
            StatusCode::OK,
            Bytes::from_static(
                br#"{"size":2,"values":[{"status":"added","new":{"path":"a"}},{"status":"removed","old":{"path":"b"}}]}"#,
            ),
        ));
        let fake = Arc::new(fake);
        let bitbucket = manager(fake.clone());
        let ctx = RequestContext::new();

        let comments = bitbucket
            .handle(&ctx, CallToolRequest::new("bitbucket_list_pr_comments", pr_args(json!({}))))
            .await
            .expect("comments");
        assert!(comments
            .joined_text()
            .starts_with("Found 2 comments on pull request #7"));

        let stats = bitbucket
            .handle(&ctx, CallToolRequest::new("bitbucket_get_pr_diffstat", pr_args(json!({}))))
            .await
            .expect("diffstat");
        assert!(stats
            .joined_text()
            .starts_with("Diffstat for PR #7: 2 files changed"));
        assert!(fake.requests()[1].url.path().ends_with("/pullrequests/7/diffstat"));
    }

    #[tokio::test]
    async fn file_content_needs_a_commit() {
        let fake = FakeTransport::responding(StatusCode::OK, "fn main() {}\n");
        let bitbucket = manager(fake.clone());
        let err = bitbucket
            .handle(
                &RequestContext::new(),
                CallToolRequest::new(
                    "bitbucket_get_file_content",
                    json!({"repo_owner": "acme", "repo_name": "widgets", "file_path": "src/main.rs"}),
                ),
            )
            .await
            .unwrap_err();
        assert_eq!(err.message, "commit hash is required");
        assert!(fake.requests().is_empty());

        let result = bitbucket
            .handle(
                &RequestContext::new(),
                CallToolRequest::new(
                    "bitbucket_get_file_content",
                    json!({"repo_owner": "acme", "repo_name": "widgets",
                           "file_path": "src/main.rs", "commit_hash": "abc123"}),
                ),
            )
            .await
            .expect("file");
        assert_eq!(
            result.joined_text(),
            "File content for src/main.rs at acme/widgets\nfn main() {}\n"
        );
        assert_eq!(
            fake.requests()[0].url.path(),
            "/2.0/repositories/acme/widgets/src/abc123/src/main.rs"
        );
    }
}
