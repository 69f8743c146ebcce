//! Bitbucket Cloud REST client. Every operation resolves a token, binds it
//! to the request context and runs one JSON call through the executor.

pub mod models;

use chrono::Utc;
use reqwest::Method;
use tracing::debug;
use url::Url;

use crate::auth::TokenProvider;
use crate::context::RequestContext;
use crate::errors::{ClientError, OperationContext, OperationError};
use crate::http::{endpoint, HttpExecutor, SendRequest};

use models::{
    ChangesRequested, Comment, CommentPage, CommentRef, DiffQuery, DiffStatPage, InlinePosition,
    MergeParameters, NewComment, NewPullRequest, NewTask, Participant, PullRequest,
    PullRequestUpdate, RenderedText, Task, TaskPage, TaskQuery, TaskUpdate,
};

/// Repository coordinates plus a pull request number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub id: u64,
}

impl PullRequestRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, id: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            id,
        }
    }
}

#[derive(Clone)]
pub struct BitbucketClient {
    executor: HttpExecutor,
    base_url: String,
}

impl BitbucketClient {
    pub fn new(executor: HttpExecutor, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            base_url: base_url.into(),
        }
    }

    async fn authorize(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
    ) -> Result<RequestContext, ClientError> {
        let token = tokens.get_token(ctx).await?;
        Ok(ctx.with_auth_token(token))
    }

    fn repo_url(&self, owner: &str, repo: &str, rest: &[&str]) -> Result<Url, ClientError> {
        let mut segments = vec!["repositories", owner, repo];
        segments.extend_from_slice(rest);
        endpoint(&self.base_url, &segments)
    }

    fn pr_url(&self, pr: &PullRequestRef, rest: &[&str]) -> Result<Url, ClientError> {
        let id = pr.id.to_string();
        let mut segments = vec!["pullrequests", id.as_str()];
        segments.extend_from_slice(rest);
        self.repo_url(&pr.owner, &pr.repo, &segments)
    }

    fn diff_url(&self, pr: &PullRequestRef, kind: &str, query: &DiffQuery) -> Result<Url, ClientError> {
        let mut url = self.pr_url(pr, &[kind])?;
        {
            let mut pairs = url.query_pairs_mut();
            for path in query.paths.iter().filter(|p| !p.is_empty()) {
                pairs.append_pair("path", path);
            }
            if let Some(context) = query.context {
                pairs.append_pair("context", &context.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    pub async fn get_pr(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
    ) -> Result<PullRequest, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let mut pull_request = PullRequest::default();
            self.executor
                .send(
                    &ctx,
                    SendRequest::new(Method::GET, self.pr_url(pr, &[])?)
                        .target(&mut pull_request),
                )
                .await?;
            Ok::<_, ClientError>(pull_request)
        }
        .await
        .operation("get pull request")
    }

    pub async fn create_pr(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        owner: &str,
        repo: &str,
        request: &NewPullRequest,
    ) -> Result<PullRequest, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let url = self.repo_url(owner, repo, &["pullrequests"])?;
            let mut pull_request = PullRequest::default();
            self.executor
                .send(
                    &ctx,
                    SendRequest::new(Method::POST, url)
                        .body(request)
                        .target(&mut pull_request),
                )
                .await?;
            debug!(id = pull_request.id, owner, repo, "pull request created");
            Ok::<_, ClientError>(pull_request)
        }
        .await
        .operation("create pull request")
    }

    pub async fn update_pr(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
        update: &PullRequestUpdate,
    ) -> Result<PullRequest, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let mut pull_request = PullRequest::default();
            self.executor
                .send(
                    &ctx,
                    SendRequest::new(Method::PUT, self.pr_url(pr, &[])?)
                        .body(update)
                        .target(&mut pull_request),
                )
                .await?;
            Ok::<_, ClientError>(pull_request)
        }
        .await
        .operation("update pull request")
    }

    pub async fn approve_pr(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
    ) -> Result<Participant, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let mut participant = Participant::default();
            self.executor
                .send(
                    &ctx,
                    SendRequest::new(Method::POST, self.pr_url(pr, &["approve"])?)
                        .target(&mut participant),
                )
                .await?;
            Ok::<_, ClientError>(participant)
        }
        .await
        .operation("approve pull request")
    }

    /// Withdraws the caller's approval; Bitbucket answers with an empty body.
    pub async fn request_pr_changes(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
    ) -> Result<ChangesRequested, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            self.executor
                .send(
                    &ctx,
                    SendRequest::new(Method::DELETE, self.pr_url(pr, &["approve"])?),
                )
                .await?;
            Ok::<_, ClientError>(ChangesRequested {
                status: "approval_removed",
                at: Utc::now(),
            })
        }
        .await
        .operation("request changes (remove approval)")
    }

    pub async fn merge_pr(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
        parameters: Option<&MergeParameters>,
    ) -> Result<PullRequest, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let url = self.pr_url(pr, &["merge"])?;
            let mut pull_request = PullRequest::default();
            match parameters {
                Some(parameters) => {
                    self.executor
                        .send(
                            &ctx,
                            SendRequest::new(Method::POST, url)
                                .body(parameters)
                                .target(&mut pull_request),
                        )
                        .await?
                }
                None => {
                    self.executor
                        .send(
                            &ctx,
                            SendRequest::new(Method::POST, url).target(&mut pull_request),
                        )
                        .await?
                }
            }
            Ok::<_, ClientError>(pull_request)
        }
        .await
        .operation("merge pull request")
    }

    pub async fn add_pr_comment(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
        text: &str,
        inline: Option<InlinePosition>,
    ) -> Result<Comment, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let payload = NewComment {
                content: RenderedText::raw(text),
                inline,
            };
            let mut comment = Comment::default();
            self.executor
                .send(
                    &ctx,
                    SendRequest::new(Method::POST, self.pr_url(pr, &["comments"])?)
                        .body(&payload)
                        .target(&mut comment),
                )
                .await?;
            Ok::<_, ClientError>(comment)
        }
        .await
        .operation("add pull request comment")
    }

    pub async fn list_pr_tasks(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
        query: &TaskQuery,
    ) -> Result<TaskPage, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let mut url = self.pr_url(pr, &["tasks"])?;
            {
                let mut pairs = url.query_pairs_mut();
                if let Some(q) = query.q.as_deref().filter(|q| !q.is_empty()) {
                    pairs.append_pair("q", q);
                }
                if let Some(sort) = query.sort.as_deref().filter(|s| !s.is_empty()) {
                    pairs.append_pair("sort", sort);
                }
                if let Some(pagelen) = query.pagelen.filter(|n| *n > 0) {
                    pairs.append_pair("pagelen", &pagelen.to_string());
                }
            }
            if url.query() == Some("") {
                url.set_query(None);
            }
            let mut page = TaskPage::default();
            self.executor
                .send(&ctx, SendRequest::new(Method::GET, url).target(&mut page))
                .await?;
            Ok::<_, ClientError>(page)
        }
        .await
        .operation("list pull request tasks")
    }

    pub async fn create_pr_task(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
        content: &str,
        comment_id: Option<u64>,
        pending: Option<bool>,
    ) -> Result<Task, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let payload = NewTask {
                content: RenderedText::raw(content),
                comment: comment_id.map(|id| CommentRef { id }),
                pending,
            };
            let mut task = Task::default();
            self.executor
                .send(
                    &ctx,
                    SendRequest::new(Method::POST, self.pr_url(pr, &["tasks"])?)
                        .body(&payload)
                        .target(&mut task),
                )
                .await?;
            Ok::<_, ClientError>(task)
        }
        .await
        .operation("create pull request task")
    }

    pub async fn update_pr_task(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
        task_id: u64,
        update: &TaskUpdate,
    ) -> Result<Task, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let task_id = task_id.to_string();
            let mut task = Task::default();
            self.executor
                .send(
                    &ctx,
                    SendRequest::new(Method::PUT, self.pr_url(pr, &["tasks", &task_id])?)
                        .body(update)
                        .target(&mut task),
                )
                .await?;
            Ok::<_, ClientError>(task)
        }
        .await
        .operation("update task")
    }

    pub async fn list_pr_comments(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
    ) -> Result<CommentPage, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let mut page = CommentPage::default();
            self.executor
                .send(
                    &ctx,
                    SendRequest::new(Method::GET, self.pr_url(pr, &["comments"])?)
                        .target(&mut page),
                )
                .await?;
            Ok::<_, ClientError>(page)
        }
        .await
        .operation("list pull request comments")
    }

    pub async fn get_pr_diffstat(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
        query: &DiffQuery,
    ) -> Result<DiffStatPage, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let url = self.diff_url(pr, "diffstat", query)?;
            let mut page = DiffStatPage::default();
            self.executor
                .send(&ctx, SendRequest::new(Method::GET, url).target(&mut page))
                .await?;
            Ok::<_, ClientError>(page)
        }
        .await
        .operation("get pull request diffstat")
    }

    /// Unified diff as served by Bitbucket.
    pub async fn get_pr_diff(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        pr: &PullRequestRef,
        query: &DiffQuery,
    ) -> Result<String, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let url = self.diff_url(pr, "diff", query)?;
            let mut diff = String::new();
            self.executor
                .send(&ctx, SendRequest::new(Method::GET, url).text_target(&mut diff))
                .await?;
            Ok::<_, ClientError>(diff)
        }
        .await
        .operation("get pull request diff")
    }

    /// `file_path` is split on `/` so nested files keep their directories.
    pub async fn get_file_content(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenProvider,
        owner: &str,
        repo: &str,
        commit: &str,
        file_path: &str,
    ) -> Result<String, OperationError> {
        async {
            let ctx = self.authorize(ctx, tokens).await?;
            let mut segments = vec!["src", commit];
            segments.extend(file_path.split('/').filter(|part| !part.is_empty()));
            let url = self.repo_url(owner, repo, &segments)?;
            let mut content = String::new();
            self.executor
                .send(&ctx, SendRequest::new(Method::GET, url).text_target(&mut content))
                .await?;
            Ok::<_, ClientError>(content)
        }
        .await
        .operation("get file content")
    }
}
