//! Request-scoped ambient context.
//!
//! A [`RequestContext`] travels down every call made on behalf of one tool
//! invocation. It is immutable: the `with_*` methods return a new context
//! and leave the receiver untouched, so a context handed to a nested call can
//! never be altered by that call. Values are keyed by type, which keeps
//! unrelated layers from clobbering each other's entries.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Bearer token attached right before an authenticated outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken(pub String);

/// Identifier shared by every log line and nested call of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

/// Why [`RequestContext::done`] resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextDone {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for ContextDone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextDone::Cancelled => write!(f, "context cancelled"),
            ContextDone::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

impl std::error::Error for ContextDone {}

type ValueMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

#[derive(Clone, Default)]
pub struct RequestContext {
    values: Arc<ValueMap>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut values: ValueMap = (*self.values).clone();
        values.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            values: Arc::new(values),
            cancel: self.cancel.clone(),
            deadline: self.deadline,
        }
    }

    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn with_auth_token(&self, token: impl Into<String>) -> Self {
        self.with_value(AuthToken(token.into()))
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.value::<AuthToken>().map(|token| token.0.as_str())
    }

    pub fn with_correlation_id(&self, id: impl Into<String>) -> Self {
        self.with_value(CorrelationId(id.into()))
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.value::<CorrelationId>().map(|id| id.0.as_str())
    }

    /// Derives a context whose cancellation follows `token` instead of the
    /// receiver's.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            values: self.values.clone(),
            cancel: token,
            deadline: self.deadline,
        }
    }

    /// Derives a context with the given deadline; an earlier existing
    /// deadline is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing <= deadline => existing,
            _ => deadline,
        };
        Self {
            values: self.values.clone(),
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled()
            || self
                .deadline
                .map(|deadline| Instant::now() >= deadline)
                .unwrap_or(false)
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextDone {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancel.cancelled() => ContextDone::Cancelled,
                _ = tokio::time::sleep_until(deadline) => ContextDone::DeadlineExceeded,
            },
            None => {
                self.cancel.cancelled().await;
                ContextDone::Cancelled
            }
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("correlation_id", &self.correlation_id())
            .field("has_auth_token", &self.auth_token().is_some())
            .field("values", &self.values.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_value_does_not_touch_the_parent() {
        let parent = RequestContext::new().with_correlation_id("corr-1");
        let child = parent.with_auth_token("tok");

        assert_eq!(parent.auth_token(), None);
        assert_eq!(child.auth_token(), Some("tok"));
        assert_eq!(child.correlation_id(), Some("corr-1"));
    }

    #[test]
    fn later_value_of_same_type_shadows_earlier() {
        let ctx = RequestContext::new()
            .with_auth_token("first")
            .with_auth_token("second");
        assert_eq!(ctx.auth_token(), Some("second"));
    }

    #[test]
    fn debug_output_never_prints_the_token() {
        let ctx = RequestContext::new().with_auth_token("super-secret-token");
        let rendered = format!("{:?}", ctx);
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains("has_auth_token: true"));
    }

    #[test]
    fn with_deadline_keeps_the_earlier_deadline() {
        let now = Instant::now();
        let ctx = RequestContext::new().with_deadline(now + Duration::from_secs(5));
        let tighter = ctx.with_deadline(now + Duration::from_secs(60));
        assert_eq!(tighter.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn cancellation_is_shared_with_derived_contexts() {
        let parent = RequestContext::new();
        let child = parent.with_correlation_id("corr-2");
        parent.cancel();
        assert!(child.is_done());
        assert_eq!(child.done().await, ContextDone::Cancelled);
    }

    #[tokio::test]
    async fn done_reports_deadline_exceeded() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        assert_eq!(ctx.done().await, ContextDone::DeadlineExceeded);
    }
}
