//! Immutable, chainable request context.
//!
//! A [`Context`] carries typed values, an optional deadline and a cancellation
//! signal down a call chain. Every `with_*` method returns a new child and
//! leaves the receiver untouched, so a context can be shared freely between
//! tasks and derived from concurrently.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::request::RequestContext;

/// Typed key for values stored in a [`Context`].
///
/// Keys are distinguished by type, so a private key type cannot collide with
/// keys declared elsewhere.
pub trait ContextKey: 'static {
    type Value: Send + Sync + 'static;
}

struct ValueNode {
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<ValueNode>>,
}

/// Immutable context passed explicitly through call chains. Cheap to clone (Arc).
#[derive(Clone, Default)]
pub struct Context {
    values: Option<Arc<ValueNode>>,
    cancel: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl Context {
    /// Root context: no values, no deadline, never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child with `value` bound under key `K`.
    pub fn with_value<K: ContextKey>(&self, value: K::Value) -> Self {
        let node = ValueNode {
            key: TypeId::of::<K>(),
            value: Arc::new(value),
            parent: self.values.clone(),
        };
        Self {
            values: Some(Arc::new(node)),
            ..self.clone()
        }
    }

    /// Look up the nearest value bound under key `K`.
    pub fn value<K: ContextKey>(&self) -> Option<&K::Value> {
        let key = TypeId::of::<K>();
        let mut node = self.values.as_deref();
        while let Some(current) = node {
            if current.key == key {
                return current.value.downcast_ref::<K::Value>();
            }
            node = current.parent.as_deref();
        }
        None
    }

    /// Derive a child whose deadline is the earlier of `deadline` and the
    /// parent's deadline.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing <= deadline => existing,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Derive a child that is cancelled when the returned token fires or
    /// when any cancellable ancestor is cancelled.
    ///
    /// Cancelling the returned token never affects ancestors.
    pub fn with_cancel(&self) -> (Self, CancellationToken) {
        let token = match &self.cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let ctx = Self {
            cancel: Some(token.clone()),
            ..self.clone()
        };
        (ctx, token)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Cancelled, or past the deadline.
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.is_expired()
    }

    /// Resolves once this context or one of its ancestors is cancelled.
    ///
    /// Never resolves for a context without a cancellable ancestor.
    pub async fn cancelled(&self) {
        match &self.cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut values = 0;
        let mut node = self.values.as_deref();
        while let Some(current) = node {
            values += 1;
            node = current.parent.as_deref();
        }
        f.debug_struct("Context")
            .field("values", &values)
            .field("deadline", &self.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Anything that can act as a context for request-id resolution.
///
/// Implemented by the generic [`Context`] and by the framework-side
/// [`RequestContext`], which reports itself through
/// [`as_request_context`](ContextSource::as_request_context).
pub trait ContextSource {
    /// The generic context backing this source.
    fn context(&self) -> &Context;

    fn as_request_context(&self) -> Option<&RequestContext> {
        None
    }
}

impl ContextSource for Context {
    fn context(&self) -> &Context {
        self
    }
}
