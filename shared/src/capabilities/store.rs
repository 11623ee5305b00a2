use crux_core::capability::{Capability, CapabilityContext, Operation};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binder::{BoundData, QueryIdentity, SubscriptionId};
use crate::{AppError, ErrorKind};

/// Realtime document store. A subscription is a long-lived stream: the shell
/// emits a full snapshot on every change until it is told to unsubscribe.
pub struct Store<E> {
    context: CapabilityContext<StoreOperation, E>,
}

impl<Ev> Capability<Ev> for Store<Ev> {
    type Operation = StoreOperation;
    type MappedSelf<MappedEv> = Store<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Store::new(self.context.map_event(f))
    }
}

impl<E> Store<E>
where
    E: Send + 'static,
{
    pub fn new(context: CapabilityContext<StoreOperation, E>) -> Self {
        Self { context }
    }

    pub fn subscribe<F>(&self, id: SubscriptionId, query: QueryIdentity, make_event: F)
    where
        F: Fn(StoreResult) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let mut snapshots = Box::pin(ctx.stream_from_shell(StoreOperation::Subscribe { id, query }));
            while let Some(outcome) = snapshots.next().await {
                ctx.update_app(make_event(outcome));
            }
        });
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(StoreOperation::Unsubscribe { id }).await;
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreOperation {
    Subscribe {
        id: SubscriptionId,
        query: QueryIdentity,
    },
    Unsubscribe {
        id: SubscriptionId,
    },
}

impl Operation for StoreOperation {
    type Output = StoreResult;
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    #[error("permission denied reading {path}")]
    PermissionDenied { path: String },

    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    #[error("malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    #[error("subscription cancelled by the store")]
    Cancelled,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            StoreError::Unavailable { .. } | StoreError::Cancelled => {
                ErrorKind::UpstreamUnavailable
            }
            StoreError::MalformedSnapshot { .. } => ErrorKind::MalformedResponse,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let kind = err.kind();
        AppError::new(kind, "Unable to load your health records.").with_internal(err.to_string())
    }
}

pub type StoreResult = Result<BoundData, StoreError>;
