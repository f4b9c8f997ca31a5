//! In-process fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::api::{RemoteSource, ResponseEnvelope, TransportError};
use crate::cache::{MemoryStorage, TtlStore};
use crate::catalog::{CatalogContext, FilterCriteria};
use crate::clock::ManualClock;

pub(crate) type Reply = Result<ResponseEnvelope, TransportError>;

enum Scripted {
    Ready(Reply),
    Gated(oneshot::Receiver<Reply>),
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub endpoint_id: String,
    pub action: String,
    pub criteria: FilterCriteria,
}

/// Remote source that answers from a queue of scripted replies.
///
/// Gated replies stay pending until the test sends through the returned
/// `oneshot::Sender`, which makes response ordering deterministic.
#[derive(Default)]
pub(crate) struct ScriptedRemote {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, scripted: Scripted) {
        self.script.lock().unwrap().push_back(scripted);
    }

    pub fn push_ok(&self, data: Value) {
        self.push(Scripted::Ready(Ok(ResponseEnvelope::ok(data))));
    }

    pub fn push_envelope(&self, envelope: ResponseEnvelope) {
        self.push(Scripted::Ready(Ok(envelope)));
    }

    pub fn push_error(&self, err: TransportError) {
        self.push(Scripted::Ready(Err(err)));
    }

    pub fn push_gated(&self) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.push(Scripted::Gated(rx));
        tx
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteSource for ScriptedRemote {
    async fn send(&self, endpoint_id: &str, action: &str, criteria: &FilterCriteria) -> Reply {
        self.requests.lock().unwrap().push(RecordedRequest {
            endpoint_id: endpoint_id.to_string(),
            action: action.to_string(),
            criteria: criteria.clone(),
        });

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Ready(reply)) => reply,
            Some(Scripted::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(TransportError::Network("gate dropped".to_string()))),
            None => Err(TransportError::Network("no scripted reply".to_string())),
        }
    }
}

/// Context over in-memory storage and a manual clock.
pub(crate) fn test_context(remote: Arc<ScriptedRemote>) -> (CatalogContext, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let store = TtlStore::new(Arc::new(MemoryStorage::new()), clock.clone());
    (CatalogContext::new(remote, Arc::new(store)), clock)
}
