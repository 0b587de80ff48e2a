//! Session binding for HTTP exchanges
//!
//! Every `/mcp` exchange is bound to a session before its payload reaches
//! the dispatcher. Sessions are created on first contact and reused while the
//! client keeps presenting the same id.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::mcp::rpc::json_rpc_error;
use crate::mcp::server::handle_json_rpc_value;
use crate::AppState;

pub const SESSION_HEADER: &str = "mcp-session-id";

/// Sessions kept before the oldest is forgotten. A client whose session was
/// evicted is handed a fresh id on its next exchange.
pub const MAX_SESSIONS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Result of one exchange: the session it was bound to and the reply, if
/// the payload warranted one.
#[derive(Debug)]
pub struct Exchange {
    pub session: Arc<Session>,
    pub reply: Option<Value>,
}

#[derive(Debug, Default)]
struct SessionStore {
    by_id: HashMap<String, Arc<Session>>,
    order: VecDeque<String>,
}

#[derive(Debug)]
pub struct SessionTransport {
    sessions: RwLock<SessionStore>,
    capacity: usize,
}

impl Default for SessionTransport {
    fn default() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }
}

impl SessionTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(SessionStore::default()),
            capacity: capacity.max(1),
        }
    }

    /// Mints and records a fresh session id.
    pub async fn initialize_session(&self) -> Arc<Session> {
        let session = Arc::new(Session {
            id: Uuid::new_v4().simple().to_string(),
            created_at: Utc::now(),
        });

        let mut store = self.sessions.write().await;
        while store.order.len() >= self.capacity {
            let Some(oldest) = store.order.pop_front() else {
                break;
            };
            store.by_id.remove(&oldest);
            debug!(session_id = %oldest, "session evicted");
        }
        store.order.push_back(session.id.clone());
        store.by_id.insert(session.id.clone(), Arc::clone(&session));
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.by_id.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.by_id.is_empty()
    }

    /// Reuses the presented session when known, otherwise starts a new one.
    pub async fn resolve(&self, presented: Option<&str>, is_handshake: bool) -> Arc<Session> {
        let presented = presented.map(str::trim).filter(|id| !id.is_empty());

        if let Some(id) = presented {
            if let Some(session) = self.get(id).await {
                return session;
            }
        }

        let session = self.initialize_session().await;
        info!(
            session_id = %session.id,
            handshake = is_handshake,
            unknown_id = presented.is_some(),
            "session initialized"
        );
        session
    }

    /// Decodes one HTTP body, binds it to a session and runs it through the
    /// dispatcher. Only undecodable bodies fail; everything else yields a
    /// protocol reply.
    pub async fn handle_exchange(
        &self,
        state: &AppState,
        presented: Option<&str>,
        body: &[u8],
    ) -> Result<Exchange, AppError> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|err| AppError::transport(format!("undecodable request body: {err}")))?;

        let session = self.resolve(presented, contains_handshake(&payload)).await;

        let reply = match payload {
            Value::Array(batch) => {
                if batch.is_empty() {
                    Some(Value::Array(vec![json_rpc_error(
                        None,
                        -32600,
                        "Invalid Request",
                    )]))
                } else {
                    let mut responses = Vec::new();
                    for item in batch {
                        if let Some(response) = handle_json_rpc_value(state, item).await {
                            responses.push(response);
                        }
                    }
                    (!responses.is_empty()).then_some(Value::Array(responses))
                }
            }
            single => handle_json_rpc_value(state, single).await,
        };

        Ok(Exchange { session, reply })
    }
}

fn contains_handshake(payload: &Value) -> bool {
    let is_initialize =
        |message: &Value| message.get("method").and_then(Value::as_str) == Some("initialize");

    match payload {
        Value::Array(batch) => batch.iter().any(is_initialize),
        single => is_initialize(single),
    }
}
