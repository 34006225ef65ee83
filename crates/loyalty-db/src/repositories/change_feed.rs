//! PostgreSQL change feed over LISTEN/NOTIFY
//!
//! The migration installs a trigger on every collection table that sends
//! `{"collection": <table>, "op": "insert" | "update" | "delete"}` on
//! [`CHANGE_CHANNEL`].

use async_trait::async_trait;
use futures::channel::mpsc;
use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tracing::instrument;

use loyalty_core::{ChangeEvent, ChangeFeed, ChangeKind, ChangeStream, Collection, RepoResult};

use super::error::map_db_error;

/// NOTIFY channel the triggers publish on
pub const CHANGE_CHANNEL: &str = "loyalty_changes";

#[derive(Debug, Deserialize)]
struct Notification {
    collection: Collection,
    op: ChangeKind,
}

/// Decode a trigger payload; `None` for anything else on the channel
fn parse_notification(payload: &str) -> Option<ChangeEvent> {
    match serde_json::from_str::<Notification>(payload) {
        Ok(n) => Some(ChangeEvent {
            collection: n.collection,
            kind: n.op,
        }),
        Err(e) => {
            tracing::debug!(payload, error = %e, "Ignoring unrecognised notification");
            None
        }
    }
}

/// PostgreSQL implementation of ChangeFeed
#[derive(Clone)]
pub struct PgChangeFeed {
    pool: PgPool,
}

impl PgChangeFeed {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangeFeed for PgChangeFeed {
    #[instrument(skip(self))]
    async fn subscribe(&self, collection: Collection) -> RepoResult<ChangeStream> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(map_db_error)?;
        listener.listen(CHANGE_CHANNEL).await.map_err(map_db_error)?;

        let (tx, rx) = mpsc::unbounded();
        tokio::spawn(async move {
            loop {
                // recv() reconnects on its own after a dropped connection
                let notification = match listener.recv().await {
                    Ok(notification) => notification,
                    Err(e) => {
                        tracing::error!(%collection, error = %e, "Change feed stopped");
                        break;
                    }
                };

                let Some(event) = parse_notification(notification.payload()) else {
                    continue;
                };
                if event.collection != collection {
                    continue;
                }
                if tx.unbounded_send(event).is_err() {
                    tracing::debug!(%collection, "Change feed receiver dropped");
                    break;
                }
            }
        });

        tracing::info!(%collection, "Subscribed to remote changes");
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trigger_payload() {
        let event = parse_notification(r#"{"collection":"accounts","op":"update"}"#).unwrap();
        assert_eq!(event.collection, Collection::Accounts);
        assert_eq!(event.kind, ChangeKind::Update);

        let event = parse_notification(r#"{"collection":"orders","op":"delete"}"#).unwrap();
        assert_eq!(event.collection, Collection::Orders);
        assert_eq!(event.kind, ChangeKind::Delete);
    }

    #[test]
    fn test_parse_rejects_unknown_tables() {
        assert!(parse_notification(r#"{"collection":"_sqlx_migrations","op":"insert"}"#).is_none());
        assert!(parse_notification("not json").is_none());
    }
}
