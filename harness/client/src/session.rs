// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Wallet pairing as a background task that can be awaited or cancelled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("the wallet did not approve the session within {0:?}")]
    TimedOut(Duration),

    #[error("the session request was cancelled")]
    Cancelled,

    #[error("the session request failed")]
    Failed(#[source] anyhow::Error),
}

/// Something that can establish a wallet session, e.g. a WalletConnect
/// relay. Pairing blocks until the user approves in their wallet, which
/// is why it runs on a background task.
#[async_trait]
pub trait SessionTransport: Send + Sync + 'static {
    type Client: Send + 'static;

    async fn pair(&self, project_id: &str) -> anyhow::Result<Self::Client>;
}

/// A pairing attempt in flight. Dropping it detaches the task; use
/// [`PendingSession::cancel`] to abort it instead.
pub struct PendingSession<C> {
    handle: JoinHandle<Result<C, SessionError>>,
    cancel: Arc<Notify>,
}

impl<C> PendingSession<C>
where
    C: Send + 'static,
{
    /// Start pairing on a background task with an approval deadline.
    pub fn spawn<T>(transport: T, project_id: String, timeout: Duration) -> Self
    where
        T: SessionTransport<Client = C>,
    {
        let cancel = Arc::new(Notify::new());
        let cancelled = cancel.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.notified() => Err(SessionError::Cancelled),
                paired = tokio::time::timeout(timeout, transport.pair(&project_id)) => {
                    match paired {
                        Err(_) => Err(SessionError::TimedOut(timeout)),
                        Ok(Ok(client)) => Ok(client),
                        Ok(Err(e)) => Err(SessionError::Failed(e)),
                    }
                }
            }
        });

        Self { handle, cancel }
    }

    /// Abort the pairing attempt. [`PendingSession::wait`] will report
    /// [`SessionError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    /// Wait for the wallet to approve or reject the session.
    pub async fn wait(self) -> Result<C, SessionError> {
        self.handle
            .await
            .map_err(|e| SessionError::Failed(anyhow::Error::new(e)))?
    }
}
