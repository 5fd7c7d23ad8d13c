//! ---
//! fls_section: "05-leasing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Floating-license lease manager and service."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! Single-writer actor around [`LeaseManager`].
//!
//! One dedicated thread owns the manager and applies commands in arrival
//! order, so pool pop, table update, and state write never interleave.

use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};
use tracing::info;
use uuid::Uuid;

use crate::error::{LeaseError, LeaseResult};
use crate::manager::{LeaseManager, LeaseSnapshot};

const COMMAND_BUFFER: usize = 64;

enum Command {
    Lease {
        machine: String,
        user: String,
        id: Uuid,
        reply: oneshot::Sender<LeaseResult<Option<String>>>,
    },
    Snapshot {
        reply: oneshot::Sender<LeaseSnapshot>,
    },
    Shutdown,
}

/// Cloneable handle to the lease owner thread.
#[derive(Debug, Clone)]
pub struct LeaseService {
    commands: mpsc::Sender<Command>,
}

impl LeaseService {
    /// Move `manager` onto its owner thread.
    ///
    /// The thread exits when every handle is dropped or
    /// [`LeaseService::shutdown`] is called; joining returns the manager.
    pub fn spawn(manager: LeaseManager) -> (Self, JoinHandle<LeaseManager>) {
        let (commands, mut inbox) = mpsc::channel(COMMAND_BUFFER);
        let handle = thread::spawn(move || {
            let mut manager = manager;
            while let Some(command) = inbox.blocking_recv() {
                match command {
                    Command::Lease {
                        machine,
                        user,
                        id,
                        reply,
                    } => {
                        let _ = reply.send(manager.lease_license(&machine, &user, id));
                    }
                    Command::Snapshot { reply } => {
                        let _ = reply.send(manager.snapshot());
                    }
                    Command::Shutdown => break,
                }
            }
            info!("lease service stopped");
            manager
        });
        (Self { commands }, handle)
    }

    /// See [`LeaseManager::lease_license`].
    pub async fn lease_license(
        &self,
        machine: impl Into<String>,
        user: impl Into<String>,
        id: Uuid,
    ) -> LeaseResult<Option<String>> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Lease {
            machine: machine.into(),
            user: user.into(),
            id,
            reply,
        })
        .await?;
        response.await.map_err(|_| LeaseError::ServiceStopped)?
    }

    pub async fn snapshot(&self) -> LeaseResult<LeaseSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        response.await.map_err(|_| LeaseError::ServiceStopped)
    }

    /// Ask the owner thread to exit after draining earlier commands.
    pub async fn shutdown(&self) -> LeaseResult<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> LeaseResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| LeaseError::ServiceStopped)
    }
}
