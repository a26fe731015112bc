// Worker pool running bridge operations off the caller's thread

use anyhow::{Result, bail};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use uuid::Uuid;

use super::bridge::MediaBridge;
use super::error::BridgeResult;

/// One host request to run in the background
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOp {
    ResolveIdentifier { path: String },
    ResolvePath { identifier: String },
    Replace {
        identifier: String,
        staging_path: String,
    },
    RequestWritePermission { identifiers: Vec<String> },
}

/// Message from worker to the caller's thread
#[derive(Debug, Clone)]
pub enum BridgeMessage {
    OpStarted { request_id: Uuid },

    OpCompleted {
        request_id: Uuid,
        result: BridgeResult<Option<String>>,
    },

    WorkerIdle { worker_id: usize },
}

pub struct BridgePool {
    bridge: Arc<MediaBridge>,
    max_workers: Arc<Mutex<usize>>,
    tx: Sender<BridgeMessage>,
    rx: Receiver<BridgeMessage>,
    active_workers: Arc<Mutex<usize>>,
}

impl BridgePool {
    pub fn new(bridge: Arc<MediaBridge>, max_workers: usize) -> Self {
        let (tx, rx) = mpsc::channel();

        Self {
            bridge,
            max_workers: Arc::new(Mutex::new(max_workers)),
            tx,
            rx,
            active_workers: Arc::new(Mutex::new(0)),
        }
    }

    /// Results arrive here; drain it from the thread that wants them
    pub fn receiver(&self) -> &Receiver<BridgeMessage> {
        &self.rx
    }

    /// Run an operation on a new worker and return its request id
    pub fn submit(&self, worker_id: usize, op: BridgeOp) -> Result<Uuid> {
        if !self.can_spawn() {
            bail!(
                "All {} workers are busy; wait for a WorkerIdle message",
                self.max_workers()
            );
        }

        let request_id = Uuid::new_v4();
        let tx = self.tx.clone();
        let active = self.active_workers.clone();
        let bridge = Arc::clone(&self.bridge);

        // Count before spawning so back-to-back submits see the slot as taken
        *active.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        thread::spawn(move || {
            let _ = tx.send(BridgeMessage::OpStarted { request_id });

            let result = run_op(&bridge, &op);
            if let Err(e) = &result {
                tracing::debug!(%request_id, code = %e.code, "bridge op failed");
            }

            // Free the slot first so a caller reacting to OpCompleted can submit again
            *active.lock().unwrap_or_else(|e| e.into_inner()) -= 1;

            let _ = tx.send(BridgeMessage::OpCompleted { request_id, result });
            let _ = tx.send(BridgeMessage::WorkerIdle { worker_id });
        });

        Ok(request_id)
    }

    pub fn active_count(&self) -> usize {
        *self.active_workers.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn max_workers(&self) -> usize {
        *self.max_workers.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_max_workers(&self, max: usize) {
        *self.max_workers.lock().unwrap_or_else(|e| e.into_inner()) = max;
    }

    pub fn can_spawn(&self) -> bool {
        self.active_count() < self.max_workers()
    }
}

fn run_op(bridge: &MediaBridge, op: &BridgeOp) -> BridgeResult<Option<String>> {
    match op {
        BridgeOp::ResolveIdentifier { path } => bridge.resolve_identifier_from_path(path),
        BridgeOp::ResolvePath { identifier } => bridge.resolve_path_from_identifier(identifier),
        BridgeOp::Replace {
            identifier,
            staging_path,
        } => bridge.replace_at_identifier(identifier, staging_path),
        BridgeOp::RequestWritePermission { identifiers } => {
            let ids: Vec<&str> = identifiers.iter().map(String::as_str).collect();
            bridge.request_write_permission(&ids)
        }
    }
}
