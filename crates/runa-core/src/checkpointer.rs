//! Per-thread conversation checkpointing.
//!
//! A [`Checkpointer`] is a thread-scoped persistence handle over a JSON-lines
//! store; the [`CheckpointerRegistry`] owns at most one live handle per
//! conversation thread and coalesces concurrent first-time initialization so
//! callers racing on the same thread id await the same handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OnceCell};
use uuid::Uuid;

use crate::error::{RuntimeError, RuntimeErrorKind, RuntimeResult};

/// One durable snapshot of conversation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    /// Turn number the snapshot was taken at.
    pub turn: u32,
    pub created_at: DateTime<Utc>,
    /// Serialized conversation messages.
    pub messages: Value,
}

impl Checkpoint {
    /// Creates a checkpoint for the given turn with a fresh id.
    pub fn new(turn: u32, messages: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            turn,
            created_at: Utc::now(),
            messages,
        }
    }
}

#[derive(Debug)]
enum StoreState {
    Uninitialized,
    Open {
        file: fs::File,
        records: Vec<Checkpoint>,
    },
    Closed,
}

/// Thread-scoped checkpoint store with an explicit open/close lifecycle.
///
/// One handle belongs to exactly one conversation; handles are never shared
/// across threads. Construction is cheap; `initialize` opens the underlying
/// storage and must complete before the handle is used.
#[derive(Debug)]
pub struct Checkpointer {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl Checkpointer {
    /// Creates an unopened handle for the given store path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(StoreState::Uninitialized),
        }
    }

    /// Returns the backing store path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the store: creates parent directories, loads any existing
    /// records, and opens the file for appending.
    ///
    /// # Errors
    /// Returns a resource initialization error if the store cannot be opened.
    pub async fn initialize(&self) -> RuntimeResult<()> {
        let mut state = self.state.lock().await;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                RuntimeError::resource_init(
                    format!("failed to create checkpoint dir {}", parent.display()),
                    e,
                )
            })?;
        }

        let records = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(serde_json::from_str)
                .collect::<Result<Vec<Checkpoint>, _>>()
                .map_err(|e| {
                    RuntimeError::resource_init(
                        format!("corrupt checkpoint store {}", self.path.display()),
                        e,
                    )
                })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(RuntimeError::resource_init(
                    format!("failed to read checkpoint store {}", self.path.display()),
                    e,
                ));
            }
        };

        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                RuntimeError::resource_init(
                    format!("failed to open checkpoint store {}", self.path.display()),
                    e,
                )
            })?;

        tracing::debug!(path = %self.path.display(), records = records.len(), "checkpoint store opened");
        *state = StoreState::Open { file, records };
        Ok(())
    }

    /// Appends one checkpoint durably.
    ///
    /// # Errors
    /// Returns an error if the store is not open or the write fails.
    pub async fn append(&self, checkpoint: Checkpoint) -> RuntimeResult<()> {
        let mut state = self.state.lock().await;
        let StoreState::Open { file, records } = &mut *state else {
            return Err(RuntimeError::new(
                RuntimeErrorKind::ResourceInit,
                format!("checkpoint store {} is not open", self.path.display()),
            ));
        };

        let mut line = serde_json::to_string(&checkpoint).map_err(|e| {
            RuntimeError::resource_init("failed to serialize checkpoint", e)
        })?;
        line.push('\n');
        file.write_all(line.as_bytes()).await.map_err(|e| {
            RuntimeError::resource_init(
                format!("failed to append checkpoint to {}", self.path.display()),
                e,
            )
        })?;
        file.flush().await.map_err(|e| {
            RuntimeError::resource_init(
                format!("failed to flush checkpoint store {}", self.path.display()),
                e,
            )
        })?;

        records.push(checkpoint);
        Ok(())
    }

    /// Returns the most recent checkpoint, if any.
    pub async fn latest(&self) -> Option<Checkpoint> {
        match &*self.state.lock().await {
            StoreState::Open { records, .. } => records.last().cloned(),
            _ => None,
        }
    }

    /// Returns the number of stored checkpoints.
    pub async fn len(&self) -> usize {
        match &*self.state.lock().await {
            StoreState::Open { records, .. } => records.len(),
            _ => 0,
        }
    }

    /// Returns true when no checkpoints are stored (or the store is not open).
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Flushes and releases the underlying storage. Subsequent appends error.
    ///
    /// # Errors
    /// Returns an error if the final flush fails.
    pub async fn close(&self) -> RuntimeResult<()> {
        let mut state = self.state.lock().await;
        if let StoreState::Open { file, .. } = &mut *state {
            file.flush().await.map_err(|e| {
                RuntimeError::resource_init(
                    format!("failed to flush checkpoint store {}", self.path.display()),
                    e,
                )
            })?;
        }
        *state = StoreState::Closed;
        Ok(())
    }
}

type Entry = Arc<OnceCell<Arc<Checkpointer>>>;

/// Process-wide mapping from thread id to its initialized checkpointer.
///
/// Explicitly owned and passed by reference to whoever needs it; lifecycle is
/// construction at process start and `close_all` at shutdown. Per-key
/// creation is guarded: concurrent first callers for one thread id await a
/// single in-flight initialization, so no orphaned handles exist.
pub struct CheckpointerRegistry {
    checkpoints_dir: PathBuf,
    entries: Mutex<HashMap<String, Entry>>,
}

impl CheckpointerRegistry {
    /// Creates a registry storing per-thread files under `checkpoints_dir`.
    pub fn new(checkpoints_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoints_dir: checkpoints_dir.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the store path for one conversation thread.
    pub fn thread_path(&self, thread_id: &str) -> PathBuf {
        self.checkpoints_dir.join(format!("{thread_id}.jsonl"))
    }

    /// Returns the checkpointer for a thread, initializing it on first use.
    ///
    /// The handle is published only after initialization completed; a failed
    /// initialization leaves no registry entry behind.
    ///
    /// # Errors
    /// Propagates checkpointer initialization failures unmodified.
    pub async fn get(&self, thread_id: &str) -> RuntimeResult<Arc<Checkpointer>> {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(
                entries
                    .entry(thread_id.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let result = cell
            .get_or_try_init(|| async {
                let path = self.thread_path(thread_id);
                tracing::debug!(thread_id, path = %path.display(), "initializing checkpointer");
                let checkpointer = Checkpointer::new(path);
                checkpointer.initialize().await?;
                Ok(Arc::new(checkpointer))
            })
            .await;

        match result {
            Ok(handle) => Ok(Arc::clone(handle)),
            Err(e) => {
                // Drop the empty cell so a later call starts fresh, but only
                // when nobody else holds a clone of it: cell clones are taken
                // exclusively under this lock, so a strong count above two
                // (the map's plus ours) means another caller is still awaiting
                // its own init on this cell and may yet publish a handle.
                let mut entries = self.entries.lock().await;
                if let Some(entry) = entries.get(thread_id)
                    && Arc::ptr_eq(entry, &cell)
                    && entry.get().is_none()
                    && Arc::strong_count(entry) == 2
                {
                    entries.remove(thread_id);
                }
                Err(e)
            }
        }
    }

    /// Closes and removes the handle for a thread. No-op when absent.
    ///
    /// # Errors
    /// Propagates close failures; the entry is removed regardless.
    pub async fn close(&self, thread_id: &str) -> RuntimeResult<()> {
        let entry = self.entries.lock().await.remove(thread_id);
        if let Some(entry) = entry
            && let Some(checkpointer) = entry.get()
        {
            checkpointer.close().await?;
        }
        Ok(())
    }

    /// Closes every handle concurrently and clears the registry.
    ///
    /// Used only at process shutdown.
    ///
    /// # Errors
    /// Returns the first close failure after attempting all closes.
    pub async fn close_all(&self) -> RuntimeResult<()> {
        let entries: Vec<Entry> = {
            let mut map = self.entries.lock().await;
            map.drain().map(|(_, entry)| entry).collect()
        };

        let closes = entries
            .iter()
            .filter_map(|entry| entry.get())
            .map(|checkpointer| checkpointer.close());
        let results = future::join_all(closes).await;
        results.into_iter().collect::<RuntimeResult<Vec<_>>>()?;
        Ok(())
    }

    /// Returns the number of live registry entries.
    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}
