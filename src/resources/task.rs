//! Background asset loads with explicit state, cancellation and a time limit.
//!
//! Each load runs as its own task. Its outcome travels back over a channel
//! and is picked up by [`AssetTasks::poll`] on the render thread, so the
//! scene is only ever mutated there.

use std::{collections::HashMap, future::Future, time::Duration};

use futures::{
    StreamExt,
    channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded},
    future::{AbortHandle, Aborted, abortable},
};

use crate::resources::classify::ClassifyError;

#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send> MaybeSend for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T> MaybeSend for T {}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load {label}: {message}")]
    Load { label: String, message: String },
    #[error("loading {label} took longer than {seconds}s")]
    TimedOut { label: String, seconds: f32 },
    #[error("loading {label} was cancelled")]
    Cancelled { label: String },
    #[error("cannot classify the parts of {label}")]
    Classify {
        label: String,
        #[source]
        source: ClassifyError,
    },
}

impl AssetError {
    fn from_load(label: &str, error: anyhow::Error) -> Self {
        match error.downcast::<ClassifyError>() {
            Ok(source) => AssetError::Classify {
                label: label.to_string(),
                source,
            },
            Err(error) => AssetError::Load {
                label: label.to_string(),
                message: format!("{error:#}"),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Ready,
    Failed(String),
    Cancelled,
}

/// Where tasks run: the app's tokio runtime natively, the browser's
/// microtask queue on the web.
#[derive(Clone, Debug)]
pub struct Spawner {
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Handle,
}

impl Spawner {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn new() -> Self {
        Self {}
    }

    fn spawn(&self, task: impl Future<Output = ()> + MaybeSend + 'static) {
        #[cfg(not(target_arch = "wasm32"))]
        self.runtime.spawn(task);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(task);
    }
}

type Outcome<T> = (TaskId, Result<T, AssetError>);

struct Entry {
    label: String,
    state: TaskState,
    abort: Option<AbortHandle>,
}

pub struct AssetTasks<T> {
    spawner: Spawner,
    timeout: Option<Duration>,
    next_id: u32,
    entries: HashMap<TaskId, Entry>,
    sender: UnboundedSender<Outcome<T>>,
    receiver: UnboundedReceiver<Outcome<T>>,
}

impl<T: MaybeSend + 'static> AssetTasks<T> {
    /// `timeout` limits every load; `None` or a browser target means no
    /// limit.
    pub fn new(spawner: Spawner, timeout: Option<Duration>) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            spawner,
            timeout,
            next_id: 0,
            entries: HashMap::new(),
            sender,
            receiver,
        }
    }

    pub fn spawn<F>(&mut self, label: impl Into<String>, load: F) -> TaskId
    where
        F: Future<Output = anyhow::Result<T>> + MaybeSend + 'static,
    {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let label = label.into();
        log::info!("loading {label}");

        let (load, abort) = abortable(load);
        let sender = self.sender.clone();
        let name = label.clone();
        #[cfg(not(target_arch = "wasm32"))]
        let timeout = self.timeout;
        let task = async move {
            #[cfg(not(target_arch = "wasm32"))]
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, load).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let _ = sender.unbounded_send((
                            id,
                            Err(AssetError::TimedOut {
                                label: name,
                                seconds: limit.as_secs_f32(),
                            }),
                        ));
                        return;
                    }
                },
                None => load.await,
            };
            #[cfg(target_arch = "wasm32")]
            let outcome = load.await;

            let result = match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(AssetError::from_load(&name, error)),
                Err(Aborted) => Err(AssetError::Cancelled { label: name }),
            };
            // the receiver is gone once the session is torn down
            let _ = sender.unbounded_send((id, result));
        };
        self.spawner.spawn(task);

        self.entries.insert(
            id,
            Entry {
                label,
                state: TaskState::Pending,
                abort: Some(abort),
            },
        );
        id
    }

    pub fn state(&self, id: TaskId) -> Option<&TaskState> {
        self.entries.get(&id).map(|e| &e.state)
    }

    pub fn label(&self, id: TaskId) -> Option<&str> {
        self.entries.get(&id).map(|e| e.label.as_str())
    }

    pub fn pending(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.state == TaskState::Pending)
            .count()
    }

    /// Aborts a pending task. Its result, should one still arrive, is
    /// discarded.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if entry.state == TaskState::Pending => {
                if let Some(abort) = entry.abort.take() {
                    abort.abort();
                }
                entry.state = TaskState::Cancelled;
                log::info!("cancelled loading {}", entry.label);
                true
            }
            _ => false,
        }
    }

    pub fn cancel_all(&mut self) -> usize {
        let ids: Vec<TaskId> = self.entries.keys().copied().collect();
        ids.into_iter().filter(|&id| self.cancel(id)).count()
    }

    /// Records an outcome. Outcomes of tasks that are no longer pending
    /// are dropped.
    fn settle(&mut self, (id, result): Outcome<T>) -> Option<Outcome<T>> {
        let entry = self.entries.get_mut(&id)?;
        if entry.state != TaskState::Pending {
            return None;
        }
        entry.abort = None;
        entry.state = match &result {
            Ok(_) => {
                log::info!("loaded {}", entry.label);
                TaskState::Ready
            }
            Err(AssetError::Cancelled { .. }) => TaskState::Cancelled,
            Err(error) => {
                log::error!("{error}");
                TaskState::Failed(error.to_string())
            }
        };
        Some((id, result))
    }

    /// Every outcome that arrived since the last call, without blocking.
    pub fn poll(&mut self) -> Vec<Outcome<T>> {
        let mut settled = Vec::new();
        while let Ok(Some(outcome)) = self.receiver.try_next() {
            settled.extend(self.settle(outcome));
        }
        settled
    }

    /// Waits for the next outcome of a pending task. `None` once nothing is
    /// pending.
    pub async fn next(&mut self) -> Option<Outcome<T>> {
        while self.pending() > 0 {
            let outcome = self.receiver.next().await?;
            if let Some(settled) = self.settle(outcome) {
                return Some(settled);
            }
        }
        None
    }
}
