// Session - one client's view of the shared board
//
// A session keeps snapshots of both collections from its last read. Every
// mutation is computed from the local snapshot, written back as a whole
// collection, then followed by a refresh.

use crate::application::access_gate::AccessGate;
use crate::application::qa_manager::QaManager;
use crate::application::queue_manager::QueueManager;
use crate::domain::error::Result as DomainResult;
use crate::domain::{HelpQueue, QuestionBoard};
use crate::error::{AppError, Result};
use crate::port::{Collection, SharedStore, TimeProvider, Versioned, WriteOutcome};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a session writes a mutated collection back to the store.
///
/// The two policies are observably different systems: under
/// `LastWriteWins` two sessions mutating the same snapshot lose one update
/// silently; under `CompareAndSwap` the later writer re-applies its change
/// on top of the newer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Unconditional whole-collection write
    #[default]
    LastWriteWins,
    /// Version-checked write, re-applied up to `max_retries` times on conflict
    CompareAndSwap { max_retries: u32 },
}

impl FromStr for WritePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-write-wins" | "lww" => Ok(WritePolicy::LastWriteWins),
            "compare-and-swap" | "cas" => Ok(WritePolicy::CompareAndSwap {
                max_retries: crate::application::constants::DEFAULT_CAS_RETRIES,
            }),
            other => Err(AppError::Config(format!("Unknown write policy: {}", other))),
        }
    }
}

/// Everything a renderer needs, detached from the session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardView {
    pub queue: HelpQueue,
    pub questions: QuestionBoard,
    pub refreshed_at: Option<i64>,
}

impl BoardView {
    /// Age of this view at `now_millis`, `None` if it was never read
    pub fn staleness(&self, now_millis: i64) -> Option<i64> {
        staleness_at(self.refreshed_at, now_millis)
    }
}

fn staleness_at(refreshed_at: Option<i64>, now_millis: i64) -> Option<i64> {
    refreshed_at.map(|t| (now_millis - t).max(0))
}

/// Collections a session keeps a snapshot of
pub(crate) trait StoredCollection: Serialize + DeserializeOwned + Default + Clone + Send {
    const COLLECTION: Collection;

    fn slot(session: &Session) -> &Versioned<Self>;
    fn slot_mut(session: &mut Session) -> &mut Versioned<Self>;
}

impl StoredCollection for HelpQueue {
    const COLLECTION: Collection = Collection::HelpQueue;

    fn slot(session: &Session) -> &Versioned<Self> {
        &session.queue
    }

    fn slot_mut(session: &mut Session) -> &mut Versioned<Self> {
        &mut session.queue
    }
}

impl StoredCollection for QuestionBoard {
    const COLLECTION: Collection = Collection::Questions;

    fn slot(session: &Session) -> &Versioned<Self> {
        &session.questions
    }

    fn slot_mut(session: &mut Session) -> &mut Versioned<Self> {
        &mut session.questions
    }
}

/// Missing or null collections decode as empty
fn decode<T: DeserializeOwned + Default>(value: Option<Value>) -> Result<T> {
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => Ok(serde_json::from_value(v)?),
    }
}

pub struct Session {
    store: Arc<dyn SharedStore>,
    time_provider: Arc<dyn TimeProvider>,
    gate: AccessGate,
    policy: WritePolicy,
    queue: Versioned<HelpQueue>,
    questions: Versioned<QuestionBoard>,
    refreshed_at: Option<i64>,
}

impl Session {
    /// Create a session with empty, never-read snapshots
    pub fn new(
        store: Arc<dyn SharedStore>,
        time_provider: Arc<dyn TimeProvider>,
        gate: AccessGate,
        policy: WritePolicy,
    ) -> Self {
        Self {
            store,
            time_provider,
            gate,
            policy,
            queue: Versioned {
                value: HelpQueue::default(),
                version: 0,
            },
            questions: Versioned {
                value: QuestionBoard::default(),
                version: 0,
            },
            refreshed_at: None,
        }
    }

    /// Create a session and take the first snapshot
    pub async fn connect(
        store: Arc<dyn SharedStore>,
        time_provider: Arc<dyn TimeProvider>,
        gate: AccessGate,
        policy: WritePolicy,
    ) -> Result<Self> {
        let mut session = Self::new(store, time_provider, gate, policy);
        session.refresh().await?;
        Ok(session)
    }

    pub fn queue(&mut self) -> QueueManager<'_> {
        QueueManager::new(self)
    }

    pub fn questions(&mut self) -> QaManager<'_> {
        QaManager::new(self)
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut AccessGate {
        &mut self.gate
    }

    pub fn queue_snapshot(&self) -> &HelpQueue {
        &self.queue.value
    }

    pub fn question_snapshot(&self) -> &QuestionBoard {
        &self.questions.value
    }

    /// Time of the last successful read, epoch ms
    pub fn refreshed_at(&self) -> Option<i64> {
        self.refreshed_at
    }

    /// Milliseconds since the last successful read
    pub fn staleness(&self) -> Option<i64> {
        staleness_at(self.refreshed_at, self.time_provider.now_millis())
    }

    pub fn view(&self) -> BoardView {
        BoardView {
            queue: self.queue.value.clone(),
            questions: self.questions.value.clone(),
            refreshed_at: self.refreshed_at,
        }
    }

    /// Re-read both collections.
    ///
    /// Snapshots are only replaced once both reads succeed.
    pub async fn refresh(&mut self) -> Result<()> {
        let queue = self.read::<HelpQueue>().await?;
        let questions = self.read::<QuestionBoard>().await?;

        debug!(
            queue_version = queue.version,
            questions_version = questions.version,
            queue_len = queue.value.len(),
            questions_len = questions.value.len(),
            "Snapshots refreshed"
        );

        self.queue = queue;
        self.questions = questions;
        self.refreshed_at = Some(self.time_provider.now_millis());
        Ok(())
    }

    pub(crate) fn now_millis(&self) -> i64 {
        self.time_provider.now_millis()
    }

    pub(crate) fn require_helper(&self) -> Result<()> {
        if !self.gate.is_open() {
            return Err(AppError::Unauthorized);
        }
        Ok(())
    }

    async fn read<T: StoredCollection>(&self) -> Result<Versioned<T>> {
        let stored = self.store.read(T::COLLECTION).await?;
        Ok(Versioned {
            value: decode(stored.value)?,
            version: stored.version,
        })
    }

    /// Apply `op` to a copy of the local snapshot and write the whole
    /// collection back.
    ///
    /// A validation error or a store failure leaves both the snapshot and
    /// the store untouched. After a successful write the session refreshes.
    pub(crate) async fn mutate<T, R, F>(&mut self, mut op: F) -> Result<R>
    where
        T: StoredCollection,
        R: Send,
        F: FnMut(&mut T) -> DomainResult<R> + Send,
    {
        let collection = T::COLLECTION;
        let mut conflicts = 0u32;

        let result = loop {
            let (mut next, expected) = {
                let current = T::slot(self);
                (current.value.clone(), current.version)
            };
            let result = op(&mut next)?;
            let encoded = serde_json::to_value(&next)?;

            match self.policy {
                WritePolicy::LastWriteWins => {
                    let version = self.store.write(collection, &encoded).await?;
                    *T::slot_mut(self) = Versioned {
                        value: next,
                        version,
                    };
                    break result;
                }
                WritePolicy::CompareAndSwap { max_retries } => {
                    match self
                        .store
                        .write_if_version(collection, &encoded, expected)
                        .await?
                    {
                        WriteOutcome::Written(version) => {
                            *T::slot_mut(self) = Versioned {
                                value: next,
                                version,
                            };
                            break result;
                        }
                        WriteOutcome::Conflict(stored) => {
                            if conflicts >= max_retries {
                                warn!(
                                    collection = %collection,
                                    attempts = conflicts + 1,
                                    "Giving up after repeated write conflicts"
                                );
                                return Err(AppError::Conflict(format!(
                                    "{} changed {} times while writing",
                                    collection,
                                    conflicts + 1
                                )));
                            }
                            conflicts += 1;
                            debug!(
                                collection = %collection,
                                expected,
                                found = stored.version,
                                "Write conflict, re-applying on newer value"
                            );
                            *T::slot_mut(self) = Versioned {
                                value: decode(stored.value)?,
                                version: stored.version,
                            };
                        }
                    }
                }
            }
        };

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Refresh after write failed, keeping local snapshot");
        }

        Ok(result)
    }
}
