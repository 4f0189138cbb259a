// Queue Manager - help queue use cases for one session

use crate::application::session::Session;
use crate::domain::{DomainError, HelpQueue, QueueEntry};
use crate::error::Result;
use tracing::info;

/// Help queue operations against a session's snapshot.
///
/// `help_next`, `remove`, `remove_by_name` and `clear` require the session's
/// access gate to be open.
pub struct QueueManager<'a> {
    session: &'a mut Session,
}

impl<'a> QueueManager<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Join the back of the queue
    pub async fn join(&mut self, name: &str) -> Result<QueueEntry> {
        let now = self.session.now_millis();
        let entry = self
            .session
            .mutate(|queue: &mut HelpQueue| queue.join(name, now))
            .await?;

        info!(name = %entry.name, joined_at = entry.joined_at, "Student joined the queue");
        Ok(entry)
    }

    /// Remove and return the student at the front
    pub async fn help_next(&mut self) -> Result<QueueEntry> {
        self.session.require_helper()?;
        let entry = self
            .session
            .mutate(|queue: &mut HelpQueue| queue.help_next())
            .await?;

        info!(name = %entry.name, "Helping next student");
        Ok(entry)
    }

    /// Remove the entry at a 0-based position of the current snapshot.
    ///
    /// The position picks a visit once; a re-applied write removes that
    /// visit wherever it has moved, or fails if it already left.
    pub async fn remove(&mut self, index: usize) -> Result<QueueEntry> {
        self.session.require_helper()?;
        let snapshot = self.session.queue_snapshot();
        let target = snapshot
            .entries()
            .get(index)
            .cloned()
            .ok_or(DomainError::IndexOutOfRange {
                index,
                len: snapshot.len(),
            })?;

        let entry = self
            .session
            .mutate(|queue: &mut HelpQueue| queue.remove_entry(&target))
            .await?;

        info!(name = %entry.name, index, "Removed student from the queue");
        Ok(entry)
    }

    pub async fn remove_by_name(&mut self, name: &str) -> Result<QueueEntry> {
        self.session.require_helper()?;
        let entry = self
            .session
            .mutate(|queue: &mut HelpQueue| queue.remove_by_name(name))
            .await?;

        info!(name = %entry.name, "Removed student from the queue");
        Ok(entry)
    }

    /// Empty the queue
    pub async fn clear(&mut self) -> Result<()> {
        self.session.require_helper()?;
        self.session
            .mutate(|queue: &mut HelpQueue| {
                queue.clear();
                Ok(())
            })
            .await?;

        info!("Queue cleared");
        Ok(())
    }

    /// Snapshot as of the last read
    pub fn list(&self) -> &[QueueEntry] {
        self.session.queue_snapshot().entries()
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.session.queue_snapshot().position_of(name)
    }
}
