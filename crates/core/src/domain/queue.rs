// Help Queue Domain Model

use crate::domain::error::{is_blank, DomainError, Result};
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// A student waiting for help. Names are unique within a queue
/// (case-sensitive); `name` plus `joined_at` identifies one visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub name: String,
    #[serde(default)]
    pub joined_at: i64, // epoch ms
    /// Wall-clock label from boards that only stored `"time"`
    #[serde(default, rename = "time", skip_serializing_if = "Option::is_none")]
    pub time_label: Option<String>,
}

impl QueueEntry {
    pub fn new(name: impl Into<String>, joined_at: i64) -> Self {
        Self {
            name: name.into(),
            joined_at,
            time_label: None,
        }
    }

    /// Same visit: same name and same join time
    pub fn is_same_visit(&self, other: &QueueEntry) -> bool {
        self.name == other.name && self.joined_at == other.joined_at
    }

    /// Join time as a local wall-clock label, e.g. `02:05 PM`
    pub fn joined_at_label(&self) -> String {
        if let Some(label) = &self.time_label {
            return label.clone();
        }
        match Local.timestamp_millis_opt(self.joined_at).single() {
            Some(t) => t.format("%I:%M %p").to_string(),
            None => "--:--".to_string(),
        }
    }
}

/// First-come-first-served queue of students.
///
/// Insertion order is wait order and position 0 is next to help. Removing an
/// entry never reorders the rest, and no two entries share a name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HelpQueue {
    entries: Vec<QueueEntry>,
}

impl HelpQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// 0-based wait position of `name`, if queued
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Append a new entry at the back of the queue.
    ///
    /// The name is stored as given; only blankness is checked on the
    /// trimmed value.
    pub fn join(&mut self, name: &str, now_millis: i64) -> Result<QueueEntry> {
        if is_blank(name) {
            return Err(DomainError::EmptyName);
        }
        if self.contains(name) {
            return Err(DomainError::DuplicateName(name.to_string()));
        }

        let entry = QueueEntry::new(name, now_millis);
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Remove and return the entry at position 0
    pub fn help_next(&mut self) -> Result<QueueEntry> {
        if self.entries.is_empty() {
            return Err(DomainError::EmptyQueue);
        }
        Ok(self.entries.remove(0))
    }

    /// Remove and return the entry at `index`
    pub fn remove(&mut self, index: usize) -> Result<QueueEntry> {
        if index >= self.entries.len() {
            return Err(DomainError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    /// Remove the entry for this exact visit, wherever it now sits
    pub fn remove_entry(&mut self, target: &QueueEntry) -> Result<QueueEntry> {
        match self.entries.iter().position(|e| e.is_same_visit(target)) {
            Some(index) => Ok(self.entries.remove(index)),
            None => Err(DomainError::NotInQueue(target.name.clone())),
        }
    }

    pub fn remove_by_name(&mut self, name: &str) -> Result<QueueEntry> {
        match self.position_of(name) {
            Some(index) => Ok(self.entries.remove(index)),
            None => Err(DomainError::NotInQueue(name.to_string())),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl From<Vec<QueueEntry>> for HelpQueue {
    fn from(entries: Vec<QueueEntry>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(queue: &HelpQueue) -> Vec<&str> {
        queue.entries().iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_join_rejects_blank_names() {
        let mut queue = HelpQueue::new();
        assert_eq!(queue.join("", 1).unwrap_err(), DomainError::EmptyName);
        assert_eq!(queue.join("   \t", 1).unwrap_err(), DomainError::EmptyName);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_join_rejects_duplicates_and_leaves_queue_unchanged() {
        let mut queue = HelpQueue::new();
        queue.join("Sam", 1000).unwrap();
        let before = queue.clone();

        let err = queue.join("Sam", 2000).unwrap_err();
        assert_eq!(err, DomainError::DuplicateName("Sam".to_string()));
        assert_eq!(queue, before);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut queue = HelpQueue::new();
        queue.join("sam", 1).unwrap();
        queue.join("Sam", 2).unwrap();
        assert_eq!(names(&queue), vec!["sam", "Sam"]);
    }

    #[test]
    fn test_help_next_is_fifo() {
        let mut queue = HelpQueue::new();
        for (i, name) in ["Ann", "Bo", "Cy", "Di"].iter().enumerate() {
            queue.join(name, i as i64).unwrap();
        }

        let served: Vec<String> = (0..4).map(|_| queue.help_next().unwrap().name).collect();
        assert_eq!(served, vec!["Ann", "Bo", "Cy", "Di"]);
        assert!(queue.is_empty());
        assert_eq!(queue.help_next().unwrap_err(), DomainError::EmptyQueue);
    }

    #[test]
    fn test_remove_keeps_order_of_remainder() {
        let mut queue = HelpQueue::new();
        for name in ["Ann", "Bo", "Cy", "Di"] {
            queue.join(name, 0).unwrap();
        }

        let removed = queue.remove(1).unwrap();
        assert_eq!(removed.name, "Bo");
        assert_eq!(names(&queue), vec!["Ann", "Cy", "Di"]);

        assert_eq!(
            queue.remove(3).unwrap_err(),
            DomainError::IndexOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn test_remove_by_name_and_position_of() {
        let mut queue = HelpQueue::new();
        for name in ["Ann", "Bo", "Cy"] {
            queue.join(name, 0).unwrap();
        }
        assert_eq!(queue.position_of("Cy"), Some(2));

        queue.remove_by_name("Bo").unwrap();
        assert_eq!(queue.position_of("Cy"), Some(1));
        assert_eq!(queue.position_of("Bo"), None);
        assert_eq!(
            queue.remove_by_name("Bo").unwrap_err(),
            DomainError::NotInQueue("Bo".to_string())
        );
    }

    #[test]
    fn test_remove_entry_follows_the_visit_not_the_slot() {
        let mut queue = HelpQueue::new();
        queue.join("Ann", 1).unwrap();
        queue.join("Bo", 2).unwrap();
        queue.join("Cy", 3).unwrap();
        let bo = queue.entries()[1].clone();

        queue.help_next().unwrap();
        assert_eq!(queue.remove_entry(&bo).unwrap().name, "Bo");
        assert_eq!(names(&queue), vec!["Cy"]);

        // Bo leaves and comes back: a different visit
        queue.join("Bo", 9).unwrap();
        assert_eq!(
            queue.remove_entry(&bo).unwrap_err(),
            DomainError::NotInQueue("Bo".to_string())
        );
        assert_eq!(names(&queue), vec!["Cy", "Bo"]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut queue = HelpQueue::new();
        queue.join("Ann", 0).unwrap();
        queue.clear();
        let once = queue.clone();
        queue.clear();
        assert_eq!(queue, once);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_stored_layout_is_a_plain_array() {
        let mut queue = HelpQueue::new();
        queue.join("Ann", 42).unwrap();

        let value = serde_json::to_value(&queue).unwrap();
        assert_eq!(value, serde_json::json!([{"name": "Ann", "joined_at": 42}]));
    }

    #[test]
    fn test_reads_entries_that_only_carry_a_time_label() {
        let queue: HelpQueue = serde_json::from_value(serde_json::json!([
            {"name": "Ann", "time": "02:05 PM"},
            {"name": "Bo", "joined_at": 42}
        ]))
        .unwrap();

        assert_eq!(names(&queue), vec!["Ann", "Bo"]);
        assert_eq!(queue.entries()[0].joined_at_label(), "02:05 PM");
        assert_eq!(queue.entries()[0].joined_at, 0);

        // The label survives a rewrite
        let value = serde_json::to_value(&queue).unwrap();
        assert_eq!(value[0]["time"], "02:05 PM");
        assert!(value[1].get("time").is_none());
    }
}
