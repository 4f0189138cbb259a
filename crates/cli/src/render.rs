//! Terminal rendering of board snapshots
//!
//! Numbers shown to people are 1-based. Queue numbers follow wait order;
//! question numbers follow newest-first display order.

use colored::Colorize;
use helpdesk_core::application::BoardView;
use helpdesk_core::domain::{HelpQueue, QuestionBoard};
use helpdesk_core::AppError;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct QueueRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Joined")]
    joined: String,
}

pub fn queue(queue: &HelpQueue) {
    println!("{}", "Current Queue".cyan().bold());

    if queue.is_empty() {
        println!("  The queue is currently empty.");
        return;
    }

    let rows: Vec<QueueRow> = queue
        .entries()
        .iter()
        .enumerate()
        .map(|(i, e)| QueueRow {
            position: i + 1,
            name: e.name.clone(),
            joined: e.joined_at_label(),
        })
        .collect();
    println!("{}", Table::new(rows));
}

pub fn questions(board: &QuestionBoard) {
    println!("{}", "Q&A Board".cyan().bold());

    if board.is_empty() {
        println!("  No questions yet. Be the first!");
        return;
    }

    for (number, (_, q)) in board.display_order().into_iter().enumerate() {
        println!(
            "{} {} - {}",
            format!("[{}]", number + 1).bold(),
            format!("Q: {}", q.body).bold(),
            format!("asked by {}", q.author).italic()
        );
        for a in &q.answers {
            println!("    {} {} - {}", "A:".green(), a.body, a.author.italic());
        }
    }
}

/// Both collections, with the age of the snapshot in milliseconds
pub fn board(view: &BoardView, staleness: Option<i64>) {
    queue(&view.queue);
    println!();
    questions(&view.questions);
    println!();
    println!("{}", freshness(staleness).dimmed());
}

fn freshness(staleness: Option<i64>) -> String {
    match staleness {
        None => "Not loaded yet".to_string(),
        Some(ms) if ms < 1_000 => "Updated just now".to_string(),
        Some(ms) => format!("Updated {}s ago", ms / 1_000),
    }
}

/// Inline message for a failed operation.
///
/// Validation failures name the violated constraint; store failures get a
/// generic message.
pub fn error_message(err: &AppError) -> String {
    match err {
        AppError::Domain(e) => e.to_string(),
        AppError::Unauthorized => {
            "Helper controls are locked. Pass the helper password with --password.".to_string()
        }
        AppError::Conflict(_) => {
            "The board changed too many times while saving. Please try again.".to_string()
        }
        AppError::StoreUnavailable(_) | AppError::Serialization(_) => {
            "Service unavailable. Please try again shortly.".to_string()
        }
        AppError::Config(msg) => format!("Configuration error: {}", msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_core::domain::DomainError;

    #[test]
    fn test_validation_message_names_constraint() {
        let msg = error_message(&AppError::Domain(DomainError::DuplicateName(
            "Sam".to_string(),
        )));
        assert!(msg.contains("Sam"));
        assert!(msg.contains("already in the queue"));
    }

    #[test]
    fn test_freshness_label() {
        assert_eq!(freshness(None), "Not loaded yet");
        assert_eq!(freshness(Some(250)), "Updated just now");
        assert_eq!(freshness(Some(12_400)), "Updated 12s ago");
    }

    #[test]
    fn test_store_failure_message_is_generic() {
        let msg = error_message(&AppError::StoreUnavailable(
            "Database locked (SQLITE_BUSY): /secret/path".to_string(),
        ));
        assert!(msg.starts_with("Service unavailable"));
        assert!(!msg.contains("/secret/path"));
    }
}
