// Q&A Board Domain Model

use crate::domain::error::{is_blank, DomainError, Result};
use serde::{Deserialize, Serialize};

/// An answer to a question. Answers are never edited or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub author: String,
    #[serde(rename = "answer")]
    pub body: String,
}

/// A posted question. Its id is its position in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub author: String,
    #[serde(rename = "question")]
    pub body: String,
    // Older stored questions may lack the key entirely
    #[serde(default)]
    pub answers: Vec<Answer>,
}

/// Questions in creation order.
///
/// Creation order is the only order used for storage and indexing. Newest
/// first is a display projection, see [`QuestionBoard::display_order`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionBoard {
    questions: Vec<Question>,
}

fn require(field: &'static str, value: &str) -> Result<()> {
    if is_blank(value) {
        return Err(DomainError::EmptyField(field));
    }
    Ok(())
}

impl QuestionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Questions in creation order
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, creation_index: usize) -> Option<&Question> {
        self.questions.get(creation_index)
    }

    pub fn post(&mut self, author: &str, body: &str) -> Result<Question> {
        require("author", author)?;
        require("body", body)?;

        let question = Question {
            author: author.to_string(),
            body: body.to_string(),
            answers: Vec::new(),
        };
        self.questions.push(question.clone());
        Ok(question)
    }

    /// Append an answer to the question at `creation_index`.
    ///
    /// Blank fields are reported before the index is checked.
    pub fn answer(&mut self, creation_index: usize, author: &str, body: &str) -> Result<Answer> {
        require("author", author)?;
        require("body", body)?;

        let len = self.questions.len();
        let question = self
            .questions
            .get_mut(creation_index)
            .ok_or(DomainError::IndexOutOfRange {
                index: creation_index,
                len,
            })?;

        let answer = Answer {
            author: author.to_string(),
            body: body.to_string(),
        };
        question.answers.push(answer.clone());
        Ok(answer)
    }

    /// Map a newest-first display index back to a creation index
    pub fn creation_index(&self, display_index: usize) -> Result<usize> {
        let len = self.questions.len();
        if display_index >= len {
            return Err(DomainError::IndexOutOfRange {
                index: display_index,
                len,
            });
        }
        Ok(len - 1 - display_index)
    }

    /// Newest first, each paired with its creation index.
    ///
    /// Never index storage with the position in this list; use the paired
    /// creation index or [`QuestionBoard::creation_index`].
    pub fn display_order(&self) -> Vec<(usize, &Question)> {
        self.questions.iter().enumerate().rev().collect()
    }
}

impl From<Vec<Question>> for QuestionBoard {
    fn from(questions: Vec<Question>) -> Self {
        Self { questions }
    }
}
