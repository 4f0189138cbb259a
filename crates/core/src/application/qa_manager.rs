// Q&A Manager - question board use cases for one session

use crate::application::session::Session;
use crate::domain::{Answer, Question, QuestionBoard};
use crate::error::Result;
use tracing::info;

pub struct QaManager<'a> {
    session: &'a mut Session,
}

impl<'a> QaManager<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Post a new question with no answers
    pub async fn post(&mut self, author: &str, body: &str) -> Result<Question> {
        let question = self
            .session
            .mutate(|board: &mut QuestionBoard| board.post(author, body))
            .await?;

        info!(author = %question.author, "Question posted");
        Ok(question)
    }

    /// Answer the question at a creation-order index
    pub async fn answer(
        &mut self,
        creation_index: usize,
        author: &str,
        body: &str,
    ) -> Result<Answer> {
        let answer = self
            .session
            .mutate(|board: &mut QuestionBoard| board.answer(creation_index, author, body))
            .await?;

        info!(creation_index, author = %answer.author, "Answer posted");
        Ok(answer)
    }

    /// Answer the question shown at `display_index` in newest-first order.
    ///
    /// The display index is resolved against the snapshot the caller was
    /// looking at, before any write.
    pub async fn answer_displayed(
        &mut self,
        display_index: usize,
        author: &str,
        body: &str,
    ) -> Result<Answer> {
        let creation_index = self
            .session
            .question_snapshot()
            .creation_index(display_index)?;
        self.answer(creation_index, author, body).await
    }

    /// Questions in creation order
    pub fn list(&self) -> &[Question] {
        self.session.question_snapshot().questions()
    }

    /// Newest first, paired with creation indices
    pub fn display_order(&self) -> Vec<(usize, &Question)> {
        self.session.question_snapshot().display_order()
    }
}
