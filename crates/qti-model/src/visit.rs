//! Typed traversal of the rich-text fields of a question.
//!
//! The walk covers three kinds of container: the question itself, each of
//! its answers, and the sub-question mapping of an embedded-answer question
//! (recursively). Only text fields are handed to the visitor.

use std::fmt;

use crate::question::{Answer, EmbeddedQuestions, Question, QuestionKind};

/// Identifies a text field by the storage area its files live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    QuestionText,
    CorrectFeedback,
    PartiallyCorrectFeedback,
    IncorrectFeedback,
    Answer,
    AnswerFeedback,
}

impl FieldKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QuestionText => "questiontext",
            Self::CorrectFeedback => "correctfeedback",
            Self::PartiallyCorrectFeedback => "partiallycorrectfeedback",
            Self::IncorrectFeedback => "incorrectfeedback",
            Self::Answer => "answer",
            Self::AnswerFeedback => "answerfeedback",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives every text field reached by [`walk_question_mut`].
pub trait FieldVisitor {
    type Error;

    /// `owner_id` is the id of the record owning the field: the question for
    /// question-level fields, the answer for answer fields.
    fn visit_field(
        &mut self,
        key: FieldKey,
        owner_id: u64,
        value: &mut String,
    ) -> Result<(), Self::Error>;
}

enum FieldContainer<'a> {
    Question(&'a mut Question),
    Answer(&'a mut Answer),
    Embedded(&'a mut EmbeddedQuestions),
}

/// Visit every text field of `question`, its answers and sub-questions.
pub fn walk_question_mut<V: FieldVisitor>(
    question: &mut Question,
    visitor: &mut V,
) -> Result<(), V::Error> {
    walk(FieldContainer::Question(question), visitor)
}

fn walk<V: FieldVisitor>(container: FieldContainer<'_>, visitor: &mut V) -> Result<(), V::Error> {
    match container {
        FieldContainer::Question(question) => {
            let id = question.id;
            visitor.visit_field(FieldKey::QuestionText, id, &mut question.text)?;
            if let Some(feedback) = question.kind.feedback_mut() {
                visitor.visit_field(FieldKey::CorrectFeedback, id, &mut feedback.correct)?;
                visitor.visit_field(
                    FieldKey::PartiallyCorrectFeedback,
                    id,
                    &mut feedback.partially_correct,
                )?;
                visitor.visit_field(FieldKey::IncorrectFeedback, id, &mut feedback.incorrect)?;
            }
            if let QuestionKind::MultiAnswer(options) = &mut question.kind {
                walk(FieldContainer::Embedded(&mut options.questions), visitor)?;
            }
            for answer in question.kind.answers_mut() {
                walk(FieldContainer::Answer(answer), visitor)?;
            }
        }
        FieldContainer::Answer(answer) => {
            visitor.visit_field(FieldKey::Answer, answer.id, &mut answer.answer)?;
            visitor.visit_field(FieldKey::AnswerFeedback, answer.id, &mut answer.feedback)?;
        }
        FieldContainer::Embedded(questions) => {
            for (_, question) in questions.iter_mut() {
                walk(FieldContainer::Question(question), visitor)?;
            }
        }
    }
    Ok(())
}
