//! Question data model for QTI item export.
//!
//! This crate describes the questions handed to the exporter by the host
//! question bank:
//!
//! - **Records** (`question`): [`Question`], [`Answer`] and the closed set of
//!   type-specific option blocks in [`QuestionKind`]
//! - **Decoding** (`record`): JSON question records with the host's loose
//!   typing (numeric strings, `0`/`1` flags, id-keyed answer maps)
//! - **Traversal** (`visit`): a typed visitor over every rich-text field of a
//!   question, its answers and embedded sub-questions

pub mod error;
pub mod question;
pub mod record;
mod serde_ext;
pub mod visit;

pub use error::{ModelError, Result};
pub use question::{
    Answer, ChoiceOptions, CombinedFeedback, EmbeddedQuestions, MultiAnswerOptions,
    NumericalOptions, Question, QuestionKind, ShortAnswerOptions, TrueFalseOptions,
};
pub use record::{questions_from_json, questions_from_value};
pub use visit::{FieldKey, FieldVisitor, walk_question_mut};
