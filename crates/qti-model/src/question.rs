//! Question, answer and option records.

use serde::Deserialize;

use crate::record::QuestionRecord;
use crate::serde_ext::{flexible_bool, lenient_number, ordered_values, text_or_number, tolerance};

/// Default mark used when a record does not carry one.
pub const DEFAULT_MARK: f64 = 1.0;

/// A question as supplied by the question bank.
///
/// Records are read-only input to the exporter; the asset rewriter works on
/// a clone so the caller's copy keeps its original file references.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "QuestionRecord")]
pub struct Question {
    pub id: u64,
    pub name: String,
    /// Rich-text body.
    pub text: String,
    /// Maximum achievable score.
    pub default_mark: f64,
    /// Storage area holding the files referenced by this question.
    pub context_id: u64,
    pub kind: QuestionKind,
}

impl Question {
    pub fn new(id: u64, name: impl Into<String>, text: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id,
            name: name.into(),
            text: text.into(),
            default_mark: DEFAULT_MARK,
            context_id: 0,
            kind,
        }
    }

    #[must_use]
    pub fn with_default_mark(mut self, default_mark: f64) -> Self {
        self.default_mark = default_mark;
        self
    }

    #[must_use]
    pub fn with_context_id(mut self, context_id: u64) -> Self {
        self.context_id = context_id;
        self
    }

    /// The host type tag (`multichoice`, `numerical`, ...).
    pub fn qtype(&self) -> &str {
        self.kind.qtype()
    }
}

/// Type-specific options, one variant per question type the exporter knows.
///
/// Types without an exporter (`category`, `description`, `essay`, `match`
/// and anything unrecognised) decode to [`QuestionKind::Unsupported`].
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    MultiChoice(ChoiceOptions),
    TrueFalse(TrueFalseOptions),
    ShortAnswer(ShortAnswerOptions),
    Numerical(NumericalOptions),
    MultiAnswer(MultiAnswerOptions),
    Unsupported { qtype: String },
}

impl QuestionKind {
    pub const MULTICHOICE: &'static str = "multichoice";
    pub const TRUEFALSE: &'static str = "truefalse";
    pub const SHORTANSWER: &'static str = "shortanswer";
    pub const NUMERICAL: &'static str = "numerical";
    pub const MULTIANSWER: &'static str = "multianswer";

    pub fn qtype(&self) -> &str {
        match self {
            Self::MultiChoice(_) => Self::MULTICHOICE,
            Self::TrueFalse(_) => Self::TRUEFALSE,
            Self::ShortAnswer(_) => Self::SHORTANSWER,
            Self::Numerical(_) => Self::NUMERICAL,
            Self::MultiAnswer(_) => Self::MULTIANSWER,
            Self::Unsupported { qtype } => qtype,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported { .. })
    }

    /// Combined feedback texts, for the types that carry them.
    pub fn feedback(&self) -> Option<&CombinedFeedback> {
        match self {
            Self::MultiChoice(options) => Some(&options.feedback),
            Self::TrueFalse(options) => Some(&options.feedback),
            Self::ShortAnswer(options) => Some(&options.feedback),
            Self::Numerical(options) => Some(&options.feedback),
            Self::MultiAnswer(_) | Self::Unsupported { .. } => None,
        }
    }

    pub fn feedback_mut(&mut self) -> Option<&mut CombinedFeedback> {
        match self {
            Self::MultiChoice(options) => Some(&mut options.feedback),
            Self::TrueFalse(options) => Some(&mut options.feedback),
            Self::ShortAnswer(options) => Some(&mut options.feedback),
            Self::Numerical(options) => Some(&mut options.feedback),
            Self::MultiAnswer(_) | Self::Unsupported { .. } => None,
        }
    }

    /// Answers owned directly by this question (empty for composites).
    pub fn answers(&self) -> &[Answer] {
        match self {
            Self::MultiChoice(options) => &options.answers,
            Self::TrueFalse(options) => &options.answers,
            Self::ShortAnswer(options) => &options.answers,
            Self::Numerical(options) => &options.answers,
            Self::MultiAnswer(_) | Self::Unsupported { .. } => &[],
        }
    }

    pub fn answers_mut(&mut self) -> &mut [Answer] {
        match self {
            Self::MultiChoice(options) => &mut options.answers,
            Self::TrueFalse(options) => &mut options.answers,
            Self::ShortAnswer(options) => &mut options.answers,
            Self::Numerical(options) => &mut options.answers,
            Self::MultiAnswer(_) | Self::Unsupported { .. } => &mut [],
        }
    }
}

/// Feedback shown for the overall outcome of a question.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CombinedFeedback {
    #[serde(default, alias = "correctfeedback")]
    pub correct: String,
    #[serde(default, alias = "partiallycorrectfeedback")]
    pub partially_correct: String,
    #[serde(default, alias = "incorrectfeedback")]
    pub incorrect: String,
}

/// Options for multiple-choice questions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChoiceOptions {
    /// Restrict the learner to a single selection.
    #[serde(default = "default_true", deserialize_with = "flexible_bool")]
    pub single: bool,
    /// Hint for the delivery system; the exporter never reorders choices.
    #[serde(
        default,
        alias = "shuffleanswers",
        deserialize_with = "flexible_bool"
    )]
    pub shuffle_answers: bool,
    #[serde(default, deserialize_with = "ordered_values")]
    pub answers: Vec<Answer>,
    #[serde(flatten)]
    pub feedback: CombinedFeedback,
}

/// Options for true/false questions: exactly two answers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrueFalseOptions {
    #[serde(default, deserialize_with = "ordered_values")]
    pub answers: Vec<Answer>,
    #[serde(flatten)]
    pub feedback: CombinedFeedback,
}

/// Options for short-answer (text match) questions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShortAnswerOptions {
    #[serde(default, alias = "usecase", deserialize_with = "flexible_bool")]
    pub use_case: bool,
    #[serde(default, deserialize_with = "ordered_values")]
    pub answers: Vec<Answer>,
    #[serde(flatten)]
    pub feedback: CombinedFeedback,
}

/// Options for numerical questions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NumericalOptions {
    #[serde(default, deserialize_with = "ordered_values")]
    pub answers: Vec<Answer>,
    #[serde(flatten)]
    pub feedback: CombinedFeedback,
}

/// Options for embedded-answer (cloze) questions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MultiAnswerOptions {
    pub questions: EmbeddedQuestions,
}

/// Sub-questions of an embedded-answer question keyed by placeholder, in
/// declaration order.
///
/// Key `"1"` corresponds to the `{#1}` marker in the parent's text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedQuestions {
    entries: Vec<(String, Question)>,
}

impl EmbeddedQuestions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sub-question; a repeated key replaces the earlier entry in place.
    pub fn insert(&mut self, key: impl Into<String>, question: Question) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = question,
            None => self.entries.push((key, question)),
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, question: Question) -> Self {
        self.insert(key, question);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Question)> {
        self.entries.iter().map(|(key, question)| (key.as_str(), question))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Question)> {
        self.entries
            .iter_mut()
            .map(|(key, question)| (key.as_str(), question))
    }

    /// Placeholder marker for a key, e.g. `{#1}`.
    pub fn placeholder(key: &str) -> String {
        format!("{{#{key}}}")
    }
}

/// One answer of a question.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Answer {
    pub id: u64,
    /// Display text, or the numeric value for numerical questions.
    #[serde(default, deserialize_with = "text_or_number")]
    pub answer: String,
    /// Score weight; a positive weight marks the answer as correct.
    #[serde(default, deserialize_with = "lenient_number")]
    pub fraction: f64,
    #[serde(default)]
    pub feedback: String,
    /// Accepted error either side of a numerical answer.
    #[serde(default, deserialize_with = "tolerance")]
    pub tolerance: f64,
}

impl Answer {
    pub fn new(id: u64, answer: impl Into<String>, fraction: f64) -> Self {
        Self {
            id,
            answer: answer.into(),
            fraction,
            feedback: String::new(),
            tolerance: 0.0,
        }
    }

    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn is_correct(&self) -> bool {
        self.fraction > 0.0
    }
}

fn default_true() -> bool {
    true
}
