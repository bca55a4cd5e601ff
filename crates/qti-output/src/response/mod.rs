//! Response fragment builders.
//!
//! Each supported question kind derives a [`ResponseFragmentSet`] and an
//! [`Interaction`] from its answers. Embedded-answer questions dispatch to the
//! other builders once per sub-question and splice the interactions into the
//! shared body.

mod choice;
mod composite;
pub mod expr;
mod numeric;
mod text_match;

use std::fmt;
use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use qti_model::{Question, QuestionKind};

use crate::common::write_markup_element;
use crate::context::RunContext;
use crate::error::Result;

pub use expr::{BaseType, Branch, Expr, ResponseCondition, SetOutcome};

/// Total score outcome.
pub const SCORE: &str = "SCORE";
/// Outcome selecting the modal feedback block.
pub const FEEDBACK: &str = "FEEDBACK";
/// Template value added for each correct text or numeric response.
pub const SCORE_EACH_CORRECT: &str = "SCORE_EACH_CORRECT";
/// Template value added for each wrong text or numeric response.
pub const SCORE_EACH_WRONG: &str = "SCORE_EACH_WRONG";
/// Template value added for each unanswered response.
pub const SCORE_UNANSWERED: &str = "SCORE_UNANSWERED";

/// Identifier of the per-response correctness outcome.
pub fn correct_outcome(response_id: &str) -> String {
    format!("isCorrect_{response_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Multiple,
}

impl Cardinality {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multiple => "multiple",
        }
    }
}

/// Score awarded for one selectable choice.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: String,
    pub value: f64,
}

/// `responseDeclaration` of one interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDeclaration {
    pub identifier: String,
    pub cardinality: Cardinality,
    pub base_type: BaseType,
    /// Values of `correctResponse`; omitted when empty.
    pub correct: Vec<String>,
    /// Entries of `mapping`; omitted when empty.
    pub mapping: Vec<MapEntry>,
}

/// Everything one response contributes to an item besides its interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFragmentSet {
    pub response_id: String,
    pub declaration: ResponseDeclaration,
    /// Identifier of the `isCorrect_*` outcome declared for this response.
    pub outcome: String,
    /// Conditions updating `SCORE`, in order.
    pub scoring: Vec<ResponseCondition>,
    pub unanswered: Expr,
    pub correct: Expr,
    pub partially_correct: Expr,
    pub max_score: f64,
}

/// A selectable option of a choice interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleChoice {
    pub identifier: String,
    /// Sanitized markup.
    pub content: String,
    /// Sanitized markup shown inline once the choice is evaluated.
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceInteraction {
    pub response_id: String,
    pub shuffle: bool,
    /// `0` means unbounded.
    pub max_choices: u32,
    pub choices: Vec<SimpleChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntryInteraction {
    pub response_id: String,
    pub expected_length: u32,
    /// Vendor input width in characters.
    pub field_width: u32,
    pub numeric: bool,
}

/// The input widget placed in the item body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Choice(ChoiceInteraction),
    TextEntry(TextEntryInteraction),
}

impl Interaction {
    pub fn response_id(&self) -> &str {
        match self {
            Self::Choice(choice) => &choice.response_id,
            Self::TextEntry(entry) => &entry.response_id,
        }
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            Self::Choice(interaction) => {
                let mut start = BytesStart::new("choiceInteraction");
                start.push_attribute(("responseIdentifier", interaction.response_id.as_str()));
                start.push_attribute(("shuffle", if interaction.shuffle { "true" } else { "false" }));
                start.push_attribute(("maxChoices", interaction.max_choices.to_string().as_str()));
                writer.write_event(Event::Start(start))?;
                for choice in &interaction.choices {
                    let mut start = BytesStart::new("simpleChoice");
                    start.push_attribute(("identifier", choice.identifier.as_str()));
                    writer.write_event(Event::Start(start))?;
                    if !choice.content.is_empty() {
                        writer.write_event(Event::Text(BytesText::from_escaped(choice.content.as_str())))?;
                    }
                    if !choice.feedback.is_empty() {
                        let mut feedback = BytesStart::new("feedbackInline");
                        feedback.push_attribute(("outcomeIdentifier", FEEDBACK));
                        feedback.push_attribute(("identifier", choice.identifier.as_str()));
                        feedback.push_attribute(("showHide", "show"));
                        write_markup_element(writer, feedback, &choice.feedback)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new("simpleChoice")))?;
                }
                writer.write_event(Event::End(BytesEnd::new("choiceInteraction")))?;
            }
            Self::TextEntry(interaction) => {
                let mut element = BytesStart::new("textEntryInteraction");
                element.push_attribute(("expectedLength", interaction.expected_length.to_string().as_str()));
                element.push_attribute(("responseIdentifier", interaction.response_id.as_str()));
                element.push_attribute((
                    "inspera:inputFieldWidth",
                    interaction.field_width.to_string().as_str(),
                ));
                if interaction.numeric {
                    element.push_attribute(("inspera:type", "numeric"));
                }
                writer.write_event(Event::Empty(element))?;
            }
        }
        Ok(())
    }
}

/// Output of a single (non-composite) builder.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltResponse {
    pub fragments: ResponseFragmentSet,
    pub interaction: Interaction,
}

/// A piece of item body content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySegment {
    /// Sanitized markup.
    Markup(String),
    Interaction(Interaction),
}

/// Responses and body of one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResponses {
    pub sets: Vec<ResponseFragmentSet>,
    pub body: Vec<BodySegment>,
}

impl ItemResponses {
    /// Sum of the maximum scores of all responses.
    pub fn max_score(&self) -> f64 {
        self.sets.iter().map(|set| set.max_score).sum()
    }

    /// Interactions placed in the body, in order.
    pub fn interactions(&self) -> impl Iterator<Item = &Interaction> {
        self.body.iter().filter_map(|segment| match segment {
            BodySegment::Interaction(interaction) => Some(interaction),
            BodySegment::Markup(_) => None,
        })
    }
}

/// Why a question produced no item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedType(String),
    NoAnswers,
    NoCorrectAnswer,
    InvalidNumber(String),
    TrueFalseAnswerCount(usize),
    NoInteractions,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedType(qtype) => write!(f, "unsupported question type '{qtype}'"),
            Self::NoAnswers => f.write_str("no usable answer"),
            Self::NoCorrectAnswer => f.write_str("no answer carries a positive weight"),
            Self::InvalidNumber(value) => write!(f, "numerical answer '{value}' is not a number"),
            Self::TrueFalseAnswerCount(count) => {
                write!(f, "true/false question has {count} answers, expected 2")
            }
            Self::NoInteractions => f.write_str("no embedded question could be exported"),
        }
    }
}

/// Build the responses of `question`.
///
/// `body` is the question text, already sanitized.
pub fn build_responses(
    question: &Question,
    body: String,
    context: &RunContext,
) -> std::result::Result<ItemResponses, SkipReason> {
    if let QuestionKind::MultiAnswer(options) = &question.kind {
        return composite::build(&body, options, context);
    }
    let built = build_simple(question, context)
        .unwrap_or_else(|| Err(SkipReason::UnsupportedType(question.qtype().to_string())))?;
    let mut segments = Vec::with_capacity(2);
    if !body.is_empty() {
        segments.push(BodySegment::Markup(body));
    }
    segments.push(BodySegment::Interaction(built.interaction));
    Ok(ItemResponses {
        sets: vec![built.fragments],
        body: segments,
    })
}

/// Run the builder of a non-composite kind; `None` for kinds without one.
pub(crate) fn build_simple(
    question: &Question,
    context: &RunContext,
) -> Option<std::result::Result<BuiltResponse, SkipReason>> {
    let response_id = context.response_identifier(question.id);
    let built = match &question.kind {
        QuestionKind::MultiChoice(options) => choice::build_choice(question, options, response_id),
        QuestionKind::TrueFalse(options) => choice::build_true_false(question, options, response_id),
        QuestionKind::ShortAnswer(options) => text_match::build(options, response_id),
        QuestionKind::Numerical(options) => numeric::build(options, response_id),
        QuestionKind::MultiAnswer(_) | QuestionKind::Unsupported { .. } => return None,
    };
    Some(built)
}

/// One point for a matching response, nothing otherwise, plus the unanswered
/// adjustment. Shared by the text and numeric builders.
fn flat_scoring(response_id: &str, test: Expr) -> Vec<ResponseCondition> {
    vec![
        ResponseCondition::when(
            test,
            vec![
                SetOutcome::add(SCORE, Expr::variable(SCORE_EACH_CORRECT)),
                SetOutcome::new(
                    correct_outcome(response_id),
                    Expr::value(BaseType::String, "true"),
                ),
            ],
        )
        .otherwise(vec![SetOutcome::add(SCORE, Expr::variable(SCORE_EACH_WRONG))]),
        ResponseCondition::when(
            unanswered(response_id),
            vec![SetOutcome::add(SCORE, Expr::variable(SCORE_UNANSWERED))],
        ),
    ]
}

fn unanswered(response_id: &str) -> Expr {
    Expr::is_null(Expr::variable(response_id))
}
