//! Item assembly.
//!
//! Merges the response fragment sets of one question with its body and
//! feedback into a complete `assessmentItem` document.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use qti_model::{CombinedFeedback, Question};

use crate::common::{
    INSPERA_NS, QTI_NS, QTI_SCHEMA_LOCATION, XSI_NS, format_number, write_declaration,
    write_markup_element, write_text_element, xml_writer,
};
use crate::context::{RunContext, item_path};
use crate::error::Result;
use crate::response::expr::write_condition;
use crate::response::{
    BaseType, BodySegment, Expr, FEEDBACK, ItemResponses, ResponseCondition, ResponseDeclaration,
    SCORE, SCORE_EACH_CORRECT, SCORE_EACH_WRONG, SCORE_UNANSWERED, SetOutcome, SkipReason,
    build_responses,
};
use crate::sanitize::{sanitize_html, xml_chars};

/// Vendor type of the condition capping the total score.
pub const MAX_SCORE_CAP: &str = "max_score_upper_bound";

/// Template variables and their defaults, in document order.
const TEMPLATE_DEFAULTS: [(&str, Option<&str>); 5] = [
    (SCORE_EACH_CORRECT, Some("1")),
    (SCORE_EACH_WRONG, Some("0")),
    ("SCORE_ALL_CORRECT", None),
    ("SCORE_MINIMUM", None),
    (SCORE_UNANSWERED, Some("0")),
];

/// Feedback states, each selected by the `FEEDBACK` outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackState {
    Unanswered,
    Correct,
    PartiallyCorrect,
    Wrong,
}

impl FeedbackState {
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::Unanswered => "feedback_unanswered",
            Self::Correct => "feedback_correct",
            Self::PartiallyCorrect => "feedback_partially_correct",
            Self::Wrong => "feedback_wrong",
        }
    }
}

/// A generated item document.
#[derive(Debug, Clone, PartialEq)]
pub struct QtiItem {
    pub identifier: String,
    pub title: String,
    /// Archive path of the document.
    pub path: String,
    pub max_score: f64,
    pub xml: Vec<u8>,
}

/// Result of turning one question into an item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemBuild {
    Item(QtiItem),
    Skipped(SkipReason),
}

/// Build the item document of `question`.
///
/// Embedded file references must already be rewritten; text is sanitized
/// here.
pub fn build_item(question: &Question, context: &RunContext) -> Result<ItemBuild> {
    let body = sanitize_html(&question.text);
    let responses = match build_responses(question, body, context) {
        Ok(responses) => responses,
        Err(reason) => return Ok(ItemBuild::Skipped(reason)),
    };
    let feedback = question
        .kind
        .feedback()
        .map(|feedback| CombinedFeedback {
            correct: sanitize_html(&feedback.correct),
            partially_correct: sanitize_html(&feedback.partially_correct),
            incorrect: sanitize_html(&feedback.incorrect),
        })
        .unwrap_or_default();

    let identifier = context.item_identifier(question.id);
    let title = xml_chars(&question.name).into_owned();
    let xml = assemble(&identifier, &title, &responses, &feedback, context.language())?;
    Ok(ItemBuild::Item(QtiItem {
        identifier,
        title,
        path: item_path(question.qtype(), question.id),
        max_score: responses.max_score(),
        xml,
    }))
}

/// Write the `assessmentItem` document.
pub fn assemble(
    identifier: &str,
    title: &str,
    responses: &ItemResponses,
    feedback: &CombinedFeedback,
    language: &str,
) -> Result<Vec<u8>> {
    let mut writer = xml_writer();
    write_declaration(&mut writer)?;

    let mut root = BytesStart::new("assessmentItem");
    root.push_attribute(("xmlns", QTI_NS));
    root.push_attribute(("xmlns:xsi", XSI_NS));
    root.push_attribute(("xmlns:inspera", INSPERA_NS));
    root.push_attribute(("xsi:schemaLocation", QTI_SCHEMA_LOCATION));
    root.push_attribute(("identifier", identifier));
    root.push_attribute(("title", title));
    root.push_attribute(("adaptive", "false"));
    root.push_attribute(("timeDependent", "false"));
    writer.write_event(Event::Start(root))?;

    for set in &responses.sets {
        write_response_declaration(&mut writer, &set.declaration)?;
    }
    write_outcome_declarations(&mut writer, responses)?;
    for (name, default) in TEMPLATE_DEFAULTS {
        write_template_declaration(&mut writer, name, default)?;
    }
    write_item_body(&mut writer, responses, language)?;
    write_response_processing(&mut writer, responses)?;

    for (state, markup) in [
        (FeedbackState::Unanswered, ""),
        (FeedbackState::Wrong, feedback.incorrect.as_str()),
        (FeedbackState::Correct, feedback.correct.as_str()),
        (
            FeedbackState::PartiallyCorrect,
            feedback.partially_correct.as_str(),
        ),
    ] {
        let mut start = BytesStart::new("modalFeedback");
        start.push_attribute(("outcomeIdentifier", FEEDBACK));
        start.push_attribute(("identifier", state.identifier()));
        start.push_attribute(("showHide", "show"));
        write_markup_element(&mut writer, start, markup)?;
    }

    writer.write_event(Event::End(BytesEnd::new("assessmentItem")))?;
    Ok(writer.into_inner())
}

fn write_response_declaration<W: Write>(
    writer: &mut Writer<W>,
    declaration: &ResponseDeclaration,
) -> Result<()> {
    let mut start = BytesStart::new("responseDeclaration");
    start.push_attribute(("identifier", declaration.identifier.as_str()));
    start.push_attribute(("cardinality", declaration.cardinality.as_str()));
    start.push_attribute(("baseType", declaration.base_type.as_str()));
    if declaration.correct.is_empty() && declaration.mapping.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;

    if !declaration.correct.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("correctResponse")))?;
        for value in &declaration.correct {
            write_text_element(writer, "value", value)?;
        }
        writer.write_event(Event::End(BytesEnd::new("correctResponse")))?;
    }
    if !declaration.mapping.is_empty() {
        let mut mapping = BytesStart::new("mapping");
        mapping.push_attribute(("defaultValue", "0"));
        writer.write_event(Event::Start(mapping))?;
        for entry in &declaration.mapping {
            let mut element = BytesStart::new("mapEntry");
            element.push_attribute(("mapKey", entry.key.as_str()));
            element.push_attribute(("mappedValue", format_number(entry.value).as_str()));
            writer.write_event(Event::Empty(element))?;
        }
        writer.write_event(Event::End(BytesEnd::new("mapping")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("responseDeclaration")))?;
    Ok(())
}

fn write_outcome_declarations<W: Write>(
    writer: &mut Writer<W>,
    responses: &ItemResponses,
) -> Result<()> {
    let mut score = BytesStart::new("outcomeDeclaration");
    score.push_attribute(("identifier", SCORE));
    score.push_attribute(("cardinality", "single"));
    score.push_attribute(("baseType", BaseType::Float.as_str()));
    writer.write_event(Event::Start(score))?;
    write_default_value(writer, Some("0"))?;
    writer.write_event(Event::End(BytesEnd::new("outcomeDeclaration")))?;

    let mut feedback = BytesStart::new("outcomeDeclaration");
    feedback.push_attribute(("identifier", FEEDBACK));
    feedback.push_attribute(("cardinality", "single"));
    feedback.push_attribute(("baseType", BaseType::Identifier.as_str()));
    writer.write_event(Event::Empty(feedback))?;

    for set in &responses.sets {
        let mut outcome = BytesStart::new("outcomeDeclaration");
        outcome.push_attribute(("identifier", set.outcome.as_str()));
        outcome.push_attribute(("cardinality", "single"));
        outcome.push_attribute(("baseType", BaseType::String.as_str()));
        writer.write_event(Event::Empty(outcome))?;
    }
    Ok(())
}

fn write_template_declaration<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    default: Option<&str>,
) -> Result<()> {
    let mut start = BytesStart::new("templateDeclaration");
    start.push_attribute(("identifier", name));
    start.push_attribute(("cardinality", "single"));
    start.push_attribute(("baseType", BaseType::Float.as_str()));
    writer.write_event(Event::Start(start))?;
    write_default_value(writer, default)?;
    writer.write_event(Event::End(BytesEnd::new("templateDeclaration")))?;
    Ok(())
}

fn write_default_value<W: Write>(writer: &mut Writer<W>, value: Option<&str>) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("defaultValue")))?;
    match value {
        Some(value) => write_text_element(writer, "value", value)?,
        None => writer.write_event(Event::Empty(BytesStart::new("value")))?,
    }
    writer.write_event(Event::End(BytesEnd::new("defaultValue")))?;
    Ok(())
}

fn write_item_body<W: Write>(
    writer: &mut Writer<W>,
    responses: &ItemResponses,
    language: &str,
) -> Result<()> {
    let mut start = BytesStart::new("itemBody");
    start.push_attribute(("inspera:defaultLanguage", language));
    start.push_attribute(("inspera:supportedLanguages", language));
    writer.write_event(Event::Start(start))?;
    for segment in &responses.body {
        match segment {
            BodySegment::Markup(markup) => {
                writer.write_event(Event::Text(BytesText::from_escaped(markup.as_str())))?;
            }
            BodySegment::Interaction(interaction) => interaction.write(writer)?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new("itemBody")))?;
    Ok(())
}

fn write_response_processing<W: Write>(
    writer: &mut Writer<W>,
    responses: &ItemResponses,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("responseProcessing")))?;
    for set in &responses.sets {
        for condition in &set.scoring {
            write_condition(writer, condition)?;
        }
    }
    write_condition(writer, &feedback_selection(responses))?;
    write_condition(writer, &score_cap(responses.max_score()))?;
    writer.write_event(Event::End(BytesEnd::new("responseProcessing")))?;
    Ok(())
}

/// Unanswered beats correct, correct beats partially correct.
pub fn feedback_selection(responses: &ItemResponses) -> ResponseCondition {
    let select = |state: FeedbackState| {
        vec![SetOutcome::new(
            FEEDBACK,
            Expr::value(BaseType::Identifier, state.identifier()),
        )]
    };
    let unanswered = responses.sets.iter().map(|set| set.unanswered.clone()).collect();
    let correct = responses.sets.iter().map(|set| set.correct.clone()).collect();
    let partially_correct = responses
        .sets
        .iter()
        .map(|set| set.partially_correct.clone())
        .collect();

    ResponseCondition::when(Expr::all(unanswered), select(FeedbackState::Unanswered))
        .or_when(Expr::all(correct), select(FeedbackState::Correct))
        .or_when(
            Expr::any(partially_correct),
            select(FeedbackState::PartiallyCorrect),
        )
        .otherwise(select(FeedbackState::Wrong))
}

/// Clamp `SCORE` to the sum of the responses' maximum scores.
pub fn score_cap(max_score: f64) -> ResponseCondition {
    let max = format_number(max_score);
    ResponseCondition::when(
        Expr::gte(
            Expr::variable(SCORE),
            Expr::value(BaseType::Float, max.as_str()),
        ),
        vec![SetOutcome::new(SCORE, Expr::value(BaseType::Float, max))],
    )
    .with_vendor_type(MAX_SCORE_CAP)
}

#[cfg(test)]
mod tests {
    use qti_model::{Answer, NumericalOptions, QuestionKind};

    use super::*;
    use crate::common::into_string;
    use crate::response::Branch;

    fn numeric(id: u64) -> Question {
        Question::new(
            id,
            "Pi <approx>",
            "<p>Value of pi?",
            QuestionKind::Numerical(NumericalOptions {
                answers: vec![Answer::new(1, "3", 1.0).with_tolerance(0.25)],
                feedback: CombinedFeedback {
                    correct: "Right".to_string(),
                    ..CombinedFeedback::default()
                },
            }),
        )
    }

    #[test]
    fn feedback_states_are_ordered_by_precedence() {
        let question = numeric(4);
        let responses =
            build_responses(&question, String::new(), &RunContext::new("site")).unwrap();
        let condition = feedback_selection(&responses);
        let states: Vec<&Expr> = condition
            .branches
            .iter()
            .map(|Branch { actions, .. }| &actions[0].value)
            .collect();
        assert_eq!(
            states,
            vec![
                &Expr::value(BaseType::Identifier, "feedback_unanswered"),
                &Expr::value(BaseType::Identifier, "feedback_correct"),
                &Expr::value(BaseType::Identifier, "feedback_partially_correct"),
            ]
        );
        assert_eq!(
            condition.otherwise[0].value,
            Expr::value(BaseType::Identifier, "feedback_wrong")
        );
        assert_eq!(condition.branches[0].test, responses.sets[0].unanswered);
    }

    #[test]
    fn score_cap_clamps_to_maximum() {
        let cap = score_cap(2.5);
        assert_eq!(cap.vendor_type, Some(MAX_SCORE_CAP));
        assert_eq!(
            cap.branches[0].test,
            Expr::gte(
                Expr::variable(SCORE),
                Expr::value(BaseType::Float, "2.5")
            )
        );
        assert!(cap.otherwise.is_empty());
    }

    #[test]
    fn build_item_escapes_title_and_repairs_body() {
        let ItemBuild::Item(item) = build_item(&numeric(4), &RunContext::new("site")).unwrap()
        else {
            panic!("expected an item");
        };
        assert_eq!(item.path, "content_question_qti2_numerical_4.xml");
        assert_eq!(item.identifier, "site_4");
        assert_eq!(item.max_score, 1.0);

        let xml = into_string(item.xml);
        assert!(xml.contains(r#"title="Pi &lt;approx&gt;""#), "{xml}");
        assert!(xml.contains("<p>Value of pi?</p>"), "{xml}");
        assert!(xml.contains(r#"inspera:type="numeric""#));
        assert!(xml.contains("<value>2.75</value>"), "{xml}");
        assert!(xml.contains(r#"inspera:defaultLanguage="en_us""#));
        assert!(
            xml.contains(r#"identifier="feedback_correct" showHide="show">Right</modalFeedback>"#),
            "{xml}"
        );
    }

    #[test]
    fn unusable_questions_are_reported_not_failed() {
        let mut question = numeric(5);
        question.kind = QuestionKind::Numerical(NumericalOptions {
            answers: vec![Answer::new(1, "pi", 1.0)],
            feedback: CombinedFeedback::default(),
        });
        assert_eq!(
            build_item(&question, &RunContext::new("site")).unwrap(),
            ItemBuild::Skipped(SkipReason::InvalidNumber("pi".to_string()))
        );
    }
}
