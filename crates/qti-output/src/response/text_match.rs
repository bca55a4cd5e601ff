//! Short-answer responses: exact text match against any listed answer.

use qti_model::ShortAnswerOptions;

use super::{
    BaseType, BuiltResponse, Cardinality, Expr, Interaction, ResponseDeclaration,
    ResponseFragmentSet, SkipReason, TextEntryInteraction, correct_outcome, flat_scoring,
    unanswered,
};

const EXPECTED_LENGTH: u32 = 50;
const FIELD_WIDTH: u32 = 20;

/// Every answer is accepted regardless of its weight; the item scores one
/// point for any match.
pub(super) fn build(
    options: &ShortAnswerOptions,
    response_id: String,
) -> Result<BuiltResponse, SkipReason> {
    let first = options
        .answers
        .first()
        .filter(|answer| !answer.answer.trim().is_empty())
        .ok_or(SkipReason::NoAnswers)?;

    let matches = options
        .answers
        .iter()
        .map(|answer| {
            Expr::string_match(
                options.use_case,
                Expr::value(BaseType::String, answer.answer.as_str()),
                Expr::variable(response_id.as_str()),
            )
        })
        .collect();
    let any_match = Expr::any(matches);

    let fragments = ResponseFragmentSet {
        declaration: ResponseDeclaration {
            identifier: response_id.clone(),
            cardinality: Cardinality::Single,
            base_type: BaseType::String,
            correct: vec![first.answer.clone()],
            mapping: Vec::new(),
        },
        outcome: correct_outcome(&response_id),
        scoring: flat_scoring(&response_id, any_match.clone()),
        unanswered: unanswered(&response_id),
        correct: any_match.clone(),
        partially_correct: any_match,
        max_score: 1.0,
        response_id: response_id.clone(),
    };
    let interaction = Interaction::TextEntry(TextEntryInteraction {
        response_id,
        expected_length: EXPECTED_LENGTH,
        field_width: FIELD_WIDTH,
        numeric: false,
    });
    Ok(BuiltResponse {
        fragments,
        interaction,
    })
}
