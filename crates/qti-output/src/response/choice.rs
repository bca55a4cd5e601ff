//! Multiple-choice and true/false responses.

use qti_model::{Answer, ChoiceOptions, Question, TrueFalseOptions};

use super::{
    BaseType, BuiltResponse, Cardinality, ChoiceInteraction, Expr, Interaction, MapEntry,
    ResponseCondition, ResponseDeclaration, ResponseFragmentSet, SCORE, SCORE_UNANSWERED,
    SetOutcome, SimpleChoice, SkipReason, correct_outcome, unanswered,
};
use crate::sanitize::sanitize_html;

pub(super) fn build_choice(
    question: &Question,
    options: &ChoiceOptions,
    response_id: String,
) -> Result<BuiltResponse, SkipReason> {
    let cardinality = if options.single {
        Cardinality::Single
    } else {
        Cardinality::Multiple
    };
    build(
        question,
        &options.answers,
        cardinality,
        options.shuffle_answers,
        response_id,
    )
}

/// True/false is a single-select choice over its two answers, never shuffled.
pub(super) fn build_true_false(
    question: &Question,
    options: &TrueFalseOptions,
    response_id: String,
) -> Result<BuiltResponse, SkipReason> {
    if options.answers.len() != 2 {
        return Err(SkipReason::TrueFalseAnswerCount(options.answers.len()));
    }
    build(question, &options.answers, Cardinality::Single, false, response_id)
}

fn build(
    question: &Question,
    answers: &[Answer],
    cardinality: Cardinality,
    shuffle: bool,
    response_id: String,
) -> Result<BuiltResponse, SkipReason> {
    if answers.is_empty() {
        return Err(SkipReason::NoAnswers);
    }

    let mut choices = Vec::with_capacity(answers.len());
    let mut correct = Vec::new();
    let mut mapping = Vec::new();
    let mut selected_correct = Vec::new();
    let mut selected_wrong = Vec::new();
    let mut max_score = 0.0;

    for answer in answers {
        let identifier = format!("CHOICE_{}", answer.id);
        let selected = selection(cardinality, &identifier, &response_id);
        choices.push(SimpleChoice {
            identifier: identifier.clone(),
            content: sanitize_html(&answer.answer),
            feedback: sanitize_html(&answer.feedback),
        });
        if answer.is_correct() {
            let score = answer.fraction * question.default_mark;
            max_score += score;
            correct.push(identifier.clone());
            mapping.push(MapEntry {
                key: identifier,
                value: score,
            });
            selected_correct.push(selected);
        } else {
            selected_wrong.push(selected);
        }
    }
    if correct.is_empty() {
        return Err(SkipReason::NoCorrectAnswer);
    }

    let partially_correct = Expr::all(selected_correct.clone());
    let mut all_correct = selected_correct;
    if !selected_wrong.is_empty() {
        all_correct.push(Expr::not(Expr::any(selected_wrong)));
    }

    let scoring = vec![
        ResponseCondition::when(
            unanswered(&response_id),
            vec![SetOutcome::add(SCORE, Expr::variable(SCORE_UNANSWERED))],
        )
        .otherwise(vec![SetOutcome::add(
            SCORE,
            Expr::MapResponse(response_id.clone()),
        )]),
    ];

    let fragments = ResponseFragmentSet {
        declaration: ResponseDeclaration {
            identifier: response_id.clone(),
            cardinality,
            base_type: BaseType::Identifier,
            correct,
            mapping,
        },
        outcome: correct_outcome(&response_id),
        scoring,
        unanswered: unanswered(&response_id),
        correct: Expr::all(all_correct),
        partially_correct,
        max_score,
        response_id: response_id.clone(),
    };
    let interaction = Interaction::Choice(ChoiceInteraction {
        response_id,
        shuffle,
        max_choices: match cardinality {
            Cardinality::Single => 1,
            Cardinality::Multiple => 0,
        },
        choices,
    });
    Ok(BuiltResponse {
        fragments,
        interaction,
    })
}

/// Test for "this choice is selected".
fn selection(cardinality: Cardinality, identifier: &str, response_id: &str) -> Expr {
    let choice = Expr::value(BaseType::Identifier, identifier);
    let response = Expr::variable(response_id);
    match cardinality {
        Cardinality::Single => Expr::matches(choice, response),
        Cardinality::Multiple => Expr::member(choice, response),
    }
}
