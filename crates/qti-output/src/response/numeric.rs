//! Numerical responses: a closed interval around the first answer.
//!
//! Only the first answer is used. Hosts list alternative answers (often a
//! `*` catch-all) that the flat one-point scheme cannot express; they are
//! ignored.

use qti_model::NumericalOptions;
use tracing::debug;

use super::{
    BaseType, BuiltResponse, Cardinality, Expr, Interaction, ResponseDeclaration,
    ResponseFragmentSet, SkipReason, TextEntryInteraction, correct_outcome, flat_scoring,
    unanswered,
};
use crate::common::{decimal_sum, format_number};

const EXPECTED_LENGTH: u32 = 0;
const FIELD_WIDTH: u32 = 3;

pub(super) fn build(
    options: &NumericalOptions,
    response_id: String,
) -> Result<BuiltResponse, SkipReason> {
    let (first, ignored) = options
        .answers
        .split_first()
        .ok_or(SkipReason::NoAnswers)?;
    if !ignored.is_empty() {
        debug!(
            ignored = ignored.len(),
            "numerical question uses its first answer only"
        );
    }
    let value = first
        .answer
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| SkipReason::InvalidNumber(first.answer.clone()))?;
    let tolerance = first.tolerance.abs();
    let lower = format_number(decimal_sum(value, -tolerance));
    let upper = format_number(decimal_sum(value, tolerance));

    let response = Expr::variable(response_id.as_str());
    let within = Expr::all(vec![
        Expr::gte(response.clone(), Expr::value(BaseType::Float, lower.as_str())),
        Expr::lte(response, Expr::value(BaseType::Float, upper)),
    ]);

    let fragments = ResponseFragmentSet {
        declaration: ResponseDeclaration {
            identifier: response_id.clone(),
            cardinality: Cardinality::Single,
            base_type: BaseType::Float,
            correct: vec![lower],
            mapping: Vec::new(),
        },
        outcome: correct_outcome(&response_id),
        scoring: flat_scoring(&response_id, within.clone()),
        unanswered: unanswered(&response_id),
        correct: within.clone(),
        partially_correct: within,
        max_score: 1.0,
        response_id: response_id.clone(),
    };
    let interaction = Interaction::TextEntry(TextEntryInteraction {
        response_id,
        expected_length: EXPECTED_LENGTH,
        field_width: FIELD_WIDTH,
        numeric: true,
    });
    Ok(BuiltResponse {
        fragments,
        interaction,
    })
}

#[cfg(test)]
mod tests {
    use qti_model::{Answer, CombinedFeedback};

    use super::*;

    fn options(answers: Vec<Answer>) -> NumericalOptions {
        NumericalOptions {
            answers,
            feedback: CombinedFeedback::default(),
        }
    }

    #[test]
    fn interval_surrounds_first_answer() {
        let built = build(
            &options(vec![
                Answer::new(1, "3.5", 1.0).with_tolerance(0.5),
                Answer::new(2, "*", 0.0),
            ]),
            "R".to_string(),
        )
        .unwrap();
        assert_eq!(
            built.fragments.correct,
            Expr::And(vec![
                Expr::gte(Expr::variable("R"), Expr::value(BaseType::Float, "3")),
                Expr::lte(Expr::variable("R"), Expr::value(BaseType::Float, "4")),
            ])
        );
        assert_eq!(built.fragments.declaration.correct, vec!["3".to_string()]);
        assert!(matches!(
            built.interaction,
            Interaction::TextEntry(TextEntryInteraction { numeric: true, .. })
        ));
    }

    #[test]
    fn decimal_bounds_are_exact() {
        for (answer, tolerance, lower, upper) in [
            ("1.1", 0.2, "0.9", "1.3"),
            ("0.3", 0.1, "0.2", "0.4"),
            ("-2.75", 0.05, "-2.8", "-2.7"),
        ] {
            let built = build(
                &options(vec![Answer::new(1, answer, 1.0).with_tolerance(tolerance)]),
                "R".to_string(),
            )
            .unwrap();
            assert_eq!(
                built.fragments.correct,
                Expr::And(vec![
                    Expr::gte(Expr::variable("R"), Expr::value(BaseType::Float, lower)),
                    Expr::lte(Expr::variable("R"), Expr::value(BaseType::Float, upper)),
                ]),
                "answer {answer} tolerance {tolerance}"
            );
            assert_eq!(built.fragments.declaration.correct, vec![lower.to_string()]);
        }
    }

    #[test]
    fn non_numeric_first_answer_is_skipped() {
        let result = build(&options(vec![Answer::new(1, "*", 1.0)]), "R".to_string());
        assert_eq!(result, Err(SkipReason::InvalidNumber("*".to_string())));
    }
}
