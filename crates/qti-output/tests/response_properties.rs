//! Scoring and feedback predicates of the generated responses.

mod support;

use proptest::prelude::*;

use qti_model::{
    Answer, ChoiceOptions, CombinedFeedback, EmbeddedQuestions, MultiAnswerOptions,
    NumericalOptions, Question, QuestionKind, ShortAnswerOptions,
};
use qti_output::response::BodySegment;
use qti_output::{ResponseFragmentSet, RunContext, build_responses};

use support::{Value, colour_question, holds};

fn single_set(question: &Question) -> ResponseFragmentSet {
    let responses = build_responses(question, String::new(), &RunContext::new("site"))
        .expect("question builds");
    assert_eq!(responses.sets.len(), 1);
    responses.sets.into_iter().next().expect("one set")
}

fn short_answer(use_case: bool, answers: &[&str]) -> Question {
    Question::new(
        40,
        "capital",
        "",
        QuestionKind::ShortAnswer(ShortAnswerOptions {
            use_case,
            answers: answers
                .iter()
                .enumerate()
                .map(|(index, text)| Answer::new(400 + index as u64, *text, 1.0))
                .collect(),
            feedback: CombinedFeedback::default(),
        }),
    )
}

fn numerical(value: f64, tolerance: f64) -> Question {
    Question::new(
        50,
        "estimate",
        "",
        QuestionKind::Numerical(NumericalOptions {
            answers: vec![Answer::new(500, value.to_string(), 1.0).with_tolerance(tolerance)],
            feedback: CombinedFeedback::default(),
        }),
    )
}

#[test]
fn test_single_choice_example() {
    let set = single_set(&colour_question());
    let response = set.response_id.as_str();

    assert_eq!(response, "RESPONSE_site_666");
    assert_eq!(set.max_score, 1.0);
    assert_eq!(set.declaration.correct, vec!["CHOICE_123".to_string()]);

    let chosen = |choice: &str| [(response, Value::Text(choice.to_string()))];
    assert!(holds(&set.correct, &chosen("CHOICE_123")));
    assert!(!holds(&set.correct, &chosen("CHOICE_124")));
    assert!(!holds(&set.correct, &chosen("CHOICE_125")));
    assert!(!holds(&set.correct, &[]));
    assert!(holds(&set.unanswered, &[]));
    assert!(!holds(&set.unanswered, &chosen("CHOICE_124")));
}

#[test]
fn test_multiple_choice_partial_credit() {
    let question = Question::new(
        7,
        "primes",
        "",
        QuestionKind::MultiChoice(ChoiceOptions {
            single: false,
            shuffle_answers: false,
            answers: vec![
                Answer::new(1, "2", 0.5),
                Answer::new(2, "3", 0.5),
                Answer::new(3, "4", 0.0),
            ],
            feedback: CombinedFeedback::default(),
        }),
    );
    let set = single_set(&question);
    let response = set.response_id.as_str();
    let selected = |ids: &[&str]| {
        [(
            response,
            Value::Multiple(ids.iter().map(|id| (*id).to_string()).collect()),
        )]
    };

    assert!(holds(&set.correct, &selected(&["CHOICE_1", "CHOICE_2"])));
    assert!(!holds(&set.correct, &selected(&["CHOICE_1", "CHOICE_2", "CHOICE_3"])));
    assert!(holds(
        &set.partially_correct,
        &selected(&["CHOICE_1", "CHOICE_2", "CHOICE_3"])
    ));
    assert!(!holds(&set.partially_correct, &selected(&["CHOICE_3"])));
}

#[test]
fn test_text_match_case_sensitivity() {
    let strict = single_set(&short_answer(true, &["Paris"]));
    let relaxed = single_set(&short_answer(false, &["Paris"]));
    let answer = |set: &ResponseFragmentSet, text: &str| {
        holds(
            &set.correct,
            &[(set.response_id.as_str(), Value::Text(text.to_string()))],
        )
    };

    assert!(answer(&strict, "Paris"));
    assert!(!answer(&strict, "paris"));
    assert!(answer(&relaxed, "paris"));
    assert!(answer(&relaxed, "PARIS"));
    assert!(answer(&relaxed, " Par is"));
    assert!(!answer(&relaxed, "London"));
}

#[test]
fn test_text_match_accepts_every_listed_answer() {
    let set = single_set(&short_answer(false, &["colour", "color"]));
    for text in ["colour", "color"] {
        assert!(holds(
            &set.correct,
            &[(set.response_id.as_str(), Value::Text(text.to_string()))]
        ));
    }
    assert_eq!(set.declaration.correct, vec!["colour".to_string()]);
}

#[test]
fn test_numeric_uses_first_answer_only() {
    let question = Question::new(
        51,
        "estimate",
        "",
        QuestionKind::Numerical(NumericalOptions {
            answers: vec![
                Answer::new(1, "10", 1.0).with_tolerance(1.0),
                Answer::new(2, "100", 1.0),
            ],
            feedback: CombinedFeedback::default(),
        }),
    );
    let set = single_set(&question);
    let response = set.response_id.as_str();
    assert!(holds(&set.correct, &[(response, Value::Float(10.5))]));
    assert!(!holds(&set.correct, &[(response, Value::Float(100.0))]));
}

#[test]
fn test_numeric_decimal_bounds_accept_typed_values() {
    let set = single_set(&numerical(1.1, 0.2));
    let response = set.response_id.as_str();
    assert!(holds(&set.correct, &[(response, Value::Float(0.9))]));
    assert!(holds(&set.correct, &[(response, Value::Float(1.3))]));
    assert!(!holds(&set.correct, &[(response, Value::Float(0.89))]));
    assert_eq!(set.declaration.correct, vec!["0.9".to_string()]);

    let set = single_set(&numerical(0.3, 0.1));
    let response = set.response_id.as_str();
    assert!(holds(&set.correct, &[(response, Value::Float(0.2))]));
    assert!(holds(&set.correct, &[(response, Value::Float(0.4))]));
}

#[test]
fn test_composite_splices_every_interaction() {
    let sub = |id: u64, answer: &str| {
        Question::new(
            id,
            "gap",
            "",
            QuestionKind::ShortAnswer(ShortAnswerOptions {
                use_case: false,
                answers: vec![Answer::new(id * 10, answer, 1.0)],
                feedback: CombinedFeedback::default(),
            }),
        )
    };
    let question = Question::new(
        60,
        "cloze",
        "",
        QuestionKind::MultiAnswer(MultiAnswerOptions {
            questions: EmbeddedQuestions::new()
                .with("1", sub(61, "cat"))
                .with("2", sub(62, "mat"))
                .with("3", numerical(3.0, 0.0)),
        }),
    );
    let body = "<p>The {#1} sat on the {#2} for {#3} hours.</p>".to_string();
    let responses = build_responses(&question, body, &RunContext::new("site")).unwrap();

    assert_eq!(responses.interactions().count(), 3);
    assert_eq!(responses.max_score(), 3.0);
    let mut ids: Vec<&str> = responses.sets.iter().map(|set| set.response_id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    for segment in &responses.body {
        if let BodySegment::Markup(markup) = segment {
            assert!(!markup.contains("{#"), "placeholder left in {markup}");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_choice_max_score_is_weighted_sum(
        weights in prop::collection::vec(0u8..=10, 1..8),
        mark in 1u8..=10,
        single in any::<bool>(),
    ) {
        prop_assume!(weights.iter().any(|weight| *weight > 0));
        let answers: Vec<Answer> = weights
            .iter()
            .enumerate()
            .map(|(index, weight)| Answer::new(index as u64 + 1, format!("a{index}"), f64::from(*weight) / 10.0))
            .collect();
        let expected: f64 = answers
            .iter()
            .filter(|answer| answer.fraction > 0.0)
            .map(|answer| answer.fraction * f64::from(mark))
            .sum();
        let question = Question::new(
            9,
            "weights",
            "",
            QuestionKind::MultiChoice(ChoiceOptions {
                single,
                shuffle_answers: false,
                answers,
                feedback: CombinedFeedback::default(),
            }),
        )
        .with_default_mark(f64::from(mark));

        let set = single_set(&question);
        let mapped: f64 = set.declaration.mapping.iter().map(|entry| entry.value).sum();
        prop_assert!((set.max_score - expected).abs() < 1e-9);
        prop_assert!((mapped - set.max_score).abs() < 1e-9);
        prop_assert!(set.declaration.mapping.iter().all(|entry| entry.value > 0.0));
    }

    #[test]
    fn prop_numeric_bounds_are_inclusive(
        value in -1000i32..1000,
        tolerance in 0u16..200,
    ) {
        // Quarter steps keep the bounds exact in binary floating point.
        let value = f64::from(value) / 4.0;
        let tolerance = f64::from(tolerance) / 4.0;
        let set = single_set(&numerical(value, tolerance));
        let response = set.response_id.as_str();

        prop_assert!(holds(&set.correct, &[(response, Value::Float(value - tolerance))]));
        prop_assert!(holds(&set.correct, &[(response, Value::Float(value + tolerance))]));
        prop_assert!(!holds(&set.correct, &[(response, Value::Float(value - tolerance - 0.25))]));
        prop_assert!(!holds(&set.correct, &[(response, Value::Float(value + tolerance + 0.25))]));
    }

    #[test]
    fn prop_numeric_decimal_bounds_are_inclusive(
        hundredths in -100_000i32..100_000,
        tolerance in 0i32..5_000,
    ) {
        // A learner typing the bound gets the nearest double to its decimal value.
        let typed = |hundredths: i32| f64::from(hundredths) / 100.0;
        let set = single_set(&numerical(typed(hundredths), typed(tolerance)));
        let response = set.response_id.as_str();

        let lowest = typed(hundredths - tolerance);
        let highest = typed(hundredths + tolerance);
        prop_assert!(holds(&set.correct, &[(response, Value::Float(lowest))]));
        prop_assert!(holds(&set.correct, &[(response, Value::Float(highest))]));
        prop_assert!(!holds(&set.correct, &[(response, Value::Float(typed(hundredths - tolerance - 1)))]));
        prop_assert!(!holds(&set.correct, &[(response, Value::Float(typed(hundredths + tolerance + 1)))]));
    }

    #[test]
    fn prop_response_identifier_is_stable(id in any::<u64>(), scope in "[a-z:/.]{0,24}") {
        let first = RunContext::new(&scope).response_identifier(id);
        let second = RunContext::new(&scope).response_identifier(id);
        prop_assert_eq!(&first, &second);
        let suffix = format!("_{id}");
        prop_assert!(first.ends_with(&suffix));
    }
}
