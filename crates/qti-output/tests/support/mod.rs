//! Shared fixtures: an in-memory file store, sample questions and a small
//! evaluator for response processing predicates.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;

use quick_xml::Reader;
use quick_xml::events::Event;

use qti_model::{
    Answer, ChoiceOptions, CombinedFeedback, FieldKey, Question, QuestionKind,
};
use qti_output::AssetResolver;
use qti_output::response::{BaseType, Expr};

/// File storage backed by a map.
#[derive(Default)]
pub struct MemoryResolver {
    files: BTreeMap<(u64, FieldKey, u64, String), Vec<u8>>,
}

impl MemoryResolver {
    pub fn with(mut self, area: u64, field: FieldKey, owner: u64, name: &str, bytes: &[u8]) -> Self {
        self.files
            .insert((area, field, owner, name.to_string()), bytes.to_vec());
        self
    }
}

impl AssetResolver for MemoryResolver {
    fn resolve(
        &self,
        storage_area: u64,
        field: FieldKey,
        owner_id: u64,
        filename: &str,
    ) -> io::Result<Vec<u8>> {
        self.files
            .get(&(storage_area, field, owner_id, filename.to_string()))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, filename.to_string()))
    }
}

/// The colour question: one right answer, two wrong ones.
pub fn colour_question() -> Question {
    Question::new(
        666,
        "Q8",
        "<p class=\"q\">What's between orange and green in the spectrum?</p>",
        QuestionKind::MultiChoice(ChoiceOptions {
            single: true,
            shuffle_answers: true,
            answers: vec![
                Answer::new(123, "yellow", 1.0).with_feedback("right; good!"),
                Answer::new(124, "red", 0.0).with_feedback("wrong, it's yellow"),
                Answer::new(125, "blue", 0.0).with_feedback("wrong, it's yellow"),
            ],
            feedback: CombinedFeedback {
                correct: "Your answer is correct.".to_string(),
                partially_correct: "Your answer is partially correct.".to_string(),
                incorrect: "Your answer is incorrect.".to_string(),
            },
        }),
    )
}

/// Panics unless `xml` parses with strict end-tag checking.
pub fn assert_well_formed(xml: &[u8]) {
    let text = std::str::from_utf8(xml).expect("utf-8 output");
    let mut reader = Reader::from_str(text);
    let mut depth = 0i64;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => depth -= 1,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => panic!("malformed output at {}: {error}\n{text}", reader.buffer_position()),
        }
    }
    assert_eq!(depth, 0, "unbalanced output:\n{text}");
}

/// Values bound to item variables while evaluating predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Float(f64),
    Text(String),
    Multiple(Vec<String>),
}

impl Value {
    fn truthy(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    fn text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    fn float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Text(text) => text.parse().ok(),
            _ => None,
        }
    }
}

/// Evaluate a boolean predicate with the given variable bindings.
pub fn holds(expr: &Expr, bindings: &[(&str, Value)]) -> bool {
    eval(expr, bindings).truthy()
}

fn eval(expr: &Expr, bindings: &[(&str, Value)]) -> Value {
    match expr {
        Expr::Variable(identifier) => bindings
            .iter()
            .find(|(name, _)| *name == identifier.as_str())
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Null),
        Expr::BaseValue { base_type, value } => match base_type {
            BaseType::Float => Value::Float(value.parse().expect("float base value")),
            BaseType::Boolean => Value::Bool(value == "true"),
            BaseType::Identifier | BaseType::String => Value::Text(value.clone()),
        },
        Expr::IsNull(inner) => Value::Bool(match eval(inner, bindings) {
            Value::Null => true,
            Value::Multiple(values) => values.is_empty(),
            Value::Text(text) => text.is_empty(),
            _ => false,
        }),
        Expr::Not(inner) => Value::Bool(!holds(inner, bindings)),
        Expr::And(items) => Value::Bool(items.iter().all(|item| holds(item, bindings))),
        Expr::Or(items) => Value::Bool(items.iter().any(|item| holds(item, bindings))),
        Expr::Match(left, right) => {
            let (left, right) = (eval(left, bindings), eval(right, bindings));
            Value::Bool(left.text().is_some() && left == right)
        }
        Expr::Member(value, container) => {
            let value = eval(value, bindings);
            Value::Bool(match (value.text(), eval(container, bindings)) {
                (Some(value), Value::Multiple(values)) => values.iter().any(|v| v == value),
                _ => false,
            })
        }
        Expr::Gte(left, right) => compare(left, right, bindings, |a, b| a >= b),
        Expr::Lte(left, right) => compare(left, right, bindings, |a, b| a <= b),
        Expr::StringMatch {
            case_sensitive,
            expected,
            response,
        } => {
            let strip = |value: Value| -> Option<String> {
                let text: String = value.text()?.chars().filter(|c| *c != ' ').collect();
                Some(if *case_sensitive { text } else { text.to_lowercase() })
            };
            let (expected, response) = (strip(eval(expected, bindings)), strip(eval(response, bindings)));
            Value::Bool(response.is_some() && expected == response)
        }
        Expr::Sum(_) | Expr::MapResponse(_) => panic!("not a predicate: {expr:?}"),
    }
}

fn compare(left: &Expr, right: &Expr, bindings: &[(&str, Value)], op: fn(f64, f64) -> bool) -> Value {
    match (eval(left, bindings).float(), eval(right, bindings).float()) {
        (Some(a), Some(b)) => Value::Bool(op(a, b)),
        _ => Value::Bool(false),
    }
}
