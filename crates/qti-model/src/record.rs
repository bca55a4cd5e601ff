//! Decoding of question records exported by the question bank.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ModelError, Result};
use crate::question::{DEFAULT_MARK, Question, QuestionKind};
use crate::serde_ext::lenient_number;

/// Wire shape of a question before its options are typed.
#[derive(Debug, Deserialize)]
pub(crate) struct QuestionRecord {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default, alias = "questiontext")]
    text: String,
    #[serde(
        default = "default_mark",
        alias = "defaultmark",
        deserialize_with = "lenient_number"
    )]
    default_mark: f64,
    #[serde(default, alias = "contextid")]
    context_id: u64,
    qtype: String,
    #[serde(default)]
    options: Value,
}

fn default_mark() -> f64 {
    DEFAULT_MARK
}

impl TryFrom<QuestionRecord> for Question {
    type Error = ModelError;

    fn try_from(record: QuestionRecord) -> Result<Self> {
        let QuestionRecord {
            id,
            name,
            text,
            default_mark,
            context_id,
            qtype,
            options,
        } = record;

        let invalid = |source| ModelError::InvalidOptions {
            id,
            qtype: qtype.clone(),
            source,
        };
        let kind = match qtype.as_str() {
            QuestionKind::MULTICHOICE => {
                QuestionKind::MultiChoice(serde_json::from_value(options).map_err(invalid)?)
            }
            QuestionKind::TRUEFALSE => {
                QuestionKind::TrueFalse(serde_json::from_value(options).map_err(invalid)?)
            }
            QuestionKind::SHORTANSWER => {
                QuestionKind::ShortAnswer(serde_json::from_value(options).map_err(invalid)?)
            }
            QuestionKind::NUMERICAL => {
                QuestionKind::Numerical(serde_json::from_value(options).map_err(invalid)?)
            }
            QuestionKind::MULTIANSWER => {
                QuestionKind::MultiAnswer(serde_json::from_value(options).map_err(invalid)?)
            }
            _ => QuestionKind::Unsupported {
                qtype: qtype.clone(),
            },
        };

        Ok(Question {
            id,
            name,
            text,
            default_mark,
            context_id,
            kind,
        })
    }
}

/// Decode a question document.
///
/// Accepts either a bare JSON array of records or an object with a
/// `questions` array.
pub fn questions_from_json(text: &str) -> Result<Vec<Question>> {
    let value: Value = serde_json::from_str(text)?;
    questions_from_value(value)
}

/// Decode an already parsed question document.
pub fn questions_from_value(value: Value) -> Result<Vec<Question>> {
    match value {
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        Value::Object(mut object) => match object.remove("questions") {
            Some(list @ Value::Array(_)) => Ok(serde_json::from_value(list)?),
            Some(_) => Err(ModelError::Layout(
                "`questions` must be an array".to_string(),
            )),
            None => Err(ModelError::Layout(
                "expected an array or an object with a `questions` array".to_string(),
            )),
        },
        _ => Err(ModelError::Layout(
            "expected an array or an object with a `questions` array".to_string(),
        )),
    }
}
