//! Embedded-answer questions.
//!
//! Sub-questions are built in declaration order and their interactions take
//! the place of the `{#key}` markers in the parent text.

use std::sync::LazyLock;

use qti_model::MultiAnswerOptions;
use regex::Regex;
use tracing::{debug, warn};

use super::{BodySegment, Interaction, ItemResponses, SkipReason, build_simple};
use crate::context::RunContext;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{#([^{}\s]+)\}").expect("Invalid placeholder regex"));

pub(super) fn build(
    body: &str,
    options: &MultiAnswerOptions,
    context: &RunContext,
) -> Result<ItemResponses, SkipReason> {
    let mut sets = Vec::with_capacity(options.questions.len());
    let mut pending: Vec<(&str, Option<Interaction>)> = Vec::new();
    for (key, question) in options.questions.iter() {
        match build_simple(question, context) {
            None => debug!(key, qtype = question.qtype(), "skipping unsupported embedded question"),
            Some(Err(reason)) => warn!(key, id = question.id, %reason, "skipping embedded question"),
            Some(Ok(built)) => {
                sets.push(built.fragments);
                pending.push((key, Some(built.interaction)));
            }
        }
    }
    if sets.is_empty() {
        return Err(SkipReason::NoInteractions);
    }

    let mut segments = Vec::new();
    let mut last = 0;
    let mut dropped = 0usize;
    for captures in PLACEHOLDER_REGEX.captures_iter(body) {
        let (Some(marker), Some(key)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        push_markup(&mut segments, &body[last..marker.start()]);
        last = marker.end();
        let interaction = pending
            .iter_mut()
            .find(|(candidate, slot)| *candidate == key.as_str() && slot.is_some())
            .and_then(|(_, slot)| slot.take());
        match interaction {
            Some(interaction) => segments.push(BodySegment::Interaction(interaction)),
            None => dropped += 1,
        }
    }
    push_markup(&mut segments, &body[last..]);
    if dropped > 0 {
        warn!(dropped, "removed placeholders without an embedded question");
    }

    for (key, slot) in pending {
        if let Some(interaction) = slot {
            warn!(key, "placeholder missing from question text, appending its interaction");
            segments.push(BodySegment::Interaction(interaction));
        }
    }
    Ok(ItemResponses {
        sets,
        body: segments,
    })
}

fn push_markup(segments: &mut Vec<BodySegment>, markup: &str) {
    if !markup.is_empty() {
        segments.push(BodySegment::Markup(markup.to_string()));
    }
}
