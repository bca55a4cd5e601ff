//! Export and inspection runs over question documents.
//!
//! An export run has three stages:
//! 1. **Load**: decode every input document, in argument order
//! 2. **Export**: feed each question through an [`ExportSession`] writing a
//!    zip archive into a temporary file next to the destination
//! 3. **Persist**: move the finished archive into place
//!
//! A failed run leaves no archive behind.

use std::convert::Infallible;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;
use tracing::{info, info_span};

use qti_model::{FieldKey, FieldVisitor, Question, walk_question_mut};
use qti_output::{
    ExportSession, ExportSummary, ItemBuild, PLUGINFILE_MARKER, RunContext, SkipReason,
    ZipArchive, build_item,
};

use crate::config::ExportConfig;
use crate::storage::{DirectoryResolver, load_questions};

/// Inputs of one export run.
#[derive(Debug, Clone)]
pub struct ExportRequest<'a> {
    pub inputs: &'a [PathBuf],
    /// Root of the file store.
    pub assets: &'a Path,
    pub output_dir: &'a Path,
    pub config: &'a ExportConfig,
}

#[derive(Debug)]
pub struct ExportRun {
    pub archive: PathBuf,
    pub questions: usize,
    pub summary: ExportSummary,
}

/// Load every input document, in order.
pub fn load_all(inputs: &[PathBuf]) -> Result<Vec<Question>> {
    let mut questions = Vec::new();
    for path in inputs {
        questions.extend(load_questions(path)?);
    }
    Ok(questions)
}

pub fn run_export(request: &ExportRequest<'_>) -> Result<ExportRun> {
    let context = request.config.run_context()?;
    let archive_name = request.config.archive_name.as_str();
    if Path::new(archive_name).file_name() != Some(OsStr::new(archive_name)) {
        bail!("archive name '{archive_name}' must be a plain file name");
    }
    let span = info_span!("export", scope = context.scope());
    let _guard = span.enter();
    let start = Instant::now();

    let questions = load_all(request.inputs)?;
    info!(count = questions.len(), "loaded questions");

    fs::create_dir_all(request.output_dir)
        .with_context(|| format!("create {}", request.output_dir.display()))?;
    let mut temp = NamedTempFile::new_in(request.output_dir)
        .with_context(|| format!("create temporary file in {}", request.output_dir.display()))?;

    let resolver = DirectoryResolver::new(request.assets);
    let summary = {
        let sink = ZipArchive::new(temp.as_file_mut());
        let mut session = ExportSession::new(context, sink, &resolver);
        for question in &questions {
            session
                .export_question(question)
                .with_context(|| format!("export question {} ({})", question.id, question.name))?;
        }
        let (_, summary) = session.finish().context("finalize archive")?;
        summary
    };
    temp.as_file().sync_all().context("flush archive")?;

    let archive = request.output_dir.join(archive_name);
    temp.persist(&archive)
        .with_context(|| format!("write {}", archive.display()))?;
    info!(
        path = %archive.display(),
        emitted = summary.emitted.len(),
        skipped = summary.skipped.len(),
        duration_ms = start.elapsed().as_millis(),
        "export complete"
    );
    Ok(ExportRun {
        archive,
        questions: questions.len(),
        summary,
    })
}

/// How a question would fare in an export.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectedQuestion {
    pub id: u64,
    pub name: String,
    pub qtype: String,
    /// Embedded file markers across all text fields.
    pub files: usize,
    /// Maximum score of the generated item, or why none would be generated.
    pub status: std::result::Result<f64, SkipReason>,
}

/// Dry run: build every item in memory without touching the file store.
pub fn inspect(questions: &[Question], context: &RunContext) -> Result<Vec<InspectedQuestion>> {
    questions
        .iter()
        .map(|question| {
            let status = match build_item(question, context)
                .with_context(|| format!("build question {}", question.id))?
            {
                ItemBuild::Item(item) => Ok(item.max_score),
                ItemBuild::Skipped(reason) => Err(reason),
            };
            Ok(InspectedQuestion {
                id: question.id,
                name: question.name.clone(),
                qtype: question.qtype().to_string(),
                files: count_markers(question),
                status,
            })
        })
        .collect()
}

#[derive(Default)]
struct MarkerCounter {
    count: usize,
}

impl FieldVisitor for MarkerCounter {
    type Error = Infallible;

    fn visit_field(
        &mut self,
        _key: FieldKey,
        _owner_id: u64,
        value: &mut String,
    ) -> std::result::Result<(), Infallible> {
        self.count += value.matches(PLUGINFILE_MARKER).count();
        Ok(())
    }
}

fn count_markers(question: &Question) -> usize {
    let mut counter = MarkerCounter::default();
    let mut copy = question.clone();
    match walk_question_mut(&mut copy, &mut counter) {
        Ok(()) => counter.count,
        Err(never) => match never {},
    }
}
