//! Export session: one run from question records to a finalized archive.

use qti_model::Question;
use tracing::{debug, info, info_span, warn};

use crate::archive::ArchiveSink;
use crate::assets::{AssetResolver, relocate_assets};
use crate::context::RunContext;
use crate::error::Result;
use crate::item::{ItemBuild, build_item};
use crate::manifest::Manifest;
use crate::response::SkipReason;

/// What happened to one question.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Emitted(EmittedItem),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmittedItem {
    pub question_id: u64,
    pub identifier: String,
    pub title: String,
    pub qtype: String,
    pub path: String,
    pub max_score: f64,
    /// Embedded files copied alongside the item.
    pub assets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedQuestion {
    pub question_id: u64,
    pub name: String,
    pub qtype: String,
    pub reason: SkipReason,
}

/// Statistics of a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    pub emitted: Vec<EmittedItem>,
    pub skipped: Vec<SkippedQuestion>,
    /// Embedded file markers left unchanged.
    pub unresolved_references: usize,
}

impl ExportSummary {
    pub fn asset_count(&self) -> usize {
        self.emitted.iter().map(|item| item.assets).sum()
    }
}

/// One export run.
///
/// Owns the archive sink, the manifest and the run statistics. Questions are
/// emitted in the order they are passed in.
pub struct ExportSession<'r, S, R: ?Sized> {
    context: RunContext,
    sink: S,
    resolver: &'r R,
    manifest: Manifest,
    summary: ExportSummary,
}

impl<'r, S: ArchiveSink, R: AssetResolver + ?Sized> ExportSession<'r, S, R> {
    pub fn new(context: RunContext, sink: S, resolver: &'r R) -> Self {
        let manifest = Manifest::new(context.title_language());
        Self {
            context,
            sink,
            resolver,
            manifest,
            summary: ExportSummary::default(),
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn summary(&self) -> &ExportSummary {
        &self.summary
    }

    /// Export one question.
    ///
    /// Unsupported or unusable questions are skipped. Errors leave nothing of
    /// the question in the archive unless the sink itself failed mid-write.
    pub fn export_question(&mut self, question: &Question) -> Result<ExportOutcome> {
        let span = info_span!("question", id = question.id, qtype = question.qtype());
        let _guard = span.enter();

        if !question.kind.is_supported() {
            return Ok(self.skip(
                question,
                SkipReason::UnsupportedType(question.qtype().to_string()),
            ));
        }

        let mut working = question.clone();
        let relocated = relocate_assets(&mut working, self.resolver)?;
        self.summary.unresolved_references += relocated.unresolved;

        let item = match build_item(&working, &self.context)? {
            ItemBuild::Item(item) => item,
            ItemBuild::Skipped(reason) => return Ok(self.skip(question, reason)),
        };

        for copy in &relocated.copies {
            self.sink.put(&copy.path, &copy.bytes)?;
        }
        self.sink.put(&item.path, &item.xml)?;
        self.manifest.register(
            self.context.resource_identifier(question.id),
            item.path.as_str(),
            item.title.as_str(),
        );

        let emitted = EmittedItem {
            question_id: question.id,
            identifier: item.identifier,
            title: item.title,
            qtype: question.qtype().to_string(),
            path: item.path,
            max_score: item.max_score,
            assets: relocated.copies.len(),
        };
        info!(path = %emitted.path, assets = emitted.assets, "emitted item");
        self.summary.emitted.push(emitted.clone());
        Ok(ExportOutcome::Emitted(emitted))
    }

    /// Export questions in order, stopping at the first error.
    pub fn export_all<'q>(&mut self, questions: impl IntoIterator<Item = &'q Question>) -> Result<()> {
        for question in questions {
            self.export_question(question)?;
        }
        Ok(())
    }

    /// Write the manifest, close the archive and hand back the sink.
    pub fn finish(mut self) -> Result<(S, ExportSummary)> {
        self.sink.finalize(&self.manifest)?;
        info!(
            emitted = self.summary.emitted.len(),
            skipped = self.summary.skipped.len(),
            "archive finalized"
        );
        Ok((self.sink, self.summary))
    }

    fn skip(&mut self, question: &Question, reason: SkipReason) -> ExportOutcome {
        if matches!(reason, SkipReason::UnsupportedType(_)) {
            debug!(%reason, "question skipped");
        } else {
            warn!(%reason, name = %question.name, "question skipped");
        }
        self.summary.skipped.push(SkippedQuestion {
            question_id: question.id,
            name: question.name.clone(),
            qtype: question.qtype().to_string(),
            reason: reason.clone(),
        });
        ExportOutcome::Skipped(reason)
    }
}
