//! Full-sync orchestration.
//!
//! Runs the four pipeline phases in order — scan, attachments,
//! embeddings, links — and reports phase boundaries through a
//! [`ProgressSink`]. Attachments and links only cover notes the scan
//! marked changed; the embedding phase covers every note missing a
//! vector, including leftovers from earlier failed runs.

use anyhow::Result;

use crate::attachments;
use crate::config::Config;
use crate::embed;
use crate::embedding::Embedder;
use crate::links;
use crate::models::FullSyncReport;
use crate::scan;
use crate::store::NoteStore;
use crate::vision::VisionCaptioner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Scan,
    Attachments,
    Embed,
    Links,
}

impl SyncPhase {
    pub fn label(self) -> &'static str {
        match self {
            SyncPhase::Scan => "scan",
            SyncPhase::Attachments => "attachments",
            SyncPhase::Embed => "embed",
            SyncPhase::Links => "links",
        }
    }

    /// 1-based position in the pipeline.
    pub fn index(self) -> usize {
        match self {
            SyncPhase::Scan => 1,
            SyncPhase::Attachments => 2,
            SyncPhase::Embed => 3,
            SyncPhase::Links => 4,
        }
    }
}

pub const PHASE_COUNT: usize = 4;

#[derive(Debug, Clone)]
pub enum SyncEvent {
    PhaseStarted { phase: SyncPhase },
    PhaseFinished { phase: SyncPhase, summary: String },
    Failed { message: String },
}

/// Receives progress events during a sync run.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: SyncEvent);
}

/// Human-readable progress lines on stderr.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn report(&self, event: SyncEvent) {
        match event {
            SyncEvent::PhaseStarted { phase } => {
                eprintln!("sync {}/{} {}  ...", phase.index(), PHASE_COUNT, phase.label());
            }
            SyncEvent::PhaseFinished { phase, summary } => {
                eprintln!("sync {}/{} {}  {}", phase.index(), PHASE_COUNT, phase.label(), summary);
            }
            SyncEvent::Failed { message } => {
                eprintln!("sync failed: {message}");
            }
        }
    }
}

/// One JSON object per line on stderr, for machine consumers.
pub struct JsonProgress;

impl ProgressSink for JsonProgress {
    fn report(&self, event: SyncEvent) {
        let value = match event {
            SyncEvent::PhaseStarted { phase } => serde_json::json!({
                "event": "phase_started",
                "phase": phase.label(),
                "index": phase.index(),
                "of": PHASE_COUNT,
            }),
            SyncEvent::PhaseFinished { phase, summary } => serde_json::json!({
                "event": "phase_finished",
                "phase": phase.label(),
                "index": phase.index(),
                "of": PHASE_COUNT,
                "summary": summary,
            }),
            SyncEvent::Failed { message } => serde_json::json!({
                "event": "failed",
                "message": message,
            }),
        };
        eprintln!("{value}");
    }
}

/// Discards all events.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: SyncEvent) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress on a terminal, none otherwise.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(self) -> Box<dyn ProgressSink> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

impl std::str::FromStr for ProgressMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "off" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => anyhow::bail!("unknown progress mode: '{other}' (off, human, json)"),
        }
    }
}

/// Run the full synchronization pipeline.
///
/// Phases run strictly in order; a phase failure aborts the run after
/// emitting a [`SyncEvent::Failed`]. Item-level failures inside a
/// phase are already absorbed into that phase's counts.
pub async fn run_full_sync(
    store: &NoteStore,
    embedder: &dyn Embedder,
    captioner: &dyn VisionCaptioner,
    config: &Config,
    progress: &dyn ProgressSink,
) -> Result<FullSyncReport> {
    match run_phases(store, embedder, captioner, config, progress).await {
        Ok(report) => Ok(report),
        Err(e) => {
            progress.report(SyncEvent::Failed {
                message: format!("{e:#}"),
            });
            Err(e)
        }
    }
}

async fn run_phases(
    store: &NoteStore,
    embedder: &dyn Embedder,
    captioner: &dyn VisionCaptioner,
    config: &Config,
    progress: &dyn ProgressSink,
) -> Result<FullSyncReport> {
    progress.report(SyncEvent::PhaseStarted { phase: SyncPhase::Scan });
    let scan_report = scan::scan_vault(store, config).await?;
    progress.report(SyncEvent::PhaseFinished {
        phase: SyncPhase::Scan,
        summary: format!(
            "scanned {} files ({} new, {} updated, {} deleted)",
            scan_report.total_files,
            scan_report.new_notes,
            scan_report.updated_notes,
            scan_report.deleted_notes
        ),
    });

    progress.report(SyncEvent::PhaseStarted { phase: SyncPhase::Attachments });
    let attachment_report = attachments::process_attachments(
        store,
        captioner,
        embedder,
        config,
        &scan_report.changed_note_ids,
    )
    .await?;
    progress.report(SyncEvent::PhaseFinished {
        phase: SyncPhase::Attachments,
        summary: format!(
            "processed {} images ({} skipped, {} errors)",
            attachment_report.processed, attachment_report.skipped, attachment_report.errors
        ),
    });

    progress.report(SyncEvent::PhaseStarted { phase: SyncPhase::Embed });
    let embeddings_generated = embed::generate_missing_embeddings(store, embedder, config).await?;
    progress.report(SyncEvent::PhaseFinished {
        phase: SyncPhase::Embed,
        summary: format!("generated {embeddings_generated} embeddings"),
    });

    progress.report(SyncEvent::PhaseStarted { phase: SyncPhase::Links });
    let link_report = links::build_links_for_changed(store, &scan_report.changed_note_ids).await?;
    progress.report(SyncEvent::PhaseFinished {
        phase: SyncPhase::Links,
        summary: format!(
            "rebuilt links for {} notes ({} links, {} broken)",
            link_report.total_notes, link_report.total_links, link_report.broken_links
        ),
    });

    Ok(FullSyncReport {
        scan: scan_report,
        attachments: attachment_report,
        embeddings_generated,
        links: link_report,
    })
}
