//! Archive coordinator - stage orchestration logic
//!
//! This module runs the archive stages in order:
//! - Docket details
//! - Document listing
//! - Comment id discovery per document
//! - Comment details and attachment downloads per comment
//! - The comment to attachment-path summary
//!
//! Each completed unit is checkpointed to the resume manifest, and the
//! manifest is flushed once more when the run ends, whatever the outcome.

use crate::api::{
    attachment_files, comment_artifact_name, comment_detail_params, document_listing_params,
    record_id, ApiEndpoints, AttachmentFile, DocumentRef,
};
use crate::config::Config;
use crate::crawler::{Cancellation, Fetcher, Paginator};
use crate::state::ArchiveStage;
use crate::storage::{
    write_atomic, write_json_artifact, ArchiveLayout, CheckpointStore, JsonManifestStore,
    ResumeManifest,
};
use crate::{ArchiveError, ConfigError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Comments between progress log lines
const PROGRESS_INTERVAL: usize = 100;

/// What to archive and where
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Docket to archive
    pub docket_id: String,

    /// Directory receiving artifacts and the resume manifest
    pub output_dir: PathBuf,

    /// Skip units the manifest records as complete
    pub resume: bool,
}

/// Totals of a finished archive run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveReport {
    pub documents: usize,
    pub comments: usize,
    pub attachment_files: usize,
    pub requests_sent: u64,
    pub elapsed: Duration,
}

/// Main archive coordinator structure
pub struct Coordinator {
    fetcher: Fetcher,
    paginator: Paginator,
    endpoints: ApiEndpoints,
    layout: ArchiveLayout,
    store: JsonManifestStore,
    manifest: ResumeManifest,
    docket_id: String,
    resume: bool,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The archiver configuration
    /// * `options` - Docket, output directory and resume flag
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(ArchiveError)` - Invalid options or HTTP client failure
    pub fn new(config: &Config, options: ArchiveOptions) -> Result<Self> {
        let fetcher = Fetcher::from_config(config)?;
        Self::with_fetcher(config, options, fetcher)
    }

    /// Creates a coordinator around an existing fetcher
    pub fn with_fetcher(config: &Config, options: ArchiveOptions, fetcher: Fetcher) -> Result<Self> {
        if options.docket_id.trim().is_empty() {
            return Err(ConfigError::Validation("docket id cannot be empty".to_string()).into());
        }

        Ok(Self {
            fetcher,
            paginator: Paginator::new(&config.pagination),
            endpoints: ApiEndpoints::new(&config.api.base_url)?,
            layout: ArchiveLayout::new(&options.output_dir),
            store: JsonManifestStore::new(&options.output_dir),
            manifest: ResumeManifest::new(),
            docket_id: options.docket_id,
            resume: options.resume,
        })
    }

    /// Handle that aborts the run while it waits out a rate limit
    pub fn cancellation(&self) -> Cancellation {
        self.fetcher.cancellation()
    }

    /// The manifest as of the last completed unit
    pub fn manifest(&self) -> &ResumeManifest {
        &self.manifest
    }

    /// Runs every stage, flushing the manifest before returning
    ///
    /// A manifest that fails to load is reported without being
    /// overwritten. Any other failure ends the run after the flush.
    pub async fn run(&mut self) -> Result<ArchiveReport> {
        let span = tracing::info_span!("archive", docket = %self.docket_id);
        self.run_with_checkpoint().instrument(span).await
    }

    async fn run_with_checkpoint(&mut self) -> Result<ArchiveReport> {
        let start = Instant::now();
        tracing::info!("----------------");
        tracing::info!("output to: {}", self.layout.root().display());

        self.manifest = if self.resume {
            self.store.load()?
        } else {
            ResumeManifest::new()
        };
        self.manifest.bind_docket(&self.docket_id)?;
        if self.resume {
            tracing::info!(
                "Resuming, next stage with outstanding work: {}",
                self.manifest.pending_stage()
            );
        }

        let result = self.run_stages().await;
        let flushed = self.checkpoint();
        tracing::info!("total time taken: {:.2?}", start.elapsed());

        match (result, flushed) {
            (Ok(mut report), Ok(())) => {
                report.requests_sent = self.fetcher.requests_sent();
                report.elapsed = start.elapsed();
                tracing::info!("-------- Done! --------");
                Ok(report)
            }
            (Ok(_), Err(e)) => {
                tracing::error!("Failed to save resume manifest: {}", e);
                Err(e)
            }
            (Err(e), flushed) => {
                if let Err(save_error) = flushed {
                    tracing::error!("Failed to save resume manifest: {}", save_error);
                }
                Err(e)
            }
        }
    }

    async fn run_stages(&mut self) -> Result<ArchiveReport> {
        self.fetcher.ensure_active()?;
        self.fetch_docket_details()
            .await
            .map_err(stage_failed(ArchiveStage::DocketDetails))?;

        let documents = self
            .list_documents()
            .await
            .map_err(stage_failed(ArchiveStage::DocumentList))?;

        let comment_ids = self
            .discover_comments(&documents)
            .await
            .map_err(stage_failed(ArchiveStage::CommentDiscovery))?;

        let summary = self
            .fetch_comment_details(&comment_ids)
            .await
            .map_err(stage_failed(ArchiveStage::CommentDetail))?;

        write_json_artifact(&self.layout.summary(), &summary)
            .map_err(ArchiveError::from)
            .map_err(stage_failed(ArchiveStage::Finalize))?;

        Ok(ArchiveReport {
            documents: documents.len(),
            comments: comment_ids.len(),
            attachment_files: summary.values().map(Vec::len).sum(),
            ..ArchiveReport::default()
        })
    }

    async fn fetch_docket_details(&mut self) -> Result<()> {
        tracing::info!("-------- getting docket and details --------");
        if self.manifest.docket_completed {
            tracing::info!("- already have docket details, skipping...");
            return Ok(());
        }

        let url = self.endpoints.docket(&self.docket_id);
        let response = self
            .fetcher
            .get_or_wait(&url, &[])
            .await?
            .into_payload(&url)?;
        write_json_artifact(&self.layout.docket_details(), &response["data"])?;

        self.manifest.mark_docket_completed();
        self.checkpoint()
    }

    async fn list_documents(&mut self) -> Result<Vec<DocumentRef>> {
        tracing::info!("-------- getting docket documents --------");
        if let Some(documents) = self.manifest.documents() {
            tracing::info!("- already have document ids, skipping...");
            return Ok(documents.to_vec());
        }

        let url = self.endpoints.documents();
        let params = document_listing_params(&self.docket_id, self.paginator.page_size());
        let records = self
            .paginator
            .drain_all(&mut self.fetcher, &url, &params)
            .await?;
        write_json_artifact(&self.layout.documents(), &records)?;

        let documents = records
            .iter()
            .map(DocumentRef::from_record)
            .collect::<Result<Vec<_>>>()?;
        self.manifest.record_documents(documents.clone());
        self.checkpoint()?;
        Ok(documents)
    }

    async fn discover_comments(&mut self, documents: &[DocumentRef]) -> Result<Vec<String>> {
        tracing::info!("-------- getting comments for all documents --------");
        tracing::info!("---- {} total documents", documents.len());

        let url = self.endpoints.comments();
        let mut all_comments = Vec::new();
        for document in documents {
            self.fetcher.ensure_active()?;
            if let Some(comment_ids) = self.manifest.comments_for(&document.object_id) {
                tracing::info!(
                    "- already have comments for document {} ({}), skipping...",
                    document.id,
                    document.object_id
                );
                all_comments.extend_from_slice(comment_ids);
                continue;
            }

            tracing::info!(
                "-------- getting comments for document: {}, objectId: {}",
                document.id,
                document.object_id
            );
            let comments = self
                .paginator
                .drain_comments(&mut self.fetcher, &url, &document.object_id)
                .await?;
            write_json_artifact(&self.layout.document_comments(document), &comments)?;

            let comment_ids = comments
                .iter()
                .map(|comment| record_id(comment).map(str::to_string))
                .collect::<Result<Vec<_>>>()?;
            all_comments.extend(comment_ids.iter().cloned());
            self.manifest
                .record_document_comments(&document.object_id, comment_ids);
            self.checkpoint()?;
        }

        Ok(all_comments)
    }

    async fn fetch_comment_details(
        &mut self,
        comment_ids: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>> {
        tracing::info!("-------- getting all comment details and attachments --------");
        let total = comment_ids.len();
        tracing::info!("---- {} total comments", total);

        let mut summary = BTreeMap::new();
        for (index, comment_id) in comment_ids.iter().enumerate() {
            self.fetcher.ensure_active()?;
            let position = index + 1;
            if position % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "---- retrieved {} of {} ({:.2}%)",
                    position,
                    total,
                    position as f64 / total as f64 * 100.0
                );
            }

            // A comment listed under several documents is only skipped when resuming
            let archived = self
                .manifest
                .attachments_for(comment_id)
                .filter(|_| self.resume);
            if let Some(paths) = archived {
                tracing::debug!(
                    "- already have comment details and attachments for {}, skipping...",
                    comment_id
                );
                summary.insert(comment_id.clone(), paths.to_vec());
                continue;
            }

            let paths = self.archive_comment(comment_id).await?;
            summary.insert(comment_id.clone(), paths.clone());
            self.manifest.record_comment(comment_id, paths);
            self.checkpoint()?;
        }

        Ok(summary)
    }

    /// Writes one comment's detail artifact and its attachment files
    async fn archive_comment(&mut self, comment_id: &str) -> Result<Vec<String>> {
        tracing::info!(
            "--- getting comment details and attachments for: {}",
            comment_id
        );
        let url = self.endpoints.comment(comment_id);
        let response = self
            .fetcher
            .get_or_wait(&url, &comment_detail_params())
            .await?
            .into_payload(&url)?;

        let detail = &response["data"];
        let artifact = comment_artifact_name(detail, comment_id)?;
        write_json_artifact(&self.layout.comment_detail(&artifact), detail)?;

        let files = attachment_files(&response);
        if files.is_empty() {
            return Ok(Vec::new());
        }
        self.save_attachments(comment_id, &files).await
    }

    async fn save_attachments(
        &self,
        comment_id: &str,
        files: &[AttachmentFile],
    ) -> Result<Vec<String>> {
        tracing::info!(
            "-- saving attachments for: {}, {} files...",
            comment_id,
            files.len()
        );
        let dir = self.layout.attachment_dir(comment_id);
        std::fs::create_dir_all(&dir)?;

        let mut saved = Vec::new();
        for file in files {
            let Some(bytes) = self.fetcher.download(&file.url).await? else {
                continue;
            };
            write_atomic(&dir.join(&file.filename), &bytes)?;
            saved.push(ArchiveLayout::attachment_relative_path(
                comment_id,
                &file.filename,
            ));
        }
        Ok(saved)
    }

    fn checkpoint(&self) -> Result<()> {
        self.store.save(&self.manifest)?;
        Ok(())
    }
}

/// Logs a stage failure with its stage before propagating it
fn stage_failed(stage: ArchiveStage) -> impl Fn(ArchiveError) -> ArchiveError {
    move |e| {
        tracing::error!("Stage '{}' failed: {}", stage, e);
        e
    }
}

/// Archives a docket with a fresh coordinator
///
/// # Example
///
/// ```no_run
/// use docket_archiver::config::load_config;
/// use docket_archiver::crawler::{run_archive, ArchiveOptions};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("archiver.toml"))?;
/// let options = ArchiveOptions {
///     docket_id: "EPA-HQ-OAR-2021-0317".to_string(),
///     output_dir: "./archive".into(),
///     resume: true,
/// };
/// run_archive(&config, options).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_archive(config: &Config, options: ArchiveOptions) -> Result<ArchiveReport> {
    let mut coordinator = Coordinator::new(config, options)?;
    coordinator.run().await
}
