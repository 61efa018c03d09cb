use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use dogbar_client::{BlobStore, ListOptions};
use serde_json::json;
use shared::models::{AuditAction, MediaAsset, MediaType, format_size};
use tokio::sync::watch;

use super::permissions::{MEDIA_DELETE, MEDIA_UPLOAD, MediaPermissions};
use super::view::{self, PageSummary, SortBy, TypeFilter};
use super::MediaError;
use crate::audit::AuditLogger;
use crate::core::config::{Config, PAGE_SIZES};
use crate::utils::validation::{DEFAULT_NUMBER_MAX, MAX_TEXT_LEN, sanitize_number, sanitize_string};

/// How many delete targets the confirmation lists by name
const DELETE_PREVIEW_LIMIT: usize = 3;

/// Built-in assets shipped with the site, never stored in the bucket
pub fn default_assets() -> Vec<MediaAsset> {
    vec![
        MediaAsset::builtin(
            "St. Pete Hero Video",
            "/assets/media/videos/hero/st-pete-hero.mp4",
            MediaType::Video,
        ),
        MediaAsset::builtin(
            "Sarasota Hero Video",
            "/assets/media/videos/hero/sarasota-hero.mp4",
            MediaType::Video,
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct MediaOptions {
    pub page_size: usize,
    pub show_default_media: bool,
    pub allowed_types: Vec<MediaType>,
    /// How long the final delete progress stays visible
    pub progress_dismiss: Duration,
}

impl Default for MediaOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            show_default_media: false,
            allowed_types: vec![MediaType::Image, MediaType::Video],
            progress_dismiss: Duration::from_secs(1),
        }
    }
}

impl From<&Config> for MediaOptions {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.media_page_size,
            show_default_media: config.show_default_media,
            progress_dismiss: config.delete_progress_dismiss(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryPhase {
    Loading,
    Ready,
    Uploading,
    Deleting,
}

/// Progress of a bulk delete; defaults are not counted in `total`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteProgress {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl DeleteProgress {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub fn label(&self) -> String {
        format!("{} of {}", self.completed, self.total)
    }
}

/// One line of the delete confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePreviewItem {
    pub name: String,
    pub thumbnail_url: String,
    pub size_label: String,
}

/// What the user is asked to confirm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub preview: Vec<DeletePreviewItem>,
    /// Targets beyond the preview
    pub more: usize,
    pub total: usize,
}

impl DeleteConfirmation {
    fn new(targets: &[MediaAsset]) -> Self {
        let preview = targets
            .iter()
            .take(DELETE_PREVIEW_LIMIT)
            .map(|a| DeletePreviewItem {
                name: a.name.clone(),
                thumbnail_url: a.thumbnail_url(),
                size_label: format_size(a.size),
            })
            .collect();
        Self {
            preview,
            more: targets.len().saturating_sub(DELETE_PREVIEW_LIMIT),
            total: targets.len(),
        }
    }

    /// `"+N more"` when the preview is truncated
    pub fn more_label(&self) -> Option<String> {
        (self.more > 0).then(|| format!("+{} more", self.more))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    pub skipped_defaults: Vec<String>,
}

/// A file picked for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadReport {
    pub uploaded: Vec<String>,
    /// (file name, error message)
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Default)]
enum DeleteState {
    #[default]
    Idle,
    AwaitingConfirmation(Vec<MediaAsset>),
}

/// Media library for one console view
///
/// Mutating operations take `&mut self`, so one instance never runs two of
/// them at once.
pub struct MediaLibrary {
    blobs: Arc<dyn BlobStore>,
    permissions: Arc<dyn MediaPermissions>,
    audit: Option<AuditLogger>,
    options: MediaOptions,
    defaults: Vec<MediaAsset>,

    catalog: Vec<MediaAsset>,
    filtered: Vec<MediaAsset>,
    search: String,
    type_filter: TypeFilter,
    sort: SortBy,
    page: usize,
    page_size: usize,

    selection: BTreeSet<String>,
    delete_state: DeleteState,
    viewer: Option<usize>,

    phase: watch::Sender<LibraryPhase>,
    progress: Arc<watch::Sender<Option<DeleteProgress>>>,
}

impl std::fmt::Debug for MediaLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaLibrary")
            .field("catalog", &self.catalog.len())
            .field("filtered", &self.filtered.len())
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .field("selected", &self.selection.len())
            .field("delete_state", &self.delete_state)
            .finish_non_exhaustive()
    }
}

impl MediaLibrary {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        permissions: Arc<dyn MediaPermissions>,
        options: MediaOptions,
    ) -> Self {
        let page_size = if PAGE_SIZES.contains(&options.page_size) {
            options.page_size
        } else {
            20
        };
        let (phase, _) = watch::channel(LibraryPhase::Loading);
        let (progress, _) = watch::channel(None);

        Self {
            blobs,
            permissions,
            audit: None,
            options,
            defaults: default_assets(),
            catalog: Vec::new(),
            filtered: Vec::new(),
            search: String::new(),
            type_filter: TypeFilter::All,
            sort: SortBy::Newest,
            page: 1,
            page_size,
            selection: BTreeSet::new(),
            delete_state: DeleteState::Idle,
            viewer: None,
            phase,
            progress: Arc::new(progress),
        }
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Replace the built-in assets
    pub fn with_defaults(mut self, defaults: Vec<MediaAsset>) -> Self {
        self.defaults = defaults;
        self
    }

    // ========== Catalog ==========

    /// Rebuild the catalog from the bucket
    ///
    /// A listing failure leaves just the defaults (or nothing).
    pub async fn load_media(&mut self) {
        self.phase.send_replace(LibraryPhase::Loading);

        let mut catalog = match self.blobs.list(&ListOptions::default()).await {
            Ok(objects) => objects
                .into_iter()
                .filter_map(|object| {
                    let media_type =
                        MediaType::from_file_name(&object.name, &self.options.allowed_types)?;
                    Some(MediaAsset {
                        url: self.blobs.public_url(&object.name),
                        name: object.name,
                        media_type,
                        size: object.size,
                        created_at: object.created_at,
                        is_default: false,
                    })
                })
                .collect(),
            Err(e) => {
                tracing::error!(error = %e, "Error loading media");
                Vec::new()
            }
        };
        if self.options.show_default_media {
            let mut with_defaults = self.defaults.clone();
            with_defaults.append(&mut catalog);
            catalog = with_defaults;
        }

        tracing::debug!(count = catalog.len(), "Media catalog loaded");
        self.catalog = catalog;

        let catalog = &self.catalog;
        self.selection
            .retain(|id| catalog.iter().any(|a| a.id() == id.as_str()));

        self.apply_filters();
        self.phase.send_replace(LibraryPhase::Ready);
    }

    /// Alias of [`load_media`](Self::load_media)
    pub async fn refresh(&mut self) {
        self.load_media().await;
    }

    /// Recompute the filtered view; a page past the end goes back to page 1
    pub fn apply_filters(&mut self) {
        self.filtered =
            view::filter_and_sort(&self.catalog, &self.search, self.type_filter, self.sort);

        let pages = self.total_pages();
        if self.page > pages && pages > 0 {
            self.page = 1;
        }
        if let Some(index) = self.viewer
            && index >= self.filtered.len()
        {
            self.viewer = None;
        }
    }

    pub fn catalog(&self) -> &[MediaAsset] {
        &self.catalog
    }

    pub fn filtered(&self) -> &[MediaAsset] {
        &self.filtered
    }

    pub fn phase(&self) -> LibraryPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<LibraryPhase> {
        self.phase.subscribe()
    }

    /// Bytes used in the bucket; defaults excluded
    pub fn total_storage_bytes(&self) -> u64 {
        self.catalog
            .iter()
            .filter(|a| !a.is_default)
            .map(|a| a.size)
            .sum()
    }

    // ========== Filters ==========

    pub fn set_search(&mut self, term: &str) {
        self.search = sanitize_string(term, MAX_TEXT_LEN);
        self.page = 1;
        self.apply_filters();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_type_filter(&mut self, filter: TypeFilter) {
        self.type_filter = filter;
        self.page = 1;
        self.apply_filters();
    }

    pub fn type_filter(&self) -> TypeFilter {
        self.type_filter
    }

    pub fn set_sort(&mut self, sort: SortBy) {
        self.sort = sort;
        self.apply_filters();
    }

    pub fn sort(&self) -> SortBy {
        self.sort
    }

    // ========== Pagination ==========

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        view::total_pages(self.filtered.len(), self.page_size)
    }

    pub fn page_items(&self) -> &[MediaAsset] {
        view::page_slice(&self.filtered, self.page, self.page_size)
    }

    pub fn page_summary(&self) -> PageSummary {
        PageSummary::new(self.filtered.len(), self.page, self.page_size)
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<(), MediaError> {
        if !PAGE_SIZES.contains(&size) {
            return Err(MediaError::InvalidPageSize(size));
        }
        self.page_size = size;
        self.page = 1;
        Ok(())
    }

    /// Move to `page` if it exists; otherwise nothing changes
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page >= 1 && page <= self.total_pages() {
            self.page = page;
            true
        } else {
            tracing::debug!(page, current = self.page, "Page out of range");
            false
        }
    }

    /// Page jump from free-text input
    pub fn jump_to_page(&mut self, input: &str) -> bool {
        let page = sanitize_number(input, 0, DEFAULT_NUMBER_MAX);
        self.go_to_page(usize::try_from(page).unwrap_or(0))
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.page > 1 && self.go_to_page(self.page - 1)
    }

    // ========== Selection ==========

    /// Flip selection of a catalog asset; returns whether it is now selected
    pub fn toggle_select(&mut self, id: &str) -> bool {
        if !self.catalog.iter().any(|a| a.id() == id) {
            return false;
        }
        if self.selection.remove(id) {
            false
        } else {
            self.selection.insert(id.to_string());
            true
        }
    }

    /// Select every asset on the current page
    pub fn select_all_on_page(&mut self) {
        let ids: Vec<String> = self.page_items().iter().map(|a| a.id().to_string()).collect();
        self.selection.extend(ids);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    /// Selected assets in catalog order
    pub fn selected_assets(&self) -> Vec<MediaAsset> {
        self.catalog
            .iter()
            .filter(|a| self.selection.contains(a.id()))
            .cloned()
            .collect()
    }

    // ========== Upload ==========

    /// Upload each file under its own name, overwriting
    ///
    /// Files go one at a time; a failure is recorded and the batch continues.
    /// The catalog is reloaded afterwards whatever happened.
    pub async fn handle_upload(
        &mut self,
        files: Vec<UploadFile>,
    ) -> Result<UploadReport, MediaError> {
        if !self.permissions.allows(MEDIA_UPLOAD).await {
            return Err(MediaError::Forbidden(MEDIA_UPLOAD));
        }

        self.phase.send_replace(LibraryPhase::Uploading);
        let mut report = UploadReport::default();

        for file in files {
            if file.name.trim().is_empty() {
                tracing::warn!("Skipping upload without a file name");
                report.failed.push((file.name, "empty file name".to_string()));
                continue;
            }

            // Stored under the name exactly as given
            let name = file.name;

            let content_type = mime_guess::from_path(&name).first_or_octet_stream();
            let size = file.bytes.len();
            match self
                .blobs
                .upload(&name, file.bytes, content_type.essence_str(), true)
                .await
            {
                Ok(()) => {
                    tracing::info!(file = %name, size, "Uploaded media");
                    if let Some(audit) = &self.audit {
                        audit
                            .log(AuditAction::MediaUploaded, json!({ "name": name, "size": size }))
                            .await;
                    }
                    report.uploaded.push(name);
                }
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Upload failed");
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        self.load_media().await;
        Ok(report)
    }

    // ========== Delete ==========

    /// First phase of a delete: remember the targets and describe them
    pub fn request_delete(
        &mut self,
        assets: Vec<MediaAsset>,
    ) -> Result<DeleteConfirmation, MediaError> {
        if assets.is_empty() {
            return Err(MediaError::NothingSelected);
        }
        let confirmation = DeleteConfirmation::new(&assets);
        self.delete_state = DeleteState::AwaitingConfirmation(assets);
        Ok(confirmation)
    }

    pub fn request_delete_selected(&mut self) -> Result<DeleteConfirmation, MediaError> {
        let assets = self.selected_assets();
        self.request_delete(assets)
    }

    pub fn has_pending_delete(&self) -> bool {
        matches!(self.delete_state, DeleteState::AwaitingConfirmation(_))
    }

    /// Drop the pending targets; returns whether there were any
    pub fn cancel_delete(&mut self) -> bool {
        let pending = self.has_pending_delete();
        self.delete_state = DeleteState::Idle;
        pending
    }

    /// Second phase: delete the pending targets
    pub async fn confirm_delete(&mut self) -> Result<DeleteReport, MediaError> {
        let DeleteState::AwaitingConfirmation(targets) = std::mem::take(&mut self.delete_state)
        else {
            return Err(MediaError::NoPendingDelete);
        };

        if !self.permissions.allows(MEDIA_DELETE).await {
            return Err(MediaError::Forbidden(MEDIA_DELETE));
        }

        Ok(self.process_deletions(targets).await)
    }

    async fn process_deletions(&mut self, targets: Vec<MediaAsset>) -> DeleteReport {
        let mut report = DeleteReport::default();
        let (defaults, deletable): (Vec<MediaAsset>, Vec<MediaAsset>) =
            targets.into_iter().partition(|a| a.is_default);
        for asset in defaults {
            tracing::debug!(name = %asset.name, "Skipping built-in asset");
            report.skipped_defaults.push(asset.name);
        }

        let mut progress = DeleteProgress {
            completed: 0,
            failed: 0,
            total: deletable.len(),
        };
        self.progress.send_replace(Some(progress));
        self.phase.send_replace(LibraryPhase::Deleting);

        for asset in deletable {
            match self.blobs.remove(std::slice::from_ref(&asset.name)).await {
                Ok(()) => {
                    progress.completed += 1;
                    self.selection.remove(asset.id());
                    report.deleted.push(asset.name);
                }
                Err(e) => {
                    progress.failed += 1;
                    tracing::warn!(name = %asset.name, error = %e, "Delete failed");
                    report.failed.push(asset.name);
                }
            }
            self.progress.send_replace(Some(progress));
        }

        tracing::info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            skipped = report.skipped_defaults.len(),
            "Bulk delete finished"
        );
        if !report.deleted.is_empty()
            && let Some(audit) = &self.audit
        {
            audit
                .log(
                    AuditAction::MediaDeleted,
                    json!({ "names": report.deleted, "failed": report.failed }),
                )
                .await;
        }

        self.load_media().await;
        self.dismiss_progress_later(progress);
        report
    }

    fn dismiss_progress_later(&self, last: DeleteProgress) {
        let progress = self.progress.clone();
        let delay = self.options.progress_dismiss;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A newer delete may have replaced it
            progress.send_if_modified(|current| {
                if *current == Some(last) {
                    *current = None;
                    true
                } else {
                    false
                }
            });
        });
    }

    pub fn progress(&self) -> Option<DeleteProgress> {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<Option<DeleteProgress>> {
        self.progress.subscribe()
    }

    // ========== Viewer ==========

    /// Open the viewer over the filtered list; an index past the end wraps to 0
    pub fn open_viewer(&mut self, index: usize) -> Option<&MediaAsset> {
        if self.filtered.is_empty() {
            self.viewer = None;
            return None;
        }
        let index = if index >= self.filtered.len() { 0 } else { index };
        self.viewer = Some(index);
        self.filtered.get(index)
    }

    /// Step through the filtered list, wrapping at both ends
    pub fn navigate_viewer(&mut self, delta: isize) -> Option<&MediaAsset> {
        let current = self.viewer?;
        let len = self.filtered.len();
        if len == 0 {
            self.viewer = None;
            return None;
        }

        let target = current as isize + delta;
        let index = if target < 0 {
            len - 1
        } else if target as usize >= len {
            0
        } else {
            target as usize
        };
        self.viewer = Some(index);
        self.filtered.get(index)
    }

    pub fn close_viewer(&mut self) {
        self.viewer = None;
    }

    pub fn viewer_index(&self) -> Option<usize> {
        self.viewer
    }

    pub fn viewer_asset(&self) -> Option<&MediaAsset> {
        self.filtered.get(self.viewer?)
    }
}
