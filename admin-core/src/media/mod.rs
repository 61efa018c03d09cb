//! Media library
//!
//! Browsable view over the media bucket with client-side filtering and
//! pagination, a selection set, sequential uploads and a two-phase delete.

mod library;
mod permissions;
mod view;

pub use library::{
    DeleteConfirmation, DeletePreviewItem, DeleteProgress, DeleteReport, LibraryPhase,
    MediaLibrary, MediaOptions, UploadFile, UploadReport, default_assets,
};
pub use permissions::{AllowAll, MEDIA_DELETE, MEDIA_UPLOAD, MediaPermissions};
pub use view::{PageSummary, SortBy, TypeFilter};

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Not permitted: {0}")]
    Forbidden(&'static str),

    #[error("No delete is awaiting confirmation")]
    NoPendingDelete,

    #[error("Nothing selected")]
    NothingSelected,

    #[error("Unsupported page size: {0}")]
    InvalidPageSize(usize),
}

impl MediaError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MediaError::Forbidden(_) => ErrorCode::PermissionDenied,
            MediaError::NoPendingDelete => ErrorCode::NoPendingDelete,
            MediaError::NothingSelected => ErrorCode::RequiredField,
            MediaError::InvalidPageSize(_) => ErrorCode::ValueOutOfRange,
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::with_message(err.code(), err.to_string())
    }
}
