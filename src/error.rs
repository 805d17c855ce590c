//! Error types for the prd2board library.
//!
//! Failures fall into two families, mirroring the two halves of a run:
//!
//! * **Fatal** — [`Prd2BoardError`] for the whole run and [`SetupError`] for
//!   the board synchronizer. Returned as `Err(..)`; nothing after the failing
//!   step is attempted.
//!
//! * **Non-fatal** — [`SyncIssue`] for a single column, group or item that
//!   could not be created or removed, and [`ChunkError`] for a single chunk of
//!   the PRD that the model could not turn into groups. Both are recorded in
//!   the run's report while processing carries on with the next sibling.
//!
//! [`RemoteApiError`] is the single failure shape of every board API call; it
//! is wrapped by both families depending on which step it happened in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the prd2board library.
#[derive(Debug, Error)]
pub enum Prd2BoardError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The PDF opened fine but contains no extractable text.
    #[error("No text could be extracted from '{path}' (scanned images are not supported)")]
    EmptyDocument { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium system-wide or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every chunk failed; no task hierarchy could be produced.
    #[error("All {total} chunks failed to produce task groups.\nFirst error: {first_error}")]
    AllChunksFailed { total: usize, first_error: String },

    // ── Board errors ──────────────────────────────────────────────────────
    /// A caller-supplied task hierarchy is structurally invalid.
    #[error("Invalid task hierarchy: {0}")]
    InvalidHierarchy(String),

    /// The board synchronizer aborted during setup.
    #[error(transparent)]
    Setup(#[from] SetupError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Fatal failures of the board synchronizer.
///
/// Only these abort a synchronization run. Variants raised after the board
/// was acquired carry its id so the caller can resume by passing it back as
/// the existing board id.
#[derive(Debug, Clone, Error)]
pub enum SetupError {
    /// The hierarchy contains no groups at all.
    #[error("empty first group: the task hierarchy has no groups; nothing was created")]
    EmptyHierarchy,

    /// The first group has no items. Checked before any remote call.
    #[error("empty first group: '{group}' has no items; nothing was created")]
    EmptyFirstGroup { group: String },

    /// The remote service refused to create the board.
    #[error("board creation failed: {0}")]
    BoardCreation(#[source] RemoteApiError),

    /// The numeric estimate column could not be created.
    #[error("mandatory column creation failed for '{title}' on board {board_id}: {source}")]
    MandatoryColumn {
        board_id: String,
        title: String,
        #[source]
        source: RemoteApiError,
    },

    /// The first group could not be created, so default groups cannot be
    /// pruned safely.
    #[error("first group creation failed for '{group}' on board {board_id}: {source}")]
    FirstGroupCreation {
        board_id: String,
        group: String,
        #[source]
        source: RemoteApiError,
    },
}

impl SetupError {
    /// Human-readable label of the step that failed.
    pub fn step(&self) -> &'static str {
        match self {
            SetupError::EmptyHierarchy | SetupError::EmptyFirstGroup { .. } => "empty first group",
            SetupError::BoardCreation(_) => "board creation",
            SetupError::MandatoryColumn { .. } => "mandatory column creation",
            SetupError::FirstGroupCreation { .. } => "first group creation",
        }
    }

    /// The board left behind by the failed run, if one was acquired.
    pub fn board_id(&self) -> Option<&str> {
        match self {
            SetupError::MandatoryColumn { board_id, .. }
            | SetupError::FirstGroupCreation { board_id, .. } => Some(board_id),
            _ => None,
        }
    }
}

/// The remote capability a [`RemoteApiError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOperation {
    CreateBoard,
    RenameBoard,
    ListColumns,
    CreateColumn,
    DeleteColumn,
    CreateGroup,
    ListGroups,
    DeleteGroup,
    CreateItem,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteOperation::CreateBoard => "create_board",
            RemoteOperation::RenameBoard => "rename_board",
            RemoteOperation::ListColumns => "list_columns",
            RemoteOperation::CreateColumn => "create_column",
            RemoteOperation::DeleteColumn => "delete_column",
            RemoteOperation::CreateGroup => "create_group",
            RemoteOperation::ListGroups => "list_groups",
            RemoteOperation::DeleteGroup => "delete_group",
            RemoteOperation::CreateItem => "create_item",
        };
        f.write_str(name)
    }
}

/// Why a remote call was not successful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// The response body reported errors.
    Reported,
    /// The response lacked the expected fields or was not JSON.
    Malformed,
    /// Non-success HTTP status without an error body.
    Http,
    /// The request never completed (connect failure, timeout).
    Transport,
}

/// Failure of a single board API call.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{operation} failed: {message}")]
pub struct RemoteApiError {
    pub operation: RemoteOperation,
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteApiError {
    pub fn new(operation: RemoteOperation, kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
        }
    }

    pub fn reported(operation: RemoteOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RemoteErrorKind::Reported, message)
    }

    pub fn malformed(operation: RemoteOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RemoteErrorKind::Malformed, message)
    }
}

/// A non-fatal failure of one entity during synchronization.
///
/// Stored in [`crate::output::SyncReport::issues`]; the run continues with
/// the next sibling entity.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncIssue {
    /// Renaming a reused board failed; the board keeps its old name.
    #[error("could not rename board {board_id}: {source}")]
    BoardRename { board_id: String, source: RemoteApiError },

    /// Existing columns could not be listed, so none were removed.
    #[error("could not list columns: {source}")]
    ColumnList { source: RemoteApiError },

    /// One pre-existing column survived the reset.
    #[error("could not delete column '{title}' ({column_id}): {source}")]
    ColumnDelete {
        column_id: String,
        title: String,
        source: RemoteApiError,
    },

    /// An extra column was not created; items omit its value.
    #[error("could not create column '{title}': {source}")]
    ColumnCreate { title: String, source: RemoteApiError },

    /// An extra column spec was not attempted.
    #[error("skipped column '{title}': {reason}")]
    ColumnSkipped { title: String, reason: String },

    /// Existing groups could not be listed, so default groups remain.
    #[error("could not list groups: {source}")]
    GroupList { source: RemoteApiError },

    /// Default groups were kept because the first group has no created item.
    #[error("kept default groups: first group '{group}' is empty ({reason})")]
    PruneSkipped { group: String, reason: String },

    /// One default group survived pruning.
    #[error("could not delete group '{title}' ({group_id}): {source}")]
    GroupDelete {
        group_id: String,
        title: String,
        source: RemoteApiError,
    },

    /// A group was not created; none of its items were attempted.
    #[error("could not create group '{group}' ({items} items skipped): {source}")]
    GroupCreate {
        group: String,
        items: usize,
        source: RemoteApiError,
    },

    /// One item was not created.
    #[error("could not create item '{task}' in group '{group}': {source}")]
    ItemCreate {
        group: String,
        task: String,
        source: RemoteApiError,
    },
}

/// A non-fatal error for a single chunk of PRD text.
///
/// Stored in [`crate::output::ChunkReport`]; planning continues unless
/// every chunk fails.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum ChunkError {
    /// Completion call failed after retries.
    #[error("Chunk {chunk}: completion failed after {retries} retries: {detail}")]
    CompletionFailed {
        chunk: usize,
        retries: u32,
        detail: String,
    },

    /// Completion call timed out on the last attempt.
    #[error("Chunk {chunk}: completion timed out after {secs}s")]
    Timeout { chunk: usize, secs: u64 },

    /// The model answered but no JSON could be recovered.
    #[error("Chunk {chunk}: unparseable model output: {detail}")]
    Unparseable { chunk: usize, detail: String },

    /// The JSON was valid but contained no group with a usable item.
    #[error("Chunk {chunk}: model output contained no usable groups")]
    NoGroups { chunk: usize },
}
