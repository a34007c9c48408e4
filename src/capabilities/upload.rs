//! Media upload capability.
//!
//! The shell owns the actual transfer to the media host; the core only hands
//! over the raw bytes and the target kind, and gets back a durable URL or a
//! user-displayable failure. Nothing here retries: a failed upload needs a new
//! user action.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::model::MediaKind;

/// Correlates one upload request with its resolution. The form keeps the id
/// of the upload it is waiting on; a resolution carrying any other id is
/// stale (the dialog was closed, the kind flipped, or a new form took over)
/// and gets dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(Uuid);

impl UploadId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub kind: MediaKind,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

// Manual Debug: the payload can be tens of megabytes, log its size instead.
impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("kind", &self.kind)
            .field("data_len", &self.data.len())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data")]
pub enum UploadOperation {
    Upload(UploadRequest),
}

impl Operation for UploadOperation {
    type Output = UploadResult;
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadError {
    #[error("file is too large ({size_bytes} bytes, maximum {max_bytes})")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("upload timed out")]
    Timeout,

    #[error("upload rejected: {message}")]
    Rejected { message: String },

    #[error("unknown upload error: {message}")]
    Unknown { message: String },
}

impl UploadError {
    /// What the media field shows when this failure lands.
    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self {
            Self::TooLarge { max_bytes, .. } => format!(
                "The file is too large. Please use a file smaller than {} MB.",
                max_bytes / 1_000_000
            ),
            Self::Network { .. } | Self::Timeout => {
                "Upload failed. Please check your connection and try again.".into()
            }
            Self::Rejected { message } => message.clone(),
            Self::Unknown { .. } => "Upload failed. Please try again.".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutput {
    /// Durable URL on the media host.
    pub url: String,
}

pub type UploadResult = Result<UploadOutput, UploadError>;

pub struct MediaUpload<Ev> {
    context: CapabilityContext<UploadOperation, Ev>,
}

impl<Ev> Capability<Ev> for MediaUpload<Ev> {
    type Operation = UploadOperation;
    type MappedSelf<MappedEv> = MediaUpload<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        MediaUpload::new(self.context.map_event(f))
    }
}

impl<Ev> MediaUpload<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<UploadOperation, Ev>) -> Self {
        Self { context }
    }

    /// Hands the file to the shell and turns the eventual resolution into an
    /// event. One call, one resolution; correlation is the caller's job via
    /// [`UploadId`].
    pub fn upload<F>(&self, request: UploadRequest, event: F)
    where
        F: FnOnce(UploadResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context
                .request_from_shell(UploadOperation::Upload(request))
                .await;
            context.update_app(event(result));
        });
    }
}
