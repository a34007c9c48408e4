pub mod upload;

pub use self::upload::{
    MediaUpload, UploadError, UploadId, UploadOperation, UploadOutput, UploadRequest, UploadResult,
};

// We use Crux's built-in Render capability directly because it provides
// all necessary functionality for triggering view updates.
pub use crux_core::render::Render;

use crate::app::App;
use crate::event::Event;

/// The Effect derive names each variant after the capability type as written
/// in the field, so this alias makes the upload effect `Effect::Upload`.
pub type Upload<Ev> = MediaUpload<Ev>;

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub upload: Upload<Event>,
}
