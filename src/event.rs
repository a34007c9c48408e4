use serde::{Deserialize, Serialize};

use crate::capabilities::{UploadId, UploadResult};
use crate::form::FormField;
use crate::model::{MediaKind, RoutineId, RoutinePatch};

/// Everything that can happen to the core: user actions from the shell plus
/// collaborator resolutions. One enum, handled on a single logical thread.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    AppStarted,

    // Browsing
    SearchChanged {
        query: String,
    },

    // New-routine dialog
    NewRoutineRequested,
    NewRoutineCancelled,
    FormFieldChanged {
        field: FormField,
        value: String,
    },
    MediaKindSelected {
        kind: MediaKind,
    },
    MediaFilePicked {
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
    },
    MediaCleared,
    /// Upload collaborator resolution. Applied only while `id` still names
    /// the active upload of the open form.
    MediaUploadResolved {
        id: UploadId,
        result: UploadResult,
    },
    SubmitNewRoutine,

    // Existing routines
    RoutineUpdated {
        id: RoutineId,
        patch: Box<RoutinePatch>,
    },
    DropdownToggled {
        id: RoutineId,
    },
    /// Click outside any open element.
    DismissOverlays,
    DeleteRequested {
        id: RoutineId,
        title: String,
    },
    DeleteCancelled,
    DeleteConfirmed,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted => "app_started",
            Self::SearchChanged { .. } => "search_changed",
            Self::NewRoutineRequested => "new_routine_requested",
            Self::NewRoutineCancelled => "new_routine_cancelled",
            Self::FormFieldChanged { .. } => "form_field_changed",
            Self::MediaKindSelected { .. } => "media_kind_selected",
            Self::MediaFilePicked { .. } => "media_file_picked",
            Self::MediaCleared => "media_cleared",
            Self::MediaUploadResolved { .. } => "media_upload_resolved",
            Self::SubmitNewRoutine => "submit_new_routine",
            Self::RoutineUpdated { .. } => "routine_updated",
            Self::DropdownToggled { .. } => "dropdown_toggled",
            Self::DismissOverlays => "dismiss_overlays",
            Self::DeleteRequested { .. } => "delete_requested",
            Self::DeleteCancelled => "delete_cancelled",
            Self::DeleteConfirmed => "delete_confirmed",
        }
    }
}
