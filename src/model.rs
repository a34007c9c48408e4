use serde::{Deserialize, Serialize};
use std::fmt;

use crate::form::RoutineForm;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutineId(pub String);

impl RoutineId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed media taxonomy. The reference kind is authoritative; there is no
/// separate field per kind, so a routine can never carry both an image and a
/// video reference.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::Video => f.write_str("video"),
        }
    }
}

/// An externally hosted media asset. The URL has been checked for absolute-URL
/// syntax before this is constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub kind: MediaKind,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub id: RoutineId,
    pub title: String,
    /// Display string composed from the validated start/end times at submit
    /// time ("HH:MM - HH:MM"). Stored, not recomputed.
    pub time_range: String,
    pub media: Option<MediaReference>,
    pub task_count: u32,
}

/// Partial update applied by [`RoutineCollection::update`]. `media` is doubly
/// optional: `None` leaves it alone, `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutinePatch {
    pub title: Option<String>,
    pub time_range: Option<String>,
    pub media: Option<Option<MediaReference>>,
    pub task_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum CollectionError {
    #[error("no routine with id {0}")]
    NotFound(RoutineId),
}

/// Insertion-ordered routine store. Mutated only from the update loop, as a
/// result of a confirmed form submission or a confirmed delete.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineCollection {
    routines: Vec<Routine>,
}

impl RoutineCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a routine. Ids are caller-assigned and unique per process; no
    /// dedup or merge happens here.
    pub fn add(&mut self, routine: Routine) {
        debug_assert!(
            self.find(&routine.id).is_none(),
            "duplicate routine id {}",
            routine.id
        );
        self.routines.push(routine);
    }

    pub fn update(&mut self, id: &RoutineId, patch: RoutinePatch) -> Result<(), CollectionError> {
        let routine = self
            .routines
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| CollectionError::NotFound(id.clone()))?;

        if let Some(title) = patch.title {
            routine.title = title;
        }
        if let Some(time_range) = patch.time_range {
            routine.time_range = time_range;
        }
        if let Some(media) = patch.media {
            routine.media = media;
        }
        if let Some(task_count) = patch.task_count {
            routine.task_count = task_count;
        }

        Ok(())
    }

    /// Removes the routine if present. Idempotent; returns whether anything
    /// was actually removed so callers can log the not-found case.
    pub fn remove(&mut self, id: &RoutineId) -> bool {
        let before = self.routines.len();
        self.routines.retain(|r| &r.id != id);
        self.routines.len() != before
    }

    pub fn find(&self, id: &RoutineId) -> Option<&Routine> {
        self.routines.iter().find(|r| &r.id == id)
    }

    /// All routines in insertion order.
    pub fn list(&self) -> &[Routine] {
        &self.routines
    }

    /// Case-insensitive substring match on title, insertion order preserved.
    pub fn matching<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Routine> {
        let needle = query.to_lowercase();
        self.routines
            .iter()
            .filter(move |r| r.title.to_lowercase().contains(&needle))
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    /// Installs the seed list, but only when nothing is there yet.
    pub fn seed_if_empty(&mut self, seeds: Vec<Routine>) {
        if self.routines.is_empty() {
            self.routines = seeds;
        }
    }
}

/// A delete that has been requested but not yet confirmed. The title is kept
/// for the confirmation prompt copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDelete {
    pub id: RoutineId,
    pub title: String,
}

/// Which overlay is open right now. Independent of the routine collection;
/// reset whenever a click lands outside the open element or an action
/// resolves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransientUiState {
    open_dropdown: Option<RoutineId>,
    pending_delete: Option<PendingDelete>,
}

impl TransientUiState {
    /// Single slot: opening a dropdown implicitly closes any other one, and
    /// toggling the already-open dropdown closes it.
    pub fn toggle_dropdown(&mut self, id: RoutineId) {
        if self.open_dropdown.as_ref() == Some(&id) {
            self.open_dropdown = None;
        } else {
            self.open_dropdown = Some(id);
        }
    }

    pub fn close_dropdown(&mut self) {
        self.open_dropdown = None;
    }

    pub fn open_dropdown(&self) -> Option<&RoutineId> {
        self.open_dropdown.as_ref()
    }

    pub fn request_delete(&mut self, id: RoutineId, title: String) {
        self.pending_delete = Some(PendingDelete { id, title });
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Hands out the pending delete, clearing it. Confirming without a pending
    /// request yields `None` and is a no-op for the caller.
    pub fn take_pending_delete(&mut self) -> Option<PendingDelete> {
        self.pending_delete.take()
    }

    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending_delete.as_ref()
    }
}

/// The whole app state. Lives for the process lifetime; nothing here is
/// persisted across restarts.
#[derive(Default)]
pub struct Model {
    pub routines: RoutineCollection,
    pub ui: TransientUiState,
    /// `Some` while the creation dialog is open. A fresh form is built each
    /// time the dialog opens and dropped on cancel or successful submit.
    pub new_routine_form: Option<RoutineForm>,
    pub search_query: String,
    next_routine_id: u64,
}

impl Model {
    /// Hands out the next creation id. Monotonic per process; seeds occupy
    /// ids below `FIRST_ASSIGNED_ID`.
    pub fn next_routine_id(&mut self) -> RoutineId {
        let n = FIRST_ASSIGNED_ID.max(self.next_routine_id + 1);
        self.next_routine_id = n;
        RoutineId::new(n.to_string())
    }
}

const FIRST_ASSIGNED_ID: u64 = 4;

/// Fixed seed list, used only when the collection starts out empty.
pub fn seed_routines() -> Vec<Routine> {
    vec![
        Routine {
            id: RoutineId::new("1"),
            title: "Bedtime Routine".to_string(),
            time_range: "20:30 - 22:30".to_string(),
            media: None,
            task_count: 3,
        },
        Routine {
            id: RoutineId::new("2"),
            title: "Wakeup Routine".to_string(),
            time_range: "06:30 - 07:30".to_string(),
            media: Some(MediaReference {
                kind: MediaKind::Image,
                url: "https://res.cloudinary.com/celina/image/upload/v1762011119/istockphoto-1388989894-612x612_ezmijc.jpg".to_string(),
            }),
            task_count: 3,
        },
        Routine {
            id: RoutineId::new("3"),
            title: "Weekend Routine".to_string(),
            time_range: "10:00 - 12:00".to_string(),
            media: Some(MediaReference {
                kind: MediaKind::Video,
                url: "https://res.cloudinary.com/celina/video/upload/v1755429195/1475515_People_Business_3840x2160_b4pnd7.mp4".to_string(),
            }),
            task_count: 3,
        },
    ]
}
