//! Shared core of the Routinely client: an event-driven, single-threaded
//! state machine for tracking time-boxed routines. The shell renders the
//! [`ViewModel`] and feeds user actions back in as [`Event`]s; the only
//! outward dependency is the media upload collaborator, behind a capability.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capabilities;
pub mod event;
pub mod form;
pub mod model;

pub use app::{App, DeleteConfirmationView, RoutineCardView, RoutineFormView, ViewModel};
pub use capabilities::{Capabilities, Effect};
pub use event::Event;
pub use model::Model;

/// Core-side guard for upload payloads; anything larger is rejected without
/// bothering the shell.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub mod app {
    use serde::{Deserialize, Serialize};
    use tracing::{debug, warn};

    use crate::capabilities::{Capabilities, UploadError, UploadId, UploadRequest, UploadResult};
    use crate::event::Event;
    use crate::form::{FormField, RoutineForm};
    use crate::model::{seed_routines, MediaKind, MediaReference, Model, Routine};
    use crate::MAX_UPLOAD_BYTES;

    #[derive(Default)]
    pub struct App;

    /// One routine card, already filtered by the search query.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RoutineCardView {
        pub id: String,
        pub title: String,
        pub time_range: String,
        pub task_count: u32,
        pub media: Option<MediaReference>,
        pub dropdown_open: bool,
    }

    /// The creation dialog. Per-field error strings are ready for display;
    /// `media_error` is the merge of the schema error and the collaborator
    /// error (schema wins).
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RoutineFormView {
        pub title: String,
        pub date: String,
        pub start_time: String,
        pub end_time: String,
        pub media_kind: MediaKind,
        pub media_url: String,
        pub title_error: Option<String>,
        pub date_error: Option<String>,
        pub start_time_error: Option<String>,
        pub end_time_error: Option<String>,
        pub media_error: Option<String>,
        pub uploading: bool,
        pub can_submit: bool,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DeleteConfirmationView {
        pub id: String,
        pub title: String,
        pub prompt: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ViewModel {
        pub routines: Vec<RoutineCardView>,
        pub search_query: String,
        pub new_routine_form: Option<RoutineFormView>,
        pub delete_confirmation: Option<DeleteConfirmationView>,
    }

    impl App {
        fn start_upload(model: &mut Model, caps: &Capabilities, data: Vec<u8>) {
            let Some(form) = model.new_routine_form.as_mut() else {
                warn!("file picked with no open form");
                return;
            };
            if form.uploading() {
                debug!("upload already in flight, ignoring pick");
                return;
            }
            if data.len() > MAX_UPLOAD_BYTES {
                let error = UploadError::TooLarge {
                    size_bytes: data.len() as u64,
                    max_bytes: MAX_UPLOAD_BYTES as u64,
                };
                form.report_upload_failure(error.user_facing_message());
                return;
            }

            let id = UploadId::fresh();
            form.begin_upload(id);
            caps.upload.upload(
                UploadRequest {
                    kind: form.media_kind(),
                    data,
                },
                move |result| Event::MediaUploadResolved { id, result },
            );
        }

        fn apply_upload_resolution(model: &mut Model, id: UploadId, result: UploadResult) {
            let Some(form) = model.new_routine_form.as_mut() else {
                debug!(%id, "upload resolved after the dialog closed, dropping");
                return;
            };
            if form.active_upload() != Some(id) {
                warn!(%id, "stale upload resolution dropped");
                return;
            }

            form.clear_active_upload();
            match result {
                Ok(output) => form.set_media(Some(output.url)),
                Err(error) => form.report_upload_failure(error.user_facing_message()),
            }
        }

        fn submit_new_routine(model: &mut Model) {
            let data = match model.new_routine_form.as_mut() {
                Some(form) => match form.submit() {
                    Ok(data) => data,
                    Err(error) => {
                        debug!(error = %error, "submission rejected");
                        return;
                    }
                },
                None => {
                    warn!("submit with no open form");
                    return;
                }
            };

            let id = model.next_routine_id();
            model.routines.add(Routine {
                id,
                title: data.title,
                time_range: data.time_range,
                media: Some(data.media),
                task_count: 0,
            });
            // The save path has returned; dropping the form is the reset.
            model.new_routine_form = None;
        }

        fn form_view(form: &RoutineForm) -> RoutineFormView {
            RoutineFormView {
                title: form.title().to_string(),
                date: form.date().to_string(),
                start_time: form.start_time().to_string(),
                end_time: form.end_time().to_string(),
                media_kind: form.media_kind(),
                media_url: form.media_url().to_string(),
                title_error: form.error(FormField::Title).map(str::to_string),
                date_error: form.error(FormField::Date).map(str::to_string),
                start_time_error: form.error(FormField::StartTime).map(str::to_string),
                end_time_error: form.error(FormField::EndTime).map(str::to_string),
                media_error: form.media_error().map(str::to_string),
                uploading: form.uploading(),
                can_submit: form.is_submittable(),
            }
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            debug!(event = event.name(), "handling event");

            match event {
                Event::AppStarted => {
                    model.routines.seed_if_empty(seed_routines());
                }

                Event::SearchChanged { query } => {
                    model.search_query = query;
                }

                Event::NewRoutineRequested => {
                    model.ui.close_dropdown();
                    model.new_routine_form = Some(RoutineForm::new());
                }

                Event::NewRoutineCancelled => {
                    // Also abandons interest in any in-flight upload; a late
                    // resolution will no longer find its id and gets dropped.
                    model.new_routine_form = None;
                }

                Event::FormFieldChanged { field, value } => {
                    if let Some(form) = model.new_routine_form.as_mut() {
                        form.set_field(field, value);
                    } else {
                        warn!(?field, "field edit with no open form");
                    }
                }

                Event::MediaKindSelected { kind } => {
                    if let Some(form) = model.new_routine_form.as_mut() {
                        form.set_media_kind(kind);
                    }
                }

                Event::MediaCleared => {
                    if let Some(form) = model.new_routine_form.as_mut() {
                        form.set_media(None);
                    }
                }

                Event::MediaFilePicked { data } => {
                    Self::start_upload(model, caps, data);
                }

                Event::MediaUploadResolved { id, result } => {
                    Self::apply_upload_resolution(model, id, result);
                }

                Event::SubmitNewRoutine => {
                    Self::submit_new_routine(model);
                }

                Event::RoutineUpdated { id, patch } => {
                    if let Err(error) = model.routines.update(&id, *patch) {
                        warn!(%id, error = %error, "update ignored");
                    }
                }

                Event::DropdownToggled { id } => {
                    model.ui.toggle_dropdown(id);
                }

                Event::DismissOverlays => {
                    model.ui.close_dropdown();
                }

                Event::DeleteRequested { id, title } => {
                    model.ui.close_dropdown();
                    model.ui.request_delete(id, title);
                }

                Event::DeleteCancelled => {
                    model.ui.cancel_delete();
                }

                Event::DeleteConfirmed => {
                    if let Some(pending) = model.ui.take_pending_delete() {
                        if !model.routines.remove(&pending.id) {
                            warn!(id = %pending.id, "delete confirmed for unknown routine");
                        }
                    }
                }
            }

            // Every event ends in a render; all mutations here are cheap.
            caps.render.render();
        }

        fn view(&self, model: &Model) -> ViewModel {
            let routines = model
                .routines
                .matching(&model.search_query)
                .map(|r| RoutineCardView {
                    id: r.id.as_str().to_string(),
                    title: r.title.clone(),
                    time_range: r.time_range.clone(),
                    task_count: r.task_count,
                    media: r.media.clone(),
                    dropdown_open: model.ui.open_dropdown() == Some(&r.id),
                })
                .collect();

            ViewModel {
                routines,
                search_query: model.search_query.clone(),
                new_routine_form: model.new_routine_form.as_ref().map(Self::form_view),
                delete_confirmation: model.ui.pending_delete().map(|pending| {
                    DeleteConfirmationView {
                        id: pending.id.as_str().to_string(),
                        title: pending.title.clone(),
                        prompt: format!("Delete {} permanently?", pending.title),
                    }
                }),
            }
        }
    }
}
