//! The new-routine form: field values, incremental schema validation, the
//! external upload error channel, and the submission state machine.
//!
//! Validation is a rule table evaluated imperatively: one predicate per field,
//! then the cross-field time rule. Failures are state to display, never
//! errors to propagate; nothing in here panics or throws.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::capabilities::upload::UploadId;
use crate::model::{MediaKind, MediaReference};

pub const MSG_TITLE_REQUIRED: &str = "Routine title is required";
pub const MSG_DATE_REQUIRED: &str = "Date is required";
pub const MSG_DATE_INVALID: &str = "Invalid date format (YYYY-MM-DD)";
pub const MSG_START_REQUIRED: &str = "Start time is required";
pub const MSG_START_INVALID: &str = "Invalid start time format (HH:MM)";
pub const MSG_END_REQUIRED: &str = "End time is required";
pub const MSG_END_INVALID: &str = "Invalid end time format (HH:MM)";
pub const MSG_END_BEFORE_START: &str = "End time must be after start time";
pub const MSG_MEDIA_REQUIRED: &str = "Please upload an illustration.";
pub const MSG_MEDIA_INVALID: &str = "Please upload a valid illustration file";

/// Zero-padded 24-hour "HH:MM": hours 00-23, minutes 00-59.
pub fn is_valid_time(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 5 || b[2] != b':' {
        return false;
    }
    if !b[0].is_ascii_digit()
        || !b[1].is_ascii_digit()
        || !b[3].is_ascii_digit()
        || !b[4].is_ascii_digit()
    {
        return false;
    }
    let hour_ok = match b[0] {
        b'0' | b'1' => true,
        b'2' => b[1] <= b'3',
        _ => false,
    };
    hour_ok && b[3] <= b'5'
}

fn is_valid_date(s: &str) -> bool {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_valid_url(s: &str) -> bool {
    url::Url::parse(s).is_ok()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    Title,
    Date,
    StartTime,
    EndTime,
    MediaUrl,
}

/// Why a submission was rejected. Field-level detail lives in the error map;
/// this only names the blocking precondition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("the form has validation errors")]
    Invalid,
    #[error("the last upload failed; retry before submitting")]
    UploadFailed,
    #[error("an upload is still in progress")]
    UploadInFlight,
    #[error("a submission is already in progress")]
    AlreadyInFlight,
}

/// Payload handed to the save path on a successful submit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineData {
    pub title: String,
    pub time_range: String,
    pub media: MediaReference,
}

type Predicate = fn(&RoutineForm) -> Option<&'static str>;

/// field -> predicate; predicates return the message for the first rule the
/// value breaks. The cross-field time rule runs after all of these.
const RULES: &[(FormField, Predicate)] = &[
    (FormField::Title, rules::title),
    (FormField::Date, rules::date),
    (FormField::StartTime, rules::start_time),
    (FormField::EndTime, rules::end_time),
    (FormField::MediaUrl, rules::media_url),
];

mod rules {
    use super::*;

    pub(super) fn title(form: &RoutineForm) -> Option<&'static str> {
        form.title.trim().is_empty().then_some(MSG_TITLE_REQUIRED)
    }

    pub(super) fn date(form: &RoutineForm) -> Option<&'static str> {
        if form.date.is_empty() {
            Some(MSG_DATE_REQUIRED)
        } else if !is_valid_date(&form.date) {
            Some(MSG_DATE_INVALID)
        } else {
            None
        }
    }

    pub(super) fn start_time(form: &RoutineForm) -> Option<&'static str> {
        if form.start_time.is_empty() {
            Some(MSG_START_REQUIRED)
        } else if !is_valid_time(&form.start_time) {
            Some(MSG_START_INVALID)
        } else {
            None
        }
    }

    pub(super) fn end_time(form: &RoutineForm) -> Option<&'static str> {
        if form.end_time.is_empty() {
            Some(MSG_END_REQUIRED)
        } else if !is_valid_time(&form.end_time) {
            Some(MSG_END_INVALID)
        } else {
            None
        }
    }

    pub(super) fn media_url(form: &RoutineForm) -> Option<&'static str> {
        if form.media_url.is_empty() {
            Some(MSG_MEDIA_REQUIRED)
        } else if !is_valid_url(&form.media_url) {
            Some(MSG_MEDIA_INVALID)
        } else {
            None
        }
    }
}

/// In-progress state for creating one routine. Built fresh each time the
/// dialog opens; dropped on cancel or successful submit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineForm {
    title: String,
    date: String,
    start_time: String,
    end_time: String,
    media_kind: MediaKind,
    media_url: String,

    /// Fields with continuous validation armed. The first interaction with a
    /// field arms it; from then on it revalidates on every change.
    touched: BTreeSet<FormField>,
    /// Schema-level errors. Absent key means the field is currently valid.
    errors: BTreeMap<FormField, String>,
    /// Failure reported by the upload collaborator. Deliberately a separate
    /// channel from `errors` so the two never overwrite each other.
    upload_error: Option<String>,
    /// The one upload whose result we still care about. A resolution carrying
    /// any other id is stale and must be dropped.
    active_upload: Option<UploadId>,
    submitting: bool,
}

impl RoutineForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a field value and revalidates. Never fails: bad input becomes
    /// an entry in the error map.
    pub fn set_field(&mut self, field: FormField, value: String) {
        match field {
            FormField::Title => self.title = value,
            FormField::Date => self.date = value,
            FormField::StartTime => self.start_time = value,
            FormField::EndTime => self.end_time = value,
            FormField::MediaUrl => {
                let media = (!value.is_empty()).then_some(value);
                self.set_media(media);
                return;
            }
        }
        self.touched.insert(field);
        self.revalidate();
    }

    /// Records (or clears) the uploaded media reference. An empty reference
    /// raises the "upload required" error; a present one revalidates and, when
    /// valid, clears both the schema error and the collaborator error.
    pub fn set_media(&mut self, url: Option<String>) {
        self.touched.insert(FormField::MediaUrl);
        match url {
            Some(url) => {
                self.media_url = url;
                self.revalidate();
                if !self.errors.contains_key(&FormField::MediaUrl) {
                    self.upload_error = None;
                }
            }
            None => {
                self.media_url.clear();
                self.revalidate();
            }
        }
    }

    /// Switching the kind invalidates whatever was uploaded for the other
    /// kind: the URL, both media error channels, and any in-flight upload are
    /// all dropped and the media field goes back to pristine.
    pub fn set_media_kind(&mut self, kind: MediaKind) {
        self.media_kind = kind;
        self.media_url.clear();
        self.touched.remove(&FormField::MediaUrl);
        self.errors.remove(&FormField::MediaUrl);
        self.upload_error = None;
        self.active_upload = None;
    }

    /// Marks an upload as the one in flight. Picking a new file is an
    /// interaction with the media field, so stale errors are cleared.
    pub fn begin_upload(&mut self, id: UploadId) {
        self.touched.insert(FormField::MediaUrl);
        self.errors.remove(&FormField::MediaUrl);
        self.upload_error = None;
        self.active_upload = Some(id);
    }

    pub fn active_upload(&self) -> Option<UploadId> {
        self.active_upload
    }

    pub fn clear_active_upload(&mut self) {
        self.active_upload = None;
    }

    pub fn uploading(&self) -> bool {
        self.active_upload.is_some()
    }

    /// Failure from the upload collaborator. Sets the external channel only;
    /// schema-level field errors are left alone.
    pub fn report_upload_failure(&mut self, message: impl Into<String>) {
        self.upload_error = Some(message.into());
    }

    pub fn upload_error(&self) -> Option<&str> {
        self.upload_error.as_deref()
    }

    /// Validates everything and either yields the payload or names the
    /// blocking precondition. On success `submitting` is set before the
    /// payload leaves; the caller saves it and discards the form.
    pub fn submit(&mut self) -> Result<RoutineData, SubmitError> {
        self.touched.extend(RULES.iter().map(|(field, _)| *field));
        self.revalidate();

        if !self.errors.is_empty() {
            return Err(SubmitError::Invalid);
        }
        if self.upload_error.is_some() {
            return Err(SubmitError::UploadFailed);
        }
        if self.active_upload.is_some() {
            return Err(SubmitError::UploadInFlight);
        }
        if self.submitting {
            return Err(SubmitError::AlreadyInFlight);
        }

        self.submitting = true;
        Ok(RoutineData {
            title: self.title.clone(),
            time_range: format!("{} - {}", self.start_time, self.end_time),
            media: MediaReference {
                kind: self.media_kind,
                url: self.media_url.clone(),
            },
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether a submit would go through right now, without recording any
    /// errors. Drives the submit control's enabled state.
    pub fn is_submittable(&self) -> bool {
        RULES.iter().all(|(_, rule)| rule(self).is_none())
            && self.cross_field_violation().is_none()
            && self.upload_error.is_none()
            && self.active_upload.is_none()
            && !self.submitting
    }

    pub fn error(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// What the media field should display: the schema error wins, otherwise
    /// the collaborator error shows in its place.
    pub fn media_error(&self) -> Option<&str> {
        self.error(FormField::MediaUrl)
            .or_else(|| self.upload_error())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn start_time(&self) -> &str {
        &self.start_time
    }

    pub fn end_time(&self) -> &str {
        &self.end_time
    }

    pub fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    pub fn media_url(&self) -> &str {
        &self.media_url
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Re-runs every armed per-field rule, then the cross-field time rule.
    fn revalidate(&mut self) {
        for (field, rule) in RULES {
            if !self.touched.contains(field) {
                continue;
            }
            match rule(self) {
                Some(message) => {
                    self.errors.insert(*field, message.to_string());
                }
                None => {
                    self.errors.remove(field);
                }
            }
        }

        // Only attach the ordering error when the end time has no error of its
        // own; the violation belongs to the end field, never the start field.
        if !self.errors.contains_key(&FormField::EndTime) {
            if let Some(message) = self.cross_field_violation() {
                self.errors.insert(FormField::EndTime, message.to_string());
            }
        }
    }

    /// Both times present and well-formed, but not strictly increasing.
    /// Lexicographic comparison is correct for equal-length zero-padded
    /// "HH:MM" strings.
    fn cross_field_violation(&self) -> Option<&'static str> {
        (is_valid_time(&self.start_time)
            && is_valid_time(&self.end_time)
            && self.start_time >= self.end_time)
            .then_some(MSG_END_BEFORE_START)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filled_form() -> RoutineForm {
        let mut form = RoutineForm::new();
        form.set_field(FormField::Title, "Workout".to_string());
        form.set_field(FormField::Date, "2024-05-01".to_string());
        form.set_field(FormField::StartTime, "07:00".to_string());
        form.set_field(FormField::EndTime, "08:00".to_string());
        form.set_media(Some("https://x/y.jpg".to_string()));
        form
    }

    #[test]
    fn valid_form_submits_with_composed_time_range() {
        let mut form = filled_form();
        assert!(form.is_submittable());

        let data = form.submit().expect("submit should succeed");
        assert_eq!(data.title, "Workout");
        assert_eq!(data.time_range, "07:00 - 08:00");
        assert_eq!(data.media.kind, MediaKind::Image);
        assert_eq!(data.media.url, "https://x/y.jpg");
        assert!(form.is_submitting());
    }

    #[test]
    fn end_before_start_blocks_with_error_on_end_only() {
        let mut form = filled_form();
        form.set_field(FormField::StartTime, "09:00".to_string());
        form.set_field(FormField::EndTime, "08:00".to_string());

        assert_eq!(form.submit(), Err(SubmitError::Invalid));
        assert_eq!(form.error(FormField::EndTime), Some(MSG_END_BEFORE_START));
        assert_eq!(form.error(FormField::StartTime), None);
    }

    #[test]
    fn equal_times_are_rejected() {
        let mut form = filled_form();
        form.set_field(FormField::StartTime, "08:00".to_string());
        form.set_field(FormField::EndTime, "08:00".to_string());
        assert_eq!(form.error(FormField::EndTime), Some(MSG_END_BEFORE_START));
    }

    #[test]
    fn fixing_the_end_time_clears_the_ordering_error() {
        let mut form = filled_form();
        form.set_field(FormField::EndTime, "06:00".to_string());
        assert_eq!(form.error(FormField::EndTime), Some(MSG_END_BEFORE_START));

        form.set_field(FormField::EndTime, "10:00".to_string());
        assert_eq!(form.error(FormField::EndTime), None);
        assert!(form.is_submittable());
    }

    #[test]
    fn missing_media_blocks_with_upload_required() {
        let mut form = filled_form();
        form.set_media(None);

        assert_eq!(form.submit(), Err(SubmitError::Invalid));
        assert_eq!(form.error(FormField::MediaUrl), Some(MSG_MEDIA_REQUIRED));
    }

    #[test]
    fn malformed_media_url_is_distinct_from_missing() {
        let mut form = filled_form();
        form.set_media(Some("not a url".to_string()));
        assert_eq!(form.error(FormField::MediaUrl), Some(MSG_MEDIA_INVALID));
    }

    #[test]
    fn upload_failure_blocks_submit_without_touching_fields() {
        let mut form = filled_form();
        form.report_upload_failure("Upload failed.");

        assert_eq!(form.submit(), Err(SubmitError::UploadFailed));
        assert_eq!(form.upload_error(), Some("Upload failed."));
        // schema errors untouched: every field is still individually valid
        assert_eq!(form.error(FormField::Title), None);
        assert_eq!(form.error(FormField::MediaUrl), None);

        // a successful retry clears the channel and re-enables submit
        form.set_media(Some("https://x/retry.jpg".to_string()));
        assert_eq!(form.upload_error(), None);
        assert!(form.submit().is_ok());
    }

    #[test]
    fn upload_in_flight_blocks_submit() {
        let mut form = filled_form();
        form.begin_upload(UploadId::fresh());
        assert_eq!(form.submit(), Err(SubmitError::UploadInFlight));

        form.clear_active_upload();
        assert!(form.submit().is_ok());
    }

    #[test]
    fn untouched_fields_stay_silent_until_submit() {
        let mut form = RoutineForm::new();
        form.set_field(FormField::Title, "Workout".to_string());

        // only the title has been interacted with, nothing else may error yet
        assert_eq!(form.error(FormField::Date), None);
        assert_eq!(form.error(FormField::StartTime), None);

        assert_eq!(form.submit(), Err(SubmitError::Invalid));
        assert_eq!(form.error(FormField::Date), Some(MSG_DATE_REQUIRED));
        assert_eq!(form.error(FormField::StartTime), Some(MSG_START_REQUIRED));
        assert_eq!(form.error(FormField::EndTime), Some(MSG_END_REQUIRED));
        assert_eq!(form.error(FormField::MediaUrl), Some(MSG_MEDIA_REQUIRED));
    }

    #[test]
    fn touched_field_revalidates_on_every_change() {
        let mut form = RoutineForm::new();
        form.set_field(FormField::StartTime, "7am".to_string());
        assert_eq!(form.error(FormField::StartTime), Some(MSG_START_INVALID));

        form.set_field(FormField::StartTime, "07:00".to_string());
        assert_eq!(form.error(FormField::StartTime), None);

        form.set_field(FormField::StartTime, String::new());
        assert_eq!(form.error(FormField::StartTime), Some(MSG_START_REQUIRED));
    }

    #[test]
    fn blank_title_is_required_after_trimming() {
        let mut form = RoutineForm::new();
        form.set_field(FormField::Title, "   ".to_string());
        assert_eq!(form.error(FormField::Title), Some(MSG_TITLE_REQUIRED));
    }

    #[test]
    fn garbage_date_is_rejected() {
        let mut form = RoutineForm::new();
        form.set_field(FormField::Date, "yesterday".to_string());
        assert_eq!(form.error(FormField::Date), Some(MSG_DATE_INVALID));

        form.set_field(FormField::Date, "2024-02-30".to_string());
        assert_eq!(form.error(FormField::Date), Some(MSG_DATE_INVALID));

        form.set_field(FormField::Date, "2024-02-29".to_string());
        assert_eq!(form.error(FormField::Date), None);
    }

    #[test]
    fn switching_kind_clears_media_state() {
        let mut form = filled_form();
        form.report_upload_failure("Upload failed.");

        form.set_media_kind(MediaKind::Video);
        assert_eq!(form.media_kind(), MediaKind::Video);
        assert_eq!(form.media_url(), "");
        assert_eq!(form.error(FormField::MediaUrl), None);
        assert_eq!(form.upload_error(), None);
    }

    #[test]
    fn switching_kind_abandons_the_inflight_upload() {
        let mut form = filled_form();
        form.begin_upload(UploadId::fresh());
        form.set_media_kind(MediaKind::Video);
        assert!(!form.uploading());
    }

    #[test]
    fn reset_returns_to_pristine() {
        let mut form = filled_form();
        form.report_upload_failure("Upload failed.");
        form.reset();
        assert_eq!(form, RoutineForm::new());
    }

    #[test]
    fn media_error_prefers_schema_over_collaborator() {
        let mut form = RoutineForm::new();
        form.report_upload_failure("Upload failed.");
        assert_eq!(form.media_error(), Some("Upload failed."));

        form.set_media(None);
        assert_eq!(form.media_error(), Some(MSG_MEDIA_REQUIRED));
    }

    #[test]
    fn time_pattern_edges() {
        assert!(is_valid_time("00:00"));
        assert!(is_valid_time("23:59"));
        assert!(is_valid_time("19:05"));
        assert!(!is_valid_time("24:00"));
        assert!(!is_valid_time("12:60"));
        assert!(!is_valid_time("7:00"));
        assert!(!is_valid_time("0700"));
        assert!(!is_valid_time("07:0"));
        assert!(!is_valid_time("07:000"));
        assert!(!is_valid_time(""));
        assert!(!is_valid_time("ab:cd"));
        assert!(!is_valid_time("07-00"));
    }

    proptest! {
        #[test]
        fn every_real_time_is_accepted(hour in 0u8..24, minute in 0u8..60) {
            let time = format!("{hour:02}:{minute:02}");
            prop_assert!(is_valid_time(&time));
        }

        #[test]
        fn out_of_range_components_are_rejected(hour in 24u8..100, minute in 60u8..100) {
            let bad_hour = format!("{hour:02}:00");
            let bad_minute = format!("00:{minute:02}");
            prop_assert!(!is_valid_time(&bad_hour));
            prop_assert!(!is_valid_time(&bad_minute));
        }

        #[test]
        fn wrong_shape_is_rejected(s in "[0-9:]{0,4}|[0-9:]{6,8}") {
            prop_assert!(!is_valid_time(&s));
        }

        #[test]
        fn ordering_rule_matches_lexicographic_compare(
            start_h in 0u8..24, start_m in 0u8..60,
            end_h in 0u8..24, end_m in 0u8..60,
        ) {
            let start = format!("{start_h:02}:{start_m:02}");
            let end = format!("{end_h:02}:{end_m:02}");

            let mut form = filled_form();
            form.set_field(FormField::StartTime, start.clone());
            form.set_field(FormField::EndTime, end.clone());

            if start < end {
                prop_assert!(form.submit().is_ok());
            } else {
                prop_assert_eq!(form.submit(), Err(SubmitError::Invalid));
                prop_assert_eq!(form.error(FormField::EndTime), Some(MSG_END_BEFORE_START));
                prop_assert_eq!(form.error(FormField::StartTime), None);
            }
        }

        #[test]
        fn kind_switch_always_clears_media(url in "[a-z ]{0,24}", flip in any::<bool>()) {
            let mut form = RoutineForm::new();
            if !url.is_empty() {
                form.set_media(Some(format!("https://cdn.example/{url}")));
            }
            if flip {
                form.report_upload_failure("Upload failed.");
            }

            form.set_media_kind(MediaKind::Video);
            prop_assert_eq!(form.media_url(), "");
            prop_assert_eq!(form.media_error(), None);
        }
    }
}
