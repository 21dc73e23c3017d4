use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::client::ApplicationPayload;
use crate::error::ValidationError;
use crate::models::{ApplicationDraft, Field, ResumeFile};
use crate::notify::Notifier;
use crate::validate;

/// Holds the in-progress application for one job. Every mutator is refused
/// while a submission is in flight, the same as disabled inputs.
#[derive(Debug)]
pub struct ApplicationForm {
    draft: ApplicationDraft,
    job_id: Option<String>,
    file_input: String,
    submitting: Arc<AtomicBool>,
}

impl ApplicationForm {
    pub fn new(job_id: Option<String>) -> Self {
        Self {
            draft: ApplicationDraft::default(),
            job_id: job_id.filter(|id| !id.is_empty()),
            file_input: String::new(),
            submitting: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn draft(&self) -> &ApplicationDraft {
        &self.draft
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Text shown in the file selection control.
    pub fn file_input(&self) -> &str {
        &self.file_input
    }

    pub fn file_input_mut(&mut self) -> Option<&mut String> {
        if self.is_submitting() {
            return None;
        }
        Some(&mut self.file_input)
    }

    pub fn field_mut(&mut self, field: Field) -> Option<&mut String> {
        if self.is_submitting() {
            return None;
        }
        Some(self.draft.get_mut(field))
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) -> bool {
        match self.field_mut(field) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Runs a file selection through the validator. A rejected file leaves
    /// the current resume in place.
    pub fn select_resume(&mut self, file: Option<ResumeFile>, notifier: &mut dyn Notifier) -> bool {
        if self.is_submitting() {
            return false;
        }

        match validate::check_resume(file) {
            Ok(accepted) => {
                self.file_input = accepted
                    .as_ref()
                    .map(|f| f.path.display().to_string())
                    .unwrap_or_default();
                self.draft.resume = accepted;
                true
            }
            Err(err) => {
                warn!(error = ?err, "resume rejected");
                notifier.error(&err.to_string());
                false
            }
        }
    }

    /// Selects a resume by path. An empty path clears the selection.
    pub fn select_resume_path(
        &mut self,
        path: &str,
        content_type: Option<&str>,
        notifier: &mut dyn Notifier,
    ) -> bool {
        if self.is_submitting() {
            return false;
        }

        let path = path.trim();
        if path.is_empty() {
            return self.select_resume(None, notifier);
        }

        match ResumeFile::from_path(Path::new(path), content_type) {
            Ok(file) => self.select_resume(Some(file), notifier),
            Err(e) => {
                let err = ValidationError::Unreadable {
                    path: path.to_string(),
                    reason: e.to_string(),
                };
                warn!(error = %err, "resume unreadable");
                notifier.error(&err.to_string());
                false
            }
        }
    }

    /// Checks everything a submission needs and builds the payload from the
    /// trimmed fields. Nothing is changed on failure.
    pub fn prepare(&self) -> Result<ApplicationPayload, ValidationError> {
        validate::check_fields(&self.draft)?;

        let resume = self
            .draft
            .resume
            .clone()
            .ok_or(ValidationError::MissingResume)?;
        let job_id = self.job_id.clone().ok_or(ValidationError::MissingJobId)?;

        Ok(ApplicationPayload {
            name: self.draft.name.trim().to_string(),
            email: self.draft.email.trim().to_string(),
            phone: self.draft.phone.trim().to_string(),
            address: self.draft.address.trim().to_string(),
            cover_letter: self.draft.cover_letter.trim().to_string(),
            resume,
            job_id,
        })
    }

    /// Marks the form as submitting. Returns `None` if it already is.
    pub fn begin_submit(&self) -> Option<SubmitGuard> {
        SubmitGuard::acquire(&self.submitting)
    }

    /// Back to the empty form, file control included.
    pub fn reset(&mut self) {
        debug!("resetting application draft");
        self.draft = ApplicationDraft::default();
        self.file_input.clear();
    }
}

/// Holds the submitting flag. Dropping it re-enables the form, whichever way
/// the attempt ended.
#[derive(Debug)]
pub struct SubmitGuard {
    flag: Arc<AtomicBool>,
}

impl SubmitGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
