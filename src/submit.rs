use tracing::{debug, error, info, warn};

use crate::client::{self, ApplicationPayload, Transport};
use crate::error::{SubmitError, TransportError};
use crate::form::{ApplicationForm, SubmitGuard};
use crate::models::Route;
use crate::notify::{Navigator, Notifier};

/// An application the server accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub status: u16,
    pub message: String,
}

pub type SubmitResult = Result<Submitted, SubmitError>;

/// Sends the payload and classifies what came back. Makes no change to the
/// form; see [`settle`].
pub async fn deliver<T: Transport>(transport: &T, payload: &ApplicationPayload) -> SubmitResult {
    debug!(
        name = %payload.name,
        email = %payload.email,
        phone = %payload.phone,
        address = %payload.address,
        cover_letter = %payload.cover_letter_preview(),
        resume_name = %payload.resume.file_name,
        resume_size = payload.resume.size,
        resume_type = %payload.resume.content_type,
        job_id = %payload.job_id,
        "submitting application"
    );

    let reply = match transport.post_application(payload).await {
        Ok(reply) => reply,
        Err(err) => {
            match &err {
                TransportError::NoResponse(source) => {
                    warn!(error = %source, "no response received")
                }
                TransportError::Construction(source) => {
                    error!(error = %source, "request setup failed")
                }
            }
            return Err(err.into());
        }
    };

    if reply.is_success() {
        let message = client::success_message(&reply.body);
        info!(status = reply.status, job_id = %payload.job_id, "application accepted");
        return Ok(Submitted {
            status: reply.status,
            message,
        });
    }

    error!(
        status = reply.status,
        status_text = reply.reason.as_deref().unwrap_or(""),
        data = %reply.body,
        headers = ?reply.headers,
        "application rejected"
    );
    Err(SubmitError::Rejected {
        status: reply.status,
        message: client::rejection_message(reply.status, &reply.body),
    })
}

/// Applies an outcome to the form: on success the form is emptied, the
/// server's message shown and the user sent to the job listing; on failure
/// the form is left as it was and the error shown.
pub fn settle(
    form: &mut ApplicationForm,
    result: &SubmitResult,
    notifier: &mut dyn Notifier,
    navigator: &mut dyn Navigator,
) {
    match result {
        Ok(submitted) => {
            form.reset();
            notifier.success(&submitted.message);
            navigator.navigate(Route::JobListing);
        }
        Err(err) => {
            if let Some(message) = err.user_message() {
                notifier.error(&message);
            }
        }
    }
}

pub struct Coordinator<T> {
    transport: T,
}

impl<T: Transport> Coordinator<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    #[allow(dead_code)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// One full attempt: preconditions, send, settle. The form is marked as
    /// submitting only while the request is out.
    pub async fn submit(
        &self,
        form: &mut ApplicationForm,
        notifier: &mut dyn Notifier,
        navigator: &mut dyn Navigator,
    ) -> SubmitResult {
        let (payload, _guard) = begin(form, notifier)?;

        let result = deliver(&self.transport, &payload).await;
        settle(form, &result, notifier, navigator);
        result
    }
}

/// Checks preconditions and, if they hold, marks the form as submitting.
/// Validation failures are shown; a busy form is ignored silently.
pub fn begin(
    form: &ApplicationForm,
    notifier: &mut dyn Notifier,
) -> Result<(ApplicationPayload, SubmitGuard), SubmitError> {
    if form.is_submitting() {
        return Err(SubmitError::InFlight);
    }

    let payload = match form.prepare() {
        Ok(payload) => payload,
        Err(err) => {
            debug!(error = ?err, "application incomplete");
            notifier.error(&err.to_string());
            return Err(err.into());
        }
    };

    let guard = form.begin_submit().ok_or(SubmitError::InFlight)?;
    Ok((payload, guard))
}
