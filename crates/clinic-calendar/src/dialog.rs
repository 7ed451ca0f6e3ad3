//! Create/edit/delete dialog state machine.
//!
//! ```text
//! Closed --date click--> Creating --submit--> Submitting --ok--> Closed
//! Closed --event click--> Editing --submit--> Submitting --err--> Creating/Editing
//! Editing --delete--> ConfirmingDelete --confirm--> Submitting
//! ConfirmingDelete --cancel--> Editing
//! ```
//!
//! Every successful submission invalidates the calendar cache. A failed one
//! returns to the form it came from with the user's input intact.

use std::sync::Arc;

use clinic_api::{
    ApiError, AppointmentApi, Client, CreateAppointmentRequest, FieldErrors,
    PatchAppointmentRequest, PatientRef,
};
use parking_lot::Mutex;
use tracing::instrument;

use crate::error::DialogError;
use crate::event::CalendarEvent;
use crate::form::{AppointmentForm, FormDefaults};
use crate::notify::Notifier;
use crate::query::QueryCache;
use crate::widget::DateSlot;

/// Error shown inside the dialog after a failed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitError {
    pub message: String,
    /// Per-field messages keyed by API field name. Empty when the server
    /// gave no structured body.
    pub fields: FieldErrors,
}

impl SubmitError {
    fn local(fields: FieldErrors) -> Self {
        Self {
            message: "Please correct the highlighted fields.".to_string(),
            fields,
        }
    }

    fn from_api(error: &ApiError) -> Self {
        let message = match error {
            ApiError::Validation { message, .. } if !message.is_empty() => message.clone(),
            _ => error.user_message().to_string(),
        };
        Self {
            message,
            fields: error.field_errors().cloned().unwrap_or_default(),
        }
    }
}

/// The submission a `Submitting` dialog is waiting on, with enough context to
/// return to the form if it fails.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingSubmit {
    Create {
        slot: DateSlot,
        form: AppointmentForm,
    },
    Update {
        event: CalendarEvent,
        form: AppointmentForm,
    },
    Delete {
        event: CalendarEvent,
        form: AppointmentForm,
    },
}

impl PendingSubmit {
    fn restore(self, error: SubmitError) -> DialogState {
        match self {
            PendingSubmit::Create { slot, form } => DialogState::Creating {
                slot,
                form,
                error: Some(error),
            },
            PendingSubmit::Update { event, form } | PendingSubmit::Delete { event, form } => {
                DialogState::Editing {
                    event,
                    form,
                    error: Some(error),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    Creating {
        slot: DateSlot,
        form: AppointmentForm,
        error: Option<SubmitError>,
    },
    Editing {
        event: CalendarEvent,
        form: AppointmentForm,
        error: Option<SubmitError>,
    },
    ConfirmingDelete {
        event: CalendarEvent,
        form: AppointmentForm,
    },
    Submitting(PendingSubmit),
}

impl DialogState {
    pub fn name(&self) -> &'static str {
        match self {
            DialogState::Closed => "closed",
            DialogState::Creating { .. } => "creating",
            DialogState::Editing { .. } => "editing",
            DialogState::ConfirmingDelete { .. } => "confirming delete",
            DialogState::Submitting(_) => "submitting",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, DialogState::Closed)
    }

    pub fn form(&self) -> Option<&AppointmentForm> {
        match self {
            DialogState::Closed => None,
            DialogState::Creating { form, .. }
            | DialogState::Editing { form, .. }
            | DialogState::ConfirmingDelete { form, .. } => Some(form),
            DialogState::Submitting(
                PendingSubmit::Create { form, .. }
                | PendingSubmit::Update { form, .. }
                | PendingSubmit::Delete { form, .. },
            ) => Some(form),
        }
    }

    pub fn error(&self) -> Option<&SubmitError> {
        match self {
            DialogState::Creating { error, .. } | DialogState::Editing { error, .. } => {
                error.as_ref()
            }
            _ => None,
        }
    }
}

enum Request {
    Create(CreateAppointmentRequest),
    Update(i64, PatchAppointmentRequest),
    Delete(i64),
}

impl Request {
    fn success_message(&self) -> &'static str {
        match self {
            Request::Create(_) => "Appointment created",
            Request::Update(..) => "Appointment updated",
            Request::Delete(_) => "Appointment deleted",
        }
    }
}

pub struct DialogOrchestrator {
    api: Arc<dyn AppointmentApi>,
    events: QueryCache<Vec<CalendarEvent>>,
    clients: QueryCache<Vec<Client>>,
    notifier: Arc<dyn Notifier>,
    defaults: FormDefaults,
    state: Mutex<DialogState>,
}

impl DialogOrchestrator {
    pub fn new(
        api: Arc<dyn AppointmentApi>,
        events: QueryCache<Vec<CalendarEvent>>,
        clients: QueryCache<Vec<Client>>,
        notifier: Arc<dyn Notifier>,
        defaults: FormDefaults,
    ) -> Self {
        Self {
            api,
            events,
            clients,
            notifier,
            defaults,
            state: Mutex::new(DialogState::Closed),
        }
    }

    pub fn state(&self) -> DialogState {
        self.state.lock().clone()
    }

    pub fn defaults(&self) -> &FormDefaults {
        &self.defaults
    }

    /// Closed -> Creating, seeded from the clicked slot.
    pub fn open_create(&self, slot: DateSlot) -> Result<(), DialogError> {
        let mut state = self.state.lock();
        expect_closed(&state, "open create dialog")?;
        let form = AppointmentForm::from_slot(&slot, &self.defaults);
        tracing::debug!(date = %form.date_str(), start = %form.start_str(), "Opening create dialog");
        *state = DialogState::Creating {
            slot,
            form,
            error: None,
        };
        Ok(())
    }

    /// Closed -> Editing, seeded from the event's props.
    pub fn open_edit(&self, event: CalendarEvent) -> Result<(), DialogError> {
        if event.appointment_id().is_none() {
            return Err(DialogError::UnknownEvent(event.id));
        }
        let mut state = self.state.lock();
        expect_closed(&state, "open edit dialog")?;
        let form = AppointmentForm::from_event(&event);
        *state = DialogState::Editing {
            event,
            form,
            error: None,
        };
        Ok(())
    }

    /// Apply a user edit to the open form.
    pub fn update_form<F>(&self, edit: F) -> Result<(), DialogError>
    where
        F: FnOnce(&mut AppointmentForm),
    {
        let mut state = self.state.lock();
        match &mut *state {
            DialogState::Creating { form, .. } | DialogState::Editing { form, .. } => {
                edit(form);
                Ok(())
            }
            DialogState::Submitting(_) => Err(DialogError::Busy),
            other => Err(invalid("edit form", other)),
        }
    }

    /// Resolve a client by id and make it the patient of the new appointment.
    pub async fn select_patient(&self, patient_id: i64) -> Result<PatientRef, DialogError> {
        if self.clients.data().is_none() {
            self.clients.mount().await?;
        }
        let patient = self
            .clients
            .data()
            .unwrap_or_default()
            .iter()
            .find(|c| c.id == patient_id)
            .map(Client::as_patient)
            .ok_or(DialogError::UnknownPatient(patient_id))?;

        let mut state = self.state.lock();
        match &mut *state {
            DialogState::Creating { form, .. } => {
                form.patient = Some(patient.clone());
                Ok(patient)
            }
            DialogState::Submitting(_) => Err(DialogError::Busy),
            other => Err(invalid("select patient", other)),
        }
    }

    /// Editing -> ConfirmingDelete.
    pub fn request_delete(&self) -> Result<(), DialogError> {
        let mut state = self.state.lock();
        match std::mem::take(&mut *state) {
            DialogState::Editing { event, form, .. } => {
                *state = DialogState::ConfirmingDelete { event, form };
                Ok(())
            }
            other => Err(restore_invalid(&mut state, other, "request delete")),
        }
    }

    /// ConfirmingDelete -> Editing.
    pub fn cancel_delete(&self) -> Result<(), DialogError> {
        let mut state = self.state.lock();
        match std::mem::take(&mut *state) {
            DialogState::ConfirmingDelete { event, form } => {
                *state = DialogState::Editing {
                    event,
                    form,
                    error: None,
                };
                Ok(())
            }
            other => Err(restore_invalid(&mut state, other, "cancel delete")),
        }
    }

    /// Any open, idle dialog -> Closed. Input is discarded.
    pub fn close(&self) -> Result<(), DialogError> {
        let mut state = self.state.lock();
        if matches!(*state, DialogState::Submitting(_)) {
            return Err(DialogError::Busy);
        }
        *state = DialogState::Closed;
        Ok(())
    }

    /// Creating/Editing -> Submitting -> Closed, or back with an error.
    pub async fn submit(&self) -> Result<(), DialogError> {
        let (pending, request) = {
            let mut state = self.state.lock();
            let next = match &mut *state {
                DialogState::Creating { slot, form, error } => match form.to_create_request() {
                    Ok(request) => (
                        PendingSubmit::Create {
                            slot: *slot,
                            form: form.clone(),
                        },
                        Request::Create(request),
                    ),
                    Err(fields) => {
                        *error = Some(SubmitError::local(fields.clone()));
                        return Err(DialogError::Form(fields));
                    }
                },
                DialogState::Editing { event, form, error } => {
                    let id = event
                        .appointment_id()
                        .ok_or_else(|| DialogError::UnknownEvent(event.id.clone()))?;
                    match form.to_patch() {
                        Ok(patch) => (
                            PendingSubmit::Update {
                                event: event.clone(),
                                form: form.clone(),
                            },
                            Request::Update(id, patch),
                        ),
                        Err(fields) => {
                            *error = Some(SubmitError::local(fields.clone()));
                            return Err(DialogError::Form(fields));
                        }
                    }
                }
                DialogState::Submitting(_) => return Err(DialogError::Busy),
                other => return Err(invalid("submit", other)),
            };
            *state = DialogState::Submitting(next.0.clone());
            next
        };

        self.execute(pending, request).await
    }

    /// ConfirmingDelete -> Submitting -> Closed, or back to Editing.
    pub async fn confirm_delete(&self) -> Result<(), DialogError> {
        let (pending, request) = {
            let mut state = self.state.lock();
            let (event, form) = match &*state {
                DialogState::ConfirmingDelete { event, form } => (event.clone(), form.clone()),
                DialogState::Submitting(_) => return Err(DialogError::Busy),
                other => return Err(invalid("confirm delete", other)),
            };
            let id = event
                .appointment_id()
                .ok_or_else(|| DialogError::UnknownEvent(event.id.clone()))?;
            let pending = PendingSubmit::Delete { event, form };
            *state = DialogState::Submitting(pending.clone());
            (pending, Request::Delete(id))
        };

        self.execute(pending, request).await
    }

    #[instrument(skip_all, fields(action = request.success_message()))]
    async fn execute(&self, pending: PendingSubmit, request: Request) -> Result<(), DialogError> {
        let result = match &request {
            Request::Create(body) => self.api.create_appointment(body).await.map(|_| ()),
            Request::Update(id, patch) => self.api.patch_appointment(*id, patch).await.map(|_| ()),
            Request::Delete(id) => self.api.delete_appointment(*id).await,
        };

        match result {
            Ok(()) => {
                *self.state.lock() = DialogState::Closed;
                self.notifier.success(request.success_message());
                if let Err(e) = self.events.invalidate().await {
                    tracing::warn!("Resync after dialog submit failed: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Dialog submit failed: {}", e);
                let error = SubmitError::from_api(&e);
                self.notifier.error(&error.message);
                *self.state.lock() = pending.restore(error);
                Err(DialogError::Api(e))
            }
        }
    }
}

fn invalid(action: &'static str, state: &DialogState) -> DialogError {
    DialogError::InvalidTransition {
        action,
        state: state.name(),
    }
}

fn expect_closed(state: &DialogState, action: &'static str) -> Result<(), DialogError> {
    match state {
        DialogState::Closed => Ok(()),
        DialogState::Submitting(_) => Err(DialogError::Busy),
        other => Err(invalid(action, other)),
    }
}

/// Put back a state taken for a transition that does not apply to it.
fn restore_invalid(
    slot: &mut DialogState,
    taken: DialogState,
    action: &'static str,
) -> DialogError {
    let err = match &taken {
        DialogState::Submitting(_) => DialogError::Busy,
        other => invalid(action, other),
    };
    *slot = taken;
    err
}
