//! In-memory collaborators for unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Months, NaiveDate, TimeZone, Utc};
use clinic_api::{
    ApiError, Appointment, AppointmentApi, AppointmentStatus, AppointmentType, Client,
    CreateAppointmentRequest, PatchAppointmentRequest, PatientRef,
};
use parking_lot::Mutex;

use crate::event::TimeRange;
use crate::notify::{Notification, NotificationLevel, Notifier};
use crate::widget::{CalendarWidget, ViewMode};

/// Appointment on 2025-10-02 between the given hours, for patient "A".
pub fn appointment(id: i64, start_hour: u32, end_hour: u32) -> Appointment {
    Appointment {
        id,
        patient: PatientRef {
            id: 1,
            name: "A".into(),
        },
        start_time: Utc.with_ymd_and_hms(2025, 10, 2, start_hour, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2025, 10, 2, end_hour, 0, 0).unwrap(),
        appointment_type: AppointmentType::Initial,
        status: AppointmentStatus::Next,
        notes: String::new(),
        doctor_name: None,
    }
}

pub fn range(day: u32, start_hour: u32, end_hour: u32) -> TimeRange {
    TimeRange::new(
        Utc.with_ymd_and_hms(2025, 10, day, start_hour, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 10, day, end_hour, 0, 0).unwrap(),
    )
}

pub fn client(id: i64, name: &str) -> Client {
    Client {
        id,
        name: name.into(),
        email: None,
        phone: None,
    }
}

/// Backend double. Every call yields before answering so concurrent callers
/// interleave the way they would over a socket.
#[derive(Default)]
pub struct FakeApi {
    appointments: Mutex<Vec<Appointment>>,
    clients: Mutex<Vec<Client>>,
    failures: Mutex<VecDeque<(Option<String>, ApiError)>>,
    calls: Mutex<Vec<String>>,
    patches: Mutex<Vec<(i64, PatchAppointmentRequest)>>,
    creates: Mutex<Vec<CreateAppointmentRequest>>,
    next_id: AtomicI64,
    latency: AtomicU32,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            latency: AtomicU32::new(1),
            ..Default::default()
        }
    }

    pub fn with_appointments(appointments: Vec<Appointment>) -> Self {
        let api = Self::new();
        *api.appointments.lock() = appointments;
        api
    }

    pub fn with_clients(self, clients: Vec<Client>) -> Self {
        *self.clients.lock() = clients;
        self
    }

    /// Number of scheduler yields before each response.
    pub fn set_latency(&self, yields: u32) {
        self.latency.store(yields, Ordering::SeqCst);
    }

    /// Fail the next call, whatever it is, with `error`.
    pub fn fail_next(&self, error: ApiError) {
        self.failures.lock().push_back((None, error));
    }

    /// Fail the next call matching `call` (e.g. `"GET /appointments"`).
    pub fn fail_on(&self, call: &str, error: ApiError) {
        self.failures.lock().push_back((Some(call.to_string()), error));
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn patches(&self) -> Vec<(i64, PatchAppointmentRequest)> {
        self.patches.lock().clone()
    }

    pub fn creates(&self) -> Vec<CreateAppointmentRequest> {
        self.creates.lock().clone()
    }

    async fn begin(&self, call: String) -> Result<(), ApiError> {
        self.calls.lock().push(call.clone());
        for _ in 0..self.latency.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        let mut failures = self.failures.lock();
        let hit = failures
            .iter()
            .position(|(target, _)| target.as_deref().map_or(true, |t| t == call));
        match hit.and_then(|i| failures.remove(i)) {
            Some((_, e)) => Err(e),
            None => Ok(()),
        }
    }

    fn not_found(id: i64) -> ApiError {
        ApiError::Status {
            status: 404,
            message: format!("appointment {} not found", id),
        }
    }
}

#[async_trait]
impl AppointmentApi for FakeApi {
    async fn list_appointments(&self) -> Result<Vec<Appointment>, ApiError> {
        self.begin("GET /appointments".into()).await?;
        Ok(self.appointments.lock().clone())
    }

    async fn create_appointment(
        &self,
        request: &CreateAppointmentRequest,
    ) -> Result<Appointment, ApiError> {
        self.begin("POST /appointments".into()).await?;
        self.creates.lock().push(request.clone());

        let patient = self
            .clients
            .lock()
            .iter()
            .find(|c| c.id == request.patient_name_id)
            .map(Client::as_patient)
            .unwrap_or(PatientRef {
                id: request.patient_name_id,
                name: String::new(),
            });
        let created = Appointment {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            patient,
            start_time: request.start_time,
            end_time: request.end_time,
            appointment_type: request.appointment_type.clone(),
            status: request.status.clone(),
            notes: request.notes.clone(),
            doctor_name: None,
        };
        self.appointments.lock().push(created.clone());
        Ok(created)
    }

    async fn patch_appointment(
        &self,
        id: i64,
        request: &PatchAppointmentRequest,
    ) -> Result<Appointment, ApiError> {
        self.begin(format!("PATCH /appointments/{}", id)).await?;
        self.patches.lock().push((id, request.clone()));

        let mut appointments = self.appointments.lock();
        let appt = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        if let Some(start) = request.start_time {
            appt.start_time = start;
        }
        if let Some(end) = request.end_time {
            appt.end_time = end;
        }
        if let Some(status) = &request.status {
            appt.status = status.clone();
        }
        if let Some(notes) = &request.notes {
            appt.notes = notes.clone();
        }
        if let Some(kind) = &request.appointment_type {
            appt.appointment_type = kind.clone();
        }
        Ok(appt.clone())
    }

    async fn delete_appointment(&self, id: i64) -> Result<(), ApiError> {
        self.begin(format!("DELETE /appointments/{}", id)).await?;
        let mut appointments = self.appointments.lock();
        let before = appointments.len();
        appointments.retain(|a| a.id != id);
        if appointments.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn list_clients(&self) -> Result<Vec<Client>, ApiError> {
        self.begin("GET /clients".into()).await?;
        Ok(self.clients.lock().clone())
    }
}

/// Widget double that keeps its own date and rendered event positions.
pub struct FakeWidget {
    today: NaiveDate,
    date: Mutex<NaiveDate>,
    view: Mutex<ViewMode>,
    rendered: Mutex<HashMap<String, TimeRange>>,
    calls: Mutex<Vec<String>>,
}

impl FakeWidget {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            date: Mutex::new(today),
            view: Mutex::new(ViewMode::default()),
            rendered: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Put an event on screen, as the widget does when it renders or when
    /// the user finishes a drag.
    pub fn place(&self, event_id: &str, range: TimeRange) {
        self.rendered.lock().insert(event_id.to_string(), range);
    }

    pub fn rendered(&self, event_id: &str) -> Option<TimeRange> {
        self.rendered.lock().get(event_id).copied()
    }

    pub fn view(&self) -> ViewMode {
        *self.view.lock()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.starts_with(call))
            .count()
    }

    fn step(&self, forward: bool) {
        let mut date = self.date.lock();
        *date = match (*self.view.lock(), forward) {
            (ViewMode::Day, true) => *date + Duration::days(1),
            (ViewMode::Day, false) => *date - Duration::days(1),
            (ViewMode::Week | ViewMode::List, true) => *date + Duration::days(7),
            (ViewMode::Week | ViewMode::List, false) => *date - Duration::days(7),
            (ViewMode::Month, true) => date.checked_add_months(Months::new(1)).unwrap(),
            (ViewMode::Month, false) => date.checked_sub_months(Months::new(1)).unwrap(),
        };
    }
}

impl CalendarWidget for FakeWidget {
    fn prev(&self) {
        self.calls.lock().push("prev".into());
        self.step(false);
    }

    fn next(&self) {
        self.calls.lock().push("next".into());
        self.step(true);
    }

    fn today(&self) {
        self.calls.lock().push("today".into());
        *self.date.lock() = self.today;
    }

    fn change_view(&self, view: ViewMode) {
        self.calls.lock().push(format!("change_view {}", view.widget_id()));
        *self.view.lock() = view;
    }

    fn get_date(&self) -> NaiveDate {
        *self.date.lock()
    }

    fn set_event_range(&self, event_id: &str, range: TimeRange) {
        self.calls.lock().push(format!("set_event_range {}", event_id));
        self.place(event_id, range);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn successes(&self) -> usize {
        self.count(NotificationLevel::Success)
    }

    pub fn errors(&self) -> usize {
        self.count(NotificationLevel::Error)
    }

    fn count(&self, level: NotificationLevel) -> usize {
        self.seen.lock().iter().filter(|n| n.level == level).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}
