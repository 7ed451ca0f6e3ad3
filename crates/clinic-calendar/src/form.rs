//! Create/edit form model and payload assembly.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use clinic_api::{
    AppointmentStatus, AppointmentType, CreateAppointmentRequest, FieldErrors,
    PatchAppointmentRequest, PatientRef,
};
use clinic_core::CalendarConfig;

use crate::event::CalendarEvent;
use crate::widget::DateSlot;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Seeds for a blank form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormDefaults {
    pub duration: Duration,
    /// Start used when the slot carries no time of day.
    pub start_time: NaiveTime,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self::from_config(&CalendarConfig::default())
    }
}

impl FormDefaults {
    pub fn from_config(config: &CalendarConfig) -> Self {
        Self {
            duration: Duration::minutes(i64::from(config.default_duration_minutes)),
            start_time: config.start_time(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentForm {
    pub patient: Option<PatientRef>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Days between `date` and the end; non-zero past midnight.
    pub end_day_offset: u32,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub notes: String,
}

impl AppointmentForm {
    /// Blank form for a clicked slot.
    pub fn from_slot(slot: &DateSlot, defaults: &FormDefaults) -> Self {
        let start = if slot.all_day {
            slot.start.date_naive().and_time(defaults.start_time).and_utc()
        } else {
            slot.start
        };
        let end = match slot.end {
            Some(end) if !slot.all_day && end > start => end,
            _ => start + defaults.duration,
        };

        Self {
            patient: None,
            date: start.date_naive(),
            start_time: start.time(),
            end_time: end.time(),
            end_day_offset: day_offset(start, end),
            appointment_type: AppointmentType::default(),
            status: AppointmentStatus::default(),
            notes: String::new(),
        }
    }

    /// Form carrying every field of an existing event.
    pub fn from_event(event: &CalendarEvent) -> Self {
        let props = &event.extended_props;
        Self {
            patient: Some(props.patient.clone()),
            date: event.start.date_naive(),
            start_time: event.start.time(),
            end_time: event.end.time(),
            end_day_offset: day_offset(event.start, event.end),
            appointment_type: props.appointment_type.clone(),
            status: props.status.clone(),
            notes: props.notes.clone(),
        }
    }

    pub fn date_str(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn start_str(&self) -> String {
        self.start_time.format(TIME_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end_time.format(TIME_FORMAT).to_string()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.date.and_time(self.start_time).and_utc()
    }

    pub fn end(&self) -> DateTime<Utc> {
        let end_date = self.date + Duration::days(i64::from(self.end_day_offset));
        end_date.and_time(self.end_time).and_utc()
    }

    /// Checks that need no server round-trip. Keys match the API's field names.
    pub fn validate(&self, require_patient: bool) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if require_patient && self.patient.is_none() {
            errors
                .entry("patient_name_id".to_string())
                .or_default()
                .push("Please select a patient.".to_string());
        }
        if self.end() <= self.start() {
            errors
                .entry("end_time".to_string())
                .or_default()
                .push("End time must be after start time.".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn to_create_request(&self) -> Result<CreateAppointmentRequest, FieldErrors> {
        self.validate(true)?;
        let patient_name_id = self.patient.as_ref().map_or(0, |p| p.id);
        Ok(CreateAppointmentRequest {
            patient_name_id,
            start_time: self.start(),
            end_time: self.end(),
            appointment_type: self.appointment_type.clone(),
            status: self.status.clone(),
            notes: self.notes.clone(),
        })
    }

    /// Update payload. The patient is fixed once an appointment exists.
    pub fn to_patch(&self) -> Result<PatchAppointmentRequest, FieldErrors> {
        self.validate(false)?;
        Ok(PatchAppointmentRequest {
            start_time: Some(self.start()),
            end_time: Some(self.end()),
            status: Some(self.status.clone()),
            notes: Some(self.notes.clone()),
            appointment_type: Some(self.appointment_type.clone()),
        })
    }
}

fn day_offset(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let days = (end.date_naive() - start.date_naive()).num_days();
    u32::try_from(days).unwrap_or(0)
}
