//! Projection of server appointments into calendar-widget events.

use chrono::{DateTime, Duration, Utc};
use clinic_api::types::iso_instant;
use clinic_api::{Appointment, AppointmentStatus, AppointmentType, PatchAppointmentRequest, PatientRef};
use serde::Serialize;

/// A start/end pair as displayed by the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    #[serde(with = "iso_instant")]
    pub start: DateTime<Utc>,
    #[serde(with = "iso_instant")]
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True when start is strictly before end.
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

/// Widget-facing event. Always derived from an [`Appointment`], never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    #[serde(with = "iso_instant")]
    pub start: DateTime<Utc>,
    #[serde(with = "iso_instant")]
    pub end: DateTime<Utc>,
    pub class_name: String,
    pub extended_props: ExtendedProps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedProps {
    pub patient: PatientRef,
    pub doctor_name: String,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub notes: String,
}

impl CalendarEvent {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    /// Numeric appointment id, if the event id is one.
    pub fn appointment_id(&self) -> Option<i64> {
        self.id.parse().ok()
    }

    /// Full PATCH body carrying every editable field of this event.
    pub fn to_patch(&self) -> PatchAppointmentRequest {
        PatchAppointmentRequest {
            start_time: Some(self.start),
            end_time: Some(self.end),
            status: Some(self.extended_props.status.clone()),
            notes: Some(self.extended_props.notes.clone()),
            appointment_type: Some(self.extended_props.appointment_type.clone()),
        }
    }
}

/// Map one appointment to its calendar event. Total and side-effect free.
pub fn transform(appointment: &Appointment) -> CalendarEvent {
    CalendarEvent {
        id: appointment.id.to_string(),
        start: appointment.start_time,
        end: appointment.end_time,
        class_name: format!("event-{}", appointment.status.as_str()),
        extended_props: ExtendedProps {
            patient: appointment.patient.clone(),
            doctor_name: appointment.doctor_name.clone().unwrap_or_default(),
            appointment_type: appointment.appointment_type.clone(),
            status: appointment.status.clone(),
            notes: appointment.notes.clone(),
        },
    }
}

pub fn transform_all(appointments: &[Appointment]) -> Vec<CalendarEvent> {
    appointments.iter().map(transform).collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::TimeZone;

    fn appointment(id: i64, status: AppointmentStatus) -> Appointment {
        Appointment {
            id,
            patient: PatientRef {
                id: 1,
                name: "A".into(),
            },
            start_time: Utc.with_ymd_and_hms(2025, 10, 2, 8, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 10, 2, 9, 0, 0).unwrap(),
            appointment_type: AppointmentType::Initial,
            status,
            notes: "bring lab results".into(),
            doctor_name: None,
        }
    }

    #[test]
    fn test_single_appointment_projection() {
        let json = r#"[{
            "id": 1,
            "patient": {"id": 1, "name": "A"},
            "start_time": "2025-10-02T08:00",
            "end_time": "2025-10-02T09:00",
            "appointment_type": "initial",
            "status": "next"
        }]"#;
        let appointments: Vec<Appointment> = serde_json::from_str(json).unwrap();

        let events = transform_all(&appointments);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "1");
        assert_eq!(events[0].class_name, "event-next");
        assert_eq!(events[0].extended_props.patient.name, "A");
    }

    #[test]
    fn test_id_is_stringified_exactly() {
        for id in [0, 2, 42, -7, i64::MAX] {
            let event = transform(&appointment(id, AppointmentStatus::Next));
            assert_eq!(event.id, id.to_string());
            assert_eq!(event.appointment_id(), Some(id));
        }
    }

    #[test]
    fn test_class_name_for_every_status() {
        let statuses = [
            AppointmentStatus::Next,
            AppointmentStatus::Completed,
            AppointmentStatus::Canceled,
            AppointmentStatus::Other("no_show".into()),
            AppointmentStatus::Other(String::new()),
        ];
        for status in statuses {
            let expected = format!("event-{}", status.as_str());
            assert_eq!(transform(&appointment(1, status)).class_name, expected);
        }
        assert_eq!(
            transform(&appointment(1, AppointmentStatus::Other("no_show".into()))).class_name,
            "event-no_show"
        );
    }

    #[test]
    fn test_missing_doctor_is_empty_string() {
        let event = transform(&appointment(1, AppointmentStatus::Next));
        assert_eq!(event.extended_props.doctor_name, "");

        let mut with_doctor = appointment(1, AppointmentStatus::Next);
        with_doctor.doctor_name = Some("Dr. Noor".into());
        assert_eq!(transform(&with_doctor).extended_props.doctor_name, "Dr. Noor");
    }

    #[test]
    fn test_patch_from_event_matches_appointment() {
        let appt = appointment(5, AppointmentStatus::Completed);
        let patch = transform(&appt).to_patch();

        assert_eq!(patch.start_time, Some(appt.start_time));
        assert_eq!(patch.end_time, Some(appt.end_time));
        assert_eq!(patch.status, Some(appt.status.clone()));
        assert_eq!(patch.notes, Some(appt.notes.clone()));
        assert_eq!(patch.appointment_type, Some(appt.appointment_type.clone()));
    }

    #[test]
    fn test_widget_json_shape() {
        let value = serde_json::to_value(transform(&appointment(3, AppointmentStatus::Canceled)))
            .unwrap();

        assert_eq!(value["id"], "3");
        assert_eq!(value["className"], "event-canceled");
        assert_eq!(value["start"], "2025-10-02T08:00:00.000Z");
        assert_eq!(value["extendedProps"]["doctor_name"], "");
        assert_eq!(value["extendedProps"]["patient"]["name"], "A");
    }

    #[test]
    fn test_time_range() {
        let event = transform(&appointment(1, AppointmentStatus::Next));
        let range = event.range();
        assert!(range.is_valid());
        assert_eq!(range.duration(), Duration::hours(1));
        assert!(!TimeRange::new(range.end, range.start).is_valid());
    }
}
