//! Appointment API types and data structures.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Patient reference embedded in an appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// Server-owned appointment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    #[serde(alias = "patient_name")]
    pub patient: PatientRef,
    #[serde(with = "iso_instant")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "iso_instant")]
    pub end_time: DateTime<Utc>,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: String,
    /// Not provided by every backend version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
}

/// A client (patient) as listed by `GET /clients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    #[serde(default, alias = "full_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Client {
    pub fn as_patient(&self) -> PatientRef {
        PatientRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Appointment status. Unknown server values are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppointmentStatus {
    #[default]
    Next,
    Completed,
    Canceled,
    Other(String),
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Next => "next",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for AppointmentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "next" => Self::Next,
            "completed" => Self::Completed,
            "canceled" => Self::Canceled,
            _ => Self::Other(s),
        }
    }
}

impl From<AppointmentStatus> for String {
    fn from(s: AppointmentStatus) -> Self {
        match s {
            AppointmentStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appointment type. Unknown server values are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppointmentType {
    #[default]
    Initial,
    FollowUp,
    Other(String),
}

impl AppointmentType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initial => "initial",
            Self::FollowUp => "follow_up",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for AppointmentType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "initial" => Self::Initial,
            "follow_up" => Self::FollowUp,
            _ => Self::Other(s),
        }
    }
}

impl From<AppointmentType> for String {
    fn from(t: AppointmentType) -> Self {
        match t {
            AppointmentType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /appointments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateAppointmentRequest {
    pub patient_name_id: i64,
    #[serde(with = "iso_instant")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "iso_instant")]
    pub end_time: DateTime<Utc>,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub notes: String,
}

/// Body of `PATCH /appointments/{id}` (partial update).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatchAppointmentRequest {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "iso_instant::serialize_opt"
    )]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "iso_instant::serialize_opt"
    )]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_type: Option<AppointmentType>,
}

impl PatchAppointmentRequest {
    /// A reschedule: only the interval changes.
    pub fn reschedule(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start_time: Some(start),
            end_time: Some(end),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Instants on the wire.
///
/// Serialized like `Date.toISOString()` (`2025-10-02T08:00:00.000Z`).
/// Parsing accepts RFC 3339 or a zone-less `YYYY-MM-DDTHH:MM[:SS]`, read as UTC.
pub mod iso_instant {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn serialize_opt<S: Serializer>(
        dt: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => serialize(dt, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid instant: {}", s)))
    }
}
