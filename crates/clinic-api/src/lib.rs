//! REST gateway for the clinic scheduling backend.
//!
//! Provides the appointment wire types, the `AppointmentApi` seam, an HTTP
//! client and bounded retry for reads.

pub mod client;
pub mod error;
pub mod gateway;
pub mod retry;
pub mod types;

pub use client::ClinicClient;
pub use error::{ApiError, ErrorKind, FieldErrors};
pub use gateway::AppointmentApi;
pub use retry::{with_retry, RetryConfig};
pub use types::{
    Appointment, AppointmentStatus, AppointmentType, Client, CreateAppointmentRequest,
    PatchAppointmentRequest, PatientRef,
};
