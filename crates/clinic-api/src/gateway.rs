//! The REST surface the calendar core depends on.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{Appointment, Client, CreateAppointmentRequest, PatchAppointmentRequest};

/// Appointment endpoints consumed by the calendar.
///
/// `ClinicClient` is the HTTP implementation; tests substitute in-memory fakes.
#[async_trait]
pub trait AppointmentApi: Send + Sync {
    /// `GET /appointments`
    async fn list_appointments(&self) -> Result<Vec<Appointment>, ApiError>;

    /// `POST /appointments`
    async fn create_appointment(
        &self,
        request: &CreateAppointmentRequest,
    ) -> Result<Appointment, ApiError>;

    /// `PATCH /appointments/{id}`
    async fn patch_appointment(
        &self,
        id: i64,
        request: &PatchAppointmentRequest,
    ) -> Result<Appointment, ApiError>;

    /// `DELETE /appointments/{id}`
    async fn delete_appointment(&self, id: i64) -> Result<(), ApiError>;

    /// `GET /clients`
    async fn list_clients(&self) -> Result<Vec<Client>, ApiError>;
}
