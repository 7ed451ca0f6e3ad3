//! Persistence of drag and resize gestures the widget has already applied.
//!
//! Every gesture records the event's pre-gesture range in a snapshot table,
//! sends exactly one PATCH, and then either resynchronizes the calendar
//! cache or puts the event back where it was. Nothing is retried and nothing
//! is corrected locally.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clinic_api::{Appointment, AppointmentApi, PatchAppointmentRequest};
use parking_lot::Mutex;
use tracing::instrument;

use crate::error::MutationError;
use crate::event::{CalendarEvent, TimeRange};
use crate::notify::Notifier;
use crate::query::QueryCache;
use crate::widget::{EventChange, WidgetSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Drop,
    Resize,
}

impl Gesture {
    fn success_message(self) -> &'static str {
        match self {
            Gesture::Drop => "Appointment rescheduled",
            Gesture::Resize => "Appointment duration updated",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Gesture::Drop => "Could not reschedule appointment",
            Gesture::Resize => "Could not change appointment duration",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    token: u64,
    range: TimeRange,
    /// Another gesture on the same event was in flight at some point.
    overlapped: bool,
}

pub struct MutationController {
    api: Arc<dyn AppointmentApi>,
    events: QueryCache<Vec<CalendarEvent>>,
    widget: WidgetSlot,
    notifier: Arc<dyn Notifier>,
    snapshots: Mutex<HashMap<String, Vec<Snapshot>>>,
    next_token: AtomicU64,
}

impl MutationController {
    pub fn new(
        api: Arc<dyn AppointmentApi>,
        events: QueryCache<Vec<CalendarEvent>>,
        widget: WidgetSlot,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            events,
            widget,
            notifier,
            snapshots: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
        }
    }

    /// The event was dragged to a new slot. Sends both instants.
    pub async fn on_event_drop(&self, change: EventChange) -> Result<Appointment, MutationError> {
        let patch = PatchAppointmentRequest::reschedule(change.new.start, change.new.end);
        self.persist(Gesture::Drop, change, patch).await
    }

    /// The event was stretched or shrunk. Sends only the edge(s) that moved.
    pub async fn on_event_resize(
        &self,
        change: EventChange,
    ) -> Result<Appointment, MutationError> {
        let mut patch = PatchAppointmentRequest::default();
        if change.new.start != change.old.start {
            patch.start_time = Some(change.new.start);
        }
        if change.new.end != change.old.end || patch.is_empty() {
            patch.end_time = Some(change.new.end);
        }
        self.persist(Gesture::Resize, change, patch).await
    }

    /// Gestures on `event_id` whose PATCH has not resolved yet.
    pub fn pending(&self, event_id: &str) -> usize {
        self.snapshots.lock().get(event_id).map_or(0, Vec::len)
    }

    #[instrument(skip(self, change, patch), fields(event_id = %change.event_id))]
    async fn persist(
        &self,
        gesture: Gesture,
        change: EventChange,
        patch: PatchAppointmentRequest,
    ) -> Result<Appointment, MutationError> {
        let token = self.take_snapshot(&change);
        let result = self.send(&change, &patch).await;
        let snapshot = self.release_snapshot(&change.event_id, token);
        let overlapped = snapshot.is_some_and(|s| s.overlapped);
        let restore = snapshot.map_or(change.old, |s| s.range);

        match result {
            Ok(appointment) => {
                self.notifier.success(gesture.success_message());
                if let Err(e) = self.events.invalidate().await {
                    tracing::warn!("Resync after {:?} failed: {}", gesture, e);
                }
                Ok(appointment)
            }
            Err(e) => {
                if overlapped {
                    tracing::error!(
                        event_id = %change.event_id,
                        "{:?} failed after an overlapping gesture, reverting to its own snapshot; \
                         the widget may not match the server until the next fetch: {}",
                        gesture,
                        e
                    );
                } else {
                    tracing::warn!("{:?} failed, reverting: {}", gesture, e);
                }
                self.revert(&change.event_id, restore);
                self.notifier.error(&failure_text(gesture, &e));
                Err(e)
            }
        }
    }

    async fn send(
        &self,
        change: &EventChange,
        patch: &PatchAppointmentRequest,
    ) -> Result<Appointment, MutationError> {
        let id: i64 = change
            .event_id
            .parse()
            .map_err(|_| MutationError::InvalidEventId(change.event_id.clone()))?;
        if !change.new.is_valid() {
            return Err(MutationError::InvalidRange);
        }
        Ok(self.api.patch_appointment(id, patch).await?)
    }

    fn take_snapshot(&self, change: &EventChange) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let mut snapshots = self.snapshots.lock();
        let entry = snapshots.entry(change.event_id.clone()).or_default();
        let overlapped = !entry.is_empty();
        if overlapped {
            // Nothing orders overlapping gestures on one appointment; each
            // one can only undo itself.
            tracing::warn!(
                event_id = %change.event_id,
                in_flight = entry.len(),
                "Overlapping gesture on appointment with a pending update"
            );
            for pending in entry.iter_mut() {
                pending.overlapped = true;
            }
        }
        entry.push(Snapshot {
            token,
            range: change.old,
            overlapped,
        });
        token
    }

    fn release_snapshot(&self, event_id: &str, token: u64) -> Option<Snapshot> {
        let mut snapshots = self.snapshots.lock();
        let entry = snapshots.get_mut(event_id)?;
        let position = entry.iter().position(|s| s.token == token)?;
        let snapshot = entry.remove(position);
        if entry.is_empty() {
            snapshots.remove(event_id);
        }
        Some(snapshot)
    }

    /// Put the event back at `range` in the widget.
    ///
    /// When gestures overlapped, a late failure still restores its own
    /// pre-gesture range, even if a sibling PATCH already succeeded and the
    /// cache was resynced. The widget then shows a range the server no longer
    /// holds until the next fetch. This is logged at `error`, not resolved.
    fn revert(&self, event_id: &str, range: TimeRange) {
        match self.widget.get() {
            Some(widget) => widget.set_event_range(event_id, range),
            None => tracing::warn!(event_id, "No widget mounted, revert dropped"),
        }
    }
}

fn failure_text(gesture: Gesture, error: &MutationError) -> String {
    match error {
        MutationError::Api(e) => format!("{}: {}", gesture.failure_message(), e.user_message()),
        other => format!("{}: {}", gesture.failure_message(), other),
    }
}
