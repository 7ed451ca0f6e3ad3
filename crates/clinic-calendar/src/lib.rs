//! Headless calendar core for the clinic dashboard.
//!
//! Turns server appointments into widget events, keeps them cached and in
//! sync, persists drag/resize gestures optimistically, shadows the widget's
//! navigation state and runs the appointment dialog. A UI shell supplies a
//! [`CalendarWidget`] and a [`Notifier`] and forwards [`WidgetCallback`]s to
//! a [`CalendarPage`].

pub mod dialog;
pub mod error;
pub mod event;
pub mod form;
pub mod mutation;
pub mod notify;
pub mod page;
pub mod query;
pub mod view;
pub mod widget;

#[cfg(test)]
mod testing;

pub use dialog::{DialogOrchestrator, DialogState, PendingSubmit, SubmitError};
pub use error::{DialogError, MutationError, PageError};
pub use event::{transform, transform_all, CalendarEvent, ExtendedProps, TimeRange};
pub use form::{AppointmentForm, FormDefaults};
pub use mutation::{Gesture, MutationController};
pub use notify::{ChannelNotifier, Notification, NotificationLevel, Notifier, TracingNotifier};
pub use page::CalendarPage;
pub use query::{
    calendar_events_query, clients_query, QueryCache, QueryFn, QueryOptions, QueryState,
    CALENDAR_EVENTS_KEY, CLIENTS_KEY,
};
pub use view::{MountOptions, ViewController, ViewState};
pub use widget::{CalendarWidget, DateSlot, EventChange, ViewMode, WidgetCallback, WidgetSlot};
