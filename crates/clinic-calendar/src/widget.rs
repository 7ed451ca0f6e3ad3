//! The seam between the calendar core and whatever widget renders it.
//!
//! The widget is an external collaborator. Inbound, it reports user gestures
//! as [`WidgetCallback`]s; outbound, the core drives it only through
//! [`CalendarWidget`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use parking_lot::RwLock;

use crate::event::TimeRange;

/// Calendar granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewMode {
    Day,
    #[default]
    Week,
    Month,
    List,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [ViewMode::Day, ViewMode::Week, ViewMode::Month, ViewMode::List];

    /// Identifier the widget uses for this view.
    pub fn widget_id(self) -> &'static str {
        match self {
            ViewMode::Day => "timeGridDay",
            ViewMode::Week => "timeGridWeek",
            ViewMode::Month => "dayGridMonth",
            ViewMode::List => "listWeek",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Day => "day",
            ViewMode::Week => "week",
            ViewMode::Month => "month",
            ViewMode::List => "list",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(ViewMode::Day),
            "week" => Ok(ViewMode::Week),
            "month" => Ok(ViewMode::Month),
            "list" => Ok(ViewMode::List),
            other => Err(format!("unknown view mode: {}", other)),
        }
    }
}

/// Imperative API of the rendering widget.
///
/// Implementations are expected to be cheap and synchronous; they run on the
/// UI thread.
pub trait CalendarWidget: Send + Sync {
    fn prev(&self);
    fn next(&self);
    fn today(&self);
    fn change_view(&self, view: ViewMode);
    /// Date the widget currently displays.
    fn get_date(&self) -> NaiveDate;
    /// Move or resize a rendered event. Used to undo an optimistic change.
    fn set_event_range(&self, event_id: &str, range: TimeRange);
}

/// Slot holding the currently mounted widget, if any.
///
/// The widget is recreated whenever the view mode changes, so controllers
/// share this slot instead of holding a widget directly.
#[derive(Clone, Default)]
pub struct WidgetSlot {
    inner: Arc<RwLock<Option<Arc<dyn CalendarWidget>>>>,
}

impl WidgetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, widget: Arc<dyn CalendarWidget>) {
        *self.inner.write() = Some(widget);
    }

    pub fn detach(&self) {
        *self.inner.write() = None;
    }

    pub fn get(&self) -> Option<Arc<dyn CalendarWidget>> {
        self.inner.read().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.read().is_some()
    }
}

impl fmt::Debug for WidgetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetSlot")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// A clicked date/time slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSlot {
    pub start: DateTime<Utc>,
    /// Set when the user selected a range rather than a single slot.
    pub end: Option<DateTime<Utc>>,
    /// True for clicks in day cells without a time (month view).
    pub all_day: bool,
}

impl DateSlot {
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: None,
            all_day: false,
        }
    }

    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            start: date.and_time(NaiveTime::default()).and_utc(),
            end: None,
            all_day: true,
        }
    }
}

/// A drag or resize the widget has already applied on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventChange {
    pub event_id: String,
    /// Position before the gesture.
    pub old: TimeRange,
    /// Position after the gesture.
    pub new: TimeRange,
}

/// Everything the widget reports to the core.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetCallback {
    DateClick(DateSlot),
    EventClick { event_id: String },
    EventDrop(EventChange),
    EventResize(EventChange),
}
