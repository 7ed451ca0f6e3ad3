//! View mode and displayed date, shadowed from the widget.
//!
//! The widget is authoritative. Each navigation calls the widget first and
//! then reads its date back; the shadow exists so a recreated widget can be
//! mounted on the same date instead of resetting to today.

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::Serialize;

use crate::widget::{CalendarWidget, ViewMode, WidgetSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub current_view: ViewMode,
    pub current_date: NaiveDate,
}

/// Options a freshly created widget must be mounted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountOptions {
    #[serde(rename = "initialView")]
    pub view_id: &'static str,
    #[serde(rename = "initialDate")]
    pub initial_date: NaiveDate,
}

pub struct ViewController {
    widget: WidgetSlot,
    state: RwLock<ViewState>,
}

impl ViewController {
    pub fn new(widget: WidgetSlot, view: ViewMode, date: NaiveDate) -> Self {
        Self {
            widget,
            state: RwLock::new(ViewState {
                current_view: view,
                current_date: date,
            }),
        }
    }

    pub fn state(&self) -> ViewState {
        *self.state.read()
    }

    pub fn current_view(&self) -> ViewMode {
        self.state.read().current_view
    }

    pub fn current_date(&self) -> NaiveDate {
        self.state.read().current_date
    }

    pub fn next(&self) -> NaiveDate {
        self.navigate("next", |w| w.next())
    }

    pub fn previous(&self) -> NaiveDate {
        self.navigate("prev", |w| w.prev())
    }

    pub fn today(&self) -> NaiveDate {
        self.navigate("today", |w| w.today())
    }

    /// Switch granularity. The widget keeps its date across the switch.
    pub fn change_view(&self, view: ViewMode) -> NaiveDate {
        self.state.write().current_view = view;
        self.navigate("change_view", |w| w.change_view(view))
    }

    /// What a widget created for the current view must start on.
    pub fn mount_options(&self) -> MountOptions {
        let state = self.state();
        MountOptions {
            view_id: state.current_view.widget_id(),
            initial_date: state.current_date,
        }
    }

    /// Header text for the toolbar.
    pub fn title(&self) -> String {
        let state = self.state();
        match state.current_view {
            ViewMode::Day => state.current_date.format("%A, %B %-d, %Y").to_string(),
            _ => state.current_date.format("%B %Y").to_string(),
        }
    }

    fn navigate<F>(&self, action: &str, call: F) -> NaiveDate
    where
        F: FnOnce(&dyn CalendarWidget),
    {
        let Some(widget) = self.widget.get() else {
            tracing::debug!(action, "No widget mounted, navigation ignored");
            return self.current_date();
        };

        call(widget.as_ref());
        let date = widget.get_date();
        self.state.write().current_date = date;
        tracing::debug!(action, %date, "View navigated");
        date
    }
}
