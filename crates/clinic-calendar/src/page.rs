//! The calendar page: owns the caches and controllers for one session and
//! routes widget callbacks to them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use clinic_api::{ApiError, AppointmentApi, Client, RetryConfig};
use clinic_core::Config;

use crate::dialog::DialogOrchestrator;
use crate::error::{DialogError, PageError};
use crate::event::CalendarEvent;
use crate::form::FormDefaults;
use crate::mutation::MutationController;
use crate::notify::Notifier;
use crate::query::{calendar_events_query, clients_query, QueryCache};
use crate::view::ViewController;
use crate::widget::{CalendarWidget, DateSlot, ViewMode, WidgetCallback, WidgetSlot};

pub struct CalendarPage {
    events: QueryCache<Vec<CalendarEvent>>,
    clients: QueryCache<Vec<Client>>,
    widget: WidgetSlot,
    view: ViewController,
    mutations: MutationController,
    dialog: DialogOrchestrator,
}

impl CalendarPage {
    /// Page opened on today's date.
    pub fn new(config: &Config, api: Arc<dyn AppointmentApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_date(config, api, notifier, Utc::now().date_naive())
    }

    pub fn with_date(
        config: &Config,
        api: Arc<dyn AppointmentApi>,
        notifier: Arc<dyn Notifier>,
        date: NaiveDate,
    ) -> Self {
        let retry = RetryConfig::from_query_config(&config.query);
        let events = calendar_events_query(Arc::clone(&api), retry.clone());
        let clients = clients_query(
            Arc::clone(&api),
            retry,
            Duration::from_secs(config.query.clients_stale_secs),
        );

        let initial_view = config
            .calendar
            .default_view
            .parse::<ViewMode>()
            .unwrap_or_else(|e| {
                tracing::warn!("{}, using week view", e);
                ViewMode::default()
            });

        let widget = WidgetSlot::new();
        let view = ViewController::new(widget.clone(), initial_view, date);
        let mutations = MutationController::new(
            Arc::clone(&api),
            events.clone(),
            widget.clone(),
            Arc::clone(&notifier),
        );
        let dialog = DialogOrchestrator::new(
            api,
            events.clone(),
            clients.clone(),
            notifier,
            FormDefaults::from_config(&config.calendar),
        );

        Self {
            events,
            clients,
            widget,
            view,
            mutations,
            dialog,
        }
    }

    /// Load the calendar. Failure is reflected in the events state as well.
    pub async fn mount(&self) -> Result<(), ApiError> {
        self.events.mount().await
    }

    pub async fn on_window_focus(&self) -> Result<(), ApiError> {
        self.events.on_window_focus().await?;
        self.clients.on_window_focus().await
    }

    /// Install a freshly created widget. It should have been built from
    /// [`ViewController::mount_options`].
    pub fn attach_widget(&self, widget: Arc<dyn CalendarWidget>) {
        self.widget.attach(widget);
    }

    pub fn detach_widget(&self) {
        self.widget.detach();
    }

    /// Route one widget callback.
    pub async fn handle(&self, callback: WidgetCallback) -> Result<(), PageError> {
        match callback {
            WidgetCallback::DateClick(slot) => self.dialog.open_create(slot)?,
            WidgetCallback::EventClick { event_id } => {
                let event = self
                    .events
                    .data()
                    .unwrap_or_default()
                    .into_iter()
                    .find(|e| e.id == event_id)
                    .ok_or(DialogError::UnknownEvent(event_id))?;
                self.dialog.open_edit(event)?;
            }
            WidgetCallback::EventDrop(change) => {
                self.mutations.on_event_drop(change).await?;
            }
            WidgetCallback::EventResize(change) => {
                self.mutations.on_event_resize(change).await?;
            }
        }
        Ok(())
    }

    /// Toolbar "new appointment": create dialog on the displayed date at the
    /// default start time.
    pub fn new_appointment(&self) -> Result<(), DialogError> {
        let start = self
            .view
            .current_date()
            .and_time(self.dialog.defaults().start_time)
            .and_utc();
        self.dialog.open_create(DateSlot::at(start))
    }

    /// Message to show in place of the calendar when loading failed.
    pub fn fallback_message(&self) -> Option<&'static str> {
        let state = self.events.state();
        match (&state.error, state.is_error) {
            (Some(e), true) => Some(e.user_message()),
            _ => None,
        }
    }

    pub fn events(&self) -> &QueryCache<Vec<CalendarEvent>> {
        &self.events
    }

    pub fn clients(&self) -> &QueryCache<Vec<Client>> {
        &self.clients
    }

    pub fn view(&self) -> &ViewController {
        &self.view
    }

    pub fn dialog(&self) -> &DialogOrchestrator {
        &self.dialog
    }

    pub fn mutations(&self) -> &MutationController {
        &self.mutations
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::dialog::DialogState;
    use crate::testing::{appointment, range, FakeApi, FakeWidget, RecordingNotifier};
    use crate::widget::EventChange;
    use clinic_api::ErrorKind;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    async fn mounted_page(api: Arc<FakeApi>) -> (CalendarPage, Arc<FakeWidget>, Arc<RecordingNotifier>) {
        let mut config = Config::default();
        config.query.max_retries = 0;
        let notifier = Arc::new(RecordingNotifier::new());
        let page = CalendarPage::with_date(&config, api, notifier.clone(), date(2));
        let widget = Arc::new(FakeWidget::new(date(2)));
        page.attach_widget(widget.clone());
        page.mount().await.unwrap();
        (page, widget, notifier)
    }

    #[tokio::test]
    async fn test_event_click_opens_editor_with_cached_event() {
        let api = Arc::new(FakeApi::with_appointments(vec![appointment(2, 10, 11)]));
        let (page, _, _) = mounted_page(api).await;

        page.handle(WidgetCallback::EventClick {
            event_id: "2".into(),
        })
        .await
        .unwrap();

        match page.dialog().state() {
            DialogState::Editing { event, .. } => assert_eq!(event.id, "2"),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_click_on_unknown_event() {
        let (page, _, _) = mounted_page(Arc::new(FakeApi::new())).await;

        let err = page
            .handle(WidgetCallback::EventClick {
                event_id: "41".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(err, PageError::Dialog(DialogError::UnknownEvent("41".into())));
        assert!(!page.dialog().state().is_open());
    }

    #[tokio::test]
    async fn test_drop_is_routed_to_mutations() {
        let api = Arc::new(FakeApi::with_appointments(vec![appointment(2, 10, 11)]));
        let (page, widget, notifier) = mounted_page(api.clone()).await;
        widget.place("2", range(2, 14, 15));

        page.handle(WidgetCallback::EventDrop(EventChange {
            event_id: "2".into(),
            old: range(2, 10, 11),
            new: range(2, 14, 15),
        }))
        .await
        .unwrap();

        assert_eq!(api.count("PATCH /appointments/2"), 1);
        assert_eq!(notifier.successes(), 1);
        assert_eq!(page.events().data().unwrap()[0].range(), range(2, 14, 15));
    }

    #[tokio::test]
    async fn test_resize_failure_surfaces_kind() {
        let api = Arc::new(FakeApi::with_appointments(vec![appointment(2, 10, 11)]));
        api.fail_on("PATCH /appointments/2", ApiError::Network("unreachable".into()));
        let (page, widget, _) = mounted_page(api).await;
        widget.place("2", range(2, 10, 12));

        let err = page
            .handle(WidgetCallback::EventResize(EventChange {
                event_id: "2".into(),
                old: range(2, 10, 11),
                new: range(2, 10, 12),
            }))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(widget.rendered("2"), Some(range(2, 10, 11)));
    }

    #[tokio::test]
    async fn test_new_appointment_uses_displayed_date() {
        let (page, _, _) = mounted_page(Arc::new(FakeApi::new())).await;
        page.view().next();

        page.new_appointment().unwrap();

        let state = page.dialog().state();
        let form = state.form().unwrap();
        assert_eq!(form.date_str(), "2025-10-09");
        assert_eq!(form.start_str(), "09:00");
        assert_eq!(form.end_str(), "10:00");
    }

    #[tokio::test]
    async fn test_fallback_message_after_failed_load() {
        let api = Arc::new(FakeApi::new());
        api.fail_next(ApiError::Timeout);
        let config = Config::default();
        let page = CalendarPage::with_date(
            &config,
            api,
            Arc::new(RecordingNotifier::new()),
            date(2),
        );

        // Default retry budget absorbs two failures.
        page.mount().await.unwrap();
        assert_eq!(page.fallback_message(), None);

        let failing = Arc::new(FakeApi::new());
        for _ in 0..3 {
            failing.fail_next(ApiError::Timeout);
        }
        let mut config = Config::default();
        config.query.initial_delay_ms = 1;
        config.query.max_delay_ms = 1;
        let page = CalendarPage::with_date(
            &config,
            failing,
            Arc::new(RecordingNotifier::new()),
            date(2),
        );
        assert!(page.mount().await.is_err());
        assert_eq!(page.fallback_message(), Some(ApiError::Timeout.user_message()));
    }

    #[tokio::test]
    async fn test_unknown_default_view_falls_back_to_week() {
        let mut config = Config::default();
        config.calendar.default_view = "year".into();
        let page = CalendarPage::with_date(
            &config,
            Arc::new(FakeApi::new()),
            Arc::new(RecordingNotifier::new()),
            date(2),
        );

        assert_eq!(page.view().current_view(), ViewMode::Week);
    }
}
