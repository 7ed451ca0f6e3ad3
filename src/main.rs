use std::sync::Arc;

use anyhow::{Context, Result};
use clinic_api::ClinicClient;
use clinic_calendar::{CalendarPage, TracingNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    clinic_core::init()?;

    let (config, _) = clinic_core::Config::load_validated()?;
    tracing::info!("Using backend at {}", config.api.base_url);

    let client = ClinicClient::from_config(&config.api).context("Failed to create API client")?;
    let page = CalendarPage::new(&config, Arc::new(client), Arc::new(TracingNotifier));

    if let Err(e) = page.mount().await {
        tracing::error!("Failed to load appointments: {}", e);
        println!("{}", page.fallback_message().unwrap_or(e.user_message()));
        return Ok(());
    }

    let events = page.events().data().unwrap_or_default();
    if let Err(e) = page.clients().mount().await {
        tracing::warn!("Failed to load clients: {}", e);
    }
    let clients = page.clients().data().map_or(0, |c| c.len());

    println!("Clinic Dashboard - {}", page.view().title());
    println!(
        "  {} appointments, {} clients ({} view)",
        events.len(),
        clients,
        page.view().current_view()
    );
    for event in &events {
        println!(
            "  #{:<5} {} - {}  {:<20} {}",
            event.id,
            event.start.format("%a %d %b %H:%M"),
            event.end.format("%H:%M"),
            event.extended_props.patient.name,
            event.extended_props.status
        );
    }

    Ok(())
}
