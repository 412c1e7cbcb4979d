use topicbus::listeners::run_scenario;
use topicbus::{event_bus, init_event_bus, init_logging, load_settings, BUILD_DATE, VERSION};

fn main() -> anyhow::Result<()> {
    let settings = load_settings()?;

    // Initialize logging
    init_logging(&settings.logging)?;
    tracing::info!("topicbus {} (built {})", VERSION, BUILD_DATE);

    if let Err(rejected) = init_event_bus(settings.bus.clone()) {
        tracing::warn!("Global event bus already initialized, ignoring {:?}", rejected);
    }

    let bus = event_bus();
    let outcome = run_scenario(bus)?;
    tracing::info!(
        "Scenario finished: primary no-arg={}, primary data={}, secondary data={}",
        outcome.primary_no_arg,
        outcome.primary_data,
        outcome.secondary_data
    );

    let stats = bus.stats();
    tracing::info!(
        "Bus stats: posted={}, delivered={}, skipped={}, failed={}",
        stats.posted,
        stats.delivered,
        stats.skipped,
        stats.failed
    );

    Ok(())
}
