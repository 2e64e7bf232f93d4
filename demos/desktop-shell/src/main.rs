use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use keystone::prelude::*;

#[derive(Declare)]
struct Config;

impl Component for Config {
    const INIT: Option<ComponentHook> = Some(|| {
        tracing::info!("Config loaded");
        Ok(())
    });
}

#[derive(Declare)]
#[declare(depends_on = [Config])]
struct Logger;

impl Component for Logger {
    const INIT: Option<ComponentHook> = Some(|| {
        tracing::info!("Logger ready");
        Ok(())
    });
    const DEINIT: Option<ComponentHook> = Some(|| {
        tracing::info!("Logger flushed");
        Ok(())
    });
}

#[derive(Declare, Default)]
#[declare(depends_on = [Logger], optional = [Metrics], singleton)]
struct Service {
    ticks: AtomicU64,
}

impl Service {
    fn tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Lifecycle for Service {
    fn post_init(&self) -> Result<(), LifecycleError> {
        tracing::info!("Service accepting work");
        Ok(())
    }

    fn pre_destroy(&self) -> Result<(), LifecycleError> {
        tracing::info!(
            "Service draining after {} ticks",
            self.ticks.load(Ordering::Relaxed)
        );
        Ok(())
    }
}

/// Only constructed when a display is available
#[derive(Declare, Default)]
#[declare(depends_on = [Service], gui, singleton)]
struct MainWindow;

impl Lifecycle for MainWindow {
    fn post_init(&self) -> Result<(), LifecycleError> {
        tracing::info!("Main window shown");
        Ok(())
    }

    fn pre_destroy(&self) -> Result<(), LifecycleError> {
        tracing::info!("Main window closing");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let app = Application::builder()
        .config(OrchestratorConfig::from_env())
        .singleton::<MainWindow>()
        .singleton::<Service>()
        .component::<Logger>()
        .component::<Config>()
        .build()?;

    let orchestrator = Arc::clone(app.orchestrator());
    tracing::info!("Resolved order: {:?}", orchestrator.resolve_order()?);

    let outcome = app
        .run(async {
            println!("{}", orchestrator.snapshot().to_json()?);

            let Some(service) = orchestrator.instance::<Service>() else {
                anyhow::bail!("Service was not constructed");
            };
            for _ in 0..5 {
                tokio::time::sleep(Duration::from_millis(200)).await;
                tracing::info!("tick {}", service.tick());
            }
            anyhow::Ok(())
        })
        .await?;

    if let Some(result) = outcome {
        result?;
    }
    Ok(())
}
