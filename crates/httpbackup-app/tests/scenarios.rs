use std::sync::Arc;
use std::time::Duration;

use httpbackup_app::Orchestrator;
use httpbackup_config::{Config, ConfigStore, Site};
use httpbackup_events::{Event, EventBus, EventStream, control_channel};
use httpbackup_runner::{BackupRunner, RunnerSettings};
use httpbackup_telemetry::Metrics;
use httpbackup_test_support::assert::{archives, no_staging_files};
use httpbackup_test_support::fixtures::ScratchRoot;
use httpmock::prelude::*;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

async fn next_kind(stream: &mut EventStream, kind: &str) -> anyhow::Result<Event> {
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(envelope) = stream.next().await {
            if envelope.event.kind() == kind {
                return Some(envelope.event);
            }
        }
        None
    })
    .await?
    .ok_or_else(|| anyhow::anyhow!("event stream ended before {kind}"))
}

#[tokio::test]
async fn run_now_backs_up_good_site_despite_failing_sibling() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/gone.zip");
            then.status(404).body("no such archive");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/shop.zip");
            then.status(200).body("PK-shop");
        })
        .await;

    let root = ScratchRoot::new()?;
    let store = ConfigStore::new(root.path().join("config.json"))?;
    let config = store
        .save(&Config {
            interval_minutes: 0,
            backup_folder: root.path().join("backups"),
            retention: 2,
            sites: vec![
                Site {
                    enabled: true,
                    name: "gone".to_string(),
                    url: server.url("/gone.zip"),
                },
                Site {
                    enabled: true,
                    name: "shop".to_string(),
                    url: server.url("/shop.zip"),
                },
            ],
            ..Config::initial()
        })
        .await?;

    let events = EventBus::new();
    let metrics = Metrics::new()?;
    let runner = BackupRunner::new(RunnerSettings::default(), events.clone(), metrics.clone())?;
    let orchestrator =
        Orchestrator::new(store, config, Arc::new(runner), events.clone(), metrics.clone());
    let mut stream = events.subscribe(None);
    let (control, receiver) = control_channel();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(orchestrator.run(receiver, shutdown.clone()));

    assert!(control.run_now().is_queued());
    let completed = next_kind(&mut stream, "run_completed").await?;
    assert!(matches!(
        completed,
        Event::RunCompleted {
            succeeded: 1,
            failed: 1,
            skipped: 0,
            ..
        }
    ));

    let backups = root.path().join("backups");
    assert_eq!(archives(&backups.join("shop"))?.len(), 1);
    assert!(archives(&backups.join("gone"))?.is_empty());
    no_staging_files(&backups.join("shop"))?;
    no_staging_files(&backups.join("gone"))?;
    assert_eq!(metrics.runs_started("manual"), 1);

    shutdown.cancel();
    task.await?;
    Ok(())
}
