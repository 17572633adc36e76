use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use serde_json::{Map, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use depot_core::{
    Conduit, DispatchConfig, Dispatcher, FailurePolicy, MemoryConduit, MemoryReservations,
    MemoryWorkers, Pipeline, PipelineKind, ReaperConfig, StaticProbe, StatusManager, StepContext,
    StepCore, UnitStep, WorkerReaper, handler_fn,
};
use depot_model::{
    PluginConfig, Repository, SCHEDULER_WORKER_NAME, Unit, WorkerName,
};
use depot_observe::{Journal, logger_init_from_env};

const HOST: &str = "demo-host";

fn units() -> Vec<Unit> {
    let mut out = Vec::new();
    for (type_id, name, arch) in [
        ("rpm", "bash", "x86_64"),
        ("rpm", "zsh", "x86_64"),
        ("rpm", "tzdata", "noarch"),
        ("drpm", "bash-5.2-delta", "x86_64"),
        ("erratum", "RHSA-2026:0001", "noarch"),
    ] {
        let mut key = Map::new();
        key.insert("name".into(), json!(name));
        out.push(Unit::new(type_id, key).with_metadata("arch", arch));
    }
    out
}

fn sync_pipeline(repo_id: &str, conduit: Arc<dyn Conduit>) -> anyhow::Result<Pipeline> {
    let repo = Repository::new(repo_id)
        .with_count("rpm", 3)
        .with_count("drpm", 1)
        .with_count("erratum", 1);
    let config = PluginConfig::new().with("skip", json!({"drpm": true, "erratum": false}));
    let ctx = StepContext::root(repo, conduit, config)
        .with_plugin_type("yum")
        .with_listener(Arc::new(Journal::new()));

    let mut pipeline = Pipeline::from_context(PipelineKind::Sync, ctx)?;
    pipeline
        .add_step(UnitStep::new(
            "sync_packages",
            ["rpm", "drpm"],
            handler_fn(|unit: &Unit, step: &StepCore| {
                tracing::debug!(step = step.step_id(), key = ?unit.unit_key, "unit downloaded");
                Ok(())
            }),
        ))
        .add_step(
            UnitStep::new(
                "sync_errata",
                ["erratum"],
                handler_fn(|_: &Unit, _: &StepCore| Ok(())),
            )
            .with_policy(FailurePolicy::Abort),
        );
    Ok(pipeline)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    let cfg = logger_init_from_env()?;
    info!(format = %cfg.format, level = %cfg.level, "logger initialized");

    // 2) Registry: two resource workers, a scheduler and one long-silent worker
    let workers = Arc::new(MemoryWorkers::new());
    let now = SystemTime::now();
    workers.heartbeat(WorkerName::new("reserved_resource_worker-0", HOST), now)?;
    workers.heartbeat(WorkerName::new("reserved_resource_worker-1", HOST), now)?;
    workers.heartbeat(WorkerName::new(SCHEDULER_WORKER_NAME, HOST), now)?;
    workers.heartbeat(
        WorkerName::new("reserved_resource_worker-9", HOST),
        now - Duration::from_secs(3_600),
    )?;
    let reservations = Arc::new(MemoryReservations::new());

    // 3) Reaper
    let reaper = Arc::new(WorkerReaper::new(
        workers.clone(),
        reservations.clone(),
        ReaperConfig {
            interval_ms: 1_000,
            ..Default::default()
        },
    ));
    let outcome = reaper.reap(SystemTime::now()).await?;
    info!(removed = outcome.removed_workers.len(), "initial reaping pass done");

    let shutdown = CancellationToken::new();
    let reaper_loop = {
        let reaper = Arc::clone(&reaper);
        let token = shutdown.clone();
        tokio::spawn(async move { reaper.run_until(token).await })
    };

    // 4) Dispatch one sync per repository
    let dispatcher = Arc::new(Dispatcher::new(
        workers.clone(),
        reservations.clone(),
        DispatchConfig::default().with_retry_delay_ms(100),
    ));
    let conduit: Arc<dyn Conduit> = Arc::new(MemoryConduit::new(units()));

    let mut jobs = Vec::new();
    for repo_id in ["zoo", "fedora", "epel"] {
        let mut pipeline = sync_pipeline(repo_id, conduit.clone())?;
        let dispatcher = Arc::clone(&dispatcher);
        jobs.push(tokio::spawn(async move {
            dispatcher
                .run(repo_id, move |worker| {
                    info!(worker = %worker.name, repo = repo_id, "worker picked up sync");
                    pipeline.run()
                })
                .await
        }));
    }

    for job in jobs {
        match job.await.context("dispatch task aborted")? {
            Ok(report) => info!(
                run_id = %report.run_id,
                success = report.success_flag,
                summary = %serde_json::to_string(&report.summary)?,
                "sync finished"
            ),
            Err(e) => warn!(error = %e, "sync could not be dispatched"),
        }
    }

    // 5) Status
    let status = StatusManager::new(workers.clone(), Arc::new(StaticProbe(true)))
        .status()
        .await?;
    info!(status = %serde_json::to_string(&status)?, "status");

    shutdown.cancel();
    reaper_loop.await?;
    info!("shut down");
    Ok(())
}
