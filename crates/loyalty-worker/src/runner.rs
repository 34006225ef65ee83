//! Worker setup and the command runners

use std::sync::Arc;

use loyalty_cache::{PubSubChannel, Publisher, RedisLocalStore, RedisPool, SubscriberBuilder};
use loyalty_common::{AppConfig, AppError};
use loyalty_db::{
    create_pool, run_migrations, DatabaseConfig, PgChangeFeed, PgLedgerProcedures, PgRemoteStore,
    ProcedureConfig,
};
use loyalty_service::{
    AccountService, PullOptions, ServiceContext, ServiceContextBuilder, ServiceError, Session,
};
use tracing::{error, info, warn};

use crate::bridge;
use crate::command::{Command, Task};

/// Connect the stores and build the service context
pub async fn create_context(config: &AppConfig) -> Result<(ServiceContext, RedisPool), AppError> {
    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Remote(e.to_string()))?;
    run_migrations(&pool)
        .await
        .map_err(|e| AppError::Remote(e.to_string()))?;
    info!("PostgreSQL connection established");

    info!("Connecting to Redis...");
    let redis_pool =
        RedisPool::from_config(&config.redis).map_err(|e| AppError::Cache(e.to_string()))?;
    info!("Redis pool ready");

    let ctx = ServiceContextBuilder::new()
        .remote(Arc::new(PgRemoteStore::new(pool.clone())))
        .procedures(Arc::new(PgLedgerProcedures::new(
            pool.clone(),
            ProcedureConfig::from(&config.loyalty),
        )))
        .change_feed(Arc::new(PgChangeFeed::new(pool)))
        .local_store(Arc::new(RedisLocalStore::new(redis_pool.clone())))
        .loyalty(config.loyalty.clone())
        .sync(config.sync.clone())
        .build()?;

    Ok((ctx, redis_pool))
}

/// Run a command with configuration
pub async fn run(config: AppConfig, command: Command) -> Result<(), AppError> {
    let (ctx, redis_pool) = create_context(&config).await?;

    match command {
        Command::Watch => watch(&ctx, redis_pool).await,
        Command::Once(task) => run_task(&ctx, task).await,
    }
}

/// Run one pull, push, unifier pass or cache wipe
pub async fn run_task(ctx: &ServiceContext, task: Task) -> Result<(), AppError> {
    let engine = ctx.sync_engine();

    match task {
        Task::Pull { force_clean } => {
            let report = engine
                .pull(PullOptions { force_clean })
                .await
                .map_err(ServiceError::from)?;
            info!(
                accounts = report.accounts,
                guest_orders = report.guest_orders,
                accounts_removed = report.accounts_removed,
                "Pull finished"
            );
        }
        Task::Push => {
            let report = engine.push_local().await.map_err(ServiceError::from)?;
            info!(
                accounts = report.accounts,
                guest_orders = report.guest_orders,
                "Push finished"
            );
        }
        Task::Unify => {
            let report = ctx.unifier().run().await.map_err(ServiceError::from)?;
            if report.groups_failed > 0 {
                warn!(groups_failed = report.groups_failed, "Some duplicate groups were skipped");
            }
        }
        Task::Clear => {
            let mut session = Session::load(ctx.cache()).await.map_err(ServiceError::from)?;
            AccountService::new(ctx).wipe_device(&mut session).await?;
        }
    }

    Ok(())
}

/// Pull, then follow changes until Ctrl-C
pub async fn watch(ctx: &ServiceContext, redis_pool: RedisPool) -> Result<(), AppError> {
    let redis_url = redis_pool.url().to_string();
    let forwarder = bridge::spawn_forwarder(ctx.bus(), Publisher::new(redis_pool));

    let subscriber = SubscriberBuilder::new()
        .redis_url(redis_url)
        .subscribe(PubSubChannel::LocalChanged)
        .build()
        .await
        .map_err(|e| AppError::Cache(e.to_string()))?;
    let local_events = bridge::sync_events(subscriber.receiver());

    // A failed first pull still leaves the cached state usable
    if let Err(e) = ctx.sync_engine().pull(PullOptions::default()).await {
        warn!(error = %e, "Initial pull failed, continuing with cached state");
    }

    let mut session = Session::load(ctx.cache()).await.map_err(ServiceError::from)?;
    let merges = ctx.bus().subscribe();
    let accounts = AccountService::new(ctx);
    let realtime = ctx.realtime();

    // The bus outlives the loop, so session tracking ends with it
    let result = tokio::select! {
        result = realtime.run(local_events, shutdown_signal()) => result,
        () = accounts.track_merges(&mut session, merges) => Ok(()),
    };

    if let Err(e) = subscriber.shutdown().await {
        warn!(error = %e, "Subscriber already stopped");
    }
    forwarder.abort();

    result.map_err(|e| ServiceError::from(e).into())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
