//! 徽章评估引擎
//!
//! 独立进程：连接看板数据库，按固定间隔扫描全部群组并授予徽章。

use std::sync::Arc;

use anyhow::Result;
use board_shared::{config::AppConfig, database::Database, observability};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use badge_engine::{
    ActivityRepository, BadgeEvaluator, BadgeLedgerRepository, BadgeScanWorker,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 本地开发时从 .env 读取 DATABASE_URL 等变量，文件不存在不是错误
    let _ = dotenvy::dotenv();

    // 1. 加载配置
    let config = AppConfig::load("badge-engine").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 2. 初始化可观测性
    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting badge-engine...");
    info!(
        environment = %config.environment,
        interval_seconds = config.badge_scan.interval_seconds,
        max_concurrency = config.badge_scan.max_concurrency,
        "Configuration loaded"
    );

    if !config.badge_scan.enabled {
        warn!("徽章扫描已在配置中关闭，进程退出");
        return Ok(());
    }

    // 3. 初始化数据库连接
    let db = Database::connect(&config.database).await?;
    if let Err(e) = db.health_check().await {
        error!(
            error = %e,
            code = e.code(),
            retryable = e.is_retryable(),
            "数据库健康检查失败"
        );
        return Err(e.into());
    }
    if config.database.run_migrations {
        db.run_migrations().await?;
    }
    let pool = db.pool().clone();
    info!("Database connection established");

    // 4. 组装仓储、评估器和 Worker
    let activity_repo = Arc::new(ActivityRepository::new(pool.clone()));
    let ledger_repo = Arc::new(BadgeLedgerRepository::new(pool.clone()));
    let evaluator = Arc::new(BadgeEvaluator::new(activity_repo.clone(), ledger_repo));
    let worker = Arc::new(BadgeScanWorker::new(
        activity_repo,
        evaluator,
        &config.badge_scan,
    ));

    // 5. 单次补发模式：扫描一轮后退出
    if config.badge_scan.run_once {
        let summary = worker.run_tick().await;
        info!(
            groups = summary.groups_total,
            granted = summary.badges_granted,
            failed = summary.failed,
            timed_out = summary.timed_out,
            abandoned = summary.abandoned,
            "单次扫描完成"
        );
        db.close().await;
        return Ok(());
    }

    // 6. 启动周期扫描，等待关闭信号
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(Arc::clone(&worker).run(shutdown_rx));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    if let Err(e) = handle.await {
        warn!(error = %e, "BadgeScanWorker 任务异常退出");
    }

    db.close().await;
    info!("Service shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号；信号处理器注册失败时退化为只等待另一个信号
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
