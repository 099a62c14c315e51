//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标描述（出现在 /metrics 的 HELP 注释中）
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("badge_grants_total", "Total number of badge grant attempts");
    metrics::describe_counter!("badge_scan_ticks_total", "Total number of badge scan ticks");
    metrics::describe_histogram!(
        "badge_scan_duration_seconds",
        "Badge scan tick duration in seconds"
    );
    metrics::describe_counter!(
        "badge_scan_groups_total",
        "Total number of group evaluations by outcome"
    );
    metrics::describe_gauge!(
        "worker_last_run_timestamp",
        "Unix timestamp of the last completed worker cycle"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录徽章授予结果
///
/// status 取值：granted / already_exists / failed
#[inline]
pub fn record_badge_grant(kind: &str, status: &str) {
    metrics::counter!(
        "badge_grants_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录一次扫描周期
#[inline]
pub fn record_badge_scan(status: &str, duration_secs: f64) {
    metrics::counter!("badge_scan_ticks_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("badge_scan_duration_seconds").record(duration_secs);
}

/// 记录单个群组的评估结果
///
/// outcome 取值：evaluated / skipped / failed / timed_out
#[inline]
pub fn record_group_evaluation(outcome: &str) {
    metrics::counter!("badge_scan_groups_total", "outcome" => outcome.to_string()).increment(1);
}

/// 记录 Worker 最近一次完成时间，供告警判断 Worker 是否存活
#[inline]
pub fn set_worker_last_run(worker: &str) {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    metrics::gauge!("worker_last_run_timestamp", "worker" => worker.to_string()).set(now);
}
