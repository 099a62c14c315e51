//! 仓储集成测试
//!
//! 使用真实 PostgreSQL 验证快照读取与账本授予。badge_grants 由迁移创建；
//! groups / posts 属于 CRUD 层，测试中按引擎依赖的最小列集按需建表。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p badge-engine --test repository_integration -- --ignored
//! ```

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

use badge_engine::{
    ActivityRepository, BadgeEvaluator, BadgeKind, BadgeLedgerRepository, BadgeScanWorker,
    GrantOutcome,
};
use board_shared::config::BadgeScanConfig;
use board_shared::database::Database;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

// ==================== 辅助函数 ====================

/// 从环境变量读取数据库 URL，未设置则 panic
fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

async fn setup_pool() -> PgPool {
    let pool = PgPool::connect(&database_url())
        .await
        .expect("连接数据库失败");

    Database::from_pool(pool.clone())
        .run_migrations()
        .await
        .expect("执行迁移失败");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            id          BIGINT PRIMARY KEY,
            like_count  BIGINT      NOT NULL DEFAULT 0,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("创建 groups 表失败");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id          BIGSERIAL PRIMARY KEY,
            group_id    BIGINT      NOT NULL,
            like_count  BIGINT      NOT NULL DEFAULT 0,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("创建 posts 表失败");

    pool
}

/// 同一测试进程内的群组 ID 序号
static NEXT_GROUP_SEQ: AtomicI64 = AtomicI64::new(0);

/// 生成不与其他测试冲突的群组 ID
///
/// 进程启动时刻（微秒）区分不同的测试运行，进程内序号区分并行的测试
fn unique_group_id() -> i64 {
    static RUN_BASE: OnceLock<i64> = OnceLock::new();
    let base = *RUN_BASE.get_or_init(|| Utc::now().timestamp_micros() * 1_000);
    base + NEXT_GROUP_SEQ.fetch_add(1, Ordering::SeqCst)
}

async fn seed_group(pool: &PgPool, group_id: i64, created_at: DateTime<Utc>, like_count: i64) {
    sqlx::query("INSERT INTO groups (id, like_count, created_at) VALUES ($1, $2, $3)")
        .bind(group_id)
        .bind(like_count)
        .bind(created_at)
        .execute(pool)
        .await
        .expect("插入测试群组失败");
}

async fn seed_post(pool: &PgPool, group_id: i64, created_at: DateTime<Utc>, like_count: i64) {
    sqlx::query("INSERT INTO posts (group_id, like_count, created_at) VALUES ($1, $2, $3)")
        .bind(group_id)
        .bind(like_count)
        .bind(created_at)
        .execute(pool)
        .await
        .expect("插入测试帖子失败");
}

async fn cleanup(pool: &PgPool, group_id: i64) {
    for table_sql in [
        "DELETE FROM badge_grants WHERE group_id = $1",
        "DELETE FROM posts WHERE group_id = $1",
        "DELETE FROM groups WHERE id = $1",
    ] {
        let _ = sqlx::query(table_sql).bind(group_id).execute(pool).await;
    }
}

#[test]
fn test_unique_group_ids_do_not_collide() {
    let mut ids: Vec<i64> = (0..1_000).map(|_| unique_group_id()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 1_000);
}

// ==================== 账本 ====================

#[tokio::test]
#[ignore = "需要数据库环境"]
async fn test_ledger_grant_is_idempotent() {
    let pool = setup_pool().await;
    let group_id = unique_group_id();
    let ledger = BadgeLedgerRepository::new(pool.clone());

    assert!(!ledger.has_grant(group_id, BadgeKind::TwentyPosts).await.unwrap());
    assert_eq!(
        ledger.grant(group_id, BadgeKind::TwentyPosts).await.unwrap(),
        GrantOutcome::Granted
    );
    assert_eq!(
        ledger.grant(group_id, BadgeKind::TwentyPosts).await.unwrap(),
        GrantOutcome::AlreadyExists
    );
    assert!(ledger.has_grant(group_id, BadgeKind::TwentyPosts).await.unwrap());

    let grants = ledger.list_grants(group_id).await.unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].badge_kind, BadgeKind::TwentyPosts);
    assert_eq!(ledger.count_grants(group_id).await.unwrap(), 1);

    cleanup(&pool, group_id).await;
}

#[tokio::test]
#[ignore = "需要数据库环境"]
async fn test_ledger_concurrent_grant_single_winner() {
    let pool = setup_pool().await;
    let group_id = unique_group_id();
    let ledger = Arc::new(BadgeLedgerRepository::new(pool.clone()));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            ledger.grant(group_id, BadgeKind::OneYearGroup).await.unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_granted() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(ledger.count_grants(group_id).await.unwrap(), 1);

    cleanup(&pool, group_id).await;
}

#[tokio::test]
#[ignore = "需要数据库环境"]
async fn test_badge_kind_stored_as_code() {
    let pool = setup_pool().await;
    let group_id = unique_group_id();
    let ledger = BadgeLedgerRepository::new(pool.clone());

    ledger
        .grant(group_id, BadgeKind::TenThousandPostLikes)
        .await
        .unwrap();

    let stored: String =
        sqlx::query_scalar("SELECT badge_kind FROM badge_grants WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored, "TEN_THOUSAND_POST_LIKES");

    cleanup(&pool, group_id).await;
}

// ==================== 活动快照 ====================

#[tokio::test]
#[ignore = "需要数据库环境"]
async fn test_snapshot_reads_group_and_posts() {
    let pool = setup_pool().await;
    let group_id = unique_group_id();
    let now = Utc::now();
    seed_group(&pool, group_id, now - Duration::days(10), 42).await;
    seed_post(&pool, group_id, now - Duration::days(1), 7).await;
    seed_post(&pool, group_id, now, 9).await;

    let repo = ActivityRepository::new(pool.clone());
    let activity = repo.snapshot(group_id).await.unwrap().expect("群组应存在");

    assert_eq!(activity.group_id, group_id);
    assert_eq!(activity.like_count, 42);
    assert_eq!(activity.post_count(), 2);
    assert!(activity.posts.iter().any(|p| p.like_count == 9));

    let ids = repo.list_all_group_ids().await.unwrap();
    assert!(ids.contains(&group_id));

    cleanup(&pool, group_id).await;
}

#[tokio::test]
#[ignore = "需要数据库环境"]
async fn test_snapshot_missing_group_is_none() {
    let pool = setup_pool().await;
    let repo = ActivityRepository::new(pool);

    assert!(repo.snapshot(-1).await.unwrap().is_none());
}

// ==================== 端到端 ====================

#[tokio::test]
#[ignore = "需要数据库环境"]
async fn test_scan_against_database() {
    let pool = setup_pool().await;
    let group_id = unique_group_id();
    let now = Utc::now();
    seed_group(&pool, group_id, now - Duration::days(400), 0).await;
    for i in 0..25 {
        seed_post(&pool, group_id, now - Duration::days(i * 2), 1).await;
    }

    let activity_repo = Arc::new(ActivityRepository::new(pool.clone()));
    let ledger = Arc::new(BadgeLedgerRepository::new(pool.clone()));
    let evaluator = Arc::new(BadgeEvaluator::new(activity_repo.clone(), ledger.clone()));

    let report = evaluator.evaluate(group_id).await.unwrap();
    assert_eq!(
        report.granted,
        vec![BadgeKind::TwentyPosts, BadgeKind::OneYearGroup]
    );

    // 全表扫描再跑一轮，本群组不会再获得徽章
    let worker = BadgeScanWorker::new(activity_repo, evaluator, &BadgeScanConfig::default());
    let summary = worker.run_tick().await;
    assert!(!summary.abandoned);
    assert_eq!(ledger.count_grants(group_id).await.unwrap(), 2);

    cleanup(&pool, group_id).await;
}
