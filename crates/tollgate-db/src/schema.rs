//! SQL schema definitions.

/// Complete schema for Tollgate v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Accounts & Nodes
-- ============================================================

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    uploaded INTEGER NOT NULL DEFAULT 0,
    downloaded INTEGER NOT NULL DEFAULT 0,
    quota_total INTEGER NOT NULL DEFAULT 0,
    quota_daily_limit INTEGER NOT NULL DEFAULT 1073741824,
    last_day_downloaded INTEGER NOT NULL DEFAULT 0,
    sub_count INTEGER NOT NULL DEFAULT 0,
    sub_count_lastday INTEGER NOT NULL DEFAULT 0,
    last_active_at INTEGER NOT NULL DEFAULT 0,
    renewal_due_at INTEGER NOT NULL DEFAULT 0,
    service_class INTEGER NOT NULL DEFAULT 0,
    class_expires_at INTEGER NOT NULL DEFAULT 0,
    account_expires_at INTEGER NOT NULL DEFAULT 0,
    node_group INTEGER NOT NULL DEFAULT 0,
    enabled INTEGER NOT NULL DEFAULT 1,
    warning_message TEXT,
    ban_count INTEGER NOT NULL DEFAULT 0,
    score INTEGER NOT NULL DEFAULT 0,
    referrer_id INTEGER NOT NULL DEFAULT 0,
    balance INTEGER NOT NULL DEFAULT 0,
    registered_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_accounts_group ON accounts(node_group, enabled);
CREATE INDEX IF NOT EXISTS idx_accounts_renewal ON accounts(renewal_due_at)
    WHERE enabled = 1 AND service_class > 0;

CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    bandwidth_used INTEGER NOT NULL DEFAULT 0,
    bandwidth_limit INTEGER NOT NULL DEFAULT 0,
    last_heartbeat_at INTEGER NOT NULL DEFAULT 0,
    online_count INTEGER NOT NULL DEFAULT 0,
    visible INTEGER NOT NULL DEFAULT 1,
    node_group INTEGER NOT NULL DEFAULT 0,
    required_class INTEGER NOT NULL DEFAULT 0
);

-- ============================================================
-- Billing
-- ============================================================

CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL REFERENCES accounts(id),
    amount INTEGER NOT NULL,
    status INTEGER NOT NULL DEFAULT 0,
    trade_no TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_unpaid ON orders(created_at)
    WHERE status = 0;

CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    price INTEGER NOT NULL,
    content TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS purchases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL REFERENCES accounts(id),
    package_id INTEGER NOT NULL REFERENCES packages(id),
    price INTEGER NOT NULL,
    renew_at INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_purchases_account ON purchases(account_id, created_at);

-- ============================================================
-- Referral ledger
-- ============================================================

CREATE TABLE IF NOT EXISTS referral_ledger (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL,
    referrer_id INTEGER NOT NULL,
    order_id INTEGER,
    kind TEXT NOT NULL CHECK (kind IN ('commission', 'signup_bonus', 'recovery')),
    amount INTEGER NOT NULL,
    recovered INTEGER NOT NULL DEFAULT 0,
    recorded_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_referral_account ON referral_ledger(account_id, kind);
CREATE UNIQUE INDEX IF NOT EXISTS idx_referral_order ON referral_ledger(order_id)
    WHERE kind = 'commission' AND order_id IS NOT NULL;

-- ============================================================
-- Historical logs (trimmed by the weekly clean job)
-- ============================================================

CREATE TABLE IF NOT EXISTS traffic_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL,
    node_id INTEGER NOT NULL,
    uploaded INTEGER NOT NULL,
    downloaded INTEGER NOT NULL,
    logged_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_traffic_log_time ON traffic_log(logged_at);

CREATE TABLE IF NOT EXISTS node_online_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_id INTEGER NOT NULL,
    online_count INTEGER NOT NULL,
    logged_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_node_online_log_time ON node_online_log(logged_at);
"#;
