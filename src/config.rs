//! 環境変数からのアプリケーション設定
//!
//! `LIBRARY_`接頭辞、ネストは`__`区切り（例: `LIBRARY_LOAN_POLICY__MAX_ACTIVE_LOANS=3`）。
//! `DATABASE_URL`と`PORT`はネストしたキーより優先される。

use crate::domain::loan::{DEFAULT_LOAN_PERIOD_DAYS, DEFAULT_MAX_ACTIVE_LOANS, LoanPolicy};
use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use validator::Validate;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// 起動時に`migrations/`を適用するか
    pub run_migrations: bool,
}

/// 永続化の実装
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// プロセス内のみ。開発・デモ用
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoanPolicyConfig {
    /// 上限は10年
    #[validate(range(min = 1, max = 3650))]
    pub loan_period_days: i64,
    #[validate(range(min = 1))]
    pub max_active_loans: u32,
    pub overdue_blocks_borrowing: bool,
    /// 設定時のみ延滞スイープを定期実行する
    #[serde(default)]
    #[validate(range(min = 1))]
    pub sweep_interval_secs: Option<u64>,
}

impl From<&LoanPolicyConfig> for LoanPolicy {
    fn from(config: &LoanPolicyConfig) -> Self {
        LoanPolicy {
            loan_period_days: config.loan_period_days,
            max_active_loans: config.max_active_loans,
            overdue_blocks_borrowing: config.overdue_blocks_borrowing,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageBackend,
    pub logging: LoggingConfig,
    pub loan_policy: LoanPolicyConfig,
}

impl AppConfig {
    /// `.env`を読み込んだ後、プロセスの環境変数から設定を構築する
    pub fn load() -> Result<Self, ConfigError> {
        // .envが無いのは正常
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars().collect())
    }

    /// 与えられた変数の集合だけから設定を構築する
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars.get("DATABASE_URL").cloned();
        let port = vars.get("PORT").cloned();

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000_i64)?
            .set_default("database.url", "postgres://localhost/library")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("database.run_migrations", true)?
            .set_default("storage", "postgres")?
            .set_default("logging.format", "pretty")?
            .set_default("loan_policy.loan_period_days", DEFAULT_LOAN_PERIOD_DAYS)?
            .set_default(
                "loan_policy.max_active_loans",
                i64::from(DEFAULT_MAX_ACTIVE_LOANS),
            )?
            .set_default("loan_policy.overdue_blocks_borrowing", true)?
            .add_source(
                Environment::with_prefix("LIBRARY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars)),
            )
            .set_override_option("database.url", database_url)?
            .set_override_option("server.port", port)?
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config
            .loan_policy
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid loan policy: {e}")))?;

        Ok(app_config)
    }

    pub fn loan_policy(&self) -> LoanPolicy {
        LoanPolicy::from(&self.loan_policy)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::from_vars(HashMap::new()).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.run_migrations);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.loan_policy(), LoanPolicy::default());
        assert_eq!(config.loan_policy.sweep_interval_secs, None);
    }

    #[test]
    fn test_nested_prefixed_variables() {
        let config = AppConfig::from_vars(vars(&[
            ("LIBRARY_STORAGE", "memory"),
            ("LIBRARY_LOGGING__FORMAT", "json"),
            ("LIBRARY_LOAN_POLICY__MAX_ACTIVE_LOANS", "3"),
            ("LIBRARY_LOAN_POLICY__LOAN_PERIOD_DAYS", "21"),
            ("LIBRARY_LOAN_POLICY__OVERDUE_BLOCKS_BORROWING", "false"),
            ("LIBRARY_LOAN_POLICY__SWEEP_INTERVAL_SECS", "60"),
        ]))
        .unwrap();

        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.loan_policy(),
            LoanPolicy {
                loan_period_days: 21,
                max_active_loans: 3,
                overdue_blocks_borrowing: false,
            }
        );
        assert_eq!(config.loan_policy.sweep_interval_secs, Some(60));
    }

    #[test]
    fn test_database_url_and_port_override_nested_keys() {
        let config = AppConfig::from_vars(vars(&[
            ("LIBRARY_DATABASE__URL", "postgres://nested/library"),
            ("DATABASE_URL", "postgres://override/library"),
            ("LIBRARY_SERVER__PORT", "4000"),
            ("PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.database.url, "postgres://override/library");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_zero_loan_limit_is_rejected() {
        let result = AppConfig::from_vars(vars(&[("LIBRARY_LOAN_POLICY__MAX_ACTIVE_LOANS", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_loan_period_out_of_range_is_rejected() {
        for days in ["0", "3651", "200000000000000"] {
            let result =
                AppConfig::from_vars(vars(&[("LIBRARY_LOAN_POLICY__LOAN_PERIOD_DAYS", days)]));
            assert!(result.is_err(), "loan_period_days={days} should be rejected");
        }

        let config =
            AppConfig::from_vars(vars(&[("LIBRARY_LOAN_POLICY__LOAN_PERIOD_DAYS", "3650")]))
                .unwrap();
        assert_eq!(config.loan_policy().loan_period_days, 3650);
    }

    #[test]
    fn test_unknown_storage_backend_is_rejected() {
        let result = AppConfig::from_vars(vars(&[("LIBRARY_STORAGE", "redis")]));
        assert!(result.is_err());
    }
}
