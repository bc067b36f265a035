use feedhub_config::{AppConfig, BufferSettings, ConfigError};

// 环境变量是进程级状态，所有断言放在同一个测试里顺序执行。
#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::remove_var("FEEDHUB_DATABASE_URL");
        std::env::remove_var("FEEDHUB_BUFFER_ENABLED");
        std::env::remove_var("FEEDHUB_BUFFER_MAX_QUEUE");
        std::env::remove_var("FEEDHUB_BUFFER_BATCH_SIZE");
        std::env::remove_var("FEEDHUB_BUFFER_FLUSH_INTERVAL_MS");
        std::env::remove_var("FEEDHUB_BUFFER_ON_OVERFLOW");
        std::env::remove_var("FEEDHUB_BUFFER_SHUTDOWN_TIMEOUT_MS");
        std::env::set_var("FEEDHUB_HTTP_ADDR", "127.0.0.1:8081");
    }

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.http_addr, "127.0.0.1:8081");
    assert_eq!(config.database_url, None);
    assert_eq!(config.buffer, BufferSettings::default());

    unsafe {
        std::env::set_var("FEEDHUB_DATABASE_URL", "postgres://localhost/feedhub");
        std::env::set_var("FEEDHUB_BUFFER_ENABLED", "false");
        std::env::set_var("FEEDHUB_BUFFER_MAX_QUEUE", "1000");
        std::env::set_var("FEEDHUB_BUFFER_BATCH_SIZE", "50");
        std::env::set_var("FEEDHUB_BUFFER_FLUSH_INTERVAL_MS", "250");
        std::env::set_var("FEEDHUB_BUFFER_ON_OVERFLOW", "Block");
        std::env::set_var("FEEDHUB_BUFFER_SHUTDOWN_TIMEOUT_MS", "2000");
    }
    let config = AppConfig::from_env().expect("config");
    assert_eq!(
        config.database_url.as_deref(),
        Some("postgres://localhost/feedhub")
    );
    assert!(!config.buffer.enabled);
    assert_eq!(config.buffer.max_queue, 1000);
    assert_eq!(config.buffer.batch_size, 50);
    assert_eq!(config.buffer.flush_interval_ms, 250);
    assert_eq!(config.buffer.on_overflow, "block");
    assert_eq!(config.buffer.shutdown_timeout_ms, 2000);

    unsafe {
        std::env::set_var("FEEDHUB_BUFFER_ON_OVERFLOW", "spill");
    }
    let err = AppConfig::from_env().expect_err("invalid policy");
    assert!(matches!(err, ConfigError::Invalid(key, value)
        if key == "FEEDHUB_BUFFER_ON_OVERFLOW" && value == "spill"));

    unsafe {
        std::env::set_var("FEEDHUB_BUFFER_ON_OVERFLOW", "drop");
        std::env::set_var("FEEDHUB_BUFFER_BATCH_SIZE", "many");
    }
    let err = AppConfig::from_env().expect_err("invalid batch size");
    assert_eq!(
        err.to_string(),
        "invalid value for FEEDHUB_BUFFER_BATCH_SIZE: many"
    );

    unsafe {
        std::env::set_var("FEEDHUB_BUFFER_BATCH_SIZE", "50");
        std::env::set_var("FEEDHUB_BUFFER_ENABLED", "maybe");
    }
    let err = AppConfig::from_env().expect_err("invalid flag");
    assert!(matches!(err, ConfigError::Invalid(key, value)
        if key == "FEEDHUB_BUFFER_ENABLED" && value == "maybe"));

    unsafe {
        std::env::set_var("FEEDHUB_BUFFER_ENABLED", "Yes");
    }
    let config = AppConfig::from_env().expect("config");
    assert!(config.buffer.enabled);
}
