// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_fragment_is_all_defaults() {
    assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
}

#[test]
fn parses_nested_queue_settings() {
    let config = EngineConfig::from_toml_str(
        r#"
        cache_ttl = "7d"
        topic = "ci-events"

        [queue]
        default_task_timeout = "45m"

        [queue.unknown_event]
        max_attempts = 10
        delay = "500ms"
        "#,
    )
    .unwrap();
    assert_eq!(config.cache_ttl, Duration::from_secs(7 * 86400));
    assert_eq!(config.topic, "ci-events");
    assert_eq!(config.queue.default_task_timeout, Duration::from_secs(45 * 60));
    assert_eq!(config.queue.unknown_event.max_attempts, 10);
    assert_eq!(config.queue.unknown_event.delay, Duration::from_millis(500));
    assert_eq!(config.queue.retry, sk_queue::RetryPolicy::default());
}

#[yare::parameterized(
    bad_duration = { r#"cache_ttl = "soon""# },
    wrong_type   = { "topic = 3" },
    bad_suffix   = { r#"cache_ttl = "3w""# },
)]
fn rejects_invalid_fragment(raw: &str) {
    assert!(matches!(EngineConfig::from_toml_str(raw), Err(ConfigError::Parse(_))));
}
