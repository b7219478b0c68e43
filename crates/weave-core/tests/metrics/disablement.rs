use tracing_test::traced_test;
use weave_core::{MetricDefinition, MetricKey, MetricKind};

use super::fresh_registry;

/// 创建失败后，后续解析不再触碰外部子系统，且只告警一次。
#[test]
#[traced_test]
fn failed_key_stays_disabled_without_new_attempts() {
    let (subsystem, registry) = fresh_registry();
    subsystem.deny_creation("locked");

    assert!(
        registry
            .resolve("locked", "calls", MetricKind::NumberOfItems)
            .is_none()
    );
    assert_eq!(subsystem.create_attempts(), 1);

    for _ in 0..1000 {
        assert!(
            registry
                .resolve("locked", "calls", MetricKind::NumberOfItems)
                .is_none()
        );
    }
    assert_eq!(subsystem.create_attempts(), 1);
    assert_eq!(subsystem.create_calls(), 0);
    assert!(registry.is_disabled("locked", "calls"));
    assert_eq!(registry.disabled_keys(), vec![MetricKey::new("locked", "calls")]);

    logs_assert(|lines: &[&str]| {
        let warnings = lines
            .iter()
            .filter(|line| line.contains("key disabled for the rest of the process"))
            .count();
        if warnings == 1 {
            Ok(())
        } else {
            Err(format!("expected one warning, saw {warnings}"))
        }
    });
    assert!(logs_contain("permission denied"));
}

/// 子系统恢复可用也不会让已禁用的键重新尝试创建。
#[test]
fn recovery_does_not_resurrect_a_disabled_key() {
    let (subsystem, registry) = fresh_registry();
    subsystem.set_unavailable(true);
    assert!(
        registry
            .resolve("jobs", "running", MetricKind::NumberOfItems)
            .is_none()
    );

    subsystem.set_unavailable(false);
    assert!(
        registry
            .resolve("jobs", "running", MetricKind::NumberOfItems)
            .is_none()
    );
    assert_eq!(subsystem.create_attempts(), 0);

    // 同一分类下的其他键不受影响。
    assert!(
        registry
            .resolve("jobs", "queued", MetricKind::NumberOfItems)
            .is_some()
    );
}

/// 外部分类中同名计数器的种类优先，本进程请求的种类不会覆盖它。
#[test]
fn external_kind_wins_over_requested_kind() {
    let (subsystem, registry) = fresh_registry();
    subsystem.seed_category(
        "jobs",
        vec![MetricDefinition::new("latency", MetricKind::NumberOfItems)],
    );

    let handle = registry
        .resolve("jobs", "latency", MetricKind::AverageTimer)
        .expect("handle");
    assert_eq!(handle.kind(), MetricKind::NumberOfItems);
    // 补充的基准计数器仍会触发一次加宽。
    assert_eq!(subsystem.create_calls(), 1);
    assert_eq!(
        subsystem.definitions("jobs"),
        Some(vec![
            MetricDefinition::new("latency", MetricKind::NumberOfItems),
            MetricDefinition::new("latencyBase", MetricKind::AverageBase),
        ])
    );
}

/// 进程内已建立的分类不再接受新计数器。
#[test]
fn unknown_counter_in_established_category_is_disabled() {
    let (subsystem, registry) = fresh_registry();
    registry
        .resolve("jobs", "running", MetricKind::NumberOfItems)
        .expect("handle");

    assert!(
        registry
            .resolve("jobs", "failed", MetricKind::NumberOfItems)
            .is_none()
    );
    assert_eq!(subsystem.create_attempts(), 1);
    assert_eq!(
        registry.disabled_keys(),
        vec![MetricKey::new("jobs", "failed")]
    );
}
