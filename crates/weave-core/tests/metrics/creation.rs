use std::{
    sync::{Arc, Barrier},
    thread,
};

use weave_core::{MetricDefinition, MetricKind};

use super::fresh_registry;

/// 并发首次解析同一个键：外部只创建一次，所有线程拿到同一个句柄。
#[test]
fn concurrent_first_resolution_creates_once() {
    const THREADS: usize = 16;
    let (subsystem, registry) = fresh_registry();
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.resolve("checkout", "orders", MetricKind::NumberOfItems)
            })
        })
        .collect();

    let handles: Vec<_> = workers
        .into_iter()
        .map(|worker| worker.join().expect("worker panicked").expect("handle"))
        .collect();

    assert_eq!(subsystem.create_calls(), 1);
    assert_eq!(subsystem.create_attempts(), 1);
    assert!(handles.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));

    for handle in &handles {
        handle.increment();
    }
    assert_eq!(handles[0].overall_value(), THREADS as i64);
}

/// 外部已存在的分类只会被加宽，其他进程定义的计数器保留下来。
#[test]
fn existing_external_category_is_widened_not_narrowed() {
    let (subsystem, registry) = fresh_registry();
    subsystem.seed_category(
        "checkout",
        vec![
            MetricDefinition::new("refunds", MetricKind::NumberOfItems),
            MetricDefinition::new("latency", MetricKind::AverageTimer),
            MetricDefinition::new("latencyBase", MetricKind::AverageBase),
        ],
    );

    let handle = registry
        .resolve("checkout", "orders", MetricKind::NumberOfItems)
        .expect("handle");
    assert_eq!(handle.key().to_string(), "checkout/orders");
    assert_eq!(subsystem.create_calls(), 1);

    let names: Vec<String> = subsystem
        .definitions("checkout")
        .expect("category")
        .iter()
        .map(|definition| definition.name().to_owned())
        .collect();
    assert_eq!(names, ["refunds", "latency", "latencyBase", "orders"]);

    // 其他进程定义的计数器在本进程同样可以解析，不再触发创建。
    assert!(
        registry
            .resolve("checkout", "refunds", MetricKind::NumberOfItems)
            .is_some()
    );
    assert_eq!(subsystem.create_calls(), 1);
}

/// 外部分类已包含请求的计数器时不需要重建。
#[test]
fn complete_external_category_is_reused_as_is() {
    let (subsystem, registry) = fresh_registry();
    subsystem.seed_category(
        "checkout",
        vec![MetricDefinition::new("orders", MetricKind::NumberOfItems)],
    );

    assert!(
        registry
            .resolve("checkout", "orders", MetricKind::NumberOfItems)
            .is_some()
    );
    assert_eq!(subsystem.create_attempts(), 0);
}

/// 平均耗时计数器会带出配对的基准计数器。
#[test]
fn average_timer_materializes_its_base_counter() {
    let (subsystem, registry) = fresh_registry();
    registry
        .resolve("checkout", "latency", MetricKind::AverageTimer)
        .expect("timer");

    let definitions = registry.definitions("checkout").expect("category");
    assert_eq!(
        definitions,
        vec![
            MetricDefinition::new("latency", MetricKind::AverageTimer),
            MetricDefinition::new("latencyBase", MetricKind::AverageBase),
        ]
    );
    assert_eq!(subsystem.definitions("checkout"), Some(definitions));

    let base = registry
        .resolve("checkout", "latencyBase", MetricKind::AverageBase)
        .expect("base handle");
    assert_eq!(base.kind(), MetricKind::AverageBase);
}
