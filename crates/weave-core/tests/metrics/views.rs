use std::{sync::Arc, thread};

use proptest::prelude::*;
use weave_core::{MetricKind, OVERALL_LABEL};

use super::{INSTANCE, fresh_registry};

#[test]
fn every_mutation_lands_in_both_views() {
    let (subsystem, registry) = fresh_registry();
    let handle = registry
        .resolve("jobs", "running", MetricKind::NumberOfItems)
        .expect("handle");

    handle.increment_by(4);
    handle.decrement_by(1);

    assert_eq!(subsystem.value("jobs", "running", INSTANCE), 3);
    assert_eq!(subsystem.value("jobs", "running", OVERALL_LABEL), 3);
    assert_eq!(&*handle.instance_label(), INSTANCE);
    assert_eq!(handle.overall_label(), OVERALL_LABEL);
}

/// 改名与并发修改交错时，每次修改恰好写入一个实例视图，汇总视图不丢失任何一次。
#[test]
fn relabel_under_concurrent_mutation_never_loses_updates() {
    const WRITERS: usize = 8;
    const ROUNDS: i64 = 2_000;
    let (subsystem, registry) = fresh_registry();
    let handle = registry
        .resolve("jobs", "running", MetricKind::NumberOfItems)
        .expect("handle");

    let writers: Vec<_> = (0..WRITERS)
        .map(|_| {
            let handle = Arc::clone(&handle);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    handle.increment();
                }
            })
        })
        .collect();

    let relabeler = {
        let handle = Arc::clone(&handle);
        thread::spawn(move || {
            for round in 0..50 {
                let label = if round % 2 == 0 { "blue" } else { INSTANCE };
                handle.relabel(label).expect("relabel");
                thread::yield_now();
            }
        })
    };

    for writer in writers {
        writer.join().expect("writer panicked");
    }
    relabeler.join().expect("relabeler panicked");

    let total = WRITERS as i64 * ROUNDS;
    assert_eq!(handle.overall_value(), total);
    assert_eq!(
        subsystem.value("jobs", "running", INSTANCE) + subsystem.value("jobs", "running", "blue"),
        total
    );
    assert_eq!(subsystem.value("jobs", "running", OVERALL_LABEL), total);
}

#[test]
fn custom_overall_label_is_honored() {
    let subsystem = Arc::new(weave_core::InMemorySubsystem::new());
    let registry = weave_core::MetricRegistry::new(
        subsystem.clone(),
        weave_core::RegistryOptions::default()
            .with_instance_label("a")
            .with_overall_label("all"),
    );
    let handle = registry
        .resolve("jobs", "running", MetricKind::NumberOfItems)
        .expect("handle");
    handle.increment_by(2);
    assert_eq!(subsystem.value("jobs", "running", "all"), 2);
    assert_eq!(subsystem.value("jobs", "running", OVERALL_LABEL), 0);
}

proptest! {
    /// 任意步长序列之后，两个视图都等于步长之和。
    #[test]
    fn views_track_the_sum_of_steps(
        steps in proptest::collection::vec(-1_000i64..1_000, 0..64),
    ) {
        let (_subsystem, registry) = fresh_registry();
        let handle = registry
            .resolve("prop", "sum", MetricKind::NumberOfItems)
            .expect("handle");
        for step in &steps {
            handle.increment_by(*step);
        }
        let expected: i64 = steps.iter().sum();
        prop_assert_eq!(handle.instance_value(), expected);
        prop_assert_eq!(handle.overall_value(), expected);
    }
}
