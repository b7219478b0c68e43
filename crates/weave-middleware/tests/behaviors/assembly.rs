use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use weave_core::{
    Argument, ArgumentError, CallContext, CallSite, ConfigError, InMemorySubsystem, LogLevel,
    MetricRegistry, RegistryOptions, WeaveSettings,
    test_stubs::{observability::RecordingLogger, retry::RecordingPause, time::ManualClock},
};
use weave_middleware::{SiteAssembler, TypeLocks};

use super::StoreError;

const SETTINGS: &str = r#"
[sites."Warehouse.reserve"]
counters = [{ category = "warehouse", counter = "reservations", kind = "cumulative" }]

[sites."Warehouse.reserve".log_calls]

[sites."Warehouse.reserve".type_sync]
acquire_timeout_ms = 500

[sites."Warehouse.reserve".caching]
absolute_expiry_ms = 1000

[sites."Warehouse.reserve".retry]
max_retries = 3

[[sites."Warehouse.reserve".argument_checks]]
name = "sku"
reject_empty = true
"#;

struct Fixture {
    subsystem: Arc<InMemorySubsystem>,
    logger: Arc<RecordingLogger>,
    assembler: SiteAssembler,
}

fn fixture() -> Fixture {
    let subsystem = Arc::new(InMemorySubsystem::new());
    let registry = Arc::new(MetricRegistry::new(
        subsystem.clone(),
        RegistryOptions::default().with_instance_label("assembly"),
    ));
    let logger = Arc::new(RecordingLogger::new());
    let assembler = SiteAssembler::new(registry)
        .with_logger(logger.clone())
        .with_pause(Arc::new(RecordingPause::new()))
        .with_clock(Arc::new(ManualClock::new()))
        .with_type_locks(Arc::new(TypeLocks::new()));
    Fixture {
        subsystem,
        logger,
        assembler,
    }
}

#[test]
fn assembled_chain_nests_behaviors_in_a_fixed_order() {
    let Fixture {
        subsystem,
        logger,
        assembler,
    } = fixture();
    let settings = WeaveSettings::from_toml_str(SETTINGS).expect("valid settings");
    let site = CallSite::new("Warehouse", "reserve").with_parameters(["sku"]);
    let chain = assembler
        .assemble::<u32, StoreError>(&site, settings.site("Warehouse.reserve").expect("site"))
        .expect("chain assembles");
    assert_eq!(chain.len(), 6);

    let attempts = AtomicU32::new(0);
    let reserve = |sku: Option<&str>| {
        let call = CallContext::new(&site).with_argument(Argument::optional_text("sku", sku));
        chain.invoke(&call, || {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StoreError::Timeout)
            } else {
                Ok(40)
            }
        })
    };

    // Retry is innermost: three attempts, one count, one entry/exit pair.
    assert_eq!(reserve(Some("A1")), Ok(40));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(subsystem.value("warehouse", "reservations", "assembly"), 1);
    assert_eq!(
        logger.messages_at(LogLevel::Info),
        vec![
            "Entering Warehouse.reserve",
            "Warehouse.reserve: attempt 1 of 3 failed, retrying",
            "Warehouse.reserve: attempt 2 of 3 failed, retrying",
            "Leaving Warehouse.reserve",
        ]
    );

    // A cache hit still counts but never reaches the retry loop.
    assert_eq!(reserve(Some("A1")), Ok(40));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(subsystem.value("warehouse", "reservations", "assembly"), 2);

    // A rejected argument is neither counted nor attempted.
    assert_eq!(
        reserve(None),
        Err(StoreError::Invalid(ArgumentError::Null {
            site: "Warehouse.reserve".into(),
            name: "sku".into(),
        }))
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(subsystem.value("warehouse", "reservations", "assembly"), 2);
}

#[test]
fn invalid_site_settings_fail_assembly() {
    let Fixture { assembler, .. } = fixture();
    let settings = WeaveSettings::from_toml_str(SETTINGS).expect("valid settings");
    let site = CallSite::new("Warehouse", "reserve").with_parameters(["item"]);

    let err = assembler
        .assemble::<u32, StoreError>(&site, settings.site("Warehouse.reserve").expect("site"))
        .expect_err("sku is not a parameter of this site");
    assert!(matches!(err, ConfigError::UnknownArgument { .. }));
}
