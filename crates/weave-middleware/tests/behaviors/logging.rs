use std::sync::{Arc, OnceLock};

use tracing_test::traced_test;
use weave_core::{
    Argument, CallContext, CallSite, FieldCatalog, InstanceFieldCache, InterceptorChain, LogLevel,
    LogCallsSettings, Logger,
    test_stubs::observability::{LogEntry, RecordingLogger},
};
use weave_middleware::{LogCallsAdvice, LoggerLookup};

use super::StoreError;

fn settings(message: Option<&str>) -> LogCallsSettings {
    LogCallsSettings {
        message: message.map(str::to_owned),
        ..LogCallsSettings::default()
    }
}

fn site() -> CallSite {
    CallSite::new("Orders", "place").with_parameters(["customer", "quantity"])
}

#[test]
fn successful_call_logs_entry_and_exit() {
    let site = site();
    let logger = Arc::new(RecordingLogger::new());
    let advice =
        LogCallsAdvice::new(&site, &settings(Some("{0} x{1}"))).with_logger(logger.clone());
    let chain = InterceptorChain::<u32, StoreError>::new().with_advice(advice);

    let quantity = 3;
    let call = CallContext::new(&site).with_arguments([
        Argument::text("customer", "ada"),
        Argument::debug("quantity", &quantity),
    ]);
    assert_eq!(chain.invoke(&call, || Ok(7)), Ok(7));

    assert_eq!(
        logger.messages_at(LogLevel::Info),
        vec!["Entering Orders.place\nada x3", "Leaving Orders.place"]
    );
}

#[test]
fn failed_call_logs_error_then_arguments_then_exit() {
    let site = site();
    let logger = Arc::new(RecordingLogger::new());
    let chain = InterceptorChain::<u32, StoreError>::new()
        .with_advice(LogCallsAdvice::new(&site, &settings(None)).with_logger(logger.clone()));

    let quantity = 3;
    let call = CallContext::new(&site).with_arguments([
        Argument::text("customer", "ada"),
        Argument::debug("quantity", &quantity),
    ]);
    assert_eq!(chain.invoke(&call, || Err(StoreError::OutOfStock)), Err(StoreError::OutOfStock));

    assert_eq!(
        logger.entries(),
        vec![
            LogEntry {
                level: LogLevel::Info,
                message: "Entering Orders.place".into(),
                error: None,
            },
            LogEntry {
                level: LogLevel::Error,
                message: "Error executing Orders.place".into(),
                error: Some("out of stock".into()),
            },
            LogEntry {
                level: LogLevel::Debug,
                message: "customer = ada".into(),
                error: None,
            },
            LogEntry {
                level: LogLevel::Debug,
                message: "quantity = 3".into(),
                error: None,
            },
            LogEntry {
                level: LogLevel::Info,
                message: "Leaving Orders.place with error: out of stock".into(),
                error: None,
            },
        ]
    );
}

#[test]
#[traced_test]
fn falls_back_to_tracing_when_no_logger_is_declared() {
    let site = CallSite::new("Inventory", "restock");
    let chain = InterceptorChain::<(), StoreError>::new()
        .with_advice(LogCallsAdvice::new(&site, &settings(None)));

    chain.invoke(&CallContext::new(&site), || Ok(())).expect("restocked");

    assert!(logs_contain("Entering Inventory.restock"));
    assert!(logs_contain("Leaving Inventory.restock"));
    assert!(logs_contain("Calls"));
}

struct Shop {
    logger: Arc<RecordingLogger>,
}

struct Warehouse;

fn shared_warehouse_log() -> &'static Arc<RecordingLogger> {
    static LOG: OnceLock<Arc<RecordingLogger>> = OnceLock::new();
    LOG.get_or_init(|| Arc::new(RecordingLogger::new()))
}

fn field_cache() -> &'static InstanceFieldCache {
    static CACHE: OnceLock<InstanceFieldCache> = OnceLock::new();
    CACHE.get_or_init(|| {
        let catalog = Arc::new(FieldCatalog::new());
        catalog
            .register::<Shop>()
            .instance_field::<Arc<dyn Logger>>("logger", |shop| {
                Some(Arc::clone(&shop.logger) as Arc<dyn Logger>)
            })
            .finish();
        catalog
            .register::<Warehouse>()
            .static_field::<Arc<dyn Logger>>("LOG", || {
                Some(Arc::clone(shared_warehouse_log()) as Arc<dyn Logger>)
            })
            .finish();
        InstanceFieldCache::new(catalog)
    })
}

#[test]
fn each_owner_logs_into_its_declared_logger() {
    let site = CallSite::of::<Shop>("checkout");
    let fallback = Arc::new(RecordingLogger::new());
    let lookup = LoggerLookup::with_cache(field_cache(), &site, fallback.clone());
    let chain = InterceptorChain::<(), StoreError>::new()
        .with_advice(LogCallsAdvice::new(&site, &settings(None)).with_loggers(lookup));

    let north = Arc::new(Shop {
        logger: Arc::new(RecordingLogger::new()),
    });
    let south = Arc::new(Shop {
        logger: Arc::new(RecordingLogger::new()),
    });

    chain
        .invoke(&CallContext::new(&site).with_owner(&north), || Ok(()))
        .expect("north");
    chain
        .invoke(&CallContext::new(&site).with_owner(&south), || Ok(()))
        .expect("south");
    chain
        .invoke(&CallContext::new(&site).with_owner(&north), || Ok(()))
        .expect("north again");
    chain.invoke(&CallContext::new(&site), || Ok(())).expect("ownerless");

    assert_eq!(north.logger.messages().len(), 4);
    assert_eq!(south.logger.messages().len(), 2);
    assert_eq!(
        fallback.messages(),
        vec!["Entering Shop.checkout", "Leaving Shop.checkout"]
    );
}

#[test]
fn static_logger_is_fixed_at_setup() {
    let site = CallSite::of::<Warehouse>("ship");
    let fallback = Arc::new(RecordingLogger::new());
    let lookup = LoggerLookup::with_cache(field_cache(), &site, fallback.clone());
    let chain = InterceptorChain::<(), StoreError>::new()
        .with_advice(LogCallsAdvice::new(&site, &settings(None)).with_loggers(lookup));

    chain.invoke(&CallContext::new(&site), || Ok(())).expect("shipped");

    assert!(fallback.is_empty());
    assert!(
        shared_warehouse_log()
            .messages()
            .contains(&"Entering Warehouse.ship".to_owned())
    );
}
