use std::{
    sync::{
        Arc, Barrier,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc,
    },
    thread,
};

use weave_core::{CallContext, CallSite, InterceptorChain, TypeSyncSettings};
use weave_middleware::{TypeLocks, TypeSyncInterceptor};

use super::StoreError;

struct Register;

fn synced(
    method: &'static str,
    timeout_ms: Option<u64>,
    locks: &TypeLocks,
) -> (CallSite, InterceptorChain<u32, StoreError>) {
    let site = CallSite::of::<Register>(method);
    let settings = TypeSyncSettings {
        acquire_timeout_ms: timeout_ms,
    };
    let chain = InterceptorChain::new().with(TypeSyncInterceptor::new(&site, &settings, locks));
    (site, chain)
}

#[test]
fn calls_on_one_type_never_overlap() {
    const THREADS: usize = 6;
    const CALLS: usize = 50;

    let locks = TypeLocks::new();
    let sites = Arc::new([synced("open", None, &locks), synced("close", None, &locks)]);
    let inside = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|worker| {
            let sites = Arc::clone(&sites);
            let inside = Arc::clone(&inside);
            let overlaps = Arc::clone(&overlaps);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for call in 0..CALLS {
                    let (site, chain) = &sites[(worker + call) % 2];
                    let result = chain.invoke(&CallContext::new(site), || {
                        if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok(1)
                    });
                    assert_eq!(result, Ok(1));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker panicked");
    }

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(locks.len(), 1);
}

#[test]
fn call_is_skipped_when_the_lock_times_out() {
    let locks = TypeLocks::new();
    let (holder_site, holder) = synced("audit", None, &locks);
    let (waiter_site, waiter) = synced("total", Some(20), &locks);
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let executed = AtomicBool::new(false);

    thread::scope(|scope| {
        let holding = scope.spawn(move || {
            holder.invoke(&CallContext::new(&holder_site), || {
                entered_tx.send(()).expect("main thread listening");
                release_rx.recv().expect("release signal");
                Ok(7)
            })
        });

        entered_rx.recv().expect("holder entered");
        let skipped = waiter.invoke(&CallContext::new(&waiter_site), || {
            executed.store(true, Ordering::SeqCst);
            Ok(9)
        });
        assert_eq!(skipped, Ok(0));
        assert!(!executed.load(Ordering::SeqCst));

        release_tx.send(()).expect("holder waiting");
        assert_eq!(holding.join().expect("holder panicked"), Ok(7));
    });

    let resumed = waiter.invoke(&CallContext::new(&waiter_site), || Ok(9));
    assert_eq!(resumed, Ok(9));
}

#[test]
fn nested_calls_on_the_same_thread_reenter_the_lock() {
    let locks = TypeLocks::new();
    let (outer_site, outer) = synced("settle", Some(50), &locks);
    let (inner_site, inner) = synced("post", Some(50), &locks);

    let result = outer.invoke(&CallContext::new(&outer_site), || {
        let posted = inner.invoke(&CallContext::new(&inner_site), || Ok(5))?;
        Ok(posted + 1)
    });
    assert_eq!(result, Ok(6));
}

#[test]
fn different_types_do_not_block_each_other() {
    struct Drawer;

    let locks = TypeLocks::new();
    let (register_site, register) = synced("open", None, &locks);
    let drawer_site = CallSite::of::<Drawer>("count");
    let settings = TypeSyncSettings {
        acquire_timeout_ms: Some(10),
    };
    let drawer: InterceptorChain<u32, StoreError> =
        InterceptorChain::new().with(TypeSyncInterceptor::new(&drawer_site, &settings, &locks));

    let result = register.invoke(&CallContext::new(&register_site), || {
        drawer.invoke(&CallContext::new(&drawer_site), || Ok(3))
    });
    assert_eq!(result, Ok(3));
    assert_eq!(locks.len(), 2);
}
