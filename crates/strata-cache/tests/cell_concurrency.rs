//! Concurrency behavior of deferred cells and post-compute caches.
//!
//! These tests exercise the guarantees that cannot be shown by
//! single-threaded unit tests: compute-once under racing callers, value
//! confinement during post-computation, recursive post-computation across
//! keys and across caches under a shared computation domain, and
//! cancellation of blocked waiters.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Barrier};

use once_cell::sync::OnceCell;
use std::thread;
use std::time::Duration;

use strata_cache::{ComputationDomain, DeferredCell, DomainRegistry, PostComputeCache};
use strata_common::{AnalysisError, CancellationToken, WorkerContext};

#[test]
fn test_racing_callers_compute_once() {
    const WORKERS: usize = 8;

    let computes = Arc::new(AtomicU32::new(0));
    let cache: Arc<PostComputeCache<u32, u32, ()>> = Arc::new(PostComputeCache::new(
        {
            let computes = Arc::clone(&computes);
            move |key, _ctx| {
                computes.fetch_add(1, Ordering::SeqCst);
                // Widen the race window.
                thread::sleep(Duration::from_millis(10));
                Ok((key * 2, ()))
            }
        },
        |_key, _value, (), _ctx| Ok(()),
    ));

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let ctx = WorkerContext::current_thread();
                cache.get(&21, &ctx)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().expect("thread completed"), Ok(42));
    }
    assert_eq!(computes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_waiters_only_observe_published_values() {
    let post_started = Arc::new(AtomicBool::new(false));
    let post_finished = Arc::new(AtomicBool::new(false));
    let cell: Arc<DeferredCell<u32, u32, ()>> = Arc::new(DeferredCell::new(
        1,
        |key, _ctx| Ok((*key, ())),
        {
            let post_started = Arc::clone(&post_started);
            let post_finished = Arc::clone(&post_finished);
            move |_key, _value, (), _ctx| {
                post_started.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                post_finished.store(true, Ordering::SeqCst);
                Ok(())
            }
        },
    ));

    let producer = {
        let cell = Arc::clone(&cell);
        thread::spawn(move || {
            let ctx = WorkerContext::current_thread();
            cell.get(&ctx)
        })
    };

    // A foreign worker must not see the value while post-compute runs.
    while !post_started.load(Ordering::SeqCst) {
        thread::yield_now();
    }
    assert_eq!(cell.get_if_computed(), None);

    let ctx = WorkerContext::current_thread();
    let observed = cell.get(&ctx);
    assert!(
        post_finished.load(Ordering::SeqCst),
        "a foreign worker returned before post-computation finished"
    );
    assert_eq!(observed, Ok(1));
    assert_eq!(producer.join().expect("thread completed"), Ok(1));
}

/// Two keys of one cache whose post-computations query each other from two
/// workers. With private locks this is the classic distributed deadlock
/// (each worker holds one key's lock and waits on the other); a shared
/// computation domain serializes both post-computations instead.
#[test]
fn test_recursive_post_compute_across_keys_in_one_cache() {
    let domain = ComputationDomain::new("mutual-keys");
    let posts = Arc::new(AtomicU32::new(0));
    let cache_slot: Arc<OnceCell<Arc<PostComputeCache<u32, u32, ()>>>> = Arc::new(OnceCell::new());

    let cache = Arc::new(PostComputeCache::in_domain(
        &domain,
        |key, _ctx| Ok((key * 10, ())),
        {
            let cache_slot = Arc::clone(&cache_slot);
            let posts = Arc::clone(&posts);
            move |key, _value, (), ctx| {
                posts.fetch_add(1, Ordering::SeqCst);
                let cache = cache_slot.get().expect("cache wired up").clone();

                // Reading our own in-flight value is allowed from the
                // post-computing worker.
                assert_eq!(cache.get(key, ctx)?, key * 10);

                // Querying the other key may recursively compute it on this
                // worker; the shared domain lock is reentrant.
                let other = if *key == 1 { 2 } else { 1 };
                assert_eq!(cache.get(&other, ctx)?, other * 10);
                Ok(())
            }
        },
    ));
    cache_slot.set(Arc::clone(&cache)).ok().expect("wired once");

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [1u32, 2u32]
        .into_iter()
        .map(|key| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let ctx = WorkerContext::current_thread();
                cache.get(&key, &ctx)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread completed"))
        .collect();

    assert_eq!(results, vec![Ok(10), Ok(20)]);
    // Each key is post-computed exactly once, on whichever worker won.
    assert_eq!(posts.load(Ordering::SeqCst), 2);
}

/// The same hazard across two caches: cache A's post-computation queries
/// cache B for the same key and vice versa. Confinement per cache would not
/// help here, which is why the domain lock is shared between both caches.
#[test]
fn test_recursive_post_compute_across_two_caches_sharing_a_domain() {
    type Cache = PostComputeCache<u32, u32, ()>;

    fn make_cache(
        domain: &ComputationDomain,
        base: u32,
        other: Arc<OnceCell<Arc<Cache>>>,
    ) -> Arc<Cache> {
        Arc::new(PostComputeCache::in_domain(
            domain,
            move |key, _ctx| Ok((base + key, ())),
            move |key, _value, (), ctx| {
                let other = other.get().expect("cache wired up").clone();
                other.get(key, ctx)?;
                Ok(())
            },
        ))
    }

    let registry = DomainRegistry::new();
    let domain = registry.domain("mutual-caches");

    let slot1: Arc<OnceCell<Arc<Cache>>> = Arc::new(OnceCell::new());
    let slot2: Arc<OnceCell<Arc<Cache>>> = Arc::new(OnceCell::new());
    let cache1 = make_cache(&domain, 100, Arc::clone(&slot2));
    let cache2 = make_cache(&domain, 200, Arc::clone(&slot1));
    slot1.set(Arc::clone(&cache1)).ok().expect("wired once");
    slot2.set(Arc::clone(&cache2)).ok().expect("wired once");

    let barrier = Arc::new(Barrier::new(2));
    let worker1 = {
        let cache1 = Arc::clone(&cache1);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            let ctx = WorkerContext::current_thread();
            cache1.get(&1, &ctx)
        })
    };
    let worker2 = {
        let cache2 = Arc::clone(&cache2);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            let ctx = WorkerContext::current_thread();
            cache2.get(&1, &ctx)
        })
    };

    assert_eq!(worker1.join().expect("thread completed"), Ok(101));
    assert_eq!(worker2.join().expect("thread completed"), Ok(201));

    // Both caches ended up fully populated through the cross-queries.
    assert_eq!(cache1.get_if_computed(&1), Some(101));
    assert_eq!(cache2.get_if_computed(&1), Some(201));
}

#[test]
fn test_cancelled_waiter_prefers_available_value_over_cancellation() {
    let cell: Arc<DeferredCell<u32, u32, ()>> = Arc::new(DeferredCell::new(
        1,
        |key, _ctx| {
            thread::sleep(Duration::from_millis(150));
            Ok((*key, ()))
        },
        |_key, _value, (), _ctx| Ok(()),
    ));

    let producer = {
        let cell = Arc::clone(&cell);
        thread::spawn(move || {
            let ctx = WorkerContext::current_thread();
            cell.get(&ctx)
        })
    };

    thread::sleep(Duration::from_millis(20));
    let token = CancellationToken::new();
    let waiter = {
        let cell = Arc::clone(&cell);
        let token = token.clone();
        thread::spawn(move || {
            let ctx = WorkerContext::with_token(token);
            cell.get(&ctx)
        })
    };

    thread::sleep(Duration::from_millis(20));
    token.cancel();

    // The waiter either observed cancellation while the producer was still
    // computing, or the value became available on the way out — never a
    // partial value, never a hang.
    let waited = waiter.join().expect("thread completed");
    assert!(
        waited == Err(AnalysisError::Cancelled) || waited == Ok(1),
        "unexpected waiter result: {waited:?}"
    );
    assert_eq!(producer.join().expect("thread completed"), Ok(1));

    // A later uncancelled caller always gets the published value.
    let ctx = WorkerContext::current_thread();
    assert_eq!(cell.get(&ctx), Ok(1));
}

#[test]
fn test_cancelled_computation_is_retried_by_later_callers() {
    let attempts = Arc::new(AtomicU32::new(0));
    let cache: Arc<PostComputeCache<u32, u32, ()>> = Arc::new(PostComputeCache::new(
        {
            let attempts = Arc::clone(&attempts);
            move |key, ctx| {
                attempts.fetch_add(1, Ordering::SeqCst);
                ctx.check_cancelled()?;
                Ok((*key, ()))
            }
        },
        |_key, _value, (), _ctx| Ok(()),
    ));

    let token = CancellationToken::new();
    token.cancel();
    let cancelled = WorkerContext::with_token(token);
    assert_eq!(cache.get(&9, &cancelled), Err(AnalysisError::Cancelled));
    assert_eq!(cache.get_if_computed(&9), None);

    let ctx = WorkerContext::current_thread();
    assert_eq!(cache.get(&9, &ctx), Ok(9));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}
