#![no_main]

//! Fuzz target for concurrent container operations
//!
//! Tests that singletons stay unique and scoped instances stay per-scope
//! under concurrent resolution.

use arbitrary::Arbitrary;
use ioc_container::{Container, ResolutionContext};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use std::thread;

/// Service for concurrent testing
#[derive(Clone, Debug, Arbitrary)]
struct ConcurrentService {
    id: u64,
    data: Vec<u8>,
}

#[derive(Debug)]
struct SharedConfig {
    value: u32,
}

#[derive(Debug)]
struct RequestState {
    scope: u64,
}

/// Thread operation
#[derive(Debug, Clone, Arbitrary)]
enum ThreadOp {
    ResolveConfig,
    ResolveAll,
    CanResolve,
    ScopedInFreshScope,
    ScopedInSharedScope,
}

/// Concurrent test scenario
#[derive(Debug, Arbitrary)]
struct ConcurrentScenario {
    // Initial services to register
    initial_services: Vec<ConcurrentService>,
    // Number of threads (clamped to 1-8)
    thread_count: u8,
    // Operations per thread (clamped)
    ops_per_thread: Vec<ThreadOp>,
}

fuzz_target!(|scenario: ConcurrentScenario| {
    let mut builder = Container::builder();

    let mut registered = 0;
    for svc in scenario.initial_services.into_iter().take(10) {
        builder.singleton(svc);
        registered += 1;
    }

    builder.lazy(|| SharedConfig { value: 42 });
    builder
        .bind::<RequestState>()
        .to_factory(|ctx: &ResolutionContext<'_>| {
            Ok(Arc::new(RequestState {
                scope: ctx.scope().id(),
            }))
        })
        .as_scoped();

    let container = builder.build().unwrap();
    let shared_scope = container.scope();

    // Clamp thread count
    let thread_count = (scenario.thread_count % 8).max(1) as usize;
    let ops = scenario.ops_per_thread;

    let configs: Vec<Vec<Arc<SharedConfig>>> = thread::scope(|s| {
        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                let container = &container;
                let shared_scope = &shared_scope;
                let ops = ops.clone();
                s.spawn(move || {
                    let mut seen = Vec::new();
                    for op in ops.into_iter().take(50) {
                        match op {
                            ThreadOp::ResolveConfig => {
                                seen.push(container.resolve::<SharedConfig>().unwrap());
                            }
                            ThreadOp::ResolveAll => {
                                let all = container.resolve_all::<ConcurrentService>().unwrap();
                                assert_eq!(all.len(), registered);
                            }
                            ThreadOp::CanResolve => {
                                assert!(container.can_resolve::<SharedConfig>());
                                assert_eq!(
                                    container.can_resolve::<ConcurrentService>(),
                                    registered > 0
                                );
                            }
                            ThreadOp::ScopedInFreshScope => {
                                let scope = container.scope();
                                let state = scope.resolve::<RequestState>().unwrap();
                                assert_eq!(state.scope, scope.scope_id().id());
                            }
                            ThreadOp::ScopedInSharedScope => {
                                let state = shared_scope.resolve::<RequestState>().unwrap();
                                assert_eq!(state.scope, shared_scope.scope_id().id());
                            }
                        }
                    }
                    seen
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // Every thread saw the same singleton
    let first = container.resolve::<SharedConfig>().unwrap();
    assert_eq!(first.value, 42);
    for seen in configs.iter().flatten() {
        assert!(Arc::ptr_eq(seen, &first));
    }

    // The shared scope kept a single scoped instance
    let a = shared_scope.resolve::<RequestState>().unwrap();
    let b = shared_scope.resolve::<RequestState>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
});
