#![no_main]

//! Fuzz target for building and resolving containers
//!
//! Registers arbitrary mixes of bindings, then checks that resolution
//! agrees with how many registrations each key ended up with.

use arbitrary::Arbitrary;
use ioc_container::{
    Arguments, Constructible, Constructor, Container, DiError, ResolutionContext,
};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

/// Service types for fuzzing
#[derive(Clone, Debug, Arbitrary)]
struct SmallService {
    id: u32,
    name: String,
}

#[derive(Clone, Debug, Arbitrary)]
struct MediumService {
    id: u64,
    data: Vec<u8>,
}

#[allow(dead_code)]
struct Consumer {
    small: Arc<SmallService>,
    medium: Option<Arc<MediumService>>,
}

impl Constructible for Consumer {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::new("with_small", |args: &mut Arguments| {
                Ok(Consumer {
                    small: args.next()?,
                    medium: None,
                })
            })
            .param::<SmallService>("small"),
            Constructor::new("with_both", |args: &mut Arguments| {
                Ok(Consumer {
                    small: args.next()?,
                    medium: Some(args.next()?),
                })
            })
            .param::<SmallService>("small")
            .param::<MediumService>("medium"),
        ]
    }
}

/// Operations on the builder
#[derive(Debug, Arbitrary)]
enum BuildOp {
    SingletonSmall(SmallService),
    LazySmall,
    TransientSmall,
    ScopedSmall,
    KeyedSmall(bool),
    SingletonMedium(MediumService),
    Consumer,
}

/// Operations on the built container
#[derive(Debug, Arbitrary)]
enum ResolveOp {
    ResolveSmall,
    ResolveAllSmall,
    ResolveMedium,
    ResolveConsumer,
    CreateConsumer,
    CanResolveSmall,
    Scope,
    Compile,
    Descriptors,
}

#[derive(Debug, Arbitrary)]
struct Scenario {
    build: Vec<BuildOp>,
    resolve: Vec<ResolveOp>,
}

fuzz_target!(|scenario: Scenario| {
    let mut builder = Container::builder();

    // Track what we've registered
    let mut small = 0usize;
    let mut medium = 0usize;
    let mut consumers = 0usize;

    for op in scenario.build.into_iter().take(32) {
        match op {
            BuildOp::SingletonSmall(svc) => {
                builder.singleton(svc);
                small += 1;
            }
            BuildOp::LazySmall => {
                builder.lazy(|| SmallService {
                    id: 42,
                    name: "lazy".into(),
                });
                small += 1;
            }
            BuildOp::TransientSmall => {
                builder.transient(|| SmallService {
                    id: 0,
                    name: "transient".into(),
                });
                small += 1;
            }
            BuildOp::ScopedSmall => {
                builder
                    .bind::<SmallService>()
                    .to_factory(|ctx: &ResolutionContext<'_>| {
                        Ok(Arc::new(SmallService {
                            id: ctx.scope().id() as u32,
                            name: "scoped".into(),
                        }))
                    })
                    .as_scoped();
                small += 1;
            }
            BuildOp::KeyedSmall(primary) => {
                let key = if primary { "primary" } else { "secondary" };
                builder.bind::<SmallService>().with_key(key).to_instance(Arc::new(SmallService {
                    id: 7,
                    name: key.into(),
                }));
            }
            BuildOp::SingletonMedium(svc) => {
                builder.singleton(svc);
                medium += 1;
            }
            BuildOp::Consumer => {
                builder.bind::<Consumer>().to_self();
                consumers += 1;
            }
        }
    }

    // A second to_self binding of Consumer is a duplicate
    let container = match builder.build() {
        Ok(container) => {
            assert!(consumers <= 1);
            container
        }
        Err(err) => {
            assert!(consumers > 1);
            assert!(matches!(err, DiError::DuplicateRegistration { .. }));
            return;
        }
    };

    for op in scenario.resolve.into_iter().take(64) {
        match op {
            ResolveOp::ResolveSmall => match container.resolve::<SmallService>() {
                Ok(_) => assert_eq!(small, 1),
                Err(DiError::NoRegistrationFound { .. }) => assert_eq!(small, 0),
                Err(DiError::AmbiguousRegistration { count, .. }) => assert_eq!(count, small),
                Err(err) => panic!("unexpected error: {err}"),
            },
            ResolveOp::ResolveAllSmall => {
                let all = container.resolve_all::<SmallService>().unwrap();
                assert_eq!(all.len(), small);
            }
            ResolveOp::ResolveMedium => {
                assert_eq!(container.resolve::<MediumService>().is_ok(), medium == 1);
            }
            ResolveOp::ResolveConsumer => {
                let result = container.resolve::<Consumer>();
                if consumers == 0 {
                    assert!(result.is_err());
                } else if small == 1 && medium == 1 {
                    assert!(result.unwrap().medium.is_some());
                } else if small == 1 && medium == 0 {
                    assert!(result.unwrap().medium.is_none());
                } else {
                    assert!(result.is_err());
                }
            }
            ResolveOp::CreateConsumer => {
                let _ = container.create::<Consumer>();
            }
            ResolveOp::CanResolveSmall => {
                assert_eq!(container.can_resolve::<SmallService>(), small > 0);
            }
            ResolveOp::Scope => {
                let scope = container.scope();
                assert_eq!(scope.len(), container.len());
                let _ = scope.resolve::<SmallService>();
            }
            ResolveOp::Compile => {
                let _ = container.compile();
            }
            ResolveOp::Descriptors => {
                assert_eq!(container.descriptors().len(), container.len());
            }
        }
    }
});
