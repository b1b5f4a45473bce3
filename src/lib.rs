//! # ioc-container - Constructor-Selecting Dependency Injection for Rust
//!
//! An inversion-of-control container that builds services by choosing among
//! their constructors, wiring each parameter from the container's bindings.
//!
//! ## Features
//!
//! - **Constructor selection** - the constructor resolving the most
//!   parameters wins; an explicit `inject()` marker overrides selection
//! - **Compiled plans** - each binding is compiled once into a reusable
//!   construction plan, lazily or eagerly with `verify_on_build`
//! - **Lifetimes** - transient, singleton (race-safe, one stored instance)
//!   and per-scope instances
//! - **Keys and collections** - keyed bindings, multiple bindings per
//!   service, `Vec<Arc<T>>` parameters
//! - **Trait objects** - bind `dyn Trait` services to implementations
//! - **Diagnostics** - errors name every constructor, parameter and the
//!   chain of dependencies that led to a failure
//! - **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use ioc_container::{Arguments, Constructible, Constructor, Container};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! impl Constructible for UserService {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![
//!             Constructor::new("new", |args: &mut Arguments| {
//!                 Ok(UserService { db: args.next()? })
//!             })
//!             .param::<Database>("db"),
//!         ]
//!     }
//! }
//!
//! let mut builder = Container::builder();
//! builder.singleton(Database { url: "postgres://localhost".into() });
//! builder.bind::<UserService>().to_self();
//! let container = builder.build().unwrap();
//!
//! let users = container.resolve::<UserService>().unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Service Lifetimes
//!
//! ```rust
//! use ioc_container::Container;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static COUNTER: AtomicU64 = AtomicU64::new(0);
//!
//! struct Config { debug: bool }
//! struct Cache;
//! struct RequestId(u64);
//!
//! let mut builder = Container::builder();
//!
//! // Singleton - one instance, shared everywhere
//! builder.singleton(Config { debug: true });
//!
//! // Lazy singleton - created on first access
//! builder.lazy(|| Cache);
//!
//! // Transient - new instance every time
//! builder.transient(|| RequestId(COUNTER.fetch_add(1, Ordering::SeqCst)));
//!
//! let container = builder.build().unwrap();
//! let a = container.resolve::<RequestId>().unwrap();
//! let b = container.resolve::<RequestId>().unwrap();
//! assert_ne!(a.0, b.0);
//! ```
//!
//! ## Scopes
//!
//! ```rust
//! use ioc_container::Container;
//!
//! struct AppConfig { name: String }
//! struct RequestContext { id: String }
//!
//! let mut builder = Container::builder();
//! builder.singleton(AppConfig { name: "MyApp".into() });
//! let root = builder.build().unwrap();
//!
//! // Per-request scope with its own bindings layered over the root's
//! let request = root
//!     .scope_with(|b| {
//!         b.singleton(RequestContext { id: "req-123".into() });
//!     })
//!     .unwrap();
//!
//! assert!(request.contains::<AppConfig>());
//! assert!(request.contains::<RequestContext>());
//! assert!(!root.contains::<RequestContext>());
//! ```

// Lets generated code refer to `::ioc_container` inside this crate's own tests.
extern crate self as ioc_container;

mod builder;
mod cell;
mod container;
mod context;
mod error;
mod factory;
mod instance;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod metadata;
mod provider;
mod registration;
mod scope;
mod storage;

pub use builder::{BindingBuilder, BindingOptions, ContainerBuilder, Module};
pub use cell::SetOnce;
pub use container::Container;
pub use context::{BuildContext, ResolutionContext, Resolver};
pub use error::*;
pub use factory::{Creator, FactoryCreator, InstanceCreator, Plan, TypeCreator};
pub use instance::Instance;
pub use key::Key;
pub use metadata::{Arguments, Constructible, Constructor, Parameter};
pub use provider::*;
pub use registration::{Registration, RegistrationCollection, ServiceDescriptor};
pub use scope::{Scope, ScopeBuilder};

#[cfg(feature = "derive")]
pub use ioc_container_derive::Constructible;

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Arguments, Constructible, Constructor, Container, ContainerBuilder, DiError, Injectable,
        Key, Lifetime, Module, ResolutionContext, Resolver, Result, Scope, implements,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, Mutex};

    struct Database {
        url: String,
    }

    struct UserService {
        db: Arc<Database>,
    }

    impl Constructible for UserService {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new("new", |args: &mut Arguments| {
                    Ok(UserService { db: args.next()? })
                })
                .param::<Database>("db"),
            ]
        }
    }

    #[test]
    fn test_single_constructor_built_from_dependencies() {
        let mut builder = Container::builder();
        builder.singleton(Database { url: "test".into() });
        builder.bind::<UserService>().to_self();
        let container = builder.build().unwrap();

        let users = container.resolve::<UserService>().unwrap();
        let db = container.resolve::<Database>().unwrap();
        assert_eq!(users.db.url, "test");
        assert!(Arc::ptr_eq(&users.db, &db));
    }

    // -------------------------------------------------------------------------
    // Constructor selection
    // -------------------------------------------------------------------------

    struct X;
    struct Y;

    struct Picked(&'static str);

    impl Constructible for Picked {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new("a", |args: &mut Arguments| {
                    args.next::<X>()?;
                    Ok(Picked("a"))
                })
                .param::<X>("x"),
                Constructor::new("b", |args: &mut Arguments| {
                    args.next::<X>()?;
                    args.next::<Y>()?;
                    Ok(Picked("b"))
                })
                .param::<X>("x")
                .param::<Y>("y"),
            ]
        }
    }

    #[test]
    fn test_constructor_with_most_resolved_parameters_wins() {
        let mut builder = Container::builder();
        builder.singleton(X).singleton(Y);
        builder.bind::<Picked>().to_self();
        let container = builder.build().unwrap();

        assert_eq!(container.resolve::<Picked>().unwrap().0, "b");
    }

    #[test]
    fn test_selection_falls_back_when_dependency_missing() {
        let mut builder = Container::builder();
        builder.singleton(X);
        builder.bind::<Picked>().to_self();
        let container = builder.build().unwrap();

        assert_eq!(container.resolve::<Picked>().unwrap().0, "a");
    }

    #[test]
    fn test_two_marked_constructors_build_nothing() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);

        struct Marked;

        impl Constructible for Marked {
            fn constructors() -> Vec<Constructor<Self>> {
                let build = |_: &mut Arguments| {
                    BUILT.fetch_add(1, Ordering::SeqCst);
                    Ok(Marked)
                };
                vec![
                    Constructor::new("first", build).inject(),
                    Constructor::new("second", build).inject(),
                ]
            }
        }

        let mut builder = Container::builder();
        builder.bind::<Marked>().to_self();
        let container = builder.build().unwrap();

        let err = container.resolve::<Marked>().err().unwrap();
        assert!(matches!(err, DiError::AmbiguousConstructorDirective { .. }));
        assert!(err.to_string().contains("first, second"));
        assert_eq!(BUILT.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_marked_constructor_with_unresolvable_parameter() {
        struct Strict;

        impl Constructible for Strict {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![
                    Constructor::new("lenient", |_: &mut Arguments| Ok(Strict)),
                    Constructor::new("strict", |args: &mut Arguments| {
                        args.next::<Y>()?;
                        Ok(Strict)
                    })
                    .param::<Y>("needed")
                    .inject(),
                ]
            }
        }

        let mut builder = Container::builder();
        builder.bind::<Strict>().to_self();
        let container = builder.build().unwrap();

        let err = container.resolve::<Strict>().err().unwrap();
        match &err {
            DiError::UnresolvableMarkedConstructor {
                constructor,
                parameter,
                ..
            } => {
                assert_eq!(*constructor, "strict");
                assert_eq!(parameter.name, "needed");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("parameter 'needed'"));
    }

    #[test]
    fn test_no_usable_constructor_lists_everything() {
        let container = Container::new();
        let err = container.create::<Picked>().err().unwrap();

        let DiError::NoUsableConstructor { constructors, .. } = &err else {
            panic!("expected NoUsableConstructor, got {err}");
        };
        assert_eq!(constructors.len(), 2);
        assert_eq!(constructors[1].parameters.len(), 2);
        assert!(constructors.iter().all(|c| !c.is_usable()));

        let message = err.to_string();
        assert!(message.contains("a(x: "));
        assert!(message.contains("b(x: "));
        assert!(message.contains("NOT RESOLVED, no default"));
    }

    #[test]
    fn test_default_value_used_when_unregistered() {
        #[derive(Default)]
        struct Options {
            retries: u32,
        }

        struct Client {
            options: Arc<Options>,
        }

        impl Constructible for Client {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![
                    Constructor::new("new", |args: &mut Arguments| {
                        Ok(Client {
                            options: args.next()?,
                        })
                    })
                    .param_or_default::<Options>("options"),
                ]
            }
        }

        let container = Container::new();
        assert_eq!(container.create::<Client>().unwrap().options.retries, 0);

        let mut builder = Container::builder();
        builder.singleton(Options { retries: 5 });
        let container = builder.build().unwrap();
        assert_eq!(container.create::<Client>().unwrap().options.retries, 5);
    }

    // -------------------------------------------------------------------------
    // Lifetimes
    // -------------------------------------------------------------------------

    #[test]
    fn test_transient_constructs_every_time() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);

        struct Fresh;

        impl Constructible for Fresh {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![Constructor::new("new", |_: &mut Arguments| {
                    BUILT.fetch_add(1, Ordering::SeqCst);
                    Ok(Fresh)
                })]
            }
        }

        let mut builder = Container::builder();
        builder.bind::<Fresh>().to_self();
        let container = builder.build().unwrap();

        for _ in 0..5 {
            container.resolve::<Fresh>().unwrap();
        }
        assert_eq!(BUILT.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_singleton_constructs_once() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);

        struct Shared;

        impl Constructible for Shared {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![Constructor::new("new", |_: &mut Arguments| {
                    BUILT.fetch_add(1, Ordering::SeqCst);
                    Ok(Shared)
                })]
            }
        }

        let mut builder = Container::builder();
        builder.bind::<Shared>().to_self().as_singleton();
        let container = builder.build().unwrap();

        let first = container.resolve::<Shared>().unwrap();
        for _ in 0..5 {
            assert!(Arc::ptr_eq(&first, &container.resolve::<Shared>().unwrap()));
        }
        assert!(Arc::ptr_eq(&first, &container.scope().resolve::<Shared>().unwrap()));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_resolution_shares_one_instance() {
        struct Slow;

        impl Constructible for Slow {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![Constructor::new("new", |_: &mut Arguments| {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                    Ok(Slow)
                })]
            }
        }

        const THREADS: usize = 8;

        let mut builder = Container::builder();
        builder.bind::<Slow>().to_self().as_singleton();
        let container = builder.build().unwrap();

        let barrier = Barrier::new(THREADS);
        let results = Mutex::new(Vec::with_capacity(THREADS));

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    let instance = container.resolve::<Slow>().unwrap();
                    results.lock().unwrap().push(instance);
                });
            }
        });

        let results = results.into_inner().unwrap();
        assert_eq!(results.len(), THREADS);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert!(Arc::ptr_eq(&results[0], &container.resolve::<Slow>().unwrap()));
    }

    #[test]
    fn test_concurrent_scoped_first_access() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);

        struct RequestState;

        const THREADS: usize = 8;

        let mut builder = Container::builder();
        builder
            .bind::<RequestState>()
            .to_factory(|_: &ResolutionContext<'_>| {
                BUILT.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(5));
                Ok(Arc::new(RequestState))
            })
            .as_scoped();
        let container = builder.build().unwrap();
        let scope = container.scope();

        let barrier = Barrier::new(THREADS);
        let results = Mutex::new(Vec::with_capacity(THREADS));

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    let instance = scope.resolve::<RequestState>().unwrap();
                    results.lock().unwrap().push(instance);
                });
            }
        });

        let results = results.into_inner().unwrap();
        assert_eq!(results.len(), THREADS);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert!(Arc::ptr_eq(&results[0], &scope.resolve::<RequestState>().unwrap()));
        assert!(BUILT.load(Ordering::SeqCst) >= 1);

        // Another scope gets its own instance
        let other = container.scope().resolve::<RequestState>().unwrap();
        assert!(!Arc::ptr_eq(&other, &results[0]));
    }

    #[test]
    fn test_scoped_instance_per_scope() {
        struct RequestState;

        impl Constructible for RequestState {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![Constructor::new("new", |_: &mut Arguments| Ok(RequestState))]
            }
        }

        let mut builder = Container::builder();
        builder.bind::<RequestState>().to_self().as_scoped();
        let root = builder.build().unwrap();

        let first = root.scope();
        let second = root.scope();

        let a1 = first.resolve::<RequestState>().unwrap();
        let a2 = first.resolve::<RequestState>().unwrap();
        let b = second.resolve::<RequestState>().unwrap();
        let r = root.resolve::<RequestState>().unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert!(!Arc::ptr_eq(&a1, &r));
    }

    // -------------------------------------------------------------------------
    // Registrations
    // -------------------------------------------------------------------------

    trait Handler: Send + Sync {
        fn name(&self) -> &'static str;
    }

    struct LoginHandler;
    struct LogoutHandler;

    impl Handler for LoginHandler {
        fn name(&self) -> &'static str {
            "login"
        }
    }

    impl Handler for LogoutHandler {
        fn name(&self) -> &'static str {
            "logout"
        }
    }

    impl Constructible for LoginHandler {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new("new", |_: &mut Arguments| Ok(LoginHandler))]
        }
    }

    impl Constructible for LogoutHandler {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new("new", |_: &mut Arguments| Ok(LogoutHandler))]
        }
    }

    implements!(LoginHandler => dyn Handler);
    implements!(LogoutHandler => dyn Handler);

    struct Router {
        handlers: Vec<Arc<dyn Handler>>,
    }

    impl Constructible for Router {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new("new", |args: &mut Arguments| {
                    Ok(Router {
                        handlers: args.next_all()?,
                    })
                })
                .collection_param::<dyn Handler>("handlers"),
            ]
        }
    }

    fn handler_container() -> Container {
        let mut builder = Container::builder();
        builder.bind::<dyn Handler>().to::<LoginHandler>();
        builder.bind::<dyn Handler>().to::<LogoutHandler>();
        builder.bind::<Router>().to_self();
        builder.build().unwrap()
    }

    #[test]
    fn test_ambiguous_single_resolve_but_collection_works() {
        let container = handler_container();

        let err = container.resolve::<dyn Handler>().err().unwrap();
        assert!(matches!(err, DiError::AmbiguousRegistration { count: 2, .. }));
        assert!(container.can_resolve::<dyn Handler>());

        let names: Vec<_> = container
            .resolve_all::<dyn Handler>()
            .unwrap()
            .iter()
            .map(|h| h.name())
            .collect();
        assert_eq!(names, ["login", "logout"]);
    }

    #[test]
    fn test_collection_parameter_receives_every_binding() {
        let container = handler_container();
        let router = container.resolve::<Router>().unwrap();
        assert_eq!(router.handlers.len(), 2);

        let empty = Container::new().create::<Router>().unwrap();
        assert!(empty.handlers.is_empty());
    }

    #[test]
    fn test_instance_binding_is_never_copied() {
        let db = Arc::new(Database { url: "shared".into() });

        let mut builder = Container::builder();
        builder.bind::<Database>().to_instance(Arc::clone(&db));
        let container = builder.build().unwrap();

        assert!(Arc::ptr_eq(&db, &container.resolve::<Database>().unwrap()));
        assert!(Arc::ptr_eq(&db, &container.scope().resolve::<Database>().unwrap()));
    }

    #[test]
    fn test_keyed_parameters() {
        struct Replicated {
            primary: Arc<Database>,
            replica: Arc<Database>,
        }

        impl Constructible for Replicated {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![
                    Constructor::new("new", |args: &mut Arguments| {
                        Ok(Replicated {
                            primary: args.next()?,
                            replica: args.next()?,
                        })
                    })
                    .keyed_param::<Database>("primary", "primary")
                    .keyed_param::<Database>("replica", "replica"),
                ]
            }
        }

        let mut builder = Container::builder();
        builder
            .bind::<Database>()
            .with_key("primary")
            .to_instance(Arc::new(Database { url: "db-1".into() }));
        builder
            .bind::<Database>()
            .with_key("replica")
            .to_instance(Arc::new(Database { url: "db-2".into() }));
        let container = builder.build().unwrap();

        let replicated = container.create::<Replicated>().unwrap();
        assert_eq!(replicated.primary.url, "db-1");
        assert_eq!(replicated.replica.url, "db-2");
        assert!(!container.can_resolve::<Database>());
    }

    // -------------------------------------------------------------------------
    // Failures
    // -------------------------------------------------------------------------

    struct Baz;

    struct Bar;

    impl Constructible for Bar {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new("new", |args: &mut Arguments| {
                    args.next::<Baz>()?;
                    Ok(Bar)
                })
                .param::<Baz>("baz"),
            ]
        }
    }

    struct Foo;

    impl Constructible for Foo {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new("new", |args: &mut Arguments| {
                    args.next::<Bar>()?;
                    Ok(Foo)
                })
                .param::<Bar>("bar"),
            ]
        }
    }

    #[test]
    fn test_dependency_failure_names_the_chain() {
        let mut builder = Container::builder();
        builder.bind::<Foo>().to_self();
        builder.bind::<Bar>().to_self();
        let container = builder.build().unwrap();

        let err = container.resolve::<Foo>().err().unwrap();
        let message = err.to_string();

        assert!(message.contains("required by parameter 'bar'"));
        assert!(message.contains(std::any::type_name::<Foo>()));
        assert!(message.contains(&format!(
            "Unable to find a constructor for type {}",
            std::any::type_name::<Bar>()
        )));
        assert!(matches!(err.root_cause(), DiError::NoUsableConstructor { .. }));
        assert_eq!(
            err.dependency_path(),
            vec![(std::any::type_name::<Foo>(), "bar")]
        );
    }

    #[test]
    fn test_circular_dependency_detected() {
        struct Left;
        struct Right;

        impl Constructible for Left {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![
                    Constructor::new("new", |args: &mut Arguments| {
                        args.next::<Right>()?;
                        Ok(Left)
                    })
                    .param::<Right>("right"),
                ]
            }
        }

        impl Constructible for Right {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![
                    Constructor::new("new", |args: &mut Arguments| {
                        args.next::<Left>()?;
                        Ok(Right)
                    })
                    .param::<Left>("left"),
                ]
            }
        }

        let mut builder = Container::builder();
        builder.bind::<Left>().to_self();
        builder.bind::<Right>().to_self();
        let container = builder.build().unwrap();

        let err = container.resolve::<Left>().err().unwrap();
        match err.root_cause() {
            DiError::CircularDependency { chain } => assert_eq!(chain.len(), 3),
            other => panic!("unexpected root cause: {other}"),
        }

        // Nothing was cached, so the failure repeats.
        assert!(container.resolve::<Left>().is_err());
    }

    #[test]
    fn test_fallible_constructor() {
        struct Port(u16);

        impl Constructible for Port {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![
                    Constructor::new("parse", |args: &mut Arguments| {
                        let raw = args.next::<String>()?;
                        raw.parse()
                            .map(Port)
                            .map_err(|e| DiError::creation_failed::<Port>(format!("{raw}: {e}")))
                    })
                    .param::<String>("raw"),
                ]
            }
        }

        let mut builder = Container::builder();
        builder.singleton(String::from("not-a-port"));
        builder.bind::<Port>().to_self();
        let container = builder.build().unwrap();

        let err = container.resolve::<Port>().err().unwrap();
        assert!(matches!(err, DiError::CreationFailed { .. }));

        let container = container
            .scope_with(|b| {
                b.singleton(String::from("8080"));
                b.bind::<Port>().to_self();
            })
            .unwrap();
        assert_eq!(container.resolve::<Port>().unwrap().0, 8080);
    }

    #[test]
    fn test_parent_bindings_wire_from_their_own_layer() {
        struct Greeting(&'static str);

        struct Greeter {
            greeting: Arc<Greeting>,
        }

        impl Constructible for Greeter {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![
                    Constructor::new("new", |args: &mut Arguments| {
                        Ok(Greeter {
                            greeting: args.next()?,
                        })
                    })
                    .param::<Greeting>("greeting"),
                ]
            }
        }

        let mut builder = Container::builder();
        builder.singleton(Greeting("root"));
        builder.bind::<Greeter>().to_self();
        let root = builder.build().unwrap();

        let child = root
            .scope_with(|b| {
                b.singleton(Greeting("child"));
            })
            .unwrap();

        assert_eq!(child.resolve::<Greeting>().unwrap().0, "child");
        assert_eq!(child.resolve::<Greeter>().unwrap().greeting.0, "root");
        assert_eq!(child.create::<Greeter>().unwrap().greeting.0, "child");
    }
}
