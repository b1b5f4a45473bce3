//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use ioc_container::{Arguments, Constructible, Constructor, Container, ResolutionContext};
use std::sync::Arc;

// Example services
#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
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

#[allow(dead_code)]
struct RequestContext {
    request_id: String,
}

fn main() {
    // Uses JSON if logging-json is enabled, pretty if logging-pretty is
    ioc_container::logging::builder().debug().container_only().init();

    println!("=== IoC Container Logging Demo ===\n");

    // Registering bindings (logs: "Registering service", "Container built")
    let mut builder = Container::builder();
    builder.singleton(Database {
        url: "postgres://localhost/mydb".into(),
    });
    builder.bind::<UserService>().to_self().as_singleton();
    builder
        .bind::<RequestContext>()
        .to_factory(|ctx: &ResolutionContext<'_>| {
            println!("  [App] Request context created in {}", ctx.scope());
            Ok(Arc::new(RequestContext {
                request_id: "default".into(),
            }))
        })
        .as_scoped();
    let container = builder.build().unwrap();

    // First resolve compiles the plan (logs: "Compiled construction plan",
    // "Singleton created on first access")
    let _users = container.resolve::<UserService>().unwrap();

    // Missing service (logs: "Service resolution failed")
    assert!(container.try_resolve::<i32>().is_none());

    // Child scope (logs: "Creating child scope from parent container")
    let request_scope = container.scope();

    // Scoped instance (logs: "Scoped instance created")
    let _ctx = request_scope.resolve::<RequestContext>().unwrap();

    // Layered child with its own bindings
    let overridden = container
        .scope_with(|builder| {
            builder.singleton(RequestContext {
                request_id: "req-12345".into(),
            });
        })
        .unwrap();
    let _ctx = overridden.resolve::<RequestContext>().unwrap();

    // Compile everything up front (logs: "Compiled all registrations")
    container.compile().unwrap();

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
