//! Example demonstrating #[derive(Constructible)]
//!
//! Run with:
//!   cargo run --example derive --features derive

use ioc_container::{Constructible, Container, implements};
use std::sync::Arc;

// Dependencies
#[allow(dead_code)]
struct Database {
    url: String,
}

#[derive(Default)]
struct RetryPolicy {
    attempts: u32,
}

trait AuditSink: Send + Sync {
    fn name(&self) -> &'static str;
}

#[derive(Constructible)]
struct StdoutSink;

impl AuditSink for StdoutSink {
    fn name(&self) -> &'static str {
        "stdout"
    }
}

#[derive(Constructible)]
struct FileSink;

impl AuditSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }
}

implements!(StdoutSink => dyn AuditSink);
implements!(FileSink => dyn AuditSink);

// Every field marked #[inject] becomes a constructor parameter
#[derive(Constructible)]
struct UserService {
    #[inject]
    db: Arc<Database>,
    #[inject(key = "replica")]
    replica: Arc<Database>,
    #[inject(default)]
    retries: Arc<RetryPolicy>,
    #[inject(all)]
    sinks: Vec<Arc<dyn AuditSink>>,
    // Not injected, uses Default
    lookups: u64,
}

impl UserService {
    fn describe(&self) -> String {
        let sinks: Vec<_> = self.sinks.iter().map(|s| s.name()).collect();
        format!(
            "primary={} replica={} retries={} sinks={:?} lookups={}",
            self.db.url, self.replica.url, self.retries.attempts, sinks, self.lookups
        )
    }
}

// A struct-level key is used when the type is bound with to_self()
#[derive(Constructible)]
#[inject(key = "admin")]
struct AdminService {
    #[inject]
    users: Arc<UserService>,
}

fn main() {
    println!("=== #[derive(Constructible)] Demo ===\n");

    let mut builder = Container::builder();
    builder.singleton(Database {
        url: "postgres://primary".into(),
    });
    builder
        .bind::<Database>()
        .with_key("replica")
        .to_instance(Arc::new(Database {
            url: "postgres://replica".into(),
        }));
    builder.bind::<dyn AuditSink>().to::<StdoutSink>();
    builder.bind::<dyn AuditSink>().to::<FileSink>();
    builder.bind::<UserService>().to_self().as_singleton();
    builder.bind::<AdminService>().to_self();
    let container = builder.build().unwrap();

    let users = container.resolve::<UserService>().unwrap();
    println!("UserService: {}", users.describe());

    let admin = container.resolve_keyed::<AdminService>("admin").unwrap();
    assert!(Arc::ptr_eq(&admin.users, &users));
    println!("AdminService shares the UserService singleton");

    // An unregistered type can still be built from its derived constructor
    let fresh = container.create::<UserService>().unwrap();
    assert!(!Arc::ptr_eq(&fresh, &users));
    println!("create::<UserService>() built a fresh instance");

    println!("\n=== Demo Complete ===");
}
