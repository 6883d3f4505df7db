//! Run a few apply requests through the engine with logging on.
//!
//! `RUST_LOG=circ_rules=debug cargo run --example apply`

use std::time::Duration;

use circ_rules::{
    CacheConfig, Location, MemoryLocations, MemoryRuleStore, PolicyKind, RawCriteria, RulesEngine,
    TenantId,
};

const BOOK: &str = "96d4bdf1-5fc2-40ef-9ace-6d7e3e48ec4d";
const DVD: &str = "b6375fcb-caaf-4b94-944d-b1a6bb589425";
const CAN_CIRCULATE: &str = "2e6f51b9-d00a-4f1d-9960-49b1977acfca";
const STAFF: &str = "87d14197-6de3-4ba5-9201-6c4129504adf";
const UNDERGRAD: &str = "0122feae-bd0e-4405-88de-525d93ba7cfd";
const MAIN_FLOOR: &str = "fcd64ce1-6995-48f0-840e-89ffa2288371";
const MAIN_LIBRARY: &str = "5d78803e-ca04-4b4a-aeae-2c63b924518b";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circ_rules=info".into()),
        )
        .init();

    let tenant = TenantId::from("diku");
    let rules = format!(
        "priority: t, s, c, b, a, m, g\n\
         fallback-policy: l loan-default r request-default n notice-default \
         o fine-default i lost-default\n\
         m {BOOK}: l loan-books\n\
         \x20   g {STAFF}: l loan-books-staff\n\
         c {MAIN_LIBRARY}: n notice-main-library\n"
    );

    let store = MemoryRuleStore::new().with_rules(tenant.clone(), rules);
    let locations = MemoryLocations::new().with_location(
        tenant.clone(),
        MAIN_FLOOR,
        Location::new(MAIN_FLOOR, MAIN_LIBRARY, "campus-1", "institution-1"),
    );
    let config = CacheConfig::default()
        .with_soft_ttl(Duration::from_secs(30))
        .with_hard_ttl(Duration::from_secs(60));
    let engine = RulesEngine::new(store.clone(), locations, config);
    store.on_change(engine.change_hook());

    for (item, group) in [(BOOK, UNDERGRAD), (BOOK, STAFF), (DVD, STAFF)] {
        let raw = RawCriteria::new(item, CAN_CIRCULATE, group, MAIN_FLOOR);
        match engine.apply_all(&tenant, &raw, PolicyKind::Loan).await {
            Ok(matches) => {
                for m in &matches {
                    println!("{item} / {group}: {m}");
                }
            }
            Err(e) => eprintln!("apply failed: {e}"),
        }
    }

    let bad = RawCriteria::new("not-a-uuid", CAN_CIRCULATE, STAFF, MAIN_FLOOR);
    if let Err(e) = engine.apply(&tenant, &bad, PolicyKind::Notice).await {
        println!("rejected (client error: {}): {e}", e.is_client_error());
    }
}
