use cucumber::given;

use crate::cucumber::{LedgerSystem, LedgerWorld};

#[given("a fresh ledger")]
async fn fresh_database(world: &mut LedgerWorld) {
    let system = LedgerSystem::new().await;
    world.system = Some(system);
}
