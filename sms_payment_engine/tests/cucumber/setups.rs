use cucumber::given;

use crate::cucumber::{world::ReconciliationSystem, ReconciliationWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut ReconciliationWorld) {
    let system = ReconciliationSystem::new().await;
    world.system = Some(system);
}
