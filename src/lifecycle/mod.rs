mod controller;
mod executor;
mod inspector;
mod ledger;
mod retry;
mod seeder;

pub use controller::{Controller, Snapshot};
pub use executor::Executor;
pub use inspector::Inspector;
pub use ledger::Ledger;
pub use retry::RetryPolicy;
pub use seeder::BootstrapSeeder;
