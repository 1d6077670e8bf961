pub mod dto;
pub mod response;
mod router;
mod setup;
mod storage;

pub use router::{AppState, create_router};
pub use setup::setup_router;
pub use storage::storage_router;
