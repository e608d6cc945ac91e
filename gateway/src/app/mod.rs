pub mod bridge;
pub mod dispatch;
pub mod registry;
pub mod router;
pub mod state;
