pub mod convex_store;
pub mod firstdue_client;
pub mod timeout_handler;

pub use convex_store::ConvexEventStore;
pub use firstdue_client::FirstDueClient;
pub use timeout_handler::TimeoutHandler;
