pub mod campaign;
pub mod credentials;
pub mod dispatch;
pub mod recipients;
pub mod stats;
pub mod store;
