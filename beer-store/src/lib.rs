pub mod pool;
pub mod schema;
pub mod source;

pub use pool::connect;
pub use schema::bootstrap;
pub use source::PgConsumptionSource;
