pub mod database;
pub mod error;
pub mod readings;
pub mod schema;

pub use database::Database;
pub use error::StoreError;
pub use readings::ReadingRepo;
