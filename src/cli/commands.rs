pub mod catalog;
pub mod initdb;
pub mod seed;

pub use catalog::print_catalog;
pub use initdb::init_database;
pub use seed::seed_catalog;
