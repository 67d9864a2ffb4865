/// Pool creation and migrations
pub mod connection;
/// Table records and their queries
pub mod models;
/// Optional column and table detection
pub mod schema;
