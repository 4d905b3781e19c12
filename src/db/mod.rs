//! Data access. Every function takes an explicit pool, connection, or
//! transaction; nothing holds global connection state.

pub mod analytics;
pub mod cart;
pub mod orders;
pub mod products;
pub mod users;
