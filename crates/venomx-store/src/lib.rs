//! SQLite persistence for species, facilities and antivenom stock.
//!
//! The service only reads from the store at request time; writes happen once
//! at startup when the reference data is seeded.

mod seed;
mod store;

pub use seed::{SeedData, SeedStock, SeedTarget};
pub use store::{StockFilter, StoreError, VenomStore};
