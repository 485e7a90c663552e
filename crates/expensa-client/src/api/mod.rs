//! API endpoint implementations.

mod auth;
mod expenses;

pub use auth::AuthApi;
pub use expenses::ExpensesApi;
