//! # SpamGuard Server
//!
//! The self-contained shape of SpamGuard. At startup it fits a count
//! vectorizer and a logistic-regression classifier on a local dataset,
//! holding out a seeded 20% split; afterwards it serves `POST /predict`
//! and `GET /metrics` from that immutable state.

pub mod routes;
pub mod state;

pub use routes::{router, run};
pub use state::AppState;
