#![warn(missing_docs)]

//! tabops HTTP API
//!
//! Every operation is exposed under `/tableau/*` and answers with a JSON
//! object carrying `success` and `message`. Failed operations answer 400
//! (502 when the Tableau server cannot be reached) with the same shape.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

pub use routes::{router, ApiDoc};
pub use server::ApiServer;
pub use state::AppState;
