pub mod downloads;
pub mod error;
pub mod formats;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod urls;
pub mod ws;

pub use routes::create_router;
