//! Shared fixtures: a cloned Postgres database per test, an `AppState` over
//! it, request helpers and a scriptable HTTP server standing in for the
//! executor and Google.
#![allow(dead_code, unused_imports)]

mod assertions;
mod mock_server;
mod setup;
mod state;

pub use assertions::*;
pub use builders::*;
pub use mock_server::*;
pub use setup::{TestApp, setup_test_db_with_pool};
pub use state::*;

/// Service with every gridflow route over `$state`.
macro_rules! test_service {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.clone()))
                .configure(gridflow::handlers::configure_routes),
        )
        .await
    };
}
