// Single integration test binary.
// All test modules share one PostgreSQL container via LazyLock,
// with per-test isolation via CREATE DATABASE ... TEMPLATE.

#[macro_use]
mod common;

mod test_auth;
mod test_files;
mod test_grid;
mod test_health;
mod test_item_callback;
mod test_workflow;
