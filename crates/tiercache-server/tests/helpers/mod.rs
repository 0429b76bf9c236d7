//! Test helpers para tiercache-server.

#![allow(dead_code, unused_imports)]

pub mod client;
pub mod fixtures;

pub use client::{TestClient, TestResponse};
pub use fixtures::{CHANNEL, NAMESPACE, TestApp, test_app, test_app_with_store};
