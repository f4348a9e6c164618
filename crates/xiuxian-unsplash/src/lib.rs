//! Unsplash adapter implementing the `ImageSearch` port.

pub mod client;

pub use client::{BASE_URL, UnsplashClient};
