//! Application services: the controller and the policies it orchestrates.

pub mod controller;
pub mod illustration;
pub mod retry;
pub mod view;
