//! Test Helper Utilities
//!
//! Shared fixtures for pms-review integration tests

#![allow(dead_code)]

pub mod fixtures;
pub mod gateways;

pub use fixtures::{
    seed_feedback_request, seed_obligation, seed_team, seed_user, setup_world,
    setup_world_with_gateway, TestWorld, TENANT,
};
pub use gateways::RecordingGateway;
