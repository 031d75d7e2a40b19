// SPDX-License-Identifier: Apache-2.0

// Admin Commands Module

pub mod admin;

pub use admin::{dispatch, dispatch_json, AdminCommand, AdminResponse};
