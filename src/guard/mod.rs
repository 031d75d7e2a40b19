// SPDX-License-Identifier: Apache-2.0

//! Policy enforcement on top of the interceptor.

pub mod client;

pub use client::{GuardedClient, ScopedOperation};
