//! Common utilities shared by the walletdeck stores.

#![warn(missing_docs)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod misuse;
pub mod notify;

pub use misuse::MisusePolicy;
pub use notify::Listeners;
