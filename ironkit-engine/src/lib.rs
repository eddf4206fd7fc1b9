/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # IronKit Engine
//!
//! Tokio runtime for IronKit client sessions.
//!
//! This crate provides:
//! - **Client**: Cloneable async handle to a session running in its own task
//! - **Builder API**: Fluent configuration for client setup
//! - **Errors**: Typed failures for client operations

pub mod builder;
pub mod client;
pub mod error;

pub use builder::ClientBuilder;
pub use client::Client;
pub use error::ClientError;
