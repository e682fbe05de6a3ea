//! Freight tracker library
//!
//! Maritime route synthesis and shipment tracking state. Exposes modules for
//! integration testing and binary reuse.

pub mod domain;
pub mod error;
pub mod infra;
pub mod io;
pub mod services;
