//! Database models split into domain-specific modules.

pub mod account;
pub mod company;
pub mod coordinator;
pub mod lookup;

pub use account::*;
pub use company::*;
pub use coordinator::*;
pub use lookup::*;
