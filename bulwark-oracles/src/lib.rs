//! Static reference data the validator reads but never mutates: token
//! aliases, fallback prices, and which symbol is the protocol's synthetic
//! stable token.

pub mod aliases;
pub mod prices;
pub mod reference;

pub use aliases::AliasTable;
pub use prices::PriceReference;
pub use reference::{Reference, ReferenceConfig, ReferenceError};
