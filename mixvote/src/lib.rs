#[macro_use]
extern crate serde;

pub mod arith;
mod ciphertext;
mod decryption;
pub mod encoding;
mod error;
mod group;
mod keys;
mod mix;
mod proof;
pub mod serde_decimal;
mod teller;
mod vote;
mod workers;

pub use ciphertext::*;
pub use decryption::*;
pub use encoding::Question;
pub use error::*;
pub use group::*;
pub use keys::*;
pub use mix::*;
pub use proof::*;
pub use teller::*;
pub use vote::*;
