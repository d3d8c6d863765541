pub mod error;
pub mod model;
pub mod mt940;

mod utils;

pub use crate::error::{DecodeError, Diagnostic};
pub use crate::model::{
    Balance, Currency, Direction, SignedMinor, Statement, Transaction, format_minor_units,
};
pub use crate::mt940::{DecodeOptions, Decoded, Mt940Decoder, decode};
