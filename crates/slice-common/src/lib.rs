//! Common types shared by the dataset, renderer and viewer crates.

pub mod bbox;
pub mod error;
pub mod time;

pub use bbox::GeoBounds;
pub use error::{ErrorKind, SliceError};
pub use time::{month_of_epoch_millis, SliceRequest, YearMonth};
