pub mod address;

pub use address::{address_format_description, address_placeholder, validate_address};
