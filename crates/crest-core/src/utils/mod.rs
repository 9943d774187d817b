pub mod hex;

pub use hex::parse_hex_quantity;
