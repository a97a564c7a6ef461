pub mod money;

pub use money::{cents_to_decimal, format_cents};
