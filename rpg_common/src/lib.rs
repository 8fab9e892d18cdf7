mod ugx;

pub mod op;
mod secret;

pub mod helpers;

pub use secret::Secret;
pub use ugx::{Ugx, UgxConversionError, UGX_CURRENCY_CODE, UGX_CURRENCY_CODE_LOWER};
