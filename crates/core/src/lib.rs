mod error;
mod text;
mod types;

pub use error::{Result, VaultError};
pub use text::{clip_chars, stem, tokenize, word_pattern};
pub use types::{Snippet, Turn};
