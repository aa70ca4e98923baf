pub mod config;
pub mod inclusion;
pub mod intent;
pub mod pipeline;
pub mod price;
pub mod prompt;
pub mod session;
pub mod snippet;
pub mod sources;

pub use config::Settings;
pub use inclusion::{extract_inclusion_snippets, query_tokens};
pub use intent::{classify, Intent};
pub use pipeline::{answer_query, price_candidates, sources_for};
pub use price::{extract_price_items, filter_price_items, PriceItem};
pub use prompt::{build_system_prompt, IDENTITY_LINE, NO_INFO_LINE};
pub use session::SessionStore;
pub use snippet::{industry_count_snippets, price_snippets, snippets_from_sections};
pub use sources::{ensure_sources, parse_sources};
