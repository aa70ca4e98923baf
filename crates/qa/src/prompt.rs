//! Fixed reply lines and system-prompt construction.

/// The assistant's fixed self-introduction, returned verbatim for identity
/// questions and taught to the generator for everything else.
pub const IDENTITY_LINE: &str = "Jeg hedder Dory, jeg er din digitale praktikant.";

/// Reply when no candidate material exists in the vault.
pub const NO_INFO_LINE: &str = "I can't find that in the vault.";

/// Marker line introducing the citation block in generated replies.
pub const SOURCES_MARKER: &str = "Sources:";

/// System prompt for one request. Info-seeking queries add the grounding
/// and citation-format rules; price queries additionally demand verbatim
/// name/price listing.
pub fn build_system_prompt(info_seeking: bool, price_query: bool) -> String {
    let base = format!(
        "You are Dory. If asked who you are or your name, reply exactly: '{IDENTITY_LINE}'. \
         You are an Obsidian-vault-grounded assistant and must not invent corporate facts."
    );
    if !info_seeking {
        return base;
    }
    let mut prompt = format!(
        "{base} You will receive extracted facts from the vault. \
         Your job is to format those facts clearly without adding, inferring, or omitting information. \
         Answer only using the provided vault snippets. \
         If the answer is not in the snippets, reply: '{NO_INFO_LINE}' \
         Include a Sources section with citations in this exact format: \
         - <path>#<heading> (lines a-b)"
    );
    if price_query {
        prompt.push_str(
            " When asked for prices or packages, list each package name with its price exactly as provided.",
        );
    }
    prompt
}

/// Appended to the system prompt for the single regeneration attempt when a
/// reply came back without citations.
pub const SOURCES_RETRY_SUFFIX: &str = " You MUST include a Sources section with citations.";
