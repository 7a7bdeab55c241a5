//! Generic follow-up query when a pack template cannot be used

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static EXPLICIT_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)^\s*(?:SEARCH_QUERY|YOUTUBE_QUERY)\s*:\s*"?(?P<q>[^"\r\n]+?)"?\s*$"#)
        .expect("static query pattern")
});

/// Longest first-line query taken from a response
const MAX_LINE_CHARS: usize = 120;

/// Build a search query from the response alone
///
/// Prefers an explicit `SEARCH_QUERY:` or `YOUTUBE_QUERY:` line, then the first
/// non-blank line with markdown decoration removed, then `"<game> guide"`.
pub fn synthesize_fallback_query(game: &str, response_text: &str) -> String {
    debug!(%game, "synthesize_fallback_query: called");
    if let Some(caps) = EXPLICIT_QUERY.captures(response_text) {
        let query = caps["q"].trim();
        if !query.is_empty() {
            return query.to_string();
        }
    }

    let first_line = response_text
        .lines()
        .map(strip_decoration)
        .find(|line| !line.is_empty());
    if let Some(line) = first_line {
        return line.chars().take(MAX_LINE_CHARS).collect::<String>().trim_end().to_string();
    }

    let game = game.trim();
    format!("{} guide", if game.is_empty() { "game" } else { game })
}

fn strip_decoration(line: &str) -> String {
    line.replace("**", "")
        .trim()
        .trim_start_matches(['#', '-', '*', '•', '>'])
        .trim()
        .to_string()
}
