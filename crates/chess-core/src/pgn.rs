//! PGN move-text utilities: lightweight regex-based extraction.

use std::sync::LazyLock;

use regex::Regex;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}").unwrap());
static VARIATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|O-O-O|O-O").unwrap()
});
static RESULT_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(1-0|0-1|1/2-1/2)\s*$").unwrap());

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
pub fn extract_moves(pgn: &str) -> Vec<String> {
    let no_headers = HEADER_RE.replace_all(pgn, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, "");
    let no_variations = VARIATION_RE.replace_all(&no_comments, "");

    MOVE_RE
        .find_iter(&no_variations)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract a string value from a PGN header (e.g. White, Result).
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    let pattern = format!(r#"\[{}\s+"([^"]*)"\]"#, regex::escape(header_name));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(pgn)?.get(1)?.as_str().to_string();
    if value.is_empty() { None } else { Some(value) }
}

/// Final game result as recorded by the upstream rules engine, if the game ended.
///
/// Looks at the `Result` header first, then at a trailing result token in the
/// move text. `*` (game in progress) yields `None`.
pub fn game_result(pgn: &str) -> Option<String> {
    if let Some(result) = extract_header(pgn, "Result") {
        if result != "*" {
            return Some(result);
        }
    }
    let no_headers = HEADER_RE.replace_all(pgn, "");
    RESULT_TOKEN_RE
        .captures(no_headers.trim_end())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
