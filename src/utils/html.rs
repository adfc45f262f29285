use std::collections::HashSet;

use ammonia;

/// Re-sanitising passes before `plain_text` gives up on decoding.
const MAX_TEXT_PASSES: usize = 4;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe formatting tags (<b>, <p>, <code>) survive, while
/// <script>, <iframe> and event-handler attributes are stripped together with
/// their content. Applied to every piece of user-authored text that another
/// user may later see (card faces, studio material, descriptions).
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitises an optional field, keeping `None` as is.
pub fn clean_opt(input: Option<String>) -> Option<String> {
    input.map(|s| clean_html(&s))
}

/// Reduces input to plain text: every tag goes, script and style bodies
/// with it, and the entities ammonia writes back (`&amp;`, `&lt;`, ...) are
/// decoded so `a < b & c` is stored as typed.
///
/// Decoding can surface markup that was entity-encoded in the input, so the
/// text is cleaned again until it stops changing. Input that never settles
/// is returned in its escaped form.
pub fn plain_text(input: &str) -> String {
    let mut text = input.to_owned();
    for _ in 0..MAX_TEXT_PASSES {
        let decoded = decode_entities(&strip_tags(&text));
        if decoded == text {
            return decoded;
        }
        text = decoded;
    }
    strip_tags(&text)
}

fn strip_tags(input: &str) -> String {
    ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
