use std::sync::LazyLock;

use regex::Regex;

/// Any tag, including one left unclosed at the end of the input.
static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>?").expect("tag regex should compile"));

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex should compile"));

/// `src` attribute of an `<img>` tag, quoted or bare. `data-src` and similar
/// attributes never match since `src` must follow whitespace.
static IMG_SRC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("img src regex should compile")
});

/// Drop markup and decode the handful of entities blog HTML commonly uses.
/// Whitespace runs collapse to a single space.
pub(crate) fn plain_text(html: &str) -> String {
    let text = TAG_REGEX.replace_all(html, " ");
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WHITESPACE_REGEX.replace_all(&decoded, " ").trim().to_string()
}

/// `src` of the first `<img>` tag that has a non-empty one.
pub(crate) fn first_image_src(html: &str) -> Option<String> {
    IMG_SRC_REGEX.captures_iter(html).find_map(|caps| {
        let value = match (caps.get(1), caps.get(2), caps.get(3)) {
            (Some(quoted), _, _) | (_, Some(quoted), _) => quoted.as_str(),
            (_, _, Some(bare)) => bare.as_str().trim_end_matches('/'),
            _ => return None,
        };
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}
