//! Named HTML entity conversion.
//!
//! The XML tokenizer only knows the five predefined entities, so named HTML
//! entities are replaced with their characters before parsing. Unknown names
//! and the XML entities are left for the tokenizer.

use std::sync::LazyLock;

use regex::Regex;

static ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").expect("invalid entity regex"));

/// Replace named HTML entities with Unicode characters.
pub(crate) fn convert_html_entities(html: &str) -> String {
    ENTITY_PATTERN
        .replace_all(html, |caps: &regex::Captures| {
            named_entity(&caps[1]).map_or_else(|| caps[0].to_owned(), str::to_owned)
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "nbsp" => "\u{00a0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{00ab}",
        "raquo" => "\u{00bb}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        "middot" => "\u{00b7}",
        "times" => "\u{00d7}",
        "copy" => "\u{00a9}",
        "reg" => "\u{00ae}",
        "trade" => "\u{2122}",
        "euro" => "\u{20ac}",
        "pound" => "\u{00a3}",
        "deg" => "\u{00b0}",
        "rarr" => "\u{2192}",
        "larr" => "\u{2190}",
        "uarr" => "\u{2191}",
        "darr" => "\u{2193}",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_known_entities() {
        assert_eq!(
            convert_html_entities("1&nbsp;KB &ndash; &hellip;"),
            "1\u{00a0}KB \u{2013} \u{2026}"
        );
    }

    #[test]
    fn test_xml_entities_untouched() {
        assert_eq!(convert_html_entities("&amp;&lt;&gt;&quot;"), "&amp;&lt;&gt;&quot;");
    }

    #[test]
    fn test_unknown_entity_untouched() {
        assert_eq!(convert_html_entities("&bogus;"), "&bogus;");
    }
}
