//! Visible-text extraction from crawled HTML.

use scraper::{ElementRef, Html, Selector};

/// Reduces an HTML document to the text a reader would see: every text node
/// under `<body>`, at any depth, excluding `script`, `style` and `noscript`
/// subtrees, joined with single spaces.
pub fn extract_visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").expect("valid selector");
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut raw = String::new();
    collect_text(body, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(el) = ElementRef::wrap(child) {
            if matches!(el.value().name(), "script" | "style" | "noscript") {
                continue;
            }
            collect_text(el, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nested_text() {
        let html = "<html><body><div><p>deeply <b>nested</b> words</p></div></body></html>";
        assert_eq!(extract_visible_text(html), "deeply nested words");
    }

    #[test]
    fn skips_script_style_noscript_at_any_depth() {
        let html = r#"<html><body>
            <p>kept</p>
            <script>var hidden = 1;</script>
            <div><style>.x{color:red}</style><span>also kept</span>
                 <noscript>fallback</noscript></div>
        </body></html>"#;
        assert_eq!(extract_visible_text(html), "kept also kept");
    }

    #[test]
    fn collapses_whitespace() {
        let html = "<html><body>  a \n\n  b\t c  </body></html>";
        assert_eq!(extract_visible_text(html), "a b c");
    }

    #[test]
    fn missing_body_yields_empty() {
        assert_eq!(extract_visible_text(""), "");
    }
}
