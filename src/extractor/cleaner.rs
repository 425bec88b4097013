use ammonia::Builder;

/// Sanitizes markup before a content-scoring backend sees it: unsafe and
/// unknown elements go, and script/style/noscript lose their content too.
pub fn strip_non_content(html: &str) -> String {
    Builder::default()
        .add_clean_content_tags(&["noscript"])
        .clean(html)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_dangerous_elements_with_content() {
        let cleaned = strip_non_content(
            r#"<p>Hello world</p><script>alert('xss')</script><style>body{color:red}</style><noscript>turn on js</noscript>"#,
        );

        assert!(cleaned.contains("<p>Hello world</p>"));
        assert!(!cleaned.contains("alert"));
        assert!(!cleaned.contains("color:red"));
        assert!(!cleaned.contains("turn on js"));
    }

    #[test]
    fn test_keeps_text_of_unknown_elements() {
        let cleaned = strip_non_content("<custom-tag>inner text</custom-tag>");
        assert!(cleaned.contains("inner text"));
        assert!(!cleaned.contains("custom-tag"));
    }
}
