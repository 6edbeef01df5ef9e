use crate::llm::utils::string_util::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(truncate_utf8_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_utf8_with_ellipsis("hello", 5), "hello");
    }

    #[test]
    fn long_strings_get_an_ellipsis() {
        assert_eq!(truncate_utf8_with_ellipsis("hello world", 5), "hello…");
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let s = "日本語のテキスト";
        let truncated = truncate_utf8_with_ellipsis(s, 3);
        assert_eq!(truncated, "日本語…");
    }

    #[test]
    fn first_line_skips_leading_blanks() {
        assert_eq!(first_line("\n\n  hello\nworld"), "hello");
        assert_eq!(first_line(""), "");
        assert_eq!(first_line("   "), "");
    }
}
