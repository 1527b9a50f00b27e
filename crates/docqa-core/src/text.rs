//! Small text utilities shared by the chunker, rewriter, answerer and
//! scorer. All offsets are byte offsets that land on UTF-8 boundaries.

use std::collections::HashSet;

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
pub fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Byte offset of the position `n` characters before `end`.
pub fn back_chars(s: &str, end: usize, n: usize) -> usize {
    let end = snap_to_char_boundary(s, end);
    if n == 0 {
        return end;
    }
    s[..end]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Byte offset of the position `n` characters after `start`.
pub fn forward_chars(s: &str, start: usize, n: usize) -> usize {
    let start = snap_to_char_boundary(s, start);
    s[start..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| start + i)
        .unwrap_or(s.len())
}

/// Find `needle` in `haystack`, ignoring ASCII case.
pub fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    let n = needle.len();
    haystack.char_indices().map(|(i, _)| i).find(|&i| {
        haystack
            .get(i..i + n)
            .is_some_and(|window| window.eq_ignore_ascii_case(needle))
    })
}

/// Lowercased alphanumeric words with more than `min_chars` characters.
pub fn content_words(text: &str, min_chars: usize) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > min_chars)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Lowercased alphanumeric words in reading order, split the same way as
/// [`content_words`].
pub fn word_sequence(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// True when `phrase` occurs in `words` as whole, consecutive words.
pub fn contains_phrase(words: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && words.windows(phrase.len()).any(|w| w == phrase)
}

/// Clip to at most `max` characters, appending `...` when clipped.
pub fn clip(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let end = forward_chars(trimmed, 0, max);
    format!("{}...", trimmed[..end].trim_end())
}

/// Split prose into sentences at `.`, `!` or `?` followed by whitespace.
///
/// Used for light post-processing of generated text; the chunker has its
/// own span-preserving segmentation.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_break = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_break {
                let end = i + c.len_utf8();
                let piece = text[start..end].trim();
                if !piece.is_empty() {
                    out.push(piece);
                }
                start = end;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_and_forward_chars_multibyte() {
        let s = "añb€c";
        let end = s.len();
        let i = back_chars(s, end, 2);
        assert_eq!(&s[i..], "€c");
        assert_eq!(&s[..forward_chars(s, 0, 2)], "añ");
        assert_eq!(forward_chars(s, 0, 99), s.len());
        assert_eq!(back_chars(s, end, 99), 0);
    }

    #[test]
    fn test_phrase_matches_whole_words_only() {
        let words = word_sequence("Retrieval-augmented generation stores data in object storage.");
        assert!(contains_phrase(&words, &word_sequence("retrieval augmented generation")));
        assert!(contains_phrase(&words, &word_sequence("STORAGE")));
        assert!(!contains_phrase(&words, &word_sequence("rag")));
        assert!(!contains_phrase(&words, &word_sequence("object store")));
        assert!(!contains_phrase(&words, &[]));
    }

    #[test]
    fn test_find_ignore_ascii_case() {
        assert_eq!(find_ignore_ascii_case("Well, I DON'T KNOW.", "i don't know"), Some(6));
        assert_eq!(find_ignore_ascii_case("ünïcode text", "TEXT"), Some(10));
        assert_eq!(find_ignore_ascii_case("nothing here", "absent"), None);
    }

    #[test]
    fn test_content_words_filters_short_tokens() {
        let words = content_words("What is Bagging, and why use it?", 3);
        assert!(words.contains("bagging"));
        assert!(words.contains("what"));
        assert!(!words.contains("is"));
        assert!(!words.contains("use"));
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn test_sentences() {
        let s = sentences("First one. Second one! Third? 3.14 stays together");
        assert_eq!(s, vec!["First one.", "Second one!", "Third?", "3.14 stays together"]);
    }
}
