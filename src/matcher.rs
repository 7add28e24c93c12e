use once_cell::sync::Lazy;
use regex::Regex;

/// Punctuation and separator characters ignored when comparing titles.
static SPECIAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[、。，·:：;；!！'’"“”()（）\[\]【】「」\-—+|\\_/&#～~.,?？]"#).unwrap());

/// Normalize a title for strict comparison: drop special characters,
/// collapse whitespace, uppercase.
fn normalize(title: &str) -> String {
    let stripped = SPECIAL_CHARS.replace_all(title, "");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Compare a file-derived name against one or more provider titles.
///
/// Equality is strict after normalization — no substring or fuzzy matching.
/// The fallback tiers above this (alternate titles, web search) exist to
/// compensate for exactly that strictness. Empty inputs never match.
pub fn names_equal<I, S>(file_name: &str, candidate_names: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if file_name.trim().is_empty() {
        return false;
    }
    let file_name = normalize(file_name);
    candidate_names.into_iter().any(|candidate| {
        let candidate = normalize(candidate.as_ref());
        !candidate.is_empty() && candidate == file_name
    })
}

/// Whether a name is already written in the native script of the configured
/// language. The web-search fallback is skipped for such names: it exists to
/// recover romanized/foreign titles the structured search mishandles.
pub fn is_native_script(name: &str, language: &str) -> bool {
    let lang = language.split(['-', '_']).next().unwrap_or(language);
    match lang {
        "zh" => name.chars().any(is_han),
        "ja" => name.chars().any(|c| is_kana(c) || is_han(c)),
        "ko" => name.chars().any(is_hangul),
        _ => name.chars().any(|c| c.is_ascii_alphabetic()),
    }
}

fn is_han(c: char) -> bool {
    matches!(c, '\u{4e00}'..='\u{9fff}')
}

fn is_kana(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{30ff}')
}

fn is_hangul(c: char) -> bool {
    matches!(c, '\u{ac00}'..='\u{d7af}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_names_match() {
        assert!(names_equal("The Matrix", ["The Matrix"]));
        assert!(names_equal("Poor Things", ["Poor Things"]));
    }

    #[test]
    fn test_empty_inputs_never_match() {
        assert!(!names_equal("", ["The Matrix"]));
        assert!(!names_equal("The Matrix", [""]));
        assert!(!names_equal("The Matrix", Vec::<String>::new()));
    }

    #[test]
    fn test_normalization_ignores_case_and_punctuation() {
        assert!(names_equal("puss in boots the last wish", [
            "Puss in Boots: The Last Wish"
        ]));
        assert!(names_equal("Spider-Man", ["Spider-Man"]));
        assert!(names_equal("SpiderMan", ["Spider-Man"]));
    }

    #[test]
    fn test_no_substring_matching() {
        assert!(!names_equal("The Matrix", ["The Matrix Reloaded"]));
        assert!(!names_equal("Matrix", ["The Matrix"]));
    }

    #[test]
    fn test_any_of_multiple_candidates() {
        let names = ["Le Fabuleux Destin", "Amelie", "Amélie"];
        assert!(names_equal("Amelie", names));
        assert!(!names_equal("Ratatouille", names));
    }

    #[test]
    fn test_native_script_detection() {
        assert!(is_native_script("流浪地球", "zh-CN"));
        assert!(!is_native_script("The Wandering Earth", "zh-CN"));
        assert!(is_native_script("すずめの戸締まり", "ja-JP"));
        assert!(!is_native_script("Suzume", "ja-JP"));
        assert!(is_native_script("Oppenheimer", "en-US"));
    }
}
