//! Text normalization: lowercase, tokenize, drop stop-words, stem

use std::collections::HashSet;
use std::sync::LazyLock;

use super::stemmer::stem;

/// English stop-word list (the standard NLTK corpus list)
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his",
    "himself", "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself",
    "they", "them", "their", "theirs", "themselves", "what", "which", "who", "whom", "this",
    "that", "that'll", "these", "those", "am", "is", "are", "was", "were", "be", "been",
    "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an", "the",
    "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by", "for",
    "with", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where", "why", "how", "all",
    "any", "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not",
    "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will", "just", "don",
    "don't", "should", "should've", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain",
    "aren", "aren't", "couldn", "couldn't", "didn", "didn't", "doesn", "doesn't", "hadn",
    "hadn't", "hasn", "hasn't", "haven", "haven't", "isn", "isn't", "ma", "mightn",
    "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't", "shouldn",
    "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn", "wouldn't",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Whether a lowercase token is an English stop-word
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORD_SET.contains(token)
}

/// Split lowercase text into maximal runs of alphanumeric characters.
///
/// Punctuation and whitespace separate tokens and never form tokens
/// themselves.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Stem a token until it stops changing.
///
/// Single Porter passes are not always fixed points ("agreed" -> "agre" ->
/// "agr"), so cleaned text would keep shrinking when cleaned again.
fn stem_to_fixed_point(token: &str) -> String {
    let mut current = stem(token);
    for _ in 0..token.len() {
        let next = stem(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Normalize one document: lowercase, tokenize, remove stop-words and
/// punctuation, stem, rejoin with single spaces.
///
/// Stop-words are checked both before and after stemming, so a stem that
/// lands on a stop-word ("ups" -> "up") is dropped too. Cleaning the output
/// again returns it unchanged. May return an empty string when every token
/// is a stop-word.
pub fn clean_text(text: &str) -> String {
    tokenize(text)
        .iter()
        .filter(|t| !is_stop_word(t))
        .map(|t| stem_to_fixed_point(t))
        .filter(|t| !is_stop_word(t))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_punctuation() {
        assert_eq!(
            tokenize("Hello, World!! How's it going?"),
            vec!["hello", "world", "how", "s", "it", "going"]
        );
    }

    #[test]
    fn test_tokenize_keeps_numbers() {
        assert_eq!(tokenize("Call 08002986030 now"), vec!["call", "08002986030", "now"]);
    }

    #[test]
    fn test_stop_words() {
        assert!(is_stop_word("the"));
        assert!(is_stop_word("don"));
        assert!(!is_stop_word("free"));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("WINNER!! You have been selected to receive a prize"),
            "winner select receiv prize"
        );
    }

    #[test]
    fn test_clean_text_all_stop_words() {
        assert_eq!(clean_text("Is it? Is it... it is!"), "");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_stems_are_fixed_points() {
        assert_eq!(stem_to_fixed_point("agreed"), "agr");
        assert_eq!(stem_to_fixed_point("agr"), "agr");
    }

    #[test]
    fn test_stems_that_become_stop_words_are_dropped() {
        assert_eq!(clean_text("ups and dos"), "");
        assert_eq!(clean_text("free cans"), "free");
    }
}
