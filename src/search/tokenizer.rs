//! Rule-based Korean tokenizer for sparse retrieval.
//!
//! No morphological analyzer is required: variable placeholders are stripped,
//! punctuation collapses to spaces, and three token classes are extracted by
//! regex. A morphological analyzer can be plugged in behind the same contract
//! if finer segmentation is ever needed.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static VARIABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\{[^}]+\}").unwrap());
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s가-힣]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static HANGUL_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[가-힣]{2,}").unwrap());
static LATIN_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-zA-Z]{2,}").unwrap());
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Tokenize text into Hangul runs (≥2 chars), Latin runs (≥2 chars) and
/// digit runs (≥1 char), in that class order. Deterministic and idempotent;
/// duplicates are kept so term frequency survives into BM25.
pub fn tokenize(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let cleaned = clean(text);

    let mut tokens = Vec::new();
    for pattern in [&*HANGUL_RUN, &*LATIN_RUN, &*DIGIT_RUN] {
        tokens.extend(pattern.find_iter(&cleaned).map(|m| m.as_str().to_string()));
    }
    tokens
}

/// Strip `#{...}` placeholders, collapse everything that is not a word
/// character to single spaces.
fn clean(text: &str) -> String {
    let text = VARIABLE_PATTERN.replace_all(text, "");
    let text = NON_WORD.replace_all(&text, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Token frequency map, used by index statistics.
pub fn word_frequency(tokens: &[String]) -> HashMap<String, usize> {
    let mut freq = HashMap::new();
    for token in tokens {
        *freq.entry(token.clone()).or_insert(0) += 1;
    }
    freq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_korean_tokens() {
        let tokens = tokenize("카카오톡 알림톡 템플릿 정책을 준수해야 합니다");
        assert!(tokens.contains(&"카카오톡".to_string()));
        assert!(tokens.contains(&"알림톡".to_string()));
        assert!(tokens.contains(&"템플릿".to_string()));
    }

    #[test]
    fn test_variable_placeholders_removed() {
        let tokens = tokenize("안녕하세요 #{고객명}님, 주문하신 상품이 배송 완료되었습니다.");
        assert!(!tokens.iter().any(|t| t.contains("고객명")));
        assert!(tokens.contains(&"안녕하세요".to_string()));
        assert!(tokens.contains(&"배송".to_string()));
    }

    #[test]
    fn test_token_class_order() {
        let tokens = tokenize("수업 abc 123 일정");
        // All Hangul runs first, then Latin, then digits
        assert_eq!(tokens, vec!["수업", "일정", "abc", "123"]);
    }

    #[test]
    fn test_single_char_hangul_dropped_digits_kept() {
        let tokens = tokenize("영업시간은 평일 09:00~18:00입니다");
        assert!(tokens.contains(&"09".to_string()));
        assert!(tokens.contains(&"00".to_string()));
        // "은" alone would be length 1, but here it is attached to a run
        assert!(tokens.contains(&"영업시간은".to_string()));
    }

    #[test]
    fn test_special_characters_removed() {
        let tokens = tokenize("Special characters !@#$%^&*() should be removed properly.");
        assert!(tokens.contains(&"Special".to_string()));
        assert!(tokens.contains(&"removed".to_string()));
        assert!(!tokens.iter().any(|t| t.contains('!')));
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_deterministic() {
        let text = "치과 진료 예약 확정 및 내원 준비사항 안내";
        assert_eq!(tokenize(text), tokenize(text));
    }

    #[test]
    fn test_idempotent_on_hangul_runs() {
        // Re-tokenizing the joined token stream preserves every Hangul run
        let tokens = tokenize("주문 확인 메시지 발송 안내");
        let rejoined = tokens.join(" ");
        let again = tokenize(&rejoined);
        for token in &tokens {
            assert!(again.contains(token), "missing {token}");
        }
    }

    #[test]
    fn test_duplicates_preserved() {
        let tokens = tokenize("배송 안내 배송 완료");
        assert_eq!(tokens.iter().filter(|t| *t == "배송").count(), 2);
    }

    #[test]
    fn test_word_frequency() {
        let tokens = tokenize("배송 안내 배송 완료");
        let freq = word_frequency(&tokens);
        assert_eq!(freq["배송"], 2);
        assert_eq!(freq["안내"], 1);
    }
}
