//! Brand detection: substring match first, then per-word fuzzy match.

use super::{ExtractionMatch, FieldExtractor};

/// Known battery brands, in matching order.
pub const KNOWN_BRANDS: &[&str] = &["Tesla", "Panasonic", "LG", "Samsung", "CATL", "BYD", "Sony"];

/// Brand field extractor.
pub struct BrandExtractor {
    /// Maximum edit distance for a fuzzy match.
    max_distance: usize,
    /// Words shorter than this are never fuzzy-matched.
    min_word_len: usize,
}

impl BrandExtractor {
    /// Create a new brand extractor (distance 1, words of 3+ characters).
    pub fn new() -> Self {
        Self {
            max_distance: 1,
            min_word_len: 3,
        }
    }

    /// Set the maximum edit distance accepted by fuzzy matching.
    pub fn with_max_distance(mut self, distance: usize) -> Self {
        self.max_distance = distance;
        self
    }

    /// Set the minimum word length considered by fuzzy matching.
    pub fn with_min_word_len(mut self, len: usize) -> Self {
        self.min_word_len = len;
        self
    }

    fn substring_match(&self, upper: &str) -> Option<ExtractionMatch<String>> {
        KNOWN_BRANDS.iter().find_map(|brand| {
            upper
                .contains(&brand.to_uppercase())
                .then(|| ExtractionMatch::new(brand.to_string(), 0.9))
        })
    }

    fn fuzzy_matches(&self, upper: &str) -> Vec<ExtractionMatch<String>> {
        let mut results = Vec::new();

        for word in upper.split_whitespace() {
            if word.chars().count() < self.min_word_len {
                continue;
            }

            for brand in KNOWN_BRANDS {
                if levenshtein(word, &brand.to_uppercase()) <= self.max_distance {
                    results.push(ExtractionMatch::new(brand.to_string(), 0.7));
                }
            }
        }

        results
    }
}

impl Default for BrandExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for BrandExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let upper = text.to_uppercase();
        self.substring_match(&upper)
            .or_else(|| self.fuzzy_matches(&upper).into_iter().next())
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let upper = text.to_uppercase();
        let mut results: Vec<Self::Output> = self.substring_match(&upper).into_iter().collect();

        for candidate in self.fuzzy_matches(&upper) {
            if !results.iter().any(|r| r.value == candidate.value) {
                results.push(candidate);
            }
        }

        results
    }
}

/// Extract a known brand from label text.
pub fn extract_brand(text: &str) -> Option<String> {
    BrandExtractor::new().extract(text).map(|m| m.value)
}

/// Levenshtein edit distance over characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("TESLA", "TESLA"), 0);
        assert_eq!(levenshtein("TESLAA", "TESLA"), 1);
        assert_eq!(levenshtein("TESIA", "TESLA"), 1);
        assert_eq!(levenshtein("TES", "TESLA"), 2);
        assert_eq!(levenshtein("", "BYD"), 3);
        assert_eq!(levenshtein("KITTEN", "SITTING"), 3);
    }

    #[test]
    fn test_substring_match_is_case_insensitive() {
        assert_eq!(extract_brand("PANASONIC NCR18650B"), Some("Panasonic".to_string()));
        assert_eq!(extract_brand("made by samsung sdi"), Some("Samsung".to_string()));
    }

    #[test]
    fn test_fuzzy_match_one_edit() {
        assert_eq!(extract_brand("Teslaa"), Some("Tesla".to_string()));
        assert_eq!(extract_brand("Tesia module"), Some("Tesla".to_string()));
        assert_eq!(extract_brand("Samsvng cell"), Some("Samsung".to_string()));
    }

    #[test]
    fn test_fuzzy_match_rejects_short_or_distant_words() {
        assert_eq!(extract_brand("Tes"), None);
        assert_eq!(extract_brand("hello world"), None);

        // "LX" is one edit from "LG" but below the minimum word length.
        assert_eq!(extract_brand("LX 3.7V"), None);
    }

    #[test]
    fn test_substring_takes_precedence_over_fuzzy() {
        let extractor = BrandExtractor::new();
        let found = extractor.extract("Tesia Sony").unwrap();
        assert_eq!(found.value, "Sony");
        assert_eq!(found.confidence, 0.9);
    }

    #[test]
    fn test_fuzzy_match_follows_word_order() {
        // Both words are one edit from a brand; the earlier word decides.
        assert_eq!(extract_brand("Sany Teslo"), Some("Sony".to_string()));
        assert_eq!(extract_brand("Teslo Sany"), Some("Tesla".to_string()));
    }

    #[test]
    fn test_extract_all_lists_each_brand_once() {
        let extractor = BrandExtractor::new();
        let all = extractor.extract_all("Sony cell, Sany pack, Teslo module");
        let names: Vec<_> = all.iter().map(|m| m.value.as_str()).collect();

        assert_eq!(names, vec!["Sony", "Tesla"]);
        assert_eq!(all[0].confidence, 0.9);
        assert_eq!(all[1].confidence, 0.7);
    }

    #[test]
    fn test_custom_distance() {
        let extractor = BrandExtractor::new().with_max_distance(2);
        assert_eq!(extractor.extract("Tes").map(|m| m.value), Some("Tesla".to_string()));
    }
}
