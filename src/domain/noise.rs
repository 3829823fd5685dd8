//! Noise classification for traversal.
//!
//! A node is noise when its name is not a method signature, or when its
//! function or class part contains one of the mundane keywords.

use aho_corasick::AhoCorasick;

/// Multi-pattern substring matcher over a fixed keyword list.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    keywords: Vec<String>,
    matcher: Option<AhoCorasick>,
}

impl KeywordSet {
    /// Blank keywords are dropped; they would match every haystack.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k| !k.is_empty())
            .collect();
        // A build failure only happens on absurd pattern sizes; fall back to
        // linear scanning in that case.
        let matcher = if keywords.is_empty() {
            None
        } else {
            AhoCorasick::new(&keywords).ok()
        };
        Self { keywords, matcher }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True if any keyword occurs in `haystack`.
    pub fn matches(&self, haystack: &str) -> bool {
        match &self.matcher {
            Some(ac) => ac.is_match(haystack),
            None => self.keywords.iter().any(|k| haystack.contains(k.as_str())),
        }
    }
}

/// Decides whether a node should be expanded during DFS.
#[derive(Debug, Clone)]
pub struct NoiseClassifier {
    mundane_calls: KeywordSet,
    mundane_classes: KeywordSet,
}

impl NoiseClassifier {
    pub fn new(mundane_calls: KeywordSet, mundane_classes: KeywordSet) -> Self {
        Self {
            mundane_calls,
            mundane_classes,
        }
    }

    /// Classifier that only rejects malformed names.
    pub fn permissive() -> Self {
        Self::new(KeywordSet::new(Vec::<String>::new()), KeywordSet::new(Vec::<String>::new()))
    }

    pub fn is_noise(&self, name: &str) -> bool {
        if !name.contains('(') {
            return true;
        }
        let (class_part, member) = name.split_once(':').unwrap_or(("", name));
        let fun_part = member.split('(').next().unwrap_or(member);
        self.mundane_calls.matches(fun_part) || self.mundane_classes.matches(class_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> NoiseClassifier {
        NoiseClassifier::new(
            KeywordSet::new(["toString", "hashCode"]),
            KeywordSet::new(["android.util.Log", "java.lang.StringBuilder"]),
        )
    }

    #[test]
    fn test_names_without_parens_are_noise() {
        let c = classifier();
        assert!(c.is_noise("Button"));
        assert!(c.is_noise("<com.app.Main: int counter>"));
    }

    #[test]
    fn test_mundane_calls_and_classes() {
        let c = classifier();
        assert!(c.is_noise("<com.app.User: java.lang.String toString()>"));
        assert!(c.is_noise("<android.util.Log: int d(java.lang.String,java.lang.String)>"));
        assert!(!c.is_noise("<com.app.Main: void logout()>"));
    }

    #[test]
    fn test_keyword_in_arguments_is_ignored() {
        // only the part before '(' is the function name
        let c = classifier();
        assert!(!c.is_noise("<com.app.Main: void show(java.lang.StringBuilder)>"));
    }

    #[test]
    fn test_blank_keywords_are_dropped() {
        let set = KeywordSet::new(["", "abc"]);
        assert_eq!(set.keywords().len(), 1);
        assert!(!set.matches("xyz"));
        assert!(!NoiseClassifier::permissive().is_noise("<A: void a()>"));
    }
}
