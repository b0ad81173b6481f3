use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

// Project prefix is letters (digits allowed after the first), then a number.
// Delimited by anything but an alphanumeric, so `_` separates keys too.
static ISSUE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9])([A-Z][A-Z0-9]+-[0-9]+)(?:$|[^0-9])")
        .expect("valid issue key pattern")
});

/// Issue keys mentioned in `text`, deduplicated, in order of first appearance.
pub fn issue_keys(text: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut from = 0;
    // Delimiters are consumed by each match, so rescan from the key's end.
    while let Some(caps) = ISSUE_KEY.captures_at(text, from) {
        let Some(key) = caps.get(1) else { break };
        keys.push(key.as_str().to_string());
        from = key.end();
    }
    keys.into_iter().unique().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_in_message() {
        assert_eq!(issue_keys("Fix ABC-123 bug"), vec!["ABC-123"]);
    }

    #[test]
    fn test_no_key() {
        assert!(issue_keys("fix typo in readme").is_empty());
        assert!(issue_keys("abc-123 lowercase is not a key").is_empty());
    }

    #[test]
    fn test_branch_name() {
        assert_eq!(issue_keys("feature/ABC-123-x"), vec!["ABC-123"]);
    }

    #[test]
    fn test_underscore_and_slash_delimited_branches() {
        assert_eq!(issue_keys("ABC-123_fix"), vec!["ABC-123"]);
        assert_eq!(issue_keys("feature_ABC-123"), vec!["ABC-123"]);
        assert_eq!(issue_keys("bugfix/WEB-7/retry"), vec!["WEB-7"]);
    }

    #[test]
    fn test_adjacent_keys() {
        assert_eq!(issue_keys("ABC-1,ABC-2"), vec!["ABC-1", "ABC-2"]);
        assert!(issue_keys("xABC-1").is_empty());
        assert!(issue_keys("ABC-12a").len() == 1);
    }

    #[test]
    fn test_any_prefix_and_dedup() {
        assert_eq!(
            issue_keys("OPS2-7, WEB-41 and OPS2-7 again"),
            vec!["OPS2-7", "WEB-41"]
        );
    }
}
