use super::*;

#[tokio::test]
async fn matches_simple_pattern() {
    let re = Regex::compile_anchored(".*", Duration::from_secs(1)).unwrap();
    assert!(re.match_string("anything").await.unwrap());
}

#[tokio::test]
async fn anchored_pattern_rejects_partial_match() {
    let re = Regex::compile_anchored("foo", Duration::from_secs(1)).unwrap();
    assert!(re.match_string("foo").await.unwrap());
    assert!(!re.match_string("foobar").await.unwrap());
}

#[tokio::test]
async fn supports_non_capture_group_and_inline_flags() {
    let re = Regex::compile_anchored("(?i:FOO)(?:bar)?", Duration::from_secs(1)).unwrap();
    assert!(re.match_string("foo").await.unwrap());
    assert!(re.match_string("foobar").await.unwrap());
}

#[tokio::test]
async fn supports_posix_character_classes() {
    let re = Regex::compile_anchored("[[:digit:]]+", Duration::from_secs(1)).unwrap();
    assert!(re.match_string("12345").await.unwrap());
    assert!(!re.match_string("abc").await.unwrap());
}

#[tokio::test]
async fn supports_lookaround() {
    let re = Regex::compile_anchored("v(?=1\\.)\\d+\\.\\d+", Duration::from_secs(1)).unwrap();
    assert!(re.match_string("v1.0").await.unwrap());
    assert!(!re.match_string("v2.0").await.unwrap());
}

#[test]
fn invalid_pattern_fails_to_compile() {
    let err = Regex::compile("(unclosed").unwrap_err();
    assert!(matches!(err, PurgeError::RegexCompile(_)));
}

#[tokio::test]
async fn vanishingly_small_timeout_is_reported_as_timeout() {
    // A 1ns deadline is shorter than the thread-spawn overhead of the
    // blocking match itself, so this deterministically exercises the
    // timeout path regardless of how fast the pattern happens to match.
    let re = Regex::compile_anchored(".*", Duration::from_nanos(1)).unwrap();
    let err = re.match_string("anything").await.unwrap_err();
    assert!(matches!(err, PurgeError::RegexTimeout(_)));
}
