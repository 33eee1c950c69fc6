use super::*;

#[test]
fn parses_last_param_from_link_header() {
    let header = r#"</acr/v1/myrepo/_tags?last=v1.2.3&n=100&orderby=timedesc>; rel="next""#;
    assert_eq!(
        parse_link_last(Some(header)),
        Some("v1.2.3".to_string())
    );
}

#[test]
fn missing_header_terminates_pagination() {
    assert_eq!(parse_link_last(None), None);
}

#[test]
fn empty_last_value_terminates_pagination() {
    let header = r#"</acr/v1/myrepo/_tags?last=&n=100>; rel="next""#;
    assert_eq!(parse_link_last(Some(header)), None);
}

#[test]
fn missing_last_param_terminates_pagination() {
    let header = r#"</acr/v1/myrepo/_tags?n=100>; rel="next""#;
    assert_eq!(parse_link_last(Some(header)), None);
}

#[test]
fn malformed_header_terminates_pagination() {
    assert_eq!(parse_link_last(Some("not a link header")), None);
}

#[test]
fn decodes_percent_encoded_ampersand_in_last_value() {
    let header = r#"</acr/v1/myrepo/_tags?last=foo%26bar&n=100>; rel="next""#;
    assert_eq!(parse_link_last(Some(header)), Some("foo&bar".to_string()));
}

#[test]
fn attribute_update_unlock_sets_both_flags() {
    let update = AttributeUpdate::unlock();
    assert_eq!(update.delete_enabled, Some(true));
    assert_eq!(update.write_enabled, Some(true));
}

#[test]
fn tag_attr_serde_round_trips() {
    let tag = TagAttr {
        name: "latest".to_string(),
        digest: "sha256:abc".to_string(),
        last_update_time: None,
        delete_enabled: true,
        write_enabled: true,
    };
    let json = serde_json::to_string(&tag).unwrap();
    let back: TagAttr = serde_json::from_str(&json).unwrap();
    assert_eq!(tag, back);
}
