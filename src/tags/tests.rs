use super::{builtins, ContentKind, DisabledSet, ParamSpec, TagDefinition, TagTable};
use crate::error::ConfigError;

#[test]
pub fn defaults_compile() {
    let table = builtins::default_table().unwrap();
    assert_eq!(table.len(), builtins::default_tags().len());
    assert!(table.lookup("quote").unwrap().block_level);
    assert!(table.lookup("blink").is_none());
}

#[test]
pub fn names_are_lowercased() {
    let table = TagTable::new(vec![TagDefinition::new("B", ContentKind::Parsed)]).unwrap();
    assert_eq!(table.lookup("b").unwrap().tag, "b");
}

#[test]
pub fn rejects_bad_definitions() {
    assert!(matches!(
        TagTable::new(vec![TagDefinition::new("no-dash", ContentKind::Parsed)]),
        Err(ConfigError::InvalidTagName(_))
    ));
    assert!(matches!(
        TagTable::new(vec![TagDefinition::new("hr", ContentKind::Closed).content("<hr title=\"$1\">")]),
        Err(ConfigError::ClosedTagArgument(_))
    ));
    assert!(matches!(
        TagTable::new(vec![
            TagDefinition::new("img", ContentKind::UnparsedContent).param("Width", ParamSpec::optional())
        ]),
        Err(ConfigError::InvalidParamName { .. })
    ));
    assert!(matches!(
        TagTable::new(vec![TagDefinition::new("color", ContentKind::Parsed).test("(")]),
        Err(ConfigError::TagPattern { .. })
    ));
}

#[test]
pub fn scanner_respects_word_boundaries() {
    let table = builtins::default_table().unwrap();
    let text = "[bold] [B]x[/b] [*]";
    assert_eq!(table.find_candidate(text, 0), Some(7));
    assert_eq!(table.find_candidate(text, 8), Some(11));
    assert_eq!(table.find_candidate(text, 12), Some(16));
    assert_eq!(table.find_candidate("no tags here", 0), None);
}

#[test]
pub fn candidates_keep_registration_order() {
    let table = builtins::default_table().unwrap();
    let kinds: Vec<_> = table
        .candidates('U')
        .filter(|t| t.def.tag == "url")
        .map(|t| t.def.kind.clone())
        .collect();
    assert_eq!(kinds[0], ContentKind::UnparsedContent);
    assert!(kinds[1].wants_equals());
}

#[test]
pub fn disabled_set_is_case_insensitive() {
    let set: DisabledSet = ["B", "quote"].into_iter().collect();
    assert!(set.contains("b"));
    assert!(set.contains("quote"));
    assert_eq!(set.iter().collect::<Vec<_>>(), ["b", "quote"]);
}

#[cfg(feature = "serde")]
#[test]
pub fn definitions_from_json() {
    let table = TagTable::from_json(
        r#"[
            {"tag": "spoiler", "kind": {"type": "parsed"}, "before": "<details>", "after": "</details>", "block_level": true},
            {"tag": "hl", "kind": {"type": "unparsed_equals", "quoted": "optional"}, "before": "<mark title=\"$1\">", "after": "</mark>"}
        ]"#,
    )
    .unwrap();

    let spoiler = table.lookup("spoiler").unwrap();
    assert!(spoiler.block_level);
    assert_eq!(spoiler.kind, ContentKind::Parsed);
    assert!(table.lookup("hl").unwrap().kind.wants_equals());
}
