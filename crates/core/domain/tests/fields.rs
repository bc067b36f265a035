use domain::{BufferedWrite, FieldIndex, FieldValues};

#[test]
fn field_index_parses_exact_names() {
    let field = FieldIndex::parse("field3").expect("field3");
    assert_eq!(field.index(), 2);
    assert_eq!(field.number(), 3);
    assert_eq!(field.name(), "field3");
    assert_eq!(field.to_string(), "field3");

    assert!(FieldIndex::parse("field0").is_none());
    assert!(FieldIndex::parse("field9").is_none());
    assert!(FieldIndex::parse("Field1").is_none());
    assert!(FieldIndex::parse("field1 ").is_none());
    assert!(FieldIndex::from_number(0).is_none());
    assert_eq!(FieldIndex::from_number(8), FieldIndex::parse("field8"));
}

#[test]
fn field_values_get_and_set() {
    let field2 = FieldIndex::parse("field2").expect("field2");
    let mut values = FieldValues::default();
    assert!(values.is_empty());

    values.set(field2, Some(8.0));
    assert_eq!(values.get(field2), Some(8.0));
    assert!(!values.is_empty());

    let present: Vec<_> = values
        .iter()
        .filter_map(|(field, value)| value.map(|v| (field.name(), v)))
        .collect();
    assert_eq!(present, vec![("field2", 8.0)]);
}

#[test]
fn buffered_write_defaults() {
    let field1 = FieldIndex::parse("field1").expect("field1");
    let write = BufferedWrite::new(5, FieldValues::default().with(field1, Some(1.5)));
    assert_eq!(write.channel_id, 5);
    assert_eq!(write.fields.get(field1), Some(1.5));
    assert!(write.status.is_none());
    assert!(write.location.latitude.is_none());
}
