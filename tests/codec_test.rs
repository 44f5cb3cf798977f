use tinybase::types::value::{
    bytes_to_value, compare, type_code_for, type_code_size, value_from_str, value_to_bytes,
    OperatorType, SchemaDataType, Value, BIG_INT, DATE, DATE_TIME, DOUBLE, EIGHT_BYTE_NULL,
    FOUR_BYTE_NULL, INT, ONE_BYTE_NULL, REAL, SMALL_INT, TEXT, TINY_INT, TWO_BYTE_NULL,
};

#[test]
fn test_type_code_sizes() {
    assert_eq!(type_code_size(ONE_BYTE_NULL), 1);
    assert_eq!(type_code_size(TWO_BYTE_NULL), 2);
    assert_eq!(type_code_size(FOUR_BYTE_NULL), 4);
    assert_eq!(type_code_size(EIGHT_BYTE_NULL), 8);
    assert_eq!(type_code_size(TINY_INT), 1);
    assert_eq!(type_code_size(SMALL_INT), 2);
    assert_eq!(type_code_size(INT), 4);
    assert_eq!(type_code_size(BIG_INT), 8);
    assert_eq!(type_code_size(REAL), 4);
    assert_eq!(type_code_size(DOUBLE), 8);
    assert_eq!(type_code_size(DATE_TIME), 8);
    assert_eq!(type_code_size(DATE), 8);
    assert_eq!(type_code_size(TEXT), 0);
    assert_eq!(type_code_size(TEXT + 17), 17);
}

#[test]
fn test_fixed_value_round_trip() {
    let cases = vec![
        (TINY_INT, Value::TinyInt(-7)),
        (SMALL_INT, Value::SmallInt(-30000)),
        (INT, Value::Int(123_456_789)),
        (BIG_INT, Value::BigInt(-9_876_543_210)),
        (REAL, Value::Real(1.5)),
        (DOUBLE, Value::Double(-2.25)),
        (DATE_TIME, Value::DateTime(1_577_923_200)),
        (DATE, Value::Date(1_577_836_800)),
    ];
    for (code, value) in cases {
        let bytes = value_to_bytes(code, &value).unwrap();
        assert_eq!(bytes.len(), type_code_size(code) as usize);
        assert_eq!(bytes_to_value(code, &bytes).unwrap(), value);
    }
}

#[test]
fn test_null_round_trip() {
    for code in [ONE_BYTE_NULL, TWO_BYTE_NULL, FOUR_BYTE_NULL, EIGHT_BYTE_NULL] {
        let bytes = value_to_bytes(code, &Value::Null).unwrap();
        assert_eq!(bytes, vec![0u8; type_code_size(code) as usize]);
        assert_eq!(bytes_to_value(code, &bytes).unwrap(), Value::Null);
    }
}

#[test]
fn test_integers_are_big_endian() {
    let bytes = value_to_bytes(INT, &Value::Int(0x0102_0304)).unwrap();
    assert_eq!(bytes, vec![0x01, 0x02, 0x03, 0x04]);

    let bytes = value_to_bytes(SMALL_INT, &Value::SmallInt(0x0a0b)).unwrap();
    assert_eq!(bytes, vec![0x0a, 0x0b]);

    let bytes = value_to_bytes(BIG_INT, &Value::BigInt(1)).unwrap();
    assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 0, 1]);
}

#[test]
fn test_text_is_reversed_on_disk() {
    let code = TEXT + 3;
    let bytes = value_to_bytes(code, &Value::Text("abc".to_string())).unwrap();
    assert_eq!(bytes, b"cba".to_vec());
    assert_eq!(
        bytes_to_value(code, &bytes).unwrap(),
        Value::Text("abc".to_string())
    );

    let empty = value_to_bytes(TEXT, &Value::Text(String::new())).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_type_code_for_values() {
    assert_eq!(
        type_code_for(SchemaDataType::Int, &Value::Int(5)).unwrap(),
        INT
    );
    assert_eq!(
        type_code_for(SchemaDataType::Text, &Value::Text("ab".to_string())).unwrap(),
        TEXT + 2
    );
    // NULL compresses to the narrowest width matching the schema type
    assert_eq!(
        type_code_for(SchemaDataType::TinyInt, &Value::Null).unwrap(),
        ONE_BYTE_NULL
    );
    assert_eq!(
        type_code_for(SchemaDataType::SmallInt, &Value::Null).unwrap(),
        TWO_BYTE_NULL
    );
    assert_eq!(
        type_code_for(SchemaDataType::Int, &Value::Null).unwrap(),
        FOUR_BYTE_NULL
    );
    assert_eq!(
        type_code_for(SchemaDataType::Double, &Value::Null).unwrap(),
        EIGHT_BYTE_NULL
    );
    assert_eq!(
        type_code_for(SchemaDataType::Text, &Value::Null).unwrap(),
        ONE_BYTE_NULL
    );
}

#[test]
fn test_compare_numeric_and_text() {
    let ops = [
        (OperatorType::Equal, false, true),
        (OperatorType::Unequal, true, false),
        (OperatorType::Smaller, true, false),
        (OperatorType::NotLarger, true, true),
        (OperatorType::Larger, false, false),
        (OperatorType::NotSmaller, false, true),
    ];
    // 3 vs 5, then 5 vs 5
    for (op, lt_expected, eq_expected) in ops {
        assert_eq!(
            compare(&Value::Int(3), &Value::Int(5), INT, INT, op),
            lt_expected
        );
        assert_eq!(
            compare(&Value::Int(5), &Value::Int(5), INT, INT, op),
            eq_expected
        );
    }

    assert!(compare(
        &Value::Text("apple".to_string()),
        &Value::Text("banana".to_string()),
        TEXT + 5,
        TEXT + 6,
        OperatorType::Smaller,
    ));
    assert!(compare(
        &Value::DateTime(100),
        &Value::DateTime(200),
        DATE_TIME,
        DATE_TIME,
        OperatorType::Smaller,
    ));
}

#[test]
fn test_null_never_matches() {
    for op in [
        OperatorType::Equal,
        OperatorType::Unequal,
        OperatorType::Larger,
        OperatorType::Smaller,
        OperatorType::NotLarger,
        OperatorType::NotSmaller,
    ] {
        assert!(!compare(&Value::Null, &Value::Int(1), FOUR_BYTE_NULL, INT, op));
        assert!(!compare(&Value::Int(1), &Value::Null, INT, FOUR_BYTE_NULL, op));
        assert!(!compare(
            &Value::Null,
            &Value::Null,
            ONE_BYTE_NULL,
            ONE_BYTE_NULL,
            op
        ));
    }
}

#[test]
fn test_date_parse_and_display() {
    let date = value_from_str(SchemaDataType::Date, "2020-03-01").unwrap();
    assert_eq!(date.to_string(), "2020-03-01");

    let datetime = value_from_str(SchemaDataType::DateTime, "2020-03-01_12:30:45").unwrap();
    assert_eq!(datetime.to_string(), "2020-03-01_12:30:45");

    assert!(value_from_str(SchemaDataType::Date, "not-a-date").is_err());
    assert!(value_from_str(SchemaDataType::Int, "abc").is_err());
}
