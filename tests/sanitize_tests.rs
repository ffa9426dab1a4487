//! Property tests for identifier sanitization and type inference

use dir_to_db::inference::{InferredType, infer_column_type};
use dir_to_db::validation::{is_sql_reserved_word, sanitize_identifier, table_name_for_file};
use proptest::prelude::*;

fn is_sanitized_shape(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

proptest! {
    #[test]
    fn sanitize_is_idempotent(raw in any::<String>()) {
        let once = sanitize_identifier(&raw);
        prop_assert_eq!(sanitize_identifier(&once), once);
    }

    #[test]
    fn sanitize_output_is_safe(raw in any::<String>()) {
        let sanitized = sanitize_identifier(&raw);
        prop_assert!(is_sanitized_shape(&sanitized));
        prop_assert!(!is_sql_reserved_word(&sanitized));
    }

    #[test]
    fn sanitize_keeps_plain_identifiers(raw in "[a-z_][a-z0-9_]{0,20}") {
        prop_assume!(!is_sql_reserved_word(&raw));
        prop_assert_eq!(sanitize_identifier(&raw), raw);
    }

    #[test]
    fn table_name_ignores_extension_case(stem in "[A-Za-z][A-Za-z0-9 ]{0,15}") {
        prop_assert_eq!(
            table_name_for_file(&format!("{}.csv", stem)),
            table_name_for_file(&format!("{}.CSV", stem))
        );
    }

    #[test]
    fn i32_values_are_integer(values in prop::collection::vec(any::<i32>(), 1..20)) {
        let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        prop_assert_eq!(
            infer_column_type(rendered.iter().map(String::as_str)),
            InferredType::Integer
        );
    }

    #[test]
    fn finite_floats_are_numeric(values in prop::collection::vec(-1.0e9f64..1.0e9, 1..20)) {
        let rendered: Vec<String> = values.iter().map(|v| format!("{:?}", v)).collect();
        let ty = infer_column_type(rendered.iter().map(String::as_str));
        prop_assert!(matches!(ty, InferredType::Real | InferredType::Integer));
    }
}

#[test]
fn sanitize_examples() {
    assert_eq!(sanitize_identifier("my_file"), "my_file");
    assert_eq!(sanitize_identifier("Order"), "order_1");
    assert_eq!(table_name_for_file("Order Details.csv"), "order_details");
}
