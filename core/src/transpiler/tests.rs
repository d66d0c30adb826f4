use std::sync::Arc;

use crate::error::Error;
use crate::parser::Parser;
use crate::source::{Col, Cols, Datatype, Source};

fn compile(src: &str, source: Source) -> String {
    let q = Parser::new()
        .parse(src)
        .unwrap()
        .with_source(Arc::new(source));
    q.compile("table").unwrap()
}

fn compile_err(src: &str, source: Source) -> Error {
    let q = Parser::new()
        .parse(src)
        .unwrap()
        .with_source(Arc::new(source));
    q.compile("table").unwrap_err()
}

fn flat(datatype: Datatype, name: &str) -> Col {
    Col::new(datatype, name, name, false)
}

fn string_source(names: &[&str]) -> Source {
    let mut cols = Cols::new();
    for name in names {
        cols = cols.with_col(flat(Datatype::String, name));
    }
    Source::new(cols)
}

// ------------------------------------------------------------------------
// Plain predicates
// ------------------------------------------------------------------------

#[test]
fn test_string_and_bool_equality() {
    let source = Source::new(
        Cols::new()
            .with_col(flat(Datatype::String, "a"))
            .with_col(flat(Datatype::Bool, "b")),
    );
    assert_eq!(
        compile("/table?a=\"b\"&b=true", source),
        "select * from table where a = 'b' and b = true"
    );
}

#[test]
fn test_inequality() {
    assert_eq!(
        compile("/table?a!=\"b\"", string_source(&["a"])),
        "select * from table where a != 'b'"
    );
}

#[test]
fn test_db_name_mapping() {
    let source = Source::new(
        Cols::new()
            .with_col(Col::new(Datatype::String, "colA", "col_a", false))
            .with_col(flat(Datatype::Bool, "b")),
    );
    assert_eq!(
        compile("/table?colA=\"b\"&b=true", source),
        "select * from table where col_a = 'b' and b = true"
    );
}

#[test]
fn test_null_tests() {
    assert_eq!(
        compile("/table?a=null", string_source(&["a"])),
        "select * from table where a is null"
    );
    assert_eq!(
        compile("/table?a!=null", string_source(&["a"])),
        "select * from table where a is not null"
    );
}

#[test]
fn test_numeric_comparisons() {
    let source = Source::new(
        Cols::new()
            .with_col(flat(Datatype::Number, "a"))
            .with_col(flat(Datatype::Number, "b"))
            .with_col(flat(Datatype::Number, "c"))
            .with_col(flat(Datatype::Number, "d")),
    );
    assert_eq!(
        compile("/table?a<1&b<=2&c>3&d>=4", source),
        "select * from table where a < 1 and b <= 2 and c > 3 and d >= 4"
    );
}

#[test]
fn test_time_comparison() {
    let source = Source::new(Cols::new().with_col(flat(Datatype::Time, "t")));
    assert_eq!(
        compile("/table?t>\"2020-01-01\"", source),
        "select * from table where t > '2020-01-01'"
    );
}

#[test]
fn test_like() {
    assert_eq!(
        compile("/table?a~=\"b\"", string_source(&["a"])),
        "select * from table where a like '%b%'"
    );
}

#[test]
fn test_apostrophes_doubled() {
    assert_eq!(
        compile("/table?a=\"it's\"", string_source(&["a"])),
        "select * from table where a = 'it''s'"
    );
}

#[test]
fn test_or_group_parenthesized() {
    assert_eq!(
        compile("/table?(a=\"a\"|a=\"b\")&b=\"c\"", string_source(&["a", "b"])),
        "select * from table where (a = 'a' or a = 'b') and b = 'c'"
    );
}

// ------------------------------------------------------------------------
// Lists and arrays
// ------------------------------------------------------------------------

#[test]
fn test_in_list() {
    assert_eq!(
        compile("/table?a={\"b\",\"c\"}", string_source(&["a"])),
        "select * from table where a in ('b', 'c')"
    );
}

#[test]
fn test_not_in_list() {
    assert_eq!(
        compile("/table?a!={\"b\",\"c\"}", string_source(&["a"])),
        "select * from table where a not in ('b', 'c')"
    );
}

#[test]
fn test_in_list_with_negative_number() {
    // The first member decides the list kind, so the unary-negated value
    // has to follow a plain constant.
    let source = Source::new(Cols::new().with_col(flat(Datatype::Number, "a")));
    assert_eq!(
        compile("/table?a={2,-1}", source),
        "select * from table where a in (2, -1)"
    );
}

#[test]
fn test_list_opening_with_unary_is_rejected() {
    let source = Source::new(Cols::new().with_col(flat(Datatype::Number, "a")));
    assert_eq!(
        compile_err("/table?a={-1}", source),
        Error::must_be("a", 7, "array of object", "any")
    );
}

#[test]
fn test_array_containment() {
    let source = Source::new(Cols::new().with_col(Col::new(Datatype::String, "b", "b", true)));
    assert_eq!(
        compile("/table?b=\"a\"", source),
        "select * from table where b @> '\"a\"'"
    );
}

#[test]
fn test_array_containment_negated() {
    let source = Source::new(Cols::new().with_col(Col::new(Datatype::String, "b", "b", true)));
    assert_eq!(
        compile("/table?b!=\"a\"", source),
        "select * from table where not b @> '\"a\"'"
    );
}

#[test]
fn test_array_containment_numeric() {
    let source = Source::new(Cols::new().with_col(Col::new(Datatype::Number, "n", "n", true)));
    assert_eq!(
        compile("/table?n=5", source),
        "select * from table where n @> '5'"
    );
}

// ------------------------------------------------------------------------
// JSON object predicates
// ------------------------------------------------------------------------

fn object_source(is_array: bool) -> Source {
    Source::new(
        Cols::new().with_col(
            Col::new(Datatype::Object, "a", "a", is_array)
                .with_children(Cols::new().with_col(flat(Datatype::String, "b"))),
        ),
    )
}

#[test]
fn test_object_predicate() {
    assert_eq!(
        compile("/table?a={b=\"b\"}", object_source(false)),
        "select * from table where (a #>> '{b}')::text = 'b'::text"
    );
}

#[test]
fn test_array_of_object_predicate() {
    assert_eq!(
        compile("/table?a={b=\"b\"}", object_source(true)),
        "select * from table where exists (select 1 from (select \
         jsonb_array_elements(a::jsonb) item) q where (q.item #>> '{b}')::text = 'b'::text)"
    );
}

#[test]
fn test_deep_json_path_members() {
    let source = Source::new(
        Cols::new()
            .with_col(Col::new(Datatype::String, "b", "b", true))
            .with_col(
                Col::new(Datatype::Object, "a", "a", true).with_children(
                    Cols::new()
                        .with_col(flat(Datatype::String, "b"))
                        .with_col(
                            Col::new(Datatype::Object, "c", "c", true).with_children(
                                Cols::new().with_col(flat(Datatype::Number, "d")),
                            ),
                        ),
                ),
            ),
    );
    assert_eq!(
        compile("/a,b@table?a={b=\"b\",c.d=4}&b=\"a\"", source),
        "select a, b from table where exists (select 1 from (select \
         jsonb_array_elements(a::jsonb) item) q where (q.item #>> '{b}')::text = 'b'::text \
         and (q.item #>> '{c,d}')::numeric = 4::numeric) and b @> '\"a\"'"
    );
}

#[test]
fn test_object_member_null_uncast() {
    assert_eq!(
        compile("/table?a={b=null}", object_source(false)),
        "select * from table where (a #>> '{b}')::text is null"
    );
}

#[test]
fn test_object_member_bool_uncast() {
    let source = Source::new(
        Cols::new().with_col(
            Col::new(Datatype::Object, "a", "a", false)
                .with_children(Cols::new().with_col(flat(Datatype::Bool, "b"))),
        ),
    );
    assert_eq!(
        compile("/table?a={b=true}", source),
        "select * from table where (a #>> '{b}')::boolean = true"
    );
}

#[test]
fn test_object_member_like() {
    assert_eq!(
        compile("/table?a={b~=\"x\"}", object_source(false)),
        "select * from table where (a #>> '{b}')::text like '%x%'::text"
    );
}

// ------------------------------------------------------------------------
// Projection, ordering, limits
// ------------------------------------------------------------------------

#[test]
fn test_projection() {
    assert_eq!(
        compile("/field1,field2@table", string_source(&["field1", "field2"])),
        "select field1, field2 from table"
    );
}

#[test]
fn test_projection_uses_db_names() {
    let source = Source::new(
        Cols::new().with_col(Col::new(Datatype::String, "colA", "col_a", false)),
    );
    assert_eq!(compile("/colA@table", source), "select col_a from table");
}

#[test]
fn test_order_by() {
    assert_eq!(
        compile("/table:+a,-b", string_source(&["a", "b"])),
        "select * from table order by a asc, b desc"
    );
}

#[test]
fn test_order_by_json_path() {
    let source = Source::new(
        Cols::new().with_col(
            Col::new(Datatype::Object, "a", "a", false)
                .with_children(Cols::new().with_col(flat(Datatype::Number, "b"))),
        ),
    );
    assert_eq!(
        compile("/table:+a.b", source),
        "select * from table order by (a #>> '{b}')::numeric asc"
    );
}

#[test]
fn test_limits() {
    assert_eq!(
        compile("/table[2:1]", string_source(&[])),
        "select * from table limit 1 offset 2"
    );
    assert_eq!(
        compile("/table[:5]", string_source(&[])),
        "select * from table limit 5"
    );
    assert_eq!(
        compile("/table[2:]", string_source(&[])),
        "select * from table offset 2"
    );
}

#[test]
fn test_everything_in_order() {
    assert_eq!(
        compile("/a@table?a=\"x\":-a[10:20]", string_source(&["a"])),
        "select a from table where a = 'x' order by a desc limit 20 offset 10"
    );
}

// ------------------------------------------------------------------------
// Errors
// ------------------------------------------------------------------------

#[test]
fn test_unknown_column() {
    assert_eq!(
        compile_err("/table?z=1", string_source(&["a"])),
        Error::not_defined("z", 7)
    );
}

#[test]
fn test_unknown_projection() {
    assert_eq!(
        compile_err("/z@table", string_source(&["a"])),
        Error::not_defined("z", 1)
    );
}

#[test]
fn test_projection_rejects_json_field() {
    assert_eq!(
        compile_err("/a.b@table", object_source(false)),
        Error::must_be("a.b", 1, "a column", "a json field")
    );
}

#[test]
fn test_like_needs_string_column() {
    let source = Source::new(Cols::new().with_col(flat(Datatype::Number, "n")));
    assert_eq!(
        compile_err("/table?n~=\"x\"", source),
        Error::must_be("n", 7, "string", "any")
    );
}

#[test]
fn test_number_column_rejects_string_bound() {
    let source = Source::new(Cols::new().with_col(flat(Datatype::Number, "n")));
    assert_eq!(
        compile_err("/table?n<\"x\"", source),
        Error::must_be("x", 9, "number", "STRING")
    );
}

#[test]
fn test_time_column_rejects_int_bound() {
    let source = Source::new(Cols::new().with_col(flat(Datatype::Time, "t")));
    assert_eq!(
        compile_err("/table?t>5", source),
        Error::must_be("5", 9, "time", "INT")
    );
}

#[test]
fn test_bool_column_rejects_range_comparison() {
    let source = Source::new(Cols::new().with_col(flat(Datatype::Bool, "b")));
    assert_eq!(
        compile_err("/table?b<1", source),
        Error::must_be("b", 7, "number or time", "any")
    );
}

#[test]
fn test_in_list_rejects_object_column() {
    assert_eq!(
        compile_err("/table?a={1}", object_source(false)),
        Error::must_be("a", 7, "boolean/numeric/text/timestamp", "object")
    );
}

#[test]
fn test_in_list_rejects_array_column() {
    let source = Source::new(Cols::new().with_col(Col::new(Datatype::String, "a", "a", true)));
    assert_eq!(
        compile_err("/table?a={1}", source),
        Error::must_be("a", 7, "boolean/numeric/text/timestamp", "array")
    );
}

#[test]
fn test_json_predicate_needs_object_column() {
    assert_eq!(
        compile_err("/table?a={b=1}", string_source(&["a"])),
        Error::must_be("a", 7, "array of object", "any")
    );
}

#[test]
fn test_mixed_list_rejected() {
    // A list that opens with a constant is an in-list; a binary member
    // inside it cannot be compiled.
    let err = compile_err("/table?a={1,b=2}", string_source(&["a"]));
    assert!(matches!(err, Error::Unexpected { .. }), "got {:?}", err);
}

#[test]
fn test_json_member_like_needs_string_pattern() {
    assert_eq!(
        compile_err("/table?a={b~=true}", object_source(false)),
        Error::must_be("a.b", 10, "string", "IDENT")
    );
}

#[test]
fn test_unknown_json_member() {
    assert_eq!(
        compile_err("/table?a={z=1}", object_source(false)),
        Error::not_defined("a.z", 10)
    );
}

#[test]
fn test_source_not_bound() {
    let q = Parser::new().parse("/table?a=1").unwrap();
    assert_eq!(q.compile("table").unwrap_err(), Error::SourceNotDefined);
}

#[test]
fn test_free_floating_query_has_no_path() {
    let q = crate::query::Query::default().with_source(Arc::new(string_source(&[])));
    assert_eq!(q.compile("table").unwrap_err(), Error::PathNotDefined);
}

// ------------------------------------------------------------------------
// Properties
// ------------------------------------------------------------------------

#[test]
fn test_compile_is_idempotent() {
    let q = Parser::new()
        .parse("/table?a=\"b\"|b=\"c\":-a[1:2]")
        .unwrap()
        .with_source(Arc::new(string_source(&["a", "b"])));
    assert_eq!(q.compile("table").unwrap(), q.compile("table").unwrap());
}

#[test]
fn test_rebinding_to_another_source() {
    let q = Parser::new().parse("/table?a=\"x\"").unwrap();
    let first = q
        .clone()
        .with_source(Arc::new(string_source(&["a"])))
        .compile("table")
        .unwrap();
    let renamed = Source::new(
        Cols::new().with_col(Col::new(Datatype::String, "a", "a_renamed", false)),
    );
    let second = q
        .with_source(Arc::new(renamed))
        .compile("table")
        .unwrap();
    assert_eq!(first, "select * from table where a = 'x'");
    assert_eq!(second, "select * from table where a_renamed = 'x'");
}
