//! Integration tests for document validation, built around a blog post fixture.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use schemer::validators::{length, one_of};
use schemer::{
    schema_from_description, Array, ErrorKind, FieldSpec, Mixed, PrimitiveType, Schema, TypeSpec,
    ValidateError, ValidationError,
};
use serde_json::{json, Value};

// === Fixture ===

const STUB_NOW: &str = "2012-04-05T00:00:00Z";

fn stubnow() -> Value {
    json!(STUB_NOW)
}

fn name_schema() -> &'static Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Arc::new(
            Schema::new([
                ("first", FieldSpec::new(PrimitiveType::String).required()),
                ("last", FieldSpec::new(PrimitiveType::String).required()),
            ])
            .unwrap(),
        )
    })
}

fn about_schema() -> &'static Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Arc::new(
            Schema::new([
                ("first_name", FieldSpec::new(PrimitiveType::String).required()),
                ("last_name", FieldSpec::new(PrimitiveType::String).required()),
                ("birth_year", FieldSpec::new(PrimitiveType::Integer).required()),
                ("birth_month", FieldSpec::new(PrimitiveType::Integer).required()),
                ("birth_day", FieldSpec::new(PrimitiveType::Integer).required()),
            ])
            .unwrap(),
        )
    })
}

fn comment_schema() -> &'static Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Arc::new(
            Schema::new([
                ("commenter", FieldSpec::new(name_schema()).required()),
                ("email", FieldSpec::new(PrimitiveType::String)),
                ("comment", FieldSpec::new(PrimitiveType::String).required()),
                ("votes", FieldSpec::new(PrimitiveType::Integer).default(0)),
            ])
            .unwrap(),
        )
    })
}

/// Picks the author shape from the author sub-document.
fn author_type() -> TypeSpec {
    TypeSpec::resolver(|document| {
        let has_first_name = document
            .get("author")
            .and_then(|author| author.get("first_name"))
            .is_some();
        if has_first_name {
            about_schema().into()
        } else {
            name_schema().into()
        }
    })
}

fn blog_post_schema() -> &'static Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let content = Schema::new([
            ("title", FieldSpec::new(PrimitiveType::String).required()),
            ("text", FieldSpec::new(PrimitiveType::String).required()),
            ("page_views", FieldSpec::new(PrimitiveType::Integer).default(1)),
        ])
        .unwrap();
        let meta = Schema::new([("last_edited", FieldSpec::new(PrimitiveType::DateTime))]).unwrap();

        Arc::new(
            Schema::new([
                ("author", FieldSpec::new(author_type()).required()),
                ("content", FieldSpec::new(content).required()),
                ("meta", FieldSpec::new(meta).required().nullable()),
                (
                    "category",
                    FieldSpec::new(PrimitiveType::String).validates(one_of(["cooking", "politics"])),
                ),
                ("comments", FieldSpec::new(Array::new(comment_schema())).required()),
                ("likes", FieldSpec::new(PrimitiveType::Integer).default(0)),
                ("creation_date", FieldSpec::new(PrimitiveType::DateTime).default_with(stubnow)),
                (
                    "tags",
                    FieldSpec::new(Array::new(PrimitiveType::String))
                        .default(json!(["blog"]))
                        .validates(length(1)),
                ),
                (
                    "misc",
                    FieldSpec::new(Mixed::new([PrimitiveType::String, PrimitiveType::Integer]).unwrap()),
                ),
                (
                    "linked_id",
                    FieldSpec::new(Mixed::new([PrimitiveType::Integer, PrimitiveType::String]).unwrap()),
                ),
                ("external_code", FieldSpec::new(PrimitiveType::String)),
            ])
            .unwrap(),
        )
    })
}

fn valid_doc() -> Value {
    json!({
        "author": {
            "first": "John",
            "last": "Humphreys"
        },
        "content": {
            "title": "How to make cookies",
            "text": "First start by pre-heating the oven..."
        },
        "category": "cooking",
        "meta": null,
        "comments": [
            {
                "commenter": {
                    "first": "Julio",
                    "last": "Cesar"
                },
                "email": "jcesar@test.com",
                "comment": "Great post dude!"
            },
            {
                "commenter": {
                    "first": "Michael",
                    "last": "Andrews"
                },
                "comment": "My wife loves these."
            }
        ],
        "tags": ["cookies", "recipe", "yum"],
        "external_code": "ABC123"
    })
}

fn doc_with(overrides: Value) -> Value {
    let mut doc = valid_doc();
    let map = doc.as_object_mut().unwrap();
    for (key, value) in overrides.as_object().unwrap() {
        map.insert(key.clone(), value.clone());
    }
    doc
}

fn doc_without(field: &str) -> Value {
    let mut doc = valid_doc();
    doc.as_object_mut().unwrap().remove(field);
    doc
}

fn errors_for(doc: &Value) -> Vec<ValidationError> {
    blog_post_schema().validate(doc).errors
}

fn paths(errors: &[ValidationError]) -> Vec<&str> {
    errors.iter().map(|e| e.path.as_str()).collect()
}

fn assert_single(errors: &[ValidationError], path: &str, kind: &ErrorKind) {
    assert_eq!(errors.len(), 1, "expected one error, got {:?}", errors);
    assert_eq!(errors[0].path, path);
    assert_eq!(&errors[0].kind, kind);
}

fn mismatch(expected: &str, actual: &str) -> ErrorKind {
    ErrorKind::TypeMismatch {
        expected: expected.into(),
        actual: actual.into(),
    }
}

// === Round Trip ===

mod round_trip {
    use super::*;

    #[test]
    fn valid_document_has_no_errors() {
        let result = blog_post_schema().validate(&valid_doc());
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn defaulted_copy_adds_only_defaults() {
        let result = blog_post_schema().validate(&valid_doc());

        let mut expected = valid_doc();
        expected["likes"] = json!(0);
        expected["creation_date"] = json!(STUB_NOW);
        expected["content"]["page_views"] = json!(1);
        expected["comments"][0]["votes"] = json!(0);
        expected["comments"][1]["votes"] = json!(0);

        assert_eq!(result.document, expected);
    }

    #[test]
    fn input_document_is_untouched() {
        let doc = valid_doc();
        let _ = blog_post_schema().validate(&doc);
        assert_eq!(doc, valid_doc());
    }

    #[test]
    fn validate_in_place_matches_copy() {
        let mut doc = valid_doc();
        let errors = blog_post_schema().validate_in_place(&mut doc);
        assert!(errors.is_empty());
        assert_eq!(doc, blog_post_schema().validate(&valid_doc()).document);
    }

    #[test]
    fn into_result_returns_defaulted_document() {
        let doc = blog_post_schema().validate(&valid_doc()).into_result().unwrap();
        assert_eq!(doc["likes"], json!(0));

        let err = blog_post_schema()
            .validate(&doc_without("author"))
            .into_result()
            .unwrap_err();
        assert!(matches!(err, ValidateError::Invalid { ref errors } if errors.len() == 1));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn validation_is_idempotent() {
        let schema = blog_post_schema();
        let first = schema.validate(&valid_doc());
        let second = schema.validate(&first.document);
        assert!(second.is_valid());
        assert_eq!(second.document, first.document);
    }
}

// === Required Fields ===

mod required_fields {
    use super::*;

    #[test]
    fn missing_author() {
        let errors = errors_for(&doc_without("author"));
        assert_single(&errors, "author", &ErrorKind::MissingRequiredField);
    }

    #[test]
    fn missing_comments() {
        let errors = errors_for(&doc_without("comments"));
        assert_single(&errors, "comments", &ErrorKind::MissingRequiredField);
    }

    #[test]
    fn missing_nested_field() {
        let errors = errors_for(&doc_with(json!({ "content": { "text": "..." } })));
        assert_single(&errors, "content.title", &ErrorKind::MissingRequiredField);
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let mut doc = doc_without("category");
        let map = doc.as_object_mut().unwrap();
        map.remove("external_code");
        map.remove("misc");
        assert!(errors_for(&doc).is_empty());
    }

    #[test]
    fn errors_accumulate_across_fields() {
        let mut doc = doc_without("author");
        doc.as_object_mut().unwrap().remove("content");
        doc["category"] = json!("baking");

        let errors = errors_for(&doc);
        assert_eq!(paths(&errors), vec!["author", "content", "category"]);
    }
}

// === Nullable Fields ===

mod nullable_fields {
    use super::*;

    #[test]
    fn nullable_field_accepts_null() {
        assert!(errors_for(&doc_with(json!({ "meta": null }))).is_empty());
    }

    #[test]
    fn nullable_field_still_type_checked_when_present() {
        assert!(errors_for(&doc_with(json!({ "meta": { "last_edited": STUB_NOW } }))).is_empty());

        let errors = errors_for(&doc_with(json!({ "meta": { "last_edited": "yesterday" } })));
        assert_single(&errors, "meta.last_edited", &mismatch("datetime", "string"));
    }

    #[test]
    fn non_nullable_field_rejects_null() {
        let errors = errors_for(&doc_with(json!({ "external_code": null })));
        assert_single(&errors, "external_code", &ErrorKind::NullNotAllowed);
    }

    #[test]
    fn null_is_not_absence() {
        // A defaulted field set to null gets an error, not its default.
        let result = blog_post_schema().validate(&doc_with(json!({ "likes": null })));
        assert_single(&result.errors, "likes", &ErrorKind::NullNotAllowed);
        assert_eq!(result.document["likes"], Value::Null);
    }
}

// === Defaults ===

mod defaults {
    use super::*;

    #[test]
    fn defaults_fill_absent_fields() {
        let result = blog_post_schema().validate(&doc_without("tags"));
        assert!(result.is_valid());
        assert_eq!(result.document["tags"], json!(["blog"]));
    }

    #[test]
    fn present_fields_keep_their_values() {
        let result = blog_post_schema().validate(&doc_with(json!({ "likes": 12 })));
        assert_eq!(result.document["likes"], json!(12));
    }

    #[test]
    fn mutable_defaults_are_not_shared() {
        let schema = blog_post_schema();
        let mut first = schema.validate(&doc_without("tags")).document;
        let second = schema.validate(&doc_without("tags")).document;

        first["tags"].as_array_mut().unwrap().push(json!("mutated"));

        assert_eq!(second["tags"], json!(["blog"]));
        assert_eq!(schema.validate(&doc_without("tags")).document["tags"], json!(["blog"]));
    }

    #[test]
    fn producer_called_per_document() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let schema = Schema::new([(
            "id",
            FieldSpec::new(PrimitiveType::Integer)
                .default_with(|| json!(CALLS.fetch_add(1, Ordering::SeqCst))),
        )])
        .unwrap();

        let a = schema.validate(&json!({})).document;
        let b = schema.validate(&json!({})).document;
        assert_ne!(a["id"], b["id"]);
        assert_eq!(schema.validate(&json!({ "id": 99 })).document["id"], json!(99));
    }

    #[test]
    fn defaults_applied_to_invalid_documents() {
        let result = blog_post_schema().validate(&doc_without("author"));
        assert!(!result.is_valid());
        assert_eq!(result.document["likes"], json!(0));
        assert_eq!(result.document["creation_date"], json!(STUB_NOW));
    }

    #[test]
    fn nested_defaults_skip_mismatched_elements() {
        let result = blog_post_schema().validate(&doc_with(json!({
            "comments": [
                "not a comment",
                { "commenter": { "first": "A", "last": "B" }, "comment": "ok" }
            ]
        })));
        assert_eq!(result.document["comments"][0], json!("not a comment"));
        assert_eq!(result.document["comments"][1]["votes"], json!(0));
    }

    #[test]
    fn defaulted_sub_document_gets_its_own_defaults() {
        let content = Schema::new([
            ("title", FieldSpec::new(PrimitiveType::String).required()),
            ("page_views", FieldSpec::new(PrimitiveType::Integer).default(1)),
        ])
        .unwrap();
        let schema = Schema::new([(
            "content",
            FieldSpec::new(content).default(json!({ "title": "untitled" })),
        )])
        .unwrap();

        let result = schema.validate(&json!({}));
        assert!(result.is_valid());
        assert_eq!(
            result.document,
            json!({ "content": { "title": "untitled", "page_views": 1 } })
        );
    }

    #[test]
    fn defaulted_list_of_sub_documents_gets_their_defaults() {
        let comment = Arc::new(
            Schema::new([
                ("comment", FieldSpec::new(PrimitiveType::String).required()),
                ("votes", FieldSpec::new(PrimitiveType::Integer).default(0)),
            ])
            .unwrap(),
        );
        let schema = Schema::new([(
            "comments",
            FieldSpec::new(Array::new(&comment)).default_with(|| json!([{ "comment": "first!" }])),
        )])
        .unwrap();

        let result = schema.validate(&json!({}));
        assert!(result.is_valid());
        assert_eq!(
            result.document["comments"],
            json!([{ "comment": "first!", "votes": 0 }])
        );
    }
}

// === Arrays ===

mod arrays {
    use super::*;

    #[test]
    fn element_mismatch_has_indexed_path() {
        let errors = errors_for(&doc_with(json!({ "tags": ["cookies", "recipe", 3] })));
        assert_single(&errors, "tags[2]", &mismatch("string", "integer"));
    }

    #[test]
    fn every_bad_element_is_reported() {
        let errors = errors_for(&doc_with(json!({ "tags": [1, "ok", false] })));
        assert_eq!(paths(&errors), vec!["tags[0]", "tags[2]"]);
    }

    #[test]
    fn nested_schema_elements() {
        let errors = errors_for(&doc_with(json!({
            "comments": [
                { "commenter": { "first": "Julio", "last": "Cesar" }, "comment": "Great post dude!" },
                { "comment": "My wife loves these." }
            ]
        })));
        assert_single(&errors, "comments[1].commenter", &ErrorKind::MissingRequiredField);
    }

    #[test]
    fn deeply_nested_paths() {
        let errors = errors_for(&doc_with(json!({
            "comments": [
                { "commenter": { "first": "Julio", "last": 7 }, "comment": "Great post dude!" }
            ]
        })));
        assert_single(&errors, "comments[0].commenter.last", &mismatch("string", "integer"));
    }

    #[test]
    fn non_list_value() {
        let errors = errors_for(&doc_with(json!({ "tags": "cookies" })));
        assert_single(&errors, "tags", &mismatch("array(string)", "string"));
    }

    #[test]
    fn empty_array_is_type_valid_but_fails_length() {
        let errors = errors_for(&doc_with(json!({ "tags": [] })));
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0].kind,
            ErrorKind::ValidatorFailed { validator, .. } if validator == "length"
        ));
    }

    #[test]
    fn empty_comment_list_is_valid() {
        assert!(errors_for(&doc_with(json!({ "comments": [] }))).is_empty());
    }
}

// === Mixed Types ===

mod mixed_type {
    use super::*;

    #[test]
    fn accepts_any_member() {
        assert!(errors_for(&doc_with(json!({ "misc": "text", "linked_id": 42 }))).is_empty());
        assert!(errors_for(&doc_with(json!({ "misc": 7, "linked_id": "abc" }))).is_empty());
    }

    #[test]
    fn rejects_non_members() {
        let errors = errors_for(&doc_with(json!({ "linked_id": 123.45 })));
        assert_single(&errors, "linked_id", &mismatch("mixed(integer, string)", "float"));
    }

    #[test]
    fn booleans_are_not_integers() {
        let errors = errors_for(&doc_with(json!({ "misc": true })));
        assert_single(&errors, "misc", &mismatch("mixed(string, integer)", "boolean"));
    }

    #[test]
    fn construction_needs_two_members() {
        assert!(Mixed::new([PrimitiveType::Integer]).is_err());
        assert!(Mixed::new([PrimitiveType::Integer, PrimitiveType::String]).is_ok());
    }

    #[test]
    fn member_schema_defaults_applied() {
        let counter = Schema::new([("count", FieldSpec::new(PrimitiveType::Integer).default(0))]).unwrap();
        let schema = Schema::new([(
            "stat",
            FieldSpec::new(Mixed::new([TypeSpec::from(PrimitiveType::Integer), counter.into()]).unwrap()),
        )])
        .unwrap();

        let result = schema.validate(&json!({ "stat": {} }));
        assert!(result.is_valid());
        assert_eq!(result.document, json!({ "stat": { "count": 0 } }));
    }
}

// === Validators ===

mod validators {
    use super::*;

    #[test]
    fn one_of_rejects_other_values() {
        let errors = errors_for(&doc_with(json!({ "category": "baking" })));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "category");
        assert!(matches!(
            &errors[0].kind,
            ErrorKind::ValidatorFailed { validator, .. } if validator == "one_of"
        ));
    }

    #[test]
    fn validators_skipped_on_type_mismatch() {
        let errors = errors_for(&doc_with(json!({ "category": 3 })));
        assert_single(&errors, "category", &mismatch("string", "integer"));
    }
}

// === Polymorphic Fields ===

mod polymorphic {
    use super::*;

    fn about_author() -> Value {
        json!({
            "first_name": "John",
            "last_name": "Humphreys",
            "birth_year": 1980,
            "birth_month": 6,
            "birth_day": 2
        })
    }

    #[test]
    fn name_shape_selected_without_first_name() {
        assert!(errors_for(&valid_doc()).is_empty());

        let errors = errors_for(&doc_with(json!({ "author": { "first": "John" } })));
        assert_single(&errors, "author.last", &ErrorKind::MissingRequiredField);
    }

    #[test]
    fn about_shape_selected_with_first_name() {
        assert!(errors_for(&doc_with(json!({ "author": about_author() }))).is_empty());

        let errors = errors_for(&doc_with(json!({
            "author": { "first_name": "John", "last_name": "Humphreys" }
        })));
        assert_eq!(
            paths(&errors),
            vec!["author.birth_year", "author.birth_month", "author.birth_day"]
        );
    }

    #[test]
    fn about_shape_type_errors() {
        let mut author = about_author();
        author["birth_year"] = json!("1980");
        let errors = errors_for(&doc_with(json!({ "author": author })));
        assert_single(&errors, "author.birth_year", &mismatch("integer", "string"));
    }

    #[test]
    fn name_fields_do_not_satisfy_about_shape() {
        let errors = errors_for(&doc_with(json!({
            "author": { "first": "John", "last": "Humphreys", "first_name": "John" }
        })));
        assert!(paths(&errors).contains(&"author.last_name"));
    }

    #[test]
    fn non_mapping_author() {
        let errors = errors_for(&doc_with(json!({ "author": "John Humphreys" })));
        assert_single(&errors, "author", &mismatch("object", "string"));
    }
}

// === Recursive Schemas ===

mod recursive {
    use super::*;

    fn node_schema() -> &'static Arc<Schema> {
        static NODE: OnceLock<Arc<Schema>> = OnceLock::new();
        NODE.get_or_init(|| {
            let child = TypeSpec::resolver(|_| node_schema().into());
            Arc::new(
                Schema::new([
                    ("label", FieldSpec::new(PrimitiveType::String).required()),
                    ("children", FieldSpec::new(Array::new(child)).default(json!([]))),
                ])
                .unwrap(),
            )
        })
    }

    #[test]
    fn self_referencing_schema() {
        let result = node_schema().validate(&json!({
            "label": "root",
            "children": [
                { "label": "a", "children": [ { "label": "a1" }, { "children": [] } ] },
                { "label": "b" }
            ]
        }));

        assert_eq!(paths(&result.errors), vec!["children[0].children[1].label"]);
        assert_eq!(result.document["children"][1]["children"], json!([]));
        assert_eq!(result.document["children"][0]["children"][0]["children"], json!([]));
    }
}

// === Strict Mode ===

mod strict_mode {
    use super::*;

    #[test]
    fn extra_keys_ignored_by_default() {
        assert!(errors_for(&doc_with(json!({ "unexpected": true }))).is_empty());
    }

    #[test]
    fn strict_schema_reports_each_unknown_key() {
        let schema = Schema::new([("title", FieldSpec::new(PrimitiveType::String))])
            .unwrap()
            .strict(true);
        let result = schema.validate(&json!({ "title": "x", "a": 1, "b": 2 }));
        assert_eq!(paths(&result.errors), vec!["a", "b"]);
        assert!(result
            .errors
            .iter()
            .all(|e| e.kind == ErrorKind::UnknownField));
    }
}

// === Concurrency ===

mod shared_schemas {
    use super::*;

    #[test]
    fn schema_reused_across_threads() {
        let schema = Arc::clone(blog_post_schema());
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let schema = Arc::clone(&schema);
                    scope.spawn(move || {
                        let doc = doc_with(json!({ "likes": i }));
                        schema.validate(&doc)
                    })
                })
                .collect();

            for (i, handle) in handles.into_iter().enumerate() {
                let result = handle.join().unwrap();
                assert!(result.is_valid());
                assert_eq!(result.document["likes"], json!(i));
            }
        });
    }
}

// === Descriptions ===

mod descriptions {
    use super::*;

    fn blog_description() -> Value {
        json!({
            "definitions": {
                "name": { "fields": {
                    "first": { "type": "string", "required": true },
                    "last": { "type": "string", "required": true }
                } },
                "about": { "fields": {
                    "first_name": { "type": "string", "required": true },
                    "last_name": { "type": "string", "required": true },
                    "birth_year": { "type": "integer", "required": true },
                    "birth_month": { "type": "integer", "required": true },
                    "birth_day": { "type": "integer", "required": true }
                } },
                "comment": { "fields": {
                    "commenter": { "type": { "ref": "name" }, "required": true },
                    "email": { "type": "string" },
                    "comment": { "type": "string", "required": true },
                    "votes": { "type": "integer", "default": 0 }
                } }
            },
            "fields": {
                "author": {
                    "type": { "select": {
                        "when": "author.first_name",
                        "then": { "ref": "about" },
                        "else": { "ref": "name" }
                    } },
                    "required": true
                },
                "content": {
                    "type": { "schema": { "fields": {
                        "title": { "type": "string", "required": true },
                        "text": { "type": "string", "required": true },
                        "page_views": { "type": "integer", "default": 1 }
                    } } },
                    "required": true
                },
                "meta": {
                    "type": { "schema": { "fields": { "last_edited": { "type": "datetime" } } } },
                    "required": true,
                    "nullable": true
                },
                "category": { "type": "string", "validates": [{ "one_of": ["cooking", "politics"] }] },
                "comments": { "type": { "array": { "ref": "comment" } }, "required": true },
                "likes": { "type": "integer", "default": 0 },
                "creation_date": { "type": "datetime", "default": STUB_NOW },
                "tags": {
                    "type": { "array": "string" },
                    "default": ["blog"],
                    "validates": [{ "length": { "min": 1 } }]
                },
                "misc": { "type": { "mixed": ["string", "integer"] } },
                "linked_id": { "type": { "mixed": ["integer", "string"] } },
                "external_code": { "type": "string", "nullable": false }
            }
        })
    }

    #[test]
    fn described_schema_matches_declared_schema() {
        let described = schema_from_description(&blog_description()).unwrap();

        let docs = [
            valid_doc(),
            doc_without("author"),
            doc_with(json!({ "tags": ["cookies", 3] })),
            doc_with(json!({ "linked_id": 123.45, "external_code": null })),
            doc_with(json!({ "author": { "first_name": "John" } })),
            doc_with(json!({ "comments": [{ "comment": "x" }] })),
        ];
        for doc in &docs {
            assert_eq!(
                described.validate(doc),
                blog_post_schema().validate(doc),
                "diverged on {}",
                doc
            );
        }
    }
}
