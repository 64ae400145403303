//! Integration test: one engine, the same write decided twice.
//!
//! Decisions are pure functions of the request. Repeating a write against a
//! shared engine must give the same outcome, and a rejection must list the
//! same errors in the same order, including when a grant is computed from
//! the document.

use docguard_core::{Document, Principal, WriteContext};
use docguard_schema::{
    load_definitions_from_str, DefinitionFormat, GrantSet, RejectionSignal, Resolvable, ValidationEngine,
    WriteOutcome, WriteRejection, WriteRequest,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const DEFINITIONS: &str = r#"
entry:
  propertyValidators:
    type: { type: typeId }
    owner: { type: string }
    title: { type: string, required: true, mustNotBeEmpty: true, regexPattern: '[a-z]+' }
    tags:
      type: hashtable
      maximumSize: 2
      hashtableKeysValidator: { mustNotBeEmpty: true, regexPattern: '[a-z]+' }
      hashtableValuesValidator: { type: integer, minimumValue: 0 }
    createdAt: { type: datetime, immutable: true }
"#;

fn engine() -> ValidationEngine {
    let mut definitions = load_definitions_from_str(DEFINITIONS, DefinitionFormat::Yaml).unwrap();
    let mut entry = definitions.get("entry").cloned().unwrap();
    entry.authorization.channels = Some(Resolvable::computed(|ctx| {
        let owner = ctx.new_doc.get("owner").and_then(Value::as_str).unwrap_or("editors");
        GrantSet {
            write: vec![format!("{owner}-write")],
            ..GrantSet::default()
        }
    }));
    definitions.insert(entry);
    ValidationEngine::new(definitions)
}

/// Everything observable about a decision.
type Summary = Result<WriteOutcome, (RejectionSignal, String, Vec<String>)>;

fn summarize(result: Result<WriteOutcome, WriteRejection>) -> Summary {
    result.map_err(|rejection| {
        let messages = match &rejection {
            WriteRejection::Invalid { errors, .. } => errors.messages(),
            _ => Vec::new(),
        };
        (rejection.signal(), rejection.to_string(), messages)
    })
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z ]{0,6}".prop_map(Value::from),
        Just(json!("2016-07-19T19:24:38.920-0700")),
    ]
}

fn tags() -> impl Strategy<Value = Value> {
    prop::collection::vec(("[a-zA-Z]{0,3}", scalar()), 0..4).prop_map(|entries| {
        let mut map = Map::new();
        for (key, value) in entries {
            map.insert(key, value);
        }
        Value::Object(map)
    })
}

prop_compose! {
    fn entry_doc()(
        owner in prop::option::of("[a-z]{1,4}"),
        title in scalar(),
        tags in tags(),
        created_at in scalar(),
        extra in prop::option::of(scalar()),
    ) -> Document {
        let mut body = json!({ "_id": "entry.1", "type": "entry", "title": title, "tags": tags, "createdAt": created_at });
        if let Some(owner) = owner {
            body["owner"] = json!(owner);
        }
        if let Some(extra) = extra {
            body["extra"] = extra;
        }
        Document::from_value(body).unwrap()
    }
}

proptest! {
    #[test]
    fn repeated_writes_are_decided_identically(
        new_doc in entry_doc(),
        old_doc in prop::option::of(entry_doc()),
        channel in prop_oneof![Just("editors-write".to_string()), "[a-z]{1,4}-write"],
        anonymous in any::<bool>(),
    ) {
        let engine = engine();
        let principal = if anonymous {
            Principal::anonymous()
        } else {
            Principal::user("writer").with_channel(channel)
        };
        let mut request = WriteRequest::new(new_doc).with_context(WriteContext::new(principal));
        if let Some(old_doc) = old_doc {
            request = request.replacing(old_doc);
        }

        let first = summarize(engine.validate_write(&request));
        let second = summarize(engine.validate_write(&request));
        prop_assert_eq!(first, second);
    }
}

#[test]
fn repeated_rejection_keeps_error_order() {
    let engine = engine();
    let request = WriteRequest::new(
        Document::from_value(json!({
            "_id": "entry.1",
            "type": "entry",
            "title": "",
            "tags": { "b@d": -1, "": 3, "ok": 1 },
            "extra": true
        }))
        .unwrap(),
    )
    .with_context(WriteContext::new(Principal::user("writer").with_channel("editors-write")));

    let first = summarize(engine.validate_write(&request));
    let second = summarize(engine.validate_write(&request));
    assert_eq!(first, second);

    let (signal, _, messages) = first.unwrap_err();
    assert_eq!(signal, RejectionSignal::Forbidden);
    assert_eq!(
        messages,
        [
            "property \"title\" must not be empty",
            "property \"title\" must conform to expected format /[a-z]+/",
            "property \"tags\" must not have more than 2 entries",
            "property \"tags[b@d]\" key \"b@d\" must conform to expected format /[a-z]+/",
            "property \"tags[b@d]\" must not be less than 0",
            "property \"tags\" must not contain an empty key",
            "property \"tags[]\" key \"\" must conform to expected format /[a-z]+/",
            "property \"extra\" is not supported",
        ]
    );
}
