//! Integration test: channel, role and user grants across operations,
//! static and computed, plus all-members access.

use docguard_core::{Document, Principal, WriteContext};
use docguard_schema::{
    Authorization, DocumentDefinition, DocumentDefinitions, GrantSet, PropertyValidator, PropertyValidators,
    RejectionSignal, Resolvable, TypeFilter, ValidationEngine, WriteRejection, WriteRequest,
};
use serde_json::{json, Value};

fn by_id(id: &'static str) -> TypeFilter {
    TypeFilter::custom(move |new_doc, old_doc, _| {
        new_doc.id().or_else(|| old_doc.and_then(Document::id)) == Some(id)
    })
}

fn defined(id: &'static str, authorization: Authorization) -> DocumentDefinition {
    DocumentDefinition::new(id)
        .with_type_filter(by_id(id))
        .with_authorization(authorization)
        .with_properties(PropertyValidators::new().property("stringProp", PropertyValidator::string()))
}

fn roles(grants: GrantSet) -> Authorization {
    Authorization {
        roles: Some(grants.into()),
        ..Authorization::default()
    }
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Prefix each entry of `field` on the governing revision with the database name.
fn from_document(field: &'static str) -> Resolvable<GrantSet> {
    Resolvable::computed(move |ctx| {
        let source = ctx.old_doc.unwrap_or(ctx.new_doc);
        let db = ctx.database.unwrap_or_default();
        let entries = source
            .get(field)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(|s| format!("{db}-{s}")).collect::<Vec<_>>())
            .unwrap_or_default();
        GrantSet::write(entries)
    })
}

fn engine() -> ValidationEngine {
    let definitions = DocumentDefinitions::new()
        .define(defined(
            "explicitRolesDoc",
            roles(GrantSet {
                add: list(&["add"]),
                replace: list(&["replace", "update"]),
                remove: list(&["remove", "delete"]),
                ..GrantSet::default()
            }),
        ))
        .define(defined("writeOnlyRolesDoc", roles(GrantSet::write(["edit", "modify", "write"]))))
        .define(defined(
            "writeAndAddRolesDoc",
            roles(GrantSet {
                add: list(&["add"]),
                write: list(&["edit"]),
                ..GrantSet::default()
            }),
        ))
        .define(
            defined(
                "dynamicRolesAndUsersDoc",
                Authorization {
                    roles: Some(from_document("roles")),
                    users: Some(from_document("users")),
                    ..Authorization::default()
                },
            )
            .with_properties(
                PropertyValidators::new()
                    .property("stringProp", PropertyValidator::string())
                    .property("roles", PropertyValidator::array_of(PropertyValidator::string()))
                    .property("users", PropertyValidator::array_of(PropertyValidator::string())),
            ),
        )
        .define(defined(
            "explicitUsernamesDoc",
            Authorization {
                users: Some(
                    GrantSet {
                        add: list(&["add1", "add2"]),
                        replace: list(&["replace1", "replace2"]),
                        remove: list(&["remove1", "remove2"]),
                        ..GrantSet::default()
                    }
                    .into(),
                ),
                ..Authorization::default()
            },
        ))
        .define(defined(
            "staticUniversalAccessDoc",
            Authorization {
                grant_all_members_write_access: true.into(),
                ..Authorization::default()
            },
        ))
        .define(
            defined(
                "dynamicUniversalAccessDoc",
                Authorization {
                    grant_all_members_write_access: Resolvable::computed(|ctx| {
                        if ctx.database == Some("all-members-write-access-db") {
                            return true;
                        }
                        ctx.old_doc
                            .unwrap_or(ctx.new_doc)
                            .get("allowAccess")
                            .and_then(Value::as_bool)
                            .unwrap_or(false)
                    }),
                    ..Authorization::default()
                },
            )
            .with_properties(PropertyValidators::new().property("allowAccess", PropertyValidator::boolean())),
        )
        .define(defined("noGrantsDoc", Authorization::default()));

    ValidationEngine::new(definitions)
}

fn doc(value: Value) -> Document {
    Document::from_value(value).unwrap()
}

fn create(id: &str, principal: Principal) -> Result<(), WriteRejection> {
    write(WriteRequest::new(doc(json!({ "_id": id }))), principal, None)
}

fn replace(id: &str, principal: Principal) -> Result<(), WriteRejection> {
    let request = WriteRequest::new(doc(json!({ "_id": id, "stringProp": "new" })))
        .replacing(doc(json!({ "_id": id, "stringProp": "old" })));
    write(request, principal, None)
}

fn delete(id: &str, principal: Principal) -> Result<(), WriteRejection> {
    write(WriteRequest::deletion(doc(json!({ "_id": id }))), principal, None)
}

fn write(request: WriteRequest, principal: Principal, database: Option<&str>) -> Result<(), WriteRejection> {
    let mut context = WriteContext::new(principal);
    context.database = database.map(str::to_string);
    engine().validate_write(&request.with_context(context)).map(|_| ())
}

fn denied(result: Result<(), WriteRejection>) -> (RejectionSignal, String) {
    match result {
        Err(rejection @ (WriteRejection::Forbidden { .. } | WriteRejection::Unauthorized { .. })) => {
            (rejection.signal(), rejection.to_string())
        }
        other => panic!("expected an access denial, got {other:?}"),
    }
}

fn role(name: &str) -> Principal {
    Principal::user("someone").with_role(name)
}

#[test]
fn explicit_roles_per_operation() {
    assert!(create("explicitRolesDoc", role("add")).is_ok());
    assert!(replace("explicitRolesDoc", role("update")).is_ok());
    assert!(delete("explicitRolesDoc", role("delete")).is_ok());

    assert_eq!(
        denied(create("explicitRolesDoc", role("replace"))),
        (RejectionSignal::Forbidden, "missing role".to_string())
    );
    assert_eq!(
        denied(delete("explicitRolesDoc", role("add"))),
        (RejectionSignal::Forbidden, "missing role".to_string())
    );
}

#[test]
fn anonymous_principals_are_unauthorized() {
    assert_eq!(
        denied(create("explicitRolesDoc", Principal::anonymous())),
        (RejectionSignal::Unauthorized, "missing role".to_string())
    );
}

#[test]
fn write_roles_cover_every_operation() {
    assert!(create("writeOnlyRolesDoc", role("modify")).is_ok());
    assert!(replace("writeOnlyRolesDoc", role("write")).is_ok());
    assert!(delete("writeOnlyRolesDoc", role("edit")).is_ok());
}

#[test]
fn write_and_specific_roles_combine() {
    assert!(create("writeAndAddRolesDoc", role("add")).is_ok());
    assert!(create("writeAndAddRolesDoc", role("edit")).is_ok());
    assert!(replace("writeAndAddRolesDoc", role("edit")).is_ok());
    assert!(replace("writeAndAddRolesDoc", role("add")).is_err());
}

#[test]
fn computed_roles_and_users_follow_the_governing_revision() {
    let new_doc = doc(json!({ "_id": "dynamicRolesAndUsersDoc", "roles": ["a"], "users": ["bob"] }));
    let request = || WriteRequest::new(new_doc.clone());

    assert!(write(request(), Principal::user("x").with_role("db-a"), Some("db")).is_ok());
    assert!(write(request(), Principal::user("db-bob"), Some("db")).is_ok());
    assert_eq!(
        denied(write(request(), Principal::user("bob").with_role("a"), Some("db"))),
        (RejectionSignal::Forbidden, "missing role".to_string())
    );

    // On replacement the prior revision's lists decide.
    let replacement = WriteRequest::new(doc(json!({
        "_id": "dynamicRolesAndUsersDoc", "roles": ["intruder"], "users": ["intruder"]
    })))
    .replacing(new_doc.clone());
    assert!(write(replacement.clone(), Principal::user("db-bob"), Some("db")).is_ok());
    assert!(write(replacement, Principal::user("db-intruder"), Some("db")).is_err());
}

#[test]
fn explicit_usernames() {
    assert!(create("explicitUsernamesDoc", Principal::user("add2")).is_ok());
    assert!(replace("explicitUsernamesDoc", Principal::user("replace1")).is_ok());
    assert!(delete("explicitUsernamesDoc", Principal::user("remove2")).is_ok());
    assert_eq!(
        denied(create("explicitUsernamesDoc", Principal::user("remove1"))),
        (RejectionSignal::Forbidden, "wrong user".to_string())
    );
}

#[test]
fn static_universal_access() {
    assert!(create("staticUniversalAccessDoc", Principal::user("anybody")).is_ok());
    assert!(delete("staticUniversalAccessDoc", Principal::user("anybody")).is_ok());
    assert_eq!(
        denied(create("staticUniversalAccessDoc", Principal::anonymous())),
        (RejectionSignal::Unauthorized, "missing channel access".to_string())
    );
}

#[test]
fn dynamic_universal_access() {
    let open = || WriteRequest::new(doc(json!({ "_id": "dynamicUniversalAccessDoc", "allowAccess": true })));
    let closed = || WriteRequest::new(doc(json!({ "_id": "dynamicUniversalAccessDoc", "allowAccess": false })));

    assert!(write(open(), Principal::user("u"), None).is_ok());
    assert!(write(closed(), Principal::user("u"), None).is_err());
    assert!(write(closed(), Principal::user("u"), Some("all-members-write-access-db")).is_ok());

    // The prior revision governs replacements.
    let reopened = open().replacing(doc(json!({ "_id": "dynamicUniversalAccessDoc", "allowAccess": false })));
    assert!(write(reopened, Principal::user("u"), None).is_err());
}

#[test]
fn no_grants_means_no_access() {
    assert_eq!(
        denied(create("noGrantsDoc", Principal::user("u").with_channel("anything"))),
        (RejectionSignal::Forbidden, "missing channel access".to_string())
    );
    // Administrators get no implicit write access.
    assert!(create("noGrantsDoc", Principal::administrator("root")).is_err());
}
