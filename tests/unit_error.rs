use stacks::error::{exit_codes, Error, KeyKind};

#[test]
fn exit_codes_map_correctly() {
    let user = Error::InvalidArgument("bad".to_string());
    assert_eq!(user.exit_code(), exit_codes::USER_ERROR);

    let conflict = Error::DuplicateKey {
        kind: KeyKind::Book,
        key: "dune".to_string(),
    };
    assert_eq!(conflict.exit_code(), exit_codes::CONFLICT);

    let io = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
    assert_eq!(io.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn keyed_errors_carry_details() {
    let err = Error::DuplicateKey {
        kind: KeyKind::User,
        key: "alice".to_string(),
    };
    assert!(err.to_string().contains("Duplicate user"));
    let details = err.details().expect("details");
    assert_eq!(details["kind"], "user");
    assert_eq!(details["key"], "alice");
}

#[test]
fn plain_errors_have_no_details() {
    let err = Error::InvalidConfig("nope".to_string());
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    assert!(err.details().is_none());
}
