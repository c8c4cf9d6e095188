use super::*;

#[test]
fn success_codes_as_zero() {
    assert_eq!(ErrorKind::None.code(), 0);
    assert!(ErrorKind::None.is_success());
}

#[test]
fn not_found_and_exists_are_distinct() {
    assert_ne!(ErrorKind::NotFound.code(), ErrorKind::Exists.code());
}

#[test]
fn transient_roundtrips_the_errno() {
    let err = ErrorKind::transient(35); // EAGAIN
    assert_eq!(err.code(), 35);
}
