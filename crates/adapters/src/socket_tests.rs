use super::*;
use warden_core::value::Value;

fn map_with(pairs: Vec<(&str, Value)>) -> Mapping {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[test]
fn parses_a_single_unix_stream_entry() {
    let sockets = Value::Map(map_with(vec![(
        "listener",
        Value::Array(vec![Value::Map(map_with(vec![
            ("type", Value::str("stream")),
            ("pathname", Value::str("/tmp/echo.sock")),
            ("passive", Value::Bool(true)),
        ]))]),
    )]));
    let manifest = map_with(vec![("sockets", sockets)]);

    let groups = parse_socket_groups(&manifest).expect("parse");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].0, "listener");
    assert_eq!(groups[0].1.len(), 1);
    assert!(groups[0].1[0].passive);
    match &groups[0].1[0].kind {
        SocketKind::UnixStream { pathname } => assert_eq!(pathname, "/tmp/echo.sock"),
        _ => panic!("expected unix stream"),
    }
}

#[test]
fn a_single_mapping_is_accepted_without_being_wrapped_in_an_array() {
    let sockets = Value::Map(map_with(vec![(
        "listener",
        Value::Map(map_with(vec![
            ("type", Value::str("stream")),
            ("pathname", Value::str("/tmp/one.sock")),
        ])),
    )]));
    let manifest = map_with(vec![("sockets", sockets)]);

    let groups = parse_socket_groups(&manifest).expect("parse");
    assert_eq!(groups[0].1.len(), 1);
}

#[test]
fn missing_sockets_key_yields_no_groups() {
    let manifest = map_with(vec![]);
    assert!(parse_socket_groups(&manifest).expect("parse").is_empty());
}

#[test]
fn empty_group_is_rejected() {
    let sockets = Value::Map(map_with(vec![("listener", Value::Array(vec![]))]));
    let manifest = map_with(vec![("sockets", sockets)]);
    assert!(parse_socket_groups(&manifest).is_err());
}

#[test]
fn opens_and_binds_a_unix_listener() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("test.sock");
    let spec = SocketSpec {
        kind: SocketKind::UnixStream {
            pathname: path.to_string_lossy().into_owned(),
        },
        passive: true,
    };
    let fd = open(&spec).expect("open");
    assert!(path.exists());
    drop(fd);
}
