use super::*;
use std::os::fd::AsRawFd;

fn sample_tree() -> Value {
    let mut inner = Mapping::new();
    inner.insert("label", Value::str("echo"));
    inner.insert("pid", Value::Int(1234));
    inner.insert("on-demand", Value::Bool(true));
    inner.insert(
        "args",
        Value::Array(vec![Value::str("/bin/cat"), Value::str("-n")]),
    );
    Value::Map(inner)
}

#[test]
fn round_trips_scalars_and_containers() {
    let tree = sample_tree();
    let (bytes, fds) = encode(tree);
    assert!(fds.is_empty());
    let decoded = decode(&bytes, Vec::new()).expect("decode");
    let map = decoded.as_map().expect("map");
    assert_eq!(map.get("label").and_then(Value::as_str), Some("echo"));
    assert_eq!(map.get("pid").and_then(Value::as_int), Some(1234));
    assert_eq!(map.get("on-demand").and_then(Value::as_bool), Some(true));
    let args = map.get("args").and_then(Value::as_array).expect("args");
    assert_eq!(args.len(), 2);
}

#[test]
fn fd_leaves_transfer_through_the_descriptor_list() {
    let file = std::fs::File::open("/dev/null").expect("open /dev/null");
    let raw = file.as_raw_fd();
    let owned: std::os::fd::OwnedFd = file.into();

    let mut m = Mapping::new();
    m.insert("listener", Value::Fd(owned));
    let tree = Value::Map(m);

    let (bytes, fds) = encode(tree);
    assert_eq!(fds.len(), 1);

    let slots: Vec<Option<std::os::fd::OwnedFd>> = fds.into_iter().map(Some).collect();
    let decoded = decode(&bytes, slots).expect("decode");
    let got = decoded
        .as_map()
        .expect("map")
        .get("listener")
        .expect("listener present");
    match got {
        Value::Fd(fd) => assert_eq!(fd.as_raw_fd(), raw),
        other => panic!("expected Fd, got {other:?}"),
    }
}

#[test]
fn missing_fd_slot_is_an_error() {
    let mut m = Mapping::new();
    m.insert("x", Value::Fd(unsafe_stdin_copy()));
    let tree = Value::Map(m);
    let (bytes, _fds) = encode(tree);
    let err = decode(&bytes, vec![None]).unwrap_err();
    assert!(matches!(err, WireError::MissingFd(0)));
}

fn unsafe_stdin_copy() -> std::os::fd::OwnedFd {
    let file = std::fs::File::open("/dev/null").expect("open /dev/null");
    file.into()
}
