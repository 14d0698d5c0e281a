//! Parallel lifting over a shared global symbol table.

mod common;

use armast::{DecodedRecord, LiftConfig, LiftSession, SymbolicResolver};

#[test]
fn test_parallel_lift_preserves_order() {
    common::init_tracing();
    let session = LiftSession::new(LiftConfig::default(), SymbolicResolver);
    let sources: Vec<_> = (0..16).map(|i| common::sample(&format!("f{i}"))).collect();
    let results = session.lift_all(&sources);
    assert_eq!(results.len(), 16);
    for (i, result) in results.iter().enumerate() {
        let f = result.as_ref().unwrap();
        assert_eq!(f.name, format!("f{i}"));
        assert_eq!(f.instructions.len(), 5);
    }
    let globals = session.globals().lock();
    assert_eq!(globals.get("strlen").and_then(|s| s.address), Some(0x8100));
}

#[test]
fn test_failures_are_isolated() {
    let session = LiftSession::new(LiftConfig::default(), SymbolicResolver);
    let mut bad = common::bx();
    bad.record = DecodedRecord::new(&["BX"], vec![7]);
    let sources = vec![
        common::sample("ok"),
        armast::FunctionSource::new("bad", common::operands()).with_site(bad),
    ];
    let results = session.lift_all(&sources);
    assert!(results[0].is_ok());
    let err = results[1].as_ref().unwrap_err();
    assert_eq!(err.address(), Some(0x110));
}

#[test]
fn test_parallel_matches_sequential() {
    let session = LiftSession::new(LiftConfig::default(), SymbolicResolver);
    let sources: Vec<_> = (0..4).map(|_| common::sample("same")).collect();
    let sequential = session.lift(&sources[0]).unwrap().to_json().unwrap();
    for result in session.lift_all(&sources) {
        assert_eq!(result.unwrap().to_json().unwrap(), sequential);
    }
}
