//! Every registered opcode rejects records of the wrong shape.

mod common;

use armast::{DecodedRecord, LiftError, OpcodeRegistry};

const ARITIES: [(&str, usize, usize); 16] = [
    ("B", 2, 1),
    ("BL", 2, 1),
    ("BLX", 2, 1),
    ("BX", 2, 1),
    ("CBZ", 1, 2),
    ("CBNZ", 1, 2),
    ("LDM", 2, 4),
    ("STM", 2, 4),
    ("UBFX", 2, 4),
    ("SBFX", 2, 4),
    ("PLD", 2, 3),
    ("PLDW", 2, 3),
    ("PLI", 2, 2),
    ("MOV", 2, 4),
    ("MOVT", 2, 2),
    ("RSB", 2, 5),
];

fn record(tag: &str, tags: usize, args: usize) -> DecodedRecord {
    let mut names = vec![tag];
    names.resize(tags, "");
    DecodedRecord::new(&names, vec![1; args])
}

#[test]
fn test_registry_covers_table() {
    let registry = OpcodeRegistry::global().unwrap();
    assert_eq!(registry.len(), ARITIES.len());
    for (tag, _, _) in ARITIES {
        assert!(registry.contains(tag), "{tag} not registered");
    }
}

#[test]
fn test_wrong_arg_count_rejected() {
    let registry = OpcodeRegistry::global().unwrap();
    let operands = common::operands();
    for (tag, tags, args) in ARITIES {
        for found in [args - 1, args + 1] {
            let err = registry.construct(&record(tag, tags, found), &operands).unwrap_err();
            assert!(
                matches!(
                    err,
                    LiftError::DecodeArity { expected_tags, expected_args, found_args, .. }
                        if expected_tags == tags && expected_args == args && found_args == found
                ),
                "{tag} with {found} args: {err}"
            );
        }
    }
}

#[test]
fn test_wrong_tag_count_rejected() {
    let registry = OpcodeRegistry::global().unwrap();
    let operands = common::operands();
    for (tag, tags, args) in ARITIES {
        let err = registry.construct(&record(tag, tags + 1, args), &operands).unwrap_err();
        assert!(
            matches!(err, LiftError::DecodeArity { found_tags, .. } if found_tags == tags + 1),
            "{tag}: {err}"
        );
    }
}

#[test]
fn test_matching_arity_accepted() {
    let registry = OpcodeRegistry::global().unwrap();
    let operands = common::operands();
    for (tag, record) in [
        ("MOV", DecodedRecord::new(&["MOV", ""], vec![0, 8, 1, 0])),
        ("LDM", DecodedRecord::new(&["LDM", ""], vec![1, 1, 2, 3])),
        ("CBZ", DecodedRecord::new(&["CBZ"], vec![4, 5])),
        ("BL", DecodedRecord::new(&["BL", ""], vec![6])),
        ("PLI", DecodedRecord::new(&["PLI", ""], vec![1, 3])),
    ] {
        let opcode = registry.construct(&record, &operands).unwrap();
        assert_eq!(armast::OpcodeSemantics::mnemonic(&opcode), tag);
    }
}
