//! Every high-level instruction traces back to its low-level counterpart.

mod common;

use armast::{FunctionLifter, LiftConfig, SymbolicResolver};

#[test]
fn test_every_high_instruction_mapped() {
    let f = FunctionLifter::new(LiftConfig::default(), &SymbolicResolver)
        .lift(&common::sample("prov"))
        .unwrap();
    let prov = f.ast.provenance();
    for instr in &f.instructions {
        for &high in &instr.high {
            let low = prov.low_instr(high).expect("high instruction without low counterpart");
            assert!(instr.low.contains(&low), "{:#x}: mapped outside its site", instr.address);
            assert!(prov.high_instrs(low).contains(&high));
            assert_eq!(prov.instr_addresses(high), &[instr.address]);
        }
        for &low in &instr.low {
            assert_eq!(prov.instr_addresses(low), &[instr.address]);
        }
    }
}

#[test]
fn test_assignments_carry_reaching_defs_and_defuses() {
    let f = FunctionLifter::new(LiftConfig::default(), &SymbolicResolver)
        .lift(&common::sample("defs"))
        .unwrap();
    let prov = f.ast.provenance();
    let mov = &f.instructions[0];
    let armast::Instr::Assign { lhs, rhs, .. } = f.ast.instr(mov.high[0]) else {
        panic!("expected assignment");
    };
    let armast::Instr::Assign { lhs: ll_lhs, rhs: ll_rhs, .. } = f.ast.instr(mov.low[0]) else {
        panic!("expected assignment");
    };
    assert_eq!(prov.reaching_defs(*ll_rhs).len(), 1);
    assert_eq!(prov.low_expr(*rhs), Some(*ll_rhs));
    assert_eq!(prov.low_lval(*lhs), Some(*ll_lhs));
    assert_eq!(prov.defuses(*lhs).map(<[armast::DefUse]>::len), Some(1));
}

#[test]
fn test_snapshot_uses_identities() {
    let f = FunctionLifter::new(LiftConfig::default(), &SymbolicResolver)
        .lift(&common::sample("snap"))
        .unwrap();
    let snap = f.ast.provenance_snapshot();
    let last = u32::try_from(f.ast.table().len()).unwrap();
    for (&high, &low) in &snap.instruction_mapping {
        assert!((1..=last).contains(&high));
        assert!((1..=last).contains(&low));
    }
    // only the CBZ placeholder stands for itself
    let shared: Vec<_> = snap.instruction_mapping.iter().filter(|(h, l)| h == l).collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(snap.condition_addresses.values().next().unwrap(), &["0x10c"]);
}
