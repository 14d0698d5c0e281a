#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use armast::{
    BinaryOp, CallTarget, DecodedRecord, DefUse, FunctionSource, InstrXData, InstructionSite,
    Operand, OperandTable, ReachingDefinition, Register, Writeback, XExpr, XVariable,
};

/// Log sink shared between a test and its subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` under a subscriber that records warnings and errors.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, logs.text())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("armast=debug")
        .try_init();
}

/// Operand indices shared by the sample functions.
pub fn operands() -> OperandTable {
    OperandTable::new()
        .with(1, Operand::register(Register::R0))
        .with(2, Operand::from_mask(0b1010))
        .with(3, Operand::indirect(Register::R0, 0, Writeback::Offset))
        .with(4, Operand::register(Register::R3))
        .with(5, Operand::absolute(0x120))
        .with(6, Operand::absolute(0x8100))
        .with(7, Operand::register(Register::LR))
        .with(8, Operand::register(Register::R4))
}

pub fn mov() -> InstructionSite {
    let xdata = InstrXData::new()
        .with_vars(vec![XVariable::register("R4")])
        .with_xprs(vec![XExpr::reg("R0"), XExpr::reg("arg0")])
        .with_reaching_defs(vec![Some(ReachingDefinition::new("R0", vec![0xfc]))])
        .with_defuses(vec![Some(DefUse::new("R4", vec![0x110]))]);
    InstructionSite::new(0x100, "0040a0e1", DecodedRecord::new(&["MOV", ""], vec![0, 8, 1, 0]), xdata)
}

/// `LDM R0!, {R1, R3}`
pub fn ldm() -> InstructionSite {
    let plus8 = XExpr::binary(BinaryOp::Plus, XExpr::reg("R0"), XExpr::konst(8));
    let xdata = InstrXData::new()
        .with_vars(vec![
            XVariable::register("R0"),
            XVariable::register("R1"),
            XVariable::register("R3"),
        ])
        .with_xprs(vec![XExpr::reg("R0"), plus8.clone(), plus8, XExpr::reg("a"), XExpr::reg("b")])
        .with_reaching_defs(vec![
            Some(ReachingDefinition::new("R0", vec![0x100])),
            Some(ReachingDefinition::new("R0[0]", vec![0xf0])),
            Some(ReachingDefinition::new("R0[4]", vec![0xf4])),
        ])
        .with_defuses(vec![None, Some(DefUse::new("R1", vec![0x108])), None])
        .with_defuses_high(vec![None, None, None]);
    InstructionSite::new(0x104, "0a00b0e8", DecodedRecord::new(&["LDM", ""], vec![1, 1, 2, 3]), xdata)
}

/// `BL strlen`
pub fn bl() -> InstructionSite {
    let xdata = InstrXData::new()
        .with_vars(vec![XVariable::register("len")])
        .with_xprs(vec![XExpr::reg("a")])
        .with_reaching_defs(vec![Some(ReachingDefinition::new("R0", vec![0x100]))])
        .with_defuses(vec![Some(DefUse::new("R0", vec![0x10c]))])
        .with_call_target(
            CallTarget::new("strlen")
                .with_address(0x8100)
                .with_argument_count(1)
                .with_return_value(),
        );
    InstructionSite::new(0x108, "00f0faf8", DecodedRecord::new(&["BL", ""], vec![6]), xdata)
}

/// `CBZ R3, 0x120`
pub fn cbz_facts() -> InstrXData {
    let r3 = || XExpr::reg("R3");
    InstrXData::new()
        .with_xprs(vec![
            r3(),
            XExpr::binary(BinaryOp::Eq, r3(), XExpr::konst(0)),
            XExpr::binary(BinaryOp::Ne, r3(), XExpr::konst(0)),
            XExpr::binary(BinaryOp::Eq, XExpr::reg("b"), XExpr::konst(0)),
            XExpr::binary(BinaryOp::Ne, XExpr::reg("b"), XExpr::konst(0)),
            XExpr::konst(0x120),
        ])
        .with_reaching_defs(vec![Some(ReachingDefinition::new("R3", vec![0x104]))])
        .with_branch_conditions()
}

pub fn cbz() -> InstructionSite {
    InstructionSite::new(0x10c, "3bb1", DecodedRecord::new(&["CBZ"], vec![4, 5]), cbz_facts())
}

/// `BX LR`
pub fn bx() -> InstructionSite {
    let xdata = InstrXData::new().with_xprs(vec![XExpr::reg("LR"), XExpr::reg("LR_in")]);
    InstructionSite::new(0x110, "1eff2fe1", DecodedRecord::new(&["BX", ""], vec![7]), xdata)
}

pub fn sample(name: &str) -> FunctionSource {
    FunctionSource::new(name, operands())
        .with_site(mov())
        .with_site(ldm())
        .with_site(bl())
        .with_site(cbz())
        .with_site(bx())
}
