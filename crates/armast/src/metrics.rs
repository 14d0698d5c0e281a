//! Lifting metrics.
//!
//! Counters are recorded through the `metrics` facade; install a recorder to
//! collect them. Call [`init`] once to register descriptions.

use metrics::{counter, describe_counter, Unit};

/// Register metric descriptions.
pub fn init() {
    describe_counter!(
        "armast_instructions_lifted_total",
        Unit::Count,
        "Instructions passed through an opcode handler"
    );
    describe_counter!(
        "armast_degraded_instructions_total",
        Unit::Count,
        "Instructions lifted from invalid facts"
    );
    describe_counter!(
        "armast_functions_failed_total",
        Unit::Count,
        "Function lifts aborted by an error"
    );
}

/// Record one lifted instruction.
pub fn record_instruction(mnemonic: &'static str, degraded: bool) {
    let labels = [("opcode", mnemonic)];
    counter!("armast_instructions_lifted_total", &labels).increment(1);
    if degraded {
        counter!("armast_degraded_instructions_total", &labels).increment(1);
    }
}

/// Record an aborted function lift.
pub fn record_failure() {
    counter!("armast_functions_failed_total").increment(1);
}
