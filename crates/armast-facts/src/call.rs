//! Call targets resolved by the analysis.

use serde::Serialize;

/// Target of a call instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CallTarget {
    pub name: String,
    /// Entry address, when the callee is an application function.
    pub address: Option<u64>,
    /// Number of arguments; unknown for unsummarized callees.
    pub argument_count: Option<usize>,
    pub returns_value: bool,
}

impl CallTarget {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            address: None,
            argument_count: None,
            returns_value: false,
        }
    }

    #[must_use]
    pub const fn with_address(mut self, address: u64) -> Self {
        self.address = Some(address);
        self
    }

    #[must_use]
    pub const fn with_argument_count(mut self, count: usize) -> Self {
        self.argument_count = Some(count);
        self
    }

    #[must_use]
    pub const fn with_return_value(mut self) -> Self {
        self.returns_value = true;
        self
    }

    /// Application function (as opposed to a library stub).
    pub const fn is_app_target(&self) -> bool {
        self.address.is_some()
    }
}
