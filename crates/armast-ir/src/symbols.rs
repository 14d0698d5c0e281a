//! Symbol tables.
//!
//! Each function lift owns a local table (inside its builder); the global
//! table is shared by all functions of a session.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::AstError;

/// A global symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalSymbol {
    pub name: String,
    pub address: Option<u64>,
    pub descr: Option<String>,
}

/// Registered struct/union declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompDecl {
    pub key: i64,
    pub name: String,
    pub is_union: bool,
}

/// Symbols visible to every function.
#[derive(Debug, Default)]
pub struct GlobalSymbolTable {
    symbols: BTreeMap<String, GlobalSymbol>,
    by_address: FxHashMap<u64, String>,
    compinfos: BTreeMap<i64, CompDecl>,
}

/// Global table shared across parallel function lifts.
pub type SharedGlobals = Arc<Mutex<GlobalSymbolTable>>;

impl GlobalSymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table ready to be shared between builders.
    pub fn shared() -> SharedGlobals {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Add a symbol, returning the existing entry if the name is taken.
    pub fn add_symbol(&mut self, name: &str, address: Option<u64>, descr: Option<&str>) -> GlobalSymbol {
        if let Some(existing) = self.symbols.get(name) {
            return existing.clone();
        }
        let symbol = GlobalSymbol {
            name: name.to_string(),
            address,
            descr: descr.map(str::to_string),
        };
        if let Some(addr) = address {
            self.by_address.insert(addr, name.to_string());
        }
        self.symbols.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn get(&self, name: &str) -> Option<&GlobalSymbol> {
        self.symbols.get(name)
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Name of the global variable at `address`.
    pub fn name_at(&self, address: u64) -> Option<&str> {
        self.by_address.get(&address).map(String::as_str)
    }

    /// Register a struct/union declaration. Keys are unique.
    pub fn add_compinfo(&mut self, key: i64, name: &str, is_union: bool) -> Result<(), AstError> {
        if let Some(existing) = self.compinfos.get(&key) {
            if existing.name == name && existing.is_union == is_union {
                return Ok(());
            }
            return Err(AstError::CompInfoConflict {
                key,
                existing: existing.name.clone(),
                new: name.to_string(),
            });
        }
        self.compinfos.insert(
            key,
            CompDecl {
                key,
                name: name.to_string(),
                is_union,
            },
        );
        Ok(())
    }

    pub fn compinfo(&self, key: i64) -> Option<&CompDecl> {
        self.compinfos.get(&key)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &GlobalSymbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
