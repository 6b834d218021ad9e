//! Known-script repair registry (component L).
//!
//! A handful of shipped `.cog` files parse cleanly but land on a semantically
//! wrong symbol attribute anyway — a stray `local` that should not apply to one
//! particular variable, in the one sample this crate has seen. Rather than special
//! casing the grammar for a single file, the fixup is registered here, keyed by
//! script file name, and applied once after [`CogScript::parse`] returns. Looking
//! up a name with nothing registered is a no-op, so callers can run every script
//! through [`FixupRegistry::apply`] unconditionally.

use crate::cog::parser::CogScript;
use crate::indexmap::IndexMap;

type Fixup = Box<dyn Fn(&mut CogScript) + Send + Sync>;

pub struct FixupRegistry {
    fixups: IndexMap<Fixup>,
}

impl FixupRegistry {
    pub fn new() -> Self {
        Self {
            fixups: IndexMap::new(),
        }
    }

    /// Registers a mutator for the script named `script_name` (case-insensitive,
    /// matched the same way every other named lookup in this crate is).
    pub fn register(
        &mut self,
        script_name: impl Into<String>,
        fixup: impl Fn(&mut CogScript) + Send + Sync + 'static,
    ) {
        self.fixups.push_back(script_name.into(), Box::new(fixup));
    }

    /// Applies the registered fixup for `script.name`, if any.
    pub fn apply(&self, script: &mut CogScript) {
        if let Some(fixup) = self.fixups.get(script.name.as_str()) {
            fixup(script);
        }
    }

    /// The fixups known at the time this crate was written.
    pub fn known() -> Self {
        let mut r = Self::new();
        r.register("01narshada.cog", |script| reset_local(script, "startcount"));
        r
    }
}

impl Default for FixupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn reset_local(script: &mut CogScript, symbol_name: &str) {
    if let Some(sym) = script.symbols.get_mut(symbol_name) {
        sym.is_local = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_script_name_is_a_no_op() {
        let mut script = CogScript::parse("symbols\n    int x=1\nend\n", "unknown.cog").unwrap();
        let before = script.clone();
        FixupRegistry::known().apply(&mut script);
        assert_eq!(script, before);
    }

    #[test]
    fn registered_fixup_mutates_named_symbol() {
        let mut script =
            CogScript::parse("symbols\n    int startcount=0 local\nend\n", "01narshada.cog").unwrap();
        assert!(script.symbols.get("startcount").unwrap().is_local);
        FixupRegistry::known().apply(&mut script);
        assert!(!script.symbols.get("startcount").unwrap().is_local);
    }

    #[test]
    fn registry_is_empty_by_default() {
        let r = FixupRegistry::new();
        let mut script = CogScript::parse("symbols\n    int x=1 local\nend\n", "01narshada.cog").unwrap();
        let before = script.clone();
        r.apply(&mut script);
        assert_eq!(script, before);
    }
}
