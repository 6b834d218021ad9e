//! COG script declarations (component I).
//!
//! Parses the declarative symbol table at the top of a `.cog` file. Script bodies
//! (the verb/trigger logic after `end`) are never executed, matching the
//! distillation's scope: this crate is an asset toolkit, not a COG VM.

pub mod message;
pub mod parser;
pub mod symbol;

pub use message::CogMessageType;
pub use parser::CogScript;
pub use symbol::{CogSymbol, SymbolType, SymbolValue, ThingMask};
