//! COG symbol types and values (component I).
//!
//! `CogSymbol::Type` ordinal values are ported verbatim from
//! `original_source/libraries/libim/content/asset/cog/cogsymbol.h`.

use bitflags::bitflags;

use crate::cog::message::CogMessageType;
use crate::indexmap::IndexMap;
use crate::math::Vector3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SymbolType {
    None = 0,
    Int = 1,
    Flex = 2,
    Thing = 3,
    Template = 4,
    Sector = 5,
    Surface = 6,
    Keyframe = 7,
    Sound = 8,
    Cog = 9,
    Material = 10,
    Vector = 11,
    Model = 12,
    Ai = 13,
    Message = 14,
}

impl SymbolType {
    /// Case-insensitive lookup by the grammar keyword. `"float"` is an accepted
    /// synonym for `"flex"`, matching the original grammar table.
    pub fn from_keyword(kw: &str) -> Option<Self> {
        match kw.to_ascii_lowercase().as_str() {
            "int" => Some(Self::Int),
            "flex" | "float" => Some(Self::Flex),
            "thing" => Some(Self::Thing),
            "template" => Some(Self::Template),
            "sector" => Some(Self::Sector),
            "surface" => Some(Self::Surface),
            "keyframe" => Some(Self::Keyframe),
            "sound" => Some(Self::Sound),
            "cog" => Some(Self::Cog),
            "material" => Some(Self::Material),
            "vector" => Some(Self::Vector),
            "model" => Some(Self::Model),
            "ai" => Some(Self::Ai),
            "message" => Some(Self::Message),
            _ => None,
        }
    }

    pub fn is_primitive(self) -> bool {
        matches!(self, Self::Int | Self::Flex | Self::Vector)
    }
}

bitflags! {
    /// Type-mask bits for `thing` symbols' default `mask` attribute.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThingMask: u32 {
        const FREE = 1 << 0;
        const PLAYER = 1 << 1;
        const ACTOR = 1 << 2;
        const WEAPON = 1 << 3;
        const DOOR = 1 << 4;
        const ITEM = 1 << 5;
        const EXPLOSION = 1 << 6;
        const DEBRIS = 1 << 7;
        const PARTICLE = 1 << 8;
        const CAMERA = 1 << 9;
        const GHOST = 1 << 10;
        const SYSTEM = 1 << 11;
        const SOUND = 1 << 12;
        const HINT = 1 << 13;
        const CORPSE = 1 << 14;
    }
}

/// A resolved, typed symbol value. References to other asset kinds are modeled as
/// plain strings/integers (the raw text or numeric form read from the script); the
/// world loader is responsible for resolving them against the asset tables.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolValue {
    Empty,
    Int(i32),
    Float(f32),
    String(String),
    Vector(Vector3),
    Message(CogMessageType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CogSymbol {
    pub ty: SymbolType,
    pub name: String,
    pub is_local: bool,
    pub link_id: i32,
    pub mask: ThingMask,
    pub description: Option<String>,
    /// Slot 0 is the declaration default; non-zero slots are per-instance overrides
    /// assigned by the world loader.
    pub vtable: IndexMap<SymbolValue>,
}

impl CogSymbol {
    pub fn new(ty: SymbolType, name: impl Into<String>) -> Self {
        let link_id = if ty.is_primitive() { -1 } else { 0 };
        let mask = if ty.is_primitive() {
            ThingMask::empty()
        } else {
            ThingMask::PLAYER | ThingMask::FREE
        };
        let mut vtable = IndexMap::new();
        vtable.push_back("default", SymbolValue::Empty);
        Self {
            ty,
            name: name.into(),
            is_local: false,
            link_id,
            mask,
            description: None,
            vtable,
        }
    }

    pub fn set_default_value(&mut self, value: SymbolValue) {
        if let Some(slot) = self.vtable.at_mut(0) {
            *slot = value;
        }
    }

    pub fn default_value(&self) -> Option<&SymbolValue> {
        self.vtable.at(0).map(|(_, v)| v)
    }

    pub fn has_default_value(&self) -> bool {
        !matches!(self.default_value(), Some(SymbolValue::Empty) | None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_accepts_float_synonym() {
        assert_eq!(SymbolType::from_keyword("float"), Some(SymbolType::Flex));
        assert_eq!(SymbolType::from_keyword("flex"), Some(SymbolType::Flex));
    }

    #[test]
    fn primitive_symbols_default_link_id_negative_one() {
        let sym = CogSymbol::new(SymbolType::Int, "lives");
        assert_eq!(sym.link_id, -1);
    }

    #[test]
    fn non_primitive_symbols_default_mask() {
        let sym = CogSymbol::new(SymbolType::Thing, "player");
        assert_eq!(sym.link_id, 0);
        assert!(sym.mask.contains(ThingMask::PLAYER | ThingMask::FREE));
    }
}
