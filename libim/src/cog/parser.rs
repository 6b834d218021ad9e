//! Grammar-level COG script parser (component I).
//!
//! State machine grounded on
//! `original_source/libraries/libim/content/asset/cog/impl/grammer/parser.cpp`.
//! This produces a declarative symbol table; it never executes a script body (out
//! of scope per `SPEC_FULL.md` Non-goals).

use crate::cog::message::CogMessageType;
use crate::cog::symbol::{CogSymbol, SymbolType, SymbolValue, ThingMask};
use crate::error::{Error, FormatError, SyntaxError};
use crate::indexmap::IndexMap;
use crate::math::Vector3;
use crate::tokenizer::{TokenType, Tokenizer};

#[derive(Debug, Clone, PartialEq)]
pub struct CogScript {
    pub name: String,
    pub flags: u32,
    pub symbols: IndexMap<CogSymbol>,
}

const MAX_RENAME_ATTEMPTS: u32 = 256;

impl CogScript {
    pub fn parse(source: &str, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        let mut t = Tokenizer::new(source, Some(name.clone()));
        t.set_report_eol(true);

        skip_blank_lines(&mut t)?;

        let mut flags = 0u32;
        if peek_is_identifier(&mut t, "flags")? {
            t.skip_next_token()?;
            t.assert_punctuator("=")?;
            flags = t.get_next_token(false)?.get_number::<u32>()?;
            expect_eol_or_eof(&mut t)?;
            skip_blank_lines(&mut t)?;
        }

        t.assert_identifier("symbols")?;
        expect_eol_or_eof(&mut t)?;

        let mut symbols = IndexMap::new();
        loop {
            skip_blank_lines(&mut t)?;
            if peek_is_identifier(&mut t, "end")? {
                t.skip_next_token()?;
                expect_eol_or_eof(&mut t)?;
                break;
            }
            let symbol = parse_symbol(&mut t)?;
            insert_symbol(&mut symbols, symbol)?;
        }

        skip_blank_lines(&mut t)?;
        t.assert_eof()?;

        Ok(Self {
            name,
            flags,
            symbols,
        })
    }
}

fn skip_blank_lines(t: &mut Tokenizer) -> Result<(), SyntaxError> {
    while t.peek_next_token(false)?.ty == TokenType::EndOfLine {
        t.skip_next_token()?;
    }
    Ok(())
}

fn peek_is_identifier(t: &mut Tokenizer, word: &str) -> Result<bool, SyntaxError> {
    let tok = t.peek_next_token(true)?;
    Ok(tok.ty == TokenType::Identifier && tok.value == word)
}

fn expect_eol_or_eof(t: &mut Tokenizer) -> Result<(), SyntaxError> {
    let tok = t.get_next_token(false)?;
    if tok.ty != TokenType::EndOfLine && tok.ty != TokenType::EndOfFile {
        return Err(SyntaxError::new(
            format!("expected end of line, got {:?}", tok.value),
            tok.location.clone(),
        ));
    }
    Ok(())
}

fn parse_symbol(t: &mut Tokenizer) -> Result<CogSymbol, Error> {
    let kw = t.get_identifier()?;
    let ty = SymbolType::from_keyword(&kw)
        .ok_or_else(|| FormatError::UnknownSymbolType(kw.clone()))?;

    let name_tok_loc = t.peek_next_token(false)?.location.clone();
    let ident = t.get_identifier()?;

    if ty == SymbolType::Message {
        let msg = CogMessageType::from_name(&ident)
            .ok_or_else(|| FormatError::UnknownMessage(ident.clone()))?;
        let mut sym = CogSymbol::new(ty, ident);
        sym.is_local = true;
        sym.set_default_value(SymbolValue::Message(msg));
        parse_attributes(t, &mut sym)?;
        expect_eol_or_eof(t)?;
        return Ok(sym);
    }

    let mut sym = CogSymbol::new(ty, ident);

    if t.peek_next_token(false)?.ty == TokenType::Punctuator
        && t.peek_next_token(false)?.value == "="
    {
        t.skip_next_token()?;
        let value = parse_value(t, ty).map_err(Error::Syntax)?;
        sym.set_default_value(value);
        if t.peek_next_token(false)?.ty == TokenType::Punctuator
            && t.peek_next_token(false)?.value == ";"
        {
            t.skip_next_token()?;
        }
    }

    parse_attributes(t, &mut sym)?;
    expect_eol_or_eof(t).map_err(|e| {
        Error::Syntax(SyntaxError::new(
            format!("{} (symbol declared at {})", e, name_tok_loc),
            e.location,
        ))
    })?;
    Ok(sym)
}

fn parse_value(t: &mut Tokenizer, ty: SymbolType) -> Result<SymbolValue, SyntaxError> {
    match ty {
        SymbolType::Int => {
            let tok = t.get_next_token(false)?;
            if tok.ty == TokenType::FloatNumber {
                tracing::warn!("int symbol initialized with a float literal, truncating");
                return Ok(SymbolValue::Int(tok.get_number::<f64>()? as i32));
            }
            Ok(SymbolValue::Int(tok.get_number::<i32>()?))
        }
        SymbolType::Flex => {
            let tok = t.get_next_token(false)?;
            Ok(SymbolValue::Float(tok.get_number::<f32>()?))
        }
        SymbolType::Vector => {
            t.assert_punctuator("(")?;
            let x = t.get_next_token(false)?.get_number::<f32>()?;
            t.assert_punctuator("/")?;
            let y = t.get_next_token(false)?.get_number::<f32>()?;
            t.assert_punctuator("/")?;
            let z = t.get_next_token(false)?.get_number::<f32>()?;
            t.assert_punctuator(")")?;
            Ok(SymbolValue::Vector(Vector3::new(x, y, z)))
        }
        SymbolType::Ai
        | SymbolType::Keyframe
        | SymbolType::Material
        | SymbolType::Model
        | SymbolType::Sound => {
            let tok = t.get_next_token(false)?;
            let ext_ok = match ty {
                SymbolType::Ai => tok.value.to_ascii_lowercase().ends_with(".ai"),
                SymbolType::Keyframe => tok.value.to_ascii_lowercase().ends_with(".key"),
                SymbolType::Material => tok.value.to_ascii_lowercase().ends_with(".mat"),
                SymbolType::Model => tok.value.to_ascii_lowercase().ends_with(".3do"),
                SymbolType::Sound => tok.value.to_ascii_lowercase().ends_with(".wav"),
                _ => unreachable!(),
            };
            if tok.value.is_empty() || !ext_ok {
                return Err(SyntaxError::new(
                    format!("invalid resource name {:?} for {ty:?} symbol", tok.value),
                    tok.location.clone(),
                ));
            }
            Ok(SymbolValue::String(tok.value.clone()))
        }
        SymbolType::Cog | SymbolType::Sector | SymbolType::Surface | SymbolType::Thing => {
            let tok = t.get_next_token(false)?;
            Ok(SymbolValue::Int(tok.get_number::<i32>()?))
        }
        SymbolType::Template => {
            let tok = t.get_next_token(false)?;
            if tok.value.is_empty() || tok.value.parse::<i64>().is_ok() {
                return Err(SyntaxError::new(
                    format!("invalid template name {:?}", tok.value),
                    tok.location.clone(),
                ));
            }
            Ok(SymbolValue::String(tok.value.clone()))
        }
        SymbolType::Message | SymbolType::None => unreachable!("handled by caller"),
    }
}

fn parse_attributes(t: &mut Tokenizer, sym: &mut CogSymbol) -> Result<(), Error> {
    loop {
        let tok = t.peek_next_token(true)?;
        if tok.ty != TokenType::Identifier {
            break;
        }
        match tok.value.as_str() {
            "local" => {
                t.skip_next_token()?;
                sym.is_local = true;
            }
            "nolink" => {
                t.skip_next_token()?;
                sym.link_id = -1;
            }
            "desc" => {
                t.skip_next_token()?;
                t.assert_punctuator("=")?;
                let rest = match t.get_delimited_string(|c| c == '\n') {
                    Ok(s) => s,
                    Err(_) => String::new(),
                };
                sym.description = Some(rest.trim().to_owned());
            }
            "linkid" => {
                t.skip_next_token()?;
                t.assert_punctuator("=")?;
                let value = t.get_next_token(false)?.get_number::<i32>()?;
                if sym.ty.is_primitive() {
                    tracing::warn!(symbol = %sym.name, "linkid attribute ignored on primitive symbol");
                } else {
                    sym.link_id = value;
                }
            }
            "mask" => {
                t.skip_next_token()?;
                t.assert_punctuator("=")?;
                let value = t.get_next_token(false)?.get_number::<u32>()?;
                if sym.ty.is_primitive() {
                    tracing::warn!(symbol = %sym.name, "mask attribute ignored on primitive symbol");
                } else {
                    sym.mask = ThingMask::from_bits_truncate(value);
                }
            }
            _ => break,
        }
    }
    Ok(())
}

fn insert_symbol(symbols: &mut IndexMap<CogSymbol>, mut symbol: CogSymbol) -> Result<(), Error> {
    if !symbols.contains_key(symbol.name.as_str()) {
        symbols.push_back(symbol.name.clone(), symbol);
        return Ok(());
    }

    if symbol.ty == SymbolType::Message {
        tracing::warn!(name = %symbol.name, "duplicate message symbol skipped");
        return Ok(());
    }

    let base = symbol.name.clone();
    for n in 0..MAX_RENAME_ATTEMPTS {
        let candidate = format!("{base}_{n}");
        if !symbols.contains_key(candidate.as_str()) {
            tracing::warn!(original = %base, renamed = %candidate, "duplicate symbol renamed");
            symbol.name = candidate.clone();
            symbols.push_back(candidate, symbol);
            return Ok(());
        }
    }

    Err(FormatError::Mismatch {
        what: "cog symbol name",
        expected: format!("a free name for duplicate {base:?} within 256 attempts"),
        got: "none available".into(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_symbol_table() {
        let src = "flags=0x20\nsymbols\n    int lives=3 local desc=Player lives\nend\n";
        let script = CogScript::parse(src, "test.cog").unwrap();
        assert_eq!(script.flags, 0x20);
        assert_eq!(script.symbols.len(), 1);
        let (_, sym) = script.symbols.at(0).unwrap();
        assert_eq!(sym.ty, SymbolType::Int);
        assert_eq!(sym.name, "lives");
        assert!(sym.is_local);
        assert_eq!(sym.description.as_deref(), Some("Player lives"));
        assert_eq!(sym.default_value(), Some(&SymbolValue::Int(3)));
    }

    #[test]
    fn duplicate_variable_is_renamed() {
        let src = "symbols\n    int player=1\n    int player=2\nend\n";
        let script = CogScript::parse(src, "test.cog").unwrap();
        assert_eq!(script.symbols.len(), 2);
        assert!(script.symbols.contains_key("player"));
        assert!(script.symbols.contains_key("player_0"));
    }

    #[test]
    fn duplicate_message_is_skipped() {
        let src = "symbols\n    message activate\n    message activate\nend\n";
        let script = CogScript::parse(src, "test.cog").unwrap();
        assert_eq!(script.symbols.len(), 1);
    }

    #[test]
    fn unknown_message_name_is_fatal() {
        let src = "symbols\n    message bogus\nend\n";
        assert!(CogScript::parse(src, "test.cog").is_err());
    }

    #[test]
    fn vector_symbol_value() {
        let src = "symbols\n    vector up=(0/1/0)\nend\n";
        let script = CogScript::parse(src, "test.cog").unwrap();
        let (_, sym) = script.symbols.at(0).unwrap();
        assert_eq!(sym.default_value(), Some(&SymbolValue::Vector(Vector3::new(0.0, 1.0, 0.0))));
    }
}
