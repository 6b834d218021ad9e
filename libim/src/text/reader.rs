use std::str::FromStr;

use crate::error::SyntaxError;
use crate::math::{Box3, GradientColor, Rotator, Vector3, Vector4};
use crate::tokenizer::{Token, TokenType, Tokenizer};

/// Grammar helpers layered on [`Tokenizer`]: sections, labeled keys, slash-separated
/// vectors/boxes/gradients, and row-indexed or count-prefixed lists.
pub struct TextResourceReader {
    pub tokenizer: Tokenizer,
}

impl TextResourceReader {
    pub fn new(source: &str, file: Option<String>) -> Self {
        Self {
            tokenizer: Tokenizer::new(source, file),
        }
    }

    /// Consumes `"SECTION: <name>"`, case-insensitively. `name` may be several
    /// space-separated words (e.g. `"keyframe nodes"`); each is matched as its own
    /// identifier token.
    pub fn read_section(&mut self, name: &str) -> Result<(), SyntaxError> {
        self.tokenizer.assert_identifier("section")?;
        self.tokenizer.assert_punctuator(":")?;
        self.assert_identifier_words(name)
    }

    /// Consumes `"<name>:"`.
    pub fn read_label(&mut self, name: &str) -> Result<(), SyntaxError> {
        self.assert_identifier_words(name)?;
        self.tokenizer.assert_punctuator(":")
    }

    /// Consumes `"<name> <value>"` and returns the value token. `name` may be
    /// several space-separated words.
    pub fn read_key(&mut self, name: &str) -> Result<Token, SyntaxError> {
        self.assert_identifier_words(name)?;
        Ok(self.tokenizer.get_next_token(false)?.clone())
    }

    fn assert_identifier_words(&mut self, name: &str) -> Result<(), SyntaxError> {
        for word in name.split_whitespace() {
            self.tokenizer.assert_identifier(word)?;
        }
        Ok(())
    }

    pub fn read_key_number<T>(&mut self, name: &str) -> Result<T, SyntaxError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.read_key(name)?.get_number()
    }

    pub fn read_key_string(&mut self, name: &str) -> Result<String, SyntaxError> {
        self.assert_identifier_words(name)?;
        self.tokenizer.get_space_delimited_string(true)
    }

    /// Reads a slash-separated `(a/b/c)` vector.
    pub fn read_vector(&mut self) -> Result<Vector3, SyntaxError> {
        self.tokenizer.assert_punctuator("(")?;
        let x = self.tokenizer.get_next_token(false)?.get_number::<f32>()?;
        self.tokenizer.assert_punctuator("/")?;
        let y = self.tokenizer.get_next_token(false)?.get_number::<f32>()?;
        self.tokenizer.assert_punctuator("/")?;
        let z = self.tokenizer.get_next_token(false)?.get_number::<f32>()?;
        self.tokenizer.assert_punctuator(")")?;
        Ok(Vector3::new(x, y, z))
    }

    pub fn read_rotator(&mut self) -> Result<Rotator, SyntaxError> {
        let v = self.read_vector()?;
        Ok(Rotator::new(v.x, v.y, v.z))
    }

    pub fn read_box(&mut self) -> Result<Box3, SyntaxError> {
        self.tokenizer.assert_punctuator("(")?;
        let min = self.read_vector()?;
        self.tokenizer.assert_punctuator("/")?;
        let max = self.read_vector()?;
        self.tokenizer.assert_punctuator(")")?;
        Ok(Box3::new(min, max))
    }

    fn read_color4(&mut self) -> Result<Vector4, SyntaxError> {
        self.tokenizer.assert_punctuator("(")?;
        let r = self.tokenizer.get_next_token(false)?.get_number::<f32>()?;
        self.tokenizer.assert_punctuator("/")?;
        let g = self.tokenizer.get_next_token(false)?.get_number::<f32>()?;
        self.tokenizer.assert_punctuator("/")?;
        let b = self.tokenizer.get_next_token(false)?.get_number::<f32>()?;
        self.tokenizer.assert_punctuator("/")?;
        let a = self.tokenizer.get_next_token(false)?.get_number::<f32>()?;
        self.tokenizer.assert_punctuator(")")?;
        Ok(Vector4::new(r, g, b, a))
    }

    /// Reads a `(top/mid/bl/br)` gradient, where each component is itself a
    /// slash-separated 4-tuple.
    pub fn read_gradient_color(&mut self) -> Result<GradientColor, SyntaxError> {
        self.tokenizer.assert_punctuator("(")?;
        let top = self.read_color4()?;
        self.tokenizer.assert_punctuator("/")?;
        let mid = self.read_color4()?;
        self.tokenizer.assert_punctuator("/")?;
        let bl = self.read_color4()?;
        self.tokenizer.assert_punctuator("/")?;
        let br = self.read_color4()?;
        self.tokenizer.assert_punctuator(")")?;
        Ok(GradientColor {
            top,
            mid,
            bottom_left: bl,
            bottom_right: br,
        })
    }

    /// Reads a list headed by `"<name> <count>"`, then `count` rows produced by
    /// `row_reader`. If `row_ids` is set, each row is expected to begin with
    /// `"<i>:"` where `i` is the zero-based row index, and that is asserted against
    /// the running insertion count.
    pub fn read_list<T>(
        &mut self,
        name: &str,
        row_ids: bool,
        mut row_reader: impl FnMut(&mut Self, usize) -> Result<T, SyntaxError>,
    ) -> Result<Vec<T>, SyntaxError> {
        let count: usize = self.read_key_number(name)?;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            if row_ids {
                let idx: usize = self.tokenizer.get_next_token(false)?.get_number()?;
                self.tokenizer.assert_punctuator(":")?;
                if idx != i {
                    return Err(SyntaxError::new(
                        format!("row index mismatch: expected {i}, got {idx}"),
                        self.tokenizer.current_token().location.clone(),
                    ));
                }
            }
            out.push(row_reader(self, i)?);
        }
        Ok(out)
    }

    /// Reads an `end`-terminated list with no count header: keeps calling
    /// `row_reader` until the next identifier token (case-insensitively) equals
    /// `terminator`.
    pub fn read_list_until<T>(
        &mut self,
        terminator: &str,
        mut row_reader: impl FnMut(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<Vec<T>, SyntaxError> {
        let mut out = Vec::new();
        loop {
            let peek = self.tokenizer.peek_next_token(true)?;
            if peek.ty == TokenType::Identifier && peek.value == terminator {
                self.tokenizer.skip_next_token()?;
                break;
            }
            out.push(row_reader(self)?);
        }
        Ok(out)
    }
}
