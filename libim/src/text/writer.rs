use std::fmt::Write as _;

use crate::math::{Box3, GradientColor, Rotator, Vector3};

/// Mirrors [`super::reader::TextResourceReader`]: writes the same section/label/key/
/// list/vector grammar it reads. Indentation uses a configurable indent string,
/// matching the original writer's configurable indent character.
pub struct TextResourceWriter {
    out: String,
    indent: String,
    depth: usize,
}

impl TextResourceWriter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            indent: "    ".to_owned(),
            depth: 0,
        }
    }

    pub fn with_indent(indent: impl Into<String>) -> Self {
        Self {
            out: String::new(),
            indent: indent.into(),
            depth: 0,
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn pad(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(&self.indent);
        }
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        self.pad();
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    pub fn blank_line(&mut self) {
        self.out.push('\n');
    }

    pub fn section(&mut self, name: &str) {
        self.line(format!("SECTION: {name}"));
    }

    pub fn key_value(&mut self, name: &str, value: impl std::fmt::Display) {
        self.line(format!("{name} {value}"));
    }

    pub fn key_hex(&mut self, name: &str, value: u32) {
        self.line(format!("{name} {value:#x}"));
    }

    pub fn vector(&self, v: Vector3) -> String {
        let mut s = String::new();
        write!(s, "({}/{}/{})", v.x, v.y, v.z).expect("String write is infallible");
        s
    }

    pub fn rotator(&self, r: Rotator) -> String {
        let mut s = String::new();
        write!(s, "({}/{}/{})", r.pitch, r.yaw, r.roll).expect("String write is infallible");
        s
    }

    pub fn box3(&self, b: Box3) -> String {
        format!("({}/{})", self.vector(b.min), self.vector(b.max))
    }

    pub fn gradient_color(&self, g: GradientColor) -> String {
        let c = |v: glam::Vec4| format!("({}/{}/{}/{})", v.x, v.y, v.z, v.w);
        format!(
            "({}/{}/{}/{})",
            c(g.top),
            c(g.mid),
            c(g.bottom_left),
            c(g.bottom_right)
        )
    }

    /// Writes `"<name> <count>"` then runs `row_writer` for each item, prefixing each
    /// row with `"<i>:"` if `row_ids` is set.
    pub fn write_list<T>(
        &mut self,
        name: &str,
        items: &[T],
        row_ids: bool,
        mut row_writer: impl FnMut(&mut Self, usize, &T),
    ) {
        self.line(format!("{name} {}", items.len()));
        for (i, item) in items.iter().enumerate() {
            if row_ids {
                self.pad();
                self.out.push_str(&format!("{i}: "));
                let saved_depth = self.depth;
                self.depth = 0;
                row_writer(self, i, item);
                self.depth = saved_depth;
            } else {
                row_writer(self, i, item);
            }
        }
    }
}

impl Default for TextResourceWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_and_key_formatting() {
        let mut w = TextResourceWriter::new();
        w.section("HEADER");
        w.key_value("FRAMES", 10);
        w.key_hex("FLAGS", 0x20);
        assert_eq!(w.into_string(), "SECTION: HEADER\nFRAMES 10\nFLAGS 0x20\n");
    }

    #[test]
    fn vector_formatting() {
        let w = TextResourceWriter::new();
        assert_eq!(w.vector(Vector3::new(1.0, 2.0, 3.0)), "(1/2/3)");
    }
}
