//! Keyframe animation (KEY) text codec (component H).
//!
//! Built on the text resource reader/writer (component C) the way the teacher
//! builds domain readers on `game_data`'s lower-level primitives.

use crate::error::{Error, SyntaxError};
use crate::math::{Rotator, Vector3};
use crate::text::{TextResourceReader, TextResourceWriter};
use crate::tokenizer::TokenType;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub frame: f32,
    pub ty: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KeyframeEntry {
    pub frame: f32,
    pub flags: u32,
    pub pos: Vector3,
    pub rot: Rotator,
    pub dpos: Vector3,
    pub drot: Rotator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimNode {
    pub num: u32,
    pub mesh_name: String,
    pub entries: Vec<KeyframeEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub flags: u32,
    pub ty: u32,
    pub frames: u32,
    pub fps: f32,
    pub joints: u32,
    pub markers: Vec<Marker>,
    pub nodes: Vec<AnimNode>,
}

impl Animation {
    pub fn read(source: &str, file: Option<String>) -> Result<Self, Error> {
        let mut r = TextResourceReader::new(source, file);

        r.read_section("header").map_err(map_syn)?;
        let flags: u32 = r.read_key_number("flags").map_err(map_syn)?;
        let ty: u32 = r.read_key_number("type").map_err(map_syn)?;
        let frames: u32 = r.read_key_number("frames").map_err(map_syn)?;
        let fps: f32 = r.read_key_number("fps").map_err(map_syn)?;
        let joints: u32 = r.read_key_number("joints").map_err(map_syn)?;

        let mut markers = Vec::new();
        let next_is = |r: &mut TextResourceReader, ident: &str| -> Result<bool, SyntaxError> {
            let tok = r.tokenizer.peek_next_token(true)?;
            Ok(tok.ty == TokenType::Identifier && tok.value == ident)
        };

        if next_is(&mut r, "markers").map_err(map_syn)? {
            markers = r
                .read_list("markers", false, |r, _| {
                    let frame = r.tokenizer.get_next_token(false)?.get_number::<f32>()?;
                    let ty = r.tokenizer.get_next_token(false)?.get_number::<u32>()?;
                    Ok(Marker { frame, ty })
                })
                .map_err(map_syn)?;
        }

        r.read_section("keyframe nodes").map_err(map_syn)?;
        let nodes = r
            .read_list("nodes", false, |r, _| {
                r.read_label("node").map_err(map_syn_passthrough)?;
                let num: u32 = r
                    .tokenizer
                    .get_next_token(false)
                    .map_err(map_syn_passthrough)?
                    .get_number()
                    .map_err(map_syn_passthrough)?;
                r.tokenizer
                    .assert_identifier("mesh")
                    .map_err(map_syn_passthrough)?;
                r.tokenizer
                    .assert_identifier("name")
                    .map_err(map_syn_passthrough)?;
                let mesh_name = r
                    .tokenizer
                    .get_space_delimited_string(true)
                    .map_err(map_syn_passthrough)?;

                let entries = r
                    .read_list("entries", true, |r, _| {
                        let frame = r.tokenizer.get_next_token(false)?.get_number::<f32>()?;
                        let flags = r.tokenizer.get_next_token(false)?.get_number::<u32>()?;
                        let pos = r.read_vector()?;
                        let rot = r.read_rotator()?;
                        let dpos = r.read_vector()?;
                        let drot = r.read_rotator()?;
                        Ok(KeyframeEntry {
                            frame,
                            flags,
                            pos,
                            rot,
                            dpos,
                            drot,
                        })
                    })
                    .map_err(map_syn_passthrough)?;

                Ok(AnimNode {
                    num,
                    mesh_name,
                    entries,
                })
            })
            .map_err(map_syn)?;

        Ok(Self {
            flags,
            ty,
            frames,
            fps,
            joints,
            markers,
            nodes,
        })
    }

    pub fn write(&self) -> String {
        let mut w = TextResourceWriter::new();
        w.section("HEADER");
        w.key_hex("FLAGS", self.flags);
        w.key_hex("TYPE", self.ty);
        w.key_value("FRAMES", self.frames);
        w.key_value("FPS", self.fps);
        w.key_value("JOINTS", self.joints);
        w.blank_line();

        if !self.markers.is_empty() {
            w.write_list("MARKERS", &self.markers, false, |w, _, m| {
                w.line(format!("{} {}", m.frame, m.ty));
            });
            w.blank_line();
        }

        w.section("KEYFRAME NODES");
        w.write_list("NODES", &self.nodes, false, |w, _, node| {
            w.line(format!("NODE {}", node.num));
            w.line(format!("MESH NAME {}", node.mesh_name));
            w.write_list("ENTRIES", &node.entries, true, |w, _, e| {
                w.line(format!(
                    "{} {} {} {} {} {}",
                    e.frame,
                    e.flags,
                    w.vector(e.pos),
                    w.rotator(e.rot),
                    w.vector(e.dpos),
                    w.rotator(e.drot),
                ));
            });
        });

        w.into_string()
    }
}

fn map_syn(e: SyntaxError) -> Error {
    Error::Syntax(e)
}

fn map_syn_passthrough(e: SyntaxError) -> SyntaxError {
    e
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_minimal_animation() {
        let anim = Animation {
            flags: 0x20,
            ty: 0,
            frames: 2,
            fps: 15.0,
            joints: 1,
            markers: vec![],
            nodes: vec![AnimNode {
                num: 0,
                mesh_name: "mesh1".to_owned(),
                entries: vec![KeyframeEntry {
                    frame: 0.0,
                    flags: 0,
                    pos: Vector3::ZERO,
                    rot: Rotator::ZERO,
                    dpos: Vector3::ZERO,
                    drot: Rotator::ZERO,
                }],
            }],
        };

        let text = anim.write();
        let parsed = Animation::read(&text, None).unwrap();
        assert_eq!(parsed.frames, 2);
        assert_eq!(parsed.nodes.len(), 1);
        assert_eq!(parsed.nodes[0].mesh_name, "mesh1");
        assert_eq!(parsed.nodes[0].entries.len(), 1);
    }
}
