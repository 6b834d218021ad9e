//! Text resource reader/writer (component C), layered on the tokenizer (component
//! B). Grounded on the teacher's pattern of building typed readers atop a
//! lower-level codec (`game_data/src/record.rs` builds `Record` atop `Encode`/
//! `Decode`; here `TextResourceReader` builds section/list/vector grammar atop
//! `Tokenizer`).

mod reader;
mod writer;

pub use reader::TextResourceReader;
pub use writer::TextResourceWriter;
