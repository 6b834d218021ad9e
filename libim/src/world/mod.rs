//! World/level files (component J): the compiled binary container (CND) and its
//! text projection (NDY), plus the patch-in-place path used to update a subset of
//! sections without rebuilding the whole file.

pub mod cnd;
pub mod geo;
pub mod header;
pub mod material;
pub mod ndy;
pub mod patch;
pub mod resource;
pub mod sector;

pub use cnd::{RawSection, World};
pub use geo::GeoResource;
pub use header::CndHeader;
pub use material::CndMaterial;
pub use ndy::{Ndy, NdyHeader};
pub use resource::StaticResourceNames;
pub use sector::Sector;
