//! Mipmap chain generation for a small texture, checked against the exact
//! level count and buffer size a 2x2 source should produce.

use libim::color::ColorFormat;
use libim::texture::Texture;

#[test]
fn two_by_two_white_texture_generates_one_by_one_lod() {
    let white = Texture::new_single_level(2, 2, ColorFormat::RGBA32, vec![0xFF; 2 * 2 * 4]);
    let chain = white.generate_mipmaps(None, None, true);

    assert_eq!(chain.mip_levels, 2);
    assert_eq!(chain.pixels.len(), 2 * 2 * 4 + 1 * 1 * 4);

    let lod1 = chain.mip_level(1).unwrap();
    assert_eq!(lod1, &[0xFF, 0xFF, 0xFF, 0xFF]);
}
