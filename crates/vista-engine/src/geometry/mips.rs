/// One level of a mip chain, tightly packed RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Full mip count for a `width` x `height` image: `floor(log2(max)) + 1`.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    32 - largest.leading_zeros()
}

/// Builds the full mip chain of an RGBA8 image with a 2x2 box filter.
///
/// Odd dimensions clamp the filter footprint at the border. Level 0 is the
/// input. Returns an empty chain if `rgba` does not match the dimensions.
pub fn generate_mip_chain(width: u32, height: u32, rgba: &[u8]) -> Vec<MipLevel> {
    let expected = (width as u64)
        .checked_mul(height as u64)
        .and_then(|texels| texels.checked_mul(4));
    if width == 0 || height == 0 || expected != Some(rgba.len() as u64) {
        return Vec::new();
    }

    let count = mip_level_count(width, height);
    let mut levels = Vec::with_capacity(count as usize);
    levels.push(MipLevel {
        width,
        height,
        rgba: rgba.to_vec(),
    });

    for _ in 1..count {
        let Some(prev) = levels.last() else { break };
        let next = downsample(prev);
        levels.push(next);
    }

    levels
}

fn downsample(src: &MipLevel) -> MipLevel {
    let width = (src.width / 2).max(1);
    let height = (src.height / 2).max(1);
    let mut rgba = vec![0u8; width as usize * height as usize * 4];

    let texel = |x: u32, y: u32, c: usize| -> u32 {
        let x = x.min(src.width - 1) as usize;
        let y = y.min(src.height - 1) as usize;
        src.rgba[(y * src.width as usize + x) * 4 + c] as u32
    };

    for y in 0..height {
        for x in 0..width {
            let (sx, sy) = (x * 2, y * 2);
            for c in 0..4 {
                let sum = texel(sx, sy, c)
                    + texel(sx + 1, sy, c)
                    + texel(sx, sy + 1, c)
                    + texel(sx + 1, sy + 1, c);
                rgba[(y as usize * width as usize + x as usize) * 4 + c] = ((sum + 2) / 4) as u8;
            }
        }
    }

    MipLevel {
        width,
        height,
        rgba,
    }
}
