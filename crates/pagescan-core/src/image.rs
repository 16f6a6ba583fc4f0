#[derive(Clone, Copy, Debug)]
pub struct RgbaImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [[u8; 4]], // row-major, top row first, len = w*h
}

#[derive(Clone, Debug, PartialEq)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<[u8; 4]>,
}

impl RgbaImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![[0, 0, 0, 0]; width * height],
        }
    }

    pub fn filled(width: usize, height: usize, px: [u8; 4]) -> Self {
        Self {
            width,
            height,
            data: vec![px; width * height],
        }
    }

    /// Wrap packed RGBA8 bytes; `None` if the length does not match.
    pub fn from_rgba8(width: usize, height: usize, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != width * height * 4 {
            return None;
        }
        let data = bytes
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn view(&self) -> RgbaImageView<'_> {
        RgbaImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }
}

#[inline]
fn get_rgba(src: &RgbaImageView<'_>, x: i32, y: i32) -> [f32; 4] {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return [0.0; 4];
    }
    let p = src.data[y as usize * src.width + x as usize];
    [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
}

/// Bilinear sample at pixel coordinates `(x, y)`; outside pixels read as
/// transparent black.
#[inline]
pub fn sample_bilinear_rgba(src: &RgbaImageView<'_>, x: f32, y: f32) -> [u8; 4] {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_rgba(src, x0, y0);
    let p10 = get_rgba(src, x0 + 1, y0);
    let p01 = get_rgba(src, x0, y0 + 1);
    let p11 = get_rgba(src, x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = (a + fy * (b - a)).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let img = RgbaImage::from_rgba8(2, 1, &[0, 0, 0, 255, 200, 100, 50, 255]).expect("len");
        let mid = sample_bilinear_rgba(&img.view(), 0.5, 0.0);
        assert_eq!(mid, [100, 50, 25, 255]);
    }

    #[test]
    fn samples_outside_are_transparent() {
        let img = RgbaImage::filled(4, 4, [255, 255, 255, 255]);
        assert_eq!(sample_bilinear_rgba(&img.view(), -3.0, 1.0), [0, 0, 0, 0]);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(RgbaImage::from_rgba8(2, 2, &[0; 15]).is_none());
    }
}
