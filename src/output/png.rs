use super::OutputSink;
use crate::error::{Error, Result};
use crate::segmentation::{round_to_byte, AlphaMode, PixelBuffer};
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes every frame as `<dir>/<name>.png`
pub struct PngSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl PngSink {
    /// Create the output directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        tracing::info!("Writing output images to {}", dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    /// Files written so far, in write order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

/// Convert a buffer of any channel order and alpha mode to straight RGBA
///
/// PNG stores straight alpha, so premultiplied colors are divided back out.
pub fn to_rgba_image(frame: &PixelBuffer) -> RgbaImage {
    let (width, height) = frame.dimensions();
    let order = frame.order();
    let premultiplied = frame.alpha_mode() == AlphaMode::Premultiplied;

    let data = frame
        .pixels()
        .flat_map(|pixel| {
            let [r, g, b, a] = order.unpack(pixel);
            if premultiplied && a < u8::MAX {
                [unpremultiply(r, a), unpremultiply(g, a), unpremultiply(b, a), a]
            } else {
                [r, g, b, a]
            }
        })
        .collect();

    RgbaImage::from_raw(width, height, data).expect("PixelBuffer length invariant")
}

fn unpremultiply(channel: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        0
    } else {
        round_to_byte(f32::from(channel) * 255.0 / f32::from(alpha))
    }
}

impl OutputSink for PngSink {
    fn write_frame(&mut self, name: &str, frame: &PixelBuffer) -> Result<()> {
        let path = self.dir.join(format!("{name}.png"));
        let image = to_rgba_image(frame);

        image.save(&path).map_err(|source| Error::ImageSave {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("Wrote {} ({}x{})", path.display(), image.width(), image.height());
        self.written.push(path);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::ChannelOrder;
    use image::Rgba;

    #[test]
    fn test_bgra_premultiplied_to_rgba() {
        let frame = PixelBuffer::new(
            2,
            1,
            ChannelOrder::Bgra,
            AlphaMode::Premultiplied,
            vec![25, 50, 100, 128, 0, 0, 0, 0],
        );
        let image = to_rgba_image(&frame);

        assert_eq!(image.get_pixel(0, 0), &Rgba([199, 100, 50, 128]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_opaque_frame_is_reordered_only() {
        let frame = PixelBuffer::new(
            1,
            1,
            ChannelOrder::Bgra,
            AlphaMode::Premultiplied,
            vec![1, 2, 3, 255],
        );

        assert_eq!(to_rgba_image(&frame).get_pixel(0, 0), &Rgba([3, 2, 1, 255]));
    }

    #[test]
    fn test_straight_alpha_is_untouched() {
        let frame = PixelBuffer::new(
            1,
            1,
            ChannelOrder::Rgba,
            AlphaMode::Straight,
            vec![200, 100, 50, 10],
        );

        assert_eq!(to_rgba_image(&frame).get_pixel(0, 0), &Rgba([200, 100, 50, 10]));
    }

    #[test]
    fn test_conversion_keeps_every_pixel() {
        let data = (0..6 * 4 * 4).map(|i| (i % 256) as u8).collect();
        let frame = PixelBuffer::new(6, 4, ChannelOrder::Rgba, AlphaMode::Straight, data);
        let image = to_rgba_image(&frame);

        assert_eq!(image.dimensions(), (6, 4));
        assert_eq!(image.as_raw().as_slice(), frame.as_bytes());
    }

    #[test]
    fn test_writes_png_files() {
        let dir = std::env::temp_dir().join(format!("cutout-png-sink-{}", std::process::id()));
        let mut sink = PngSink::new(&dir).unwrap();
        let frame = PixelBuffer::new(
            2,
            2,
            ChannelOrder::Bgra,
            AlphaMode::Premultiplied,
            vec![255; 16],
        );

        sink.write_frame("o1", &frame).unwrap();

        let written = sink.written().to_vec();
        assert_eq!(written, vec![dir.join("o1.png")]);
        let decoded = image::open(&written[0]).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(1, 1), &Rgba([255, 255, 255, 255]));

        fs::remove_dir_all(&dir).unwrap();
    }
}
