use super::ImageSource;
use crate::error::{Error, Result};
use crate::segmentation::{ChannelOrder, PixelBuffer};
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Image file on disk (any format the `image` crate can decode)
///
/// The file is decoded once; every `decode` call resizes and lays out a new
/// buffer from that copy. EXIF orientation is ignored and alpha is kept
/// straight (not premultiplied).
pub struct FileSource {
    path: PathBuf,
    image: DynamicImage,
    filter: FilterType,
}

impl FileSource {
    /// Open and decode `path`, resizing with nearest-neighbor sampling
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_filter(path, FilterType::Nearest)
    }

    /// Open and decode `path`, resizing with `filter`
    ///
    /// The filter changes the pixel values fed to the encoder; nearest-neighbor
    /// is the reference policy.
    pub fn with_filter<P: AsRef<Path>>(path: P, filter: FilterType) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Opening image {}", path.display());

        let image = image::open(path).map_err(|source| Error::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            "Decoded {}x{} {:?}",
            image.width(),
            image.height(),
            image.color()
        );

        Ok(Self::from_image(path, image, filter))
    }

    /// Wrap an already decoded image
    pub fn from_image<P: AsRef<Path>>(path: P, image: DynamicImage, filter: FilterType) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            image,
            filter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for FileSource {
    fn decode(&self, width: u32, height: u32, order: ChannelOrder) -> Result<PixelBuffer> {
        let _span = tracing::debug_span!("source_decode").entered();

        if width == 0 || height == 0 {
            return Err(Error::InvalidParameter {
                name: "resolution".to_string(),
                reason: format!("{width}x{height} has no pixels"),
            });
        }

        // Resize if needed
        let rgba = if self.image.width() == width && self.image.height() == height {
            self.image.to_rgba8()
        } else {
            self.image.resize_exact(width, height, self.filter).to_rgba8()
        };

        Ok(PixelBuffer::from_rgba_image(rgba).reordered(order))
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        Some((self.image.width(), self.image.height()))
    }
}
