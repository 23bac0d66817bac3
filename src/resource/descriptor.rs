//! Resource descriptor metadata carried alongside payloads.
//!
//! The queue checks image descriptors for internal consistency and against
//! the payload length; everything else here is copied into records verbatim.

use crate::error::{Error, Result};
use bitflags::bitflags;

/// Pixel format of a raw image.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
#[repr(u8)]
pub enum ImageFormat {
    /// One 8-bit channel.
    R8 = 1,
    /// One 16-bit channel.
    R16 = 2,
    /// 8-bit BGRA.
    Bgra8 = 3,
    /// 32-bit float RGBA.
    Rgbaf32 = 4,
    /// Two 8-bit channels.
    Rg8 = 5,
    /// Two 16-bit channels.
    Rg16 = 6,
    /// 32-bit integer RGBA.
    Rgbai32 = 7,
    /// 8-bit RGBA.
    Rgba8 = 8,
}

impl ImageFormat {
    /// Bytes used by one pixel.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::R8 => 1,
            Self::R16 | Self::Rg8 => 2,
            Self::Bgra8 | Self::Rg16 | Self::Rgba8 => 4,
            Self::Rgbaf32 | Self::Rgbai32 => 16,
        }
    }
}

/// Properties of an image.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
pub struct ImageDescriptorFlags(u32);

bitflags! {
    impl ImageDescriptorFlags: u32 {
        /// Every pixel is fully opaque.
        const IS_OPAQUE = 1;
        /// The consumer may generate mipmaps.
        const ALLOW_MIPMAPS = 2;
    }
}

/// Dimensions and layout of an image payload.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct ImageDescriptor {
    /// Pixel format.
    pub format: ImageFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row, when rows are padded. `None` means tightly packed.
    pub stride: Option<u32>,
    /// Byte offset of the first pixel in the payload.
    pub offset: u32,
    /// Image properties.
    pub flags: ImageDescriptorFlags,
}

impl ImageDescriptor {
    /// Describe a tightly packed image.
    pub const fn new(
        width: u32,
        height: u32,
        format: ImageFormat,
        flags: ImageDescriptorFlags,
    ) -> Self {
        Self {
            format,
            width,
            height,
            stride: None,
            offset: 0,
            flags,
        }
    }

    /// Set an explicit row stride.
    pub const fn with_stride(mut self, stride: u32) -> Self {
        self.stride = Some(stride);
        self
    }

    /// Set the offset of the first pixel.
    pub const fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Is the image marked opaque?
    pub const fn is_opaque(&self) -> bool {
        self.flags.contains(ImageDescriptorFlags::IS_OPAQUE)
    }

    /// Bytes in one row of pixels, without padding.
    pub const fn row_bytes(&self) -> u64 {
        self.width as u64 * self.format.bytes_per_pixel() as u64
    }

    /// Effective row stride in bytes.
    pub const fn compute_stride(&self) -> u64 {
        match self.stride {
            Some(stride) => stride as u64,
            None => self.row_bytes(),
        }
    }

    /// Minimum payload length holding every pixel, including the offset.
    ///
    /// The last row needs no trailing padding.
    pub const fn compute_total_size(&self) -> u64 {
        if self.height == 0 {
            return self.offset as u64;
        }
        let padded_rows = self.compute_stride().saturating_mul(self.height as u64 - 1);
        (self.offset as u64)
            .saturating_add(padded_rows)
            .saturating_add(self.row_bytes())
    }

    /// Check the descriptor is self-consistent.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidDescriptor(format!(
                "image dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if let Some(stride) = self.stride {
            if u64::from(stride) < self.row_bytes() {
                return Err(Error::InvalidDescriptor(format!(
                    "stride {stride} is shorter than a {} byte row",
                    self.row_bytes()
                )));
            }
        }
        Ok(())
    }

    /// Check the descriptor and that `len` payload bytes cover every pixel.
    pub fn validate_payload(&self, len: usize) -> Result<()> {
        self.validate()?;
        let required = self.compute_total_size();
        if (len as u64) < required {
            return Err(Error::InvalidDescriptor(format!(
                "{}x{} {:?} image needs {required} bytes, payload has {len}",
                self.width, self.height, self.format
            )));
        }
        Ok(())
    }
}

/// Texture binding point of an external image.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
#[repr(u8)]
pub enum TextureTarget {
    /// Plain 2D texture.
    Default = 0,
    /// 2D texture array.
    Array = 1,
    /// Platform external texture.
    External = 2,
    /// Rectangle texture.
    Rect = 3,
}

/// How the consumer obtains an external image's pixels.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
pub enum ExternalImageType {
    /// A texture handle bound at the given target.
    TextureHandle(TextureTarget),
    /// A CPU buffer the consumer locks on demand.
    Buffer,
}

/// Glyph rasterization mode.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
#[repr(u8)]
pub enum FontRenderMode {
    /// One bit per pixel.
    Mono = 0,
    /// Grayscale antialiasing.
    Alpha = 1,
    /// Per-channel (LCD) antialiasing.
    #[default]
    Subpixel = 2,
}

/// Rasterization switches of a font instance.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
pub struct FontInstanceFlags(u32);

bitflags! {
    impl FontInstanceFlags: u32 {
        /// Embolden glyphs synthetically.
        const SYNTHETIC_BOLD = 1 << 1;
        /// Use embedded bitmap strikes when present.
        const EMBEDDED_BITMAPS = 1 << 2;
        /// Subpixel order is BGR.
        const SUBPIXEL_BGR = 1 << 3;
        /// Swap axes.
        const TRANSPOSE = 1 << 4;
        /// Mirror horizontally.
        const FLIP_X = 1 << 5;
        /// Mirror vertically.
        const FLIP_Y = 1 << 6;
        /// Position glyphs at subpixel offsets.
        const SUBPIXEL_POSITION = 1 << 7;
        /// Vertical text layout.
        const VERTICAL = 1 << 8;
        /// Prefer the autohinter.
        const FORCE_AUTOHINT = 1 << 16;
        /// Never use the autohinter.
        const NO_AUTOHINT = 1 << 17;
        /// LCD subpixels are stacked vertically.
        const LCD_VERTICAL = 1 << 19;
    }
}

/// 8-bit RGBA color.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
pub struct ColorU {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl ColorU {
    /// Create a color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Platform-independent font instance settings.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct FontInstanceOptions {
    /// Rasterization mode.
    pub render_mode: FontRenderMode,
    /// Rasterization switches.
    pub flags: FontInstanceFlags,
    /// Background color used when blending subpixel text.
    pub bg_color: ColorU,
    /// Synthetic italic skew; the unit is defined by the consumer.
    pub synthetic_italics: i16,
}

/// Hinting strength.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
#[repr(u8)]
pub enum FontHinting {
    /// No hinting.
    None = 0,
    /// Monochrome hinting.
    Mono = 1,
    /// Light hinting.
    Light = 2,
    /// Full hinting.
    Normal = 3,
    /// Hinting tuned for LCD subpixels.
    #[default]
    Lcd = 4,
}

/// LCD filter applied to subpixel glyphs.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
#[repr(u8)]
pub enum FontLcdFilter {
    /// No filtering.
    None = 0,
    /// The rasterizer's default filter.
    #[default]
    Default = 1,
    /// A lighter filter.
    Light = 2,
    /// The legacy filter.
    Legacy = 3,
}

/// Platform-specific font instance settings.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct FontInstancePlatformOptions {
    /// LCD filter.
    pub lcd_filter: FontLcdFilter,
    /// Hinting strength.
    pub hinting: FontHinting,
}

/// One variable-font axis setting, written to segments as raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct FontVariation {
    /// OpenType axis tag, e.g. `wght`.
    pub tag: u32,
    /// Axis value.
    pub value: f32,
}

impl FontVariation {
    /// Create a variation from a four-character axis tag.
    pub const fn new(tag: [u8; 4], value: f32) -> Self {
        Self {
            tag: u32::from_be_bytes(tag),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_size_packed() {
        let desc = ImageDescriptor::new(4, 3, ImageFormat::Bgra8, ImageDescriptorFlags::empty());
        assert_eq!(desc.compute_stride(), 16);
        assert_eq!(desc.compute_total_size(), 48);
        assert!(desc.validate_payload(48).is_ok());
        assert!(desc.validate_payload(47).is_err());
    }

    #[test]
    fn test_total_size_with_stride_and_offset() {
        let desc = ImageDescriptor::new(2, 3, ImageFormat::R8, ImageDescriptorFlags::IS_OPAQUE)
            .with_stride(8)
            .with_offset(4);
        // offset + 2 padded rows + one unpadded row
        assert_eq!(desc.compute_total_size(), 4 + 16 + 2);
        assert!(desc.is_opaque());
    }

    #[test]
    fn test_validate_rejects_bad_descriptors() {
        let empty = ImageDescriptor::new(0, 10, ImageFormat::Rgba8, ImageDescriptorFlags::empty());
        assert!(matches!(empty.validate(), Err(Error::InvalidDescriptor(_))));

        let short_stride =
            ImageDescriptor::new(10, 10, ImageFormat::Rgba8, ImageDescriptorFlags::empty())
                .with_stride(39);
        assert!(short_stride.validate().is_err());
    }

    #[test]
    fn test_flags() {
        let mut flags = ImageDescriptorFlags::IS_OPAQUE;
        assert!(!flags.contains(ImageDescriptorFlags::ALLOW_MIPMAPS));
        flags |= ImageDescriptorFlags::ALLOW_MIPMAPS;
        assert!(flags.contains(ImageDescriptorFlags::IS_OPAQUE | ImageDescriptorFlags::ALLOW_MIPMAPS));
        assert_eq!(flags.bits(), 3);
    }

    #[test]
    fn test_font_flags_reject_unknown_bits() {
        let flags = FontInstanceFlags::SYNTHETIC_BOLD | FontInstanceFlags::LCD_VERTICAL;
        assert_eq!(flags.bits(), (1 << 1) | (1 << 19));
        assert_eq!(FontInstanceFlags::from_bits(flags.bits()), Some(flags));

        assert_eq!(FontInstanceFlags::from_bits(1 << 30), None);
        assert_eq!(
            FontInstanceFlags::from_bits_truncate((1 << 30) | (1 << 2)),
            FontInstanceFlags::EMBEDDED_BITMAPS
        );
        assert_eq!(FontInstanceFlags::default(), FontInstanceFlags::empty());

        let names: Vec<_> = flags.iter_names().map(|(name, _)| name).collect();
        assert_eq!(names, ["SYNTHETIC_BOLD", "LCD_VERTICAL"]);
    }

    #[test]
    fn test_font_variation_tag() {
        let wght = FontVariation::new(*b"wght", 700.0);
        assert_eq!(wght.tag, 0x7767_6874);
        assert_eq!(std::mem::size_of::<FontVariation>(), 8);
    }
}
