//! Update records: one tagged description per resource mutation.

use super::descriptor::{
    ExternalImageType, FontInstanceOptions, FontInstancePlatformOptions, ImageDescriptor,
};
use super::keys::{ExternalImageId, FontInstanceKey, FontKey, ImageKey};
use crate::memory::OffsetRange;
use std::fmt;

/// A resource mutation, in the order the producer requested it.
///
/// Variants with inline payload carry an [`OffsetRange`] into the segments of
/// the batch they were flushed with. Later records may supersede earlier
/// ones for the same key, so a batch must be applied in order.
#[derive(Clone, Debug, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
pub enum ResourceUpdate {
    /// Register a raw image.
    AddImage {
        /// Image identifier.
        key: ImageKey,
        /// Pixel layout.
        descriptor: ImageDescriptor,
        /// Pixel bytes.
        bytes: OffsetRange,
    },
    /// Replace the pixels of a raw image.
    UpdateImage {
        /// Image identifier.
        key: ImageKey,
        /// Pixel layout.
        descriptor: ImageDescriptor,
        /// Pixel bytes.
        bytes: OffsetRange,
    },
    /// Register a blob image (serialized drawing commands).
    AddBlobImage {
        /// Image identifier.
        key: ImageKey,
        /// Output layout.
        descriptor: ImageDescriptor,
        /// Serialized blob.
        bytes: OffsetRange,
    },
    /// Replace the contents of a blob image.
    UpdateBlobImage {
        /// Image identifier.
        key: ImageKey,
        /// Output layout.
        descriptor: ImageDescriptor,
        /// Serialized blob.
        bytes: OffsetRange,
    },
    /// Register an image whose pixels the consumer already owns.
    AddExternalImage {
        /// Image identifier.
        key: ImageKey,
        /// Consumer-side image identifier.
        external_id: ExternalImageId,
    },
    /// Point an image at a different external source.
    UpdateExternalImage {
        /// Image identifier.
        key: ImageKey,
        /// Pixel layout.
        descriptor: ImageDescriptor,
        /// Consumer-side image identifier.
        external_id: ExternalImageId,
        /// How the consumer obtains the pixels.
        image_type: ExternalImageType,
        /// Plane/channel of a multi-planar source.
        channel_index: u8,
    },
    /// Drop an image of any kind.
    DeleteImage {
        /// Image identifier.
        key: ImageKey,
    },
    /// Register a font face from its file bytes.
    AddFont {
        /// Font identifier.
        key: FontKey,
        /// Font file bytes.
        bytes: OffsetRange,
        /// Face index within a font collection.
        index: u32,
    },
    /// Drop a font face.
    DeleteFont {
        /// Font identifier.
        key: FontKey,
    },
    /// Register a sized instance of a font face.
    AddFontInstance {
        /// Instance identifier.
        key: FontInstanceKey,
        /// Face the instance renders.
        font_key: FontKey,
        /// Glyph size in pixels.
        glyph_size: f32,
        /// Platform-independent settings.
        options: Option<FontInstanceOptions>,
        /// Platform-specific settings.
        platform_options: Option<FontInstancePlatformOptions>,
        /// Packed [`FontVariation`](super::FontVariation) array.
        variations: OffsetRange,
    },
    /// Drop a font instance.
    DeleteFontInstance {
        /// Instance identifier.
        key: FontInstanceKey,
    },
}

/// The tag of a [`ResourceUpdate`], without its fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    /// [`ResourceUpdate::AddImage`].
    AddImage,
    /// [`ResourceUpdate::UpdateImage`].
    UpdateImage,
    /// [`ResourceUpdate::AddBlobImage`].
    AddBlobImage,
    /// [`ResourceUpdate::UpdateBlobImage`].
    UpdateBlobImage,
    /// [`ResourceUpdate::AddExternalImage`].
    AddExternalImage,
    /// [`ResourceUpdate::UpdateExternalImage`].
    UpdateExternalImage,
    /// [`ResourceUpdate::DeleteImage`].
    DeleteImage,
    /// [`ResourceUpdate::AddFont`].
    AddFont,
    /// [`ResourceUpdate::DeleteFont`].
    DeleteFont,
    /// [`ResourceUpdate::AddFontInstance`].
    AddFontInstance,
    /// [`ResourceUpdate::DeleteFontInstance`].
    DeleteFontInstance,
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AddImage => "AddImage",
            Self::UpdateImage => "UpdateImage",
            Self::AddBlobImage => "AddBlobImage",
            Self::UpdateBlobImage => "UpdateBlobImage",
            Self::AddExternalImage => "AddExternalImage",
            Self::UpdateExternalImage => "UpdateExternalImage",
            Self::DeleteImage => "DeleteImage",
            Self::AddFont => "AddFont",
            Self::DeleteFont => "DeleteFont",
            Self::AddFontInstance => "AddFontInstance",
            Self::DeleteFontInstance => "DeleteFontInstance",
        };
        f.write_str(name)
    }
}

impl ResourceUpdate {
    /// The variant tag.
    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::AddImage { .. } => UpdateKind::AddImage,
            Self::UpdateImage { .. } => UpdateKind::UpdateImage,
            Self::AddBlobImage { .. } => UpdateKind::AddBlobImage,
            Self::UpdateBlobImage { .. } => UpdateKind::UpdateBlobImage,
            Self::AddExternalImage { .. } => UpdateKind::AddExternalImage,
            Self::UpdateExternalImage { .. } => UpdateKind::UpdateExternalImage,
            Self::DeleteImage { .. } => UpdateKind::DeleteImage,
            Self::AddFont { .. } => UpdateKind::AddFont,
            Self::DeleteFont { .. } => UpdateKind::DeleteFont,
            Self::AddFontInstance { .. } => UpdateKind::AddFontInstance,
            Self::DeleteFontInstance { .. } => UpdateKind::DeleteFontInstance,
        }
    }

    /// Address of the inline payload, for variants that carry one.
    pub fn payload(&self) -> Option<OffsetRange> {
        match self {
            Self::AddImage { bytes, .. }
            | Self::UpdateImage { bytes, .. }
            | Self::AddBlobImage { bytes, .. }
            | Self::UpdateBlobImage { bytes, .. }
            | Self::AddFont { bytes, .. } => Some(*bytes),
            Self::AddFontInstance { variations, .. } => Some(*variations),
            Self::AddExternalImage { .. }
            | Self::UpdateExternalImage { .. }
            | Self::DeleteImage { .. }
            | Self::DeleteFont { .. }
            | Self::DeleteFontInstance { .. } => None,
        }
    }

    /// The image this record mutates, if it is an image record.
    pub fn image_key(&self) -> Option<ImageKey> {
        match self {
            Self::AddImage { key, .. }
            | Self::UpdateImage { key, .. }
            | Self::AddBlobImage { key, .. }
            | Self::UpdateBlobImage { key, .. }
            | Self::AddExternalImage { key, .. }
            | Self::UpdateExternalImage { key, .. }
            | Self::DeleteImage { key } => Some(*key),
            _ => None,
        }
    }

    /// Does this record remove a resource?
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            Self::DeleteImage { .. } | Self::DeleteFont { .. } | Self::DeleteFontInstance { .. }
        )
    }
}
