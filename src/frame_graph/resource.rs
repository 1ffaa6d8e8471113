//! Resource kinds understood by the frame graph.
//!
//! The set of kinds is closed: every kind has a variant in [`ResourceKind`],
//! [`ResourceDescriptor`] and [`ConcreteResource`], and the typed API is
//! layered on top of those through the [`Resource`] trait. Descriptor
//! validation and allocator requests dispatch on the kind tag.

use std::fmt;

use bitflags::bitflags;

use crate::error::{FrameGraphError, FrameGraphResult};

/// Kind tag of a virtual resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A whole texture, allocated by the frame graph or imported.
    Texture,
    /// A single mip level / layer of a texture, or an imported render target.
    TextureSubresource,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Texture => write!(f, "texture"),
            Self::TextureSubresource => write!(f, "texture subresource"),
        }
    }
}

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    R8Unorm,
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rgba16Float,
    Rgba32Float,
    R11G11B10Float,
    R32Float,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::Depth24PlusStencil8)
    }
}

/// Texture target type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerType {
    #[default]
    Sampler2d,
    Sampler2dArray,
    SamplerCubemap,
    Sampler3d,
}

/// Descriptor of a virtual texture.
///
/// Only the frame graph's validation looks inside; otherwise the descriptor is
/// handed through to the [`ResourceAllocator`](crate::ResourceAllocator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of images for 3D and array textures.
    pub depth: u32,
    /// Number of mip levels.
    pub levels: u8,
    /// 0 = auto, 1 = explicitly not multisampled, >1 = multisampled.
    pub samples: u8,
    /// Texture target type.
    pub sampler_type: SamplerType,
    /// Internal format.
    pub format: TextureFormat,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth: 1,
            levels: 1,
            samples: 0,
            sampler_type: SamplerType::Sampler2d,
            format: TextureFormat::Rgba8Unorm,
        }
    }
}

impl TextureDescriptor {
    /// Describe a single-level 2D texture.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            ..Self::default()
        }
    }

    /// Set the number of mip levels.
    pub fn with_levels(mut self, levels: u8) -> Self {
        self.levels = levels;
        self
    }

    /// Set the sample count.
    pub fn with_samples(mut self, samples: u8) -> Self {
        self.samples = samples;
        self
    }

    /// Set the target type and the number of layers or slices.
    pub fn with_sampler_type(mut self, sampler_type: SamplerType, depth: u32) -> Self {
        self.sampler_type = sampler_type;
        self.depth = depth;
        self
    }

    /// Largest mip chain the extent supports.
    pub fn max_levels(&self) -> u32 {
        let largest = match self.sampler_type {
            SamplerType::Sampler3d => self.width.max(self.height).max(self.depth),
            _ => self.width.max(self.height),
        };
        if largest == 0 {
            0
        } else {
            u32::BITS - largest.leading_zeros()
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(format!(
                "extent {}x{}x{} must be non-zero",
                self.width, self.height, self.depth
            ));
        }
        if self.levels == 0 {
            return Err("texture needs at least one mip level".to_string());
        }
        if u32::from(self.levels) > self.max_levels() {
            return Err(format!(
                "{} mip levels requested, extent supports at most {}",
                self.levels,
                self.max_levels()
            ));
        }
        match self.sampler_type {
            SamplerType::Sampler2d if self.depth != 1 => {
                Err(format!("2D texture must have depth 1, got {}", self.depth))
            }
            SamplerType::SamplerCubemap if self.width != self.height => Err(format!(
                "cubemap faces must be square, got {}x{}",
                self.width, self.height
            )),
            SamplerType::Sampler3d if self.format.is_depth() => {
                Err(format!("{:?} cannot be used for a 3D texture", self.format))
            }
            _ => Ok(()),
        }
    }
}

/// Descriptor of a texture subresource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubresourceDescriptor {
    /// Mip level of the parent texture.
    pub level: u8,
    /// Layer, face or slice of the parent texture.
    pub layer: u32,
}

impl SubresourceDescriptor {
    pub fn new(level: u8, layer: u32) -> Self {
        Self { level, layer }
    }

    fn validate_against(&self, parent: &TextureDescriptor) -> Result<(), String> {
        if self.level >= parent.levels {
            return Err(format!(
                "level {} out of range, parent has {} levels",
                self.level, parent.levels
            ));
        }
        let layers = match parent.sampler_type {
            SamplerType::SamplerCubemap => 6,
            _ => parent.depth,
        };
        if self.layer >= layers {
            return Err(format!(
                "layer {} out of range, parent has {} layers",
                self.layer, layers
            ));
        }
        Ok(())
    }
}

bitflags! {
    /// How a pass uses a texture or one of its subresources.
    ///
    /// The allocator receives the union of every usage declared by surviving
    /// passes on the texture and its subresources.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLEABLE = 1 << 0;
        const UPLOADABLE = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const DEPTH_ATTACHMENT = 1 << 3;
        const STENCIL_ATTACHMENT = 1 << 4;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::SAMPLEABLE
    }
}

/// Handle to a concrete texture owned by an allocator or by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(u64);

impl TextureHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Handle to a concrete render target owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle(u64);

impl RenderTargetHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Concrete value a texture subresource resolves to during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubresourceBinding {
    /// A level/layer view of the parent's concrete texture.
    View {
        texture: TextureHandle,
        level: u8,
        layer: u32,
    },
    /// An imported render target.
    RenderTarget(RenderTargetHandle),
}

/// Descriptor of any resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceDescriptor {
    Texture(TextureDescriptor),
    TextureSubresource(SubresourceDescriptor),
}

impl ResourceDescriptor {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Texture(_) => ResourceKind::Texture,
            Self::TextureSubresource(_) => ResourceKind::TextureSubresource,
        }
    }

    /// Validate a descriptor that does not depend on a parent.
    pub(crate) fn validate(&self, name: &str) -> FrameGraphResult<()> {
        let result = match self {
            Self::Texture(desc) => desc.validate(),
            Self::TextureSubresource(_) => Ok(()),
        };
        result.map_err(|reason| FrameGraphError::InvalidDescriptor {
            name: name.to_string(),
            reason,
        })
    }

    /// Validate a subresource descriptor against its parent texture.
    pub(crate) fn validate_subresource(
        name: &str,
        desc: &SubresourceDescriptor,
        parent: &TextureDescriptor,
    ) -> FrameGraphResult<()> {
        desc.validate_against(parent)
            .map_err(|reason| FrameGraphError::InvalidDescriptor {
                name: name.to_string(),
                reason,
            })
    }
}

/// Concrete resource of any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcreteResource {
    Texture(TextureHandle),
    TextureSubresource(SubresourceBinding),
}

/// A resource kind usable through typed handles.
///
/// Implemented by the marker types [`Texture`] and [`TextureSubresource`].
pub trait Resource: 'static {
    type Descriptor: Clone + fmt::Debug + Send + 'static;
    type Concrete: Clone + fmt::Debug + Send + 'static;
    /// Access tag a pass declares when reading or writing this kind.
    ///
    /// Folded into the texture usage the allocator sees for the backing
    /// texture.
    type Usage: Copy + fmt::Debug + Into<TextureUsage>;

    const KIND: ResourceKind;

    fn wrap_descriptor(desc: Self::Descriptor) -> ResourceDescriptor;
    fn descriptor(desc: &ResourceDescriptor) -> Option<&Self::Descriptor>;
    fn wrap_concrete(resource: Self::Concrete) -> ConcreteResource;
    fn concrete(resource: &ConcreteResource) -> Option<&Self::Concrete>;
}

/// Resources a pass may create from a bare descriptor.
pub trait Creatable: Resource {}

/// Resources that may be imported from caller-owned storage.
pub trait Importable: Resource {}

/// Marker type for whole textures.
#[derive(Debug)]
pub enum Texture {}

/// Marker type for texture subresources.
#[derive(Debug)]
pub enum TextureSubresource {}

impl Resource for Texture {
    type Descriptor = TextureDescriptor;
    type Concrete = TextureHandle;
    type Usage = TextureUsage;

    const KIND: ResourceKind = ResourceKind::Texture;

    fn wrap_descriptor(desc: TextureDescriptor) -> ResourceDescriptor {
        ResourceDescriptor::Texture(desc)
    }

    fn descriptor(desc: &ResourceDescriptor) -> Option<&TextureDescriptor> {
        match desc {
            ResourceDescriptor::Texture(d) => Some(d),
            _ => None,
        }
    }

    fn wrap_concrete(resource: TextureHandle) -> ConcreteResource {
        ConcreteResource::Texture(resource)
    }

    fn concrete(resource: &ConcreteResource) -> Option<&TextureHandle> {
        match resource {
            ConcreteResource::Texture(t) => Some(t),
            _ => None,
        }
    }
}

impl Creatable for Texture {}
impl Importable for Texture {}

impl Resource for TextureSubresource {
    type Descriptor = SubresourceDescriptor;
    type Concrete = SubresourceBinding;
    type Usage = TextureUsage;

    const KIND: ResourceKind = ResourceKind::TextureSubresource;

    fn wrap_descriptor(desc: SubresourceDescriptor) -> ResourceDescriptor {
        ResourceDescriptor::TextureSubresource(desc)
    }

    fn descriptor(desc: &ResourceDescriptor) -> Option<&SubresourceDescriptor> {
        match desc {
            ResourceDescriptor::TextureSubresource(d) => Some(d),
            _ => None,
        }
    }

    fn wrap_concrete(resource: SubresourceBinding) -> ConcreteResource {
        ConcreteResource::TextureSubresource(resource)
    }

    fn concrete(resource: &ConcreteResource) -> Option<&SubresourceBinding> {
        match resource {
            ConcreteResource::TextureSubresource(s) => Some(s),
            _ => None,
        }
    }
}

impl Importable for TextureSubresource {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptor_is_valid() {
        let desc = ResourceDescriptor::Texture(TextureDescriptor::default());
        assert!(desc.validate("default").is_ok());
        assert_eq!(desc.kind(), ResourceKind::Texture);
    }

    #[test]
    fn test_zero_extent_is_invalid() {
        let desc = ResourceDescriptor::Texture(TextureDescriptor::new_2d(
            0,
            1080,
            TextureFormat::Rgba16Float,
        ));
        let err = desc.validate("hdr").unwrap_err();
        assert!(matches!(
            err,
            FrameGraphError::InvalidDescriptor { ref name, .. } if name == "hdr"
        ));
    }

    #[test]
    fn test_max_levels() {
        let desc = TextureDescriptor::new_2d(1920, 1080, TextureFormat::Rgba8Unorm);
        assert_eq!(desc.max_levels(), 11);
        assert_eq!(TextureDescriptor::default().max_levels(), 1);
    }

    #[test]
    fn test_too_many_levels_is_invalid() {
        let desc = TextureDescriptor::new_2d(4, 4, TextureFormat::Rgba8Unorm).with_levels(4);
        assert!(desc.validate().is_err());
        let desc = TextureDescriptor::new_2d(4, 4, TextureFormat::Rgba8Unorm).with_levels(3);
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_sampler_type_constraints() {
        let layered = TextureDescriptor::new_2d(64, 64, TextureFormat::Rgba8Unorm)
            .with_sampler_type(SamplerType::Sampler2d, 4);
        assert!(layered.validate().is_err());

        let array = TextureDescriptor::new_2d(64, 64, TextureFormat::Rgba8Unorm)
            .with_sampler_type(SamplerType::Sampler2dArray, 4);
        assert!(array.validate().is_ok());

        let cube = TextureDescriptor::new_2d(64, 32, TextureFormat::Rgba8Unorm)
            .with_sampler_type(SamplerType::SamplerCubemap, 1);
        assert!(cube.validate().is_err());

        let volume = TextureDescriptor::new_2d(16, 16, TextureFormat::Depth32Float)
            .with_sampler_type(SamplerType::Sampler3d, 16);
        assert!(volume.validate().is_err());
    }

    #[test]
    fn test_subresource_range() {
        let parent = TextureDescriptor::new_2d(256, 256, TextureFormat::Rgba8Unorm)
            .with_levels(4);
        assert!(SubresourceDescriptor::new(3, 0).validate_against(&parent).is_ok());
        assert!(SubresourceDescriptor::new(4, 0).validate_against(&parent).is_err());
        assert!(SubresourceDescriptor::new(0, 1).validate_against(&parent).is_err());

        let cube = TextureDescriptor::new_2d(128, 128, TextureFormat::Rgba16Float)
            .with_sampler_type(SamplerType::SamplerCubemap, 1);
        assert!(SubresourceDescriptor::new(0, 5).validate_against(&cube).is_ok());
    }

    #[test]
    fn test_format_queries() {
        assert!(TextureFormat::Depth24PlusStencil8.is_depth());
        assert!(TextureFormat::Depth24PlusStencil8.has_stencil());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(!TextureFormat::Rgba8Unorm.is_depth());
    }

    #[test]
    fn test_typed_projection() {
        let desc = Texture::wrap_descriptor(TextureDescriptor::default());
        assert!(Texture::descriptor(&desc).is_some());
        assert!(TextureSubresource::descriptor(&desc).is_none());

        let concrete = TextureSubresource::wrap_concrete(SubresourceBinding::RenderTarget(
            RenderTargetHandle::new(7),
        ));
        assert!(Texture::concrete(&concrete).is_none());
        assert_eq!(
            TextureSubresource::concrete(&concrete),
            Some(&SubresourceBinding::RenderTarget(RenderTargetHandle::new(7)))
        );
    }

    #[test]
    fn test_default_usage_is_sample() {
        assert_eq!(TextureUsage::default(), TextureUsage::SAMPLEABLE);
    }
}
