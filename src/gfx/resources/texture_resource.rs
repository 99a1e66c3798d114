//! Texture resource management for wgpu
//!
//! Provides utilities for creating GPU textures, views and samplers: depth
//! buffers, shadow moment render targets, and image-backed 2D and cube
//! textures loaded from the asset directory.

use std::path::{Path, PathBuf};

use image::{
    error::{ParameterError, ParameterErrorKind},
    ImageError, RgbaImage,
};

use crate::{
    error::{Error, Result},
    gfx::scene::object::{ObjectKind, TextureSet},
};

/// Cube face file suffixes, in wgpu layer order.
const CUBE_FACE_SUFFIXES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

/// GPU texture resource containing texture, view, and sampler
///
/// Bundles the three main components needed for texture operations:
/// - Texture: The actual GPU memory allocation
/// - View: Interface for shader access
/// - Sampler: Filtering and addressing configuration
#[derive(Clone)]
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureResource {
    /// Standard depth buffer format used throughout the renderer
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Format of the shadow moment targets: depth in `r`, depth squared in `g`
    pub const MOMENTS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    /// Creates a depth texture of the given size.
    ///
    /// # Arguments
    /// * `device` - WGPU device for creating resources
    /// * `width`, `height` - Dimensions in pixels, matching the color target
    /// * `label` - Debug label for the texture
    pub fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Creates a square color render target that can also be sampled.
    ///
    /// Used for the shadow moment maps; sampling is linear and clamped so
    /// lookups outside the light frustum repeat the border moments.
    pub fn create_render_target(
        device: &wgpu::Device,
        size: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads an RGBA image as a 2D texture with repeat addressing.
    ///
    /// # Arguments
    /// * `srgb` - Whether texels are sRGB-encoded color (albedo) or linear data (normal maps)
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        srgb: bool,
        label: &str,
    ) -> Self {
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let (width, height) = image.dimensions();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_layer(queue, &texture, image, 0);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads six square faces (+X, -X, +Y, -Y, +Z, -Z) as a cube texture.
    pub fn cubemap_from_faces(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[RgbaImage; 6],
        label: &str,
    ) -> Self {
        let (size, _) = faces[0].dimensions();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (layer, face) in faces.iter().enumerate() {
            write_layer(queue, &texture, face, layer as u32);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{} View", label)),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, image: &RgbaImage, layer: u32) {
    let (width, height) = image.dimensions();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

/// Supplies the textures an object needs, by object name
///
/// Every object receives its [`TextureSet`] from a provider when its GPU
/// resources are created, so an object without textures cannot be drawn.
pub trait TextureProvider {
    fn texture_set(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        kind: ObjectKind,
    ) -> Result<TextureSet>;
}

/// Loads textures from image files in an asset directory
///
/// Standard objects use `<name>_texture_color.png` and
/// `<name>_texture_normal.png`, flipped vertically to match the mesh UVs.
/// Skyboxes use `<name>.png` with six faces stacked vertically, or six files
/// `<name>_px.png` .. `<name>_nz.png`.
pub struct ImageTextureProvider {
    root: PathBuf,
}

impl ImageTextureProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn open(&self, file_name: &str) -> Result<RgbaImage> {
        open_rgba(&self.root.join(file_name), file_name)
    }

    fn cube_faces(&self, name: &str) -> Result<[RgbaImage; 6]> {
        let stacked = self.root.join(format!("{}.png", name));
        if stacked.exists() {
            return split_stacked_faces(&open_rgba(&stacked, name)?, name);
        }

        let mut faces: Vec<RgbaImage> = Vec::with_capacity(6);
        for suffix in CUBE_FACE_SUFFIXES {
            faces.push(self.open(&format!("{}_{}.png", name, suffix))?);
        }
        let first = faces[0].dimensions();
        if first.0 != first.1 || faces.iter().any(|f| f.dimensions() != first) {
            return Err(dimension_error(name));
        }
        faces.try_into().map_err(|_| dimension_error(name))
    }
}

impl TextureProvider for ImageTextureProvider {
    fn texture_set(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        kind: ObjectKind,
    ) -> Result<TextureSet> {
        let set = match kind {
            ObjectKind::Standard => {
                let color = image::imageops::flip_vertical(
                    &self.open(&format!("{}_texture_color.png", name))?,
                );
                let normal = image::imageops::flip_vertical(
                    &self.open(&format!("{}_texture_normal.png", name))?,
                );
                TextureSet::Standard {
                    color: TextureResource::from_image(
                        device,
                        queue,
                        &color,
                        true,
                        &format!("{} Color", name),
                    ),
                    normal: TextureResource::from_image(
                        device,
                        queue,
                        &normal,
                        false,
                        &format!("{} Normal", name),
                    ),
                }
            }
            ObjectKind::Skybox => TextureSet::Skybox {
                cubemap: TextureResource::cubemap_from_faces(
                    device,
                    queue,
                    &self.cube_faces(name)?,
                    &format!("{} Cubemap", name),
                ),
            },
        };

        log::info!("Loaded {:?} textures for '{}'", kind, name);
        Ok(set)
    }
}

fn open_rgba(path: &Path, name: &str) -> Result<RgbaImage> {
    image::open(path)
        .map(|image| image.to_rgba8())
        .map_err(|source| Error::Texture {
            name: name.to_string(),
            source,
        })
}

fn dimension_error(name: &str) -> Error {
    Error::Texture {
        name: name.to_string(),
        source: ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        )),
    }
}

/// Splits a `w x 6w` image into its six square faces, top to bottom.
fn split_stacked_faces(image: &RgbaImage, name: &str) -> Result<[RgbaImage; 6]> {
    let (width, height) = image.dimensions();
    if width == 0 || height != width * 6 {
        return Err(dimension_error(name));
    }
    Ok(std::array::from_fn(|face| {
        image::imageops::crop_imm(image, 0, face as u32 * width, width, width).to_image()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_split_stacked_faces_in_order() {
        let image = RgbaImage::from_fn(2, 12, |_, y| Rgba([(y / 2) as u8, 0, 0, 255]));
        let faces = split_stacked_faces(&image, "sky").unwrap();
        for (index, face) in faces.iter().enumerate() {
            assert_eq!(face.dimensions(), (2, 2));
            assert_eq!(face.get_pixel(1, 1)[0], index as u8);
        }
    }

    #[test]
    fn test_split_stacked_faces_rejects_wrong_aspect() {
        let image = RgbaImage::new(4, 12);
        assert!(matches!(
            split_stacked_faces(&image, "sky"),
            Err(Error::Texture { .. })
        ));
    }

    #[test]
    fn test_missing_texture_names_the_object() {
        let err = open_rgba(Path::new("does/not/exist.png"), "dragon").unwrap_err();
        assert!(err.to_string().contains("dragon"));
    }
}
