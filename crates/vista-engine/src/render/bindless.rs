use std::num::NonZeroU32;

use anyhow::{Context, Result};

use crate::device::{GpuContext, GpuError, record_buffer_to_texture};
use crate::geometry::{MipLevel, generate_mip_chain};

use super::uniforms::FrameUniforms;

/// Index of a texture in the bindless array.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureId(pub u32);

impl TextureId {
    /// The 1x1 white placeholder, always present.
    pub const PLACEHOLDER: TextureId = TextureId(0);
}

/// Append-only index allocator behind the bindless table.
///
/// A texture's index is its append position and never changes for the life of
/// the registry. Index 0 is the placeholder. [`reset`](Self::reset) starts a
/// new epoch (used when the whole scene is cleared); indices are never
/// recycled within an epoch.
#[derive(Debug)]
pub struct TextureRegistry<T> {
    entries: Vec<T>,
    capacity: u32,
    generation: u64,
}

impl<T> TextureRegistry<T> {
    pub fn new(capacity: u32, placeholder: T) -> Self {
        Self {
            entries: vec![placeholder],
            capacity: capacity.max(1),
            generation: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of assigned indices, placeholder included.
    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bumped on every change to the set of entries.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Assigns the next index to `entry`.
    pub fn append(&mut self, entry: T) -> std::result::Result<TextureId, GpuError> {
        let index = self.len();
        if index >= self.capacity {
            return Err(GpuError::BindlessCapacity {
                capacity: self.capacity,
            });
        }
        self.entries.push(entry);
        self.generation += 1;
        Ok(TextureId(index))
    }

    pub fn get(&self, id: TextureId) -> Option<&T> {
        self.entries.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Drops everything but the placeholder.
    pub fn reset(&mut self) {
        self.entries.truncate(1);
        self.generation += 1;
    }
}

/// A sampled texture living in the bindless array.
pub struct Texture {
    /// Kept alive for the view.
    #[allow(dead_code)]
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub mip_level_count: u32,
}

/// Decoded RGBA8 image handed over by the model loader.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: rgba.to_vec(),
        }
    }
}

/// Registry generation each frame slot's bind group was built for.
///
/// A slot needs a rebuild when it has never been built, when the registry
/// changed since, or after [`invalidate`](Self::invalidate).
#[derive(Debug, Clone)]
pub struct SlotGenerations {
    built: Vec<Option<u64>>,
}

impl SlotGenerations {
    pub fn new(slots: usize) -> Self {
        Self {
            built: vec![None; slots.max(1)],
        }
    }

    pub fn len(&self) -> usize {
        self.built.len()
    }

    pub fn is_empty(&self) -> bool {
        self.built.is_empty()
    }

    /// True if `slot` must be rebuilt for `generation`. Records the slot as
    /// built for it.
    pub fn needs_rebuild(&mut self, slot: usize, generation: u64) -> bool {
        let built = &mut self.built[slot];
        if *built == Some(generation) {
            return false;
        }
        *built = Some(generation);
        true
    }

    pub fn invalidate(&mut self) {
        self.built.fill(None);
    }
}

/// One bind group layout exposing the frame uniforms and a sparsely populated
/// texture array, shared by every pipeline.
///
/// - binding 0: frame uniform buffer
/// - binding 1: `binding_array<texture_2d<f32>>`, partially bound
/// - binding 2: the shared sampler
///
/// wgpu bind groups are immutable, so publishing a new texture means building
/// a new bind group. Appends only mark slots stale; each frame slot rebuilds
/// its bind group at most once, right before it records.
pub struct BindlessTable {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    registry: TextureRegistry<Texture>,
    generations: SlotGenerations,
    bind_groups: Vec<Option<wgpu::BindGroup>>,
}

impl BindlessTable {
    /// Array length: the device's per-stage sampled texture limit, optionally capped.
    pub fn capacity_for(limits: &wgpu::Limits, cap: Option<u32>) -> u32 {
        let device_max = limits
            .max_sampled_textures_per_shader_stage
            .min(limits.max_binding_array_elements_per_shader_stage);
        cap.map_or(device_max, |c| c.min(device_max)).max(1)
    }

    pub fn new(ctx: &GpuContext, frames_in_flight: usize, cap: Option<u32>) -> Result<Self> {
        let capacity = Self::capacity_for(&ctx.limits(), cap);
        log::info!("bindless texture array: {capacity} slots");

        let layout = ctx
            .device()
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("vista bindless bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(FrameUniforms::SIZE),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: NonZeroU32::new(capacity),
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let sampler = ctx.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some("vista bindless sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let placeholder = upload_texture(ctx, "vista placeholder texture", &TextureImage::solid([255; 4]))?;

        let generations = SlotGenerations::new(frames_in_flight);
        let bind_groups = (0..generations.len()).map(|_| None).collect();

        Ok(Self {
            layout,
            sampler,
            registry: TextureRegistry::new(capacity, placeholder),
            generations,
            bind_groups,
        })
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn capacity(&self) -> u32 {
        self.registry.capacity()
    }

    /// Number of live textures, placeholder included.
    pub fn len(&self) -> u32 {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.registry.get(id)
    }

    /// Uploads `image` with a full mip chain and assigns it the next index.
    ///
    /// Running out of array slots is fatal for the load.
    pub fn append_texture(&mut self, ctx: &GpuContext, image: &TextureImage) -> Result<TextureId> {
        if self.registry.len() >= self.registry.capacity() {
            return Err(GpuError::BindlessCapacity {
                capacity: self.registry.capacity(),
            })
            .context("cannot load texture");
        }
        let label = format!("vista texture #{}", self.registry.len());
        let texture = upload_texture(ctx, &label, image)?;
        let id = self.registry.append(texture)?;
        log::debug!("texture {} bound at index {}", label, id.0);
        Ok(id)
    }

    /// Releases every texture except the placeholder. Indices restart at 1.
    pub fn clear(&mut self) {
        self.registry.reset();
        self.generations.invalidate();
        for group in &mut self.bind_groups {
            *group = None;
        }
    }

    /// Returns the bind group for `slot`, rebuilding it if textures changed
    /// since it was last built.
    ///
    /// Only call after the slot's fence has signalled.
    pub fn bind_group(
        &mut self,
        ctx: &GpuContext,
        slot: usize,
        uniforms: &wgpu::Buffer,
    ) -> &wgpu::BindGroup {
        let rebuild = self
            .generations
            .needs_rebuild(slot, self.registry.generation());
        let entry = &mut self.bind_groups[slot];
        if rebuild {
            *entry = None;
        }

        let registry = &self.registry;
        let layout = &self.layout;
        let sampler = &self.sampler;
        entry.get_or_insert_with(|| {
            let views: Vec<&wgpu::TextureView> = registry.iter().map(|t| &t.view).collect();
            ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("vista bindless bind group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureViewArray(&views),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        })
    }
}

/// Uploads an RGBA8 image and its mip chain in one synchronous submission.
fn upload_texture(ctx: &GpuContext, label: &str, image: &TextureImage) -> Result<Texture> {
    let levels = generate_mip_chain(image.width, image.height, &image.rgba);
    anyhow::ensure!(
        !levels.is_empty(),
        "texture '{label}' has {} bytes for {}x{}",
        image.rgba.len(),
        image.width,
        image.height
    );
    let mip_level_count = levels.len() as u32;

    let texture = ctx.create_texture(
        label,
        image.width,
        image.height,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        mip_level_count,
        1,
        wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    )?;

    let staging = levels
        .iter()
        .map(|level| ctx.create_staging_buffer(&format!("{label} staging"), &pad_rows(level)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut encoder = ctx.begin_single_time_commands();
    for (mip, (level, buffer)) in levels.iter().zip(&staging).enumerate() {
        record_buffer_to_texture(&mut encoder, buffer, &texture, level.width, level.height, mip as u32);
    }
    ctx.end_single_time_commands(encoder)
        .with_context(|| format!("uploading texture '{label}'"))?;

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok(Texture {
        texture,
        view,
        mip_level_count,
    })
}

/// Copies a level into rows padded to the texture copy alignment.
fn pad_rows(level: &MipLevel) -> Vec<u8> {
    let row = (level.width * 4) as usize;
    let padded = crate::device::padded_bytes_per_row(level.width, 4) as usize;
    let mut out = vec![0u8; padded * level.height as usize];
    for (src, dst) in level.rgba.chunks_exact(row).zip(out.chunks_exact_mut(padded)) {
        dst[..row].copy_from_slice(src);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── index stability ───────────────────────────────────────────────────

    #[test]
    fn nth_append_gets_index_n() {
        let mut reg = TextureRegistry::new(16, String::from("placeholder"));
        for i in 1..=5u32 {
            assert_eq!(reg.append(format!("tex{i}")), Ok(TextureId(i)));
        }
        assert_eq!(reg.get(TextureId::PLACEHOLDER).map(String::as_str), Some("placeholder"));
        assert_eq!(reg.get(TextureId(3)).map(String::as_str), Some("tex3"));
    }

    #[test]
    fn earlier_indices_do_not_move() {
        let mut reg = TextureRegistry::new(16, 0u32);
        let a = reg.append(10).unwrap();
        let b = reg.append(20).unwrap();
        let _ = reg.append(30).unwrap();
        assert_eq!(reg.get(a), Some(&10));
        assert_eq!(reg.get(b), Some(&20));
    }

    #[test]
    fn capacity_counts_the_placeholder() {
        let mut reg = TextureRegistry::new(3, 0u32);
        assert!(reg.append(1).is_ok());
        assert!(reg.append(2).is_ok());
        assert_eq!(reg.append(3), Err(GpuError::BindlessCapacity { capacity: 3 }));
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn reset_starts_a_new_epoch_after_the_placeholder() {
        let mut reg = TextureRegistry::new(8, 0u32);
        reg.append(1).unwrap();
        reg.append(2).unwrap();
        let before = reg.generation();
        reg.reset();
        assert_eq!(reg.len(), 1);
        assert!(reg.generation() > before);
        assert_eq!(reg.append(9), Ok(TextureId(1)));
    }

    #[test]
    fn append_bumps_generation() {
        let mut reg = TextureRegistry::new(8, 0u32);
        let g0 = reg.generation();
        reg.append(1).unwrap();
        assert_eq!(reg.generation(), g0 + 1);
    }

    // ── per-slot rebuild ──────────────────────────────────────────────────

    /// Slots that would rebuild if every slot recorded now.
    fn rebuilt(slots: &mut SlotGenerations, generation: u64) -> Vec<usize> {
        (0..slots.len())
            .filter(|&slot| slots.needs_rebuild(slot, generation))
            .collect()
    }

    #[test]
    fn every_slot_builds_once_at_start() {
        let reg = TextureRegistry::new(8, 0u32);
        let mut slots = SlotGenerations::new(2);
        assert_eq!(rebuilt(&mut slots, reg.generation()), vec![0, 1]);
        assert!(rebuilt(&mut slots, reg.generation()).is_empty());
    }

    #[test]
    fn append_rebuilds_each_slot_exactly_once() {
        let mut reg = TextureRegistry::new(8, 0u32);
        let mut slots = SlotGenerations::new(3);
        rebuilt(&mut slots, reg.generation());

        reg.append(1).unwrap();
        reg.append(2).unwrap();
        // Slot 0 records first, then the others on later frames.
        assert!(slots.needs_rebuild(0, reg.generation()));
        assert!(!slots.needs_rebuild(0, reg.generation()));
        assert_eq!(rebuilt(&mut slots, reg.generation()), vec![1, 2]);
        assert!(rebuilt(&mut slots, reg.generation()).is_empty());
    }

    #[test]
    fn up_to_date_slots_are_left_alone() {
        let mut reg = TextureRegistry::new(8, 0u32);
        let mut slots = SlotGenerations::new(2);
        rebuilt(&mut slots, reg.generation());
        reg.append(1).unwrap();
        assert!(slots.needs_rebuild(1, reg.generation()));

        assert_eq!(rebuilt(&mut slots, reg.generation()), vec![0]);
    }

    #[test]
    fn clear_forces_a_rebuild() {
        let mut reg = TextureRegistry::new(8, 0u32);
        let mut slots = SlotGenerations::new(2);
        reg.append(1).unwrap();
        rebuilt(&mut slots, reg.generation());

        // Invalidation alone is enough, even without a generation change.
        slots.invalidate();
        assert_eq!(rebuilt(&mut slots, reg.generation()), vec![0, 1]);

        reg.reset();
        slots.invalidate();
        assert_eq!(rebuilt(&mut slots, reg.generation()), vec![0, 1]);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn zero_slots_still_tracks_one() {
        assert_eq!(SlotGenerations::new(0).len(), 1);
    }

    // ── capacity ──────────────────────────────────────────────────────────

    #[test]
    fn capacity_uses_device_limit_and_optional_cap() {
        let limits = wgpu::Limits {
            max_sampled_textures_per_shader_stage: 1_000,
            max_binding_array_elements_per_shader_stage: 500_000,
            ..wgpu::Limits::default()
        };
        assert_eq!(BindlessTable::capacity_for(&limits, None), 1_000);
        assert_eq!(BindlessTable::capacity_for(&limits, Some(64)), 64);
        assert_eq!(BindlessTable::capacity_for(&limits, Some(5_000)), 1_000);
    }

    // ── row padding ───────────────────────────────────────────────────────

    #[test]
    fn pad_rows_places_each_row_at_aligned_offset() {
        let level = MipLevel {
            width: 2,
            height: 2,
            rgba: (0u8..16).collect(),
        };
        let out = pad_rows(&level);
        assert_eq!(out.len(), 512);
        assert_eq!(&out[0..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(&out[256..264], &[8, 9, 10, 11, 12, 13, 14, 15]);
        assert!(out[8..256].iter().all(|&b| b == 0));
    }
}
