/// Tests for ResourceAllocator
///
/// These tests validate heap creation, interval-based aliasing, slot reuse,
/// the output free list, descriptor memoization and frame GC.

use super::*;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{BufferUsage, TextureFormat};
use crate::log::NullLogger;

fn setup() -> (Arc<Mutex<MockGraphicsDevice>>, ResourceAllocator) {
    let device = MockGraphicsDevice::shared();
    let context = RenderGraphContext::new(device.clone()).with_logger(Arc::new(NullLogger));
    (device, ResourceAllocator::new(&context))
}

fn color_desc() -> TextureDesc {
    TextureDesc::texture_2d(64, 64, TextureFormat::R8G8B8A8_UNORM, TextureUsage::RENDER_TARGET)
}

// ============================================================================
// Tests: LifetimeRange
// ============================================================================

#[test]
fn test_lifetime_range_overlap() {
    let a = LifetimeRange::new(0, 3);
    assert!(a.is_overlapping(&LifetimeRange::new(3, 6)));
    assert!(a.is_overlapping(&LifetimeRange::new(1, 2)));
    assert!(!a.is_overlapping(&LifetimeRange::new(4, 6)));
    assert!(!LifetimeRange::UNUSED.is_overlapping(&a));
}

#[test]
fn test_lifetime_range_reset() {
    let mut range = LifetimeRange::new(2, 5);
    assert!(range.is_used());
    range.reset();
    assert!(!range.is_used());
    assert_eq!(range, LifetimeRange::default());
}

// ============================================================================
// Tests: Heap allocation
// ============================================================================

#[test]
fn test_first_allocation_creates_aligned_heap() {
    let (device, mut allocator) = setup();
    let allocated = allocator
        .allocate_texture(0, 2, ResourceAccessFlags::PIXEL_SHADER_READ, &color_desc(), "color")
        .unwrap();

    assert_eq!(allocator.heap_count(), 1);
    assert_eq!(allocator.resource_count(), 1);
    assert_eq!(allocator.total_heap_size(), 65536);
    assert_eq!(allocated.resource.name(), "RGTexture color");
    assert_eq!(allocated.initial_state, ResourceAccessFlags::RENDER_TARGET);

    let device = device.lock().unwrap();
    assert_eq!(device.heaps_created, 1);
    assert_eq!(device.created_names[0], "RG Heap 0.1 MB");
}

#[test]
fn test_overlapping_lifetimes_get_separate_heaps() {
    let (_device, mut allocator) = setup();
    let a = allocator
        .allocate_texture(0, 4, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "a")
        .unwrap();
    let b = allocator
        .allocate_texture(3, 6, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "b")
        .unwrap();

    assert_eq!(allocator.heap_count(), 2);
    assert_ne!(a.key, b.key);
    assert!(allocator.aliased_prev_resource(b.key, 3).is_none());
}

#[test]
fn test_disjoint_lifetimes_share_a_heap() {
    let (device, mut allocator) = setup();
    let a = allocator
        .allocate_texture(0, 2, ResourceAccessFlags::PIXEL_SHADER_READ, &color_desc(), "a")
        .unwrap();
    let b = allocator
        .allocate_texture(5, 8, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "b")
        .unwrap();

    assert_eq!(allocator.heap_count(), 1);
    assert_eq!(device.lock().unwrap().heaps_created, 1);
    assert_ne!(a.key, b.key);

    let (previous, state) = allocator.aliased_prev_resource(b.key, 5).unwrap();
    assert_eq!(previous.name(), "RGTexture a");
    assert_eq!(state, ResourceAccessFlags::PIXEL_SHADER_READ);

    // The previous occupant is now flagged as discarded
    let (_, state) = allocator.aliased_prev_resource(b.key, 5).unwrap();
    assert!(state.contains(ResourceAccessFlags::DISCARD));
}

#[test]
fn test_aliased_prev_resource_picks_latest_predecessor() {
    let (_device, mut allocator) = setup();
    allocator.allocate_texture(0, 1, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "a").unwrap();
    allocator.allocate_texture(2, 4, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "b").unwrap();
    let c = allocator
        .allocate_texture(6, 7, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "c")
        .unwrap();

    assert_eq!(allocator.heap_count(), 1);
    let (previous, _) = allocator.aliased_prev_resource(c.key, 6).unwrap();
    assert_eq!(previous.name(), "RGTexture b");
}

#[test]
fn test_large_allocation_grows_new_heap() {
    let (_device, mut allocator) = setup();
    allocator.allocate_texture(0, 1, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "small").unwrap();
    let large = TextureDesc::texture_2d(512, 512, TextureFormat::R8G8B8A8_UNORM, TextureUsage::RENDER_TARGET);
    allocator.allocate_texture(4, 5, ResourceAccessFlags::RENDER_TARGET, &large, "large").unwrap();

    assert_eq!(allocator.heap_count(), 2);
    assert_eq!(allocator.total_heap_size(), 65536 + 1024 * 1024);
}

#[test]
fn test_buffer_initial_state_is_discard() {
    let (_device, mut allocator) = setup();
    let desc = BufferDesc::structured(16, 64, BufferUsage::STORAGE);
    let allocated = allocator
        .allocate_buffer(0, 1, ResourceAccessFlags::COMPUTE_SHADER_STORAGE, &desc, "particles")
        .unwrap();

    assert_eq!(allocated.initial_state, ResourceAccessFlags::DISCARD);
    assert_eq!(allocated.resource.name(), "RGBuffer particles");
}

#[test]
fn test_inferred_initial_states() {
    let (_device, mut allocator) = setup();
    let depth = TextureDesc::texture_2d(64, 64, TextureFormat::D32_SFLOAT, TextureUsage::DEPTH_STENCIL);
    let storage = TextureDesc::texture_2d(64, 64, TextureFormat::R32_SFLOAT, TextureUsage::SHADER_STORAGE);

    let depth = allocator.allocate_texture(0, 1, ResourceAccessFlags::DEPTH_STENCIL_STORAGE, &depth, "depth").unwrap();
    let storage = allocator.allocate_texture(0, 1, ResourceAccessFlags::COMPUTE_SHADER_STORAGE, &storage, "storage").unwrap();

    assert_eq!(depth.initial_state, ResourceAccessFlags::MASK_DEPTH_STENCIL_ACCESS);
    assert_eq!(storage.initial_state, ResourceAccessFlags::MASK_SHADER_STORAGE);
}

// ============================================================================
// Tests: Reuse across frames
// ============================================================================

#[test]
fn test_freed_slot_is_reused_with_last_state() {
    let (device, mut allocator) = setup();
    let first = allocator
        .allocate_texture(0, 2, ResourceAccessFlags::PIXEL_SHADER_READ, &color_desc(), "a")
        .unwrap();
    allocator.free(first.key, ResourceAccessFlags::PIXEL_SHADER_READ, false).unwrap();
    allocator.reset().unwrap();

    let second = allocator
        .allocate_texture(0, 2, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "a")
        .unwrap();

    assert_eq!(first.key, second.key);
    assert_eq!(second.initial_state, ResourceAccessFlags::PIXEL_SHADER_READ);
    assert_eq!(device.lock().unwrap().textures_created, 1);
}

#[test]
fn test_freed_slot_with_other_desc_is_not_reused() {
    let (device, mut allocator) = setup();
    let first = allocator
        .allocate_texture(0, 2, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "a")
        .unwrap();
    allocator.free(first.key, ResourceAccessFlags::RENDER_TARGET, false).unwrap();

    let other = TextureDesc::texture_2d(32, 32, TextureFormat::R8G8B8A8_UNORM, TextureUsage::RENDER_TARGET);
    let second = allocator
        .allocate_texture(0, 2, ResourceAccessFlags::RENDER_TARGET, &other, "b")
        .unwrap();

    assert_ne!(first.key, second.key);
    assert_eq!(allocator.heap_count(), 1);
    assert_eq!(device.lock().unwrap().textures_created, 2);
}

#[test]
fn test_free_unknown_key_fails() {
    let (_device, mut allocator) = setup();
    let output = allocator.allocate_non_overlapping_texture(&color_desc(), "out").unwrap();
    assert!(allocator.free(output.key, ResourceAccessFlags::PRESENT, true).is_err());
}

#[test]
fn test_non_overlapping_free_list() {
    let (device, mut allocator) = setup();
    let first = allocator.allocate_non_overlapping_texture(&color_desc(), "output").unwrap();
    assert_eq!(allocator.heap_count(), 0);
    assert_eq!(first.initial_state, ResourceAccessFlags::RENDER_TARGET);

    allocator.free_non_overlapping(first.key, ResourceAccessFlags::PRESENT).unwrap();
    assert_eq!(allocator.free_output_count(), 1);

    let second = allocator.allocate_non_overlapping_texture(&color_desc(), "output").unwrap();
    assert_eq!(second.key, first.key);
    assert_eq!(second.initial_state, ResourceAccessFlags::PRESENT);
    assert_eq!(allocator.free_output_count(), 0);
    assert_eq!(device.lock().unwrap().textures_created, 1);
}

#[test]
fn test_non_overlapping_buffers() {
    let (_device, mut allocator) = setup();
    let desc = BufferDesc::raw(1024, BufferUsage::STORAGE);
    let first = allocator.allocate_non_overlapping_buffer(&desc, "readback").unwrap();
    allocator.free_non_overlapping(first.key, ResourceAccessFlags::TRANSFER_DST).unwrap();
    let second = allocator.allocate_non_overlapping_buffer(&desc, "readback").unwrap();

    assert_eq!(first.key, second.key);
    assert_eq!(second.initial_state, ResourceAccessFlags::TRANSFER_DST);
}

// ============================================================================
// Tests: Garbage collection
// ============================================================================

#[test]
fn test_reset_destroys_stale_resources_and_heaps() {
    let (device, mut allocator) = setup();
    let a = allocator
        .allocate_texture(0, 1, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "a")
        .unwrap();
    let out = allocator.allocate_non_overlapping_texture(&color_desc(), "out").unwrap();
    allocator.free(a.key, ResourceAccessFlags::RENDER_TARGET, false).unwrap();
    allocator.free_non_overlapping(out.key, ResourceAccessFlags::PRESENT).unwrap();

    device.lock().unwrap().set_frame_id(30);
    allocator.reset().unwrap();
    assert_eq!(allocator.resource_count(), 2);
    assert_eq!(allocator.heap_count(), 1);

    device.lock().unwrap().set_frame_id(31);
    allocator.reset().unwrap();
    assert_eq!(allocator.resource_count(), 0);
    assert_eq!(allocator.heap_count(), 0);
    assert_eq!(allocator.free_output_count(), 0);
}

#[test]
fn test_reset_keeps_resources_in_use() {
    let (device, mut allocator) = setup();
    allocator.allocate_texture(0, 1, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "a").unwrap();
    device.lock().unwrap().set_frame_id(100);
    allocator.reset().unwrap();
    assert_eq!(allocator.resource_count(), 1);
}

// ============================================================================
// Tests: Descriptors
// ============================================================================

#[test]
fn test_descriptor_views_are_memoized() {
    let (device, mut allocator) = setup();
    let a = allocator
        .allocate_texture(0, 1, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "a")
        .unwrap();

    let desc = ShaderResourceViewDesc::default();
    let first = allocator.shader_resource_view(a.key, &desc).unwrap();
    let second = allocator.shader_resource_view(a.key, &desc).unwrap();
    assert_eq!(first.heap_index(), second.heap_index());

    allocator.unordered_access_view(a.key, &UnorderedAccessViewDesc::default()).unwrap();
    assert_eq!(allocator.descriptor_count(), 2);

    let device = device.lock().unwrap();
    assert_eq!(device.shader_resource_views_created, 1);
    assert_eq!(device.unordered_access_views_created, 1);
}

#[test]
fn test_gc_drops_descriptor_views() {
    let (device, mut allocator) = setup();
    let a = allocator
        .allocate_texture(0, 1, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "a")
        .unwrap();
    allocator.shader_resource_view(a.key, &ShaderResourceViewDesc::default()).unwrap();
    allocator.free(a.key, ResourceAccessFlags::RENDER_TARGET, false).unwrap();

    device.lock().unwrap().set_frame_id(31);
    allocator.reset().unwrap();

    assert_eq!(allocator.descriptor_count(), 0);
    assert!(allocator.resource(a.key).is_err());
}

#[test]
fn test_device_failure_propagates() {
    let (device, mut allocator) = setup();
    device.lock().unwrap().fail_creation = true;
    let result = allocator.allocate_texture(0, 1, ResourceAccessFlags::RENDER_TARGET, &color_desc(), "a");
    assert!(result.is_err());
}
