/// Tests for the mock graphics device

use super::*;
use crate::graphics_device::{BufferUsage, TextureFormat, TextureUsage};

// ============================================================================
// Tests: Object creation
// ============================================================================

#[test]
fn test_mock_device_counts_creations() {
    let mut device = MockGraphicsDevice::new();
    let heap = device.create_heap(&HeapDesc { size: 65536, memory_type: Default::default() }, "heap").unwrap();
    let desc = TextureDesc::texture_2d(16, 16, TextureFormat::R8G8B8A8_UNORM, TextureUsage::RENDER_TARGET);
    let texture = device.create_texture(&desc, Some(&heap), "color").unwrap();
    let _buffer = device.create_buffer(&BufferDesc::raw(256, BufferUsage::STORAGE), None, "data").unwrap();
    let _fence = device.create_fence("fence").unwrap();

    assert_eq!(device.heaps_created, 1);
    assert_eq!(device.textures_created, 1);
    assert_eq!(device.buffers_created, 1);
    assert_eq!(device.fences_created, 1);
    assert_eq!(texture.name(), "color");
    assert_eq!(texture.desc(), &desc);
    assert_eq!(device.created_names, vec!["heap", "color", "data", "fence"]);
}

#[test]
fn test_mock_device_failure_mode() {
    let mut device = MockGraphicsDevice::new();
    device.fail_creation = true;
    assert!(device.create_fence("fence").is_err());
    assert_eq!(device.fences_created, 0);
}

#[test]
fn test_mock_device_frame_id() {
    let mut device = MockGraphicsDevice::new();
    assert_eq!(device.frame_id(), 0);
    device.advance_frame();
    device.advance_frame();
    assert_eq!(device.frame_id(), 2);
    device.set_frame_id(40);
    assert_eq!(device.frame_id(), 40);
}

#[test]
fn test_mock_allocation_size_is_aligned() {
    let device = MockGraphicsDevice::new();
    let small = TextureDesc::texture_2d(16, 16, TextureFormat::R8G8B8A8_UNORM, TextureUsage::empty());
    assert_eq!(device.texture_allocation_size(&small), MOCK_PLACEMENT_ALIGNMENT);

    let large = TextureDesc::texture_2d(256, 256, TextureFormat::R8G8B8A8_UNORM, TextureUsage::empty());
    assert_eq!(device.texture_allocation_size(&large), 256 * 1024);
}

#[test]
fn test_mock_descriptor_indices_are_unique() {
    let mut device = MockGraphicsDevice::new();
    let desc = TextureDesc::texture_2d(16, 16, TextureFormat::R8G8B8A8_UNORM, TextureUsage::SHADER_STORAGE);
    let texture = GpuResource::Texture(device.create_texture(&desc, None, "t").unwrap());
    let srv = device.create_shader_resource_view(&texture, &Default::default(), "t").unwrap();
    let uav = device.create_unordered_access_view(&texture, &Default::default(), "t").unwrap();
    assert_ne!(srv.heap_index(), uav.heap_index());
}

// ============================================================================
// Tests: Fence
// ============================================================================

#[test]
fn test_mock_fence_signal() {
    let fence = MockFence::new("queue");
    assert_eq!(fence.completed_value(), 0);
    fence.signal(7).unwrap();
    assert_eq!(fence.completed_value(), 7);
    assert!(fence.wait(7).is_ok());
}

// ============================================================================
// Tests: CommandList
// ============================================================================

#[test]
fn test_mock_command_list_records_barriers() {
    let mut device = MockGraphicsDevice::new();
    let desc = TextureDesc::texture_2d(16, 16, TextureFormat::R8G8B8A8_UNORM, TextureUsage::RENDER_TARGET);
    let texture = device.create_texture(&desc, None, "backbuffer").unwrap();

    let mut cmd = MockCommandList::new();
    cmd.begin().unwrap();
    cmd.texture_barrier(
        texture.as_ref(),
        0,
        ResourceAccessFlags::PRESENT,
        ResourceAccessFlags::RENDER_TARGET,
    ).unwrap();
    cmd.end().unwrap();

    assert_eq!(cmd.commands, vec![
        "begin",
        "texture_barrier backbuffer[0] PRESENT -> RENDER_TARGET",
        "end",
    ]);
}

#[test]
fn test_mock_command_list_records_combined_flags() {
    let mut cmd = MockCommandList::new();
    cmd.global_barrier(
        ResourceAccessFlags::PIXEL_SHADER_READ | ResourceAccessFlags::DISCARD,
        ResourceAccessFlags::empty(),
    ).unwrap();
    assert_eq!(cmd.commands[0], "global_barrier PIXEL_SHADER_READ | DISCARD -> NONE");
}

#[test]
fn test_mock_command_list_records_fences() {
    let fence: Arc<dyn Fence> = Arc::new(MockFence::new("compute"));
    let mut cmd = MockCommandList::new();
    cmd.wait(&fence, 3).unwrap();
    cmd.signal(&fence, 4).unwrap();
    assert_eq!(cmd.commands_starting_with("wait"), vec!["wait compute 3"]);
    assert_eq!(cmd.position("signal compute 4"), Some(1));
}
