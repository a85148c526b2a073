//! Integration tests for the frame graph through the public API
//!
//! A small deferred frame (G-buffer, async SSAO, lighting, tone mapping) is
//! built, compiled and replayed on the mock device over several frames.
//!
//! Run with: cargo test --test render_graph_integration_tests

use std::sync::{Arc, Mutex};
use galaxy_3d_frame_graph::galaxy3d::device::mock_graphics_device::{MockCommandList, MockGraphicsDevice};
use galaxy_3d_frame_graph::galaxy3d::device::{
    GraphicsDevice, LoadOp, ResourceAccessFlags, Texture, TextureDesc, TextureFormat, TextureUsage,
};
use galaxy_3d_frame_graph::galaxy3d::log::{LogSeverity, MemoryLogger, NullLogger};
use galaxy_3d_frame_graph::galaxy3d::render_graph::{
    DispatchAction, FullscreenAction, PassType, RenderGraph, RgBuilderFlag, RgHandle,
};
use galaxy_3d_frame_graph::galaxy3d::{RenderGraphConfig, RenderGraphContext};

const WIDTH: u32 = 128;
const HEIGHT: u32 = 128;

fn render_target(format: TextureFormat) -> TextureDesc {
    TextureDesc::texture_2d(WIDTH, HEIGHT, format, TextureUsage::RENDER_TARGET)
}

fn back_buffer(device: &Arc<Mutex<MockGraphicsDevice>>) -> Arc<dyn Texture> {
    device.lock().unwrap()
        .create_texture(&render_target(TextureFormat::B8G8R8A8_UNORM), None, "swapchain")
        .unwrap()
}

#[derive(Default, Clone)]
struct GBuffer {
    albedo: RgHandle,
    normal: RgHandle,
    depth: RgHandle,
}

/// Declare one deferred frame; "debug_overlay" is never presented
fn build_frame(graph: &mut RenderGraph, device: &Arc<Mutex<MockGraphicsDevice>>) {
    let bb = graph.import_texture(back_buffer(device), ResourceAccessFlags::PRESENT);

    let gbuffer = graph.add_pass::<GBuffer, _, _>(
        "gbuffer",
        PassType::Graphics,
        |data, builder| {
            let albedo = builder.create_texture(&render_target(TextureFormat::R8G8B8A8_UNORM), "albedo");
            let normal = builder.create_texture(&render_target(TextureFormat::R16G16B16A16_SFLOAT), "normal");
            let depth_desc = TextureDesc::texture_2d(WIDTH, HEIGHT, TextureFormat::D32_SFLOAT, TextureUsage::DEPTH_STENCIL);
            let depth = builder.create_texture(&depth_desc, "depth");

            data.albedo = builder.write_color(0, albedo, 0, LoadOp::Clear);
            data.normal = builder.write_color(1, normal, 0, LoadOp::Clear);
            data.depth = builder.write_depth(depth, 0, LoadOp::Clear, 1.0);
        },
        |_, ctx| ctx.command_list().draw(36, 0),
    );

    let mut ao = RgHandle::default();
    graph.add_pass_with_action(
        "ssao",
        PassType::AsyncCompute,
        |builder| {
            builder.read_default(gbuffer.depth, 0, RgBuilderFlag::None);
            builder.read_default(gbuffer.normal, 0, RgBuilderFlag::None);
            let desc = TextureDesc::texture_2d(WIDTH, HEIGHT, TextureFormat::R8_UNORM, TextureUsage::SHADER_STORAGE);
            let target = builder.create_texture(&desc, "ao");
            ao = builder.write_default(target, 0, RgBuilderFlag::None);
        },
        DispatchAction::new(WIDTH / 8, HEIGHT / 8, 1),
    );

    let mut hdr = RgHandle::default();
    graph.add_pass_with_action(
        "lighting",
        PassType::Graphics,
        |builder| {
            builder.read_default(gbuffer.albedo, 0, RgBuilderFlag::ShaderStagePs);
            builder.read_default(gbuffer.normal, 0, RgBuilderFlag::ShaderStagePs);
            builder.read_default(ao, 0, RgBuilderFlag::ShaderStagePs);
            let target = builder.create_texture(&render_target(TextureFormat::R16G16B16A16_SFLOAT), "hdr");
            hdr = builder.write_color(0, target, 0, LoadOp::DontCare);
        },
        FullscreenAction,
    );

    graph.add_pass_with_action(
        "debug_overlay",
        PassType::Graphics,
        |builder| {
            builder.read_default(gbuffer.normal, 0, RgBuilderFlag::ShaderStagePs);
            let target = builder.create_texture(&render_target(TextureFormat::R8G8B8A8_UNORM), "debug");
            builder.write_color(0, target, 0, LoadOp::Clear);
        },
        FullscreenAction,
    );

    let mut output = RgHandle::default();
    graph.add_pass_with_action(
        "tonemap",
        PassType::Graphics,
        |builder| {
            builder.read_default(hdr, 0, RgBuilderFlag::ShaderStagePs);
            output = builder.write_color(0, bb, 0, LoadOp::DontCare);
        },
        FullscreenAction,
    );
    graph.present(output, ResourceAccessFlags::PRESENT);
}

fn render(graph: &mut RenderGraph) -> (MockCommandList, MockCommandList) {
    let mut graphics = MockCommandList::new();
    let mut compute = MockCommandList::new();
    graph.compile().unwrap();
    graph.execute(&mut graphics, &mut compute).unwrap();
    (graphics, compute)
}

fn without_fences(commands: &[String]) -> Vec<String> {
    commands
        .iter()
        .filter(|c| !c.starts_with("wait ") && !c.starts_with("signal "))
        .cloned()
        .collect()
}

// ============================================================================
// DEFERRED FRAME TESTS
// ============================================================================

#[test]
fn test_integration_deferred_frame() {
    let device = MockGraphicsDevice::shared();
    let context = RenderGraphContext::new(device.clone()).with_logger(Arc::new(NullLogger));
    let mut graph = RenderGraph::new(&context).unwrap();
    build_frame(&mut graph, &device);

    let (graphics, compute) = render(&mut graph);

    assert!(graph.pass("debug_overlay").unwrap().is_culled(graph.dag()));
    for name in ["gbuffer", "ssao", "lighting", "tonemap"] {
        assert!(!graph.pass(name).unwrap().is_culled(graph.dag()), "{} was culled", name);
    }

    // Async compute is bracketed by the G-buffer and lighting passes
    let ssao = graph.pass("ssao").unwrap();
    assert_eq!(ssao.wait_graphics_pass(), Some(graph.pass("gbuffer").unwrap().node()));
    assert_eq!(ssao.signal_graphics_pass(), Some(graph.pass("lighting").unwrap().node()));
    assert_eq!(graph.pass("lighting").unwrap().wait_value(), Some(1));

    assert_eq!(graphics.commands_starting_with("begin_render_pass"), vec![
        "begin_render_pass color0=RGTexture albedo(Clear,Store) color1=RGTexture normal(Clear,Store) depth=RGTexture depth(Clear,Store,rw)",
        "begin_render_pass color0=RGTexture hdr(DontCare,Store)",
        "begin_render_pass color0=swapchain(DontCare,Store)",
    ]);
    assert_eq!(graphics.commands_starting_with("draw"), vec!["draw 36 0", "draw 3 0", "draw 3 0"]);
    assert_eq!(compute.commands_starting_with("dispatch"), vec!["dispatch 16 16 1"]);

    // G-buffer signal, then the lighting pass waits on SSAO
    let signal = graphics.position("signal RenderGraph::GraphicsQueueFence 1").unwrap();
    let wait = graphics.position("wait RenderGraph::ComputeQueueFence 1").unwrap();
    assert!(signal < wait);
    assert_eq!(
        graphics.commands.last().unwrap(),
        "texture_barrier swapchain[0] RENDER_TARGET -> PRESENT"
    );

    // The culled overlay never got memory
    let device = device.lock().unwrap();
    assert!(!device.created_names.iter().any(|n| n.contains("debug")));
}

#[test]
fn test_integration_steady_state_frames() {
    let device = MockGraphicsDevice::shared();
    let context = RenderGraphContext::new(device.clone()).with_logger(Arc::new(NullLogger));
    let mut graph = RenderGraph::new(&context).unwrap();

    let mut frames = Vec::new();
    let mut textures_after_first_frame = 0;
    for frame in 0..4 {
        build_frame(&mut graph, &device);
        let (graphics, compute) = render(&mut graph);
        frames.push((without_fences(&graphics.commands), without_fences(&compute.commands)));
        graph.clear().unwrap();
        device.lock().unwrap().advance_frame();

        if frame == 0 {
            textures_after_first_frame = device.lock().unwrap().textures_created;
        }
    }

    assert_eq!(frames[1], frames[2]);
    assert_eq!(frames[2], frames[3]);
    // Only a new swapchain image per frame, transients come from the pool
    assert_eq!(device.lock().unwrap().textures_created, textures_after_first_frame + 3);
    assert_eq!(graph.graphics_fence_value(), 4);
    assert_eq!(graph.compute_fence_value(), 4);
}

#[test]
fn test_integration_pool_released_after_idle_frames() {
    let device = MockGraphicsDevice::shared();
    let config = RenderGraphConfig {
        resource_retention_frames: 2,
        ..Default::default()
    };
    let context = RenderGraphContext::new(device.clone())
        .with_logger(Arc::new(NullLogger))
        .with_config(config);
    let mut graph = RenderGraph::new(&context).unwrap();

    build_frame(&mut graph, &device);
    render(&mut graph);
    graph.clear().unwrap();
    assert!(graph.resource_allocator().heap_count() > 0);

    for _ in 0..3 {
        device.lock().unwrap().advance_frame();
        graph.clear().unwrap();
    }
    assert_eq!(graph.resource_allocator().heap_count(), 0);
    assert_eq!(graph.resource_allocator().resource_count(), 0);
}

#[test]
fn test_integration_logging() {
    let device = MockGraphicsDevice::shared();
    let logger = Arc::new(MemoryLogger::new());
    let context = RenderGraphContext::new(device.clone()).with_logger(logger.clone());
    let mut graph = RenderGraph::new(&context).unwrap();
    build_frame(&mut graph, &device);
    render(&mut graph);

    assert!(logger.count(LogSeverity::Info) > 0);
    assert!(logger.contains("Allocated heap"));
    assert!(logger.contains("(1 culled)"));
    assert_eq!(logger.count(LogSeverity::Error), 0);
}

#[test]
fn test_integration_graphviz_export() {
    let device = MockGraphicsDevice::shared();
    let context = RenderGraphContext::new(device.clone()).with_logger(Arc::new(NullLogger));
    let mut graph = RenderGraph::new(&context).unwrap();
    build_frame(&mut graph, &device);
    graph.compile().unwrap();

    let dot = graph.export_graphviz();
    assert!(dot.contains("ssao\\nAsyncCompute"));
    assert!(dot.contains("debug_overlay\\nGraphics\", shape = box, style = dashed"));
    assert!(dot.trim_end().ends_with('}'));
}
