use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;

use crystal_renderer::backend::headless::HeadlessContext;
use crystal_renderer::render::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};
use crystal_renderer::{
    Color, Dimension, HeadlessHost, Renderer, RendererConfig, SceneObject,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;

    let host = HeadlessHost::new();
    if let Some(id) = options.config.container_id.as_deref() {
        host.add_element(id);
    }
    let context = host.context();

    let mut renderer = Renderer::from_config(host.clone(), &options.config)
        .context("invalid renderer configuration")?;
    renderer.init().context("failed to initialize renderer")?;
    renderer
        .add_shaders(DEFAULT_VERTEX_SHADER, DEFAULT_FRAGMENT_SHADER)
        .context("failed to link default shaders")?;

    for object in demo_scene() {
        let name = object.name.clone();
        let id = renderer
            .add_object(Arc::new(object))
            .with_context(|| format!("failed to register {name}"))?;
        println!(" - {name} -> object {id}");
    }
    println!("Registered {} object(s)", renderer.object_count());

    for frame in 0..options.frames {
        if let Some(camera) = renderer.camera_mut() {
            camera.orbit(0.05, 0.0);
        }
        let draws = render_frame(&renderer, &context)
            .with_context(|| format!("frame {frame} failed"))?;
        println!("Frame {frame}: {draws} draw call(s)");
    }

    let origin = renderer.world_to_display(Vec3::ZERO)?;
    println!("Origin projects to ({}, {})", origin.x, origin.y);

    for canvas in host.canvases() {
        println!(
            "Surface {}x{} background {} in <{}>",
            canvas.width,
            canvas.height,
            canvas.background.to_css(),
            canvas.container.id.as_deref().unwrap_or(&canvas.container.tag)
        );
    }
    Ok(())
}

fn render_frame(renderer: &Renderer<HeadlessHost>, context: &HeadlessContext) -> Result<usize> {
    context.clear_commands();
    renderer.render()?;
    Ok(context.draw_calls().len())
}

fn demo_scene() -> Vec<SceneObject> {
    let quad = SceneObject::mesh(
        "quad",
        vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ],
    )
    .with_colors(vec![
        Color::rgb(1.0, 0.0, 0.0),
        Color::rgb(0.0, 1.0, 0.0),
        Color::rgb(0.0, 0.0, 1.0),
        Color::WHITE,
    ]);
    let triangle = SceneObject::mesh(
        "triangle",
        vec![
            Vec3::new(-0.5, -0.5, 1.0),
            Vec3::new(0.5, -0.5, 1.0),
            Vec3::new(0.0, 0.5, 1.0),
        ],
    )
    .with_color(Color::rgb(1.0, 0.6, 0.0));
    let ribbon = SceneObject::mesh(
        "ribbon",
        (0..6)
            .map(|i| Vec3::new(i as f32 * 0.4 - 1.0, (i % 2) as f32 * 0.3, -1.0))
            .collect::<Vec<_>>(),
    )
    .with_colors(vec![Color::BLACK; 2]);
    vec![quad, triangle, ribbon]
}

struct CliOptions {
    config: RendererConfig,
    frames: u32,
}

const USAGE: &str = "Usage: crystal-renderer [--config FILE.json] [--width N] [--height N] \
[--dimension 2|3] [--background #rrggbb[aa]] [--container ID] [--frames N]";

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut config = RendererConfig::default();
        let mut frames = 1;
        let mut args = args.into_iter();
        while let Some(flag) = args.next() {
            let mut value = || {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
            };
            match flag.as_str() {
                // Replaces everything parsed so far; later flags still override.
                "--config" => {
                    let path = value()?;
                    let source = fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {path}"))?;
                    config = RendererConfig::from_json(&source)?;
                }
                "--width" => config.width = value()?.parse().context("invalid --width")?,
                "--height" => config.height = value()?.parse().context("invalid --height")?,
                "--dimension" => {
                    let dimension: u8 = value()?.parse().context("invalid --dimension")?;
                    config.dimension = Dimension::try_from(dimension).map_err(|err| anyhow!(err))?;
                }
                "--background" => config.background = Color::from_hex(&value()?)?,
                "--container" => config.container_id = Some(value()?),
                "--frames" => frames = value()?.parse().context("invalid --frames")?,
                "--help" | "-h" => return Err(anyhow!(USAGE)),
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(Self { config, frames })
    }
}
