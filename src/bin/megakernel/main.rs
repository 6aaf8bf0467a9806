//! Megakernel CLI - render scenes with the CPU megakernel path tracer.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use megakernel::prelude::*;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Verbosity selected on the command line; `RUST_LOG` overrides it.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    fn filter(self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut verbosity = Verbosity::Info;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => verbosity = Verbosity::Debug,
            "-vv" | "--trace" => verbosity = Verbosity::Trace,
            "-q" | "--quiet" => verbosity = Verbosity::Quiet,
            _ => filtered_args.push(arg),
        }
    }

    let _trace_guard = init_tracing(verbosity);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "r" | "render" => cmd_render(&filtered_args[1..]),
        "p" | "params" => cmd_params(),
        "scene" => cmd_scene(),
        "-V" | "--version" | "version" => {
            print_version();
            Ok(())
        }
        "h" | "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Console logging, plus a Chrome trace in `trace.json` when `MEGAKERNEL_TRACE=1`.
fn init_tracing(verbosity: Verbosity) -> Option<tracing_chrome::FlushGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter()));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (chrome_layer, guard) = if env::var("MEGAKERNEL_TRACE").ok().as_deref() == Some("1") {
        let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new().file("trace.json").build();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(chrome_layer);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return None;
    }
    guard
}

fn print_version() {
    println!(
        "megakernel-cli {} (built {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("MEGAKERNEL_BUILD_DATE"),
        env!("MEGAKERNEL_BUILD_TIME")
    );
}

fn print_help() {
    println!("megakernel-cli - CPU megakernel path tracer");
    println!();
    println!("USAGE:");
    println!("    megakernel-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    r, render [RENDER OPTIONS]    Render a scene to .exr or .hdr");
    println!("    p, params                     Print default tracing parameters as JSON");
    println!("    scene                         Print the built-in Cornell box as scene JSON");
    println!("    version                       Show version and build date");
    println!("    h, help                       Show this help");
    println!();
    println!("RENDER OPTIONS:");
    println!("    -s, --scene <file>     Scene description (JSON)");
    println!("    --cornell              Built-in Cornell box (default without --scene)");
    println!("    -p, --params <file>    Tracing parameters (JSON, missing keys use defaults)");
    println!("    --spp <n>              Samples per pixel (overrides params)");
    println!("    --size <WxH>           Image size (default 256x256)");
    println!("    --frame <n>            Frame index, decorrelates random sequences");
    println!("    -o, --output <file>    Output image (default render.exr)");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only warnings and errors");
    println!();
    println!("EXAMPLES:");
    println!("    megakernel-cli render --cornell --spp 64 -o cornell.exr");
    println!("    megakernel-cli params > params.json");
    println!("    megakernel-cli render -s room.json -p params.json --size 640x360");
    println!();
    println!("NOTES:");
    println!("    - RUST_LOG overrides -v/-q");
    println!("    - MEGAKERNEL_TRACE=1 writes a Chrome trace to trace.json");
}

struct RenderOptions {
    scene: Option<PathBuf>,
    cornell: bool,
    params: Option<PathBuf>,
    spp: Option<u32>,
    width: u32,
    height: u32,
    frame: u32,
    output: PathBuf,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scene: None,
            cornell: false,
            params: None,
            spp: None,
            width: 256,
            height: 256,
            frame: 0,
            output: PathBuf::from("render.exr"),
        }
    }
}

impl RenderOptions {
    fn parse(args: &[&str]) -> Result<Self> {
        let mut opts = Self::default();
        let mut it = args.iter().copied();
        while let Some(arg) = it.next() {
            let mut value = || it.next().with_context(|| format!("missing value for {arg}"));
            match arg {
                "-s" | "--scene" => opts.scene = Some(PathBuf::from(value()?)),
                "--cornell" => opts.cornell = true,
                "-p" | "--params" => opts.params = Some(PathBuf::from(value()?)),
                "--spp" => opts.spp = Some(value()?.parse().context("--spp expects an integer")?),
                "--size" => (opts.width, opts.height) = parse_size(value()?)?,
                "--frame" => opts.frame = value()?.parse().context("--frame expects an integer")?,
                "-o" | "--output" => opts.output = PathBuf::from(value()?),
                other => bail!("unknown render option: {other}"),
            }
        }
        if opts.cornell && opts.scene.is_some() {
            bail!("--scene and --cornell are mutually exclusive");
        }
        Ok(opts)
    }
}

/// Parse `WxH`.
fn parse_size(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("size must look like 640x480, got '{s}'"))?;
    let w: u32 = w.trim().parse().with_context(|| format!("bad width in '{s}'"))?;
    let h: u32 = h.trim().parse().with_context(|| format!("bad height in '{s}'"))?;
    if w == 0 || h == 0 {
        bail!("image size must be non-zero, got {w}x{h}");
    }
    Ok((w, h))
}

fn cmd_render(args: &[&str]) -> Result<()> {
    let opts = RenderOptions::parse(args)?;

    let mut params = match &opts.params {
        Some(path) => PathTracerParams::from_json_file(path)
            .with_context(|| format!("loading params {}", path.display()))?,
        None => PathTracerParams::default(),
    };
    if let Some(spp) = opts.spp {
        params.samples_per_pixel = spp;
    }
    params.validate()?;

    let desc = match &opts.scene {
        Some(path) => SceneDesc::from_json_file(path).with_context(|| format!("loading scene {}", path.display()))?,
        None => SceneDesc::cornell_box(),
    };
    let (scene, env) = desc.build()?;
    tracing::info!(
        triangles = scene.triangles().len(),
        materials = scene.materials().len(),
        lights = scene.lights().len(),
        env = env.is_some(),
        "scene ready"
    );

    let renderer = Renderer::new(scene, env, params)?;
    let frame = renderer.render(&desc.camera, opts.width, opts.height, opts.frame);
    frame
        .save(&opts.output)
        .with_context(|| format!("writing {}", opts.output.display()))?;

    let mean = frame.mean();
    println!(
        "Wrote {} ({}x{}, {} spp, mean {:.4} {:.4} {:.4}, {} rays)",
        opts.output.display(),
        frame.width,
        frame.height,
        renderer.params().samples_per_pixel,
        mean.x,
        mean.y,
        mean.z,
        frame.counts.total()
    );
    Ok(())
}

fn cmd_params() -> Result<()> {
    println!("{}", PathTracerParams::default().to_json()?);
    Ok(())
}

fn cmd_scene() -> Result<()> {
    println!("{}", SceneDesc::cornell_box().to_json()?);
    Ok(())
}
