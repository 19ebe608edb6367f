use std::{
    env::args,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
    thread,
};

use anyhow::Context;
use env_logger::{Builder, Target};
use log::{error, info, warn};
use rkgralloc_config::{AllocatorConfig, ConfigWatcher, SharedConfig, find_config};
use rkgralloc_drm::{
    Allocator, DmaBufSync, DrmDevice, HandleQuery, NoSync, QueryValue, RockchipTransport,
    SystemTransport, install_default_driver, open_driver_device,
};
use rkgralloc_layout::AllocationResult;
use rkgralloc_shared::{BuiltinCatalog, GlobalArgs};

/// `--device` value that picks the first rockchip DRM node.
const AUTO_DEVICE: &str = "auto";

fn main() -> anyhow::Result<()> {
    let Some(global_args) = GlobalArgs::parse(args()) else {
        return Ok(());
    };

    init_logger(global_args.log_file.as_deref())?;

    run(&global_args).inspect_err(|err| error!("An error occurred: {err:#}"))
}

fn init_logger(log_file: Option<&str>) -> anyhow::Result<()> {
    let mut builder = Builder::from_default_env();
    match log_file {
        Some(path) => {
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .context("Failed to open log file")?;
            builder.target(Target::Pipe(Box::new(log_file)));
        }
        None => {
            builder.target(Target::Stderr);
        }
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{:<5}] {}: {}",
            record.level(),
            thread::current().name().unwrap_or("<unnamed>"),
            record.args()
        )
    });
    builder.init();

    Ok(())
}

fn run(args: &GlobalArgs) -> anyhow::Result<()> {
    let config_path = args.config.as_deref().map(PathBuf::from).or_else(find_config);
    let config = AllocatorConfig::load_or_default(config_path.as_deref())?;
    let device = args.device.clone().or_else(|| config.device.clone());
    let config: SharedConfig = Arc::new(RwLock::new(config));

    // Keeps the config current while a buffer is alive
    let _watcher = match &config_path {
        Some(path) => {
            let mut watcher = ConfigWatcher::new(config.clone())?;
            watcher.watch(path)?;
            Some(watcher)
        }
        None => None,
    };

    let allocator = create_allocator(device.as_deref(), config)?;
    install_default_driver(&allocator);

    let layout = allocator
        .layout(
            args.width,
            args.height,
            args.format,
            args.modifiers,
            args.usage,
        )
        .context("Failed to compute layout")?;
    print!("{}", describe_layout(&layout));

    if args.allocate {
        allocation_cycle(&allocator, args)?;
    }

    Ok(())
}

fn create_allocator(device: Option<&str>, config: SharedConfig) -> anyhow::Result<Arc<Allocator>> {
    let device = match device {
        None => {
            info!("No DRM device configured, allocating from system memory");
            return Ok(Allocator::new(
                Box::new(SystemTransport::new()),
                Box::new(NoSync),
                Box::new(BuiltinCatalog),
                config,
            ));
        }
        Some(AUTO_DEVICE) => open_driver_device("rockchip")?,
        Some(path) => DrmDevice::open(Path::new(path))?,
    };

    Ok(Allocator::new(
        Box::new(RockchipTransport::new(device)),
        Box::new(DmaBufSync),
        Box::new(BuiltinCatalog),
        config,
    ))
}

/// Allocates a buffer, touches it through a mapping, imports its export and frees both.
fn allocation_cycle(allocator: &Arc<Allocator>, args: &GlobalArgs) -> anyhow::Result<()> {
    let mut handle = allocator
        .allocate(
            args.width,
            args.height,
            args.format,
            args.modifiers,
            args.usage,
        )
        .context("Failed to allocate buffer")?;
    println!("allocated {handle:?}");

    match handle.map().context("Failed to map buffer")? {
        Some(pixels) => {
            let touched = pixels.iter().step_by(4096).filter(|&&b| b != 0).count();
            println!("mapped {} bytes, {touched} non-zero sampled bytes", pixels.len());
        }
        None => warn!("Buffer is protected and was not mapped"),
    }
    handle.unmap();

    if let QueryValue::Attributes(attributes) = handle.query(HandleQuery::Attributes) {
        println!("attributes {attributes:?}");
    }

    let exported = handle.export().context("Failed to export buffer")?;
    let imported = allocator
        .import(&exported)
        .context("Failed to import buffer")?;
    println!(
        "imported object {} ({} references)",
        imported.object(),
        allocator.registry().ref_count(imported.object())
    );

    allocator.free(imported);
    allocator.free(handle);
    println!("freed, {} live objects", allocator.registry().len());

    Ok(())
}

fn describe_layout(layout: &AllocationResult) -> String {
    let mut out = format!(
        "format {:?}, type {:?}, size {} bytes\n",
        layout.alloc_format, layout.alloc_type.primary, layout.size
    );
    out.push_str(&format!(
        "internal {}x{}, pixel stride {}, byte stride {}\n",
        layout.internal_width, layout.internal_height, layout.pixel_stride, layout.byte_stride
    ));
    for (index, plane) in layout.planes().iter().enumerate() {
        out.push_str(&format!(
            "plane {index}: offset {}, byte stride {}, {}x{}\n",
            plane.offset, plane.byte_stride, plane.alloc_width, plane.alloc_height
        ));
    }
    out
}
