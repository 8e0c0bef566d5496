//! Convert a VTK XML file into a grid file

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use gridwrite::{
    ArrayEncoding, ContainerFormat, GhostLengthPolicy, IndexWidth, UnsupportedPolicy,
    WriteOptions,
};

#[derive(Parser)]
#[command(name = "gridwrite")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert VTK XML meshes into hierarchical grid files", long_about = None)]
struct Cli {
    /// input `.vtu`, `.vti`, `.vtr`, `.vts` or `.vtm` file
    input: PathBuf,

    /// grid file to create, replaced if it exists
    output: PathBuf,

    /// container written to `output`
    #[arg(long, value_enum, default_value_t = Format::Xml)]
    format: Format,

    /// encoding of numeric arrays in the xml container
    #[arg(long, value_enum, default_value_t = Encoding::Base64)]
    encoding: Encoding,

    /// width of the node ids in element connectivity
    #[arg(long, value_enum, default_value_t = Width::W64)]
    index_width: Width,

    /// write ghost cells as regular elements
    #[arg(long)]
    keep_ghost: bool,

    /// fail when a ghost array does not match the cell count
    #[arg(long)]
    strict_ghost: bool,

    /// drop cells with unsupported shapes instead of failing
    #[arg(long)]
    skip_unsupported: bool,

    #[arg(long, default_value = "Base")]
    base_name: String,

    #[arg(long, default_value = "Zone")]
    zone_prefix: String,

    /// do not write the `PointData` solution
    #[arg(long)]
    no_point_data: bool,

    /// do not write the `CellData` solution
    #[arg(long)]
    no_cell_data: bool,

    /// log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Xml,
    Binary,
}

#[derive(Clone, Copy, ValueEnum)]
enum Width {
    #[value(name = "32")]
    W32,
    #[value(name = "64")]
    W64,
}

#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    Ascii,
    Base64,
}

impl Cli {
    fn write_options(&self) -> WriteOptions {
        let format = match self.format {
            Format::Xml => ContainerFormat::Xml,
            Format::Binary => ContainerFormat::Binary,
        };
        let encoding = match self.encoding {
            Encoding::Ascii => ArrayEncoding::Ascii,
            Encoding::Base64 => ArrayEncoding::Base64,
        };
        let index_width = match self.index_width {
            Width::W32 => IndexWidth::I32,
            Width::W64 => IndexWidth::I64,
        };
        let ghost_length_policy = if self.strict_ghost {
            GhostLengthPolicy::Reject
        } else {
            GhostLengthPolicy::Ignore
        };
        let unsupported_policy = if self.skip_unsupported {
            UnsupportedPolicy::Skip
        } else {
            UnsupportedPolicy::Fail
        };

        WriteOptions::default()
            .with_format(format)
            .with_encoding(encoding)
            .with_index_width(index_width)
            .with_base_name(self.base_name.as_str())
            .with_zone_prefix(self.zone_prefix.as_str())
            .with_skip_ghost_cells(!self.keep_ghost)
            .with_ghost_length_policy(ghost_length_policy)
            .with_unsupported_policy(unsupported_policy)
            .with_point_data(!self.no_point_data)
            .with_cell_data(!self.no_cell_data)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let input = gridwrite::parse::read_data_object(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let summary = gridwrite::write_grid(&input, &cli.output, &cli.write_options())
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    for zone in &summary.zones {
        tracing::info!(
            "zone {}: {} elements in {} section(s), {} cell(s) dropped",
            zone.name,
            zone.element_count,
            zone.sections,
            zone.dropped_cells
        );
    }

    println!(
        "wrote {} zone(s) with {} element(s) to {}",
        summary.zone_count(),
        summary.element_count(),
        cli.output.display()
    );

    Ok(())
}
