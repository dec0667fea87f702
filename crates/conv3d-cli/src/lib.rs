//! conv3d-plan CLI library
//!
//! Argument definitions and command handlers for the `conv3d-plan` binary,
//! exposed here so they can be tested without spawning a process.

pub mod exit;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use conv3d_blockdim::{
    BlockDimDecision, BlockDimError, BlockDimRequest, SpatialSplit, decide_block_dim,
};
use conv3d_common::{
    AttributeDescriptor, DataType, FeatureMapFormat, OperandDescriptor, Padding3,
    PlatformDescriptor, PlatformPreset, ShapeDescriptor, Spatial3, WeightFormat,
};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "conv3d-plan")]
#[command(about = "Decide how a 3-D convolution is split across accelerator cores")]
#[command(version)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, value_name = "LEVEL", global = true, default_value = "warn")]
    pub log_level: String,

    /// Log line format
    #[arg(
        long,
        value_name = "FORMAT",
        global = true,
        value_enum,
        default_value_t = LogFormat::Compact
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Pretty,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decide the split mode and block dimensions of one convolution
    Decide(DecideArgs),
    /// Print the resolved platform description as TOML
    Platform(PlatformArgs),
}

/// Where the platform description comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct PlatformArgs {
    /// Built-in platform preset (ascend910b, ascend310p)
    #[arg(long, value_name = "NAME", conflicts_with = "platform")]
    pub preset: Option<PlatformPreset>,

    /// Platform TOML file
    #[arg(long, value_name = "PATH")]
    pub platform: Option<PathBuf>,
}

impl PlatformArgs {
    /// Load the platform, applying `CONV3D_PLATFORM_*` overrides.
    pub fn resolve(&self) -> Result<PlatformDescriptor> {
        if let Some(path) = &self.platform {
            return PlatformDescriptor::load(path)
                .with_context(|| format!("Failed to load platform file {}", path.display()));
        }
        let preset = self.preset.unwrap_or(PlatformPreset::Ascend910B);
        PlatformDescriptor::from_preset(preset)
            .with_context(|| format!("Failed to resolve platform preset {preset}"))
    }
}

/// One convolution, described by its input extents and attributes.
#[derive(Args, Debug, Clone)]
pub struct DecideArgs {
    #[arg(long, default_value_t = 1)]
    pub batch: u64,
    #[arg(long)]
    pub cin: u64,
    #[arg(long, default_value_t = 1)]
    pub din: u64,
    #[arg(long)]
    pub hin: u64,
    #[arg(long)]
    pub win: u64,
    #[arg(long)]
    pub cout: u64,
    #[arg(long, default_value_t = 1)]
    pub kd: u64,
    #[arg(long, default_value_t = 1)]
    pub kh: u64,
    #[arg(long, default_value_t = 1)]
    pub kw: u64,

    /// Stride as D,H,W
    #[arg(long, value_name = "D,H,W", value_parser = parse_spatial, default_value = "1,1,1")]
    pub stride: Spatial3,

    /// Dilation as D,H,W
    #[arg(long, value_name = "D,H,W", value_parser = parse_spatial, default_value = "1,1,1")]
    pub dilation: Spatial3,

    /// Padding: P, D,H,W (symmetric) or HEAD,TAIL,TOP,BOTTOM,LEFT,RIGHT
    #[arg(long, value_name = "PADS", value_parser = parse_padding, default_value = "0")]
    pub pad: Padding3,

    #[arg(long, default_value_t = 1)]
    pub groups: u64,

    /// The convolution adds a bias
    #[arg(long)]
    pub bias: bool,

    /// Element type of every operand
    #[arg(long, value_name = "DTYPE", default_value = "float16")]
    pub dtype: DataType,

    #[arg(long, value_name = "FORMAT", default_value = "NDC1HWC0")]
    pub fmap_format: FeatureMapFormat,

    #[arg(long, value_name = "FORMAT", default_value = "FRACTAL_Z_3D")]
    pub weight_format: WeightFormat,

    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Print the decision as JSON
    #[arg(long)]
    pub json: bool,
}

impl DecideArgs {
    /// Shape, attribute and operand descriptors for these arguments.
    pub fn descriptors(&self) -> (ShapeDescriptor, AttributeDescriptor, OperandDescriptor) {
        let attrs = AttributeDescriptor {
            stride: self.stride,
            dilation: self.dilation,
            pad: self.pad,
            groups: self.groups,
            has_bias: self.bias,
            ..AttributeDescriptor::default()
        };
        let shape = ShapeDescriptor::infer(
            self.batch,
            self.cin,
            Spatial3::new(self.din, self.hin, self.win),
            self.cout,
            Spatial3::new(self.kd, self.kh, self.kw),
            &attrs,
        );
        let operands = OperandDescriptor::uniform(self.dtype, self.fmap_format, self.weight_format);
        (shape, attrs, operands)
    }
}

/// Build the clap command, e.g. for completions or help rendering.
pub fn build_cli() -> clap::Command {
    Cli::command()
}

fn parse_u64_list(s: &str) -> Result<Vec<u64>, String> {
    s.split(',')
        .map(|part| part.trim().parse::<u64>().map_err(|e| format!("invalid value '{part}': {e}")))
        .collect()
}

/// Parse `D,H,W`.
pub fn parse_spatial(s: &str) -> Result<Spatial3, String> {
    match parse_u64_list(s)?.as_slice() {
        &[d, h, w] => Ok(Spatial3::new(d, h, w)),
        other => Err(format!("expected D,H,W, got {} values", other.len())),
    }
}

/// Parse `P`, `D,H,W` or `HEAD,TAIL,TOP,BOTTOM,LEFT,RIGHT`.
pub fn parse_padding(s: &str) -> Result<Padding3, String> {
    match parse_u64_list(s)?.as_slice() {
        &[p] => Ok(Padding3::symmetric(p, p, p)),
        &[d, h, w] => Ok(Padding3::symmetric(d, h, w)),
        &[head, tail, top, bottom, left, right] => {
            Ok(Padding3 { head, tail, top, bottom, left, right })
        }
        other => Err(format!("expected 1, 3 or 6 padding values, got {}", other.len())),
    }
}

/// Human-readable rendering of a decision.
pub fn render_text(decision: &BlockDimDecision) -> String {
    let w = decision.core_workload;
    let spatial = match w.spatial {
        SpatialSplit::Fused { m } => format!("m={m}"),
        SpatialSplit::Separate { ho, wo } => format!("ho={ho} wo={wo}"),
    };
    let mut text = String::new();
    text.push_str(&format!("mode: {}\n", decision.mode));
    text.push_str(&format!("partition: {}\n", decision.result.partition));
    text.push_str(&format!("cores: {}/{}\n", decision.used_cores(), decision.core_count));
    text.push_str(&format!("cost: {}\n", decision.result.min_cost));
    text.push_str(&format!(
        "per-core: batch={} group={} cout={} dout={} {spatial}\n",
        w.batch, w.group, w.cout, w.dout
    ));
    text.push_str(&format!("saturated: {}\n", if decision.saturated { "yes" } else { "no" }));
    text
}

/// Run `decide`, writing the result to `out`.
pub fn run_decide(args: &DecideArgs, out: &mut impl Write) -> Result<()> {
    let platform = args.platform.resolve()?;
    let (shape, attrs, operands) = args.descriptors();
    info!(
        batch = shape.batch,
        cin = shape.cin,
        cout = shape.cout,
        dout = shape.dout,
        hout = shape.hout,
        wout = shape.wout,
        cores = platform.core_count,
        "deciding block dimensions"
    );
    let decision = decide_block_dim(&BlockDimRequest::new(&shape, &attrs, &operands, &platform))
        .context("Block-dimension decision failed")?;

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&decision)?)?;
    } else {
        write!(out, "{}", render_text(&decision))?;
    }
    Ok(())
}

/// Run `platform`, writing the resolved TOML to `out`.
pub fn run_platform(args: &PlatformArgs, out: &mut impl Write) -> Result<()> {
    let platform = args.resolve()?;
    write!(out, "{}", platform.to_toml())?;
    Ok(())
}

/// Process exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<BlockDimError>() {
        Some(e) if e.is_infeasible() => exit::EXIT_INFEASIBLE,
        _ => exit::EXIT_GENERIC_FAIL,
    }
}
