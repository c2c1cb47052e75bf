use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use hevc_rtp::{Codec, HevcRtpError, ParameterSetMode, PayloaderConfig};

#[derive(Clone, Copy, ValueEnum)]
enum CodecArg {
    H264,
    H265,
}

impl From<CodecArg> for Codec {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::H264 => Codec::H264,
            CodecArg::H265 => Codec::H265,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "hevc-packetize",
    about = "Split an Annex B access unit into RTP payloads and report them"
)]
struct Args {
    /// Annex B file, payloaded as a single access unit
    input: PathBuf,

    /// Maximum payload size in bytes
    #[arg(long, short, default_value_t = hevc_rtp::config::DEFAULT_MTU)]
    mtu: usize,

    /// Codec of the bitstream
    #[arg(long, short, value_enum, default_value_t = CodecArg::H265)]
    codec: CodecArg,

    /// Aggregate parameter sets into one payload instead of sending each alone
    #[arg(long)]
    aggregate: bool,
}

/// Short label for a payload, read from its first header byte.
fn describe(codec: Codec, payload: &[u8]) -> String {
    let Some(&b0) = payload.first() else {
        return "empty".to_string();
    };
    match codec {
        Codec::H265 => {
            if b0 == hevc_rtp::media::h265::AGGREGATION_HEADER {
                return "aggregate".to_string();
            }
            let nal_type = hevc_rtp::media::h265::header::nal_type(b0);
            match (nal_type, payload.get(2)) {
                (49, Some(fu)) => format!(
                    "FU type={} start={} end={}",
                    fu & 0x3F,
                    fu & 0x80 != 0,
                    fu & 0x40 != 0
                ),
                _ => format!("NAL type={}", nal_type),
            }
        }
        Codec::H264 => match (b0 & 0x1f, payload.get(1)) {
            (24, _) => "STAP-A".to_string(),
            (28, Some(fu)) => format!(
                "FU-A type={} start={} end={}",
                fu & 0x1f,
                fu & 0x80 != 0,
                fu & 0x40 != 0
            ),
            (t, _) => format!("NAL type={}", t),
        },
    }
}

fn run(args: &Args) -> Result<(), HevcRtpError> {
    if args.mtu == 0 {
        return Err(HevcRtpError::InvalidMtu { mtu: args.mtu });
    }
    let access_unit = std::fs::read(&args.input)?;
    tracing::debug!(path = %args.input.display(), bytes = access_unit.len(), "input read");

    let codec = Codec::from(args.codec);
    let config = PayloaderConfig {
        aggregation: if args.aggregate {
            ParameterSetMode::Aggregate
        } else {
            ParameterSetMode::Standalone
        },
    };
    let mut payloader = codec.payloader(config);
    let payloads = payloader.payload(args.mtu, &access_unit);

    for (i, payload) in payloads.iter().enumerate() {
        println!("{:>5} {:>6}  {}", i, payload.len(), describe(codec, payload));
    }

    let stats = payloader.stats();
    println!(
        "{} payloads: single={} parameter_sets={} fragmented={} ({} fragments) aggregates={} dropped_aggregates={} mtu_too_small={}",
        payloads.len(),
        stats.single_nal,
        stats.parameter_sets,
        stats.fragmented_nals,
        stats.fragments,
        stats.aggregates_emitted,
        stats.aggregates_dropped,
        stats.mtu_too_small
    );
    if let Some(fmtp) = payloader.fmtp_parameters() {
        println!("a=fmtp:96 {}", fmtp);
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("hevc-packetize: {}", e);
            ExitCode::FAILURE
        }
    }
}
