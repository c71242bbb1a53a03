//! Dissects hex encoded frames given on the command line and prints them as Json.
//!
//! All the frames share one session table, so they are treated as one capture:
//!
//! ```text
//! cargo run --example dissect_hex -- --link-type 101 4500...
//! ```

use clap::Parser;

use fathom::{Config, Frame, SessionTable, Timestamp};

#[derive(Parser, Debug)]
#[command(version, about = "Dissect hex encoded frames")]
struct Cli {
    /// libpcap link type of the frames.
    #[arg(short, long, default_value_t = fathom::ENCAP_TYPE_ETH)]
    link_type: fathom::EncapType,

    /// Skip the per layer attributes.
    #[arg(short, long)]
    quick: bool,

    /// Json configuration, e.g. '{"finder": {"precedence": "content_first"}}'.
    #[arg(short, long)]
    config: Option<String>,

    /// The frames, one hex string each.
    #[arg(required = true)]
    frames: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref json) => Config::from_json(json)?,
        None => Config::default(),
    };
    config.dissect.quick_parse |= cli.quick;
    let sessions = SessionTable::new(config.finder);

    for (i, frame) in cli.frames.iter().enumerate() {
        let bytes = hex::decode(frame)?;
        let frame = Frame::new(
            i as u64 + 1,
            bytes,
            Timestamp::default(),
            cli.link_type,
            config.dissect,
        );
        let nodes: Vec<_> = frame.packets(Some(&sessions)).collect();
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        for anomaly in frame.anomalies().entries() {
            eprintln!(
                "frame {}: [{}..={}] {}",
                anomaly.frame_number,
                anomaly.range.start(),
                anomaly.range.end(),
                anomaly.message
            );
        }
    }

    Ok(())
}
