use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find follow-up videos in the same series as a seed video.
    Resolve {
        /// Video URL (watch/shorts/youtu.be/embed) or bare video id
        reference: String,
    },

    /// Record a relevance judgment for a suggested video.
    Feedback {
        /// Candidate video id the judgment applies to
        video_id: String,

        /// The video does belong to the series
        #[clap(long, conflicts_with = "down")]
        up: bool,

        /// The video does not belong to the series
        #[clap(long)]
        down: bool,

        /// Candidate title, for logging context
        #[clap(short, long, default_value = "")]
        title: String,

        /// Seed video id this judgment refers to
        #[clap(short, long)]
        seed: Option<String>,
    },

    /// Show the feedback state for a video id.
    Status {
        video_id: String,
    },

    /// Aggregate feedback statistics.
    Stats {},

    /// Store a video in the reference corpus.
    Add {
        /// Video URL or bare video id
        reference: String,
    },

    /// Re-embed low-quality corpus records.
    Repair {
        /// Maximum number of records to scan
        #[clap(short, long, default_value = "50")]
        limit: usize,
    },
}
