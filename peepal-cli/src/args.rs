use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI arguments for peepal
#[derive(Debug, Parser)]
#[command(
    name = "peepal",
    version,
    about = "Find, report and navigate to public toilets"
)]
pub(crate) struct CliArgs {
    /// JSON seed holding toilets and reviews; reports are written back to it
    #[arg(short = 's', long = "seed", env = "PEEPAL_SEED", global = true)]
    pub seed: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// A position given on the command line.
#[derive(Debug, Args)]
pub(crate) struct Position {
    /// Latitude in degrees
    #[arg(long = "lat", allow_hyphen_values = true)]
    pub latitude: String,

    /// Longitude in degrees
    #[arg(long = "lon", allow_hyphen_values = true)]
    pub longitude: String,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Toilets closest to a position
    Nearby {
        #[command(flatten)]
        position: Position,

        /// Search radius in kilometers (capped at 5)
        #[arg(short = 'r', long = "radius")]
        radius: Option<f64>,

        /// Maximum number of results
        #[arg(short = 'n', long = "limit")]
        limit: Option<usize>,
    },

    /// Search toilets by address
    Search {
        /// Address text
        query: String,

        #[command(flatten)]
        position: Position,

        /// Require (true) or refuse (false) wheelchair access
        #[arg(long = "handicap")]
        handicap: Option<bool>,

        /// Require (true) or refuse (false) a bidet
        #[arg(long = "bidet")]
        bidet: Option<bool>,

        /// Require (true) or refuse (false) a shower
        #[arg(long = "shower")]
        shower: Option<bool>,

        /// Require (true) or refuse (false) hand sanitiser
        #[arg(long = "sanitiser")]
        sanitiser: Option<bool>,
    },

    /// Show one toilet
    Details {
        /// Toilet id
        id: String,
    },

    /// Report a toilet listing
    ReportToilet {
        /// Toilet id
        id: String,
    },

    /// Report a review
    ReportReview {
        /// Review id
        id: String,
    },

    /// Walking route to a toilet
    Navigate {
        /// Toilet id
        id: String,

        #[command(flatten)]
        position: Position,
    },
}
