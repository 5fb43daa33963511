/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use keyhunt_tracker::{CreationPolicy, OrientationMode};
use url::Url;

#[derive(Parser, Debug)]
#[clap(name = "keyhunt-cli")]
pub struct Opt {
    #[clap(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Replay scripted marker detections through a tracking session.
    Replay(Replay),

    /// Fetch a channel token from the token service.
    Token(TokenArgs),
}

#[derive(Args, Debug, Clone)]
pub struct Replay {
    /// JSON lines file, one detection frame per line:
    /// {"width":640,"height":480,"markers":[{"id":42,"corners":[[x,y],[x,y],[x,y],[x,y]]}]}
    #[clap(long = "script")]
    pub script: PathBuf,

    /// Directory of image frames. The n-th file (sorted by name) backs the
    /// n-th script line. Blank frames are used when omitted.
    #[clap(long = "frames")]
    pub frames: Option<PathBuf>,

    /// Marker ids that carry a key. Riddle ids follow list order.
    #[clap(long = "markers", value_delimiter = ',')]
    pub markers: Option<Vec<u32>>,

    #[clap(long = "policy", value_enum)]
    pub policy: Option<PolicyArg>,

    #[clap(long = "orientation", value_enum)]
    pub orientation: Option<OrientationArg>,

    /// Tracker config JSON. Flags above override it.
    #[clap(long = "config")]
    pub config: Option<PathBuf>,

    /// Riddle JSON. The built-in riddles are used if it cannot be read.
    #[clap(long = "riddles")]
    pub riddles: Option<PathBuf>,

    /// Detection poll period in milliseconds.
    #[clap(long = "poll-ms")]
    pub poll_ms: Option<u64>,

    /// Answer each targeted key's riddle correctly as soon as it opens.
    #[clap(long = "collect")]
    pub collect: bool,

    /// Keep the session running this long after the last frame.
    #[clap(long = "hold-ms", default_value_t = 0)]
    pub hold_ms: u64,

    /// Also log every render change.
    #[clap(long = "trace-render")]
    pub trace_render: bool,

    /// Binary glTF key model for --trace-render. The placeholder key is used
    /// if it does not load.
    #[clap(long = "model")]
    pub model: Option<PathBuf>,

    /// Print the report as JSON.
    #[clap(long = "json")]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyArg {
    Strict,
    Lazy,
}

impl From<PolicyArg> for CreationPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => CreationPolicy::Strict,
            PolicyArg::Lazy => CreationPolicy::Lazy,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationArg {
    Pose,
    Upright,
}

impl From<OrientationArg> for OrientationMode {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Pose => OrientationMode::Pose,
            OrientationArg::Upright => OrientationMode::Upright,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    /// Base URL of the token service.
    #[clap(long = "url", default_value = "http://localhost:8081")]
    pub url: Url,

    #[clap(long = "channel")]
    pub channel: String,

    /// Numeric user id. The service picks one when omitted.
    #[clap(long = "uid")]
    pub uid: Option<u32>,

    #[clap(long = "role", value_enum, default_value = "audience")]
    pub role: RoleArg,

    /// Keep running and refresh the token before it expires.
    #[clap(long = "watch")]
    pub watch: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleArg {
    Host,
    Audience,
}

impl RoleArg {
    pub fn as_query(self) -> &'static str {
        match self {
            RoleArg::Host => "host",
            RoleArg::Audience => "audience",
        }
    }
}
