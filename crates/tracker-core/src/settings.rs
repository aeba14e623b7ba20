use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{Result, TrackerError};
use crate::month_year::TimezoneHandler;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Track recurring subscriptions and what they cost over time
#[derive(Parser, Debug, Clone)]
#[command(
    name = "subs-tracker",
    about = "Track recurring subscriptions and what they cost over time",
    version
)]
pub struct Settings {
    /// Directory holding subscription data (defaults to ~/.subs-tracker/data)
    #[arg(long, env = "SUBS_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Timezone used to resolve "now" (auto-detected if not specified)
    #[arg(long, env = "SUBS_TIMEZONE", default_value = "auto", global = true)]
    pub timezone: String,

    /// Logging level
    #[arg(
        long,
        env = "SUBS_LOG_LEVEL",
        default_value = "INFO",
        value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"],
        ignore_case = true,
        global = true
    )]
    pub log_level: String,

    /// Log file path
    #[arg(long, env = "SUBS_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations exposed by the binary.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Record a new subscription
    Add(AddArgs),
    /// Show one subscription
    Get {
        /// Subscription ID
        id: String,
    },
    /// List subscriptions with optional filters
    List(ListArgs),
    /// Change fields of an existing subscription
    Update(UpdateArgs),
    /// Remove a subscription
    Delete {
        /// Subscription ID
        id: String,
    },
    /// Total spend and active months for one user and service
    Summary(SummaryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Owner UUID
    #[arg(long)]
    pub user_id: String,

    /// Service name
    #[arg(long)]
    pub service_name: String,

    /// Monthly price
    #[arg(long, allow_hyphen_values = true)]
    pub price: i64,

    /// First active month (MM-YYYY)
    #[arg(long)]
    pub start_date: String,

    /// Last active month (MM-YYYY); omit for an ongoing subscription
    #[arg(long)]
    pub end_date: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only this user's subscriptions
    #[arg(long)]
    pub user_id: Option<String>,

    /// Only subscriptions to this service
    #[arg(long)]
    pub service_name: Option<String>,

    /// Page size
    #[arg(long)]
    pub limit: Option<usize>,

    /// Number of matches to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Sort key
    #[arg(long, default_value = "id", value_parser = ["id", "start_date", "price"])]
    pub sort_by: String,

    /// Sort in descending order
    #[arg(long)]
    pub desc: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Subscription ID
    pub id: String,

    /// New service name
    #[arg(long)]
    pub service_name: Option<String>,

    /// New monthly price
    #[arg(long, allow_hyphen_values = true)]
    pub price: Option<i64>,

    /// New first active month (MM-YYYY)
    #[arg(long)]
    pub start_date: Option<String>,

    /// New last active month (MM-YYYY); omit to make the subscription ongoing
    #[arg(long)]
    pub end_date: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    /// Owner UUID
    #[arg(long)]
    pub user_id: String,

    /// Service name
    #[arg(long)]
    pub service_name: String,

    /// Window start (MM-YYYY); omit for no lower bound
    #[arg(long)]
    pub from: Option<String>,

    /// Window end (MM-YYYY); omit for today
    #[arg(long)]
    pub to: Option<String>,

    /// Also print which subscription each month was charged to
    #[arg(long)]
    pub breakdown: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply derived values.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`Settings::load`] but with an explicit argument list, so tests
    /// can drive it without spawning a process.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    /// Apply `--debug` and normalise the level spelling.
    fn resolve(mut settings: Settings) -> Settings {
        settings.log_level = settings.log_level.to_uppercase();
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Reject values clap cannot check on its own. Currently only the
    /// timezone: anything but `auto` must be a known IANA name.
    pub fn validate(&self) -> Result<()> {
        if !self.timezone.eq_ignore_ascii_case("auto")
            && !TimezoneHandler::validate_timezone(&self.timezone)
        {
            return Err(TrackerError::Config(format!(
                "unknown timezone \"{}\"",
                self.timezone
            )));
        }
        Ok(())
    }

    /// The data directory, falling back to `~/.subs-tracker/data`.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| Self::app_dir().join("data"))
    }

    /// `~/.subs-tracker`, or `./.subs-tracker` when no home directory exists.
    pub fn app_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".subs-tracker")
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
