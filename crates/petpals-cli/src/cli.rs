use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "petpals")]
#[command(about = "Client and visit records for a pet-sitting business")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to a JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage clients
    #[command(alias = "c")]
    Clients {
        #[command(subcommand)]
        command: ClientCommands,
    },
    /// Manage visits
    #[command(alias = "v")]
    Visits {
        #[command(subcommand)]
        command: VisitCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Show one page of clients
    #[command(alias = "ls")]
    List {
        /// Only clients whose pet name starts with this
        #[arg(short, long)]
        search: Option<String>,
        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Page through clients interactively (n/p/s <term>/r/q)
    Browse {
        /// Initial search term
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Create a client
    #[command(alias = "new")]
    Add {
        #[command(flatten)]
        fields: ClientFields,
    },
    /// Show one client
    Show {
        /// Client ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of a client
    Edit {
        /// Client ID
        id: String,
        #[command(flatten)]
        fields: ClientFields,
    },
    /// Delete a client and all of its visits
    #[command(alias = "rm")]
    Delete {
        /// Client ID
        id: String,
    },
    /// Create placeholder clients
    SeedDummy {
        /// Number of clients to create
        #[arg(default_value = "10")]
        count: usize,
    },
    /// Delete every placeholder client
    PurgeDummy,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ClientFields {
    #[arg(long)]
    pub customer_number: Option<String>,
    /// Owner name
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub pet_name: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub feeding_routine: Option<String>,
    #[arg(long)]
    pub health: Option<String>,
    #[arg(long)]
    pub other: Option<String>,
}

#[derive(Subcommand)]
pub enum VisitCommands {
    /// Show one page of visits, newest first
    #[command(alias = "ls")]
    List {
        /// Client ID, or `all` for every client
        client: String,
        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a visit
    #[command(alias = "new")]
    Add {
        /// Client ID
        client: String,
        /// Visit day (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        #[command(flatten)]
        fields: VisitFields,
    },
    /// Delete visits
    #[command(alias = "rm")]
    Delete {
        /// Visit IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Export a client's visits as a report
    Export {
        /// Client ID
        client: String,
        /// Export every visit of the client
        #[arg(long, conflicts_with_all = ["ids", "between"])]
        all: bool,
        /// Export these visits
        #[arg(long, num_args = 1.., value_name = "ID")]
        ids: Vec<String>,
        /// Export these two visits and every visit listed between them
        #[arg(long, num_args = 2, value_names = ["FROM", "TO"], conflicts_with = "ids")]
        between: Vec<String>,
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct VisitFields {
    /// Short title of the visit
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub liquid_intake: Option<String>,
    #[arg(long)]
    pub visitor_am: Option<String>,
    #[arg(long)]
    pub visitor_pm: Option<String>,
    #[arg(long)]
    pub notes_am: Option<String>,
    #[arg(long)]
    pub notes_pm: Option<String>,
    #[arg(long)]
    pub visual_check_am: Option<String>,
    #[arg(long)]
    pub visual_check_pm: Option<String>,
    #[arg(long)]
    pub food_intake_am: Option<String>,
    #[arg(long)]
    pub food_intake_pm: Option<String>,
    #[arg(long)]
    pub medication_am: Option<String>,
    #[arg(long)]
    pub medication_pm: Option<String>,
    #[arg(long)]
    pub security_check_am: Option<String>,
    #[arg(long)]
    pub security_check_pm: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}
