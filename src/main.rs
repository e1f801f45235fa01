use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use finboard::cli::fields::FieldsOptions;
use finboard::cli::show::{ShowOptions, parse_filter};
use finboard::cli::widgets::NewWidget;
use finboard::core::format::ValueFormat;
use finboard::core::log::init_logging;
use finboard::core::provider::SeriesInterval;
use finboard::core::widget::{
    CardMode, CardSettings, ChartMode, ChartSettings, DEFAULT_SYMBOL, WidgetKind, WidgetPatch,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Table,
    Card,
    Chart,
}

#[derive(clap::Args)]
struct AddArgs {
    /// Widget type
    #[arg(value_enum)]
    kind: KindArg,
    /// Widget title
    #[arg(short, long, default_value = "")]
    title: String,
    /// Custom API endpoint
    #[arg(short, long)]
    endpoint: Option<String>,
    /// API key for this widget only
    #[arg(long)]
    api_key: Option<String>,
    /// Refresh interval in milliseconds
    #[arg(short, long)]
    refresh: Option<u64>,
    /// Field paths to display, comma separated
    #[arg(short, long, value_delimiter = ',')]
    fields: Option<Vec<String>>,
    /// Card content: watchlist, gainers, performance or financial
    #[arg(long)]
    card_mode: Option<CardMode>,
    /// Symbols for watchlist and financial cards, comma separated
    #[arg(long, value_delimiter = ',')]
    symbols: Option<Vec<String>>,
    /// Chart style: line or candle
    #[arg(long)]
    chart_mode: Option<ChartMode>,
    /// Chart interval: daily, weekly or monthly
    #[arg(long)]
    interval: Option<SeriesInterval>,
    /// Chart symbol
    #[arg(long)]
    symbol: Option<String>,
}

impl From<AddArgs> for NewWidget {
    fn from(args: AddArgs) -> NewWidget {
        let kind = match args.kind {
            KindArg::Table => WidgetKind::Table,
            KindArg::Card => WidgetKind::Card(CardSettings {
                mode: args.card_mode.unwrap_or_default(),
                symbols: args.symbols,
            }),
            KindArg::Chart => WidgetKind::Chart(ChartSettings {
                mode: args.chart_mode.unwrap_or_default(),
                interval: args.interval.unwrap_or_default(),
                symbol: args
                    .symbol
                    .map(|s| s.to_uppercase())
                    .unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
            }),
        };
        NewWidget {
            kind,
            title: args.title,
            endpoint: args.endpoint,
            api_key: args.api_key,
            refresh_interval_ms: args.refresh,
            fields: args.fields,
        }
    }
}

#[derive(clap::Args)]
struct UpdateArgs {
    /// Widget id or unique id prefix
    id: String,
    #[arg(short, long)]
    title: Option<String>,
    /// Custom API endpoint
    #[arg(short, long, conflicts_with = "clear_endpoint")]
    endpoint: Option<String>,
    /// Use the default data source again
    #[arg(long)]
    clear_endpoint: bool,
    #[arg(long)]
    api_key: Option<String>,
    /// Refresh interval in milliseconds
    #[arg(short, long, conflicts_with = "no_refresh")]
    refresh: Option<u64>,
    /// Disable automatic refresh
    #[arg(long)]
    no_refresh: bool,
    /// Field paths to display, comma separated
    #[arg(short, long, value_delimiter = ',')]
    fields: Option<Vec<String>>,
    #[arg(long)]
    card_mode: Option<CardMode>,
    #[arg(long, value_delimiter = ',')]
    symbols: Option<Vec<String>>,
    #[arg(long)]
    chart_mode: Option<ChartMode>,
    #[arg(long)]
    interval: Option<SeriesInterval>,
    #[arg(long)]
    symbol: Option<String>,
}

impl From<UpdateArgs> for finboard::AppCommand {
    fn from(args: UpdateArgs) -> finboard::AppCommand {
        let api_endpoint = if args.clear_endpoint {
            Some(None)
        } else {
            args.endpoint.map(Some)
        };
        let refresh_interval_ms = if args.no_refresh {
            Some(None)
        } else {
            args.refresh.map(Some)
        };
        let patch = WidgetPatch {
            title: args.title,
            api_endpoint,
            api_key: args.api_key.map(|k| Some(k).filter(|k| !k.is_empty())),
            refresh_interval_ms,
            selected_fields: args.fields.map(|f| Some(f).filter(|f| !f.is_empty())),
            chart_mode: args.chart_mode,
            chart_interval: args.interval,
            chart_symbol: args.symbol,
            card_mode: args.card_mode,
            card_symbols: args.symbols.map(Some),
            ..Default::default()
        };
        finboard::AppCommand::Update { id: args.id, patch }
    }
}

#[derive(clap::Args)]
struct ViewArgs {
    /// Search displayed table fields
    #[arg(short, long)]
    search: Option<String>,
    /// Column filter as field=value, repeatable
    #[arg(short, long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
    /// Field to sort tables by
    #[arg(long)]
    sort: Option<String>,
    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,
    /// Table page to show
    #[arg(short, long)]
    page: Option<usize>,
}

impl ViewArgs {
    fn into_options(self, widget: Option<String>) -> ShowOptions {
        ShowOptions {
            widget,
            search: self.search,
            filters: self.filters,
            sort: self.sort,
            descending: self.desc,
            page: self.page,
        }
    }
}

impl From<Commands> for finboard::AppCommand {
    fn from(cmd: Commands) -> finboard::AppCommand {
        match cmd {
            Commands::Add(args) => finboard::AppCommand::Add(args.into()),
            Commands::Remove { id } => finboard::AppCommand::Remove { id },
            Commands::Update(args) => args.into(),
            Commands::Move { from, to } => finboard::AppCommand::Move { from, to },
            Commands::Theme => finboard::AppCommand::Theme,
            Commands::List => finboard::AppCommand::List,
            Commands::Export { output } => finboard::AppCommand::Export { output },
            Commands::Import { input } => finboard::AppCommand::Import { input },
            Commands::Fields {
                id,
                endpoint,
                api_key,
                select,
            } => finboard::AppCommand::Fields {
                id,
                options: FieldsOptions {
                    endpoint,
                    api_key,
                    select,
                },
            },
            Commands::Show { id, view } => finboard::AppCommand::Show(view.into_options(id)),
            Commands::Watch {
                every,
                frames,
                view,
            } => finboard::AppCommand::Watch {
                options: view.into_options(None),
                redraw: Duration::from_secs(every.max(1)),
                frames,
            },
            Commands::Setup | Commands::Format { .. } => {
                unreachable!("Command should be handled separately")
            }
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Add a widget to the dashboard
    Add(AddArgs),
    /// Remove a widget
    Remove {
        /// Widget id or unique id prefix
        id: String,
    },
    /// Change widget settings
    Update(UpdateArgs),
    /// Move a widget from one position to another (1-based)
    Move { from: usize, to: usize },
    /// Toggle between light and dark theme
    Theme,
    /// List widgets in layout order
    List,
    /// Export the dashboard as JSON
    Export {
        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the dashboard with an exported JSON file
    Import { input: PathBuf },
    /// Preview available fields and select which ones a widget shows
    Fields {
        /// Widget id or unique id prefix
        id: String,
        /// Endpoint to preview instead of the widget's own
        #[arg(short, long)]
        endpoint: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        /// Save this comma separated field selection
        #[arg(short, long, value_delimiter = ',')]
        select: Option<Vec<String>>,
    },
    /// Fetch and display widgets once
    Show {
        /// Only this widget
        id: Option<String>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Keep widgets refreshing and redraw periodically
    Watch {
        /// Seconds between redraws
        #[arg(short, long, default_value_t = 5)]
        every: u64,
        /// Stop after this many redraws
        #[arg(long)]
        frames: Option<usize>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Format a value the way widgets display it
    Format {
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(short, long, default_value = "plain")]
        format: ValueFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => finboard::cli::setup::setup(),
        Some(Commands::Format { value, format }) => {
            println!("{}", format_arg(&value, format));
            Ok(())
        }
        Some(cmd) => finboard::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn format_arg(value: &str, format: ValueFormat) -> String {
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    finboard::core::format::format_value(Some(&value), format)
}
