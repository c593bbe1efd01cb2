use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use deskbook::api::bookings::{self, BookingFilter, BookingStatus, NewBooking};
use deskbook::api::email::{self, EmailVerification};
use deskbook::api::spaces::{self, SpaceDraft, SpaceFilter};
use deskbook::session::types::SignUpRequest;
use deskbook::{ApiError, ClientConfig, SessionError, SessionManager};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("not signed in; run `deskbook login` first")]
    NotSignedIn,
    #[error("invalid timestamp '{0}'; expected RFC 3339, e.g. 2026-03-01T10:00:00Z")]
    InvalidTimestamp(String),
    #[error("requested time overlaps booking {0}")]
    Conflict(i64),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "deskbook", about = "Coworking space booking client")]
struct Cli {
    #[arg(long, env = "DESKBOOK_API_URL")]
    api_url: String,

    #[arg(long, env = "DESKBOOK_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DESKBOOK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "DESKBOOK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Whoami,
    VerifyEmail {
        token: String,
    },
    Spaces(SpacesCommand),
    Bookings(BookingsCommand),
}

#[derive(Args, Debug)]
struct SpacesCommand {
    #[command(subcommand)]
    command: SpacesSubcommand,
}

#[derive(Subcommand, Debug)]
enum SpacesSubcommand {
    List {
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long)]
        min_capacity: Option<u32>,
        #[arg(long)]
        max_capacity: Option<u32>,
    },
    Show {
        space_id: i64,
    },
    Create {
        #[arg(long, help = "Space fields as a JSON object")]
        data: String,
    },
    Update {
        space_id: i64,
        #[arg(long, help = "Space fields as a JSON object")]
        data: String,
    },
    Delete {
        space_id: i64,
    },
}

#[derive(Args, Debug)]
struct BookingsCommand {
    #[command(subcommand)]
    command: BookingsSubcommand,
}

#[derive(Args, Debug)]
struct FilterArgs {
    #[arg(long)]
    status: Option<BookingStatus>,
    #[arg(long, help = "YYYY-MM-DD")]
    date: Option<String>,
    #[arg(long, help = "Earliest start time, HH:MM")]
    from: Option<String>,
    #[arg(long, help = "Latest start time, HH:MM")]
    to: Option<String>,
}

impl From<FilterArgs> for BookingFilter {
    fn from(args: FilterArgs) -> Self {
        Self { status: args.status, date: args.date, from_time: args.from, to_time: args.to }
    }
}

#[derive(Subcommand, Debug)]
enum BookingsSubcommand {
    Mine {
        #[command(flatten)]
        filter: FilterArgs,
    },
    ForSpace {
        space_id: i64,
    },
    Create {
        #[arg(long)]
        space_id: i64,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        comment: Option<String>,
    },
    Cancel {
        booking_id: i64,
    },
    All {
        #[command(flatten)]
        filter: FilterArgs,
    },
    SetStatus {
        booking_id: i64,
        status: BookingStatus,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to load .env");
        }
    }

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env_for(&cli.api_url)?;
    if let Some(path) = cli.token_file {
        config.token_file = path;
    }
    let session = SessionManager::from_config(config)?;
    session.initialize().await;

    match cli.command {
        Command::Login { email, password } => {
            let login = session.sign_in(&email, &password).await?;
            print_json(&login.user)
        }
        Command::Register { email, username, password } => {
            let created = session
                .sign_up(&SignUpRequest { email, username, password })
                .await?;
            print_json(&created)
        }
        Command::Logout => {
            session.sign_out();
            print_json(&serde_json::json!({ "signed_out": true }))
        }
        Command::Whoami => {
            let user = session.user().ok_or(CliError::NotSignedIn)?;
            print_json(&user)
        }
        Command::VerifyEmail { token } => {
            let outcome = email::verify_email(&session, &token).await?;
            print_json(&serde_json::json!({ "verified": outcome == EmailVerification::Verified }))
        }
        Command::Spaces(spaces) => run_spaces(&session, spaces.command).await,
        Command::Bookings(bookings) => run_bookings(&session, bookings.command).await,
    }
}

async fn run_spaces(session: &SessionManager, command: SpacesSubcommand) -> Result<(), CliError> {
    match command {
        SpacesSubcommand::List { min_price, max_price, min_capacity, max_capacity } => {
            let filter = SpaceFilter { min_price, max_price, min_capacity, max_capacity };
            let all = spaces::list_spaces(session).await?;
            print_json(&filter.apply(all))
        }
        SpacesSubcommand::Show { space_id } => print_json(&spaces::get_space(session, space_id).await?),
        SpacesSubcommand::Create { data } => {
            let draft = serde_json::from_str::<SpaceDraft>(&data)?;
            print_json(&spaces::create_space(session, &draft).await?)
        }
        SpacesSubcommand::Update { space_id, data } => {
            let draft = serde_json::from_str::<SpaceDraft>(&data)?;
            print_json(&spaces::update_space(session, space_id, &draft).await?)
        }
        SpacesSubcommand::Delete { space_id } => {
            spaces::delete_space(session, space_id).await?;
            print_json(&serde_json::json!({ "deleted": space_id }))
        }
    }
}

async fn run_bookings(session: &SessionManager, command: BookingsSubcommand) -> Result<(), CliError> {
    match command {
        BookingsSubcommand::Mine { filter } => {
            let mine = bookings::my_bookings(session).await?;
            print_json(&BookingFilter::from(filter).apply(mine))
        }
        BookingsSubcommand::ForSpace { space_id } => print_json(&bookings::space_bookings(session, space_id).await?),
        BookingsSubcommand::Create { space_id, start, end, comment } => {
            let mut request = NewBooking::new(space_id, parse_timestamp(&start)?, parse_timestamp(&end)?);
            if !request.is_valid_range() {
                return Err(ApiError::InvalidRange.into());
            }
            let space = spaces::get_space(session, space_id).await?;
            let taken = bookings::space_bookings(session, space_id).await?;
            if let Some(existing) = bookings::find_conflict(&taken, request.start_date, request.end_date) {
                return Err(CliError::Conflict(existing.id));
            }
            request.comment = comment;
            request.total_price = Some(bookings::quote(&space, request.start_date, request.end_date));
            print_json(&bookings::create_booking(session, &request).await?)
        }
        BookingsSubcommand::Cancel { booking_id } => {
            bookings::cancel_booking(session, booking_id).await?;
            print_json(&serde_json::json!({ "cancelled": booking_id }))
        }
        BookingsSubcommand::All { filter } => {
            let all = bookings::all_bookings(session).await?;
            print_json(&BookingFilter::from(filter).apply(all))
        }
        BookingsSubcommand::SetStatus { booking_id, status } => {
            bookings::set_booking_status(session, booking_id, &status).await?;
            print_json(&serde_json::json!({ "id": booking_id, "status": status }))
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, CliError> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|_| CliError::InvalidTimestamp(raw.to_owned()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
