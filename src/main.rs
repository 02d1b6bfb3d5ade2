use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use campus_roster::config::{PortalConfig, SourceKind};
use campus_roster::fixture;
use campus_roster::logging;
use campus_roster::models::{
    AssignmentRecord, FeeRecord, FeeSummary, NotificationDraft, NotificationKind, Priority, StudentId, StudentRecord,
};
use campus_roster::notify::Composer;
use campus_roster::report::{self, ReportInput};
use campus_roster::session::{Role, Session};
use campus_roster::target::TargetMode;
use campus_roster::view::Fetched;
use campus_roster::{
    BranchId, Choice, DataSource, FilterState, PortalSource, RemoteDataSource, RosterView, SectionId, YearId,
};

#[derive(Parser)]
#[command(name = "campus-roster")]
#[command(about = "Cascading class roster and notifications for the college portal", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Backend base URL (overrides CAMPUS_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Bearer token (overrides CAMPUS_ACCESS_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,
    /// remote or fixture (overrides CAMPUS_DATA_SOURCE)
    #[arg(long, global = true)]
    source: Option<SourceKind>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy, Debug)]
struct FilterArgs {
    /// Year: 1-4, "4th Year" or "all"
    #[arg(long, default_value = "all")]
    year: Choice<YearId>,
    /// Branch: 1-7, a code such as CSE, or "all"
    #[arg(long, default_value = "all")]
    branch: Choice<BranchId>,
    /// Section: 1-3, a letter, or "all"
    #[arg(long, default_value = "all")]
    section: Choice<SectionId>,
}

impl From<FilterArgs> for FilterState {
    fn from(args: FilterArgs) -> Self {
        FilterState::new(args.year, args.branch, args.section)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Broadcast,
    Class,
    Student,
    FeePending,
}

#[derive(Subcommand)]
enum Commands {
    /// List the roster under the cascading filter
    Students {
        #[command(flatten)]
        filters: FilterArgs,
        /// Show details for one student
        #[arg(long)]
        focus: Option<u64>,
        /// Use the demo roster instead of the backend
        #[arg(long)]
        fixture: bool,
    },
    /// Show the selectable years, branches and sections
    Options {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Fee positions and totals
    Fees {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Pending assignment submissions
    Assignments {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Send a notification
    Notify {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long = "type", default_value = "general")]
        kind: NotificationKind,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long, value_enum, default_value = "class")]
        mode: ModeArg,
        /// Recipient for --mode student
        #[arg(long, required_if_eq("mode", "student"))]
        student: Option<u64>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// List notifications
    Notifications,
    /// Generate a markdown roster report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "roster.md")]
        out: PathBuf,
    },
    /// Export the filtered roster as CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "roster.csv")]
        out: PathBuf,
    },
    /// Log in and print the issued tokens (password from CAMPUS_PASSWORD)
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "management")]
        role: Role,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<PortalConfig> {
    let mut config = PortalConfig::from_env().context("invalid CAMPUS_* environment")?;
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.access_token = Some(token.clone());
    }
    if let Some(source) = cli.source {
        config.source = source;
    }
    Ok(config)
}

const STILL_LOADING: &str = "roster is still loading";

fn session_for(config: &PortalConfig) -> Session {
    match &config.access_token {
        Some(token) => Session::with_token(token.clone()),
        None => Session::new(),
    }
}

/// Load the full roster and apply `filters` through the cascade.
async fn load_students(source: &PortalSource, filters: FilterState) -> RosterView<StudentRecord> {
    let view = RosterView::new(fixture::demo_students());
    let _ = view.load(source.list_students(&FilterState::default())).await;
    let reset = view.update(|cascade| cascade.select(filters)).unwrap_or_default();
    for dimension in reset {
        println!("Selected {dimension} is not available for this roster; showing all.");
    }
    view
}

/// Fee records for `filters`, falling back to demo data when the fetch fails.
async fn load_fees(source: &PortalSource, filters: &FilterState) -> Fetched<Vec<FeeRecord>> {
    Fetched::fetch("fee records", source.list_fee_records(filters), || {
        fixture::demo_fees().into_iter().filter(|r| r.in_class(filters)).collect()
    })
    .await
}

fn print_banner(view_banner: Option<&str>) {
    if let Some(banner) = view_banner {
        println!("[{banner}]");
    }
}

fn print_student(student: &StudentRecord) {
    println!(
        "- {} ({}, {}) {} {} Section {}",
        student.name,
        student.roll_no,
        student.email,
        student.year.label(),
        student.branch.code(),
        student.section.letter()
    );
}

fn print_assignment(record: &AssignmentRecord) {
    let submitted = record
        .submitted_at
        .map_or_else(|| "not submitted".to_string(), |d| format!("submitted {d}"));
    println!(
        "- #{} {} ({}) {} {}",
        record.assignment_id, record.student_name, record.student_roll_no, record.course_id, submitted
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(logging::level_for(cli.verbose, cli.quiet))?;

    let mut config = load_config(&cli)?;
    if let Commands::Students { fixture: true, .. } = cli.command {
        config.source = SourceKind::Fixture;
    }
    let session = session_for(&config);

    if let Commands::Login { email, role } = &cli.command {
        let password = std::env::var("CAMPUS_PASSWORD").context("CAMPUS_PASSWORD must be set to log in")?;
        let remote = RemoteDataSource::new(config.api_base_url.clone(), session, config.request_timeout)?;
        let tokens = remote.login(email, &password, *role).await.context("login failed")?;
        println!("Logged in as {email} ({role}).");
        println!("CAMPUS_ACCESS_TOKEN={}", tokens.access);
        if let Some(refresh) = tokens.refresh {
            println!("Refresh token: {refresh}");
        }
        return Ok(());
    }

    let source = PortalSource::from_config(&config, session).context("failed to set up data source")?;

    match cli.command {
        Commands::Students { filters, focus, .. } => {
            let view = load_students(&source, filters.into()).await;
            print_banner(view.banner().as_deref());
            view.read(|cascade| {
                let visible = cascade.visible();
                println!("{} ({} students):", cascade.filters().label(), visible.len());
                if visible.is_empty() {
                    println!("No students match these filters.");
                }
                for student in visible {
                    print_student(student);
                }
            })
            .context(STILL_LOADING)?;
            if let Some(id) = focus {
                if view.update(|cascade| cascade.focus(StudentId(id))) == Some(true) {
                    view.read(|cascade| {
                        if let Some(student) = cascade.focused() {
                            println!();
                            println!("Focused: {} <{}> phone {}", student.name, student.email, student.phone);
                        }
                    })
                    .context(STILL_LOADING)?;
                } else {
                    println!("Student {id} is not in the filtered roster.");
                }
            }
        }
        Commands::Options { filters } => {
            let view = load_students(&source, filters.into()).await;
            print_banner(view.banner().as_deref());
            view.read(|cascade| {
                let options = cascade.options();
                println!("Selection: {}", cascade.filters().label());
                let years: Vec<String> = options.years.iter().map(|y| y.label()).collect();
                println!("Years: {}", years.join(", "));
                let branches: Vec<&str> = options.branches.iter().map(|b| b.code()).collect();
                println!("Branches: {}", branches.join(", "));
                let sections: Vec<String> = cascade
                    .section_choices()
                    .iter()
                    .map(|s| s.letter().to_string())
                    .collect();
                println!("Sections: {}", sections.join(", "));
            })
            .context(STILL_LOADING)?;
        }
        Commands::Fees { filters } => {
            let filters: FilterState = filters.into();
            let fetched = load_fees(&source, &filters).await;
            print_banner(fetched.banner.as_deref());
            let records = fetched.data;
            if records.is_empty() {
                println!("No fee records for {}.", filters.label());
                return Ok(());
            }
            for record in &records {
                println!(
                    "- {} ({}) {} paid {} of {}, remaining {}",
                    record.name, record.roll_no, record.status, record.paid_amount, record.fee_total, record.remaining_amount
                );
            }
            let summary = FeeSummary::from_records(&records);
            println!(
                "Expected {} / collected {} / pending {}",
                summary.expected_fee, summary.collected_fee, summary.pending_fee
            );
        }
        Commands::Assignments { filters } => {
            let view = RosterView::new(fixture::demo_assignments());
            let _ = view.load(source.list_assignments()).await;
            let _ = view.update(|cascade| cascade.select(filters.into()));
            print_banner(view.banner().as_deref());
            view.read(|cascade| {
                let visible = cascade.visible();
                if visible.is_empty() {
                    println!("No submissions for {}.", cascade.filters().label());
                }
                for record in visible {
                    print_assignment(record);
                }
            })
            .context(STILL_LOADING)?;
        }
        Commands::Notify {
            title,
            description,
            kind,
            priority,
            due,
            mode,
            student,
            filters,
        } => {
            let mode = match (mode, student) {
                (ModeArg::Broadcast, _) => TargetMode::Broadcast,
                (ModeArg::Class, _) => TargetMode::Class,
                (ModeArg::Student, Some(id)) => TargetMode::Individual(StudentId(id)),
                (ModeArg::Student, None) => anyhow::bail!("--student is required for --mode student"),
                (ModeArg::FeePending, _) => TargetMode::FeePending,
            };
            let mut composer = Composer::new(NotificationDraft {
                title,
                description,
                kind,
                priority,
                due_date: due,
            });
            let sent = composer
                .send(&source, &filters.into(), mode)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("Notification sent to {}.", sent.target.recipient_hint());
        }
        Commands::Notifications => {
            let fetched =
                Fetched::fetch("notifications", source.list_notifications(), fixture::demo_notifications).await;
            print_banner(fetched.banner.as_deref());
            let notifications = fetched.data;
            if notifications.is_empty() {
                println!("No notifications.");
            }
            for notification in notifications {
                let due = notification
                    .due_date
                    .map_or_else(String::new, |d| format!(", due {d}"));
                println!(
                    "- [{}] {} ({}{}): {}",
                    notification.priority, notification.title, notification.kind, due, notification.description
                );
            }
        }
        Commands::Report { filters, out } => {
            let view = load_students(&source, filters.into()).await;
            let selected = view.filters();
            let fees = load_fees(&source, &selected).await;
            let banner = view.banner();
            let report = view.read(|cascade| {
                let visible = cascade.visible();
                report::build_report(&ReportInput {
                    filters: cascade.filters(),
                    options: cascade.options(),
                    students: &visible,
                    fees: &fees.data,
                    banner: banner.as_deref().or(fees.banner.as_deref()),
                    generated_on: chrono::Local::now().date_naive(),
                })
            })
            .context(STILL_LOADING)?;
            std::fs::write(&out, report).with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { filters, out } => {
            let view = load_students(&source, filters.into()).await;
            print_banner(view.banner().as_deref());
            let file = std::fs::File::create(&out).with_context(|| format!("failed to create {}", out.display()))?;
            let written = view
                .read(|cascade| report::write_roster_csv(file, &cascade.visible()))
                .context(STILL_LOADING)??;
            println!("Exported {written} students to {}.", out.display());
        }
        Commands::Login { .. } => {}
    }

    Ok(())
}
