//! Command-line surface of the checkout client.
//!
//! Every subcommand goes through [`AppState`], so local policy checks and the
//! logged-in session apply the same way they do in the terminal dashboard.

use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use dept_checkout::engine::catalog::{categories, filter_resources, filter_users, ResourceQuery};
use dept_checkout::engine::classifier::{classify, ReturnRow};
use dept_checkout::engine::ordering::{count_matching, filter_and_sort, RequestFilter};
use dept_checkout::engine::validator::RequestDraft;
use dept_checkout::models::notification::Notification;
use dept_checkout::models::policy::PolicyTable;
use dept_checkout::models::request::{Priority, Request, RequestTransition};
use dept_checkout::models::resource::{Resource, ResourceDraft, ResourceStatus};
use dept_checkout::models::user::{Role, SignupRequest};
use dept_checkout::utils::notification::{route, NotificationFeed};
use dept_checkout::AppState;

#[derive(Parser, Debug)]
#[command(name = "dept-checkout")]
#[command(author, version, about = "Department resource checkout client", long_about = None)]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session token
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long, env = "CHECKOUT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account (log in afterwards)
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "CHECKOUT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// student, faculty or admin
        #[arg(long, default_value = "student")]
        role: Role,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user and their limits
    Whoami,

    /// Summary counts and the most recent requests
    Dashboard,

    /// Browse and manage the resource catalog
    #[command(subcommand)]
    Resources(ResourcesCommands),

    /// Request a resource
    Request {
        resource_id: String,
        #[arg(short, long)]
        quantity: Option<u32>,
        /// Checkout length in days
        #[arg(short, long)]
        duration: Option<u32>,
        /// urgent, research or standard
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(short, long, default_value = "")]
        notes: String,
    },

    /// List requests in review order
    Requests {
        /// all, pending, approved, denied, return_requested, returned, overdue, due
        #[arg(short, long, default_value = "all")]
        filter: RequestFilter,
    },

    /// Approve a pending request (admin)
    Approve { id: String },

    /// Deny a pending request (admin)
    Deny {
        id: String,
        /// At least 10 characters
        #[arg(short, long)]
        reason: String,
    },

    /// Ask to return an approved checkout
    Return { id: String },

    /// Confirm a returned item (admin)
    ConfirmReturn { id: String },

    /// Overdue and due-soon report
    Returns,

    /// Ask the backend to recompute overdue state and send reminders (admin)
    CheckOverdue,

    /// Notifications for the logged-in user
    #[command(subcommand)]
    Notifications(NotificationCommands),

    /// User directory with activity (admin)
    Users {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        role: Option<Role>,
    },

    /// Stakeholder policy table
    #[command(subcommand)]
    Policies(PolicyCommands),

    /// Stakeholder analytics (admin)
    Analytics,

    /// Interactive terminal dashboard
    #[cfg(feature = "tui-support")]
    Tui,
}

#[derive(Subcommand, Debug)]
pub enum ResourcesCommands {
    List {
        #[arg(short, long)]
        search: Option<String>,
        /// available, booked or maintenance
        #[arg(long)]
        status: Option<ResourceStatus>,
        #[arg(short, long)]
        category: Option<String>,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        quantity: u32,
        #[arg(long, default_value = "available")]
        status: ResourceStatus,
    },
    /// Change fields of an existing resource
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long)]
        status: Option<ResourceStatus>,
    },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum NotificationCommands {
    List,
    /// Mark one notification read and show where it leads
    Read { id: String },
    ReadAll,
    /// Poll and print new notifications until Ctrl+C
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommands {
    /// Effective table (server copy, or built-in defaults)
    Show,
    /// Replace the table from a JSON file (admin)
    Set { file: PathBuf },
}

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password is required");
    }
    Ok(password)
}

fn short_date(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d").to_string())
}

fn print_requests(requests: &[Request], now: DateTime<Utc>) {
    println!(
        "{:<26} {:<24} {:<18} {:>3} {:<16} {:<9} {:<10} {}",
        "ID", "RESOURCE", "REQUESTER", "QTY", "STATUS", "PRIORITY", "RETURN", "NOTE"
    );
    for request in requests {
        let c = classify(request, now);
        let note = if c.is_overdue {
            c.days_text()
        } else {
            request.denial_reason.clone().unwrap_or_default()
        };
        println!(
            "{:<26} {:<24} {:<18} {:>3} {:<16} {:<9} {:<10} {}",
            request.id,
            request.resource_name(),
            request.requester_name(),
            request.quantity,
            request.status,
            request.priority.map_or("-".to_string(), |p| p.to_string()),
            short_date(request.return_date),
            note,
        );
    }
}

fn print_resources(resources: &[&Resource]) {
    println!(
        "{:<26} {:<28} {:<16} {:>9} {:<12}",
        "ID", "NAME", "CATEGORY", "AVAIL", "STATUS"
    );
    for resource in resources {
        println!(
            "{:<26} {:<28} {:<16} {:>4}/{:<4} {:<12}",
            resource.id,
            resource.name,
            resource.category,
            resource.available_quantity,
            resource.quantity,
            resource.status,
        );
    }
}

fn print_return_rows(title: &str, rows: &[ReturnRow]) {
    println!("{title} ({})", rows.len());
    for row in rows {
        let severity = row.severity.map_or("-".to_string(), |s| s.to_string());
        println!(
            "  [{:<6}] {:<26} {:<24} {:<18} {:<10} {}",
            severity,
            row.request.id,
            row.request.resource_name(),
            row.request.requester_name(),
            short_date(row.request.return_date),
            row.classification.days_text(),
        );
    }
}

fn print_notification(notification: &Notification) {
    let marker = if notification.read { " " } else { "*" };
    println!(
        "{} {:<26} {:<16} {} - {}",
        marker,
        notification.id,
        short_date(notification.created_at),
        notification.title,
        notification.message,
    );
}

pub async fn run(command: Commands, state: &mut AppState) -> Result<()> {
    let now = Utc::now();

    match command {
        Commands::Login { email, password } => {
            let password = read_password(password)?;
            let session = state.login(&email, &password).await?;
            println!("Logged in as {} ({})", session.name(), session.role());
        }

        Commands::Signup { name, email, password, role } => {
            let password = read_password(password)?;
            state
                .signup(&SignupRequest { name, email, password, role })
                .await?;
            println!("Account created. Run `dept-checkout login` to continue.");
        }

        Commands::Logout => {
            state.logout()?;
            println!("Logged out.");
        }

        Commands::Whoami => {
            let session = state.require_session()?.clone();
            let policy = state.resolve_policy(None).await;
            println!("{} <{}>", session.name(), session.email());
            println!("  role:         {}", session.role());
            println!("  session ends: {}", short_date(session.expires_at()));
            println!("  max duration: {} days (default {})", policy.max_duration, policy.default_duration);
            println!(
                "  max quantity: {}",
                policy.max_quantity.map_or("unlimited".to_string(), |q| q.to_string())
            );
            let priorities: Vec<_> = policy.allowed_priorities.iter().map(|p| p.label()).collect();
            println!("  priorities:   {}", priorities.join(", "));
            println!("  policy from:  {:?}", policy.source);
        }

        Commands::Dashboard => {
            let stats = state.dashboard().await?;
            println!(
                "Resources: {}  My requests: {}  Pending: {}  Approved: {}  Overdue: {}  Due soon: {}",
                stats.total_resources, stats.my_requests, stats.pending, stats.approved, stats.overdue, stats.due
            );
            println!();
            print_requests(&stats.recent, now);
        }

        Commands::Resources(ResourcesCommands::List { search, status, category }) => {
            let resources = state.client.get_resources().await?;
            let query = ResourceQuery { search, status, category };
            let shown = filter_resources(&resources, &query);
            print_resources(&shown);
            println!("\nCategories: {}", categories(&resources).join(", "));
        }

        Commands::Resources(ResourcesCommands::Create { name, description, category, quantity, status }) => {
            let draft = ResourceDraft { name, description, category, quantity, status };
            state.save_resource(None, &draft).await?;
            println!("Resource {} created.", draft.name);
        }

        Commands::Resources(ResourcesCommands::Update { id, name, description, category, quantity, status }) => {
            let existing = state.find_resource(&id).await?;
            let mut draft = ResourceDraft::from_resource(&existing);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(category) = category {
                draft.category = category;
            }
            if let Some(quantity) = quantity {
                draft.quantity = quantity;
            }
            if let Some(status) = status {
                draft.status = status;
            }
            state.save_resource(Some(&id), &draft).await?;
            println!("Resource {} updated.", draft.name);
        }

        Commands::Resources(ResourcesCommands::Delete { id }) => {
            state.delete_resource(&id).await?;
            println!("Resource {id} deleted.");
        }

        Commands::Request { resource_id, quantity, duration, priority, notes } => {
            let resource = state.find_resource(&resource_id).await?;
            let policy = state.resolve_policy(Some(&resource)).await;

            let mut draft = RequestDraft::for_policy(&policy);
            draft.notes = notes;
            if let Some(quantity) = quantity {
                draft.quantity = quantity;
            }
            if let Some(duration) = duration {
                draft.duration = duration;
            }
            if let Some(priority) = priority {
                draft.priority = priority;
            }

            state.submit_request(&resource, &draft).await?;
            println!(
                "Requested {} x{} for {} days ({} priority).",
                resource.name,
                draft.quantity,
                draft.duration,
                draft.priority.label()
            );
        }

        Commands::Requests { filter } => {
            let requests = state.requests().await?;
            let shown = filter_and_sort(&requests, filter, state.role(), now);
            print_requests(&shown, now);

            let counts: Vec<String> = RequestFilter::ALL
                .iter()
                .map(|f| format!("{}={}", f, count_matching(&requests, *f, now)))
                .collect();
            println!("\n{}", counts.join("  "));
        }

        Commands::Approve { id } => {
            state.apply_transition(&id, &RequestTransition::Approve).await?;
            println!("Request {id} approved.");
        }

        Commands::Deny { id, reason } => {
            let transition = RequestTransition::deny(&reason)?;
            state.apply_transition(&id, &transition).await?;
            println!("Request {id} denied.");
        }

        Commands::Return { id } => {
            state.apply_transition(&id, &RequestTransition::RequestReturn).await?;
            println!("Return requested for {id}.");
        }

        Commands::ConfirmReturn { id } => {
            state.apply_transition(&id, &RequestTransition::ConfirmReturn).await?;
            println!("Return of {id} confirmed.");
        }

        Commands::Returns => {
            let report = state.returns_report().await?;
            print_return_rows("Overdue", &report.overdue);
            println!();
            print_return_rows("Due soon", &report.due);
        }

        Commands::CheckOverdue => {
            if !state.require_session()?.role().is_admin() {
                bail!("Only administrators can run the overdue check");
            }
            let result = state.client.check_overdue().await?;
            println!(
                "Overdue check complete: {} overdue, {} due soon.",
                result.overdue_count, result.due_count
            );
        }

        Commands::Notifications(NotificationCommands::List) => {
            state.require_session()?;
            let notifications = state.client.get_notifications().await?;
            let unread = notifications.iter().filter(|n| !n.read).count();
            for notification in &notifications {
                print_notification(notification);
            }
            println!("\n{unread} unread");
        }

        Commands::Notifications(NotificationCommands::Read { id }) => {
            state.require_session()?;
            let notifications = state.client.get_notifications().await?;
            let notification = notifications
                .iter()
                .find(|n| n.id == id)
                .with_context(|| format!("Notification {id} not found"))?;
            state.client.mark_notification_read(&id).await?;
            println!(
                "{}\nOpen with: dept-checkout requests --filter {}",
                notification.message,
                route(notification.kind)
            );
        }

        Commands::Notifications(NotificationCommands::ReadAll) => {
            state.require_session()?;
            state.client.mark_all_notifications_read().await?;
            println!("All notifications marked read.");
        }

        Commands::Notifications(NotificationCommands::Watch) => {
            state.require_session()?;
            watch_notifications(state).await?;
        }

        Commands::Users { search, role } => {
            let (users, stats) = state.user_directory().await?;
            println!(
                "{} users: {} students, {} faculty, {} admins\n",
                stats.total, stats.students, stats.faculty, stats.admins
            );
            println!(
                "{:<26} {:<20} {:<28} {:<8} {:>5} {:>5} {:>5} {:<10}",
                "ID", "NAME", "EMAIL", "ROLE", "REQ", "APPR", "PEND", "LAST"
            );
            for user in filter_users(&users, search, role) {
                let activity = stats.activity(&user.id);
                println!(
                    "{:<26} {:<20} {:<28} {:<8} {:>5} {:>5} {:>5} {:<10}",
                    user.id,
                    user.name,
                    user.email,
                    user.role,
                    activity.request_count,
                    activity.approved_count,
                    activity.pending_count,
                    short_date(activity.last_request),
                );
            }
        }

        Commands::Policies(PolicyCommands::Show) => {
            state.require_session()?;
            let table = match state.policies.refresh(&state.client).await {
                Some(table) => (*table).clone(),
                None => {
                    eprintln!("Backend policies unavailable, showing built-in defaults.");
                    PolicyTable::builtin()
                }
            };
            println!("{}", serde_json::to_string_pretty(&table)?);
        }

        Commands::Policies(PolicyCommands::Set { file }) => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let table: PolicyTable = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid policy table", file.display()))?;
            state.update_policies(table).await?;
            println!("Stakeholder policies updated.");
        }

        Commands::Analytics => {
            if !state.require_session()?.role().is_admin() {
                bail!("Only administrators can view stakeholder analytics");
            }
            let analytics = state.client.get_stakeholder_analytics().await?;
            println!("Total requests:  {}", analytics.total_requests);
            println!(
                "By role:         faculty {}  student {}  admin {}",
                analytics.role_stats.faculty, analytics.role_stats.student, analytics.role_stats.admin
            );
            println!(
                "By priority:     urgent {}  research {}  standard {}",
                analytics.priority_stats.urgent,
                analytics.priority_stats.research,
                analytics.priority_stats.standard
            );
            println!("Conflicts:       {}", analytics.conflicting_requests);
            println!("Compliance rate: {:.1}%", analytics.compliance_rate);
        }

        #[cfg(feature = "tui-support")]
        Commands::Tui => crate::tui::run(state).await?,
    }

    Ok(())
}

async fn watch_notifications(state: &AppState) -> Result<()> {
    let feed = NotificationFeed::spawn(Arc::new(state.client.clone()), state.config.poll_interval);
    let mut updates = feed.subscribe();
    let mut seen: HashSet<String> = HashSet::new();

    println!("Watching notifications every {}s, Ctrl+C to stop.", state.config.poll_interval.as_secs());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if let Some(error) = &snapshot.last_error {
                    eprintln!("refresh failed: {error}");
                }
                for notification in snapshot.notifications.iter().filter(|n| seen.insert(n.id.clone())) {
                    print_notification(notification);
                }
            }
        }
    }

    feed.shutdown().await;
    Ok(())
}
