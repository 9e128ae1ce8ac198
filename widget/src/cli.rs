//! Command-line surface over [`WidgetApp`].
//!
//! Each subcommand drives the same services a graphical host would: the
//! form for submissions, the dashboard for admin work and the setup service
//! for credentials.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, bail, eyre};

use crate::app::WidgetApp;
use crate::domain::{
    AppFlow, Credentials, DashboardFilters, FeedbackId, FeedbackRecord, FeedbackSeverity,
    FeedbackStatus, FeedbackType, Filter, Role, SubmitOutcome, View, format_file_size,
    severity_label,
};
use crate::outbound::attachment_file::read_attachment;

/// `feedback-widget` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "feedback-widget",
    about = "Collect product feedback and triage it from the terminal",
    version
)]
pub struct Cli {
    /// Local store file; overrides `FEEDBACK_WIDGET_STORE_PATH`.
    #[arg(long, global = true, value_name = "path")]
    pub store: Option<PathBuf>,
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,
    /// Action to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Verify and store backend credentials.
    Setup {
        /// Project URL.
        #[arg(long)]
        url: String,
        /// Public (anon) key.
        #[arg(long, env = "FEEDBACK_WIDGET_API_KEY", hide_env_values = true)]
        key: String,
    },
    /// Show configuration and session state.
    Status,
    /// Create an account.
    SignUp(AccountArgs),
    /// Sign in with email and password.
    SignIn(AccountArgs),
    /// Sign out.
    SignOut {
        /// Also forget the stored backend credentials.
        #[arg(long)]
        forget: bool,
    },
    /// Submit feedback.
    Submit(SubmitArgs),
    /// List feedback (admin).
    List(ListArgs),
    /// Show one feedback record with attachment links (admin).
    Show {
        /// Row id.
        id: i64,
    },
    /// Change status or severity (admin).
    Update {
        /// Row id.
        id: i64,
        /// New status.
        #[arg(long)]
        status: FeedbackStatus,
        /// New severity.
        #[arg(long)]
        severity: Option<FeedbackSeverity>,
    },
    /// Delete a record (admin).
    Delete {
        /// Row id.
        id: i64,
    },
    /// Show or change the launcher appearance and credentials.
    Appearance(AppearanceArgs),
}

/// Email and password.
#[derive(Debug, Clone, clap::Args)]
pub struct AccountArgs {
    /// Account email.
    #[arg(long)]
    pub email: String,
    /// Account password.
    #[arg(long, env = "FEEDBACK_WIDGET_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Fields of the feedback form.
#[derive(Debug, Clone, clap::Args)]
pub struct SubmitArgs {
    /// What happened, 10 to 5000 characters.
    #[arg(long)]
    pub description: String,
    /// Short summary.
    #[arg(long, default_value = "")]
    pub title: String,
    /// Kind of feedback.
    #[arg(long = "type", default_value = "bug_report")]
    pub feedback_type: FeedbackType,
    /// Severity, for bug reports.
    #[arg(long, default_value = "low")]
    pub severity: FeedbackSeverity,
    /// Contact email; ignored while signed in.
    #[arg(long)]
    pub email: Option<String>,
    /// Contact name.
    #[arg(long)]
    pub name: Option<String>,
    /// Files to attach; at most five are kept.
    #[arg(long = "attach", value_name = "path")]
    pub attachments: Vec<PathBuf>,
    /// Views visited before submitting, oldest first.
    #[arg(long = "visit", value_name = "view")]
    pub visits: Vec<View>,
}

/// Dashboard filters.
#[derive(Debug, Clone, clap::Args)]
pub struct ListArgs {
    /// Only this type.
    #[arg(long = "type")]
    pub feedback_type: Option<FeedbackType>,
    /// Only this status.
    #[arg(long)]
    pub status: Option<FeedbackStatus>,
    /// Only this severity.
    #[arg(long)]
    pub severity: Option<FeedbackSeverity>,
}

impl From<&ListArgs> for DashboardFilters {
    fn from(args: &ListArgs) -> Self {
        Self {
            feedback_type: args.feedback_type.map_or(Filter::All, Filter::Only),
            status: args.status.map_or(Filter::All, Filter::Only),
            severity: args.severity.map_or(Filter::All, Filter::Only),
        }
    }
}

/// Settings page fields.
#[derive(Debug, Clone, clap::Args)]
pub struct AppearanceArgs {
    /// Launcher colour.
    #[arg(long)]
    pub color: Option<String>,
    /// Launcher label.
    #[arg(long)]
    pub text: Option<String>,
    /// New project URL; needs `--key`.
    #[arg(long, requires = "key")]
    pub url: Option<String>,
    /// New public key; needs `--url`.
    #[arg(long, requires = "url")]
    pub key: Option<String>,
}

/// Run `command` against `app`, writing human-readable output to `out`.
///
/// # Errors
///
/// Returns a report carrying the user-facing message when the operation
/// fails.
pub async fn run(app: &WidgetApp, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Setup { url, key } => {
            app.setup.connect(&url, &key).await.map_err(|e| eyre!(e))?;
            writeln!(out, "Connected. Credentials saved.")?;
        }
        Command::Status => status(app, out)?,
        Command::SignUp(args) => {
            let credentials = credentials(&args)?;
            let outcome = app.auth.sign_up(&credentials).await.map_err(|e| eyre!(e))?;
            if outcome.session.is_some() {
                writeln!(out, "Account created and signed in as {}.", credentials.email())?;
            } else {
                writeln!(out, "Account created. Confirm your email, then sign in.")?;
            }
        }
        Command::SignIn(args) => {
            let credentials = credentials(&args)?;
            app.auth.sign_in(&credentials).await.map_err(|e| eyre!(e))?;
            let role = app
                .auth
                .profile()
                .map_or_else(|| "none".to_owned(), |profile| profile.role.to_string());
            writeln!(out, "Signed in as {} (role: {role}).", credentials.email())?;
        }
        Command::SignOut { forget } => {
            let signed_out = app.sign_out().await;
            if forget {
                app.config.clear_credentials().map_err(|e| eyre!(e))?;
                writeln!(out, "Stored credentials removed.")?;
            }
            signed_out.map_err(|e| eyre!(e))?;
            writeln!(out, "Signed out.")?;
        }
        Command::Submit(args) => submit(app, args, out).await?,
        Command::List(args) => {
            load_as_admin(app).await?;
            app.dashboard.set_filters(DashboardFilters::from(&args));
            let state = app.dashboard.snapshot();
            let rows = state.filtered();
            if rows.is_empty() {
                writeln!(out, "No feedback found.")?;
            }
            for record in rows {
                writeln!(
                    out,
                    "{:>5}  {}  {:<16} {:<12} {:<9} {}",
                    record.id,
                    record.tracking_id,
                    record.feedback_type.label(),
                    record.status.label(),
                    severity_label(record.severity),
                    record.title
                )?;
            }
        }
        Command::Show { id } => {
            let record = find_as_admin(app, id).await?;
            app.dashboard.view_feedback(record);
            let selected = app
                .dashboard
                .snapshot()
                .selected
                .ok_or_else(|| eyre!("record disappeared"))?;
            describe(&selected.record, out)?;
            for link in &selected.links {
                let kind = if link.is_image { "image" } else { "file" };
                writeln!(out, "  [{kind}] {} {}", link.name, link.url)?;
            }
        }
        Command::Update {
            id,
            status,
            severity,
        } => {
            let record = find_as_admin(app, id).await?;
            app.dashboard.open_edit(record);
            app.dashboard.set_edit_status(status);
            if severity.is_some() {
                app.dashboard.set_edit_severity(severity);
            }
            if let Err(error) = app.dashboard.save_edit().await {
                let shown = app
                    .dashboard
                    .snapshot()
                    .editing
                    .and_then(|dialog| dialog.error)
                    .unwrap_or_else(|| error.message().to_owned());
                bail!(shown);
            }
            writeln!(out, "Updated #{id}: {}.", status.label())?;
        }
        Command::Delete { id } => {
            let record = find_as_admin(app, id).await?;
            app.dashboard.open_delete(record);
            if let Err(error) = app.dashboard.confirm_delete().await {
                let shown = app
                    .dashboard
                    .snapshot()
                    .deleting
                    .and_then(|dialog| dialog.error)
                    .unwrap_or_else(|| error.message().to_owned());
                bail!(shown);
            }
            writeln!(out, "Deleted #{id}.")?;
        }
        Command::Appearance(args) => appearance(app, args, out)?,
    }
    Ok(())
}

fn credentials(args: &AccountArgs) -> Result<Credentials> {
    Credentials::try_from_parts(&args.email, &args.password).map_err(|e| eyre!(e))
}

fn status(app: &WidgetApp, out: &mut impl Write) -> Result<()> {
    match app.config.stored_credentials() {
        Some(credentials) => writeln!(out, "Backend: {}", credentials.url())?,
        None => writeln!(out, "Backend: not configured (run `feedback-widget setup`)")?,
    }
    match app.auth.session() {
        Some(session) => {
            let email = session.user().email.clone().unwrap_or_default();
            writeln!(out, "Session: {email}")?;
        }
        None => writeln!(out, "Session: signed out")?,
    }
    let appearance = app.admin_panel.appearance();
    writeln!(out, "Button: \"{}\" {}", appearance.text, appearance.color)?;
    Ok(())
}

async fn submit(app: &WidgetApp, args: SubmitArgs, out: &mut impl Write) -> Result<()> {
    app.flow.select(AppFlow::Widget);
    for view in &args.visits {
        app.navigation.navigate_to(*view);
    }
    let files = args
        .attachments
        .iter()
        .map(|path| read_attachment(path).wrap_err_with(|| format!("reading {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    let form = &app.form;
    form.reset_form();
    form.open();
    form.set_title(args.title);
    form.set_description(args.description);
    form.set_type(args.feedback_type);
    form.set_severity(args.severity);
    if let Some(email) = args.email {
        form.set_email(email);
    }
    if let Some(name) = args.name {
        form.set_name(name);
    }
    form.add_attachments(files);
    for attachment in &form.snapshot().attachments {
        writeln!(
            out,
            "Attaching {} ({})",
            attachment.name(),
            format_file_size(attachment.size())
        )?;
    }

    let outcome = form.submit().await;
    form.close();
    match outcome {
        SubmitOutcome::Submitted {
            tracking_id,
            warning,
        } => {
            writeln!(out, "Thank you! Your tracking id is {tracking_id}.")?;
            if let Some(warning) = warning {
                writeln!(out, "Warning: {warning}")?;
            }
            Ok(())
        }
        SubmitOutcome::Failed(error) => Err(eyre!(error)),
        SubmitOutcome::Invalid => bail!("The description must be between 10 and 5000 characters."),
        SubmitOutcome::InFlight => bail!("A submission is already in progress."),
    }
}

async fn load_as_admin(app: &WidgetApp) -> Result<()> {
    let session = app
        .auth
        .session()
        .ok_or_else(|| eyre!("Sign in with an administrator account first."))?;
    let profile = app.auth.fetch_profile(session.user().id).await;
    if profile.map(|profile| profile.role) != Some(Role::Admin) {
        bail!("This account does not have the administrator role.");
    }
    app.flow.select(AppFlow::Admin);
    app.dashboard.open().await;
    if let Some(error) = app.dashboard.snapshot().error {
        bail!(error);
    }
    Ok(())
}

async fn find_as_admin(app: &WidgetApp, id: i64) -> Result<FeedbackRecord> {
    load_as_admin(app).await?;
    let wanted = FeedbackId::new(id);
    app.dashboard
        .snapshot()
        .records
        .into_iter()
        .find(|record| record.id == wanted)
        .ok_or_else(|| eyre!("No feedback with id {id}."))
}

fn describe(record: &FeedbackRecord, out: &mut impl Write) -> Result<()> {
    writeln!(out, "#{} {}", record.id, record.tracking_id)?;
    writeln!(out, "Title:    {}", record.title)?;
    writeln!(out, "Type:     {}", record.feedback_type.label())?;
    writeln!(out, "Status:   {}", record.status.label())?;
    writeln!(out, "Severity: {}", severity_label(record.severity))?;
    writeln!(out, "Created:  {}", record.created_at.to_rfc3339())?;
    if let Some(email) = &record.email {
        writeln!(out, "Email:    {email}")?;
    }
    if let Some(name) = &record.name {
        writeln!(out, "Name:     {name}")?;
    }
    if let Some(route) = &record.current_route {
        writeln!(out, "Route:    {route} (history: {})", record.navigation_history.join(" > "))?;
    }
    writeln!(out, "\n{}", record.description)?;
    Ok(())
}

fn appearance(app: &WidgetApp, args: AppearanceArgs, out: &mut impl Write) -> Result<()> {
    let current = app.admin_panel.appearance();
    let unchanged = args.color.is_none() && args.text.is_none() && args.url.is_none();
    if unchanged {
        writeln!(out, "Button: \"{}\" {}", current.text, current.color)?;
        return Ok(());
    }
    let color = args.color.unwrap_or(current.color);
    let text = args.text.unwrap_or(current.text);
    app.dashboard
        .save_settings(
            &color,
            &text,
            args.url.as_deref().unwrap_or_default(),
            args.key.as_deref().unwrap_or_default(),
        )
        .map_err(|e| eyre!(e))?;
    if let Some(message) = app.dashboard.snapshot().settings.message {
        writeln!(out, "{message}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
