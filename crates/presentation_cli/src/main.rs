//! LetterDesk CLI
//!
//! Author-side client: drafts live in the local cache and are numbered and
//! submitted through the sync coordinator.

#![allow(clippy::print_stdout)]

mod cli;

use anyhow::Context;
use application::{AuthorContext, Connectivity, ResyncReport, SyncCoordinator};
use clap::Parser;
use cli::{Cli, Commands, ContentArgs, log_filter_from_verbosity};
use domain::{BranchId, Draft, LetterContent, LocalId, NotificationKind, ReferenceString};
use infrastructure::{AppConfig, LetterDesk, init_logging};
use tokio::sync::broadcast;

impl ContentArgs {
    /// Overlay the given fields on `content`
    fn apply(self, mut content: LetterContent) -> LetterContent {
        if let Some(subject) = self.subject {
            content.subject = subject;
        }
        if let Some(recipient) = self.recipient {
            content.recipient = recipient;
        }
        if let Some(body) = self.body {
            content.body = body;
        }
        if let Some(template) = self.template {
            content.template_id = Some(template);
        }
        content.fields.extend(self.fields);
        content
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::ParseReference { reference } = &cli.command {
        return parse_reference(reference);
    }

    let mut config = AppConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    config.telemetry.log_filter = log_filter_from_verbosity(cli.verbose).to_string();
    init_logging(&config.telemetry)?;

    let mut desk = LetterDesk::build(&config).await?;
    let mut notifications = desk.coordinator().subscribe();

    let result = execute(&mut desk, cli.command).await;
    print_notifications(&mut notifications);
    desk.shutdown().await;
    result
}

async fn execute(desk: &mut LetterDesk, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::New {
            branch,
            year,
            content,
        } => {
            let branch_id = BranchId::new(&branch)?;
            let author = match year {
                Some(year) => AuthorContext::new(branch_id, year),
                None => AuthorContext::current_year(branch_id),
            };
            let draft = desk
                .coordinator()
                .create_draft(&author, content.apply(LetterContent::default()))
                .await?;
            println!("📝 Draft saved: {}", draft.local_id);
            print_missing(&draft);
        },

        Commands::Edit { local_id, content } => {
            let coordinator = desk.coordinator();
            let mut draft = load_draft(coordinator, &local_id).await?;
            let edited = content.apply(draft.content.clone());
            draft.edit(edited);
            let draft = coordinator.manual_save(draft).await?;
            println!("📝 Draft saved: {}", draft.local_id);
            print_missing(&draft);
        },

        Commands::List => {
            let drafts = desk.coordinator().local().list_for_display().await?;
            if drafts.is_empty() {
                println!("No drafts");
            }
            for draft in drafts {
                println!(
                    "{}  {:<9} {:<7} {:<14} {}",
                    draft.local_id,
                    draft.status.as_str(),
                    draft.sync_status.as_str(),
                    draft
                        .reference()
                        .map_or_else(|| "-".to_string(), |r| r.to_string()),
                    draft.content.subject,
                );
            }
        },

        Commands::Show { local_id } => {
            let coordinator = desk.coordinator();
            let draft = load_draft(coordinator, &local_id).await?;
            let state = coordinator.sync_status(draft.local_id).await?;
            println!("{}", serde_json::to_string_pretty(&draft)?);
            println!("State: {}", state.as_str());
        },

        Commands::Finalize { local_id } => {
            let coordinator = desk.coordinator();
            let draft = load_draft(coordinator, &local_id).await?;
            coordinator.monitor().probe().await;
            // Success or queueing is reported through notifications
            coordinator.finalize(draft.completed()).await?;
        },

        Commands::Resync => {
            let report = desk.start().await?;
            print_report(&report);
        },

        Commands::Abandon { local_id } => {
            let local_id = LocalId::parse(&local_id)?;
            desk.coordinator().abandon(local_id).await?;
            println!("🗑️  Draft {local_id} abandoned");
        },

        Commands::Probe => match desk.coordinator().monitor().probe().await {
            Connectivity::Online => println!("✅ Letter repository reachable"),
            Connectivity::Offline => println!("❌ Letter repository unreachable"),
        },

        Commands::ParseReference { reference } => parse_reference(&reference)?,
    }
    Ok(())
}

async fn load_draft(coordinator: &SyncCoordinator, raw: &str) -> anyhow::Result<Draft> {
    let local_id = LocalId::parse(raw)?;
    coordinator
        .local()
        .get(local_id)
        .await?
        .with_context(|| format!("No draft {local_id} in the local cache"))
}

fn parse_reference(raw: &str) -> anyhow::Result<()> {
    let reference = ReferenceString::parse(raw)?;
    println!("Branch: {}", reference.scope().branch_code());
    println!("Year:   {}", reference.scope().year());
    println!("Number: {}", reference.sequence_number());
    Ok(())
}

fn print_missing(draft: &Draft) {
    let missing = draft.content.missing_fields();
    if !missing.is_empty() {
        println!("   Still missing: {}", missing.join(", "));
    }
}

fn print_report(report: &ResyncReport) {
    if report.is_empty() {
        println!("Nothing to submit");
        return;
    }
    println!(
        "Resync: {} stored, {} queued, {} failed",
        report.synced.len(),
        report.queued.len(),
        report.failed.len()
    );
}

fn print_notifications(rx: &mut broadcast::Receiver<domain::Notification>) {
    while let Ok(notification) = rx.try_recv() {
        let marker = match notification.kind {
            NotificationKind::Success => "✅",
            NotificationKind::Warning => "⚠️ ",
            NotificationKind::Error => "❌",
        };
        println!("{marker} {}", notification.message);
    }
}
