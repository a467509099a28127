//! `reel` - drive the recipe video wizard from the terminal

mod logging;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use reel_backends::{GeminiBackends, WebhookExportSink};
use reel_core::{
    CancelToken, CreationSession, FrameState, IdeaId, PipelineError, ProgressEvent,
    ProgressReporter, RecipeIdea, StudioConfig,
};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;

fn cli() -> Command {
    let theme = Arg::new("theme")
        .long("theme")
        .required(true)
        .help("Trend or season to generate ideas for, e.g. \"Summer BBQ\"");
    let json = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print the result as JSON");

    Command::new("reel")
        .version(reel_core::VERSION)
        .about("Turn a food trend into a storyboarded, rendered recipe reel")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to a TOML studio configuration"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("check-config").about("Validate configuration and exit"))
        .subcommand(
            Command::new("ideas")
                .about("Generate and rank recipe ideas for a theme")
                .arg(theme.clone())
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("generate")
                .about("Run the full wizard: ideas, storyboard, frames")
                .arg(theme)
                .arg(
                    Arg::new("pick")
                        .long("pick")
                        .default_value("1")
                        .help("Idea to use: 1-based rank or idea id"),
                )
                .arg(
                    Arg::new("export")
                        .long("export")
                        .action(ArgAction::SetTrue)
                        .help("Send the reviewed project to the configured webhook"),
                )
                .arg(json),
        )
}

fn load_config(matches: &ArgMatches) -> Result<StudioConfig> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => StudioConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StudioConfig::new(),
    };
    Ok(config.with_env_overrides())
}

fn session(config: &StudioConfig) -> Result<CreationSession> {
    config.validate().context("configuration check failed")?;
    let backends = GeminiBackends::from_config(config)?;
    Ok(CreationSession::from_config(
        config,
        backends.ideas,
        backends.storyboards,
        backends.renderer,
    )?)
}

/// Resolve `--pick` against the ranked list: a number is a rank, anything else an id
fn resolve_pick(ranked: &[&RecipeIdea], pick: &str) -> Result<IdeaId> {
    if let Ok(rank) = pick.parse::<usize>() {
        return match rank.checked_sub(1).and_then(|i| ranked.get(i)) {
            Some(idea) => Ok(idea.id.clone()),
            None => bail!("rank {rank} out of range (1..={})", ranked.len()),
        };
    }
    Ok(IdeaId::from(pick))
}

fn print_ideas(ranked: &[&RecipeIdea]) {
    for (rank, idea) in ranked.iter().enumerate() {
        println!(
            "{:>2}. [{:>3}] {} ({})",
            rank + 1,
            idea.virality_score,
            idea.title,
            idea.id
        );
        if !idea.description.is_empty() {
            println!("          {}", idea.description);
        }
    }
}

async fn print_progress(mut rx: UnboundedReceiver<ProgressEvent>, quiet: bool) {
    while let Some(event) = rx.recv().await {
        if quiet {
            continue;
        }
        let snapshot = &event.snapshot;
        let Some(frame) = snapshot.frames.get(event.frame_index) else {
            continue;
        };
        let status = match event.state {
            FrameState::Pending => continue,
            FrameState::Generating => "generating",
            FrameState::Completed => "completed",
            FrameState::Failed => "failed",
        };
        eprintln!(
            "[{}/{}] {} ... {status}",
            snapshot.completed, snapshot.total, frame.description()
        );
    }
}

async fn run_ideas(config: StudioConfig, args: &ArgMatches) -> Result<()> {
    let theme = args.get_one::<String>("theme").map_or("", String::as_str);
    let mut session = session(&config)?;
    session.generate_ideas(theme).await?;
    let ranked = session.ranked_ideas();

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else {
        print_ideas(&ranked);
    }
    Ok(())
}

async fn run_generate(config: StudioConfig, args: &ArgMatches) -> Result<()> {
    let theme = args.get_one::<String>("theme").map_or("", String::as_str);
    let pick = args.get_one::<String>("pick").map_or("1", String::as_str);
    let json = args.get_flag("json");

    let sink = if args.get_flag("export") {
        match WebhookExportSink::from_config(&config) {
            Some(sink) => Some(sink),
            None => bail!("--export needs export_webhook_url or REEL_EXPORT_WEBHOOK"),
        }
    } else {
        None
    };

    let mut session = session(&config)?;
    session.generate_ideas(theme).await?;
    let ranked = session.ranked_ideas();
    if !json {
        print_ideas(&ranked);
    }
    let id = resolve_pick(&ranked, pick)?;
    let idea = session.select_idea(&id)?;
    tracing::info!(idea = %idea.title, "generating reel");

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    let (progress, rx) = ProgressReporter::channel();
    let printer = tokio::spawn(print_progress(rx, json));
    let outcome = session.generate(&progress, &cancel).await;
    drop(progress);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "progress printer stopped abnormally");
    }

    let report = match outcome {
        Ok(report) => report,
        Err(e @ PipelineError::Cancelled { .. }) => {
            let snapshot = session.snapshot();
            eprintln!(
                "cancelled: {} completed, {} failed, {} not attempted",
                snapshot.completed,
                snapshot.failed,
                snapshot.total - snapshot.completed - snapshot.failed
            );
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    } else {
        println!(
            "\n{} of {} frames completed ({} failed, {} placeholders) in {} ms",
            report.completed, report.total, report.failed, report.placeholders, report.elapsed_ms
        );
        for frame in session.run().frames() {
            let detail = match (frame.media_ref(), frame.failure()) {
                (Some(media), _) if media.is_placeholder() => format!("placeholder {}", media.uri),
                (Some(media), _) => format!("{} bytes of media", media.uri.len()),
                (None, Some(reason)) => format!("FAILED: {reason}"),
                (None, None) => "not attempted".to_string(),
            };
            println!("  {:<12} {:<40} {detail}", frame.id().as_str(), frame.description());
        }
    }

    if let Some(sink) = sink {
        let (project, ack) = session.export(&sink).await?;
        eprintln!(
            "exported project {} ({})",
            project.id,
            ack.reference.as_deref().unwrap_or("no reference")
        );
    }
    Ok(())
}

fn check_config(config: &StudioConfig) -> Result<()> {
    config.validate()?;
    println!("api base url:     {}", config.api_base_url);
    println!("idea model:       {} (x{})", config.idea_model, config.idea_count);
    println!("storyboard model: {}", config.storyboard_model);
    println!(
        "image model:      {} ({}, {})",
        config.image_model, config.aspect_ratio, config.image_size
    );
    println!("render timeout:   {}s", config.render_timeout_secs);
    println!("failure policy:   {:?}", config.failure_policy);
    println!(
        "export webhook:   {}",
        config.export_webhook_url.as_deref().unwrap_or("(none)")
    );
    println!("configuration OK");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    logging::init(matches.get_flag("verbose"), matches.get_flag("log-json"));
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("check-config", _)) => check_config(&config),
        Some(("ideas", args)) => run_ideas(config, args).await,
        Some(("generate", args)) => run_generate(config, args).await,
        Some((other, _)) => bail!("unknown subcommand {other}"),
        None => bail!("no subcommand given"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn generate_args_parse() {
        let matches = cli()
            .try_get_matches_from([
                "reel", "generate", "--theme", "Summer BBQ", "--pick", "3", "--export",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "generate");
        assert_eq!(args.get_one::<String>("pick").unwrap(), "3");
        assert!(args.get_flag("export"));
    }

    #[test]
    fn pick_by_rank_or_id() {
        let a = RecipeIdea::new("idea-1", "A");
        let b = RecipeIdea::new("idea-2", "B");
        let ranked = vec![&b, &a];

        assert_eq!(resolve_pick(&ranked, "1").unwrap(), IdeaId::from("idea-2"));
        assert_eq!(resolve_pick(&ranked, "idea-1").unwrap(), IdeaId::from("idea-1"));
        assert!(resolve_pick(&ranked, "3").is_err());
        assert!(resolve_pick(&ranked, "0").is_err());
    }
}
