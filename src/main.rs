use anyhow::{bail, Context};
use clap::Parser;
use courtbot_core::{CancelToken, DryRunInjector};
use courtbot_cv::{Detector, ImageUtils, MatcherConfig, ReplayCapture, TemplateMatcher};
use courtbot_engine::{
    BotConfig, ControlLoop, Dispatcher, MenuActions, Result, Session, SessionHost, ThreeStarSearch,
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Args, Command};

const HOST_POLL: Duration = Duration::from_millis(100);

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = dispatch(args.command) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run {
            config,
            frames,
            ticks,
            stop_timeout_ms,
        } => run(&config, frames, ticks, Duration::from_millis(stop_timeout_ms)),
        Command::Probe {
            config,
            screenshot,
            label,
            threshold,
            no_scale,
        } => probe(&config, &screenshot, label.as_deref(), threshold, no_scale),
        Command::Check { config } => check(&config),
    }
}

fn run(config_path: &Path, frames: PathBuf, ticks: Option<u64>, stop_timeout: Duration) -> Result<()> {
    let config = BotConfig::load(config_path)?;
    let references = config.load_references()?;
    let table = config.action_table()?;
    let capture = ReplayCapture::open(&frames)?;
    info!("Replaying {} frame(s) from {:?}", capture.len(), frames);

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl-C handler")?;

    let mut host = SessionHost::spawn(move |cancel: CancelToken| {
        let detector = Detector::new(config.detection.clone(), references, capture);
        let mut session = Session::new(detector, DryRunInjector::new(), config.timings.clone(), cancel);

        let actions = MenuActions::new(ThreeStarSearch::new(config.search.clone()));
        let mut control = ControlLoop::new(Dispatcher::new(table, actions));
        if let Some(ticks) = ticks {
            control = control.with_max_ticks(ticks);
        }
        let report = control.run(&mut session);
        info!(
            "Session ended after {} ticks ({} handled)",
            report.ticks, report.handled_ticks
        );
    })?;

    while host.is_active() {
        if interrupted.load(Ordering::SeqCst) {
            info!("Interrupt received, stopping session");
            if !host.stop(stop_timeout) {
                warn!("Session still running after {:?}, exiting anyway", stop_timeout);
            }
            return Ok(());
        }
        thread::sleep(HOST_POLL);
    }

    host.join();
    Ok(())
}

fn probe(
    config_path: &Path,
    screenshot: &Path,
    label: Option<&str>,
    threshold: Option<f64>,
    no_scale: bool,
) -> Result<()> {
    let config = BotConfig::load(config_path)?;
    let references = config.load_references()?;
    let matcher_config = if no_scale {
        MatcherConfig {
            methods: config.detection.matcher.methods.clone(),
            default_threshold: config.detection.matcher.default_threshold,
            ..MatcherConfig::unscaled()
        }
    } else {
        config.detection.matcher.clone()
    };
    let matcher = TemplateMatcher::new(matcher_config);

    let mut frame = ImageUtils::load_color(screenshot)?;
    if let Some(region) = config.detection.capture_region {
        frame = region.crop(&frame)?;
    }
    let frame = ImageUtils::to_grayscale(&frame);

    if let Some(label) = label {
        if !references.contains(label) {
            bail!("No reference configured for '{}'", label);
        }
    }

    for reference in references.iter() {
        if label.is_some_and(|l| l != reference.label) {
            continue;
        }

        let template = matcher.scaled_template(&frame, reference);
        let scores = matcher.score_methods(&frame, &template);
        let threshold = threshold.unwrap_or(reference.threshold);
        let result = TemplateMatcher::fuse(&scores, threshold);

        println!("{} (threshold {:.3})", reference.label, threshold);
        for score in &scores {
            println!("  {:<14} {:.4} at {}", score.method.name(), score.score, score.location);
        }
        let verdict = if result.found { "HIT" } else { "miss" };
        match result.location {
            Some(location) => println!("  => {} {:.4} at {}", verdict, result.score, location),
            None => println!("  => {} (template larger than frame)", verdict),
        }
    }

    Ok(())
}

fn check(config_path: &Path) -> Result<()> {
    let config = BotConfig::load(config_path)?;
    let references = config.load_references()?;

    for label in config.required_labels() {
        if !references.contains(label) {
            bail!("Required label '{}' has no reference", label);
        }
    }

    info!(
        "Config OK: {} references, {} actions",
        references.len(),
        config.action_table()?.len()
    );
    Ok(())
}
