//! Composition root: wires the progress source, tracker, renderer and
//! stdin command loop together.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracker_engine::{
    ProgressTracker, ReqwestProgressSource, StopOutcome, Visibility, VisibilityController,
    VisibilitySignal,
};
use tracker_logging::{tracker_info, tracker_warn};

use crate::cli::CliOptions;
use crate::commands::{Command, HELP};
use crate::config::TrackerConfig;
use crate::logging::{self, LogSettings};
use crate::render;

pub async fn run(options: CliOptions) -> anyhow::Result<()> {
    let mut config = match &options.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(base_url) = options.base_url {
        config.base_url = base_url;
    }
    if let Some(path) = &options.write_config {
        config.save(path)?;
        println!("Wrote config to {}", path.display());
        return Ok(());
    }

    logging::initialize(&LogSettings {
        destination: options.log,
        file: config.log_file.clone(),
        verbose: options.verbose,
    });
    tracker_info!("opwatch {} starting", env!("CARGO_PKG_VERSION"));

    let source = ReqwestProgressSource::new(config.source_settings())
        .with_context(|| format!("cannot track operations at '{}'", config.base_url))?;
    let (visibility, signal) = VisibilitySignal::channel(Visibility::Visible);
    let mut tracker = ProgressTracker::new(Arc::new(source), config.tracker_settings(), signal);

    let last_frame: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let subscription = tracker.subscribe(move |snapshot| {
        let frame = render::render(snapshot);
        let Ok(mut last) = last_frame.lock() else {
            return;
        };
        if *last != frame {
            println!();
            for line in &frame {
                println!("{line}");
            }
            *last = frame;
        }
    });

    tracker_info!("Tracking operations at {}", config.base_url);
    println!("{HELP}");
    tracker.start();

    let result = command_loop(&tracker, &visibility).await;

    tracker.stop();
    subscription.unsubscribe();
    tracker_info!("Tracker stopped");
    result
}

async fn command_loop(
    tracker: &ProgressTracker,
    visibility: &VisibilityController,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match command {
            Command::Stop(id) => {
                let dispatcher = tracker.dispatcher();
                tokio::spawn(async move {
                    match dispatcher.request_stop(&id).await {
                        Ok(StopOutcome::Acknowledged) => {
                            println!("Stop requested for {id}");
                        }
                        Ok(StopOutcome::AlreadyFinished) => {
                            println!("{id} has already finished");
                        }
                        Err(err) => {
                            tracker_warn!("{}", err);
                            println!("Could not stop {id}: {err}");
                        }
                    }
                });
            }
            Command::Inspect(id) => match tracker.inspect(&id).await {
                Ok(view) => println!("{}", render::render_operation(&view)),
                Err(err) => println!("Could not inspect {id}: {err}"),
            },
            Command::Hide => {
                visibility.set(Visibility::Hidden);
                println!("Polling slowed down");
            }
            Command::Show => {
                visibility.set(Visibility::Visible);
                println!("Polling at full speed");
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }
    Ok(())
}
