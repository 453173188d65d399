use anyhow::{Context, Result};
use clap::Parser;
use moodpath::collector::Collector;
use moodpath::collector::retry::RetryPolicy;
use moodpath::config::AppConfig;
use moodpath::dataset;
use moodpath::model::TransitionModel;
use moodpath::spotify::SpotifyClient;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "moodpath",
    version,
    about = "Generate a Spotify playlist that moves from one mood to another"
)]
struct Cli {
    /// Mood the playlist starts in
    #[arg(long = "start_emotion")]
    start_emotion: String,

    /// Mood the playlist ends in
    #[arg(long = "end_emotion")]
    end_emotion: String,

    /// Target playlist length in minutes
    #[arg(long)]
    duration: u32,

    /// Re-collect the dataset from Spotify before training
    #[arg(long = "update_data")]
    update_data: bool,

    /// Dataset CSV (defaults to config dataset_path)
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Generated playlist CSV (defaults to config output_path)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the CSV only, don't create the playlist on Spotify
    #[arg(long = "no_upload")]
    no_upload: bool,

    /// Verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    // CLI > config > defaults
    let dataset_path = cli.dataset.unwrap_or_else(|| config.dataset_path.clone());
    let output_path = cli.output.unwrap_or_else(|| config.output_path.clone());

    let credentials = config
        .credentials()
        .context("Spotify credentials are required")?;
    let client = SpotifyClient::new(credentials, &config.spotify);
    let mut collector = Collector::new(
        client,
        RetryPolicy::from(&config.retry),
        config.collect.clone(),
    );

    let data = if cli.update_data {
        log::info!("Collecting new data...");
        let rows = collector.collect_all_mood_data(&config.moods);
        dataset::save_tracks(&dataset_path, &rows)
            .with_context(|| format!("Failed to save dataset to {}", dataset_path.display()))?;
        log::info!("Dataset saved to {}", dataset_path.display());
        rows
    } else {
        log::info!("Loading existing dataset...");
        dataset::load_dataset(&dataset_path).context("Failed to load dataset")?
    };

    let mut model = TransitionModel::new(&config.model);
    let summary = model.train(&data).context("Failed to train model")?;
    println!(
        "Trained on {} tracks: {} mood clusters, {} transitions",
        summary.tracks, summary.nodes, summary.edges
    );

    let playlist = model
        .generate_playlist(&cli.start_emotion, &cli.end_emotion, cli.duration)
        .context("Failed to generate playlist")?;

    dataset::save_tracks(&output_path, &playlist.tracks)
        .with_context(|| format!("Failed to save playlist to {}", output_path.display()))?;
    println!(
        "Playlist: {} tracks, {:.1} minutes via {}",
        playlist.tracks.len(),
        playlist.total_duration_ms as f64 / 60_000.0,
        playlist.path.join(" -> ")
    );
    println!("Saved to {}", output_path.display());

    if cli.no_upload {
        return Ok(());
    }

    let name = moodpath::playlist_name(&cli.start_emotion, &cli.end_emotion);
    let description = moodpath::playlist_description(
        &cli.start_emotion,
        &cli.end_emotion,
        &chrono::Local::now(),
    );
    match collector.upload_playlist(&name, &description, &playlist.tracks) {
        Some(created) => match created.url() {
            Some(url) => println!("Playlist created: {url}"),
            None => println!("Playlist created: {}", created.name),
        },
        None => log::info!("Playlist saved locally to {}", output_path.display()),
    }

    Ok(())
}
