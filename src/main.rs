mod config;
mod index;
mod map;
mod parser;
mod pipeline;
mod scraper;
mod server;
mod source;
mod store;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};

use config::{Settings, Workload};
use index::with_locality;
use map::render;
use parser::extract::extract_all;
use source::agenda::{AgendaLink, AgendaSource};
use source::geocode::AnyGeocoder;
use source::youtube::{self, VideoAuth, VideoEntry, YouTubeSource};
use source::{pdf, SourceKind, SourceRecord};

#[derive(Parser)]
#[command(
    name = "meeting_map",
    about = "Map the addresses mentioned in town meeting agendas and recordings"
)]
struct Cli {
    /// Settings file (default: ./meeting_map.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape agenda PDFs from the meetings page and map their addresses
    Agendas {
        /// Where to write the map (default: map.output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fetch channel videos and map the addresses in their descriptions
    Videos {
        /// YouTube channel id (default: video.channel_id)
        #[arg(long)]
        channel: Option<String>,
        /// Max videos to read (default: video.max_videos)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Read videos from a JSON list of {video_id, title, description} instead
        #[arg(long)]
        from_json: Option<PathBuf>,
        /// Where to write the map (default: map.output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Serve the agenda map over HTTP, rebuilt on every page load
    Serve {
        /// Address to listen on (default: server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the addresses found in one PDF or text file
    Extract {
        file: PathBuf,
        /// Read a text file as agenda pages (business sections only, loose pattern)
        #[arg(long)]
        agenda: bool,
        /// Title to parse for meeting date and type
        #[arg(long)]
        title: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Agendas { output } => {
            settings.validate(Workload::Agendas)?;
            if let Some(output) = output {
                settings.map.output = output;
            }
            let source = AgendaSource::new(&settings.agenda)?;
            let geocoder = AnyGeocoder::from_settings(&settings.geocoder)?;

            println!("Fetching agendas from {} ...", settings.agenda.listing_url);
            let (records, stats) = scraper::scrape_agendas(&source).await;
            println!(
                "Read {} agendas ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            write_map(&records, &geocoder, &settings).await
        }
        Commands::Videos {
            channel,
            limit,
            from_json,
            output,
        } => {
            if let Some(channel) = channel {
                settings.video.channel_id = Some(channel);
            }
            if limit.is_some() {
                settings.video.max_videos = limit;
            }
            if let Some(output) = output {
                settings.map.output = output;
            }
            let workload = if from_json.is_some() {
                Workload::LocalVideos
            } else {
                Workload::Videos
            };
            settings.validate(workload)?;
            let geocoder = AnyGeocoder::from_settings(&settings.geocoder)?;

            let records = match from_json {
                Some(path) => load_videos(&path, settings.video.max_videos)?,
                None => {
                    let channel = settings.video.channel_id.clone().unwrap_or_default();
                    let source = YouTubeSource::new(
                        VideoAuth::from_settings(&settings.video),
                        Duration::from_secs(settings.video.timeout_secs),
                    )?;
                    scraper::scrape_channel(&source, &channel, settings.video.max_videos).await
                }
            };
            println!("Loaded {} videos.", records.len());
            write_map(&records, &geocoder, &settings).await
        }
        Commands::Serve { bind } => {
            settings.validate(Workload::Agendas)?;
            if let Some(bind) = bind {
                settings.server.bind = bind;
            }
            server::serve(settings).await
        }
        Commands::Extract {
            file,
            agenda,
            title,
        } => {
            let record = read_local_record(&file, agenda, title.unwrap_or_default())?;
            let data = extract_all(&record);
            if let Some(m) = &data.meeting {
                println!("Date: {}  Type: {}", m.date, m.category);
            }
            if data.addresses.is_empty() {
                println!("No addresses found.");
            }
            for (i, address) in data.addresses.iter().enumerate() {
                println!(
                    "{:>3}. {}",
                    i + 1,
                    with_locality(address, &settings.map.default_locality)
                );
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn write_map(
    records: &[SourceRecord],
    geocoder: &AnyGeocoder,
    settings: &Settings,
) -> anyhow::Result<()> {
    let out = pipeline::render_records(records, geocoder, settings).await?;
    render::write_map(&settings.map.output, &out.html)?;
    println!(
        "Placed {} of {} addresses. Map saved to {}",
        out.plan.markers.len(),
        out.addresses,
        settings.map.output.display()
    );
    Ok(())
}

fn load_videos(path: &Path, cap: Option<usize>) -> anyhow::Result<Vec<SourceRecord>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let mut videos: Vec<VideoEntry> =
        serde_json::from_str(&text).with_context(|| format!("Invalid video list {:?}", path))?;
    youtube::cap_videos(&mut videos, cap);
    Ok(videos.into_iter().map(SourceRecord::from).collect())
}

fn read_local_record(path: &Path, agenda: bool, title: String) -> anyhow::Result<SourceRecord> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let link = AgendaLink {
        label: title,
        url: path.display().to_string(),
    };
    if bytes.starts_with(b"%PDF") {
        let pages = pdf::extract_pages(&bytes)?;
        return Ok(scraper::agenda_record(&link, &pages));
    }
    let kind = if agenda {
        SourceKind::Agenda
    } else {
        SourceKind::Video
    };
    Ok(SourceRecord {
        id: link.id(),
        kind,
        title: link.label,
        body: String::from_utf8_lossy(&bytes).into_owned(),
        url: link.url,
    })
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
