use interlocking::config::Config;
use interlocking::*;
use log::{debug, info};
use std::path::PathBuf;
use structopt::StructOpt;

/// Interlocking -- block signalling and track reservation simulation
#[derive(StructOpt, Debug)]
#[structopt(name = "interlocking")]
struct Opt {
    /// Verbose mode (-v, -vv)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: u8,

    /// Layout file
    #[structopt(parse(from_os_str))]
    layout: PathBuf,

    /// Dispatch file
    #[structopt(parse(from_os_str))]
    dispatch: PathBuf,

    /// Settings file (JSON)
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    config: Option<PathBuf>,

    /// Output JSON history file
    #[structopt(short = "j", long = "json", parse(from_os_str))]
    json: Option<PathBuf>,

    /// Output JSON history as JavaScript
    #[structopt(short = "J", long = "javascript", parse(from_os_str))]
    javascript: Option<PathBuf>,

    /// Output tile visit times to file
    #[structopt(short = "n", long = "visits", parse(from_os_str))]
    visits: Option<PathBuf>,

    /// Output the reservations held at the end of the run
    #[structopt(short = "s", long = "snapshot", parse(from_os_str))]
    snapshot: Option<PathBuf>,

    /// Ticks to simulate
    #[structopt(short = "t", long = "ticks")]
    ticks: Option<u64>,

    /// Sighting distance in tiles
    #[structopt(long = "sighting")]
    sighting: Option<u32>,

    /// Bound on the choose signal route search (0 for none)
    #[structopt(long = "choose-steps")]
    choose_steps: Option<u32>,
}

fn run(opt: &Opt) -> AppResult<()> {
    let mut config = match opt.config {
        Some(ref f) => Config::from_json(&read_file(f)?)?,
        None => Config::default(),
    };
    if let Some(t) = opt.ticks { config.max_ticks = t; }
    if let Some(s) = opt.sighting { config.sighting_distance_tiles = s; }
    if let Some(s) = opt.choose_steps { config.max_choose_route_steps = s; }
    debug!("{:?}", config);

    let layout = get_layout(&opt.layout)?;
    info!("layout: {} tiles, {} signals, {} halts", layout.tiles.len(), layout.signals.len(), layout.halts.len());
    let dispatch = get_dispatch(&opt.dispatch)?;
    for x in &dispatch.actions {
        debug!("dispatch: {:?}", x);
    }

    let (history, records) = evaluate_plan_with_snapshot(layout.clone(), &dispatch, config)?;

    println!("# Infrastructure history:");
    for x in &history.inf {
        println!("> {:?}", x);
    }
    for &(ref name, ref x) in &history.convoys {
        println!("## Convoy \"{}\":", name);
        for x in x {
            println!("> {:?}", x);
        }
    }

    use std::fs::File;
    use std::io::{BufWriter, Write};
    if let Some(ref json) = opt.json {
        let file = File::create(json)?;
        let mut writer = BufWriter::new(&file);
        output::json::json_history(&layout, &history, &mut writer)?;
    }
    if let Some(ref javascript) = opt.javascript {
        let file = File::create(javascript)?;
        let mut writer = BufWriter::new(&file);
        output::json::javascript_history(&layout, &history, &mut writer)?;
    }
    if let Some(ref visits) = opt.visits {
        let file = File::create(visits)?;
        let mut writer = BufWriter::new(&file);
        write!(writer, "{}", output::history::visits(&history)?)?;
    }
    if let Some(ref snapshot) = opt.snapshot {
        let file = File::create(snapshot)?;
        let mut writer = BufWriter::new(&file);
        write!(writer, "{}", output::snapshot::to_json(&records)?)?;
    }
    Ok(())
}

pub fn main() {
    let opt = Opt::from_args();
    let filter = match opt.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
    match run(&opt) {
        Ok(()) => {}
        Err(e) => {
            println!("Error:\n{}", e.as_fail());
            std::process::exit(1);
        }
    }
}
