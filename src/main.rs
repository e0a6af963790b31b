// Mon Feb 02 2026 - Alex

use clap::Parser;
use colored::Colorize;
use itanium_class_recover::{
    config::Config,
    memory::{ImageMemory, MemoryReader},
    rtti::{CancelToken, ReconstructionSession},
    catalog::TypeCatalog,
    utils,
};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "0.2.0")]
#[command(about = "C++ class layout recovery from Itanium ABI RTTI", long_about = None)]
struct Args {
    /// ELF binary to analyze
    #[arg(short, long)]
    binary: PathBuf,

    /// Where to write the recovered layouts
    #[arg(short, long, default_value = "classes.json")]
    output: PathBuf,

    /// Repeat for more detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Skip the heuristic vtable scan for classes without a vtable symbol
    #[arg(long)]
    no_scan: bool,

    /// Worker threads for the heuristic scan (default: all cores)
    #[arg(long)]
    threads: Option<usize>,
}

fn main() {
    let args = Args::parse();
    utils::logging::init(utils::level_from_verbosity(args.verbose as usize + 1));

    println!("{}", "Itanium RTTI Class Recovery".cyan().bold());
    println!("{}", "=".repeat(50).cyan());
    println!();

    let start_time = Instant::now();

    let mut config = Config::new().with_heuristic_scan(!args.no_scan);
    if let Some(threads) = args.threads {
        config = config.with_max_threads(threads);
    }
    if let Err(e) = config.validate() {
        eprintln!("{} Bad configuration: {}", "[!]".red(), e);
        std::process::exit(1);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_threads)
        .build_global()
        .ok();

    println!("{} Loading binary: {}", "[*]".blue(), args.binary.display());
    let image = match ImageMemory::load(&args.binary) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("{} Failed to load binary: {}", "[!]".red(), e);
            std::process::exit(1);
        }
    };
    println!(
        "{} Binary loaded ({} sections, {} symbols)",
        "[+]".green(),
        image.sections().len(),
        image.symbols().len()
    );

    let image = Arc::new(image);
    let catalog = Arc::new(TypeCatalog::new());
    let mut session = ReconstructionSession::new(
        Arc::clone(&image) as Arc<dyn MemoryReader>,
        catalog,
        config,
    );
    session.load_image_symbols(&image);

    let token = CancelToken::new();
    let classes = session.reconstruct_all(&token);
    println!("{} Recovered {} class layouts", "[+]".green(), classes.len());

    let mut abstract_count = 0usize;
    for &id in &classes {
        if session.is_abstract(id, &token) {
            abstract_count += 1;
            println!(
                "    {} {} (abstract)",
                "[-]".yellow(),
                session.record(id).type_name
            );
        }
    }
    println!(
        "{} {} abstract, {} concrete",
        "[+]".green(),
        abstract_count,
        classes.len() - abstract_count
    );

    let json = session.export_layouts();
    let rendered = match serde_json::to_string_pretty(&json) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{} Failed to serialize layouts: {}", "[!]".red(), e);
            std::process::exit(1);
        }
    };
    match File::create(&args.output).and_then(|mut f| f.write_all(rendered.as_bytes())) {
        Ok(()) => println!("{} Wrote {}", "[+]".green(), args.output.display()),
        Err(e) => {
            eprintln!("{} Failed to write output: {}", "[!]".red(), e);
            std::process::exit(1);
        }
    }

    println!();
    println!(
        "{} Done in {:.2}s",
        "[+]".green(),
        start_time.elapsed().as_secs_f64()
    );
}
