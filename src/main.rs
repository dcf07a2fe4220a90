use clap::Parser;

mod args;
mod registry;

fn main() {
    let parsed_args = args::Args::parse();
    if parsed_args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    if let Err(e) = registry::run(&parsed_args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
