mod preview;

use futures::executor::block_on;
use preview::PreviewConfig;
use preview::USAGE;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match PreviewConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("sdt-preview: {error}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match block_on(preview::run(&config)) {
        Ok(report) => {
            match report.cache_version.as_deref() {
                Some(version) => println!("navigation cache: {version}"),
                None => println!("navigation cache: not installed"),
            }
            for visit in &report.visits {
                println!("{} -> {} | {}", visit.requested, visit.location, visit.title);
                if !visit.summary.is_empty() {
                    println!("    {}", visit.summary);
                }
            }
            if !report.recent_tools.is_empty() {
                println!("recent tools: {}", report.recent_tools.join(", "));
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("sdt-preview: {error}");
            ExitCode::FAILURE
        }
    }
}
