mod args;
mod logging;
mod op;
mod ops;
mod state;
mod version;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Demo, Derive, Init, Manifest, Version};

command_enum! {
    (Demo, Demo),
    (Derive, Derive),
    (Init, Init),
    (Manifest, Manifest),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let ctx = op::OpContext::new(args.config_path);

    let config = match ctx.config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    let log_level = args.log_level.unwrap_or(config.log_level);
    let guards = logging::init_logging(&log_level, config.log_dir.as_deref());

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            1
        }
    };

    // flush the non-blocking writers before exiting
    drop(guards);
    std::process::exit(code);
}
