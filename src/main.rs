use std::env;

use hotlayer::{cli, logging};

fn main() {
    logging::init("info");
    let args: Vec<String> = env::args().collect();
    std::process::exit(cli::run_with_args(&args));
}
