use noid_rs::{cli, config, telemetry};

fn main() {
    let cli = cli::parse_from(std::env::args_os());
    let settings = config::load_or_default();
    telemetry::init(cli.verbose, &settings);

    if let Err(e) = cli::run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
