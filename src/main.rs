use std::process;

use mtls_demo_server::config::{Args, ServerSettings};
use mtls_demo_server::logging::Logger;

#[tokio::main]
async fn main() {
    let args = Args::parse(std::env::args()).unwrap_or_else(|e| e.exit());
    let log = Logger::from_env(args.verbose());

    let settings = match ServerSettings::try_from(args) {
        Ok(settings) => settings,
        Err(e) => fatal(&log, &e),
    };

    let server = match mtls_demo_server::start(&settings, &log) {
        Ok(server) => server,
        Err(e) => fatal(&log, &e),
    };

    if let Err(e) = server.serve().await {
        fatal(&log, &e);
    }
}

fn fatal(log: &Logger, err: &dyn std::error::Error) -> ! {
    log.error(format_args!("{}", err));
    log.flush();
    process::exit(1);
}
