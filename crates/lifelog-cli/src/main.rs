use clap::Parser;
use lifelog_cli::{CliArgs, LifelogApp, init_logging};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(args.verbose, args.quiet);

    let result = match LifelogApp::from_args(&args) {
        Ok(app) => app.run(args).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
