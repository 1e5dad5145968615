//! Parishmap: vector tile container and church catalog server.

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use parishmap::{Args, Config, MapServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug {
        Level::DEBUG
    } else if args.silent {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Create configuration from arguments
    let config = Config::from(args);

    // Create and run the server
    let server = MapServer::new(config);

    println!(
        r#"
Parishmap is starting at http://{}

Endpoints:
  GET /metadata
  GET /tiles/{{z}}/{{x}}/{{y}}
  GET /churches?page=&limit=&search=
  GET /filter?title=&country=&type=&address=&rite=&jurisdiction=

Press Ctrl+C to stop the server.
"#,
        server.bind_address()
    );

    server.run().await
}
