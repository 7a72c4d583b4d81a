//! doccheck - checks the SQL examples in Markdown guides against PostgreSQL.

use db_doccheck::app;
use db_doccheck::cli::Cli;
use db_doccheck::logging;
use db_doccheck::report::EXIT_FATAL;
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();

    match &cli.log_file {
        Some(path) => logging::init_file_logging(path, cli.verbose),
        None => logging::init_stderr_logging(cli.verbose),
    }

    let code = match app::run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}: {}", e.category(), e);
            EXIT_FATAL
        }
    };

    std::process::exit(code);
}
