use anyhow::Result;

use ptylog::config::{Cli, Settings};
use ptylog::logging::setup_logging;
use ptylog::wrap::WrapRunner;

fn main() -> Result<()> {
    // Parse CLI arguments; a missing command exits with status 2
    let cli = Cli::parse_args();
    let command = cli.wrap_command();

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(&cli);
    settings.apply_env();
    settings.validate();

    // Setup logging
    setup_logging(cli.debug, settings.log_file.as_deref());

    // Run the wrapped program
    let code = WrapRunner::new(settings, command).run()?;
    std::process::exit(code);
}
