// One module per subcommand. main.rs parses arguments, builds the context and
// dispatches here; handlers write their output to stdout.

pub mod cost;
pub mod hubs;
pub mod optimize;
pub mod watch;

use hubroute_lib::EngineConfig;

use crate::output::OutputFormat;
use crate::terminal::ColorPalette;

/// State shared by all command handlers.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: EngineConfig,
    pub format: OutputFormat,
    pub palette: ColorPalette,
}

impl CommandContext {
    pub fn new(config: EngineConfig, format: OutputFormat, color: bool) -> Self {
        let palette = if color && format == OutputFormat::Text {
            ColorPalette::detect()
        } else {
            ColorPalette::plain()
        };
        Self {
            config,
            format,
            palette,
        }
    }
}
