use webterm_core::config::AppConfig;
use webterm_pty::{default_shell, ShellInfo};

/// Shared application state for the server.
///
/// Holds everything the routing layer needs per request — no global
/// registries; handlers receive this by injection.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub shell: ShellInfo,
}

impl AppState {
    /// Resolve the shell sessions will spawn and build the state.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let shell = match &config.shell.program {
            Some(path) => ShellInfo::from_path(path).ok_or_else(|| {
                anyhow::anyhow!("configured shell not found: {}", path.display())
            })?,
            None => default_shell()
                .ok_or_else(|| anyhow::anyhow!("no usable shell found on this host"))?,
        };

        Ok(Self { config, shell })
    }
}
