use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Which listen.moe channel to tune into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Jpop,
    Kpop,
}

impl Channel {
    pub fn gateway_url(self) -> &'static str {
        match self {
            Channel::Jpop => "wss://listen.moe/gateway_v2",
            Channel::Kpop => "wss://listen.moe/kpop/gateway_v2",
        }
    }

    pub fn stream_url(self) -> &'static str {
        match self {
            Channel::Jpop => "https://listen.moe/stream",
            Channel::Kpop => "https://listen.moe/kpop/stream",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Channel::Jpop => "J-POP",
            Channel::Kpop => "K-POP",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub channel: Channel,
    /// Overrides the channel's gateway URL (useful against a local test server).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            channel: Channel::default(),
            url: None,
        }
    }
}

impl GatewayConfig {
    pub fn url(&self) -> &str {
        self.url
            .as_deref()
            .unwrap_or_else(|| self.channel.gateway_url())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Binary name or path of the media engine.
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Extra arguments placed before the stream URL.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Overrides the channel's stream URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(default = "default_volume")]
    pub default_volume: u8,
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
    /// How long to wait for the player to exit after `q` before killing it.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            extra_args: Vec::new(),
            stream_url: None,
            default_volume: default_volume(),
            volume_step: default_volume_step(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl PlayerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_footer_interval_ms")]
    pub footer_interval_ms: u64,
    #[serde(default = "default_cover_interval_ms")]
    pub cover_interval_ms: u64,
    #[serde(default = "default_show_cover")]
    pub show_cover: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            footer_interval_ms: default_footer_interval_ms(),
            cover_interval_ms: default_cover_interval_ms(),
            show_cover: default_show_cover(),
        }
    }
}

impl RenderConfig {
    pub fn footer_interval(&self) -> Duration {
        Duration::from_millis(self.footer_interval_ms.max(10))
    }

    pub fn cover_interval(&self) -> Duration {
        Duration::from_millis(self.cover_interval_ms.max(10))
    }
}

fn default_binary() -> String {
    "mplayer".to_string()
}

fn default_volume() -> u8 {
    100
}

fn default_volume_step() -> u8 {
    5
}

fn default_shutdown_grace_ms() -> u64 {
    3000
}

fn default_footer_interval_ms() -> u64 {
    150
}

fn default_cover_interval_ms() -> u64 {
    500
}

fn default_show_cover() -> bool {
    true
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            tracing::info!("config: wrote defaults to {}", config_path.display());
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Stream URL the player should open.
    pub fn stream_url(&self) -> &str {
        self.player
            .stream_url
            .as_deref()
            .unwrap_or_else(|| self.gateway.channel.stream_url())
    }
}
