use following_watch::error::BotError;
use following_watch::models::WatchMode;
use following_watch::notifier::CoalescePolicy;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::ChatId;

const CONFIG_FILE_NAME: &str = "config.toml";
const MAX_WINDOW_SECONDS: u64 = 86_400;

#[derive(Debug, Deserialize, Clone)]
#[serde(from = "RawConfig")]
pub struct Config {
    pub bot_token: String,
    pub watcher_token: Option<String>,
    pub owner: i64,
    pub api_address: Option<String>,
    pub following: HashSet<u64>,
    pub mode: WatchMode,
    pub window_seconds: u64,
    pub refresh_on_edit: bool,
}

/// Intermediate type for deserialization (`[telegram]` / `[follow]` sections).
#[derive(Deserialize)]
struct RawConfig {
    telegram: RawTelegram,
    follow: RawFollow,
}

#[derive(Deserialize)]
struct RawTelegram {
    bot_token: String,
    watcher_token: Option<String>,
    owner: i64,
    api_address: Option<String>,
}

#[derive(Deserialize)]
struct RawFollow {
    list: Vec<u64>,
    #[serde(default)]
    mode: WatchMode,
    #[serde(default = "default_window")]
    window_seconds: u64,
    #[serde(default)]
    refresh_on_edit: bool,
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            bot_token: raw.telegram.bot_token,
            watcher_token: raw.telegram.watcher_token,
            owner: raw.telegram.owner,
            api_address: raw.telegram.api_address,
            following: raw.follow.list.into_iter().collect(),
            mode: raw.follow.mode,
            window_seconds: raw.follow.window_seconds,
            refresh_on_edit: raw.follow.refresh_on_edit,
        }
    }
}

const fn default_window() -> u64 {
    60
}

impl Config {
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = config_file_path(explicit)?;
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            BotError::ConfigInvalid(format!(
                "Cannot read config at {}: {}",
                config_path.display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| {
            BotError::ConfigInvalid(format!("Invalid TOML in {}: {}", config_path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.bot_token.is_empty() {
            anyhow::bail!("telegram.bot_token must not be empty");
        }
        if self.watcher_token.as_deref().is_some_and(str::is_empty) {
            anyhow::bail!("telegram.watcher_token must not be empty when set");
        }
        if self.following.is_empty() {
            anyhow::bail!("follow.list must have at least one entry");
        }
        if self.owner <= 0 {
            anyhow::bail!("telegram.owner must be a user id, got {}", self.owner);
        }
        if self.window_seconds == 0 || self.window_seconds > MAX_WINDOW_SECONDS {
            anyhow::bail!("follow.window_seconds must be between 1 and {MAX_WINDOW_SECONDS}");
        }
        if let Some(ref address) = self.api_address
            && !(address.starts_with("http://") || address.starts_with("https://"))
        {
            anyhow::bail!("telegram.api_address must be an http(s) URL: {address}");
        }
        Ok(())
    }

    /// The watcher session falls back to the notifier bot's token.
    pub fn effective_watcher_token(&self) -> &str {
        self.watcher_token.as_deref().unwrap_or(&self.bot_token)
    }

    pub fn has_separate_watcher(&self) -> bool {
        self.watcher_token
            .as_deref()
            .is_some_and(|token| token != self.bot_token)
    }

    /// Notifications go to the owner in both modes: Bot API sessions cannot
    /// message themselves or other bots.
    pub fn recipient(&self) -> ChatId {
        ChatId(self.owner)
    }

    pub fn coalesce_policy(&self) -> CoalescePolicy {
        CoalescePolicy {
            window: Duration::from_secs(self.window_seconds),
            mode: self.mode,
            refresh_on_edit: self.refresh_on_edit,
        }
    }
}

/// Explicit path, else `config.toml` in the working directory, else
/// `~/.config/following-watch/config.toml`.
fn config_file_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(local);
    }
    let home = dirs::home_dir()
        .ok_or_else(|| BotError::ConfigInvalid("Cannot determine home directory".to_string()))?;
    Ok(home
        .join(".config")
        .join("following-watch")
        .join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_valid_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = "123:ABC"
            owner = 42

            [follow]
            list = [111, 222]
            window_seconds = 30
            refresh_on_edit = true
            "#,
        );
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.bot_token, "123:ABC");
        assert_eq!(config.owner, 42);
        assert_eq!(config.recipient(), ChatId(42));
        assert_eq!(config.following, HashSet::from([111, 222]));
        assert_eq!(config.mode, WatchMode::Broadcast);
        assert_eq!(config.window_seconds, 30);
        assert!(config.refresh_on_edit);
        assert!(config.api_address.is_none());
    }

    #[test]
    fn defaults_applied() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = "tok"
            owner = 1

            [follow]
            list = [5]
            "#,
        );
        let config = Config::load_from_path(&path).unwrap();
        let policy = config.coalesce_policy();
        assert_eq!(policy.window, Duration::from_secs(60));
        assert_eq!(policy.mode, WatchMode::Broadcast);
        assert!(!policy.refresh_on_edit);
        assert_eq!(config.effective_watcher_token(), "tok");
        assert!(!config.has_separate_watcher());
    }

    #[test]
    fn legacy_mtproto_keys_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = "tok"
            api_id = 1234
            api_hash = "abcdef"
            owner = 1

            [follow]
            list = [5]
            "#,
        );
        assert!(Config::load_from_path(&path).is_ok());
    }

    #[test]
    fn mirror_mode_targets_owner() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = "tok"
            watcher_token = "watch"
            owner = 77

            [follow]
            list = [5]
            mode = "mirror"
            "#,
        );
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.mode, WatchMode::Mirror);
        assert_eq!(config.effective_watcher_token(), "watch");
        assert!(config.has_separate_watcher());
        assert_eq!(config.recipient(), ChatId(77));
    }

    #[test]
    fn mirror_without_owner_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = "tok"

            [follow]
            list = [5]
            mode = "mirror"
            "#,
        );
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn group_id_as_owner_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = "tok"
            owner = -1001234567890

            [follow]
            list = [5]
            "#,
        );
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("telegram.owner"));
    }

    #[test]
    fn broadcast_without_owner_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = "tok"

            [follow]
            list = [5]
            "#,
        );
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn empty_token_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = ""
            owner = 1

            [follow]
            list = [5]
            "#,
        );
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("bot_token"));
    }

    #[test]
    fn empty_watcher_token_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = "tok"
            watcher_token = ""
            owner = 1

            [follow]
            list = [5]
            "#,
        );
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("watcher_token"));
    }

    #[test]
    fn empty_follow_list_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = "tok"
            owner = 1

            [follow]
            list = []
            "#,
        );
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("follow.list"));
    }

    #[test]
    fn negative_follow_id_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = "tok"
            owner = 1

            [follow]
            list = [-5]
            "#,
        );
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn window_bounds_enforced() {
        let tmp = tempfile::tempdir().unwrap();
        for (window, ok) in [(0, false), (1, true), (86_400, true), (86_401, false)] {
            let path = write_config(
                tmp.path(),
                &format!(
                    r#"
                    [telegram]
                    bot_token = "tok"
                    owner = 1

                    [follow]
                    list = [5]
                    window_seconds = {window}
                    "#
                ),
            );
            assert_eq!(Config::load_from_path(&path).is_ok(), ok, "window {window}");
        }
    }

    #[test]
    fn api_address_must_be_http() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            [telegram]
            bot_token = "tok"
            owner = 1
            api_address = "ftp://example.org"

            [follow]
            list = [5]
            "#,
        );
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("api_address"));
    }

    #[test]
    fn missing_file_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/etc/following-watch.toml");
        assert_eq!(config_file_path(Some(path)).unwrap(), path);
    }
}
