use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering a TOML file and `GMXLP_`-prefixed
    /// environment variables over the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value fails to parse.
    pub fn load(path: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("GMXLP_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// Like [`ConfigLoader::load`], with an additional per-profile overlay
    /// (`config/Config.<profile>.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(path: &str, profile: &str) -> Result<AppConfig> {
        let base = path.trim_end_matches(".toml");
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Toml::file(format!("{base}.{profile}.toml")))
            .merge(Env::prefixed("GMXLP_").split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ConfigLoader::load("/nonexistent/Config.toml").unwrap();
        assert_eq!(config.strategy.profile, "balanced");
        assert!(config.strategy.validate().is_ok());
    }
}
