mod users;

pub use users::{RelationshipConfig, ResourceConfig, UserConfig};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::{validate_api, ApiDescription, RouteDescriptor, SecuritySchemeDescriptor};
use crate::error::ConfigurationError;
use crate::policy::{Resource, Roster};

pub const DEFAULT_CONFIG_PATH: &str = "act.toml";
pub const CONFIG_PATH_ENV: &str = "ACT_CONFIG";

pub trait CommonConfig {
    fn default() -> Self;
    fn complete(&mut self) -> Result<()>;
}

/// See: [`shellexpand::full`].
pub fn expandenv(name: &str, s: impl AsRef<str>) -> Result<String> {
    let s =
        shellexpand::full(s.as_ref()).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}

/// Config path from the command line, then `ACT_CONFIG`, then `act.toml` in
/// the working directory.
pub fn resolve_path(path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = path {
        return path;
    }
    match env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

pub fn load_config<T>(path: &Path) -> Result<T>
where
    T: CommonConfig + DeserializeOwned,
{
    let s = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            bail!("config file '{}' not found", path.display());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read config file: {}", path.display()));
        }
    };

    let mut cfg: T = toml::from_str(&s)
        .with_context(|| format!("parse config toml: {}", path.display()))?;
    cfg.complete().context("validate config")?;
    Ok(cfg)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    pub api_base_url: String,

    #[serde(default = "TestConfig::default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "LogsConfig::default")]
    pub logs: LogsConfig,

    #[serde(default)]
    pub resources: Vec<ResourceConfig>,

    #[serde(default)]
    pub users: Vec<UserConfig>,

    /// JSON file with `routes` and `security_schemes`, as extracted from
    /// the OpenAPI document of the API under test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_descriptor: Option<String>,

    #[serde(default)]
    pub routes: Vec<RouteDescriptor>,

    #[serde(default)]
    pub security_schemes: Vec<SecuritySchemeDescriptor>,

    #[serde(skip)]
    api: ApiDescription,
}

impl CommonConfig for TestConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            timeout_secs: Self::default_timeout_secs(),
            logs: LogsConfig::default(),
            resources: Vec::new(),
            users: Vec::new(),
            api_descriptor: None,
            routes: Vec::new(),
            security_schemes: Vec::new(),
            api: ApiDescription::default(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        if self.api_base_url.is_empty() {
            bail!("api_base_url cannot be empty");
        }
        self.api_base_url = expandenv("api_base_url", &self.api_base_url)?;
        let parsed = match Url::parse(&self.api_base_url) {
            Ok(url) => url,
            Err(_) => bail!("invalid api_base_url '{}'", self.api_base_url),
        };
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => bail!("invalid api_base_url scheme, expect 'http' or 'https', not '{scheme}'"),
        }

        if self.timeout_secs == 0 {
            bail!("timeout_secs should be greater than 0");
        }

        self.logs.complete().context("logs")?;

        let mut names = HashSet::new();
        for resource in self.resources.iter() {
            if resource.name.is_empty() {
                return Err(ConfigurationError::EmptyResourceName.into());
            }
            if !names.insert(resource.name.as_str()) {
                return Err(ConfigurationError::DuplicateResource(resource.name.clone()).into());
            }
        }

        for user in self.users.iter_mut() {
            user.complete(&names)
                .with_context(|| format!("user '{}'", user.identifier))?;
        }

        let mut api = match self.api_descriptor {
            Some(ref path) => {
                let path = expandenv("api_descriptor", path)?;
                let data = fs::read_to_string(&path)
                    .with_context(|| format!("read api descriptor: {path}"))?;
                serde_json::from_str(&data)
                    .with_context(|| format!("parse api descriptor json: {path}"))?
            }
            None => ApiDescription::default(),
        };
        api.extend(ApiDescription {
            routes: self.routes.clone(),
            security_schemes: self.security_schemes.clone(),
        });
        validate_api(&api, &self.resources())?;
        self.api = api;

        Ok(())
    }
}

impl TestConfig {
    pub fn default_timeout_secs() -> u64 {
        30
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .map(|r| Resource::new(r.name.as_str()))
            .collect()
    }

    /// Descriptor file entries first, then the inline ones.
    pub fn api(&self) -> &ApiDescription {
        &self.api
    }

    pub fn build_roster(&self) -> Result<Roster, ConfigurationError> {
        let mut roster = Roster::new();
        for user_cfg in self.users.iter() {
            let user = roster.create_user(user_cfg.identifier.as_str(), user_cfg.password.as_str())?;
            for rel in user_cfg.relationships.iter() {
                user.relate_to(
                    &Resource::new(rel.resource.as_str()),
                    rel.relationship,
                    rel.identifier.clone(),
                );
            }
        }
        Ok(roster)
    }

    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .context("build http client")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "LogsConfig::default_level")]
    pub level: String,
}

impl CommonConfig for LogsConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        match self.level.as_str() {
            "error" | "warn" | "info" | "debug" => Ok(()),
            _ => bail!("unknown log level '{}'", self.level),
        }
    }
}

impl LogsConfig {
    pub fn default_level() -> String {
        String::from("info")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::policy::{Action, PolicyDecisionPoint};

    use super::*;

    const BASIC_CONFIG: &str = r#"
api_base_url = "http://localhost:3333"

[[resources]]
name = "Todo"

[[resources]]
name = "User"

[[users]]
identifier = "alice"
password = "alice-pw"

[[users.relationships]]
resource = "Todo"
relationship = "owns"
identifier = 123

[[users.relationships]]
resource = "User"
relationship = "view"

[[users]]
identifier = "bob"
password = "bob-pw"

[[security_schemes]]
name = "bearerAuth"
kind = "http_bearer"

[security_schemes.auth_endpoint]
path = "/login"
identifier_field = { name = "email" }
password_field = { name = "password" }
response_field = { name = "token" }

[[routes]]
path = "/todos/{id}"
method = "GET"
security = "bearerAuth"

[[routes.resources]]
resource_name = "Todo"
resource_access = "read"
parameter_name = "id"
parameter_location = "path"
"#;

    fn parse(s: &str) -> Result<TestConfig> {
        let mut cfg: TestConfig = toml::from_str(s)?;
        cfg.complete()?;
        Ok(cfg)
    }

    #[test]
    fn test_parse_config() {
        let cfg = parse(BASIC_CONFIG).unwrap();
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.logs.level, "info");
        assert_eq!(cfg.api().routes.len(), 1);
        assert_eq!(cfg.api().security_schemes.len(), 1);

        let roster = cfg.build_roster().unwrap();
        assert_eq!(roster.len(), 2);

        let alice = roster.get("alice").unwrap();
        let todo = Resource::new("Todo");
        assert!(PolicyDecisionPoint::is_allowed(
            alice,
            Action::Delete,
            &todo,
            Some(&"123".into())
        ));
        assert!(PolicyDecisionPoint::is_allowed(
            alice,
            Action::Read,
            &Resource::new("User"),
            Some(&999.into())
        ));
    }

    #[test]
    fn test_invalid_configs() {
        let cases = [
            BASIC_CONFIG.replace("http://localhost:3333", "ftp://localhost"),
            BASIC_CONFIG.replace("resource_name = \"Todo\"", "resource_name = \"Note\""),
            BASIC_CONFIG.replace("resource = \"User\"", "resource = \"Group\""),
            BASIC_CONFIG.replace("name = \"User\"", "name = \"Todo\""),
            BASIC_CONFIG.replace("security = \"bearerAuth\"", "security = \"cookieAuth\""),
            BASIC_CONFIG.replace("parameter_name = \"id\"", "parameter_name = \"todoId\""),
            format!("{BASIC_CONFIG}\n[logs]\nlevel = \"trace\"\n"),
        ];
        for case in cases {
            assert!(parse(&case).is_err(), "{case}");
        }
    }

    #[test]
    fn test_duplicate_user() {
        let s = BASIC_CONFIG.replace("identifier = \"bob\"", "identifier = \"alice\"");
        let cfg = parse(&s).unwrap();
        assert_eq!(
            cfg.build_roster().err(),
            Some(ConfigurationError::DuplicateUser(String::from("alice")))
        );
    }

    #[test]
    fn test_password_expand() {
        env::set_var("ACT_TEST_CAROL_PASSWORD", "carol-secret");
        let s = BASIC_CONFIG.replace("\"bob-pw\"", "\"$ACT_TEST_CAROL_PASSWORD\"");
        let cfg = parse(&s).unwrap();
        let roster = cfg.build_roster().unwrap();
        assert_eq!(roster.get("bob").unwrap().password(), "carol-secret");
    }

    #[test]
    fn test_api_descriptor_file() {
        let path = env::temp_dir().join(format!("act-descriptor-{}.json", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(
            br#"{"routes": [{"path": "/health", "method": "GET"}], "security_schemes": []}"#,
        )
        .unwrap();

        let s = format!(
            "api_descriptor = \"{}\"\n{BASIC_CONFIG}",
            path.display()
        );
        let cfg = parse(&s).unwrap();
        assert_eq!(cfg.api().routes.len(), 2);
        assert_eq!(cfg.api().routes[0].path, "/health");
        assert_eq!(cfg.api().routes[1].path, "/todos/{id}");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config::<TestConfig>(Path::new("/path/not/exists/act.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }
}
