use std::env;

use crate::{models::Target, navigation::routes};

/// AppConfig
///
/// The gate service's configuration, loaded once at startup and immutable afterwards.
/// Pulled into handlers via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the log format and the x-user-id dev bypass.
    pub env: Env,
    // Supabase project URL; the Auth API lives under /auth/v1.
    pub supabase_url: String,
    // Public anon key sent as the `apikey` header on Auth API calls.
    pub supabase_anon_key: String,
    // Secret used to validate Supabase-issued access tokens.
    pub jwt_secret: String,
    // Profile database. Without it every viewer is on the basic plan.
    pub db_url: Option<String>,
    // Where RequireUpgrade sends the viewer.
    pub upgrade_path: String,
    // Where signed-out viewers land.
    pub home_path: String,
    pub bind_addr: String,
}

/// Env
///
/// Switches between local development conveniences and production behaviour.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

impl Default for AppConfig {
    /// Safe, non-panicking values for test scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "local-anon-key".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            db_url: None,
            upgrade_path: routes::CHOOSE_PLAN.to_string(),
            home_path: routes::HOME.to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// In production, panics when any Supabase setting is missing, so the service never
    /// starts validating tokens against a placeholder secret.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let defaults = Self::default();

        let (supabase_url, supabase_anon_key, jwt_secret) = match env {
            Env::Production => (
                env::var("SUPABASE_URL").expect("FATAL: SUPABASE_URL required in prod"),
                env::var("SUPABASE_ANON_KEY").expect("FATAL: SUPABASE_ANON_KEY required in prod"),
                env::var("SUPABASE_JWT_SECRET")
                    .expect("FATAL: SUPABASE_JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("SUPABASE_URL").unwrap_or(defaults.supabase_url),
                env::var("SUPABASE_ANON_KEY").unwrap_or(defaults.supabase_anon_key),
                env::var("SUPABASE_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            ),
        };

        Self {
            env,
            supabase_url,
            supabase_anon_key,
            jwt_secret,
            db_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            upgrade_path: env::var("UPGRADE_PATH").unwrap_or(defaults.upgrade_path),
            home_path: env::var("HOME_PATH").unwrap_or(defaults.home_path),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }

    pub fn upgrade_target(&self) -> Target {
        Target::new(self.upgrade_path.clone())
    }

    pub fn home_target(&self) -> Target {
        Target::new(self.home_path.clone())
    }
}
