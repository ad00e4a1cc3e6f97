use anyhow::Context;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub app: AppConfig,
    pub redis: RedisConfig,
    pub seating: SeatingConfig,
    pub weather: WeatherConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format `{}` (expected pretty or json)", other),
        }
    }
}

// Настройки приложения
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            environment: "development".to_string(),
            rust_log: "seat_showcase=debug,tower_http=debug".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    /// Всё в памяти процесса, без Redis. Для демо и тестов.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("unknown store backend `{}` (expected redis or memory)", other),
        }
    }
}

// Настройки Redis
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub backend: StoreBackend,
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

// Схема зала
#[derive(Debug, Clone)]
pub struct SeatingConfig {
    /// Сколько раз переключение места перечитывает карту при конфликте записи.
    pub cas_max_attempts: u32,
}

impl Default for SeatingConfig {
    fn default() -> Self {
        Self { cas_max_attempts: 32 }
    }
}

// Внешний API погоды
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: String,
    pub base_url: String,
    pub cache_ttl_seconds: u64,
    pub default_city: String,
    pub timeout_seconds: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            cache_ttl_seconds: 300,
            default_city: "Seattle".to_string(),
            timeout_seconds: 10,
        }
    }
}

// Настройки Circuit Breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout_seconds: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Сборка конфигурации из произвольного источника переменных.
    /// Отсутствующая переменная - значение по умолчанию, некорректная - ошибка.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let text = |name: &str, default: String| lookup(name).unwrap_or(default);

        Ok(Config {
            app: AppConfig {
                host: text("HOST", defaults.app.host),
                port: parsed(&lookup, "PORT", defaults.app.port)?,
                environment: text("ENVIRONMENT", defaults.app.environment),
                rust_log: text("RUST_LOG", defaults.app.rust_log),
                log_format: parsed(&lookup, "LOG_FORMAT", defaults.app.log_format)?,
            },
            redis: RedisConfig {
                backend: parsed(&lookup, "STORE_BACKEND", defaults.redis.backend)?,
                url: text("REDIS_URL", defaults.redis.url),
            },
            seating: SeatingConfig {
                cas_max_attempts: parsed(
                    &lookup,
                    "SEAT_CAS_MAX_ATTEMPTS",
                    defaults.seating.cas_max_attempts,
                )?,
            },
            weather: WeatherConfig {
                api_key: text("OPENWEATHER_API_KEY", defaults.weather.api_key),
                base_url: text("OPENWEATHER_BASE_URL", defaults.weather.base_url),
                cache_ttl_seconds: parsed(
                    &lookup,
                    "WEATHER_CACHE_TTL_SECONDS",
                    defaults.weather.cache_ttl_seconds,
                )?,
                default_city: text("WEATHER_DEFAULT_CITY", defaults.weather.default_city),
                timeout_seconds: parsed(
                    &lookup,
                    "WEATHER_TIMEOUT_SECONDS",
                    defaults.weather.timeout_seconds,
                )?,
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: parsed(
                    &lookup,
                    "CIRCUIT_BREAKER_FAILURE_THRESHOLD",
                    defaults.circuit_breaker.failure_threshold,
                )?,
                timeout_seconds: parsed(
                    &lookup,
                    "CIRCUIT_BREAKER_TIMEOUT_SECONDS",
                    defaults.circuit_breaker.timeout_seconds,
                )?,
            },
        })
    }
}

fn parsed<T, F>(lookup: &F, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} must be a valid value, got `{}`", name, raw)),
    }
}
