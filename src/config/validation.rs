use crate::config::types::{Config, CrawlConfig, CrawlMode, LoginConfig, LoginType, PlatformConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_platform(&config.platform)?;
    validate_crawl(&config.crawl)?;
    validate_login(&config.login)?;
    if config.cache.cron_interval_seconds < 1 {
        return Err(ConfigError::Validation(
            "cache cron-interval-seconds must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_platform(platform: &PlatformConfig) -> Result<(), ConfigError> {
    let parsed = Url::parse(&platform.entry_url).map_err(|e| {
        ConfigError::Validation(format!("entry-url '{}' is invalid: {}", platform.entry_url, e))
    })?;
    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "entry-url must be http(s), got scheme '{}'",
            parsed.scheme()
        )));
    }

    if platform.cookie_domain.is_empty() {
        return Err(ConfigError::Validation(
            "cookie-domain cannot be empty".to_string(),
        ));
    }

    if platform.block_marker.is_empty() {
        return Err(ConfigError::Validation(
            "block-marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_crawl(crawl: &CrawlConfig) -> Result<(), ConfigError> {
    if crawl.max_concurrency < 1 || crawl.max_concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 64, got {}",
            crawl.max_concurrency
        )));
    }

    // The selected mode must have targets to work on.
    match crawl.mode {
        CrawlMode::Search => {
            if crawl.keyword_list().is_empty() {
                return Err(ConfigError::Validation(
                    "search mode requires non-empty keywords".to_string(),
                ));
            }
        }
        CrawlMode::Detail => {
            if crawl.item_ids.is_empty() {
                return Err(ConfigError::Validation(
                    "detail mode requires non-empty item-ids".to_string(),
                ));
            }
        }
        CrawlMode::Creator => {
            if crawl.creator_refs.is_empty() {
                return Err(ConfigError::Validation(
                    "creator mode requires non-empty creator-refs".to_string(),
                ));
            }
        }
    }

    if crawl.max_items_per_keyword < 1 {
        return Err(ConfigError::Validation(
            "max-items-per-keyword must be >= 1".to_string(),
        ));
    }

    if crawl.max_comments_per_item < 1 {
        return Err(ConfigError::Validation(
            "max-comments-per-item must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_login(login: &LoginConfig) -> Result<(), ConfigError> {
    if login.auth_cookie_name.is_empty() {
        return Err(ConfigError::Validation(
            "auth-cookie-name cannot be empty".to_string(),
        ));
    }

    if login.login_type == LoginType::Cookie
        && login.cookies.as_deref().unwrap_or("").trim().is_empty()
    {
        return Err(ConfigError::Validation(
            "cookie login requires a non-empty cookies string".to_string(),
        ));
    }

    Ok(())
}
