//! Store selection for cumulus-cli
//!
//! Works out which store a command talks to and opens it with the
//! configured transfer settings.

use anyhow::{Context, Result};
use cumulus_cloud::{is_store_url, CloudConfig, CloudPath, CloudStore};
use cumulus_core::config::Config;
use tracing::{debug, warn};

/// Pick the store URL: `--store` / `CUMULUS_STORE` first, then the config file
pub fn resolve_store_url(cli_store: Option<&str>, config: &Config) -> Result<String> {
    let url = cli_store
        .map(str::to_string)
        .or_else(|| config.store.default_url.clone())
        .context("No store given. Pass --store <URL>, set CUMULUS_STORE or [store].default_url")?;

    if !is_store_url(&url) {
        anyhow::bail!(
            "'{}' is not a store URL. Use s3://, gs://, az:// or file://",
            url
        );
    }
    Ok(url)
}

/// Open the store behind a URL
pub fn open_store(url: &str, config: &Config) -> Result<CloudStore> {
    let path = parse_store_path(url)?;
    debug!("Using {}", describe_location(&path));

    if let Err(e) = check_credentials(&path) {
        warn!("{:#}", e);
    }

    let store = CloudStore::open(&path)
        .with_context(|| format!("Failed to open store {}", url))?
        .with_config(CloudConfig::from(&config.transfer));
    Ok(store)
}

/// Parse and validate a store URL
pub fn parse_store_path(url: &str) -> Result<CloudPath> {
    CloudPath::parse(url).with_context(|| format!("Failed to parse store URL: {}", url))
}

/// Get a human-readable description of the store location
pub fn describe_location(path: &CloudPath) -> String {
    let provider = match path.scheme.as_str() {
        "s3" => "Amazon S3 bucket",
        "gs" => "Google Cloud Storage bucket",
        "az" | "azblob" => "Azure Blob Storage container",
        "file" => return format!("local directory '{}'", path.bucket),
        _ => "Unknown store",
    };
    if path.prefix.is_empty() {
        format!("{} '{}'", provider, path.bucket)
    } else {
        format!("{} '{}' under '{}'", provider, path.bucket, path.prefix)
    }
}

/// Check that credentials for the provider are present in the environment
///
/// A failure is only a hint: instance metadata or a credentials file may
/// still provide access.
pub fn check_credentials(path: &CloudPath) -> Result<()> {
    let set = |name: &str| std::env::var_os(name).is_some();

    match path.scheme.as_str() {
        "s3" => {
            if !set("AWS_ACCESS_KEY_ID") || !set("AWS_SECRET_ACCESS_KEY") {
                anyhow::bail!(
                    "AWS credentials not found in the environment (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY)"
                );
            }
        }
        "gs" => {
            if !set("GOOGLE_APPLICATION_CREDENTIALS") && !set("GOOGLE_SERVICE_ACCOUNT") {
                anyhow::bail!(
                    "Google Cloud credentials not found in the environment (GOOGLE_APPLICATION_CREDENTIALS or GOOGLE_SERVICE_ACCOUNT)"
                );
            }
        }
        "az" | "azblob" => {
            if !set("AZURE_STORAGE_ACCOUNT_NAME")
                || (!set("AZURE_STORAGE_ACCOUNT_KEY") && !set("AZURE_STORAGE_SAS_TOKEN"))
            {
                anyhow::bail!(
                    "Azure credentials not found in the environment (AZURE_STORAGE_ACCOUNT_NAME with AZURE_STORAGE_ACCOUNT_KEY or AZURE_STORAGE_SAS_TOKEN)"
                );
            }
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_store_url() {
        let mut config = Config::default();
        assert!(resolve_store_url(None, &config).is_err());

        config.store.default_url = Some("gs://from-config".to_string());
        assert_eq!(resolve_store_url(None, &config).unwrap(), "gs://from-config");
        assert_eq!(
            resolve_store_url(Some("s3://from-cli"), &config).unwrap(),
            "s3://from-cli"
        );
        assert!(resolve_store_url(Some("/not/a/url"), &config).is_err());
    }

    #[test]
    fn test_describe_location() {
        let desc = describe_location(&CloudPath::parse("s3://my-bucket/runs").unwrap());
        assert!(desc.contains("Amazon S3"));
        assert!(desc.contains("my-bucket"));
        assert!(desc.contains("runs"));

        let desc = describe_location(&CloudPath::parse("gs://gcs-bucket").unwrap());
        assert!(desc.contains("Google Cloud Storage"));

        let desc = describe_location(&CloudPath::parse("file:///srv/data").unwrap());
        assert_eq!(desc, "local directory '/srv/data'");
    }

    #[test]
    fn test_local_store_needs_no_credentials() {
        assert!(check_credentials(&CloudPath::parse("file:///srv/data").unwrap()).is_ok());
    }
}
