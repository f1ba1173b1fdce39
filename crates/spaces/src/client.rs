use reqwest::{Client, redirect::Policy};
use tracing::debug;

use crate::config::DownloaderConfig;
use crate::error::DownloadError;
use crate::proxy::build_proxy_from_config;

/// Builds the HTTP client shared by the stream resolver, the playlist fetcher
/// and the segment acquirer.
pub fn create_client(config: &DownloaderConfig) -> Result<Client, DownloadError> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .danger_accept_invalid_certs(config.danger_accept_invalid_certs);

    builder = if config.follow_redirects {
        builder.redirect(Policy::limited(10))
    } else {
        builder.redirect(Policy::none())
    };

    if let Some(proxy_config) = &config.proxy {
        let proxy =
            build_proxy_from_config(proxy_config).map_err(DownloadError::proxy_configuration)?;
        debug!(proxy = %proxy_config.url, "Using proxy");
        builder = builder.proxy(proxy);
    } else if !config.use_system_proxy {
        builder = builder.no_proxy();
    }

    builder.build().map_err(DownloadError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::{ProxyConfig, ProxyType};

    #[test]
    fn builds_with_defaults() {
        assert!(create_client(&DownloaderConfig::default()).is_ok());
    }

    #[test]
    fn invalid_proxy_is_a_configuration_error() {
        let config = DownloaderConfig::builder()
            .with_proxy(ProxyConfig::new("http://exa mple.com:80", ProxyType::Http))
            .build();
        assert!(matches!(
            create_client(&config),
            Err(DownloadError::ProxyConfiguration { .. })
        ));
    }
}
