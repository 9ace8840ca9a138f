use anyhow::Context;
use log::info;
use url::Url;

pub fn reqwest_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connection_verbose(true)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Downloads `maidx_in_lv_data.js` as text.
pub async fn fetch_in_lv_js(client: &reqwest::Client, url: Url) -> anyhow::Result<String> {
    info!("Downloading internal levels from {url}");
    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("While downloading {url}"))?;
    Ok(response.text().await?)
}
