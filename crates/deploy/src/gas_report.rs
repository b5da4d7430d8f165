//! Deployment gas report.

use std::path::Path;

use anyhow::Context;
use comfy_table::{Table, presets::ASCII_MARKDOWN};
use serde_json::Value;

use crate::{chain_deployer::DeploymentEntry, config::GasReporterConfig};

const COINMARKETCAP_QUOTES_URL: &str =
    "https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest";

const WEI_PER_GWEI: f64 = 1e9;
const WEI_PER_ETHER: f64 = 1e18;

/// Gas spent by the deployments of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct GasReport {
    currency: String,
    token: String,
    /// Price of one `token` in `currency`, when known.
    token_price: Option<f64>,
    entries: Vec<DeploymentEntry>,
}

impl GasReport {
    /// Report over the fresh deployments in `entries`. Reused deployments cost nothing.
    pub fn new(config: &GasReporterConfig, entries: &[DeploymentEntry]) -> Self {
        Self {
            currency: config.currency.clone(),
            token: config.token.clone(),
            token_price: None,
            entries: entries
                .iter()
                .filter(|entry| entry.deployment.newly_deployed)
                .cloned()
                .collect(),
        }
    }

    pub fn with_token_price(mut self, price: f64) -> Self {
        self.token_price = Some(price);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_gas(&self) -> u64 {
        self.entries.iter().map(|entry| entry.deployment.gas_used).sum()
    }

    pub fn render(&self) -> String {
        let mut table = Table::new();
        table.load_preset(ASCII_MARKDOWN).force_no_tty();

        let mut header = vec![
            "Contract".to_string(),
            "Address".to_string(),
            "Gas used".to_string(),
            "Gas price (gwei)".to_string(),
            format!("Cost ({})", self.token),
        ];
        if self.token_price.is_some() {
            header.push(format!("Cost ({})", self.currency));
        }
        table.set_header(header);

        for entry in &self.entries {
            let deployment = &entry.deployment;
            let cost = deployment.gas_used as f64 * deployment.effective_gas_price as f64
                / WEI_PER_ETHER;

            let mut row = vec![
                entry.contract.clone(),
                deployment.address.to_string(),
                deployment.gas_used.to_string(),
                format!("{:.2}", deployment.effective_gas_price as f64 / WEI_PER_GWEI),
                format!("{cost:.6}"),
            ];
            if let Some(price) = self.token_price {
                row.push(format!("{:.2}", cost * price));
            }
            table.add_row(row);
        }

        format!("{table}\nTotal gas used: {}\n", self.total_gas())
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::write(path, self.render())
            .context(format!("Failed to write gas report to {}", path.display()))
    }
}

/// Price of one `token` in `currency` from CoinMarketCap.
pub async fn fetch_token_price(api_key: &str, token: &str, currency: &str) -> anyhow::Result<f64> {
    let client = crate::rpc::create_client()?;
    let response: Value = client
        .get(COINMARKETCAP_QUOTES_URL)
        .header("X-CMC_PRO_API_KEY", api_key)
        .query(&[("symbol", token), ("convert", currency)])
        .send()
        .await
        .context("Failed to reach CoinMarketCap")?
        .error_for_status()
        .context("CoinMarketCap request failed")?
        .json()
        .await
        .context("Failed to parse CoinMarketCap response")?;

    quote_price(&response, token, currency)
}

fn quote_price(response: &Value, token: &str, currency: &str) -> anyhow::Result<f64> {
    response
        .pointer(&format!("/data/{token}/quote/{currency}/price"))
        .and_then(Value::as_f64)
        .with_context(|| format!("No {token}/{currency} quote in CoinMarketCap response"))
}

/// Write the gas report of `entries` when the reporter is enabled.
///
/// Failures are logged and never abort the run.
pub async fn report(
    config: &GasReporterConfig,
    api_key: Option<&str>,
    entries: &[DeploymentEntry],
) {
    if !config.enabled {
        return;
    }

    let mut report = GasReport::new(config, entries);
    if report.is_empty() {
        tracing::debug!("No fresh deployments, skipping gas report");
        return;
    }

    if let Some(api_key) = api_key {
        match fetch_token_price(api_key, &config.token, &config.currency).await {
            Ok(price) => report = report.with_token_price(price),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "Failed to fetch token price");
            }
        }
    }

    match report.write(&config.output_file) {
        Ok(()) => tracing::info!(
            path = %config.output_file.display(),
            total_gas = report.total_gas(),
            "Gas report written"
        ),
        Err(e) => tracing::warn!(error = %format!("{e:#}"), "Failed to write gas report"),
    }
}
