//! Ordered deploy scripts, selected by tag.

use alloy_core::primitives::Address;

use crate::{
    ChainSession, DeployError, DeployerIdentity, MockProvisioner, NetworkRegistry,
    orchestrator::{DeploymentOrchestrator, DeploymentReport},
};

/// Tags a deploy script can be selected by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Tag {
    All,
    Mocks,
    FundMe,
}

/// Everything a script needs to run against one chain session.
pub struct ScriptContext<'a> {
    pub session: &'a ChainSession,
    pub identity: &'a DeployerIdentity,
    pub registry: &'a NetworkRegistry,
    pub provisioner: &'a MockProvisioner,
    pub orchestrator: &'a DeploymentOrchestrator,
    pub credential_present: bool,
}

/// What a script did.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutput {
    /// Nothing to do on this network.
    Skipped,
    Mock(Address),
    Deployment(DeploymentReport),
}

#[async_trait::async_trait]
pub trait DeployScript: Send + Sync {
    fn name(&self) -> &'static str;

    fn tags(&self) -> &'static [Tag];

    async fn run(&self, ctx: &ScriptContext<'_>) -> Result<ScriptOutput, DeployError>;
}

/// Deploys the price feed stand-in on development networks.
pub struct MocksScript;

#[async_trait::async_trait]
impl DeployScript for MocksScript {
    fn name(&self) -> &'static str {
        "00-deploy-mocks"
    }

    fn tags(&self) -> &'static [Tag] {
        &[Tag::All, Tag::Mocks]
    }

    async fn run(&self, ctx: &ScriptContext<'_>) -> Result<ScriptOutput, DeployError> {
        if !ctx.registry.is_development(&ctx.session.network_name) {
            return Ok(ScriptOutput::Skipped);
        }

        let address = ctx
            .provisioner
            .get_or_create_mock_dependency_address(ctx.session)
            .await?;
        Ok(ScriptOutput::Mock(address))
    }
}

/// Deploys `FundMe` and verifies it where possible.
pub struct FundMeScript;

#[async_trait::async_trait]
impl DeployScript for FundMeScript {
    fn name(&self) -> &'static str {
        "01-deploy-fund-me"
    }

    fn tags(&self) -> &'static [Tag] {
        &[Tag::All, Tag::FundMe]
    }

    async fn run(&self, ctx: &ScriptContext<'_>) -> Result<ScriptOutput, DeployError> {
        let report = ctx
            .orchestrator
            .deploy_and_verify(ctx.session, ctx.identity, ctx.credential_present)
            .await?;
        Ok(ScriptOutput::Deployment(report))
    }
}

/// The scripts of this project, in execution order.
pub fn default_scripts() -> Vec<Box<dyn DeployScript>> {
    vec![Box::new(MocksScript), Box::new(FundMeScript)]
}

/// Whether a script tagged `script_tags` runs for `selected`. No selection means [`Tag::All`].
pub fn is_selected(script_tags: &[Tag], selected: &[Tag]) -> bool {
    if selected.is_empty() {
        return script_tags.contains(&Tag::All);
    }
    selected.iter().any(|tag| script_tags.contains(tag))
}

/// Run the selected scripts in order, stopping at the first failure.
pub async fn run_scripts(
    scripts: &[Box<dyn DeployScript>],
    ctx: &ScriptContext<'_>,
    selected: &[Tag],
) -> Result<Vec<(&'static str, ScriptOutput)>, DeployError> {
    let mut outputs = Vec::new();

    for script in scripts {
        if !is_selected(script.tags(), selected) {
            tracing::debug!(script = script.name(), "Script not selected");
            continue;
        }

        tracing::debug!(
            script = script.name(),
            network = %ctx.session.network_name,
            "Running deploy script"
        );
        let output = script.run(ctx).await?;
        outputs.push((script.name(), output));
    }

    Ok(outputs)
}
