use sluice_dsl::FlowModel;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    config::RuntimeConfig,
    domain::cache::InstanceCache,
    domain::flow_deployment::FlowDeployment,
    domain::repository::FlowDeploymentRepository,
    CoreError,
};

/// A deployment together with its parsed model
#[derive(Debug, Clone)]
pub struct FlowInfo {
    /// The stored deployment
    pub deployment: FlowDeployment,
    /// Its parsed model
    pub flow_model: Arc<FlowModel>,
}

impl FlowInfo {
    fn parse(deployment: FlowDeployment) -> Result<Self, CoreError> {
        let flow_model = Arc::new(deployment.parse_model()?);
        Ok(Self {
            deployment,
            flow_model,
        })
    }
}

/// Loads deployments and parses their models
pub struct FlowModelResolver {
    deployments: Arc<dyn FlowDeploymentRepository>,
    cache: Arc<dyn InstanceCache>,
    config: RuntimeConfig,
}

impl FlowModelResolver {
    /// Create a new resolver
    pub fn new(
        deployments: Arc<dyn FlowDeploymentRepository>,
        cache: Arc<dyn InstanceCache>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            deployments,
            cache,
            config,
        }
    }

    /// Resolve a deployment by id, checking the cache first
    pub async fn resolve_by_deployment(&self, flow_deploy_id: &str) -> Result<FlowInfo, CoreError> {
        if let Some(deployment) = self.cached_deployment(flow_deploy_id).await {
            debug!(flow_deploy_id, "Flow info cache hit");
            return FlowInfo::parse(deployment);
        }

        let deployment = self
            .deployments
            .find_by_deploy_id(flow_deploy_id)
            .await?
            .ok_or_else(|| CoreError::FlowDeploymentNotFound(flow_deploy_id.to_string()))?;
        FlowInfo::parse(deployment)
    }

    /// Resolve the most recent deployment of a module.
    ///
    /// The result is cached under its deployment id so that later
    /// [`resolve_by_deployment`](Self::resolve_by_deployment) calls skip the store.
    pub async fn resolve_latest_by_module(&self, flow_module_id: &str) -> Result<FlowInfo, CoreError> {
        let deployment = self
            .deployments
            .find_latest_by_module_id(flow_module_id)
            .await?
            .ok_or_else(|| {
                CoreError::FlowDeploymentNotFound(format!("no deployment for module {}", flow_module_id))
            })?;

        let info = FlowInfo::parse(deployment)?;
        self.cache_deployment(&info.deployment).await;
        Ok(info)
    }

    async fn cached_deployment(&self, flow_deploy_id: &str) -> Option<FlowDeployment> {
        let key = self.config.flow_info_key(flow_deploy_id);
        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(deployment) => Some(deployment),
                Err(e) => {
                    warn!(flow_deploy_id, error = %e, "Undecodable flow info cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(flow_deploy_id, error = %e, "Flow info cache read failed");
                None
            }
        }
    }

    async fn cache_deployment(&self, deployment: &FlowDeployment) {
        let key = self.config.flow_info_key(&deployment.flow_deploy_id);
        let raw = match serde_json::to_string(deployment) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(flow_deploy_id = %deployment.flow_deploy_id, error = %e, "Cannot encode flow info");
                return;
            }
        };
        match self
            .cache
            .set_with_expiry(&key, raw, self.config.flow_info_ttl())
            .await
        {
            Ok(()) => info!(flow_deploy_id = %deployment.flow_deploy_id, "Cached flow info"),
            Err(e) => warn!(flow_deploy_id = %deployment.flow_deploy_id, error = %e, "Flow info cache write failed"),
        }
    }
}
