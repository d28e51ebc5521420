use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_runtime::env_config::file::{EnvConfigFileKind, EnvConfigFiles};
use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_opsworks::config::Credentials;
use aws_sdk_opsworks::Client as OpsWorksClient;

use crate::aws::discovery::{
    self, ComputeApi, ComputeInstance, FleetApi, FleetInstance, InstanceSource,
    NormalizedInstance, Reservation,
};
use crate::aws::retry::CallPolicy;
use crate::config::{Account, CredentialContext};
use crate::{OpsworksSshError, Result};

/// AWS clients bound to one account's credentials
#[derive(Clone)]
pub struct AwsClients {
    pub opsworks: OpsWorksClient,
    config: SdkConfig,
}

impl AwsClients {
    /// Create clients for an account, from its static keys or its named profile
    pub async fn for_account(context: &CredentialContext, policy: &CallPolicy) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(context.opsworks_region.clone()))
            .retry_config(policy.retry_config())
            .timeout_config(policy.timeout_config());

        loader = match &context.keys {
            Some(keys) => loader.credentials_provider(Credentials::new(
                keys.access_key_id.clone(),
                keys.secret_access_key.clone(),
                keys.session_token.clone(),
                None,
                "opsworks-ssh",
            )),
            None => {
                // resolve the profile from the same file the account came from
                if let Some(path) = &context.config_file {
                    loader = loader.profile_files(
                        EnvConfigFiles::builder()
                            .with_file(EnvConfigFileKind::Config, path)
                            .include_default_credentials_file(true)
                            .build(),
                    );
                }
                loader.profile_name(&context.account)
            }
        };

        let config = loader.load().await;
        let opsworks = OpsWorksClient::new(&config);

        Self { opsworks, config }
    }

    /// EC2 client for a specific region, sharing the account's credentials
    pub fn ec2(&self, region: &str) -> Ec2Client {
        let conf = aws_sdk_ec2::config::Builder::from(&self.config)
            .region(Region::new(region.to_string()))
            .build();
        Ec2Client::from_conf(conf)
    }
}

#[async_trait]
impl FleetApi for AwsClients {
    async fn describe_stacks(&self) -> Result<Vec<String>> {
        let output = self
            .opsworks
            .describe_stacks()
            .send()
            .await
            .map_err(|e| OpsworksSshError::opsworks("stacks", e))?;

        Ok(output
            .stacks()
            .iter()
            .filter_map(|s| s.stack_id().map(String::from))
            .collect())
    }

    async fn describe_instances_in_group(&self, stack_id: &str) -> Result<Vec<FleetInstance>> {
        let output = self
            .opsworks
            .describe_instances()
            .stack_id(stack_id)
            .send()
            .await
            .map_err(|e| OpsworksSshError::opsworks(&format!("stack {}", stack_id), e))?;

        Ok(output
            .instances()
            .iter()
            .map(|i| FleetInstance {
                instance_id: i.instance_id().map(String::from),
                hostname: i.hostname().map(String::from),
                status: i.status().map(String::from),
                elastic_ip: i.elastic_ip().map(String::from),
                public_ip: i.public_ip().map(String::from),
            })
            .collect())
    }
}

#[async_trait]
impl ComputeApi for AwsClients {
    async fn describe_instances_in_region(&self, region: &str) -> Result<Vec<Reservation>> {
        let output = self
            .ec2(region)
            .describe_instances()
            .send()
            .await
            .map_err(|e| OpsworksSshError::ec2(region, e))?;

        Ok(output
            .reservations()
            .iter()
            .map(|r| Reservation {
                instances: r
                    .instances()
                    .iter()
                    .map(|i| ComputeInstance {
                        instance_id: i.instance_id().map(String::from),
                        state: i
                            .state()
                            .and_then(|s| s.name())
                            .map(|n| n.as_str().to_string()),
                        public_ip_address: i.public_ip_address().map(String::from),
                        tags: i
                            .tags()
                            .iter()
                            .filter_map(|t| Some((t.key()?.to_string(), t.value()?.to_string())))
                            .collect(),
                    })
                    .collect(),
            })
            .collect())
    }
}

/// Discovers instances through the real AWS APIs
#[derive(Debug, Clone, Default)]
pub struct AwsInstanceSource {
    pub policy: CallPolicy,
}

impl AwsInstanceSource {
    pub fn new(policy: CallPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl InstanceSource for AwsInstanceSource {
    async fn discover(&self, account: &Account) -> Result<Vec<NormalizedInstance>> {
        let active = account.activate();
        let clients = AwsClients::for_account(&active.credentials, &self.policy).await;
        discovery::discover(&active, &clients, &clients, &self.policy).await
    }
}
