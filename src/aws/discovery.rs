use async_trait::async_trait;

use crate::aws::retry::CallPolicy;
use crate::config::{Account, ActiveAccount};
use crate::Result;

/// Status / state name of instances that are skipped
pub const STOPPED: &str = "stopped";

/// Tag holding the EC2 instance name
pub const NAME_TAG: &str = "Name";

/// Instance record as returned by the fleet API (OpsWorks)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FleetInstance {
    pub instance_id: Option<String>,
    pub hostname: Option<String>,
    pub status: Option<String>,
    pub elastic_ip: Option<String>,
    pub public_ip: Option<String>,
}

/// Instance record as returned by the compute API (EC2)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputeInstance {
    pub instance_id: Option<String>,
    pub state: Option<String>,
    pub public_ip_address: Option<String>,
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservation {
    pub instances: Vec<ComputeInstance>,
}

/// Provider-independent instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInstance {
    pub ip: Option<String>,
    pub hostname: String,
}

#[async_trait]
pub trait FleetApi: Send + Sync {
    /// Ids of every stack visible to the account
    async fn describe_stacks(&self) -> Result<Vec<String>>;

    async fn describe_instances_in_group(&self, stack_id: &str) -> Result<Vec<FleetInstance>>;
}

#[async_trait]
pub trait ComputeApi: Send + Sync {
    async fn describe_instances_in_region(&self, region: &str) -> Result<Vec<Reservation>>;
}

/// Anything that can list the instances of an account
#[async_trait]
pub trait InstanceSource: Send + Sync {
    async fn discover(&self, account: &Account) -> Result<Vec<NormalizedInstance>>;
}

/// Discover the running instances of one activated account.
///
/// Stack ids take precedence over regions. Results keep stack/region order
/// and are not deduplicated.
pub async fn discover(
    active: &ActiveAccount<'_>,
    fleet: &dyn FleetApi,
    compute: &dyn ComputeApi,
    policy: &CallPolicy,
) -> Result<Vec<NormalizedInstance>> {
    let mut stack_ids = active.stack_ids.to_vec();

    if stack_ids.is_empty() && active.discover_stacks {
        stack_ids = policy.run("describe stacks", fleet.describe_stacks()).await?;
        tracing::debug!(account = %active.credentials.account, stacks = stack_ids.len(), "listed stacks");
    }

    let mut instances = Vec::new();

    if stack_ids.is_empty() {
        for region in active.regions {
            let what = format!("describe instances in {}", region);
            let reservations = policy
                .run(&what, compute.describe_instances_in_region(region))
                .await?;

            instances.extend(
                reservations
                    .into_iter()
                    .flat_map(|r| r.instances)
                    .filter(|i| i.state.as_deref() != Some(STOPPED))
                    .map(normalize_compute),
            );
        }
    } else {
        for stack_id in &stack_ids {
            let what = format!("describe instances in stack {}", stack_id);
            let found = policy
                .run(&what, fleet.describe_instances_in_group(stack_id))
                .await?;

            instances.extend(
                found
                    .into_iter()
                    .filter(|i| i.status.as_deref() != Some(STOPPED))
                    .map(normalize_fleet),
            );
        }
    }

    Ok(instances)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn normalize_fleet(instance: FleetInstance) -> NormalizedInstance {
    let ip = non_empty(instance.elastic_ip).or_else(|| non_empty(instance.public_ip));
    let hostname = non_empty(instance.hostname)
        .or_else(|| non_empty(instance.instance_id))
        .unwrap_or_default();

    NormalizedInstance { ip, hostname }
}

pub fn normalize_compute(instance: ComputeInstance) -> NormalizedInstance {
    let name = instance
        .tags
        .iter()
        .find(|(key, _)| key == NAME_TAG)
        .map(|(_, value)| value.clone());

    let hostname = match non_empty(name) {
        Some(name) => name,
        None => {
            tracing::warn!(
                instance = instance.instance_id.as_deref().unwrap_or("?"),
                "instance has no Name tag, using its id"
            );
            non_empty(instance.instance_id).unwrap_or_default()
        }
    };

    NormalizedInstance {
        ip: non_empty(instance.public_ip_address),
        hostname,
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use crate::config::{AccountStore, CredentialsFile};
    use crate::OpsworksSshError;
    use std::time::Duration;

    fn account(content: &str) -> Account {
        AccountStore::from_file(&CredentialsFile::parse(content)).accounts()[0].clone()
    }

    fn policy() -> CallPolicy {
        CallPolicy::new(Duration::from_secs(1), 0)
    }

    fn opsworks(id: &str, host: &str, status: &str, eip: Option<&str>, ip: Option<&str>) -> FleetInstance {
        FleetInstance {
            instance_id: Some(id.to_string()),
            hostname: Some(host.to_string()),
            status: Some(status.to_string()),
            elastic_ip: eip.map(String::from),
            public_ip: ip.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_stack_path_prefers_elastic_ip_and_skips_stopped() {
        let account = account("[opsworks]\nIAM = a\n[a]\nopsworks-stack-id = s1, s2\naws_region = us-east-1\n");
        let mut aws = FakeAws::default();
        aws.fleet.insert(
            "s1".to_string(),
            vec![
                opsworks("i-1", "web1", "online", Some("9.9.9.9"), Some("1.1.1.1")),
                opsworks("i-2", "web2", "stopped", None, Some("2.2.2.2")),
            ],
        );
        aws.fleet.insert(
            "s2".to_string(),
            vec![opsworks("i-3", "db1", "booting", None, Some("3.3.3.3"))],
        );

        let found = discover(&account.activate(), &aws, &aws, &policy()).await.unwrap();

        assert_eq!(
            found,
            vec![
                NormalizedInstance { ip: Some("9.9.9.9".to_string()), hostname: "web1".to_string() },
                NormalizedInstance { ip: Some("3.3.3.3".to_string()), hostname: "db1".to_string() },
            ]
        );
        // regions are not consulted when stacks are configured
        assert_eq!(*aws.calls.lock().unwrap(), vec!["stack:s1", "stack:s2"]);
    }

    #[tokio::test]
    async fn test_region_path_flattens_reservations_in_order() {
        let account = account("[opsworks]\nIAM = a\n[a]\naws_region = eu-west-1, us-east-1\n");
        let mut aws = FakeAws::default();
        aws.regions.insert(
            "us-east-1".to_string(),
            vec![Reservation {
                instances: vec![ec2_instance("i-us", Some("api"), Some("5.5.5.5"), "running")],
            }],
        );
        aws.regions.insert(
            "eu-west-1".to_string(),
            vec![
                Reservation {
                    instances: vec![
                        ec2_instance("i-eu1", Some("worker"), Some("4.4.4.4"), "running"),
                        ec2_instance("i-eu2", Some("old"), Some("6.6.6.6"), "stopped"),
                    ],
                },
                Reservation {
                    instances: vec![ec2_instance("i-eu3", None, None, "pending")],
                },
            ],
        );

        let found = discover(&account.activate(), &aws, &aws, &policy()).await.unwrap();
        let hosts: Vec<&str> = found.iter().map(|i| i.hostname.as_str()).collect();

        assert_eq!(hosts, vec!["worker", "i-eu3", "api"]);
        assert_eq!(found[1].ip, None);
    }

    #[tokio::test]
    async fn test_malformed_region_discovers_nothing() {
        let account = account("[opsworks]\nIAM = a\n[a]\naws_region = us east 1\n");
        let aws = FakeAws::default();

        let found = discover(&account.activate(), &aws, &aws, &policy()).await.unwrap();

        assert!(found.is_empty());
        assert!(aws.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_discover_stacks_option_lists_stacks_first() {
        let account = account("[opsworks]\nIAM = a\n[a]\nopsworks-discover-stacks = true\naws_region = us-east-1\n");
        let mut aws = FakeAws::default();
        aws.stacks = vec!["s9".to_string()];
        aws.fleet.insert(
            "s9".to_string(),
            vec![opsworks("i-9", "app9", "online", None, Some("7.7.7.7"))],
        );

        let found = discover(&account.activate(), &aws, &aws, &policy()).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(*aws.calls.lock().unwrap(), vec!["stacks", "stack:s9"]);
    }

    #[tokio::test]
    async fn test_discover_stacks_falls_back_to_regions() {
        let account = account("[opsworks]\nIAM = a\n[a]\nopsworks-discover-stacks = true\naws_region = us-east-1\n");
        let aws = FakeAws::default();

        discover(&account.activate(), &aws, &aws, &policy()).await.unwrap();

        assert_eq!(*aws.calls.lock().unwrap(), vec!["stacks", "region:us-east-1"]);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_discovery_without_repeat() {
        let account = account("[opsworks]\nIAM = a\n[a]\naws_region = us-east-1, eu-west-1\n");
        let aws = FakeAws {
            failing_region: Some("us-east-1".to_string()),
            ..FakeAws::default()
        };
        let policy = CallPolicy::new(Duration::from_secs(1), 2);

        let result = discover(&account.activate(), &aws, &aws, &policy).await;

        assert!(matches!(result, Err(OpsworksSshError::Discovery { .. })));
        assert_eq!(*aws.calls.lock().unwrap(), vec!["region:us-east-1"]);
    }

    #[test]
    fn test_normalize_fleet_falls_back_to_public_ip() {
        let normalized = normalize_fleet(opsworks("i-1", "web1", "online", Some(""), Some("1.2.3.4")));
        assert_eq!(normalized.ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(normalized.hostname, "web1");
    }
}
