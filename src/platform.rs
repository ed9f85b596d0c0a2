use std::env;

/// Describes the orchestration platform the container is executing inside.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RuntimePlatform {
    Kubernetes(KubernetesPlatform),
    #[default]
    Generic,
}

impl RuntimePlatform {
    /// Infers the current platform from the environment variables the kubelet injects
    /// (plus the downward-API variables commonly wired into the pod spec).
    pub fn detect() -> Self {
        match KubernetesPlatform::from_env() {
            Some(platform) => Self::Kubernetes(platform),
            None => Self::Generic,
        }
    }

    /// Returns the Kubernetes pod details when active.
    pub fn as_kubernetes(&self) -> Option<&KubernetesPlatform> {
        match self {
            RuntimePlatform::Kubernetes(platform) => Some(platform),
            RuntimePlatform::Generic => None,
        }
    }

    /// Short identifier used in logs and the health payload.
    pub fn name(&self) -> &'static str {
        match self {
            RuntimePlatform::Kubernetes(_) => "kubernetes",
            RuntimePlatform::Generic => "generic",
        }
    }
}

/// Pod details gleaned from environment variables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KubernetesPlatform {
    pub pod_name: Option<String>,
    pub namespace: Option<String>,
    pub node_name: Option<String>,
}

impl KubernetesPlatform {
    fn from_env() -> Option<Self> {
        env::var("KUBERNETES_SERVICE_HOST").ok()?;

        let pod_name = non_empty_var("POD_NAME").or_else(|| non_empty_var("HOSTNAME"));
        let namespace = non_empty_var("POD_NAMESPACE");
        let node_name = non_empty_var("NODE_NAME");

        Some(Self {
            pod_name,
            namespace,
            node_name,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::env_lock;

    const VARS: [&str; 5] = [
        "KUBERNETES_SERVICE_HOST",
        "POD_NAME",
        "HOSTNAME",
        "POD_NAMESPACE",
        "NODE_NAME",
    ];

    fn clear() {
        for key in VARS {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    fn detects_generic_outside_cluster() {
        let _guard = env_lock().lock().unwrap();
        clear();

        let platform = RuntimePlatform::detect();
        assert_eq!(platform, RuntimePlatform::Generic);
        assert!(platform.as_kubernetes().is_none());
        assert_eq!(platform.name(), "generic");
    }

    #[test]
    fn detects_kubernetes_pod() {
        let _guard = env_lock().lock().unwrap();
        clear();
        unsafe {
            env::set_var("KUBERNETES_SERVICE_HOST", "10.96.0.1");
            env::set_var("HOSTNAME", "it-worked-7d9c5-abcde");
            env::set_var("POD_NAMESPACE", "demo");
        }

        let platform = RuntimePlatform::detect();
        let pod = platform.as_kubernetes().expect("kubernetes");
        assert_eq!(pod.pod_name.as_deref(), Some("it-worked-7d9c5-abcde"));
        assert_eq!(pod.namespace.as_deref(), Some("demo"));
        assert!(pod.node_name.is_none());
        assert_eq!(platform.name(), "kubernetes");

        unsafe { env::set_var("POD_NAME", "explicit-pod") };
        let platform = RuntimePlatform::detect();
        assert_eq!(
            platform.as_kubernetes().and_then(|pod| pod.pod_name.as_deref()),
            Some("explicit-pod")
        );

        clear();
    }
}
