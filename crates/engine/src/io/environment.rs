use std::collections::HashMap;

/// Read access to environment variables.
pub trait EnvironmentReader: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentReader for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvironmentReader for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_environment_reads_variables() {
        temp_env::with_var("UPWARD_ENVIRONMENT_PROBE", Some("present"), || {
            assert_eq!(ProcessEnvironment.var("UPWARD_ENVIRONMENT_PROBE").as_deref(), Some("present"));
        });
        temp_env::with_var_unset("UPWARD_ENVIRONMENT_PROBE", || {
            assert_eq!(ProcessEnvironment.var("UPWARD_ENVIRONMENT_PROBE"), None);
        });
    }

    #[test]
    fn test_map_environment() {
        let environment = HashMap::from([("REGION".to_string(), "eu".to_string())]);
        assert_eq!(environment.var("REGION").as_deref(), Some("eu"));
        assert_eq!(environment.var("MISSING"), None);
    }
}
