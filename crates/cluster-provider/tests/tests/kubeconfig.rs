// Integration tests for the kubeconfig-backed strategies

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use cluster_provider::credentials::testing::{TEST_CA, encode};
use cluster_provider::provider::{KubeconfigProvider, ProviderError};
use cluster_provider::{BaseConfig, ClusterProvider, ProviderKind, RequestContext, new_provider};

fn kubeconfig(contexts: &[&str], current: &str) -> String {
	let mut yaml = format!(
		r#"apiVersion: v1
kind: Config
current-context: {current}
clusters:
- name: lab
  cluster:
    server: https://lab.example.com:6443
    certificate-authority-data: {ca}
users:
- name: admin
  user:
    token: admin-token
contexts:
"#,
		ca = encode(TEST_CA)
	);
	for name in contexts {
		yaml.push_str(&format!(
			"- name: {name}\n  context:\n    cluster: lab\n    user: admin\n    namespace: {name}\n"
		));
	}
	yaml
}

fn write(path: &Path, contexts: &[&str], current: &str) -> anyhow::Result<()> {
	std::fs::write(path, kubeconfig(contexts, current))?;
	Ok(())
}

/// Every context is a target and each one resolves to a client
#[tokio::test]
async fn test_kubeconfig_targets() -> anyhow::Result<()> {
	let dir = tempfile::tempdir()?;
	let path = dir.path().join("config");
	write(&path, &["dev", "staging", "prod"], "staging")?;

	let config = BaseConfig::with_strategy(ProviderKind::Kubeconfig).with_kubeconfig(&path);
	let provider = new_provider(&config)?;
	let ctx = RequestContext::new();

	assert_eq!(provider.kind(), ProviderKind::Kubeconfig);
	assert!(provider.supports_multi_target());
	assert_eq!(provider.default_target(), "staging");
	assert_eq!(provider.target_parameter_name(), "context");
	assert_eq!(
		provider.list_targets(&ctx).await?,
		vec!["dev".to_string(), "staging".to_string(), "prod".to_string()]
	);

	assert!(provider.resolve_client(&ctx, "").await.is_ok());
	assert!(provider.resolve_client(&ctx, "prod").await.is_ok());
	assert_matches!(
		provider.resolve_client(&ctx, "missing").await.err(),
		Some(ProviderError::UnknownTarget(ref t)) if t == "missing"
	);
	Ok(())
}

/// The disabled strategy only exposes the current context
#[tokio::test]
async fn test_disabled_pins_current_context() -> anyhow::Result<()> {
	let dir = tempfile::tempdir()?;
	let path = dir.path().join("config");
	write(&path, &["dev", "prod"], "dev")?;

	let config = BaseConfig::with_strategy(ProviderKind::Disabled).with_kubeconfig(&path);
	let provider = new_provider(&config)?;
	let ctx = RequestContext::new();

	assert_eq!(provider.kind(), ProviderKind::Disabled);
	assert!(!provider.supports_multi_target());
	assert_eq!(provider.target_parameter_name(), "");
	assert_eq!(provider.list_targets(&ctx).await?, vec!["dev".to_string()]);

	assert!(provider.resolve_client(&ctx, "").await.is_ok());
	assert!(provider.resolve_client(&ctx, "dev").await.is_ok());
	assert_matches!(
		provider.resolve_client(&ctx, "prod").await.err(),
		Some(ProviderError::UnknownTarget(_))
	);
	Ok(())
}

/// Reloading picks up contexts added to the file
#[tokio::test]
async fn test_reload() -> anyhow::Result<()> {
	let dir = tempfile::tempdir()?;
	let path = dir.path().join("config");
	write(&path, &["dev"], "dev")?;

	let provider = KubeconfigProvider::new(&BaseConfig::default().with_kubeconfig(&path))?;
	assert_eq!(provider.path(), path.as_path());

	write(&path, &["dev", "prod"], "prod")?;
	provider.reload().await?;

	let ctx = RequestContext::new();
	assert_eq!(provider.default_target(), "prod");
	assert_eq!(provider.list_targets(&ctx).await?.len(), 2);
	assert!(provider.resolve_client(&ctx, "prod").await.is_ok());
	Ok(())
}

/// File changes trigger a reload and the callback
#[tokio::test]
async fn test_watch_targets() -> anyhow::Result<()> {
	let dir = tempfile::tempdir()?;
	let path = dir.path().join("config");
	write(&path, &["dev"], "dev")?;

	let provider = KubeconfigProvider::new(&BaseConfig::default().with_kubeconfig(&path))?;
	let changes = Arc::new(AtomicUsize::new(0));
	let counter = changes.clone();
	provider.watch_targets(Arc::new(move || {
		counter.fetch_add(1, Ordering::SeqCst);
	}));

	// Give the watcher time to register before touching the file
	tokio::time::sleep(Duration::from_millis(200)).await;
	write(&path, &["dev", "prod"], "dev")?;

	let ctx = RequestContext::new();
	let mut reloaded = false;
	for _ in 0..50 {
		if changes.load(Ordering::SeqCst) > 0 {
			reloaded = true;
			break;
		}
		tokio::time::sleep(Duration::from_millis(100)).await;
	}
	assert!(reloaded, "kubeconfig change was not observed");
	assert_eq!(provider.list_targets(&ctx).await?.len(), 2);

	provider.close();
	Ok(())
}

/// Strategies with no way to pick a kubeconfig fail loudly
#[tokio::test]
async fn test_missing_kubeconfig_file() -> anyhow::Result<()> {
	let dir = tempfile::tempdir()?;
	let config = BaseConfig::with_strategy(ProviderKind::Kubeconfig)
		.with_kubeconfig(dir.path().join("absent"));
	assert_matches!(new_provider(&config).err(), Some(ProviderError::Kubeconfig(_)));
	Ok(())
}
