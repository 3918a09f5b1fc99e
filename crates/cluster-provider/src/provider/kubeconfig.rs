// Kubeconfig-backed strategies
//
// `kubeconfig` exposes every context of the file as a target. `disabled` pins
// the provider to the file's current context. Both keep the parsed file in an
// ArcSwap so reloads never block requests.

use std::path::{Path, PathBuf, absolute};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::UserInfo;
use kube::Client;
use kube::config::{KubeConfigOptions, Kubeconfig};
use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::DebounceEventResult;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::cluster::{cancellable, client_from_config, serves_openshift, verify_token};
use super::{ClusterProvider, ProviderError, TargetsChanged};
use crate::config::{BaseConfig, ProviderKind};
use crate::context::RequestContext;

/// Parameter callers use to pick a kubeconfig context
pub const CONTEXT_PARAMETER: &str = "context";

/// Cluster provider backed by a kubeconfig file
pub struct KubeconfigProvider {
	state: Arc<KubeconfigState>,
	shutdown: CancellationToken,
}

struct KubeconfigState {
	path: PathBuf,
	kubeconfig: ArcSwap<Kubeconfig>,
	pinned: bool,
}

impl KubeconfigProvider {
	/// Every context in the kubeconfig is a target
	pub fn new(config: &BaseConfig) -> Result<Self, ProviderError> {
		Self::load(config, false)
	}

	/// Only the kubeconfig's current context is reachable
	pub fn pinned(config: &BaseConfig) -> Result<Self, ProviderError> {
		Self::load(config, true)
	}

	fn load(config: &BaseConfig, pinned: bool) -> Result<Self, ProviderError> {
		let path = config
			.kubeconfig
			.clone()
			.or_else(default_kubeconfig_path)
			.ok_or(ProviderError::KubeconfigNotFound)?;
		let kubeconfig = Kubeconfig::read_from(&path)?;
		info!(
			target: "cluster_provider",
			"Loaded kubeconfig {} ({} contexts, current: {})",
			path.display(),
			kubeconfig.contexts.len(),
			kubeconfig.current_context.as_deref().unwrap_or("<unset>")
		);

		Ok(Self {
			state: Arc::new(KubeconfigState {
				path,
				kubeconfig: ArcSwap::from_pointee(kubeconfig),
				pinned,
			}),
			shutdown: CancellationToken::new(),
		})
	}

	pub fn path(&self) -> &Path {
		&self.state.path
	}

	fn current_context(&self) -> Option<String> {
		self.state.kubeconfig.load().current_context.clone()
	}

	/// Map a requested target onto a context name known to the kubeconfig
	fn context_for(&self, target: &str) -> Result<Option<String>, ProviderError> {
		if target.is_empty() {
			return Ok(self.current_context());
		}

		let kubeconfig = self.state.kubeconfig.load();
		let known = if self.state.pinned {
			kubeconfig.current_context.as_deref() == Some(target)
		} else {
			kubeconfig.contexts.iter().any(|c| c.name == target)
		};
		if known {
			Ok(Some(target.to_string()))
		} else {
			Err(ProviderError::UnknownTarget(target.to_string()))
		}
	}

	async fn client_for(&self, target: &str) -> Result<Client, ProviderError> {
		let options = KubeConfigOptions {
			context: self.context_for(target)?,
			..Default::default()
		};
		let kubeconfig = Kubeconfig::clone(&self.state.kubeconfig.load());
		let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options).await?;
		client_from_config(config)
	}
}

impl KubeconfigState {
	fn reload(&self) -> Result<(), ProviderError> {
		let kubeconfig = Kubeconfig::read_from(&self.path)?;
		debug!(
			target: "cluster_provider",
			"Reloaded kubeconfig {} ({} contexts)",
			self.path.display(),
			kubeconfig.contexts.len()
		);
		self.kubeconfig.store(Arc::new(kubeconfig));
		Ok(())
	}

	/// Reload on every change to the kubeconfig file until the watcher is dropped
	async fn watch(&self, on_change: TargetsChanged) -> Result<(), notify::Error> {
		let (tx, mut rx) = tokio::sync::mpsc::channel(1);

		let mut watcher =
			notify_debouncer_full::new_debouncer(Duration::from_millis(250), None, move |res| {
				futures::executor::block_on(async {
					let _ = tx.send(res).await;
				})
			})?;

		// Editors and kubectl replace the file, so watch the directory
		let abspath = absolute(&self.path)?;
		let Some(parent) = abspath.parent() else {
			return Err(notify::Error::path_not_found().add_path(abspath.clone()));
		};
		watcher.watch(parent, RecursiveMode::NonRecursive)?;
		info!(target: "cluster_provider", "Watching kubeconfig: {}", self.path.display());

		while let Some(result) = rx.recv().await {
			self.handle_debounced(result, &abspath, &on_change);
		}

		drop(watcher);
		Ok(())
	}

	/// Reload and notify when a debounced batch touches `abspath`; watcher errors are logged and skipped
	fn handle_debounced(&self, result: DebounceEventResult, abspath: &Path, on_change: &TargetsChanged) {
		let events = match result {
			Ok(events) => events,
			Err(errors) => {
				for e in errors {
					warn!(target: "cluster_provider", "Kubeconfig watcher error: {e}");
				}
				return;
			},
		};

		if events.iter().any(|e| {
			matches!(e.kind, EventKind::Modify(_) | EventKind::Create(_))
				&& e.paths.iter().any(|p| p == abspath)
		}) {
			match self.reload() {
				Ok(()) => {
					info!(target: "cluster_provider", "Kubeconfig changed, targets reloaded");
					on_change();
				},
				Err(e) => error!(target: "cluster_provider", "Failed to reload kubeconfig: {e}"),
			}
		}
	}
}

/// `$KUBECONFIG` (first entry), else `~/.kube/config`
fn default_kubeconfig_path() -> Option<PathBuf> {
	if let Some(paths) = std::env::var_os("KUBECONFIG")
		&& let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty())
	{
		return Some(first);
	}
	std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".kube").join("config"))
}

#[async_trait]
impl ClusterProvider for KubeconfigProvider {
	fn kind(&self) -> ProviderKind {
		if self.state.pinned {
			ProviderKind::Disabled
		} else {
			ProviderKind::Kubeconfig
		}
	}

	async fn resolve_client(&self, _ctx: &RequestContext, target: &str) -> Result<Client, ProviderError> {
		self.client_for(target).await
	}

	fn supports_multi_target(&self) -> bool {
		!self.state.pinned
	}

	async fn list_targets(&self, _ctx: &RequestContext) -> Result<Vec<String>, ProviderError> {
		if self.state.pinned {
			return Ok(vec![self.current_context().unwrap_or_default()]);
		}
		let kubeconfig = self.state.kubeconfig.load();
		Ok(kubeconfig.contexts.iter().map(|c| c.name.clone()).collect())
	}

	fn default_target(&self) -> String {
		self.current_context().unwrap_or_default()
	}

	fn target_parameter_name(&self) -> String {
		if self.state.pinned {
			String::new()
		} else {
			CONTEXT_PARAMETER.to_string()
		}
	}

	async fn is_managed_platform(&self, ctx: &RequestContext) -> bool {
		let detected = cancellable(ctx, async { serves_openshift(&self.client_for("").await?).await }).await;
		detected.unwrap_or_else(|e| {
			debug!(target: "cluster_provider", "Managed platform detection failed: {e}");
			false
		})
	}

	async fn verify_identity(
		&self,
		ctx: &RequestContext,
		target: &str,
		token: &str,
		audience: &str,
	) -> Result<(UserInfo, Vec<String>), ProviderError> {
		cancellable(ctx, async {
			verify_token(self.client_for(target).await?, token, audience).await
		})
		.await
	}

	fn watch_targets(&self, on_change: TargetsChanged) {
		let Ok(handle) = tokio::runtime::Handle::try_current() else {
			warn!(target: "cluster_provider", "No async runtime available, kubeconfig changes will not be watched");
			return;
		};

		let state = self.state.clone();
		let shutdown = self.shutdown.clone();
		handle.spawn(async move {
			tokio::select! {
				_ = shutdown.cancelled() => {
					debug!(target: "cluster_provider", "Stopped watching kubeconfig");
				},
				result = state.watch(on_change) => {
					if let Err(e) = result {
						error!(target: "cluster_provider", "Kubeconfig watcher error: {e}");
					}
				},
			}
		});
	}

	async fn reload(&self) -> Result<(), ProviderError> {
		self.state.reload()
	}

	fn close(&self) {
		self.shutdown.cancel();
	}
}

impl Drop for KubeconfigProvider {
	fn drop(&mut self) {
		self.shutdown.cancel();
	}
}
