use std::sync::Arc;
use std::time::UNIX_EPOCH;

use tracing::{info, instrument, warn};

use super::{LifecycleError, Manager, ManagerRegistry, ShutdownCoordinator};
use crate::config::ServiceConfig;
use crate::hive_cycle::{ConfigurationHistory, CycleSynchronizer, HiveCycle, SynchronizationLoop};
use crate::ledger::{LedgerClient, TopicHandle};
use crate::subscription::{LoggingHandler, MessageHandler, SubscriptionBinder};

/// A topic address paired with the handler its messages go to.
pub struct TopicBinding {
    pub label: String,
    pub address: String,
    pub handler: Arc<dyn MessageHandler>,
}

/// The node's top-level orchestrator.
///
/// `ServiceSession` owns everything the node runs: the managers, the topic
/// bindings and the handles they resolve to, the cycle configuration history
/// and the shutdown coordinator. It is built explicitly and driven through
/// exactly two operations, [`init`](Self::init) and [`deinit`](Self::deinit).
///
/// # Startup
///
/// 1. Initialize managers in registration order (first failure aborts)
/// 2. Resolve each bound topic and subscribe from the start of its history
///    (first failure aborts)
/// 3. Synchronize the hive cycle once (a failure is only logged)
/// 4. Start the hive cycle synchronization loop
///
/// # Shutdown
///
/// 1. Signal every background task and wait for all of them to exit
/// 2. Deinitialize the managers that were initialized, in reverse order
///
/// # Example
///
/// ```ignore
/// let hive_cycle = Arc::new(HiveCycle::new(&config.topics.hive_cycle_synchronization));
/// let mut session = ServiceSession::with_default_bindings(config, ledger, hive_cycle);
/// session.register_manager(LocalNetworkManager::new(network, topics, genesis));
///
/// session.init().await?;
/// tokio::signal::ctrl_c().await?;
/// session.deinit().await?;
/// ```
pub struct ServiceSession {
    config: ServiceConfig,
    ledger: Arc<dyn LedgerClient>,
    synchronizer: Arc<dyn CycleSynchronizer>,
    registry: ManagerRegistry,
    bindings: Vec<TopicBinding>,
    topics: Vec<TopicHandle>,
    history: ConfigurationHistory,
    shutdown: Arc<ShutdownCoordinator>,
    started: bool,
}

impl ServiceSession {
    /// Creates a session with no managers and no topic bindings.
    pub fn new(
        config: ServiceConfig,
        ledger: Arc<dyn LedgerClient>,
        synchronizer: Arc<dyn CycleSynchronizer>,
    ) -> Self {
        Self {
            config,
            ledger,
            synchronizer,
            registry: ManagerRegistry::new(),
            bindings: Vec::new(),
            topics: Vec::new(),
            history: ConfigurationHistory::new(),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            started: false,
        }
    }

    /// Creates a session bound to the four well-known topics of the config.
    ///
    /// The hive cycle synchronization topic feeds `hive_cycle`, which is also
    /// the session's synchronizer. The render job queue, application and
    /// validation topics get a [`LoggingHandler`].
    pub fn with_default_bindings(
        config: ServiceConfig,
        ledger: Arc<dyn LedgerClient>,
        hive_cycle: Arc<HiveCycle>,
    ) -> Self {
        let topics = config.topics.clone();
        let mut session = Self::new(config, ledger, hive_cycle.clone());
        session
            .bind_topic(
                "render job queue",
                &topics.render_job_queue,
                Arc::new(LoggingHandler::new("render job queue")),
            )
            .bind_topic(
                "hive cycle synchronization",
                &topics.hive_cycle_synchronization,
                hive_cycle,
            )
            .bind_topic(
                "hive cycle application",
                &topics.hive_cycle_application,
                Arc::new(LoggingHandler::new("hive cycle application")),
            )
            .bind_topic(
                "hive cycle validation",
                &topics.hive_cycle_validation,
                Arc::new(LoggingHandler::new("hive cycle validation")),
            );
        session
    }

    /// Adds a manager. Managers are initialized in the order they are added.
    pub fn register_manager<M: Manager + 'static>(&mut self, manager: M) -> &mut Self {
        self.registry.register(manager);
        self
    }

    /// Routes the messages of the topic at `address` to `handler` once the
    /// session starts.
    pub fn bind_topic(
        &mut self,
        label: impl Into<String>,
        address: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> &mut Self {
        self.bindings.push(TopicBinding {
            label: label.into(),
            address: address.into(),
            handler,
        });
        self
    }

    /// Brings the node up. See the type-level docs for the order of steps.
    ///
    /// On failure the managers that did initialize stay initialized and any
    /// listeners already started keep running; call [`deinit`](Self::deinit)
    /// to tear them down, or call `init` again to resume. A retry skips the
    /// managers and topics that already came up.
    #[instrument(skip(self), name = "session_init")]
    pub async fn init(&mut self) -> Result<(), LifecycleError> {
        if self.started {
            warn!("Session already started");
            return Ok(());
        }
        info!(network = %self.config.network, "Starting hive node session");

        self.registry.init_all().await?;

        let binder = SubscriptionBinder::new(self.ledger.clone(), self.shutdown.clone());
        // Bindings are subscribed in order, so the ones before `topics.len()`
        // already have a listener from an earlier attempt.
        for binding in self.bindings.iter().skip(self.topics.len()) {
            let topic = self.ledger.resolve_topic(&binding.address).await?;
            binder
                .subscribe(&topic, UNIX_EPOCH, binding.handler.clone())
                .await?;
            self.topics.push(topic);
        }

        if let Err(e) = self
            .synchronizer
            .synchronize(self.ledger.as_ref(), &self.history)
            .await
        {
            warn!(error = %e, "Initial hive cycle synchronization failed");
        }

        let sync_loop = SynchronizationLoop::new(
            self.ledger.clone(),
            self.synchronizer.clone(),
            self.history.clone(),
        )
        .with_default_interval(self.config.hive_cycle.default_sync_interval());
        self.shutdown
            .spawn("hive cycle synchronization", move |shutdown| sync_loop.run(shutdown))?;
        self.started = true;

        info!("This node relies on the following smart contract and topics:");
        info!(address = %self.config.smart_contract, "  Smart contract");
        for binding in &self.bindings {
            info!(address = %binding.address, "  {} topic", binding.label);
        }
        Ok(())
    }

    /// Stops all background work, then deinitializes the managers.
    ///
    /// Every initialized manager is attempted even if one fails. The first
    /// manager failure is returned; failing that, a background task failure.
    #[instrument(skip(self), name = "session_deinit")]
    pub async fn deinit(&mut self) -> Result<(), LifecycleError> {
        info!("Stopping hive node session");

        let joined = self.shutdown.request_shutdown().await;
        let torn_down = self.registry.deinit_all().await;

        info!("Hive node session stopped");
        torn_down.and(joined)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &ManagerRegistry {
        &self.registry
    }

    /// Handles of the topics subscribed so far, in binding order.
    pub fn topics(&self) -> &[TopicHandle] {
        &self.topics
    }

    pub fn history(&self) -> &ConfigurationHistory {
        &self.history
    }

    pub fn shutdown_coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }
}
