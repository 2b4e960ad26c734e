//! Discriminator registry for watchers and notifiers
//!
//! Maps the `type` field of a definition's `watcher` and `alerter` sections
//! to a factory. Unknown discriminators fail with [`ConfigLoadError`] at load
//! time.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::alerter::{Alerter, HttpNotifier, LogNotifier, Notifier};
use crate::condition::Condition;
use crate::definition::{AlerterSpec, ReminderDefinition, WatcherSpec};
use crate::reminder::Reminder;
use crate::scheduler::Scheduler;
use crate::store::ConfigLoadError;
use crate::watcher::{FileWatcher, HttpWatcher, MqttWatcher, MqttWatcherConfig, StaticWatcher, Watcher};

pub type WatcherFactory = Arc<dyn Fn(&WatcherSpec) -> Result<Arc<dyn Watcher>, ConfigLoadError> + Send + Sync>;
pub type NotifierFactory = Arc<dyn Fn(&AlerterSpec) -> Result<Arc<dyn Notifier>, ConfigLoadError> + Send + Sync>;

/// Deserialize variant options from a flattened mapping
pub fn options<T: DeserializeOwned>(kind: &str, options: &Mapping) -> Result<T, ConfigLoadError> {
    serde_yaml::from_value(Value::Mapping(options.clone())).map_err(|e| ConfigLoadError::InvalidOptions {
        kind: kind.to_string(),
        message: e.to_string(),
    })
}

#[derive(Clone, Default)]
pub struct Registry {
    watchers: HashMap<String, WatcherFactory>,
    notifiers: HashMap<String, NotifierFactory>,
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `http`, `mqtt`, `file` and `static` watchers and the `log` and `http` alerters
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register_watcher("http", |spec| {
            let config = options(&spec.kind, &spec.options)?;
            let watcher = HttpWatcher::new(config, spec.schedules.clone()).map_err(|e| {
                ConfigLoadError::InvalidOptions {
                    kind: spec.kind.clone(),
                    message: e.to_string(),
                }
            })?;
            Ok(Arc::new(watcher))
        });
        registry.register_watcher("mqtt", |spec| {
            let config: MqttWatcherConfig = options(&spec.kind, &spec.options)?;
            if config.topics.is_empty() {
                return Err(ConfigLoadError::InvalidOptions {
                    kind: spec.kind.clone(),
                    message: "at least one topic is required".to_string(),
                });
            }
            Ok(Arc::new(MqttWatcher::new(config, spec.schedules.clone())))
        });
        registry.register_watcher("file", |spec| {
            let config = options(&spec.kind, &spec.options)?;
            Ok(Arc::new(FileWatcher::new(config, spec.schedules.clone())))
        });
        registry.register_watcher("static", |spec| {
            let config = options(&spec.kind, &spec.options)?;
            Ok(Arc::new(StaticWatcher::new(config, spec.schedules.clone())))
        });

        registry.register_notifier("log", |_| Ok(Arc::new(LogNotifier::new())));
        registry.register_notifier("http", |spec| {
            let config = options(&spec.kind, &spec.options)?;
            let notifier = HttpNotifier::new(config).map_err(|e| ConfigLoadError::InvalidOptions {
                kind: spec.kind.clone(),
                message: e.to_string(),
            })?;
            Ok(Arc::new(notifier))
        });

        registry
    }

    pub fn register_watcher<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&WatcherSpec) -> Result<Arc<dyn Watcher>, ConfigLoadError> + Send + Sync + 'static,
    {
        debug!(%kind, "Registry::register_watcher: called");
        self.watchers.insert(kind.to_string(), Arc::new(factory));
    }

    pub fn register_notifier<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&AlerterSpec) -> Result<Arc<dyn Notifier>, ConfigLoadError> + Send + Sync + 'static,
    {
        debug!(%kind, "Registry::register_notifier: called");
        self.notifiers.insert(kind.to_string(), Arc::new(factory));
    }

    pub fn watcher_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.watchers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn notifier_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.notifiers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn build_watcher(&self, spec: &WatcherSpec) -> Result<Arc<dyn Watcher>, ConfigLoadError> {
        let factory = self
            .watchers
            .get(&spec.kind)
            .ok_or_else(|| ConfigLoadError::UnknownWatcher(spec.kind.clone()))?;
        factory(spec)
    }

    pub fn build_notifier(&self, spec: &AlerterSpec) -> Result<Arc<dyn Notifier>, ConfigLoadError> {
        let factory = self
            .notifiers
            .get(&spec.kind)
            .ok_or_else(|| ConfigLoadError::UnknownAlerter(spec.kind.clone()))?;
        factory(spec)
    }

    /// Construct an unregistered reminder: condition, then watcher, then alerter
    pub fn build_reminder(
        &self,
        name: &str,
        definition: &ReminderDefinition,
        scheduler: &Scheduler,
    ) -> Result<Arc<Reminder>, ConfigLoadError> {
        debug!(%name, "Registry::build_reminder: called");
        let condition = Condition::parse(&definition.condition)?;

        let watcher = definition
            .watcher
            .as_ref()
            .map(|spec| self.build_watcher(spec))
            .transpose()?;

        let alerter = match &definition.alerter {
            Some(spec) => {
                if spec.settings.repeat_interval.is_zero() {
                    return Err(ConfigLoadError::InvalidOptions {
                        kind: spec.kind.clone(),
                        message: "repeat-interval must be greater than zero".to_string(),
                    });
                }
                let notifier = self.build_notifier(spec)?;
                Some(Alerter::new(name, spec.settings.clone(), notifier, scheduler.clone()))
            }
            None => None,
        };

        Ok(Reminder::new(
            name,
            condition,
            watcher,
            alerter,
            scheduler.clone(),
            definition.deactivate_when_clear,
        ))
    }
}
