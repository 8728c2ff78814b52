//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 分发语义的跨 crate 验证 (优先级、取消、单次监听器)
//! - 场景配置 -> Dispatcher 端到端测试

#[cfg(test)]
mod contract_tests {
    use contracts::{Event, Priority};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_priority_extremes_order() {
        assert!(Priority::HIGHEST > Priority::from(1_000_000));
        assert!(Priority::LOWEST < Priority::from(-1_000_000));
        assert_eq!(Priority::new(-0.0), Priority::DEFAULT);
    }

    #[test]
    fn test_event_cancel_is_one_way() {
        let event = Event::new("x", true);
        assert!(event.cancel());
        assert!(event.is_cancelled());
        assert!(!event.cancel());
        assert!(event.is_cancelled());

        let fixed = Event::new("y", false);
        assert!(!fixed.cancel());
        assert!(!fixed.is_cancelled());
    }
}

#[cfg(test)]
mod dispatch_tests {
    use std::sync::Arc;

    use dispatcher::{
        ConnectOptions, Connection, Dispatcher, DispatcherError, Event, FireStatus,
        ListenerError, ListenerResult,
    };
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Listener that appends `tag` and otherwise does nothing
    fn append(
        log: &Log,
        tag: &'static str,
    ) -> impl Fn(Event<String>) -> std::future::Ready<ListenerResult> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |_event| {
            log.lock().push(tag.to_string());
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_cancelling_listener_stops_lower_priorities() {
        let dispatcher = Dispatcher::<String>::new();
        let log = Log::default();
        {
            let log = Arc::clone(&log);
            dispatcher
                .connect(
                    move |event: Event<String>| {
                        log.lock().push("A".to_string());
                        event.cancel();
                        std::future::ready(Ok(()))
                    },
                    10,
                )
                .unwrap();
        }
        dispatcher.connect(append(&log, "B"), 0).unwrap();

        let report = dispatcher.fire("x".to_string()).await.unwrap();
        assert_eq!(report.status, FireStatus::EventCancelled);
        assert_eq!(*log.lock(), vec!["A"]);

        // 取消只影响本次 fire
        let report = dispatcher.fire("y".to_string()).await.unwrap();
        assert_eq!(report.status, FireStatus::EventCancelled);
        assert_eq!(*log.lock(), vec!["A", "A"]);
    }

    #[tokio::test]
    async fn test_failing_listener_is_named_and_stops_fire() {
        let dispatcher = Dispatcher::<String>::new();
        let log = Log::default();
        dispatcher
            .connect_with(ConnectOptions::new(0).name("A"), |_event: Event<String>| {
                std::future::ready(Err::<(), ListenerError>("boom".into()))
            })
            .unwrap();
        dispatcher.connect(append(&log, "B"), 0).unwrap();

        let err = dispatcher.fire("x".to_string()).await.unwrap_err();
        match &err {
            DispatcherError::ListenerFailed { listener, source, .. } => {
                assert_eq!(listener.name.as_deref(), Some("A"));
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("'A'"));
        assert!(!err.is_usage_error());
        assert!(log.lock().is_empty());
        assert!(!dispatcher.is_firing());
    }

    #[tokio::test]
    async fn test_once_listener_sees_first_value_only() {
        let dispatcher = Dispatcher::<String>::new();
        let seen = Log::default();
        let connection = {
            let seen = Arc::clone(&seen);
            dispatcher
                .once(
                    move |event: Event<String>| {
                        seen.lock().push(event.value().clone());
                        std::future::ready(Ok(()))
                    },
                    0,
                )
                .unwrap()
        };

        dispatcher.fire("x".to_string()).await.unwrap();
        let report = dispatcher.fire("y".to_string()).await.unwrap();

        assert_eq!(*seen.lock(), vec!["x"]);
        assert_eq!(report.invoked, 0);
        assert!(!connection.is_connected());
        assert_eq!(dispatcher.connection_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_suspended_listener_holds_back_lower_priorities() {
        let dispatcher = Dispatcher::<String>::new();
        let log = Log::default();
        {
            let log = Arc::clone(&log);
            dispatcher
                .connect(
                    move |_event: Event<String>| {
                        let log = Arc::clone(&log);
                        async move {
                            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                            tokio::task::yield_now().await;
                            log.lock().push("A".to_string());
                            Ok(())
                        }
                    },
                    1,
                )
                .unwrap();
        }
        dispatcher.connect(append(&log, "B"), 0).unwrap();

        for round in 0..50 {
            dispatcher.fire(format!("x{round}")).await.unwrap();
            assert_eq!(*log.lock(), vec!["A", "B"]);
            log.lock().clear();
        }
    }

    #[tokio::test]
    async fn test_mixed_priorities_run_descending_then_fifo() {
        let dispatcher = Dispatcher::<String>::new();
        let log = Log::default();
        dispatcher.connect(append(&log, "zero-1"), 0).unwrap();
        dispatcher.connect(append(&log, "low"), f64::NEG_INFINITY).unwrap();
        dispatcher.connect(append(&log, "high"), 5.5).unwrap();
        dispatcher.connect(append(&log, "zero-2"), 0).unwrap();
        dispatcher.connect(append(&log, "top"), f64::INFINITY).unwrap();

        let report = dispatcher.fire("x".to_string()).await.unwrap();
        assert_eq!(report.status, FireStatus::Completed);
        assert_eq!(report.invoked, 5);
        assert_eq!(*log.lock(), vec!["top", "high", "zero-1", "zero-2", "low"]);
    }

    #[tokio::test]
    async fn test_reentrant_fire_runs_no_listeners() {
        let dispatcher = Dispatcher::<String>::new();
        let log = Log::default();
        let inner_error = Arc::new(Mutex::new(None));
        {
            let inner = dispatcher.clone();
            let log = Arc::clone(&log);
            let inner_error = Arc::clone(&inner_error);
            dispatcher
                .connect(
                    move |event: Event<String>| {
                        let inner = inner.clone();
                        let log = Arc::clone(&log);
                        let inner_error = Arc::clone(&inner_error);
                        async move {
                            log.lock().push(event.value().clone());
                            if let Err(e) = inner.fire("nested".to_string()).await {
                                *inner_error.lock() = Some(e.is_usage_error());
                            }
                            Ok(())
                        }
                    },
                    0,
                )
                .unwrap();
        }

        dispatcher.fire("outer".to_string()).await.unwrap();
        assert_eq!(*log.lock(), vec!["outer"]);
        assert_eq!(*inner_error.lock(), Some(true));
        dispatcher.destroy().unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_from_listener_is_deferred() {
        let dispatcher = Dispatcher::<String>::new();
        let log = Log::default();
        let target: Arc<Mutex<Option<Connection>>> = Arc::new(Mutex::new(None));
        {
            let log = Arc::clone(&log);
            let target = Arc::clone(&target);
            dispatcher
                .connect(
                    move |_event: Event<String>| {
                        log.lock().push("A".to_string());
                        if let Some(connection) = target.lock().as_ref() {
                            connection.disconnect();
                        }
                        std::future::ready(Ok(()))
                    },
                    10,
                )
                .unwrap();
        }
        let b = dispatcher.connect(append(&log, "B"), 0).unwrap();
        dispatcher.connect(append(&log, "C"), -1).unwrap();
        *target.lock() = Some(b.clone());

        let report = dispatcher.fire("x".to_string()).await.unwrap();
        assert_eq!(report.invoked, 2);
        assert_eq!(*log.lock(), vec!["A", "C"]);
        assert!(!b.is_connected());
        assert_eq!(dispatcher.connection_count(), 2);

        dispatcher.fire("y".to_string()).await.unwrap();
        assert_eq!(*log.lock(), vec!["A", "C", "A", "C"]);
    }

    #[tokio::test]
    async fn test_external_cancel_resumes_firer_without_error() {
        let dispatcher = Dispatcher::<String>::new();
        let log = Log::default();
        let started = Arc::new(Notify::new());
        {
            let started = Arc::clone(&started);
            dispatcher
                .connect(
                    move |_event: Event<String>| {
                        let started = Arc::clone(&started);
                        async move {
                            started.notify_one();
                            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                            Ok(())
                        }
                    },
                    1,
                )
                .unwrap();
        }
        dispatcher.connect(append(&log, "after"), 0).unwrap();

        let firing = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.fire("x".to_string()).await })
        };
        started.notified().await;
        assert!(dispatcher.cancel().unwrap());

        let report = firing.await.unwrap().unwrap();
        assert_eq!(report.status, FireStatus::Aborted);
        assert_eq!(report.invoked, 1);
        assert!(log.lock().is_empty());

        // 中止后可以再次 fire
        assert!(!dispatcher.cancel().unwrap());
        assert!(!dispatcher.is_firing());
    }

    #[tokio::test]
    async fn test_cancel_from_own_listener_is_usage_error() {
        let dispatcher = Dispatcher::<String>::new();
        let log = Log::default();
        let outcome = Arc::new(Mutex::new(None));
        {
            let inner = dispatcher.clone();
            let outcome = Arc::clone(&outcome);
            dispatcher
                .connect(
                    move |_event: Event<String>| {
                        *outcome.lock() = Some(inner.cancel());
                        std::future::ready(Ok(()))
                    },
                    1,
                )
                .unwrap();
        }
        dispatcher.connect(append(&log, "next"), 0).unwrap();

        dispatcher.fire("x".to_string()).await.unwrap();
        let outcome = outcome.lock().take().unwrap();
        assert!(matches!(
            outcome,
            Err(DispatcherError::CancelFromListener { .. })
        ));
        assert_eq!(*log.lock(), vec!["next"]);
        dispatcher.destroy().unwrap();
    }

    #[tokio::test]
    async fn test_destroy_rejects_further_use() {
        let dispatcher = Dispatcher::<String>::new();
        let log = Log::default();
        let connection = dispatcher.connect(append(&log, "A"), 0).unwrap();

        dispatcher.destroy().unwrap();
        assert!(dispatcher.is_destroyed());
        assert!(!connection.is_connected());
        assert!(!connection.disconnect());
        assert!(matches!(
            dispatcher.fire("x".to_string()).await,
            Err(DispatcherError::Destroyed { .. })
        ));
        assert!(matches!(
            dispatcher.connect(append(&log, "B"), 0),
            Err(DispatcherError::Destroyed { .. })
        ));
        assert!(log.lock().is_empty());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::ListenerAction;
    use dispatcher::{ConnectOptions, Dispatcher, DispatcherBuilder, Event, ListenerError};
    use observability::FireStatsAggregator;
    use parking_lot::Mutex;

    const SCENARIO: &str = r#"
[[dispatchers]]
name = "input"

[[dispatchers.listeners]]
name = "audit"
priority = -100

[[dispatchers.listeners]]
name = "guard"
priority = 10
action = "cancel_event"

[[dispatchers.listeners]]
name = "welcome"
priority = 20
once = true

[[dispatchers]]
name = "output"
cancellable = false

[[dispatchers.listeners]]
name = "writer"
action = "fail"

[[fires]]
dispatcher = "input"
payload = "hello"
repeat = 2

[[fires]]
dispatcher = "output"
payload = "bye"
"#;

    /// Scenario file -> ConfigLoader -> Dispatcher -> FireStatsAggregator
    ///
    /// 验证完整的数据流：
    /// 1. ConfigLoader 解析并验证场景
    /// 2. 按场景构建 Dispatcher 并连接监听器
    /// 3. 按声明顺序 fire，并聚合结果
    #[tokio::test]
    async fn test_e2e_scenario_from_config() {
        let blueprint = ConfigLoader::load_from_str(SCENARIO, ConfigFormat::Toml).unwrap();
        let calls: Arc<Mutex<Vec<String>>> = Arc::default();

        let mut dispatchers: HashMap<String, Dispatcher<String>> = HashMap::new();
        for spec in &blueprint.dispatchers {
            let dispatcher = DispatcherBuilder::from_config(spec.to_dispatcher_config())
                .build::<String>();
            for listener in &spec.listeners {
                let mut options =
                    ConnectOptions::new(listener.priority).name(listener.name.clone());
                if listener.once {
                    options = options.once();
                }
                let calls = Arc::clone(&calls);
                let name = listener.name.clone();
                let action = listener.action;
                dispatcher
                    .connect_with(options, move |event: Event<String>| {
                        calls.lock().push(format!("{name}:{}", event.value()));
                        let result = match action {
                            ListenerAction::Log => Ok(()),
                            ListenerAction::CancelEvent => {
                                event.cancel();
                                Ok(())
                            }
                            ListenerAction::Fail => {
                                Err::<(), ListenerError>(format!("{name} failed").into())
                            }
                        };
                        std::future::ready(result)
                    })
                    .unwrap();
            }
            dispatchers.insert(spec.name.clone(), dispatcher);
        }

        let mut aggregator = FireStatsAggregator::new();
        for fire in &blueprint.fires {
            let dispatcher = &dispatchers[&fire.dispatcher];
            for _ in 0..fire.repeat {
                let before = dispatcher.metrics().listener_invocations();
                match dispatcher.fire(fire.payload.clone()).await {
                    Ok(report) => aggregator.update(&report),
                    Err(_) => {
                        let invoked = dispatcher.metrics().listener_invocations() - before;
                        aggregator.record_failure(&fire.dispatcher, invoked as usize);
                    }
                }
            }
        }

        assert_eq!(
            *calls.lock(),
            vec!["welcome:hello", "guard:hello", "guard:hello", "writer:bye"]
        );

        let summary = aggregator.summary();
        assert_eq!(summary.total_fires, 3);
        assert_eq!(summary.event_cancelled, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.listener_invocations, 4);
        assert_eq!(summary.failures_by_dispatcher.get("output"), Some(&1));

        let input = &dispatchers["input"];
        assert_eq!(input.connection_count(), 2);
        assert_eq!(input.metrics().fires_event_cancelled(), 2);

        for dispatcher in dispatchers.values() {
            dispatcher.destroy().unwrap();
        }
    }

    #[test]
    fn test_invalid_scenario_rejected_before_dispatch() {
        let broken = SCENARIO.replace("dispatcher = \"output\"", "dispatcher = \"missing\"");
        let err = ConfigLoader::load_from_str(&broken, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
