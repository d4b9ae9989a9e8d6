//! 构建步骤容器集成测试：解析、连接生命周期、错误折叠

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use vsphere_step::connection::{Connection, ConnectionStats, MockConnector};
    use vsphere_step::steps::{BufferSink, EnvVars};
    use vsphere_step::{
        AbortError, BuildStep, BuildStepContainer, EndpointConfig, EndpointRegistry,
        ExecutionContext, InMemoryRegistry, RegistryError, SELECTABLE_SERVER_NAME,
    };

    enum Behavior {
        Succeed,
        Fail(&'static str),
        Panic,
    }

    /// 记录被连接到的端点，以及执行时连接是否仍处于打开状态
    struct RecordingStep {
        behavior: Behavior,
        conn: Option<Arc<dyn Connection>>,
        stats: Arc<ConnectionStats>,
        seen_endpoint: Arc<std::sync::Mutex<Option<String>>>,
        active_during_perform: Arc<AtomicUsize>,
    }

    impl RecordingStep {
        fn new(behavior: Behavior, stats: Arc<ConnectionStats>) -> Self {
            Self {
                behavior,
                conn: None,
                stats,
                seen_endpoint: Arc::default(),
                active_during_perform: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl BuildStep for RecordingStep {
        fn kind(&self) -> &str {
            "recording"
        }

        fn display_name(&self) -> &str {
            "Recording Step"
        }

        fn set_connection(&mut self, conn: Arc<dyn Connection>) {
            self.conn = Some(conn);
        }

        async fn perform(&mut self, _ctx: &ExecutionContext) -> Result<(), String> {
            let conn = self.conn.as_ref().ok_or("no connection")?;
            *self.seen_endpoint.lock().unwrap() = Some(conn.endpoint().name.clone());
            self.active_during_perform
                .store(self.stats.active(), Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(()),
                Behavior::Fail(msg) => Err(msg.to_string()),
                Behavior::Panic => panic!("step blew up"),
            }
        }
    }

    fn registry() -> Arc<InMemoryRegistry> {
        Arc::new(InMemoryRegistry::from_endpoints(vec![
            EndpointConfig::new("vc-east", "https://east.local", "admin"),
            EndpointConfig::new("vc-west", "https://west.local", "admin"),
        ])
        .unwrap())
    }

    fn context() -> (ExecutionContext, Arc<BufferSink>) {
        let sink = Arc::new(BufferSink::new());
        (ExecutionContext::new(EnvVars::new(), sink.clone()), sink)
    }

    #[tokio::test]
    async fn test_literal_name_resolves_by_hash_and_releases() {
        let registry = registry();
        let connector = Arc::new(MockConnector::new());
        let stats = connector.stats();
        let step = RecordingStep::new(Behavior::Succeed, stats.clone());
        let seen = step.seen_endpoint.clone();
        let active = step.active_during_perform.clone();

        let mut container =
            BuildStepContainer::new(Box::new(step), "vc-east", registry.clone(), connector)
                .unwrap();
        assert_eq!(
            container.server_hash(),
            Some(registry.lookup_by_name("vc-east").unwrap().hash())
        );

        let (ctx, _) = context();
        container.execute(&ctx).await.unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some("vc-east"));
        assert_eq!(active.load(Ordering::SeqCst), 1);
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.released(), 1);
    }

    #[tokio::test]
    async fn test_rename_after_construction_still_resolves() {
        let registry = registry();
        let connector = Arc::new(MockConnector::new());
        let step = RecordingStep::new(Behavior::Succeed, connector.stats());
        let seen = step.seen_endpoint.clone();

        let mut container =
            BuildStepContainer::new(Box::new(step), "vc-east", registry.clone(), connector)
                .unwrap();
        registry.rename("vc-east", "vc-east-prod").unwrap();

        let (ctx, sink) = context();
        container.execute(&ctx).await.unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some("vc-east-prod"));
        // 控制台仍显示配置时的名称
        assert!(sink
            .lines()
            .contains(&"[vSphere] Using vSphere server configuration: vc-east".to_string()));
    }

    #[tokio::test]
    async fn test_deleted_endpoint_aborts_without_connection() {
        let registry = registry();
        let connector = Arc::new(MockConnector::new());
        let stats = connector.stats();
        let hash = registry.lookup_by_name("vc-east").unwrap().hash();

        let mut container = BuildStepContainer::new(
            Box::new(RecordingStep::new(Behavior::Succeed, stats.clone())),
            "vc-east",
            registry.clone(),
            connector,
        )
        .unwrap();
        registry.remove("vc-east").unwrap();

        let (ctx, _) = context();
        let err = container.execute(&ctx).await.unwrap_err();
        assert_eq!(
            err.message(),
            format!("No vSphere cloud found with hash: {hash}")
        );
        assert_eq!(stats.opened(), 0);
        assert_eq!(stats.released(), 0);
    }

    #[tokio::test]
    async fn test_sentinel_resolves_from_environment() {
        let connector = Arc::new(MockConnector::new());
        let stats = connector.stats();
        let step = RecordingStep::new(Behavior::Succeed, stats.clone());
        let seen = step.seen_endpoint.clone();

        let mut container =
            BuildStepContainer::new(Box::new(step), SELECTABLE_SERVER_NAME, registry(), connector)
                .unwrap();
        assert_eq!(container.server_hash(), None);

        let sink = Arc::new(BufferSink::new());
        let env: EnvVars = [("VSPHERE_CLOUD_NAME", "vc-west")].into_iter().collect();
        let ctx = ExecutionContext::new(env, sink.clone());
        container.execute(&ctx).await.unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some("vc-west"));
        assert!(sink
            .lines()
            .contains(&"[vSphere] Using vSphere server configuration: vc-west".to_string()));
        assert_eq!(stats.released(), 1);
    }

    #[tokio::test]
    async fn test_build_variables_override_environment() {
        let connector = Arc::new(MockConnector::new());
        let step = RecordingStep::new(Behavior::Succeed, connector.stats());
        let seen = step.seen_endpoint.clone();
        let mut container =
            BuildStepContainer::new(Box::new(step), SELECTABLE_SERVER_NAME, registry(), connector)
                .unwrap();

        let env: EnvVars = [("VSPHERE_CLOUD_NAME", "vc-east")].into_iter().collect();
        let ctx = ExecutionContext::new(env, Arc::new(BufferSink::new())).with_build_variables(
            [("VSPHERE_CLOUD_NAME".to_string(), "vc-west".to_string())].into(),
        );
        container.execute(&ctx).await.unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some("vc-west"));
    }

    #[tokio::test]
    async fn test_sentinel_with_unknown_environment_name_fails() {
        let connector = Arc::new(MockConnector::new());
        let stats = connector.stats();
        let mut container = BuildStepContainer::new(
            Box::new(RecordingStep::new(Behavior::Succeed, stats.clone())),
            SELECTABLE_SERVER_NAME,
            registry(),
            connector,
        )
        .unwrap();

        let (ctx, _) = context();
        let err = container.execute(&ctx).await.unwrap_err();
        assert_eq!(
            err.message(),
            "No vSphere cloud found with name: ${VSPHERE_CLOUD_NAME}"
        );
        assert_eq!(stats.opened(), 0);
    }

    #[tokio::test]
    async fn test_step_failure_releases_then_aborts() {
        let connector = Arc::new(MockConnector::new());
        let stats = connector.stats();
        let mut container = BuildStepContainer::new(
            Box::new(RecordingStep::new(Behavior::Fail("power on failed"), stats.clone())),
            "vc-west",
            registry(),
            connector,
        )
        .unwrap();

        let (ctx, _) = context();
        let err = container.execute(&ctx).await.unwrap_err();
        assert_eq!(err.message(), "power on failed");
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.released(), 1);
    }

    #[tokio::test]
    async fn test_connection_failure_aborts() {
        let connector = Arc::new(MockConnector::failing("401 Unauthorized"));
        let stats = connector.stats();
        let mut container = BuildStepContainer::new(
            Box::new(RecordingStep::new(Behavior::Succeed, stats.clone())),
            "vc-east",
            registry(),
            connector,
        )
        .unwrap();

        let (ctx, _) = context();
        let err = container.execute(&ctx).await.unwrap_err();
        assert_eq!(err.message(), "401 Unauthorized");
        assert_eq!(stats.released(), 0);
    }

    #[tokio::test]
    async fn test_panicking_step_aborts_and_releases() {
        let connector = Arc::new(MockConnector::new());
        let stats = connector.stats();
        let mut container = BuildStepContainer::new(
            Box::new(RecordingStep::new(Behavior::Panic, stats.clone())),
            "vc-east",
            registry(),
            connector,
        )
        .unwrap();

        let (ctx, _) = context();
        let result = container.execute(&ctx).await;
        assert_eq!(result, Err(AbortError("step blew up".to_string())));
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.released(), 1);
    }

    #[tokio::test]
    async fn test_same_vcenter_endpoints_cannot_share_registry() {
        let same_vcenter = |name: &str, password: &str| {
            EndpointConfig::new(name, "https://vc.local", "admin").with_password(password)
        };
        let registry = Arc::new(
            InMemoryRegistry::from_endpoints(vec![same_vcenter("vc-readonly", "ro")]).unwrap(),
        );
        assert!(matches!(
            registry.register(same_vcenter("vc-prod", "rw")),
            Err(RegistryError::DuplicateHash { .. })
        ));

        // 只有 vc-readonly 可被引用，执行时连接到的正是它
        let connector = Arc::new(MockConnector::new());
        let step = RecordingStep::new(Behavior::Succeed, connector.stats());
        let seen = step.seen_endpoint.clone();
        assert!(BuildStepContainer::new(
            Box::new(RecordingStep::new(Behavior::Succeed, connector.stats())),
            "vc-prod",
            registry.clone(),
            connector.clone(),
        )
        .is_err());
        let mut container =
            BuildStepContainer::new(Box::new(step), "vc-readonly", registry, connector).unwrap();
        let (ctx, _) = context();
        container.execute(&ctx).await.unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("vc-readonly"));
    }

    #[tokio::test]
    async fn test_repeated_executions_open_one_connection_each() {
        let connector = Arc::new(MockConnector::new());
        let stats = connector.stats();
        let mut container = BuildStepContainer::new(
            Box::new(RecordingStep::new(Behavior::Succeed, stats.clone())),
            "vc-east",
            registry(),
            connector,
        )
        .unwrap();

        let (ctx, _) = context();
        for _ in 0..3 {
            container.execute(&ctx).await.unwrap();
        }
        assert_eq!(stats.opened(), 3);
        assert_eq!(stats.released(), 3);
    }
}
