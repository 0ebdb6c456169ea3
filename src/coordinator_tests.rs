#[cfg(test)]
mod tests {
    use crate::coordinator::ServiceCoordinator;
    use crate::error::SwitchError;
    use crate::systemd::{ActionError, MockUnitController, UnitAction};
    use crate::telemetry::{HistoryStore, MockResourceSampler, ServicePoint, SystemPoint};
    use crate::testing::{default_registry, FakeSampler, FakeUnitController, JUPYTER_UNIT, WEBGUI_UNIT};
    use mockall::Sequence;
    use std::sync::Arc;

    fn coordinator(controller: Arc<FakeUnitController>, sampler: FakeSampler) -> ServiceCoordinator {
        ServiceCoordinator::new(
            default_registry(),
            controller,
            Arc::new(sampler),
            Arc::new(HistoryStore::default()),
        )
    }

    #[tokio::test]
    async fn test_start_stops_excluded_service_first() {
        let mut controller = MockUnitController::new();
        let mut seq = Sequence::new();

        controller
            .expect_is_unit_active()
            .withf(|unit| unit == WEBGUI_UNIT)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| true);
        controller
            .expect_set_unit_state()
            .withf(|unit, action| unit == WEBGUI_UNIT && *action == UnitAction::Stop)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        controller
            .expect_set_proxy_route()
            .withf(|route, enabled| route.site_name() == Some("openhsi-web-controller") && !*enabled)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        controller
            .expect_set_unit_state()
            .withf(|unit, action| unit == JUPYTER_UNIT && *action == UnitAction::Start)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        controller
            .expect_set_proxy_route()
            .withf(|route, enabled| route.site_name() == Some("openhsi-jupyter") && *enabled)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let coordinator = ServiceCoordinator::new(
            default_registry(),
            Arc::new(controller),
            Arc::new(MockResourceSampler::new()),
            Arc::new(HistoryStore::default()),
        );

        assert!(coordinator.start("jupyter").await.is_ok());
    }

    #[tokio::test]
    async fn test_start_proceeds_when_preemptive_stop_fails() {
        let mut controller = MockUnitController::new();
        let mut seq = Sequence::new();

        controller
            .expect_is_unit_active()
            .withf(|unit| unit == WEBGUI_UNIT)
            .returning(|_| true);
        controller
            .expect_set_unit_state()
            .withf(|unit, action| unit == WEBGUI_UNIT && *action == UnitAction::Stop)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(ActionError::new("Access denied")));
        // No proxy disable for a service that did not stop
        controller
            .expect_set_unit_state()
            .withf(|unit, action| unit == JUPYTER_UNIT && *action == UnitAction::Start)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        controller
            .expect_set_proxy_route()
            .withf(|route, enabled| route.site_name() == Some("openhsi-jupyter") && *enabled)
            .times(1)
            .returning(|_, _| Ok(()));

        let coordinator = ServiceCoordinator::new(
            default_registry(),
            Arc::new(controller),
            Arc::new(MockResourceSampler::new()),
            Arc::new(HistoryStore::default()),
        );

        assert!(coordinator.start("jupyter").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_key_has_no_side_effects() {
        // Any call on the mock would panic: no expectations are set
        let coordinator = ServiceCoordinator::new(
            default_registry(),
            Arc::new(MockUnitController::new()),
            Arc::new(MockResourceSampler::new()),
            Arc::new(HistoryStore::default()),
        );

        assert!(matches!(coordinator.start("grafana").await, Err(SwitchError::ServiceNotFound(_))));
        assert!(matches!(coordinator.stop("grafana").await, Err(SwitchError::ServiceNotFound(_))));
        assert!(matches!(coordinator.restart("grafana").await, Err(SwitchError::ServiceNotFound(_))));
        assert!(matches!(coordinator.status_of("grafana").await, Err(SwitchError::ServiceNotFound(_))));
    }

    #[tokio::test]
    async fn test_start_marks_service_active() {
        let controller = Arc::new(FakeUnitController::new());
        let coordinator = coordinator(controller.clone(), FakeSampler::new());

        coordinator.start("webgui").await.unwrap();

        assert!(coordinator.status_of("webgui").await.unwrap().active);
        assert!(controller.route_enabled("openhsi-web-controller"));

        // A redundant start is not rejected
        coordinator.start("webgui").await.unwrap();
        assert_eq!(
            controller.actions(),
            vec![format!("start {}", WEBGUI_UNIT), format!("start {}", WEBGUI_UNIT)]
        );
    }

    #[tokio::test]
    async fn test_failed_start_surfaces_detail_without_rollback() {
        let controller = Arc::new(
            FakeUnitController::new()
                .with_active(WEBGUI_UNIT, 100)
                .failing(JUPYTER_UNIT, UnitAction::Start),
        );
        let coordinator = coordinator(controller.clone(), FakeSampler::new());

        let err = coordinator.start("jupyter").await.unwrap_err();
        assert_eq!(err.to_string(), format!("Job for {} failed", JUPYTER_UNIT));

        // webgui stays stopped and unrouted; jupyter's route was never enabled
        assert!(!coordinator.status_of("webgui").await.unwrap().active);
        assert!(!controller.route_enabled("openhsi-jupyter"));
        assert_eq!(
            controller.actions(),
            vec![format!("stop {}", WEBGUI_UNIT), format!("start {}", JUPYTER_UNIT)]
        );
    }

    #[tokio::test]
    async fn test_proxy_failure_does_not_fail_action() {
        let controller = Arc::new(FakeUnitController::new().failing_proxy());
        let coordinator = coordinator(controller.clone(), FakeSampler::new());

        assert!(coordinator.start("jupyter").await.is_ok());
        assert!(coordinator.stop("jupyter").await.is_ok());
        assert!(controller.calls().contains(&"proxy openhsi-jupyter on".to_string()));
        assert!(controller.calls().contains(&"proxy openhsi-jupyter off".to_string()));
    }

    #[tokio::test]
    async fn test_stop_disables_route_only_on_success() {
        let controller = Arc::new(
            FakeUnitController::new()
                .with_active(JUPYTER_UNIT, 200)
                .failing(WEBGUI_UNIT, UnitAction::Stop),
        );
        let coordinator = coordinator(controller.clone(), FakeSampler::new());

        coordinator.stop("jupyter").await.unwrap();
        assert!(controller.calls().contains(&"proxy openhsi-jupyter off".to_string()));

        let err = coordinator.stop("webgui").await.unwrap_err();
        assert!(matches!(err, SwitchError::ActionFailed { ref action, .. } if action == "stop"));
        assert!(!controller.calls().contains(&"proxy openhsi-web-controller off".to_string()));
    }

    #[tokio::test]
    async fn test_restart_leaves_proxy_alone() {
        let controller = Arc::new(FakeUnitController::new().with_active(WEBGUI_UNIT, 300));
        let coordinator = coordinator(controller.clone(), FakeSampler::new());

        coordinator.restart("webgui").await.unwrap();

        assert_eq!(controller.actions(), vec![format!("restart {}", WEBGUI_UNIT)]);
        assert!(!controller.calls().iter().any(|call| call.starts_with("proxy")));
    }

    #[tokio::test]
    async fn test_status_all_in_registry_order() {
        let controller = Arc::new(FakeUnitController::new().with_active(JUPYTER_UNIT, 42));
        let coordinator = coordinator(controller, FakeSampler::new());

        let statuses = coordinator.status_all().await;
        let summary: Vec<(&str, bool)> = statuses.iter().map(|s| (s.key.as_str(), s.active)).collect();
        assert_eq!(summary, vec![("webgui", false), ("jupyter", true)]);
        assert_eq!(statuses[1].unit, JUPYTER_UNIT);
        assert_eq!(statuses[1].port, 8888);
    }

    #[tokio::test]
    async fn test_snapshot_merges_live_and_history() {
        let controller = Arc::new(
            FakeUnitController::new()
                .with_active(WEBGUI_UNIT, 100)
                .with_active(JUPYTER_UNIT, 200),
        );
        // jupyter's process vanished: no live sample for pid 200
        let sampler = FakeSampler::new().with_process(100, 3.5, 1.25);
        let history = Arc::new(HistoryStore::default());
        history.append_system(
            SystemPoint {
                cpu: 10.0,
                memory_percent: 20.0,
                disk_percent: 30.0,
                network_sent: 512,
                network_recv: 1024,
            },
            1.0,
        );
        history.append_service("jupyter", ServicePoint { cpu: 1.0, memory_percent: 2.0 }, 1.0);

        let coordinator = ServiceCoordinator::new(default_registry(), controller, Arc::new(sampler), history);
        let snapshot = coordinator.snapshot().await.unwrap();

        assert_eq!(snapshot.system.cpu, 12.5);
        assert_eq!(snapshot.system.memory.used, 2_000);
        assert_eq!(snapshot.system.network.bytes_sent, 512);
        assert_eq!(snapshot.system.network.bytes_recv, 1024);
        assert_eq!(snapshot.system.history.len(), 1);

        let webgui = &snapshot.services["webgui"];
        assert_eq!(webgui.pid, 100);
        assert_eq!(webgui.cpu, Some(3.5));
        assert_eq!(webgui.num_processes, Some(3));
        assert!(webgui.history.is_empty());

        let jupyter = &snapshot.services["jupyter"];
        assert_eq!(jupyter.pid, 200);
        assert_eq!(jupyter.cpu, None);
        assert_eq!(jupyter.memory, None);
        assert_eq!(jupyter.history.cpu, vec![1.0]);
    }

    #[tokio::test]
    async fn test_snapshot_skips_inactive_services() {
        let controller = Arc::new(FakeUnitController::new());
        let coordinator = coordinator(controller, FakeSampler::new());

        let snapshot = coordinator.snapshot().await.unwrap();
        assert!(snapshot.services.is_empty());
        assert_eq!(snapshot.system.network.bytes_sent, 0);
        assert!(snapshot.system.history.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_fails_when_system_sample_fails() {
        let controller = Arc::new(FakeUnitController::new());
        let coordinator = coordinator(controller, FakeSampler::new().failing_system(1));

        assert!(matches!(coordinator.snapshot().await, Err(SwitchError::Sampling(_))));
    }
}
