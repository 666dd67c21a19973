// Integration test: fixture source → poller → map session

use ngsi_map::{
    MapConfig, MapSession, MapSurface, MemorySurface, SessionStatus, TypeSelection, ViewState,
};
use ngsi_poller::{EntitySource, FixtureSource, PollTrigger, PollingController};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_fixture_cycles_drive_session() {
    let source: Arc<dyn EntitySource> = Arc::new(FixtureSource::new());
    let mut session = MapSession::new(&MapConfig::default(), MemorySurface::new());
    session.on_location(Err(ngsi_map::GeolocationError::Timeout));

    let catalogue = source.fetch_types().await.unwrap();
    let active = session.set_known_types(catalogue);

    let (poller, mut outcomes, task) =
        PollingController::new(Arc::clone(&source), Duration::from_secs(15), 200)
            .with_types(active)
            .start();

    let first = outcomes.recv().await.unwrap();
    session.apply_entities(&first.result.unwrap());
    assert_eq!(session.status(), &SessionStatus::Ready { features: 3 });
    assert_eq!(session.view_state(), ViewState::Fitted);
    assert_eq!(session.layers().len(), 2);

    let active = session.set_selection(TypeSelection::parse("Sensor"));
    poller.set_types(active).unwrap();
    let changed = outcomes.recv().await.unwrap();
    assert_eq!(changed.trigger, PollTrigger::TypesChanged);
    session.apply_entities(&changed.result.unwrap());

    assert_eq!(session.status(), &SessionStatus::Ready { features: 1 });
    let station = session.layers().get("Station").unwrap();
    assert!(station.shapes.is_empty());
    assert!(!session.surface().is_attached(station.id));
    // The automatic fit happened once
    assert_eq!(session.surface().fit_count(), 1);

    poller.shutdown().unwrap();
    task.await.unwrap();
}
